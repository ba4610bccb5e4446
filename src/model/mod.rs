pub mod entry;
pub mod report;
pub mod settings;
