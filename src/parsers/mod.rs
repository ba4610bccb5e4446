pub mod json;
pub mod snbt;
