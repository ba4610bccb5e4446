pub mod batch;
pub mod cache;
pub mod control;
pub mod encoding;
pub mod glossary;
pub mod guard;
pub mod jar;
pub mod lang;
pub mod output;
pub mod pipeline;
pub mod qa;
pub mod quests;
pub mod rebuild;
pub mod translator;
pub mod worker;
