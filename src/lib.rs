pub mod aggregator;
pub mod api;
pub mod capture;
pub mod cli;
pub mod config;
pub mod db;
pub mod error;
pub mod llm;
pub mod payload;
pub mod preferences;
pub mod prompt;
pub mod rss;
pub mod store;
pub mod taxonomy;
pub mod tuning;
pub mod validation;

pub use error::{NaaradError, Result};
