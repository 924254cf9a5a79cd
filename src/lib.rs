//! Extraction workflow engine
//!
//! Runs the post-extraction pipeline configured for a document:
//! - API calls against arbitrary URLs or configured endpoints
//! - Conditional checks, JSON field filtering and output file renaming
//! - Email actions and template notifications through Office365 or Gmail
//!
//! Steps share one mutable context addressed with `{{dotted.path[0]}}`
//! placeholders; every step and run is logged to the configuration store.

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;
