//! Configuration module for Ember-Poll
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and overlaying the credentials and endpoint from the environment.
//!
//! # Example
//!
//! ```no_run
//! use ember_poll::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("ember.toml")).unwrap();
//! println!("Polling every {}ms", config.polling.interval_ms);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BatchConfig, Config, PollingConfig, RetryConfig, ScrapeConfig, ServiceConfig,
    DEFAULT_ENDPOINT,
};

// Re-export parser functions
pub use parser::{
    compute_config_hash, load_config, load_config_with_hash, ENV_API_KEY, ENV_ENDPOINT,
};
pub use validation::validate;
