//! Retry module: backoff decisions for failed submissions and polls
//!
//! # Components
//!
//! - `BackoffPolicy`: pure mapping from (failure class, attempt) to a delay or give-up
//! - `RetryState`: per-operation counters, tracked separately for each class

mod policy;
mod state;

// Re-export main types
pub use policy::{Backoff, BackoffPolicy, ErrorClass};
pub use state::RetryState;
