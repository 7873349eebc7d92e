//! Common types and utilities shared across all crates

pub mod config;
pub mod error;
pub mod tracing;
pub mod types;

pub use config::*;
pub use error::{AnalyticsError, Result};
pub use tracing::*;
pub use types::*;
