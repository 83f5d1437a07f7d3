//! Ambient tooling shared by the cognitive graph core: configuration loading,
//! structured logging helpers, error-context formatting, retry/timeout utilities,
//! validation, and the stable-hashing primitives the Tool node uses to derive
//! idempotency keys.
//!
//! # Modules
//!
//! - `config` - `ConfigBuilder` trait and environment variable loading
//! - `settings` - the process-wide `Settings` the runner is constructed with
//! - `error` - Error handling utilities with context and chain formatting
//! - `async_utils` - Retry policies and timeout utilities for async operations
//! - `validation` - Fluent validation API for type-safe data validation
//! - `serialization` - Stable JSON serialization and hashing utilities
//! - `logging` - Structured logging helpers, formatters, and tracing setup

pub mod async_utils;
pub mod config;
pub mod error;
pub mod logging;
pub mod serialization;
pub mod settings;
pub mod validation;

pub use settings::Settings;

use thiserror::Error;

/// Errors that can occur in the tooling crate
#[derive(Debug, Error)]
pub enum ToolingError {
    /// General error with message
    #[error("Tooling error: {0}")]
    General(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for tooling operations
pub type Result<T> = std::result::Result<T, ToolingError>;

/// Get version information
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
