//! # Runner Error Types
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Runner Error Categories                            │
//! │                                                                         │
//! │  Input            Parsing             Session                           │
//! │  ─────            ───────             ───────                           │
//! │  InvalidArgument  Toml                Step (index + op + CoreError)     │
//! │  InvalidConfig    Json                Core (catalog seeding, totals)    │
//! │  Io               UnsupportedSeed                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use thiserror::Error;
use till_core::CoreError;

/// Result type for runner operations.
pub type CliResult<T> = Result<T, CliError>;

#[derive(Debug, Error)]
pub enum CliError {
    // =========================================================================
    // Input Errors
    // =========================================================================
    /// Unknown flag or a flag missing its value.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration failed validation.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // =========================================================================
    // Parsing Errors
    // =========================================================================
    #[error("Failed to parse TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Seed file extension is neither `.toml` nor `.json`.
    #[error("Unsupported seed file {}: expected .toml or .json", .0.display())]
    UnsupportedSeed(PathBuf),

    // =========================================================================
    // Session Errors
    // =========================================================================
    /// A scripted step was rejected by the cart.
    #[error("Step {index} ({op}) failed: {source}")]
    Step {
        index: usize,
        op: &'static str,
        #[source]
        source: CoreError,
    },

    #[error(transparent)]
    Core(#[from] CoreError),
}
