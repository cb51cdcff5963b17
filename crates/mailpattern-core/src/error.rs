//! Error types for the pattern engine.
//!
//! Evaluation never fails; these errors only come from parsing text formats
//! and from strict lookups of persisted identifiers.

use thiserror::Error;

/// Errors that can occur outside of evaluation.
#[derive(Debug, Error)]
pub enum Error {
    /// Query string could not be parsed.
    #[error("Query parse error at byte {position}: {message}")]
    Query {
        /// Byte offset of the offending token.
        position: usize,
        /// What was expected or found.
        message: String,
    },

    /// Configuration file could not be parsed.
    #[error("Config parse error on line {line}: {message}")]
    ConfigFile {
        /// One-based line number.
        line: usize,
        /// What was wrong with the line.
        message: String,
    },

    /// Comparison function identifier not recognized.
    #[error("Unknown comparison function: {0}")]
    UnknownFunction(String),

    /// Combinator identifier not recognized.
    #[error("Unknown combinator: {0}")]
    UnknownCombinator(String),

    /// Status name not recognized.
    #[error("Unknown status: {0}")]
    UnknownStatus(String),

    /// Settings serialization/deserialization error.
    #[error("Settings error: {0}")]
    Settings(#[from] serde_json::Error),

    /// Message could not be parsed.
    #[error("Message error: {0}")]
    Mime(#[from] mailpattern_mime::Error),
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
