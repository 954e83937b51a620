//! Error types for sync-core.

use sync_content::ContentError;
use thiserror::Error;

/// Errors raised while building or running rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// A glob pattern failed to compile.
    #[error("invalid glob pattern {pattern:?}: {source}")]
    Glob {
        /// The offending pattern.
        pattern: String,
        /// Underlying globset error.
        source: globset::Error,
    },

    /// A regular expression failed to compile.
    #[error("invalid regex pattern {pattern:?}: {source}")]
    Regex {
        /// The offending pattern.
        pattern: String,
        /// Underlying regex error.
        source: regex::Error,
    },

    /// A built-in transform failed.
    #[error("transform failed: {0}")]
    Content(#[from] ContentError),

    /// A user-supplied transform or resolver failed.
    #[error("{0}")]
    Custom(String),
}

impl RuleError {
    /// Build an error for a user-supplied callback.
    pub fn custom(message: impl Into<String>) -> Self {
        Self::Custom(message.into())
    }
}
