//! Error types for gitgate

use thiserror::Error;

/// Errors raised by gitgate operations
#[derive(Debug, Error)]
pub enum Error {
    /// The hosting API returned a non-success response
    #[error("API error: {0}")]
    Api(String),

    /// Underlying HTTP transport failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A protection rule carries a malformed target pattern
    #[error("rule '{rule_id}' has an invalid target pattern '{pattern}'")]
    InvalidRulePattern {
        /// Identifier of the offending rule
        rule_id: String,
        /// The pattern that failed to compile
        pattern: String,
    },

    /// The ownership file could not be parsed or compiled
    #[error("CODEOWNERS line {line}: {message}")]
    CodeOwners {
        /// 1-based line or entry position
        line: usize,
        /// What went wrong
        message: String,
    },

    /// Input handed to the gate engine is structurally malformed
    #[error("invalid input: {0}")]
    Validation(String),

    /// The requested branch does not exist on the remote
    #[error("branch not found: {0}")]
    BranchNotFound(String),

    /// A URL could not be parsed
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// Result type alias for gitgate operations
pub type Result<T> = std::result::Result<T, Error>;
