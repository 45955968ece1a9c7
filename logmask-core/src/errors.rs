//! errors.rs - Custom error types for the logmask-core library.
//!
//! This module defines a structured error enum for the library, providing
//! specific, actionable error types that can be handled programmatically.
//!
//! License: MIT OR APACHE 2.0

use thiserror::Error;

/// Why a template could not be aligned with a masked line.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MismatchReason {
    #[error("template has {template} tokens but the masked line has {line}")]
    TokenCount { template: usize, line: usize },

    #[error("no captured value left for {tag} at token {position}")]
    LedgerExhausted { tag: String, position: usize },

    #[error("template expects {tag} at token {position} but the line never captured one")]
    UnknownPlaceholder { tag: String, position: usize },
}

/// This enum represents all possible error types in the `logmask-core` library.
///
/// By using `#[non_exhaustive]`, we signal to consumers of this library that
/// new variants may be added in future versions.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum LogmaskError {
    #[error("Failed to compile masking rule '{0}': {1}")]
    RuleCompilationError(String, regex::Error),

    #[error("Rule '{0}': pattern length ({1}) exceeds maximum allowed ({2})")]
    PatternLengthExceeded(String, usize, usize),

    #[error("Rule '{0}': placeholder '{1}' is not a valid tag")]
    InvalidTag(String, String),

    #[error("Rule '{0}' has no pattern")]
    MissingPattern(String),

    /// One or more rules failed to compile; the rule set is unusable.
    #[error("Malformed rule set: {0}")]
    MalformedRule(String),

    #[error("Template and masked line do not match in structure: {0}")]
    StructuralMismatch(#[from] MismatchReason),

    #[error("No cluster matches the masked line")]
    NoMatchingCluster,

    #[error("No log lines were supplied")]
    EmptyInput,
}

impl LogmaskError {
    /// True for the per-line alignment failures a batch can skip over.
    pub fn is_structural_mismatch(&self) -> bool {
        matches!(self, LogmaskError::StructuralMismatch(_))
    }
}
