//! Error types shared by every component in the crate.

use std::fmt;

/// Errors produced by construction, persistence, and format parsing.
///
/// Runtime processing (`Identifier::process`, `Learner::process`) never
/// returns an error on well-formed input; misuse is caught at construction.
#[derive(thiserror::Error, Debug)]
pub enum WhistleError {
    /// An out-of-range numeric parameter was given at construction time.
    #[error("invalid parameter: {0}")]
    InvalidParam(String),

    /// A persisted file was corrupt, truncated, or carried the wrong magic.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// Underlying filesystem I/O failed, including short reads/writes.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Classifier name, frequency band, or sample rate disagreed between a
    /// `Pattern`, a learner state file, and the caller-supplied parameters.
    #[error("incompatible pattern: {0}")]
    IncompatiblePattern(String),

    /// A requested topology name or channel count has no implementation.
    #[error("unsupported: {0}")]
    Unsupported(String),
}

impl WhistleError {
    pub(crate) fn invalid_param(msg: impl fmt::Display) -> Self {
        WhistleError::InvalidParam(msg.to_string())
    }

    pub(crate) fn invalid_format(msg: impl fmt::Display) -> Self {
        WhistleError::InvalidFormat(msg.to_string())
    }

    pub(crate) fn incompatible(msg: impl fmt::Display) -> Self {
        WhistleError::IncompatiblePattern(msg.to_string())
    }

    pub(crate) fn unsupported(msg: impl fmt::Display) -> Self {
        WhistleError::Unsupported(msg.to_string())
    }
}

pub type Result<T> = std::result::Result<T, WhistleError>;
