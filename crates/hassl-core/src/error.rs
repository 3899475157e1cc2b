//! Errors raised while parsing source literals

use thiserror::Error;

/// A duration, time or date literal that does not parse
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LiteralError {
    #[error("malformed duration '{0}' (expected <integer><ms|s|m|h|d>)")]
    Duration(String),

    #[error("malformed time '{0}' (expected HH:MM[:SS] or sunrise/sunset[+-offset])")]
    Time(String),

    #[error("malformed date '{0}'")]
    Date(String),
}
