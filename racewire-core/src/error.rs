//! Core error types.

use thiserror::Error;

/// Error returned when parsing a flag from its wire string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown flag: {0}")]
pub struct FlagParseError(pub String);
