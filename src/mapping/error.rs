//! Errors reported by the mapping configuration interface

use thiserror::Error;

/// Rejected mapping command. The tables are left untouched whenever one of these is
/// returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MappingError {
    #[error("unknown direction: {0:?}")]
    UnknownDirection(String),

    #[error("unknown side: {0:?} (expected \"left\" or \"right\")")]
    UnknownSide(String),

    #[error("button index {0} out of range (expected 0-3)")]
    ButtonIndexOutOfRange(u32),

    #[error("invalid button index: {0:?}")]
    InvalidButtonIndex(String),

    #[error("invalid key code: {0:?}")]
    InvalidKeyCode(String),

    #[error("expected exactly one character, got {0:?}")]
    InvalidChar(String),

    #[error("unknown key name: {0:?}")]
    UnknownKeyName(String),

    #[error("unknown key spec type: {0:?} (expected code, char or name)")]
    UnknownKeySpecType(String),

    #[error("missing argument: {0}")]
    MissingArgument(&'static str),

    #[error("unexpected argument: {0:?}")]
    UnexpectedArgument(String),

    #[error("unknown command: {0:?}")]
    UnknownCommand(String),
}
