//! Error types for Q-format descriptors and coefficient tables.

use crate::format::QFormat;
use thiserror::Error;

/// Errors raised when a runtime format or table does not fit a fixed-point type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// The table was written for another format.
    #[error("Format mismatch: expected {expected}, found {found}")]
    Mismatch { expected: QFormat, found: QFormat },

    /// A raw coefficient does not fit the storage word.
    #[error("Coefficient {index} = {value} does not fit {format}")]
    OutOfRange {
        index: usize,
        value: i64,
        format: QFormat,
    },

    /// Descriptor that no storage word can hold.
    #[error("Unsupported format: {0}")]
    Unsupported(String),
}
