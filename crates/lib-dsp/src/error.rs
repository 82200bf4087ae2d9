//! Error types for DSP operations.
//!
//! Numeric domain problems (square root of a negative number, logarithm of
//! zero, division by a zero Q-format value) are not errors: those operators
//! return their documented sentinel. `DspError` covers buffer-shape contracts
//! and parameters that leave an operation undefined.

use lib_fixed::FormatError;
use thiserror::Error;

/// Errors that can occur during DSP operations.
#[derive(Debug, Error)]
pub enum DspError {
    /// Buffer length does not match what the operation derives from its inputs.
    #[error("Input length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Buffer too short, e.g. missing filter history.
    #[error("Insufficient data: need at least {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Parameter outside the range the operation is defined for.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Coefficient table in the wrong format.
    #[error(transparent)]
    Format(#[from] FormatError),
}

/// Result type for DSP operations.
pub type DspResult<T> = Result<T, DspError>;

/// Fail with `LengthMismatch` unless `actual == expected`.
#[inline]
pub(crate) fn ensure_len(expected: usize, actual: usize) -> DspResult<()> {
    if expected == actual {
        Ok(())
    } else {
        Err(DspError::LengthMismatch { expected, actual })
    }
}
