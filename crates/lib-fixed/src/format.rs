//! Runtime Q-format descriptors and serializable coefficient tables.
//!
//! The arithmetic types carry their format in the type; this module is the
//! bridge to data that lives outside the program (configuration files,
//! precomputed filter tables). A [`CoefficientTable`] stores raw integers
//! together with the [`QFormat`] they were quantized for, and only converts
//! back into a `Fixed` type whose format matches.

use crate::error::FormatError;
use crate::fixed::{quantize, Fixed};
use crate::word::Word;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A Q(QA.QB) descriptor: total width and fractional bits.
///
/// Deserializing validates, so a loaded descriptor always names a usable
/// format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawQFormat")]
pub struct QFormat {
    /// Storage width in bits (16 or 32).
    pub bits: u32,
    /// Fractional bits (QB).
    pub frac: u32,
}

impl QFormat {
    pub const Q1_15: Self = Self { bits: 16, frac: 15 };
    pub const Q4_12: Self = Self { bits: 16, frac: 12 };
    pub const Q1_31: Self = Self { bits: 32, frac: 31 };
    pub const Q8_24: Self = Self { bits: 32, frac: 24 };

    /// Descriptor of a fixed-point type.
    pub fn of<W: Word, const FRAC: u32>() -> Self {
        Self {
            bits: W::BITS,
            frac: FRAC,
        }
    }

    /// Integer bits including the sign (QA).
    pub fn int_bits(&self) -> u32 {
        self.bits.saturating_sub(self.frac)
    }

    /// Check that a storage word exists and at least the sign bit is left.
    pub fn validate(&self) -> Result<(), FormatError> {
        if self.bits != 16 && self.bits != 32 {
            return Err(FormatError::Unsupported(format!(
                "{}-bit words are not supported (use 16 or 32)",
                self.bits
            )));
        }
        if self.frac >= self.bits {
            return Err(FormatError::Unsupported(format!(
                "{} fractional bits leave no sign bit in a {}-bit word",
                self.frac, self.bits
            )));
        }
        Ok(())
    }

    /// Smallest and largest raw values of the format.
    pub fn raw_range(&self) -> (i64, i64) {
        let half = 1i64 << (self.bits - 1);
        (-half, half - 1)
    }

    /// `Q(value)` at runtime: round to nearest, clamp to the raw range.
    pub fn quantize(&self, value: f64) -> i64 {
        let (lo, hi) = self.raw_range();
        quantize(value, self.frac).clamp(lo, hi)
    }

    pub fn to_real(&self, raw: i64) -> f64 {
        raw as f64 / (1u64 << self.frac) as f64
    }
}

#[derive(Deserialize)]
struct RawQFormat {
    bits: u32,
    frac: u32,
}

impl TryFrom<RawQFormat> for QFormat {
    type Error = FormatError;

    fn try_from(raw: RawQFormat) -> Result<Self, Self::Error> {
        let format = Self {
            bits: raw.bits,
            frac: raw.frac,
        };
        format.validate()?;
        Ok(format)
    }
}

impl fmt::Display for QFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}.{}", self.int_bits(), self.frac)
    }
}

impl FromStr for QFormat {
    type Err = FormatError;

    /// Parse `"Q1.15"`, `"q4.12"` or plain `"8.24"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let body = s
            .trim()
            .strip_prefix(['Q', 'q'])
            .unwrap_or_else(|| s.trim());
        let (int_part, frac_part) = body
            .split_once('.')
            .ok_or_else(|| FormatError::Unsupported(format!("expected QA.QB, got '{s}'")))?;
        let int_bits: u32 = int_part
            .parse()
            .map_err(|_| FormatError::Unsupported(format!("bad integer bits in '{s}'")))?;
        let frac: u32 = frac_part
            .parse()
            .map_err(|_| FormatError::Unsupported(format!("bad fractional bits in '{s}'")))?;
        if int_bits == 0 {
            return Err(FormatError::Unsupported(format!("'{s}' has no sign bit")));
        }
        let bits = int_bits
            .checked_add(frac)
            .ok_or_else(|| FormatError::Unsupported(format!("'{s}' is too wide")))?;
        let format = Self { bits, frac };
        format.validate()?;
        Ok(format)
    }
}

/// A quantized coefficient table with its format.
///
/// Serialized as `{ "format": { "bits": 16, "frac": 15 }, "coefficients": [...] }`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoefficientTable {
    pub format: QFormat,
    pub coefficients: Vec<i64>,
}

impl CoefficientTable {
    /// Capture fixed-point coefficients.
    pub fn from_fixed<W: Word, const FRAC: u32>(coefs: &[Fixed<W, FRAC>]) -> Self {
        Self {
            format: QFormat::of::<W, FRAC>(),
            coefficients: coefs.iter().map(|c| c.raw().to_i64()).collect(),
        }
    }

    /// Quantize real coefficients into `format`.
    pub fn from_reals(format: QFormat, reals: &[f64]) -> Result<Self, FormatError> {
        format.validate()?;
        Ok(Self {
            format,
            coefficients: reals.iter().map(|&r| format.quantize(r)).collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.coefficients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coefficients.is_empty()
    }

    /// Convert into a fixed-point vector of the table's own format.
    ///
    /// # Errors
    ///
    /// [`FormatError::Mismatch`] when `Fixed<W, FRAC>` is a different format,
    /// [`FormatError::OutOfRange`] when a raw entry does not fit `W`.
    pub fn to_fixed<W: Word, const FRAC: u32>(&self) -> Result<Vec<Fixed<W, FRAC>>, FormatError> {
        let expected = QFormat::of::<W, FRAC>();
        if self.format != expected {
            return Err(FormatError::Mismatch {
                expected,
                found: self.format,
            });
        }

        let (lo, hi) = expected.raw_range();
        self.coefficients
            .iter()
            .enumerate()
            .map(|(index, &value)| {
                if value < lo || value > hi {
                    Err(FormatError::OutOfRange {
                        index,
                        value,
                        format: expected,
                    })
                } else {
                    Ok(Fixed::from_raw(W::wrap_i64(value)))
                }
            })
            .collect()
    }

    pub fn to_reals(&self) -> Vec<f64> {
        self.coefficients
            .iter()
            .map(|&raw| self.format.to_real(raw))
            .collect()
    }
}
