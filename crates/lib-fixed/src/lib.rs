//! # lib-fixed
//!
//! Q-format fixed-point numbers for the qdsp workspace.
//!
//! This crate provides the number representation every DSP routine builds on:
//! - [`Word`]: the 16-bit / 32-bit storage integers and their double-width
//!   multiply and divide
//! - [`Fixed`]: a value with its Q(QA.QB) format fixed at the type level,
//!   plus the common aliases [`Q15`], [`Q12`], [`Q31`] and [`Q24`]
//! - [`QFormat`] and [`CoefficientTable`]: runtime descriptors and the
//!   serializable form of precomputed coefficient tables

pub mod error;
pub mod fixed;
pub mod format;
pub mod word;

pub use error::FormatError;
pub use fixed::{quantize, Fixed, Q12, Q15, Q24, Q31};
pub use format::{CoefficientTable, QFormat};
pub use word::Word;
