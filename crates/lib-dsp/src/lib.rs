//! # lib-dsp
//!
//! Fixed-point signal processing on [`lib_fixed::Fixed`] buffers.
//!
//! This crate provides the numeric core:
//!
//! - **Operators**: square root, logarithms, exponential, power, sine,
//!   cosine, arc sine and arc cosine with the accuracy picked by the storage
//!   word
//! - **Random**: the Park–Miller generator as an explicit state object
//! - **Vectors**: element-wise arithmetic, reductions and convolution
//! - **Signals**: sine/cosine, ramp, step, impulse, comb, rectangle, saw
//!   and noise generators
//! - **Windows**: rectangular, Bartlett, Hamming, Hann, Blackman, Welch,
//!   Gauss and Kaiser
//! - **Filters**: FIR, IIR, partial IIR, LMS/NLMS, polyphase interpolation,
//!   rational resampling and low-pass design
//!
//! Every function works on caller-owned slices and allocates nothing except
//! where it returns an owned value. The only mutable state outside the
//! caller's buffers is a [`rand::ParkMiller`] the caller passes in.
//!
//! ```
//! use lib_dsp::{filter, signal};
//! use lib_fixed::Q15;
//!
//! let mut x = vec![Q15::ZERO; 64];
//! signal::gen_sin(&mut x, 1, 32, Q15::ZERO).unwrap();
//!
//! let h = [Q15::from_f64(0.5), Q15::from_f64(0.5)];
//! let mut y = vec![Q15::ZERO; x.len() - 1];
//! filter::fir(&mut y, &x, &h).unwrap();
//! ```

pub mod error;
pub mod filter;
pub mod kernels;
pub mod operators;
pub mod rand;
pub mod signal;
pub mod vector;
pub mod window;

mod wide;

pub use error::{DspError, DspResult};
pub use filter::{FirFilter, IirFilter, Interpolator, LmsFilter, NlmsFilter, Resampler};
pub use kernels::{Generic, Kernels, Unrolled};
pub use rand::{ParkMiller, SharedParkMiller};
pub use window::WindowType;
