//! Filters.
//!
//! The functional entry points ([`fir`], [`iir`], [`lms`], [`interpolate`],
//! [`resample`]) work on caller buffers that already carry the history
//! samples the filter reads before the first output. The `*Filter` structs own that
//! history for streaming use and call the same functions.
//!
//! Multiply-accumulate loops go through a [`Kernels`](crate::kernels::Kernels)
//! provider; the `*_with::<K>` variants choose it explicitly.

pub mod design;
pub mod fir;
pub mod iir;
pub mod interpolation;
pub mod lms;
pub mod resampling;

pub use design::{lp_fir_design, lp_fir_table};
pub use fir::{fir, fir_with, FirFilter};
pub use iir::{iir, iir_part, iir_part_with, iir_with, IirFilter};
pub use interpolation::{
    coefsort, interpolate, interpolate_with, normalize_polyphase, Interpolator,
};
pub use lms::{
    lms, lms_with, nlms, nlms_with, LmsFilter, NlmsFilter, DEFAULT_LMS_MU, DEFAULT_NLMS_MU,
};
pub use resampling::{resample, resample_with, Resampler};
