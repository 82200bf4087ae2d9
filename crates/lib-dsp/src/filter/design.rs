//! Low-pass FIR design.

use crate::error::{DspError, DspResult};
use crate::wide;
use crate::window::WindowType;
use lib_fixed::{CoefficientTable, Fixed, Word};
use tracing::debug;

/// Longest design whose sample offsets fit the scratch range.
const MAX_TAPS: usize = 1 << 15;

/// Hamming-windowed sinc low-pass filter with cut-off `fc` at rate `fs`.
///
/// With `t = n - (N - 1) / 2` the taps are
/// `c[n] = sin(2 pi fc t / fs) / (pi t) * hamming(n)` and `2 fc / fs` at
/// `t = 0`, so the DC gain is close to 1. The taps are symmetric.
///
/// # Errors
///
/// `InvalidArgument` for an empty or oversized buffer, a zero rate or
/// cut-off, or a cut-off above `fs / 2`.
pub fn lp_fir_design<W: Word, const F: u32>(
    c: &mut [Fixed<W, F>],
    fc: u32,
    fs: u32,
) -> DspResult<()> {
    if c.is_empty() || c.len() > MAX_TAPS {
        return Err(DspError::InvalidArgument(format!(
            "FIR design needs 1..={MAX_TAPS} taps, got {}",
            c.len()
        )));
    }
    if fs == 0 || fc == 0 || 2 * fc as u64 > fs as u64 {
        return Err(DspError::InvalidArgument(format!(
            "cut-off {fc} must be in (0, fs / 2] for fs = {fs}"
        )));
    }

    let span = c.len() - 1;
    let cutoff = (((2 * fc as i128) << wide::FRAC) / fs as i128) as i64;
    for n in 0..c.len() / 2 {
        // Offset from the centre, never zero in the first half.
        let t = (2 * n as i64 - span as i64) << (wide::FRAC - 1);
        let sinc = wide::div(wide::sin::<W>(wide::mul(cutoff, t)), wide::mul(wide::PI, t));
        let tap = wide::to_fixed(wide::mul(sinc, WindowType::Hamming.weight::<W>(n, span)));
        c[n] = tap;
        c[span - n] = tap;
    }
    if c.len() % 2 == 1 {
        c[span / 2] = wide::to_fixed(cutoff);
    }

    debug!(taps = c.len(), fc, fs, "designed low-pass FIR");
    Ok(())
}

/// [`lp_fir_design`] into a new coefficient table.
pub fn lp_fir_table<W: Word, const F: u32>(
    taps: usize,
    fc: u32,
    fs: u32,
) -> DspResult<CoefficientTable> {
    let mut c = vec![Fixed::<W, F>::ZERO; taps];
    lp_fir_design(&mut c, fc, fs)?;
    Ok(CoefficientTable::from_fixed(&c))
}
