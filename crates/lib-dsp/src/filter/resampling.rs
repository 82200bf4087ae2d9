//! Rational sample-rate conversion.
//!
//! Converting from `fs_in` to `fs_out` interpolates by
//! `L = fs_out / gcd` and decimates by `M = fs_in / gcd`. Only every `M`-th
//! sample of the interpolated stream is computed: output `j` sits at
//! interpolated index `u = j * M`, which is sub-filter `u % L` applied at
//! input `u / L`. With `M = 1` this is [`interpolate`](super::interpolate).

use super::design::lp_fir_design;
use super::interpolation::{coefsort, normalize_polyphase};
use crate::error::{ensure_len, DspError, DspResult};
use crate::kernels::{Generic, Kernels};
use crate::vector::narrow_sum;
use lib_fixed::{Fixed, Word};
use tracing::debug;

fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        (a, b) = (b, a % b);
    }
    a
}

/// Number of outputs for `len` inputs when the first output sits at
/// interpolated index `offset`.
fn output_count(len: usize, offset: usize, interpolation: usize, decimation: usize) -> usize {
    (len * interpolation).saturating_sub(offset).div_ceil(decimation)
}

/// Resample with coefsorted coefficients `h`, starting at interpolated
/// index `offset`. Returns the offset of the next output relative to the
/// end of `x`.
fn resample_from<K: Kernels, W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    h: &[Fixed<W, F>],
    interpolation: usize,
    decimation: usize,
    offset: usize,
) -> DspResult<usize> {
    let n_tap = h.len() / interpolation;
    let size = x.len() + 1 - n_tap;
    ensure_len(output_count(size, offset, interpolation, decimation), out.len())?;

    let mut u = offset;
    for sample in out.iter_mut() {
        let (n, k) = (u / interpolation, u % interpolation);
        let sub = &h[k * n_tap..(k + 1) * n_tap];
        *sample = narrow_sum(K::dot_reversed(&x[n..n + n_tap], sub));
        u += decimation;
    }
    Ok(u.max(size * interpolation) - size * interpolation)
}

fn check_ratios(h_len: usize, interpolation: usize, decimation: usize) -> DspResult<()> {
    if interpolation == 0 || decimation == 0 {
        return Err(DspError::InvalidArgument(format!(
            "resampling ratio {interpolation}/{decimation} needs nonzero factors"
        )));
    }
    if h_len == 0 || h_len % interpolation != 0 {
        return Err(DspError::InvalidArgument(format!(
            "{h_len} coefficients do not split into {interpolation} sub-filters"
        )));
    }
    Ok(())
}

/// Resample `x` by `interpolation / decimation` with coefsorted
/// coefficients `h`.
///
/// `x` starts with `n_tap - 1` history samples, `n_tap = h.len() / interpolation`.
/// `out.len()` must be `ceil(size * interpolation / decimation)` for the
/// `size` remaining inputs.
pub fn resample<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    h: &[Fixed<W, F>],
    interpolation: usize,
    decimation: usize,
) -> DspResult<()> {
    resample_with::<Generic, W, F>(out, x, h, interpolation, decimation)
}

/// [`resample`] through a chosen kernel provider.
pub fn resample_with<K: Kernels, W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    h: &[Fixed<W, F>],
    interpolation: usize,
    decimation: usize,
) -> DspResult<()> {
    check_ratios(h.len(), interpolation, decimation)?;
    let n_tap = h.len() / interpolation;
    if x.len() + 1 < n_tap {
        return Err(DspError::InsufficientData {
            needed: n_tap - 1,
            got: x.len(),
        });
    }
    resample_from::<K, W, F>(out, x, h, interpolation, decimation, 0)?;
    Ok(())
}

/// Streaming rational resampler.
///
/// Keeps the input history and the position of the next output between
/// blocks, so any block split yields the same output stream.
#[derive(Clone, Debug)]
pub struct Resampler<W: Word, const F: u32> {
    coefs: Vec<Fixed<W, F>>,
    n_tap: usize,
    interpolation: usize,
    decimation: usize,
    offset: usize,
    history: Vec<Fixed<W, F>>,
    scratch: Vec<Fixed<W, F>>,
}

impl<W: Word, const F: u32> Resampler<W, F> {
    /// Build from a prototype of `n_tap * interpolation` coefficients in
    /// natural order.
    pub fn new(
        mut prototype: Vec<Fixed<W, F>>,
        n_tap: usize,
        interpolation: usize,
        decimation: usize,
    ) -> DspResult<Self> {
        check_ratios(prototype.len(), interpolation, decimation)?;
        coefsort(&mut prototype, n_tap, interpolation)?;
        Ok(Self {
            coefs: prototype,
            n_tap,
            interpolation,
            decimation,
            offset: 0,
            history: vec![Fixed::ZERO; n_tap - 1],
            scratch: Vec::new(),
        })
    }

    /// Convert from `input_rate` to `output_rate` with `n_tap` taps per
    /// sub-filter.
    ///
    /// The prototype is a windowed-sinc low-pass at the interpolated rate,
    /// cut off at half the lower of the two rates, then sorted and
    /// normalized.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a zero tap count, a rate below 2 or an
    /// interpolated rate that overflows.
    pub fn design(n_tap: usize, input_rate: u32, output_rate: u32) -> DspResult<Self> {
        if n_tap == 0 || input_rate < 2 || output_rate < 2 {
            return Err(DspError::InvalidArgument(format!(
                "resampling {input_rate} -> {output_rate} with {n_tap} taps is undefined"
            )));
        }
        let divisor = gcd(input_rate, output_rate);
        let interpolation = output_rate / divisor;
        let decimation = input_rate / divisor;
        let rate = input_rate
            .checked_mul(interpolation)
            .ok_or_else(|| DspError::InvalidArgument("interpolated rate overflows".into()))?;
        let len = n_tap
            .checked_mul(interpolation as usize)
            .ok_or_else(|| DspError::InvalidArgument("polyphase table size overflows".into()))?;

        let mut prototype = vec![Fixed::ZERO; len];
        lp_fir_design(&mut prototype, input_rate.min(output_rate) / 2, rate)?;
        let (interpolation, decimation) = (interpolation as usize, decimation as usize);
        let mut resampler = Self::new(prototype, n_tap, interpolation, decimation)?;
        normalize_polyphase(&mut resampler.coefs, n_tap, interpolation)?;

        debug!(input_rate, output_rate, interpolation, decimation, n_tap, "designed resampler");
        Ok(resampler)
    }

    /// Sub-filter coefficients, sub-filter `k` at `k * n_tap..(k + 1) * n_tap`.
    pub fn coefficients(&self) -> &[Fixed<W, F>] {
        &self.coefs
    }

    pub fn interpolation(&self) -> usize {
        self.interpolation
    }

    pub fn decimation(&self) -> usize {
        self.decimation
    }

    /// Outputs the next [`process`](Self::process) call produces for
    /// `input_len` samples.
    pub fn output_len(&self, input_len: usize) -> usize {
        output_count(input_len, self.offset, self.interpolation, self.decimation)
    }

    /// Resample one block; `out.len()` must be `output_len(input.len())`.
    pub fn process(&mut self, input: &[Fixed<W, F>], out: &mut [Fixed<W, F>]) -> DspResult<()> {
        self.process_with::<Generic>(input, out)
    }

    pub fn process_with<K: Kernels>(
        &mut self,
        input: &[Fixed<W, F>],
        out: &mut [Fixed<W, F>],
    ) -> DspResult<()> {
        ensure_len(self.output_len(input.len()), out.len())?;
        if input.is_empty() {
            return Ok(());
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.history);
        self.scratch.extend_from_slice(input);
        self.offset = resample_from::<K, W, F>(
            out,
            &self.scratch,
            &self.coefs,
            self.interpolation,
            self.decimation,
            self.offset,
        )?;

        let keep = self.scratch.len() - (self.n_tap - 1);
        self.history.copy_from_slice(&self.scratch[keep..]);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.history.fill(Fixed::ZERO);
        self.offset = 0;
    }
}
