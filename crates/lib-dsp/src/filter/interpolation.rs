//! Polyphase interpolation.
//!
//! An interpolation-by-`ratio` filter with `n_tap * ratio` prototype
//! coefficients splits into `ratio` sub-filters of `n_tap` taps: sub-filter
//! `k` holds the prototype taps `k, k + ratio, k + 2 * ratio, ...`.
//! [`coefsort`] reorders a prototype in place so that each sub-filter is
//! contiguous, and [`interpolate`] runs the sub-filters over the input,
//! which equals zero-stuffing the input and filtering with the prototype.

use super::design::lp_fir_design;
use crate::error::{ensure_len, DspError, DspResult};
use crate::kernels::{Generic, Kernels};
use crate::vector::narrow_sum;
use lib_fixed::{Fixed, Word};
use tracing::debug;

fn check_layout(len: usize, n_tap: usize, ratio: usize) -> DspResult<()> {
    if n_tap == 0 || ratio == 0 {
        return Err(DspError::InvalidArgument(format!(
            "polyphase layout needs nonzero taps and ratio, got {n_tap} x {ratio}"
        )));
    }
    let expected = n_tap
        .checked_mul(ratio)
        .ok_or_else(|| DspError::InvalidArgument("polyphase table size overflows".into()))?;
    ensure_len(expected, len)
}

/// Bitset over slot indices.
struct Visited(Vec<u64>);

impl Visited {
    fn new(len: usize) -> Self {
        Self(vec![0; len.div_ceil(64)])
    }

    fn contains(&self, i: usize) -> bool {
        self.0[i / 64] & (1 << (i % 64)) != 0
    }

    fn insert(&mut self, i: usize) {
        self.0[i / 64] |= 1 << (i % 64);
    }
}

/// Reorder `n_tap * ratio` prototype coefficients into sub-filter order.
///
/// The coefficient at index `i` moves to `n_tap * (i % ratio) + i / ratio`.
/// Each cycle of that permutation is followed once; visited slots are
/// tracked in a bitset, so any coefficient values are allowed.
pub fn coefsort<W: Word, const F: u32>(
    coefs: &mut [Fixed<W, F>],
    n_tap: usize,
    ratio: usize,
) -> DspResult<()> {
    check_layout(coefs.len(), n_tap, ratio)?;
    let target = |i: usize| n_tap * (i % ratio) + i / ratio;

    let mut visited = Visited::new(coefs.len());
    let mut cycles = 0usize;
    for start in 0..coefs.len() {
        if visited.contains(start) {
            continue;
        }
        visited.insert(start);
        if target(start) == start {
            continue;
        }

        cycles += 1;
        let mut carried = coefs[start];
        let mut i = target(start);
        while i != start {
            visited.insert(i);
            std::mem::swap(&mut carried, &mut coefs[i]);
            i = target(i);
        }
        coefs[start] = carried;
    }

    debug!(n_tap, ratio, cycles, "polyphase coefficients reordered");
    Ok(())
}

/// Scale sorted coefficients so the largest sub-filter absolute sum stays
/// below 1.0, keeping interpolated outputs inside the format.
pub fn normalize_polyphase<W: Word, const F: u32>(
    coefs: &mut [Fixed<W, F>],
    n_tap: usize,
    ratio: usize,
) -> DspResult<()> {
    check_layout(coefs.len(), n_tap, ratio)?;
    let largest = coefs
        .chunks_exact(n_tap)
        .map(|sub| sub.iter().map(|c| c.raw().to_i64().abs()).sum::<i64>())
        .max()
        .unwrap_or(0);
    let divisor = largest as i128 + 1;

    for c in coefs.iter_mut() {
        let scaled = ((c.raw().to_i64() as i128) << F) / divisor;
        *c = Fixed::saturating_from_raw(scaled as i64);
    }
    debug!(largest, "polyphase coefficients normalized");
    Ok(())
}

/// Interpolate by `ratio` with coefsorted coefficients `h`.
///
/// `x` starts with `n_tap - 1` history samples, where
/// `n_tap = h.len() / ratio`. Each remaining input sample produces `ratio`
/// outputs: output `n * ratio + k` is sub-filter `k` applied at input `n`.
pub fn interpolate<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    h: &[Fixed<W, F>],
    ratio: usize,
) -> DspResult<()> {
    interpolate_with::<Generic, W, F>(out, x, h, ratio)
}

/// [`interpolate`] through a chosen kernel provider.
pub fn interpolate_with<K: Kernels, W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    h: &[Fixed<W, F>],
    ratio: usize,
) -> DspResult<()> {
    if ratio == 0 || h.is_empty() || h.len() % ratio != 0 {
        return Err(DspError::InvalidArgument(format!(
            "{} coefficients do not split into {ratio} sub-filters",
            h.len()
        )));
    }
    let n_tap = h.len() / ratio;
    let size = x.len().checked_sub(n_tap - 1).ok_or(DspError::InsufficientData {
        needed: n_tap - 1,
        got: x.len(),
    })?;
    ensure_len(size * ratio, out.len())?;

    for (n, phases) in out.chunks_exact_mut(ratio).enumerate() {
        let window = &x[n..n + n_tap];
        for (sample, sub) in phases.iter_mut().zip(h.chunks_exact(n_tap)) {
            *sample = narrow_sum(K::dot_reversed(window, sub));
        }
    }
    Ok(())
}

/// Streaming interpolator owning sorted coefficients and input history.
#[derive(Clone, Debug)]
pub struct Interpolator<W: Word, const F: u32> {
    coefs: Vec<Fixed<W, F>>,
    n_tap: usize,
    ratio: usize,
    history: Vec<Fixed<W, F>>,
    scratch: Vec<Fixed<W, F>>,
}

impl<W: Word, const F: u32> Interpolator<W, F> {
    /// Build from a prototype filter in natural order.
    pub fn new(mut prototype: Vec<Fixed<W, F>>, n_tap: usize, ratio: usize) -> DspResult<Self> {
        coefsort(&mut prototype, n_tap, ratio)?;
        Ok(Self {
            coefs: prototype,
            n_tap,
            ratio,
            history: vec![Fixed::ZERO; n_tap - 1],
            scratch: Vec::new(),
        })
    }

    /// Design a windowed-sinc prototype for input rate `fs`, cut off at
    /// `fs / 2`, then sort and normalize it.
    pub fn design(n_tap: usize, ratio: usize, fs: u32) -> DspResult<Self> {
        check_layout(n_tap.saturating_mul(ratio), n_tap, ratio)?;
        let rate = u32::try_from(ratio)
            .ok()
            .and_then(|r| fs.checked_mul(r))
            .ok_or_else(|| DspError::InvalidArgument("interpolated rate overflows".into()))?;

        let mut prototype = vec![Fixed::ZERO; n_tap * ratio];
        lp_fir_design(&mut prototype, fs / 2, rate)?;
        let mut interpolator = Self::new(prototype, n_tap, ratio)?;
        normalize_polyphase(&mut interpolator.coefs, n_tap, ratio)?;
        Ok(interpolator)
    }

    /// Sub-filter coefficients, sub-filter `k` at `k * n_tap..(k + 1) * n_tap`.
    pub fn coefficients(&self) -> &[Fixed<W, F>] {
        &self.coefs
    }

    pub fn ratio(&self) -> usize {
        self.ratio
    }

    /// Interpolate one block; `out.len()` is `input.len() * ratio`.
    pub fn process(&mut self, input: &[Fixed<W, F>], out: &mut [Fixed<W, F>]) -> DspResult<()> {
        self.process_with::<Generic>(input, out)
    }

    pub fn process_with<K: Kernels>(
        &mut self,
        input: &[Fixed<W, F>],
        out: &mut [Fixed<W, F>],
    ) -> DspResult<()> {
        ensure_len(input.len() * self.ratio, out.len())?;
        if input.is_empty() {
            return Ok(());
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.history);
        self.scratch.extend_from_slice(input);
        interpolate_with::<K, W, F>(out, &self.scratch, &self.coefs, self.ratio)?;

        let keep = self.scratch.len() - (self.n_tap - 1);
        self.history.copy_from_slice(&self.scratch[keep..]);
        Ok(())
    }

    pub fn reset(&mut self) {
        self.history.fill(Fixed::ZERO);
    }
}
