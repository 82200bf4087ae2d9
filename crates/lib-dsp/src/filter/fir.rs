//! Finite impulse response filtering.

use crate::error::{ensure_len, DspError, DspResult};
use crate::kernels::{Generic, Kernels};
use crate::vector::conv_part_with;
use lib_fixed::{CoefficientTable, Fixed, Word};

/// FIR filter over a buffer with history.
///
/// `x` starts with `h.len() - 1` history samples; `y.len()` must be
/// `x.len() - h.len() + 1`. This is the valid part of the convolution of
/// `x` with `h`.
pub fn fir<W: Word, const F: u32>(
    y: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    h: &[Fixed<W, F>],
) -> DspResult<()> {
    fir_with::<Generic, W, F>(y, x, h)
}

/// [`fir`] through a chosen kernel provider.
pub fn fir_with<K: Kernels, W: Word, const F: u32>(
    y: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    h: &[Fixed<W, F>],
) -> DspResult<()> {
    conv_part_with::<K, W, F>(y, x, h)
}

/// Streaming FIR filter that keeps its own history between blocks.
#[derive(Clone, Debug)]
pub struct FirFilter<W: Word, const F: u32> {
    taps: Vec<Fixed<W, F>>,
    history: Vec<Fixed<W, F>>,
    scratch: Vec<Fixed<W, F>>,
}

impl<W: Word, const F: u32> FirFilter<W, F> {
    /// Create a filter with zeroed history.
    pub fn new(taps: Vec<Fixed<W, F>>) -> DspResult<Self> {
        if taps.is_empty() {
            return Err(DspError::InvalidArgument("FIR filter needs at least one tap".into()));
        }
        let history = vec![Fixed::ZERO; taps.len() - 1];
        Ok(Self {
            taps,
            history,
            scratch: Vec::new(),
        })
    }

    /// Create a filter from a stored coefficient table.
    pub fn from_table(table: &CoefficientTable) -> DspResult<Self> {
        Self::new(table.to_fixed()?)
    }

    pub fn taps(&self) -> &[Fixed<W, F>] {
        &self.taps
    }

    /// Filter one block; `out` has the length of `input`.
    pub fn process(&mut self, input: &[Fixed<W, F>], out: &mut [Fixed<W, F>]) -> DspResult<()> {
        self.process_with::<Generic>(input, out)
    }

    pub fn process_with<K: Kernels>(
        &mut self,
        input: &[Fixed<W, F>],
        out: &mut [Fixed<W, F>],
    ) -> DspResult<()> {
        ensure_len(input.len(), out.len())?;
        if input.is_empty() {
            return Ok(());
        }

        self.scratch.clear();
        self.scratch.extend_from_slice(&self.history);
        self.scratch.extend_from_slice(input);
        fir_with::<K, W, F>(out, &self.scratch, &self.taps)?;

        let keep = self.scratch.len() - self.history.len();
        self.history.copy_from_slice(&self.scratch[keep..]);
        Ok(())
    }

    /// Zero the history.
    pub fn reset(&mut self) {
        self.history.fill(Fixed::ZERO);
    }
}
