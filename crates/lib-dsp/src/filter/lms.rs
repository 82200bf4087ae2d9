//! Least-mean-squares adaptive filters.
//!
//! Each call takes one new input sample and one desired sample, produces
//! the filter output `y` and the error `e = d - y`, and moves every weight
//! along `e * x[i]`. The step size is a power of two given by its shift
//! exponent `mu`: the LMS update is `(e * x[i]) >> (mu - 1 + F)`.
//!
//! The tap line `x` holds the newest sample at index 0. Weights are updated
//! from the line as it was when `y` was computed; the line shifts by one
//! position after the update.

use crate::error::{ensure_len, DspError, DspResult};
use crate::kernels::{Generic, Kernels};
use crate::vector::narrow_sum;
use lib_fixed::{Fixed, Word};
use tracing::trace;

/// Step-size exponent used by [`LmsFilter::new`].
pub const DEFAULT_LMS_MU: u32 = 4;

/// Step-size exponent used by [`NlmsFilter::new`].
pub const DEFAULT_NLMS_MU: u32 = 2;

fn check_line<W: Word, const F: u32>(
    x: &[Fixed<W, F>],
    w: &[Fixed<W, F>],
    mu: u32,
) -> DspResult<()> {
    ensure_len(x.len(), w.len())?;
    if x.is_empty() {
        return Err(DspError::InsufficientData { needed: 1, got: 0 });
    }
    if mu == 0 || mu.saturating_add(F) > 64 {
        return Err(DspError::InvalidArgument(format!("step-size exponent {mu} out of range")));
    }
    Ok(())
}

/// Insert `new_x` and compute output and error against `d`.
fn filter_step<K: Kernels, W: Word, const F: u32>(
    x: &mut [Fixed<W, F>],
    w: &[Fixed<W, F>],
    new_x: Fixed<W, F>,
    d: Fixed<W, F>,
) -> (Fixed<W, F>, Fixed<W, F>) {
    x[0] = new_x;
    let y = narrow_sum(K::dot(w, x));
    (y, d - y)
}

fn shift_line<W: Word, const F: u32>(x: &mut [Fixed<W, F>]) {
    let len = x.len();
    x.copy_within(..len - 1, 1);
}

/// One LMS iteration. Returns `(y, e)`.
///
/// # Errors
///
/// `LengthMismatch` when `x` and `w` differ in length, `InsufficientData`
/// for an empty tap line, `InvalidArgument` for `mu == 0`.
pub fn lms<W: Word, const F: u32>(
    x: &mut [Fixed<W, F>],
    w: &mut [Fixed<W, F>],
    new_x: Fixed<W, F>,
    d: Fixed<W, F>,
    mu: u32,
) -> DspResult<(Fixed<W, F>, Fixed<W, F>)> {
    lms_with::<Generic, W, F>(x, w, new_x, d, mu)
}

/// [`lms`] through a chosen kernel provider.
pub fn lms_with<K: Kernels, W: Word, const F: u32>(
    x: &mut [Fixed<W, F>],
    w: &mut [Fixed<W, F>],
    new_x: Fixed<W, F>,
    d: Fixed<W, F>,
    mu: u32,
) -> DspResult<(Fixed<W, F>, Fixed<W, F>)> {
    check_line(x, w, mu)?;
    let (y, e) = filter_step::<K, W, F>(x, w, new_x, d);

    let shift = mu - 1 + F;
    let err = e.raw().to_i64();
    for (weight, &sample) in w.iter_mut().zip(x.iter()) {
        let delta = (err * sample.raw().to_i64()) >> shift;
        *weight += Fixed::wrapping_from_raw(delta);
    }

    shift_line(x);
    Ok((y, e))
}

/// One normalized-LMS iteration. Returns `(y, e)`.
///
/// The update is divided by the tap-line energy `sum(x[i]^2)`, so the
/// step no longer scales with the input power. A line of zeros leaves
/// the weights unchanged.
pub fn nlms<W: Word, const F: u32>(
    x: &mut [Fixed<W, F>],
    w: &mut [Fixed<W, F>],
    new_x: Fixed<W, F>,
    d: Fixed<W, F>,
    mu: u32,
) -> DspResult<(Fixed<W, F>, Fixed<W, F>)> {
    nlms_with::<Generic, W, F>(x, w, new_x, d, mu)
}

/// [`nlms`] through a chosen kernel provider.
pub fn nlms_with<K: Kernels, W: Word, const F: u32>(
    x: &mut [Fixed<W, F>],
    w: &mut [Fixed<W, F>],
    new_x: Fixed<W, F>,
    d: Fixed<W, F>,
    mu: u32,
) -> DspResult<(Fixed<W, F>, Fixed<W, F>)> {
    check_line(x, w, mu)?;
    let (y, e) = filter_step::<K, W, F>(x, w, new_x, d);

    let energy = K::dot(x, x) >> F;
    if energy > 0 {
        let err = e.raw().to_i64() as i128;
        let energy = energy as i128;
        for (weight, &sample) in w.iter_mut().zip(x.iter()) {
            let delta = ((err * sample.raw().to_i64() as i128) / energy) >> (mu - 1);
            *weight += Fixed::wrapping_from_raw(delta as i64);
        }
    }

    shift_line(x);
    Ok((y, e))
}

/// LMS filter owning its tap line and weights.
#[derive(Clone, Debug)]
pub struct LmsFilter<W: Word, const F: u32> {
    x: Vec<Fixed<W, F>>,
    w: Vec<Fixed<W, F>>,
    mu: u32,
}

impl<W: Word, const F: u32> LmsFilter<W, F> {
    /// `taps` zero weights with [`DEFAULT_LMS_MU`].
    pub fn new(taps: usize) -> DspResult<Self> {
        Self::with_weights(vec![Fixed::ZERO; taps], DEFAULT_LMS_MU)
    }

    /// Start from `weights` with step exponent `mu`.
    pub fn with_weights(weights: Vec<Fixed<W, F>>, mu: u32) -> DspResult<Self> {
        let x = vec![Fixed::ZERO; weights.len()];
        check_line(&x, &weights, mu)?;
        Ok(Self { x, w: weights, mu })
    }

    /// Feed one sample pair; returns `(y, e)`.
    pub fn process(
        &mut self,
        new_x: Fixed<W, F>,
        d: Fixed<W, F>,
    ) -> DspResult<(Fixed<W, F>, Fixed<W, F>)> {
        let (y, e) = lms(&mut self.x, &mut self.w, new_x, d, self.mu)?;
        trace!(y = y.to_f64(), e = e.to_f64(), "lms step");
        Ok((y, e))
    }

    pub fn weights(&self) -> &[Fixed<W, F>] {
        &self.w
    }

    pub fn mu(&self) -> u32 {
        self.mu
    }

    /// Clear the tap line, keeping the weights.
    pub fn reset(&mut self) {
        self.x.fill(Fixed::ZERO);
    }
}

/// Normalized LMS filter owning its tap line and weights.
#[derive(Clone, Debug)]
pub struct NlmsFilter<W: Word, const F: u32> {
    x: Vec<Fixed<W, F>>,
    w: Vec<Fixed<W, F>>,
    mu: u32,
}

impl<W: Word, const F: u32> NlmsFilter<W, F> {
    /// `taps` zero weights with [`DEFAULT_NLMS_MU`].
    pub fn new(taps: usize) -> DspResult<Self> {
        Self::with_weights(vec![Fixed::ZERO; taps], DEFAULT_NLMS_MU)
    }

    pub fn with_weights(weights: Vec<Fixed<W, F>>, mu: u32) -> DspResult<Self> {
        let x = vec![Fixed::ZERO; weights.len()];
        check_line(&x, &weights, mu)?;
        Ok(Self { x, w: weights, mu })
    }

    pub fn process(
        &mut self,
        new_x: Fixed<W, F>,
        d: Fixed<W, F>,
    ) -> DspResult<(Fixed<W, F>, Fixed<W, F>)> {
        let (y, e) = nlms(&mut self.x, &mut self.w, new_x, d, self.mu)?;
        trace!(y = y.to_f64(), e = e.to_f64(), "nlms step");
        Ok((y, e))
    }

    pub fn weights(&self) -> &[Fixed<W, F>] {
        &self.w
    }

    pub fn mu(&self) -> u32 {
        self.mu
    }

    pub fn reset(&mut self) {
        self.x.fill(Fixed::ZERO);
    }
}
