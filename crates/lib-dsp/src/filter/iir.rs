//! Infinite impulse response filtering.
//!
//! The difference equation is
//!
//! ```text
//! y[n] = sum(num[m] * x[n - m]) - sum(den[m] * y[n - 1 - m])
//! ```
//!
//! with the leading `a0 = 1` of the denominator implied. Coefficients
//! larger than the format allows are stored divided by `2^prediv`; each
//! sum is scaled back by its own pre-division before the subtraction.

use crate::error::{DspError, DspResult};
use crate::kernels::{Generic, Kernels};
use lib_fixed::{Fixed, Word};

fn check_prediv<const F: u32>(prediv: u32, name: &str) -> DspResult<()> {
    if prediv > F {
        return Err(DspError::InvalidArgument(format!(
            "{name} pre-division {prediv} exceeds the {F} fractional bits"
        )));
    }
    Ok(())
}

/// IIR filter over buffers with history.
///
/// `x` starts with `num.len() - 1` history samples and `y` with
/// `den.len()` history samples. The outputs are written to
/// `y[den.len()..]`; their count is `y.len() - den.len()` and must equal
/// `x.len() - num.len() + 1`.
///
/// # Errors
///
/// `InvalidArgument` for an empty numerator or a pre-division above `F`,
/// `InsufficientData` when `y` cannot hold the denominator history,
/// `LengthMismatch` when `x` and `y` disagree on the output count.
pub fn iir<W: Word, const F: u32>(
    y: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    num: &[Fixed<W, F>],
    num_prediv: u32,
    den: &[Fixed<W, F>],
    den_prediv: u32,
) -> DspResult<()> {
    iir_with::<Generic, W, F>(y, x, num, num_prediv, den, den_prediv)
}

/// [`iir`] through a chosen kernel provider.
pub fn iir_with<K: Kernels, W: Word, const F: u32>(
    y: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    num: &[Fixed<W, F>],
    num_prediv: u32,
    den: &[Fixed<W, F>],
    den_prediv: u32,
) -> DspResult<()> {
    if num.is_empty() {
        return Err(DspError::InvalidArgument("IIR numerator is empty".into()));
    }
    check_prediv::<F>(num_prediv, "numerator")?;
    check_prediv::<F>(den_prediv, "denominator")?;

    let order = den.len();
    let size = y.len().checked_sub(order).ok_or(DspError::InsufficientData {
        needed: order,
        got: y.len(),
    })?;
    if x.len() + 1 < num.len() {
        return Err(DspError::InsufficientData {
            needed: num.len() - 1,
            got: x.len(),
        });
    }
    if x.len() + 1 - num.len() != size {
        return Err(DspError::LengthMismatch {
            expected: size + num.len() - 1,
            actual: x.len(),
        });
    }

    let num_shift = F - num_prediv;
    let den_shift = F - den_prediv;
    for n in 0..size {
        let forward = K::dot_reversed(&x[n..n + num.len()], num) >> num_shift;
        let feedback = K::dot_reversed(&y[n..n + order], den) >> den_shift;
        y[n + order] = Fixed::wrapping_from_raw(forward.wrapping_sub(feedback));
    }
    Ok(())
}

/// IIR filter over one block with no output history.
///
/// `x` starts with `num.len() - 1` history samples like [`iir`], and
/// `y.len()` must be `x.len() - num.len() + 1`. Outputs before the start of
/// `y` are taken as zero, so the first `den.len()` outputs only see the
/// feedback terms that fall inside the block.
pub fn iir_part<W: Word, const F: u32>(
    y: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    num: &[Fixed<W, F>],
    num_prediv: u32,
    den: &[Fixed<W, F>],
    den_prediv: u32,
) -> DspResult<()> {
    iir_part_with::<Generic, W, F>(y, x, num, num_prediv, den, den_prediv)
}

/// [`iir_part`] through a chosen kernel provider.
pub fn iir_part_with<K: Kernels, W: Word, const F: u32>(
    y: &mut [Fixed<W, F>],
    x: &[Fixed<W, F>],
    num: &[Fixed<W, F>],
    num_prediv: u32,
    den: &[Fixed<W, F>],
    den_prediv: u32,
) -> DspResult<()> {
    let mut full = vec![Fixed::ZERO; den.len() + y.len()];
    iir_with::<K, W, F>(&mut full, x, num, num_prediv, den, den_prediv)?;
    y.copy_from_slice(&full[den.len()..]);
    Ok(())
}

/// Streaming IIR filter owning both history lines.
#[derive(Clone, Debug)]
pub struct IirFilter<W: Word, const F: u32> {
    num: Vec<Fixed<W, F>>,
    num_prediv: u32,
    den: Vec<Fixed<W, F>>,
    den_prediv: u32,
    x: Vec<Fixed<W, F>>,
    y: Vec<Fixed<W, F>>,
}

impl<W: Word, const F: u32> IirFilter<W, F> {
    pub fn new(
        num: Vec<Fixed<W, F>>,
        num_prediv: u32,
        den: Vec<Fixed<W, F>>,
        den_prediv: u32,
    ) -> DspResult<Self> {
        if num.is_empty() {
            return Err(DspError::InvalidArgument("IIR numerator is empty".into()));
        }
        check_prediv::<F>(num_prediv, "numerator")?;
        check_prediv::<F>(den_prediv, "denominator")?;
        let x = vec![Fixed::ZERO; num.len() - 1];
        let y = vec![Fixed::ZERO; den.len()];
        Ok(Self {
            num,
            num_prediv,
            den,
            den_prediv,
            x,
            y,
        })
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
        crate::error::ensure_len(input.len(), out.len())?;
        let x_history = self.num.len() - 1;
        let order = self.den.len();

        self.x.truncate(x_history);
        self.x.extend_from_slice(input);
        self.y.truncate(order);
        self.y.resize(order + input.len(), Fixed::ZERO);

        iir_with::<K, W, F>(
            &mut self.y,
            &self.x,
            &self.num,
            self.num_prediv,
            &self.den,
            self.den_prediv,
        )?;
        out.copy_from_slice(&self.y[order..]);

        // Keep the tails as the next block's history.
        self.x.drain(..input.len());
        self.y.drain(..input.len());
        Ok(())
    }

    pub fn reset(&mut self) {
        self.x.fill(Fixed::ZERO);
        self.y.fill(Fixed::ZERO);
    }
}
