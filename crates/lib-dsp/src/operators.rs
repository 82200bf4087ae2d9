//! Elementary operators on Q-format values.
//!
//! Every operator is generic over the storage word and the fractional bit
//! count. The word picks the accuracy (iteration count, polynomial degree);
//! intermediate work happens in [`crate::wide`] precision and the result is
//! rounded once into the caller's format.
//!
//! Domain errors are answered with sentinels, never with `Err`:
//!
//! | operator            | input           | result                         |
//! |---------------------|-----------------|--------------------------------|
//! | `sqrt`              | `x < 0`         | `0`                            |
//! | `ln`/`log2`/`log10` | `x <= 0`        | `MIN`                          |
//! | `pow`               | `x < 0`         | `MIN`                          |
//! | `asin`/`acos`       | outside [-1, 1] | value at the nearer end        |
//! | `div`               | `den == 0`      | `MAX` or `MIN` by numerator sign |
//!
//! Results that do not fit the format clamp to `[MIN, MAX]`.
//!
//! Angles use half-turn units: the real range `[-1, 1)` covers `[-pi, pi)`.
//!
//! Formats with up to 31 integer bits are supported; large inputs are
//! decomposed into a mantissa and a power of two, so the scratch range
//! never limits the input.

use crate::wide;
use lib_fixed::{Fixed, Word};
use tracing::warn;

/// Square root. Negative input returns 0.
pub fn sqrt<W: Word, const F: u32>(x: Fixed<W, F>) -> Fixed<W, F> {
    if x.raw() <= W::ZERO {
        return Fixed::ZERO;
    }
    // Even exponent so that it halves exactly.
    let (mut m, mut e) = wide::split(x);
    if e % 2 != 0 {
        m <<= 1;
        e -= 1;
    }
    let (root, k) = wide::sqrt_parts(m, W::SQRT_ITERATIONS);
    wide::to_fixed_exp(root, k + e / 2)
}

/// `ln(x)` in scratch precision for positive `x`.
fn ln_wide<W: Word, const F: u32>(x: Fixed<W, F>) -> i64 {
    let (m, e) = wide::split(x);
    wide::ln(m, W::LN_TERMS) + e as i64 * wide::LN_2
}

/// Natural logarithm scaled by `2^F` but not narrowed to the word.
///
/// Returns `i64::MIN` for non-positive input. [`ln`], [`log2`] and
/// [`log10`] clamp this into the format.
pub fn ln_raw<W: Word, const F: u32>(x: Fixed<W, F>) -> i64 {
    if x.raw() <= W::ZERO {
        return i64::MIN;
    }
    let shift = wide::FRAC - F;
    (ln_wide(x) + (1 << (shift - 1))) >> shift
}

fn log_scaled<W: Word, const F: u32>(x: Fixed<W, F>, factor: Option<i64>) -> Fixed<W, F> {
    if x.raw() <= W::ZERO {
        return Fixed::MIN;
    }
    let value = ln_wide(x);
    match factor {
        Some(factor) => wide::to_fixed(wide::mul(value, factor)),
        None => wide::to_fixed(value),
    }
}

/// Natural logarithm. Non-positive input returns `MIN`.
pub fn ln<W: Word, const F: u32>(x: Fixed<W, F>) -> Fixed<W, F> {
    log_scaled(x, None)
}

/// Base-2 logarithm, `ln(x) / ln(2)`. Non-positive input returns `MIN`.
pub fn log2<W: Word, const F: u32>(x: Fixed<W, F>) -> Fixed<W, F> {
    log_scaled(x, Some(wide::INV_LN_2))
}

/// Base-10 logarithm. Non-positive input returns `MIN`.
pub fn log10<W: Word, const F: u32>(x: Fixed<W, F>) -> Fixed<W, F> {
    log_scaled(x, Some(wide::INV_LN_10))
}

/// `e^x` for a scratch argument of any size, rounded into the format.
fn exp_wide<W: Word, const F: u32>(x: i128) -> Fixed<W, F> {
    let limit = wide::EXP_LIMIT as i128;
    let (p, k) = wide::exp_parts(x.clamp(-limit, limit) as i64);
    wide::to_fixed_exp(p, k)
}

/// Exponential, clamped to `MAX` and flushed to 0 below the resolution.
pub fn exp<W: Word, const F: u32>(x: Fixed<W, F>) -> Fixed<W, F> {
    exp_wide(wide::from_fixed(x) as i128)
}

/// `x^y = exp(y * ln(x))`. Negative `x` returns `MIN`, zero returns 0.
pub fn pow<W: Word, const F: u32>(x: Fixed<W, F>, y: Fixed<W, F>) -> Fixed<W, F> {
    if x.is_negative() {
        return Fixed::MIN;
    }
    if x.raw() == W::ZERO {
        return Fixed::ZERO;
    }
    let (m, e) = wide::split(y);
    exp_wide((wide::mul(m, ln_wide(x)) as i128) << e)
}

/// Sine of an angle in half-turns, any angle accepted (taken modulo one turn).
pub fn sin<W: Word, const F: u32>(angle: Fixed<W, F>) -> Fixed<W, F> {
    wide::to_fixed(wide::sin::<W>(wide::from_fixed_mod(angle, 1)))
}

/// Cosine of an angle in half-turns, `cos(a) = sin(a + 0.5)`.
pub fn cos<W: Word, const F: u32>(angle: Fixed<W, F>) -> Fixed<W, F> {
    wide::to_fixed(wide::cos::<W>(wide::from_fixed_mod(angle, 1)))
}

/// Arc sine in half-turns: the result in `[-0.5, 0.5]` covers
/// `[-pi/2, pi/2]`. Input beyond `[-1, 1]` is clamped, so the result
/// stays at the ends of the range.
pub fn asin<W: Word, const F: u32>(x: Fixed<W, F>) -> Fixed<W, F> {
    wide::to_fixed(asin_wide(x))
}

/// Arc cosine in half-turns, `acos(x) = 0.5 - asin(x)`, in `[0, 1]`.
pub fn acos<W: Word, const F: u32>(x: Fixed<W, F>) -> Fixed<W, F> {
    wide::to_fixed(wide::HALF - asin_wide(x))
}

fn asin_wide<W: Word, const F: u32>(x: Fixed<W, F>) -> i64 {
    let unit = 1i64 << F;
    let raw = x.raw().to_i64().clamp(-unit, unit);
    let x = raw << (wide::FRAC - F);
    wide::asin(x, W::SQRT_ITERATIONS, W::ATAN_TERMS)
}

fn kernel_angle<W: Word, const F: u32>(angle: Fixed<W, F>) -> i64 {
    let a = wide::from_fixed(angle);
    if a.abs() > wide::QUARTER {
        warn!(
            angle = angle.to_f64(),
            "kernel angle outside [-0.25, 0.25] half-turns, clamping"
        );
        a.clamp(-wide::QUARTER, wide::QUARTER)
    } else {
        a
    }
}

/// Sine kernel for `[-0.25, 0.25]` half-turns (`[-pi/4, pi/4]`).
///
/// Angles outside the window are clamped to its edge. Use [`sin`] for
/// arbitrary angles.
pub fn kernel_sin<W: Word, const F: u32>(angle: Fixed<W, F>) -> Fixed<W, F> {
    wide::to_fixed(wide::sin_kernel(kernel_angle(angle), W::SIN_TERMS))
}

/// Cosine kernel for `[-0.25, 0.25]` half-turns, clamping like [`kernel_sin`].
pub fn kernel_cos<W: Word, const F: u32>(angle: Fixed<W, F>) -> Fixed<W, F> {
    wide::to_fixed(wide::cos_kernel(kernel_angle(angle), W::COS_TERMS))
}

/// Absolute value (wrapping at `MIN`).
#[inline]
pub fn abs<W: Word, const F: u32>(x: Fixed<W, F>) -> Fixed<W, F> {
    x.abs()
}

/// Renormalizing multiply through the double-width word.
#[inline]
pub fn mul<W: Word, const F: u32>(a: Fixed<W, F>, b: Fixed<W, F>) -> Fixed<W, F> {
    a.mul(b)
}

/// Division, saturating on a zero denominator.
#[inline]
pub fn div<W: Word, const F: u32>(num: Fixed<W, F>, den: Fixed<W, F>) -> Fixed<W, F> {
    num.div(den)
}

/// Smaller of two values.
#[inline]
pub fn min<W: Word, const F: u32>(a: Fixed<W, F>, b: Fixed<W, F>) -> Fixed<W, F> {
    a.min(b)
}

/// Larger of two values.
#[inline]
pub fn max<W: Word, const F: u32>(a: Fixed<W, F>, b: Fixed<W, F>) -> Fixed<W, F> {
    a.max(b)
}
