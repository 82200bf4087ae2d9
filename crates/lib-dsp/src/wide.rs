//! Extended-precision scratch arithmetic for the elementary operators.
//!
//! Operators evaluate their iterations and polynomials on `i64` values with
//! 48 fractional bits (range +-32768) and round once into the caller's
//! Q-format at the end. Products go through `i128`.
//!
//! Formats with more than 16 integer bits do not embed in that range. The
//! operators take such values apart with [`split`] into a mantissa below 1
//! and a binary exponent, work on the mantissa, and fold the exponent back
//! in with [`to_fixed_exp`]. Angles are reduced modulo one turn on the raw
//! value before they enter scratch precision.

use lib_fixed::{quantize, Fixed, Word};

pub(crate) const FRAC: u32 = 48;
pub(crate) const ONE: i64 = 1 << FRAC;
pub(crate) const HALF: i64 = ONE / 2;
pub(crate) const QUARTER: i64 = ONE / 4;

const fn c(value: f64) -> i64 {
    quantize(value, FRAC)
}

pub(crate) const PI: i64 = c(std::f64::consts::PI);
pub(crate) const LN_2: i64 = c(std::f64::consts::LN_2);
pub(crate) const INV_LN_2: i64 = c(std::f64::consts::LOG2_E);
pub(crate) const INV_LN_10: i64 = c(std::f64::consts::LOG10_E);
pub(crate) const INV_PI: i64 = c(std::f64::consts::FRAC_1_PI);
const SQRT_2: i64 = c(std::f64::consts::SQRT_2);
const TAN_PI_8: i64 = c(0.414_213_562_373_095_03);

/// Largest exponent argument magnitude; `e^64` overflows and `e^-64`
/// underflows every format.
pub(crate) const EXP_LIMIT: i64 = 64 * ONE;

/// Odd Taylor coefficients of `sin(x)`.
const SIN_TAYLOR: [i64; 7] = [
    c(1.0),
    c(-1.0 / 6.0),
    c(1.0 / 120.0),
    c(-1.0 / 5040.0),
    c(1.0 / 362_880.0),
    c(-1.0 / 39_916_800.0),
    c(1.0 / 6_227_020_800.0),
];

/// Degree-5 Chebyshev economization of the degree-7 series over [-pi/4, pi/4].
const SIN_ECONOMIZED: [i64; 3] = [
    c(0.999_994_906_376_766_8),
    c(-0.166_600_606_898_984_1),
    c(0.008_119_149_210_045_805),
];

/// Even Taylor coefficients of `cos(x)`.
const COS_TAYLOR: [i64; 8] = [
    c(1.0),
    c(-1.0 / 2.0),
    c(1.0 / 24.0),
    c(-1.0 / 720.0),
    c(1.0 / 40_320.0),
    c(-1.0 / 3_628_800.0),
    c(1.0 / 479_001_600.0),
    c(-1.0 / 87_178_291_200.0),
];

const EXP_TERMS: i64 = 14;

/// Rounded product.
#[inline]
pub(crate) fn mul(a: i64, b: i64) -> i64 {
    ((a as i128 * b as i128 + (1i128 << (FRAC - 1))) >> FRAC) as i64
}

/// Truncating quotient; `den` must be nonzero.
#[inline]
pub(crate) fn div(num: i64, den: i64) -> i64 {
    (((num as i128) << FRAC) / den as i128) as i64
}

/// Scratch value of `x`, saturated to the scratch range.
#[inline]
pub(crate) fn from_fixed<W: Word, const F: u32>(x: Fixed<W, F>) -> i64 {
    let shift = FRAC - F;
    let limit = i64::MAX >> shift;
    x.raw().to_i64().clamp(!limit, limit) << shift
}

/// `x` modulo `2^k` in scratch precision, in `[0, 2^k)`.
#[inline]
pub(crate) fn from_fixed_mod<W: Word, const F: u32>(x: Fixed<W, F>, k: u32) -> i64 {
    x.raw().to_i64().rem_euclid(1 << (F + k)) << (FRAC - F)
}

/// `x = m * 2^e` with `|m| < 1` in scratch precision and `e >= 0`.
#[inline]
pub(crate) fn split<W: Word, const F: u32>(x: Fixed<W, F>) -> (i64, i32) {
    let m = x.raw().to_i64() << (FRAC + 1 - W::BITS);
    (m, (W::BITS - 1 - F) as i32)
}

/// Round to nearest and clamp into the target format.
#[inline]
pub(crate) fn to_fixed<W: Word, const F: u32>(value: i64) -> Fixed<W, F> {
    to_fixed_exp(value, 0)
}

/// Round `value * 2^exp` to nearest and clamp into the target format.
pub(crate) fn to_fixed_exp<W: Word, const F: u32>(value: i64, exp: i32) -> Fixed<W, F> {
    let shift = FRAC as i32 - F as i32 - exp;
    let value = value as i128;
    let scaled = match shift {
        s if s > 100 => 0,
        s if s > 0 => (value + (1i128 << (s - 1))) >> s,
        s if value == 0 || s >= -64 => value << -s,
        _ => value.signum() << 64,
    };
    let clamped = scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64;
    Fixed::saturating_from_raw(clamped)
}

/// `x * w` for a weight `|w| <= 1`, rounding toward negative infinity.
#[inline]
pub(crate) fn scale<W: Word, const F: u32>(x: Fixed<W, F>, w: i64) -> Fixed<W, F> {
    let product = (x.raw().to_i64() as i128 * w as i128) >> FRAC;
    Fixed::wrapping_from_raw(product as i64)
}

/// Position of the most significant set bit of a positive value.
#[inline]
fn msb(x: i64) -> i32 {
    63 - x.leading_zeros() as i32
}

/// Square root of a positive value through the reciprocal square root.
///
/// `x` is normalized to `n = x / 4^k` in `[0.25, 1)`, `1/sqrt(n)` is refined
/// from a linear first guess with `y = y * (1.5 - 0.5 * n * y^2)`, and the
/// result is `n * y * 2^k`, returned as the pair `(n * y, k)`.
pub(crate) fn sqrt_parts(x: i64, iterations: usize) -> (i64, i32) {
    if x <= 0 {
        return (0, 0);
    }

    // x lies in [2^(m-1), 2^m) in real terms.
    let m = msb(x) - FRAC as i32 + 1;
    let k = (m + 1).div_euclid(2);
    let n = if k >= 0 { x >> (2 * k) } else { x << (-2 * k) };

    let mut y = c(2.2068) - mul(c(1.3333), n);
    for _ in 0..iterations {
        let half_n_y2 = mul(n, mul(y, y)) >> 1;
        y = mul(y, c(1.5) - half_n_y2);
    }

    (mul(n, y), k)
}

pub(crate) fn sqrt(x: i64, iterations: usize) -> i64 {
    let (root, k) = sqrt_parts(x, iterations);
    if k >= 0 {
        root << k
    } else {
        root >> -k
    }
}

/// Natural logarithm of a positive value.
///
/// `x = m * 2^k` with `m` in `[1/sqrt(2), sqrt(2))`, then
/// `ln(m) = 2 * atanh(a)` with `a = (m - 1) / (m + 1)` summed over `terms`
/// odd powers.
pub(crate) fn ln(x: i64, terms: usize) -> i64 {
    debug_assert!(x > 0);
    let mut k = msb(x) - FRAC as i32;
    let mut m = if k >= 0 { x >> k } else { x << -k };
    if m >= SQRT_2 {
        m >>= 1;
        k += 1;
    }

    let a = div(m - ONE, m + ONE);
    let a2 = mul(a, a);
    let mut sum = 0i64;
    for term in (0..terms as i64).rev() {
        sum = ONE / (2 * term + 1) + mul(sum, a2);
    }

    2 * mul(a, sum) + k as i64 * LN_2
}

/// `e^x = p * 2^k` with `p` in `[1/sqrt(2), sqrt(2)]`, for `|x| <= EXP_LIMIT`.
pub(crate) fn exp_parts(x: i64) -> (i64, i32) {
    let k = (x + LN_2 / 2).div_euclid(LN_2);
    let r = x - k * LN_2;

    let mut p = ONE;
    for n in (1..=EXP_TERMS).rev() {
        p = ONE + mul(p, r) / n;
    }
    (p, k as i32)
}

/// Exponential, saturating to `i64::MAX` beyond the scratch range.
pub(crate) fn exp(x: i64) -> i64 {
    let (p, k) = exp_parts(x.clamp(-EXP_LIMIT, EXP_LIMIT));
    match k {
        k if k >= 15 => i64::MAX,
        k if k >= 0 => p << k,
        k if k > -63 => p >> -k,
        _ => 0,
    }
}

/// Arc tangent in radians for `t` in `[-1, 1]`.
///
/// Arguments above `tan(pi/8)` use `atan(t) = pi/4 + atan((t - 1) / (t + 1))`,
/// leaving `|t| <= tan(pi/8)` for `terms` odd powers of the series.
pub(crate) fn atan(t: i64, terms: usize) -> i64 {
    let (sign, t) = if t < 0 { (-1, -t) } else { (1, t) };
    let (base, u) = if t > TAN_PI_8 {
        (PI / 4, div(t - ONE, t + ONE))
    } else {
        (0, t)
    };

    let u2 = mul(u, u);
    let mut sum = 0i64;
    for term in (0..terms as i64).rev() {
        let coef = ONE / (2 * term + 1);
        sum = if term % 2 == 0 { coef } else { -coef } + mul(sum, u2);
    }
    sign * (base + mul(u, sum))
}

/// `asin(x) / pi` in half-turns for `x` in `[-1, 1]`, through
/// `asin(x) = 2 * atan(x / (1 + sqrt(1 - x^2)))`.
pub(crate) fn asin(x: i64, sqrt_iterations: usize, atan_terms: usize) -> i64 {
    let x = x.clamp(-ONE, ONE);
    let t = div(x, ONE + sqrt(ONE - mul(x, x), sqrt_iterations));
    mul(2 * atan(t, atan_terms), INV_PI)
}

fn sin_coefficients(terms: usize) -> &'static [i64] {
    if terms == SIN_ECONOMIZED.len() {
        &SIN_ECONOMIZED
    } else {
        &SIN_TAYLOR[..terms.min(SIN_TAYLOR.len())]
    }
}

fn horner(coefs: &[i64], x2: i64) -> i64 {
    coefs.iter().rev().fold(0, |acc, &coef| coef + mul(acc, x2))
}

/// `sin(pi * a)` for `a` in `[-0.25, 0.25]` half-turns.
pub(crate) fn sin_kernel(a: i64, terms: usize) -> i64 {
    let theta = mul(a, PI);
    mul(horner(sin_coefficients(terms), mul(theta, theta)), theta)
}

/// `cos(pi * a)` for `a` in `[-0.25, 0.25]` half-turns.
pub(crate) fn cos_kernel(a: i64, terms: usize) -> i64 {
    let theta = mul(a, PI);
    horner(&COS_TAYLOR[..terms.min(COS_TAYLOR.len())], mul(theta, theta))
}

/// Reduce an angle into one turn, `[-1, 1)` half-turns.
#[inline]
pub(crate) fn wrap_turn(a: i64) -> i64 {
    (a + ONE).rem_euclid(2 * ONE) - ONE
}

/// `sin(pi * a)` over the full circle.
pub(crate) fn sin<W: Word>(a: i64) -> i64 {
    let t = wrap_turn(a);
    let (s, k) = (W::SIN_TERMS, W::COS_TERMS);
    if t < -3 * QUARTER {
        -sin_kernel(t + ONE, s)
    } else if t < -QUARTER {
        -cos_kernel(t + HALF, k)
    } else if t <= QUARTER {
        sin_kernel(t, s)
    } else if t <= 3 * QUARTER {
        cos_kernel(t - HALF, k)
    } else {
        -sin_kernel(t - ONE, s)
    }
}

/// `cos(pi * a)` over the full circle.
pub(crate) fn cos<W: Word>(a: i64) -> i64 {
    sin::<W>(wrap_turn(a) + HALF)
}
