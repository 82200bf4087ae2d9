//! Q-format fixed-point values with type-level formats.
//!
//! `Fixed<W, FRAC>` stores a [`Word`] `v` and represents the real value
//! `v / 2^FRAC`. The integer-bit count is `W::BITS - FRAC` (sign included),
//! so `Fixed<i16, 15>` is Q1.15 and `Fixed<i32, 24>` is Q8.24.
//!
//! Because the format is part of the type, mixing Q1.15 and Q4.12 values in
//! one operator is a compile error; converting between them is an explicit
//! [`Fixed::convert`].
//!
//! Arithmetic follows the fixed-width hardware it models: `+`, `-`, `*` and
//! unary `-` wrap on overflow. The `saturating_*` methods clamp instead.

use crate::word::Word;
use std::fmt;
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

/// Round-to-nearest scaling of a real number by `2^frac`.
///
/// Values beyond the `i64` range clamp (float-to-int casts saturate), NaN
/// maps to 0.
pub const fn quantize(value: f64, frac: u32) -> i64 {
    let scaled = value * (1u64 << frac) as f64;
    if scaled >= 0.0 {
        (scaled + 0.5) as i64
    } else {
        (scaled - 0.5) as i64
    }
}

const fn clamp_i64(value: i64, lo: i64, hi: i64) -> i64 {
    if value < lo {
        lo
    } else if value > hi {
        hi
    } else {
        value
    }
}

/// A signed fixed-point number stored in `W` with `FRAC` fractional bits.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct Fixed<W: Word, const FRAC: u32>(W);

/// 16-bit Q1.15, the library's default 16-bit format.
pub type Q15 = Fixed<i16, 15>;

/// 16-bit Q4.12.
pub type Q12 = Fixed<i16, 12>;

/// 32-bit Q1.31, the library's default 32-bit format.
pub type Q31 = Fixed<i32, 31>;

/// 32-bit Q8.24.
pub type Q24 = Fixed<i32, 24>;

impl<W: Word, const FRAC: u32> Fixed<W, FRAC> {
    const VALID: () = assert!(FRAC < W::BITS, "a Q-format needs at least the sign bit");

    /// Number of fractional bits (QB).
    pub const FRAC_BITS: u32 = FRAC;

    /// Number of integer bits including the sign (QA).
    pub const INT_BITS: u32 = W::BITS - FRAC;

    pub const ZERO: Self = Self(W::ZERO);

    /// `Q_MIN`: the most negative representable value.
    pub const MIN: Self = Self(W::MIN);

    /// `Q_MAX`: the most positive representable value.
    pub const MAX: Self = Self(W::MAX);

    /// Wrap a raw stored integer.
    #[inline]
    pub const fn from_raw(raw: W) -> Self {
        let () = Self::VALID;
        Self(raw)
    }

    /// The raw stored integer.
    #[inline]
    pub fn raw(self) -> W {
        self.0
    }

    /// The real value 1.0, saturated to `MAX` in formats without integer bits.
    #[inline]
    pub fn one() -> Self {
        Self::from_raw(W::saturate_i64(1i64 << FRAC))
    }

    /// `Q(value)`: round to nearest and clamp to `[MIN, MAX]`.
    pub fn from_f64(value: f64) -> Self {
        Self::from_raw(W::saturate_i64(quantize(value, FRAC)))
    }

    /// Integer value, clamped to the format range.
    pub fn from_int(value: i64) -> Self {
        let raw = match value.checked_mul(1i64 << FRAC) {
            Some(raw) => W::saturate_i64(raw),
            None if value < 0 => W::MIN,
            None => W::MAX,
        };
        Self::from_raw(raw)
    }

    /// Raw value taken from an `i64`, clamped to the word.
    #[inline]
    pub fn saturating_from_raw(raw: i64) -> Self {
        Self::from_raw(W::saturate_i64(raw))
    }

    /// Raw value taken from an `i64`, keeping the low bits.
    #[inline]
    pub fn wrapping_from_raw(raw: i64) -> Self {
        Self::from_raw(W::wrap_i64(raw))
    }

    pub fn to_f64(self) -> f64 {
        self.0.to_i64() as f64 / (1u64 << FRAC) as f64
    }

    /// Smallest positive step of the format, as a real number.
    pub fn resolution() -> f64 {
        1.0 / (1u64 << FRAC) as f64
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        self.0 < W::ZERO
    }

    #[inline]
    pub fn wrapping_add(self, rhs: Self) -> Self {
        Self(self.0.wrapping_add(rhs.0))
    }

    #[inline]
    pub fn wrapping_sub(self, rhs: Self) -> Self {
        Self(self.0.wrapping_sub(rhs.0))
    }

    #[inline]
    pub fn wrapping_neg(self) -> Self {
        Self(self.0.wrapping_neg())
    }

    #[inline]
    pub fn saturating_add(self, rhs: Self) -> Self {
        Self::saturating_from_raw(self.0.to_i64() + rhs.0.to_i64())
    }

    #[inline]
    pub fn saturating_sub(self, rhs: Self) -> Self {
        Self::saturating_from_raw(self.0.to_i64() - rhs.0.to_i64())
    }

    /// Renormalizing product: double-width multiply, `>> FRAC`, wrapping narrow.
    #[inline]
    pub fn mul(self, rhs: Self) -> Self {
        Self(W::mul_shift(self.0, rhs.0, FRAC))
    }

    /// Renormalizing product clamped to `[MIN, MAX]`.
    #[inline]
    pub fn saturating_mul(self, rhs: Self) -> Self {
        Self::saturating_from_raw((self.0.to_i64() * rhs.0.to_i64()) >> FRAC)
    }

    /// `(self << FRAC) / rhs` in double width, clamped.
    ///
    /// Division by zero returns `MAX` for a non-negative numerator, `MIN`
    /// otherwise.
    #[inline]
    pub fn div(self, rhs: Self) -> Self {
        Self(W::div_shift(self.0, rhs.0, FRAC))
    }

    /// Absolute value; `MIN` stays `MIN` as on the hardware.
    #[inline]
    pub fn abs(self) -> Self {
        if self.is_negative() {
            self.wrapping_neg()
        } else {
            self
        }
    }

    /// Multiply by an integer with wraparound.
    #[inline]
    pub fn wrapping_mul_int(self, factor: i32) -> Self {
        Self::wrapping_from_raw(self.0.to_i64().wrapping_mul(factor as i64))
    }

    /// Requantize into another format, rounding toward negative infinity
    /// when bits are dropped and clamping when the value does not fit.
    pub fn convert<V: Word, const G: u32>(self) -> Fixed<V, G> {
        let raw = self.0.to_i64();
        let raw = if G >= FRAC {
            let shift = G - FRAC;
            match raw.checked_mul(1i64 << shift) {
                Some(v) => v,
                None if raw < 0 => i64::MIN,
                None => i64::MAX,
            }
        } else {
            raw >> (FRAC - G)
        };
        Fixed::from_raw(V::saturate_i64(raw))
    }
}

impl<const FRAC: u32> Fixed<i16, FRAC> {
    /// Compile-time `Q(value)` for 16-bit formats.
    pub const fn q(value: f64) -> Self {
        let raw = clamp_i64(quantize(value, FRAC), i16::MIN as i64, i16::MAX as i64);
        Self::from_raw(raw as i16)
    }
}

impl<const FRAC: u32> Fixed<i32, FRAC> {
    /// Compile-time `Q(value)` for 32-bit formats.
    pub const fn q(value: f64) -> Self {
        let raw = clamp_i64(quantize(value, FRAC), i32::MIN as i64, i32::MAX as i64);
        Self::from_raw(raw as i32)
    }
}

impl<W: Word, const FRAC: u32> Add for Fixed<W, FRAC> {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        self.wrapping_add(rhs)
    }
}

impl<W: Word, const FRAC: u32> Sub for Fixed<W, FRAC> {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        self.wrapping_sub(rhs)
    }
}

impl<W: Word, const FRAC: u32> Mul for Fixed<W, FRAC> {
    type Output = Self;
    fn mul(self, rhs: Self) -> Self {
        Fixed::mul(self, rhs)
    }
}

impl<W: Word, const FRAC: u32> Div for Fixed<W, FRAC> {
    type Output = Self;
    fn div(self, rhs: Self) -> Self {
        Fixed::div(self, rhs)
    }
}

impl<W: Word, const FRAC: u32> Neg for Fixed<W, FRAC> {
    type Output = Self;
    fn neg(self) -> Self {
        self.wrapping_neg()
    }
}

impl<W: Word, const FRAC: u32> AddAssign for Fixed<W, FRAC> {
    fn add_assign(&mut self, rhs: Self) {
        *self = self.wrapping_add(rhs);
    }
}

impl<W: Word, const FRAC: u32> SubAssign for Fixed<W, FRAC> {
    fn sub_assign(&mut self, rhs: Self) {
        *self = self.wrapping_sub(rhs);
    }
}

impl<W: Word, const FRAC: u32> fmt::Debug for Fixed<W, FRAC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Q{}.{}({:?} = {})", Self::INT_BITS, FRAC, self.0, self.to_f64())
    }
}

impl<W: Word, const FRAC: u32> fmt::Display for Fixed<W, FRAC> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_f64(), f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_q_literals() {
        const HALF: Q15 = Q15::q(0.5);
        assert_eq!(HALF.raw(), 16384);
        assert_eq!(Q15::q(1.0), Q15::MAX);
        assert_eq!(Q15::q(-1.0), Q15::MIN);
        assert_eq!(Q12::q(1.0).raw(), 4096);
        assert_eq!(Q31::q(-0.25).raw(), -(1 << 29));
        assert_eq!(Q15::from_f64(0.5), HALF);
    }

    #[test]
    fn test_q_rounds_to_nearest() {
        // 0.1 * 32768 = 3276.8
        assert_eq!(Q15::from_f64(0.1).raw(), 3277);
        assert_eq!(Q15::from_f64(-0.1).raw(), -3277);
    }

    #[test]
    fn test_one_saturates_without_integer_bits() {
        assert_eq!(Q15::one(), Q15::MAX);
        assert_eq!(Q12::one().raw(), 4096);
        assert_eq!(Q31::one(), Q31::MAX);
        assert_eq!(Q24::one().raw(), 1 << 24);
    }

    #[test]
    fn test_mul_renormalizes() {
        let a = Q15::q(0.5);
        let b = Q15::q(-0.25);
        assert_eq!((a * b).raw(), Q15::q(-0.125).raw());
        assert_eq!((Q12::q(2.0) * Q12::q(1.5)).raw(), Q12::q(3.0).raw());
    }

    #[test]
    fn test_mul_wraps_and_saturating_mul_clamps() {
        assert_eq!(Q15::MIN * Q15::MIN, Q15::MIN);
        assert_eq!(Q15::MIN.saturating_mul(Q15::MIN), Q15::MAX);
    }

    #[test]
    fn test_div() {
        assert_eq!(Q15::q(0.25) / Q15::q(0.5), Q15::q(0.5));
        assert_eq!(Q15::q(0.25) / Q15::ZERO, Q15::MAX);
        assert_eq!(Q15::q(-0.25) / Q15::ZERO, Q15::MIN);
    }

    #[test]
    fn test_abs_of_min_wraps() {
        assert_eq!(Q15::q(-0.5).abs(), Q15::q(0.5));
        assert_eq!(Q15::MIN.abs(), Q15::MIN);
    }

    #[test]
    fn test_from_int_clamps() {
        assert_eq!(Q12::from_int(3).raw(), 3 * 4096);
        assert_eq!(Q12::from_int(100), Q12::MAX);
        assert_eq!(Q12::from_int(-100), Q12::MIN);
    }

    #[test]
    fn test_convert_between_formats() {
        let x = Q15::q(0.75);
        let y: Q12 = x.convert();
        assert_eq!(y.raw(), 3072);

        let z: Q31 = x.convert();
        assert_eq!(z.raw(), 3 << 29);

        let big = Q12::q(3.0);
        let clamped: Q15 = big.convert();
        assert_eq!(clamped, Q15::MAX);
    }

    #[test]
    fn test_debug_names_the_format() {
        let text = format!("{:?}", Q12::q(1.5));
        assert!(text.starts_with("Q4.12("));
    }
}
