//! Storage words backing the fixed-point types.
//!
//! A [`Word`] is the signed integer a Q-format value lives in. Each word
//! multiplies and divides through its double-width partner (`i32` for
//! `i16`, `i64` for `i32`) so the `2 * QB` fractional bits of an
//! intermediate product never overflow before the renormalizing shift.
//!
//! The word also carries the per-width accuracy knobs of the elementary
//! operators: a 16-bit result needs fewer Newton iterations and shorter
//! polynomials than a 32-bit one.

use std::fmt::Debug;
use std::hash::Hash;

/// Signed storage integer of a fixed-point format.
pub trait Word: Copy + Debug + Default + Eq + Ord + Hash + Send + Sync + 'static {
    /// Total bit width.
    const BITS: u32;

    /// Most negative storable value (`Q_MIN` of every format on this word).
    const MIN: Self;

    /// Most positive storable value (`Q_MAX` of every format on this word).
    const MAX: Self;

    const ZERO: Self;

    /// Reciproot iterations used by the square root.
    const SQRT_ITERATIONS: usize;

    /// Odd terms of the atanh series used by the logarithm.
    const LN_TERMS: usize;

    /// Odd terms of the sine kernel polynomial (`x`, `x^3`, ...).
    const SIN_TERMS: usize;

    /// Even terms of the cosine kernel polynomial (`1`, `x^2`, ...).
    const COS_TERMS: usize;

    /// Odd terms of the arc tangent series behind the arc sine.
    const ATAN_TERMS: usize;

    /// Sign-extend into an `i64`.
    fn to_i64(self) -> i64;

    /// Truncating narrow: keeps the low `BITS` bits, like a C cast.
    fn wrap_i64(value: i64) -> Self;

    /// Clamping narrow.
    fn saturate_i64(value: i64) -> Self;

    /// `(a * b) >> shift` in double width, narrowed with wraparound.
    fn mul_shift(a: Self, b: Self, shift: u32) -> Self;

    /// `(num << shift) / den` in double width, clamped to the word.
    ///
    /// A zero denominator yields `MAX` for a non-negative numerator and
    /// `MIN` otherwise.
    fn div_shift(num: Self, den: Self, shift: u32) -> Self;

    fn wrapping_add(self, rhs: Self) -> Self;

    fn wrapping_sub(self, rhs: Self) -> Self;

    fn wrapping_neg(self) -> Self;
}

macro_rules! impl_word {
    (
        $word:ty,
        $wide:ty,
        sqrt = $sqrt:expr,
        ln = $ln:expr,
        sin = $sin:expr,
        cos = $cos:expr,
        atan = $atan:expr
    ) => {
        impl Word for $word {
            const BITS: u32 = <$word>::BITS;
            const MIN: Self = <$word>::MIN;
            const MAX: Self = <$word>::MAX;
            const ZERO: Self = 0;
            const SQRT_ITERATIONS: usize = $sqrt;
            const LN_TERMS: usize = $ln;
            const SIN_TERMS: usize = $sin;
            const COS_TERMS: usize = $cos;
            const ATAN_TERMS: usize = $atan;

            #[inline]
            fn to_i64(self) -> i64 {
                self as i64
            }

            #[inline]
            fn wrap_i64(value: i64) -> Self {
                value as $word
            }

            #[inline]
            fn saturate_i64(value: i64) -> Self {
                value.clamp(<$word>::MIN as i64, <$word>::MAX as i64) as $word
            }

            #[inline]
            fn mul_shift(a: Self, b: Self, shift: u32) -> Self {
                (((a as $wide) * (b as $wide)) >> shift) as $word
            }

            #[inline]
            fn div_shift(num: Self, den: Self, shift: u32) -> Self {
                if den == 0 {
                    return if num >= 0 { <$word>::MAX } else { <$word>::MIN };
                }
                let quotient = ((num as $wide) << shift) / (den as $wide);
                quotient.clamp(<$word>::MIN as $wide, <$word>::MAX as $wide) as $word
            }

            #[inline]
            fn wrapping_add(self, rhs: Self) -> Self {
                <$word>::wrapping_add(self, rhs)
            }

            #[inline]
            fn wrapping_sub(self, rhs: Self) -> Self {
                <$word>::wrapping_sub(self, rhs)
            }

            #[inline]
            fn wrapping_neg(self) -> Self {
                <$word>::wrapping_neg(self)
            }
        }
    };
}

// 16-bit: 3 Reciproot iterations, 5th-order sine, degree-4 logarithm series.
impl_word!(i16, i32, sqrt = 3, ln = 4, sin = 3, cos = 4, atan = 6);

// 32-bit: 6 Reciproot iterations, 13th-order sine, degree-6 logarithm series.
impl_word!(i32, i64, sqrt = 6, ln = 6, sin = 7, cos = 8, atan = 12);
