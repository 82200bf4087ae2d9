//! Element-wise vector operators.
//!
//! Every operator processes exactly `out.len()` elements in input order and
//! checks that the inputs have that length. Arithmetic follows the scalar
//! semantics of [`Fixed`]: additions and integer multiplies wrap, products
//! renormalize through the double-width word, divisions saturate.
//!
//! Operators that write into a separate buffer take `(out, input, ...)`;
//! the `*_in_place` variants overwrite their first argument.

use crate::error::{ensure_len, DspError, DspResult};
use crate::kernels::{Generic, Kernels};
use crate::operators;
use lib_fixed::{Fixed, Word};

fn map<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    f: impl Fn(Fixed<W, F>) -> Fixed<W, F>,
) -> DspResult<()> {
    ensure_len(out.len(), a.len())?;
    for (o, &x) in out.iter_mut().zip(a) {
        *o = f(x);
    }
    Ok(())
}

fn zip_map<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
    f: impl Fn(Fixed<W, F>, Fixed<W, F>) -> Fixed<W, F>,
) -> DspResult<()> {
    ensure_len(out.len(), a.len())?;
    ensure_len(out.len(), b.len())?;
    for ((o, &x), &y) in out.iter_mut().zip(a).zip(b) {
        *o = f(x, y);
    }
    Ok(())
}

fn zip_in_place<W: Word, const F: u32>(
    acc: &mut [Fixed<W, F>],
    b: &[Fixed<W, F>],
    f: impl Fn(Fixed<W, F>, Fixed<W, F>) -> Fixed<W, F>,
) -> DspResult<()> {
    ensure_len(acc.len(), b.len())?;
    for (o, &y) in acc.iter_mut().zip(b) {
        *o = f(*o, y);
    }
    Ok(())
}

fn map_in_place<W: Word, const F: u32>(
    buf: &mut [Fixed<W, F>],
    f: impl Fn(Fixed<W, F>) -> Fixed<W, F>,
) {
    for x in buf.iter_mut() {
        *x = f(*x);
    }
}

fn int_quotient<W: Word, const F: u32>(x: Fixed<W, F>, divisor: i32) -> Fixed<W, F> {
    Fixed::wrapping_from_raw(x.raw().to_i64() / divisor as i64)
}

fn nonzero_divisor(divisor: i32) -> DspResult<()> {
    if divisor == 0 {
        return Err(DspError::InvalidArgument(
            "integer divisor must be nonzero".into(),
        ));
    }
    Ok(())
}

/// `out[i] = a[i] + b[i]`
pub fn add<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_map(out, a, b, |x, y| x + y)
}

/// `acc[i] += b[i]`
pub fn add_in_place<W: Word, const F: u32>(
    acc: &mut [Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_in_place(acc, b, |x, y| x + y)
}

/// `out[i] = a[i] + b[i]`, clamped to `[MIN, MAX]` instead of wrapping.
pub fn add_sat<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_map(out, a, b, |x, y| x.saturating_add(y))
}

pub fn add_sat_in_place<W: Word, const F: u32>(
    acc: &mut [Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_in_place(acc, b, |x, y| x.saturating_add(y))
}

/// `out[i] = a[i] - b[i]`
pub fn sub<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_map(out, a, b, |x, y| x - y)
}

/// `acc[i] -= b[i]`
pub fn sub_in_place<W: Word, const F: u32>(
    acc: &mut [Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_in_place(acc, b, |x, y| x - y)
}

/// `out[i] = a[i] * b[i]`, renormalized.
pub fn dot_mul<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_map(out, a, b, |x, y| x * y)
}

pub fn dot_mul_in_place<W: Word, const F: u32>(
    acc: &mut [Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_in_place(acc, b, |x, y| x * y)
}

/// `out[i] = a[i] / b[i]`, saturating where `b[i] == 0`.
pub fn dot_div<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_map(out, a, b, |x, y| x / y)
}

pub fn dot_div_in_place<W: Word, const F: u32>(
    acc: &mut [Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    zip_in_place(acc, b, |x, y| x / y)
}

/// `out[i] = a[i] + k`
pub fn real_add<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    k: Fixed<W, F>,
) -> DspResult<()> {
    map(out, a, |x| x + k)
}

pub fn real_add_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>], k: Fixed<W, F>) {
    map_in_place(buf, |x| x + k)
}

/// `out[i] = a[i] - k`
pub fn real_sub<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    k: Fixed<W, F>,
) -> DspResult<()> {
    map(out, a, |x| x - k)
}

pub fn real_sub_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>], k: Fixed<W, F>) {
    map_in_place(buf, |x| x - k)
}

/// `out[i] = a[i] * k`, renormalized.
pub fn real_mul<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    k: Fixed<W, F>,
) -> DspResult<()> {
    map(out, a, |x| x * k)
}

pub fn real_mul_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>], k: Fixed<W, F>) {
    map_in_place(buf, |x| x * k)
}

/// `out[i] = a[i] / k`, saturating when `k == 0`.
pub fn real_div<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    k: Fixed<W, F>,
) -> DspResult<()> {
    map(out, a, |x| x / k)
}

pub fn real_div_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>], k: Fixed<W, F>) {
    map_in_place(buf, |x| x / k)
}

/// `out[i] = a[i] * k` for an integer `k`, wrapping.
pub fn int_mul<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    k: i32,
) -> DspResult<()> {
    map(out, a, |x| x.wrapping_mul_int(k))
}

pub fn int_mul_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>], k: i32) {
    map_in_place(buf, |x| x.wrapping_mul_int(k))
}

/// `out[i] = a[i] / k` for an integer `k`, truncating toward zero.
///
/// # Errors
///
/// `InvalidArgument` when `k == 0`.
pub fn int_div<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    k: i32,
) -> DspResult<()> {
    nonzero_divisor(k)?;
    map(out, a, |x| int_quotient(x, k))
}

pub fn int_div_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>], k: i32) -> DspResult<()> {
    nonzero_divisor(k)?;
    map_in_place(buf, |x| int_quotient(x, k));
    Ok(())
}

/// `out[i] = a[i]^k` through [`operators::pow`]: negative elements give
/// `MIN`, results beyond the format clamp.
pub fn pow<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    k: Fixed<W, F>,
) -> DspResult<()> {
    map(out, a, |x| operators::pow(x, k))
}

pub fn pow_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>], k: Fixed<W, F>) {
    map_in_place(buf, |x| operators::pow(x, k))
}

/// `out[i] = -a[i]`, wrapping at `MIN`.
pub fn neg<W: Word, const F: u32>(out: &mut [Fixed<W, F>], a: &[Fixed<W, F>]) -> DspResult<()> {
    map(out, a, |x| -x)
}

pub fn neg_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>]) {
    map_in_place(buf, |x| -x)
}

/// `out[i] = |a[i]|`, wrapping at `MIN`.
pub fn abs<W: Word, const F: u32>(out: &mut [Fixed<W, F>], a: &[Fixed<W, F>]) -> DspResult<()> {
    map(out, a, |x| x.abs())
}

pub fn abs_in_place<W: Word, const F: u32>(buf: &mut [Fixed<W, F>]) {
    map_in_place(buf, |x| x.abs())
}

pub fn copy<W: Word, const F: u32>(out: &mut [Fixed<W, F>], a: &[Fixed<W, F>]) -> DspResult<()> {
    ensure_len(out.len(), a.len())?;
    out.copy_from_slice(a);
    Ok(())
}

/// Zero the last `count` elements.
pub fn zero_pad<W: Word, const F: u32>(buf: &mut [Fixed<W, F>], count: usize) -> DspResult<()> {
    let start = buf
        .len()
        .checked_sub(count)
        .ok_or(DspError::InsufficientData {
            needed: count,
            got: buf.len(),
        })?;
    buf[start..].fill(Fixed::ZERO);
    Ok(())
}

/// Smallest element.
///
/// # Errors
///
/// `InsufficientData` for an empty vector.
pub fn min<W: Word, const F: u32>(a: &[Fixed<W, F>]) -> DspResult<Fixed<W, F>> {
    a.iter()
        .copied()
        .min()
        .ok_or(DspError::InsufficientData { needed: 1, got: 0 })
}

/// Largest element.
pub fn max<W: Word, const F: u32>(a: &[Fixed<W, F>]) -> DspResult<Fixed<W, F>> {
    a.iter()
        .copied()
        .max()
        .ok_or(DspError::InsufficientData { needed: 1, got: 0 })
}

/// Narrow an accumulated `2F`-fraction sum back to the format.
#[inline]
pub(crate) fn narrow_sum<W: Word, const F: u32>(sum: i64) -> Fixed<W, F> {
    Fixed::wrapping_from_raw(sum >> F)
}

/// Valid-part convolution, `out.len() == a.len() - b.len() + 1`.
///
/// `out[n] = sum(b[m] * a[n + b.len() - 1 - m])`.
pub fn conv_part<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    conv_part_with::<Generic, W, F>(out, a, b)
}

/// [`conv_part`] through a chosen kernel provider.
pub fn conv_part_with<K: Kernels, W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    if b.is_empty() || a.len() < b.len() {
        return Err(DspError::InsufficientData {
            needed: b.len().max(1),
            got: a.len(),
        });
    }
    ensure_len(a.len() - b.len() + 1, out.len())?;

    for (n, o) in out.iter_mut().enumerate() {
        *o = narrow_sum(K::dot_reversed(&a[n..n + b.len()], b));
    }
    Ok(())
}

/// Full convolution, `out.len() == a.len() + b.len() - 1`.
pub fn conv<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    conv_with::<Generic, W, F>(out, a, b)
}

/// [`conv`] through a chosen kernel provider.
pub fn conv_with<K: Kernels, W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    a: &[Fixed<W, F>],
    b: &[Fixed<W, F>],
) -> DspResult<()> {
    if a.is_empty() || b.is_empty() {
        return Err(DspError::InsufficientData {
            needed: 1,
            got: 0,
        });
    }
    ensure_len(a.len() + b.len() - 1, out.len())?;

    for (n, o) in out.iter_mut().enumerate() {
        // a[k] meets b[n - k] for every k where both exist.
        let lo = n.saturating_sub(b.len() - 1);
        let hi = n.min(a.len() - 1);
        let sum = K::dot_reversed(&a[lo..=hi], &b[n - hi..=n - lo]);
        *o = narrow_sum(sum);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernels::Unrolled;
    use lib_fixed::{Q12, Q15};

    fn q15(values: &[f64]) -> Vec<Q15> {
        values.iter().map(|&v| Q15::from_f64(v)).collect()
    }

    #[test]
    fn test_add_sub() {
        let a = q15(&[0.5, -0.25, 0.125]);
        let b = q15(&[0.25, 0.25, -0.125]);
        let mut out = vec![Q15::ZERO; 3];

        add(&mut out, &a, &b).unwrap();
        assert_eq!(out, q15(&[0.75, 0.0, 0.0]));

        sub(&mut out, &a, &b).unwrap();
        assert_eq!(out, q15(&[0.25, -0.5, 0.25]));
    }

    #[test]
    fn test_add_wraps_like_hardware() {
        let a = [Q15::MAX];
        let b = [Q15::from_raw(1)];
        let mut out = [Q15::ZERO];
        add(&mut out, &a, &b).unwrap();
        assert_eq!(out[0], Q15::MIN);
    }

    #[test]
    fn test_add_sat_clamps() {
        let a = [Q15::MAX, Q15::MIN, Q15::q(0.25)];
        let b = [Q15::from_raw(1), Q15::q(-0.5), Q15::q(0.25)];
        let mut out = [Q15::ZERO; 3];
        add_sat(&mut out, &a, &b).unwrap();
        assert_eq!(out, [Q15::MAX, Q15::MIN, Q15::q(0.5)]);

        let mut acc = a;
        add_sat_in_place(&mut acc, &b).unwrap();
        assert_eq!(acc, out);
        assert!(add_sat(&mut out, &a, &b[..2]).is_err());
    }

    #[test]
    fn test_pow_elementwise() {
        let a = [Q12::q(2.0), Q12::q(3.0), Q12::q(-1.0), Q12::ZERO, Q12::q(4.0)];
        let mut out = [Q12::ZERO; 5];
        pow(&mut out, &a, Q12::q(2.0)).unwrap();
        assert_eq!(out[0], Q12::q(4.0));
        assert!((out[1].raw() - Q12::q(9.0).raw()).abs() <= 2);
        assert_eq!(out[2], Q12::MIN);
        assert_eq!(out[3], Q12::ZERO);
        // 16 does not fit Q4.12.
        assert_eq!(out[4], Q12::MAX);

        let mut buf = a;
        pow_in_place(&mut buf, Q12::q(0.5));
        assert!((buf[4].raw() - Q12::q(2.0).raw()).abs() <= 1);
    }

    #[test]
    fn test_length_mismatch() {
        let a = q15(&[0.5, 0.5]);
        let b = q15(&[0.5]);
        let mut out = vec![Q15::ZERO; 2];
        let err = add(&mut out, &a, &b).unwrap_err();
        assert!(matches!(err, DspError::LengthMismatch { expected: 2, actual: 1 }));
    }

    #[test]
    fn test_in_place_matches_out_of_place() {
        let a = q15(&[0.5, -0.25, 0.125, 0.3, -0.9]);
        let b = q15(&[0.25, 0.5, -0.5, 0.1, 0.5]);

        let mut expected = vec![Q15::ZERO; 5];
        dot_mul(&mut expected, &a, &b).unwrap();
        let mut acc = a.clone();
        dot_mul_in_place(&mut acc, &b).unwrap();
        assert_eq!(acc, expected);

        real_sub(&mut expected, &a, Q15::q(0.1)).unwrap();
        let mut acc = a.clone();
        real_sub_in_place(&mut acc, Q15::q(0.1));
        assert_eq!(acc, expected);

        abs(&mut expected, &a).unwrap();
        let mut acc = a.clone();
        abs_in_place(&mut acc);
        assert_eq!(acc, expected);
    }

    #[test]
    fn test_real_scalar_ops() {
        let a = q15(&[0.5, -0.5]);
        let mut out = vec![Q15::ZERO; 2];

        real_add(&mut out, &a, Q15::q(0.25)).unwrap();
        assert_eq!(out, q15(&[0.75, -0.25]));

        real_mul(&mut out, &a, Q15::q(0.5)).unwrap();
        assert_eq!(out, q15(&[0.25, -0.25]));

        real_div(&mut out, &q15(&[0.125, -0.125]), Q15::q(0.5)).unwrap();
        assert_eq!(out, q15(&[0.25, -0.25]));
    }

    #[test]
    fn test_int_mul_div() {
        let a = [Q12::q(1.5), Q12::q(-0.75)];
        let mut out = [Q12::ZERO; 2];

        int_mul(&mut out, &a, 3).unwrap();
        assert_eq!(out, [Q12::q(4.5), Q12::q(-2.25)]);

        int_div(&mut out, &a, 3).unwrap();
        assert_eq!(out, [Q12::q(0.5), Q12::q(-0.25)]);

        assert!(matches!(
            int_div(&mut out, &a, 0),
            Err(DspError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_int_div_truncates_toward_zero() {
        let mut buf = [Q15::from_raw(7), Q15::from_raw(-7)];
        int_div_in_place(&mut buf, 2).unwrap();
        assert_eq!(buf, [Q15::from_raw(3), Q15::from_raw(-3)]);
    }

    #[test]
    fn test_dot_div_saturates_on_zero() {
        let a = q15(&[0.25, -0.25]);
        let b = [Q15::ZERO, Q15::ZERO];
        let mut out = [Q15::ZERO; 2];
        dot_div(&mut out, &a, &b).unwrap();
        assert_eq!(out, [Q15::MAX, Q15::MIN]);
    }

    #[test]
    fn test_neg_wraps_min() {
        let a = [Q15::MIN, Q15::q(0.5)];
        let mut out = [Q15::ZERO; 2];
        neg(&mut out, &a).unwrap();
        assert_eq!(out, [Q15::MIN, Q15::q(-0.5)]);
    }

    #[test]
    fn test_min_max() {
        let a = q15(&[0.1, -0.7, 0.9, 0.0, 0.3]);
        assert_eq!(min(&a).unwrap(), Q15::q(-0.7));
        assert_eq!(max(&a).unwrap(), Q15::q(0.9));
        assert!(min::<i16, 15>(&[]).is_err());
    }

    #[test]
    fn test_copy_and_zero_pad() {
        let a = q15(&[0.1, 0.2, 0.3, 0.4]);
        let mut out = vec![Q15::ZERO; 4];
        copy(&mut out, &a).unwrap();
        assert_eq!(out, a);

        zero_pad(&mut out, 2).unwrap();
        assert_eq!(out, q15(&[0.1, 0.2, 0.0, 0.0]));
        assert!(zero_pad(&mut out, 5).is_err());
    }

    #[test]
    fn test_conv_part() {
        let a = q15(&[0.5, 0.25, -0.5, 0.125]);
        let b = q15(&[0.5, 0.5]);
        let mut out = vec![Q15::ZERO; 3];
        conv_part(&mut out, &a, &b).unwrap();
        assert_eq!(out, q15(&[0.375, -0.125, -0.1875]));

        let mut wrong = vec![Q15::ZERO; 4];
        assert!(conv_part(&mut wrong, &a, &b).is_err());
    }

    #[test]
    fn test_conv_full() {
        let a = q15(&[0.5, 0.25]);
        let b = q15(&[0.5, -0.5, 0.25]);
        let mut out = vec![Q15::ZERO; 4];
        conv(&mut out, &a, &b).unwrap();
        assert_eq!(out, q15(&[0.25, -0.125, 0.0, 0.0625]));

        let mut unrolled = vec![Q15::ZERO; 4];
        conv_with::<Unrolled, _, 15>(&mut unrolled, &a, &b).unwrap();
        assert_eq!(unrolled, out);
    }
}
