//! Property tests for Q-format conversion and arithmetic.

use approx::assert_abs_diff_eq;
use lib_fixed::{Fixed, Q12, Q15, Q31};
use proptest::prelude::*;

proptest! {
    #[test]
    fn prop_q15_conversion_within_half_lsb(x in -1.0f64..(1.0 - 1.0 / 32768.0)) {
        let q = Q15::from_f64(x);
        assert_abs_diff_eq!(q.to_f64(), x, epsilon = 0.5 / 32768.0 + 1e-12);
    }

    #[test]
    fn prop_q31_conversion_within_half_lsb(x in -1.0f64..0.999_999) {
        let q = Q31::from_f64(x);
        assert_abs_diff_eq!(q.to_f64(), x, epsilon = 0.5 / 2_147_483_648.0 + 1e-12);
    }

    #[test]
    fn prop_raw_round_trip(raw in any::<i16>()) {
        let q = Q12::from_raw(raw);
        prop_assert_eq!(Q12::from_f64(q.to_f64()), q);
    }

    #[test]
    fn prop_mul_within_one_lsb(a in -32767i16..=32767, b in -32767i16..=32767) {
        let x = Q15::from_raw(a);
        let y = Q15::from_raw(b);
        let exact = x.to_f64() * y.to_f64();
        assert_abs_diff_eq!((x * y).to_f64(), exact, epsilon = 1.0 / 32768.0);
    }

    #[test]
    fn prop_add_commutes(a in any::<i32>(), b in any::<i32>()) {
        let x = Fixed::<i32, 24>::from_raw(a);
        let y = Fixed::<i32, 24>::from_raw(b);
        prop_assert_eq!(x + y, y + x);
        prop_assert_eq!(x.saturating_add(y), y.saturating_add(x));
    }

    #[test]
    fn prop_saturating_add_stays_in_order(a in any::<i16>(), b in 0i16..=i16::MAX) {
        let x = Q15::from_raw(a);
        let y = Q15::from_raw(b);
        prop_assert!(x.saturating_add(y) >= x);
    }

    #[test]
    fn prop_div_inverts_mul(a in -16384i16..16384, b in 8192i16..=32767) {
        let x = Q15::from_raw(a);
        let y = Q15::from_raw(b);
        let back = (x * y) / y;
        // truncation in both the product and the quotient
        assert_abs_diff_eq!(back.to_f64(), x.to_f64(), epsilon = 6.0 / 32768.0);
    }
}
