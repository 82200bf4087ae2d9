//! Signal generators.
//!
//! Each generator fills a caller buffer. Frequencies are integers in the
//! same unit as the sample rate `fs`. Phases, delays and duty cycles are
//! fractions of one period expressed in the buffer's Q-format, except for
//! [`gen_sin`] / [`gen_cos`] whose phase is an angle in half-turns.

use crate::error::{DspError, DspResult};
use crate::operators;
use crate::rand::ParkMiller;
use crate::wide;
use lib_fixed::{Fixed, Word};

fn check_rate(f: u32, fs: u32) -> DspResult<()> {
    if fs == 0 {
        return Err(DspError::InvalidArgument("sample rate must be nonzero".into()));
    }
    if f == 0 {
        return Err(DspError::InvalidArgument("frequency must be nonzero".into()));
    }
    Ok(())
}

/// Per-sample angle increment `2 * f / fs` half-turns, i.e. `(f << (F + 1)) / fs`.
fn angle_step<W: Word, const F: u32>(f: u32, fs: u32) -> Fixed<W, F> {
    let step = ((f as i128) << (F + 1)) / fs as i128;
    Fixed::wrapping_from_raw(step as i64)
}

fn generate_angle<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    f: u32,
    fs: u32,
    phase: Fixed<W, F>,
    func: fn(Fixed<W, F>) -> Fixed<W, F>,
) -> DspResult<Fixed<W, F>> {
    if fs == 0 {
        return Err(DspError::InvalidArgument("sample rate must be nonzero".into()));
    }
    let step = angle_step::<W, F>(f, fs);
    let mut angle = phase;
    for sample in out.iter_mut() {
        *sample = func(angle);
        angle += step;
    }
    Ok(angle)
}

/// Sine wave starting at angle `phase`; returns the angle of the next sample.
///
/// The returned phase passed to the next call continues the waveform
/// without a discontinuity.
pub fn gen_sin<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    f: u32,
    fs: u32,
    phase: Fixed<W, F>,
) -> DspResult<Fixed<W, F>> {
    generate_angle(out, f, fs, phase, operators::sin)
}

/// Cosine wave, see [`gen_sin`].
pub fn gen_cos<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    f: u32,
    fs: u32,
    phase: Fixed<W, F>,
) -> DspResult<Fixed<W, F>> {
    generate_angle(out, f, fs, phase, operators::cos)
}

/// Ramp from 0 by `increment` per sample, holding at 1.0 once reached.
///
/// # Errors
///
/// `InvalidArgument` for a negative increment.
pub fn ramp<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    increment: Fixed<W, F>,
) -> DspResult<()> {
    if increment.is_negative() {
        return Err(DspError::InvalidArgument("ramp increment must be >= 0".into()));
    }

    let one = Fixed::<W, F>::one();
    // Comparing against `one - increment` keeps `value + increment` from wrapping.
    let limit = one - increment;
    let mut value = Fixed::ZERO;
    for sample in out.iter_mut() {
        *sample = value;
        value = if value <= limit { value + increment } else { one };
    }
    Ok(())
}

/// `initial` before `index`, `final_value` from `index` on.
pub fn step<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    initial: Fixed<W, F>,
    final_value: Fixed<W, F>,
    index: usize,
) {
    let split = index.min(out.len());
    out[..split].fill(initial);
    out[split..].fill(final_value);
}

/// Single unit impulse at `index`; all zeros when `index` is past the end.
pub fn dirac<W: Word, const F: u32>(out: &mut [Fixed<W, F>], index: usize) {
    out.fill(Fixed::ZERO);
    if let Some(sample) = out.get_mut(index) {
        *sample = Fixed::one();
    }
}

/// Unit impulses every `fs / f` samples, shifted by `delay` periods.
///
/// # Errors
///
/// `InvalidArgument` for a zero rate or when `f > fs` leaves no whole
/// sample per period.
pub fn dcomb<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    f: u32,
    fs: u32,
    delay: Fixed<W, F>,
) -> DspResult<()> {
    check_rate(f, fs)?;
    let period = (fs / f) as i64;
    if period == 0 {
        return Err(DspError::InvalidArgument(format!(
            "frequency {f} above sample rate {fs}"
        )));
    }

    let offset = ((delay.raw().to_i64() * period) >> F).rem_euclid(period);
    for (i, sample) in out.iter_mut().enumerate() {
        *sample = if (i as i64 - offset).rem_euclid(period) == 0 {
            Fixed::one()
        } else {
            Fixed::ZERO
        };
    }
    Ok(())
}

/// Period phase accumulator in scratch precision, one period = `wide::ONE`.
struct PeriodPhase {
    phase: i64,
    step: i64,
}

impl PeriodPhase {
    fn new<W: Word, const F: u32>(f: u32, fs: u32, delay: Fixed<W, F>) -> Self {
        Self {
            phase: (wide::ONE - wide::from_fixed_mod(delay, 0)).rem_euclid(wide::ONE),
            step: (((f as i128) << wide::FRAC) / fs as i128) as i64,
        }
    }

    fn advance(&mut self) -> i64 {
        let current = self.phase;
        self.phase = (self.phase + self.step).rem_euclid(wide::ONE);
        current
    }
}

fn check_duty<W: Word, const F: u32>(duty: Fixed<W, F>) -> DspResult<i64> {
    let duty = wide::from_fixed(duty);
    if duty <= 0 || duty > wide::ONE {
        return Err(DspError::InvalidArgument(
            "duty cycle must be in (0, 1]".into(),
        ));
    }
    Ok(duty)
}

/// Rectangular wave in `[-1, 1]`: high for the first `duty` of each period.
pub fn rect<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    f: u32,
    fs: u32,
    duty: Fixed<W, F>,
    delay: Fixed<W, F>,
) -> DspResult<()> {
    check_rate(f, fs)?;
    let duty = check_duty(duty)?;
    let high = Fixed::<W, F>::one();
    let low = Fixed::<W, F>::from_int(-1);

    let mut phase = PeriodPhase::new(f, fs, delay);
    for sample in out.iter_mut() {
        *sample = if phase.advance() < duty { high } else { low };
    }
    Ok(())
}

/// Square wave, a [`rect`] with a 50% duty cycle.
pub fn sqr<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    f: u32,
    fs: u32,
    delay: Fixed<W, F>,
) -> DspResult<()> {
    rect(out, f, fs, Fixed::from_f64(0.5), delay)
}

/// Saw-tooth in `[-1, 1]` rising over `duty` of the period and falling over
/// the rest. Returns the period phase of the next sample.
pub fn saw<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    f: u32,
    fs: u32,
    duty: Fixed<W, F>,
    delay: Fixed<W, F>,
) -> DspResult<Fixed<W, F>> {
    check_rate(f, fs)?;
    let duty = check_duty(duty)?;

    let mut phase = PeriodPhase::new(f, fs, delay);
    for sample in out.iter_mut() {
        let t = phase.advance();
        let value = if t < duty {
            wide::div(2 * t, duty) - wide::ONE
        } else {
            wide::ONE - wide::div(2 * (t - duty), wide::ONE - duty)
        };
        *sample = wide::to_fixed(value);
    }
    Ok(wide::to_fixed(phase.phase))
}

/// White noise from `rng` scaled by `amp`.
///
/// An amplitude of exactly 1.0 skips the multiply and stores the generator
/// output directly. Formats without an integer bit cannot hold 1.0; there
/// `one()` is `MAX` and goes through the multiply like any other amplitude.
pub fn noise<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    amp: Fixed<W, F>,
    rng: &mut ParkMiller,
) {
    if F + 1 < W::BITS && amp == Fixed::one() {
        rng.fill(out);
        return;
    }
    for sample in out.iter_mut() {
        *sample = rng.next::<W, F>() * amp;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lib_fixed::{Q12, Q15, Q31};

    #[test]
    fn test_sin_one_period() {
        let mut buf = vec![Q15::ZERO; 100];
        gen_sin(&mut buf, 1, 100, Q15::ZERO).unwrap();

        assert_eq!(buf[0], Q15::ZERO);
        assert_abs_diff_eq!(buf[25].to_f64(), 1.0, epsilon = 0.001);
        assert_abs_diff_eq!(buf[50].to_f64(), 0.0, epsilon = 0.005);
        assert_abs_diff_eq!(buf[75].to_f64(), -1.0, epsilon = 0.001);
    }

    #[test]
    fn test_sin_returns_phase_for_continuation() {
        let mut whole = vec![Q31::ZERO; 64];
        gen_sin(&mut whole, 3, 64, Q31::ZERO).unwrap();

        let mut first = vec![Q31::ZERO; 40];
        let mut second = vec![Q31::ZERO; 24];
        let phase = gen_sin(&mut first, 3, 64, Q31::ZERO).unwrap();
        gen_sin(&mut second, 3, 64, phase).unwrap();

        assert_eq!(&whole[..40], &first[..]);
        assert_eq!(&whole[40..], &second[..]);
    }

    #[test]
    fn test_cos_starts_at_one() {
        let mut buf = vec![Q12::ZERO; 8];
        let phase = gen_cos(&mut buf, 1, 8, Q12::ZERO).unwrap();
        assert_eq!(buf[0], Q12::q(1.0));
        assert_eq!(buf[4], Q12::q(-1.0));
        assert_eq!(buf[2], Q12::ZERO);
        assert_eq!(phase, Q12::q(2.0));
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let mut buf = vec![Q15::ZERO; 4];
        assert!(gen_sin(&mut buf, 1, 0, Q15::ZERO).is_err());
        assert!(rect(&mut buf, 1, 0, Q15::q(0.5), Q15::ZERO).is_err());
    }

    #[test]
    fn test_ramp_saturates_and_holds() {
        let mut buf = vec![Q15::ZERO; 7];
        ramp(&mut buf, Q15::q(0.25)).unwrap();
        assert_eq!(
            buf,
            vec![
                Q15::ZERO,
                Q15::q(0.25),
                Q15::q(0.5),
                Q15::q(0.75),
                Q15::MAX,
                Q15::MAX,
                Q15::MAX
            ]
        );
    }

    #[test]
    fn test_ramp_large_increment_does_not_wrap() {
        let mut buf = vec![Q15::ZERO; 4];
        ramp(&mut buf, Q15::q(0.75)).unwrap();
        assert_eq!(buf, vec![Q15::ZERO, Q15::q(0.75), Q15::MAX, Q15::MAX]);

        assert!(ramp(&mut buf, Q15::q(-0.1)).is_err());
    }

    #[test]
    fn test_step_and_dirac() {
        let mut buf = vec![Q15::ZERO; 5];
        step(&mut buf, Q15::q(-0.5), Q15::q(0.5), 2);
        assert_eq!(buf, vec![Q15::q(-0.5), Q15::q(-0.5), Q15::q(0.5), Q15::q(0.5), Q15::q(0.5)]);

        step(&mut buf, Q15::ZERO, Q15::q(0.5), 10);
        assert!(buf.iter().all(|&v| v == Q15::ZERO));

        dirac(&mut buf, 3);
        assert_eq!(buf[3], Q15::MAX);
        assert_eq!(buf.iter().filter(|&&v| v != Q15::ZERO).count(), 1);
    }

    #[test]
    fn test_dirac_comb_period_and_delay() {
        let mut buf = vec![Q12::ZERO; 25];
        dcomb(&mut buf, 10, 100, Q12::ZERO).unwrap();
        let hits: Vec<usize> = (0..25).filter(|&i| buf[i] != Q12::ZERO).collect();
        assert_eq!(hits, vec![0, 10, 20]);

        dcomb(&mut buf, 10, 100, Q12::q(0.5)).unwrap();
        let hits: Vec<usize> = (0..25).filter(|&i| buf[i] != Q12::ZERO).collect();
        assert_eq!(hits, vec![5, 15]);
        assert_eq!(buf[5], Q12::q(1.0));

        assert!(dcomb(&mut buf, 200, 100, Q12::ZERO).is_err());
    }

    #[test]
    fn test_rect_duty_and_delay() {
        let hi = Q15::MAX;
        let lo = Q15::MIN;
        let mut buf = vec![Q15::ZERO; 8];

        rect(&mut buf, 1, 8, Q15::q(0.5), Q15::ZERO).unwrap();
        assert_eq!(buf, vec![hi, hi, hi, hi, lo, lo, lo, lo]);

        rect(&mut buf, 1, 8, Q15::q(0.5), Q15::q(0.25)).unwrap();
        assert_eq!(buf, vec![lo, lo, hi, hi, hi, hi, lo, lo]);

        sqr(&mut buf, 2, 8, Q15::ZERO).unwrap();
        assert_eq!(buf, vec![hi, hi, lo, lo, hi, hi, lo, lo]);

        assert!(rect(&mut buf, 1, 8, Q15::ZERO, Q15::ZERO).is_err());
    }

    #[test]
    fn test_saw_shape_and_phase() {
        let mut buf = vec![Q15::ZERO; 4];
        let phase = saw(&mut buf, 1, 4, Q15::q(0.5), Q15::ZERO).unwrap();
        assert_eq!(buf, vec![Q15::MIN, Q15::ZERO, Q15::MAX, Q15::ZERO]);
        assert_eq!(phase, Q15::ZERO);

        let mut buf = vec![Q12::ZERO; 3];
        let phase = saw(&mut buf, 1, 4, Q12::q(1.0), Q12::ZERO).unwrap();
        assert_eq!(buf, vec![Q12::q(-1.0), Q12::q(-0.5), Q12::ZERO]);
        assert_eq!(phase, Q12::q(0.75));
    }

    #[test]
    fn test_noise_unit_amplitude_is_raw_generator() {
        let mut buf = vec![Q12::ZERO; 6];
        noise(&mut buf, Q12::q(1.0), &mut ParkMiller::new());
        let mut expected = vec![Q12::ZERO; 6];
        ParkMiller::new().fill(&mut expected);
        assert_eq!(buf, expected);
    }

    #[test]
    fn test_noise_unit_amplitude_equals_multiply() {
        let mut buf = vec![Q12::ZERO; 32];
        noise(&mut buf, Q12::one(), &mut ParkMiller::new());
        let mut rng = ParkMiller::new();
        for &sample in &buf {
            assert_eq!(sample, rng.next::<i16, 12>() * Q12::one());
        }

        // In Q1.15 one() is MAX, and the noise is scaled by it.
        let mut buf = vec![Q15::ZERO; 32];
        noise(&mut buf, Q15::one(), &mut ParkMiller::new());
        let mut rng = ParkMiller::new();
        for &sample in &buf {
            assert_eq!(sample, rng.next::<i16, 15>() * Q15::MAX);
        }
        assert_eq!(buf[0].raw(), 7157 - 1);
    }

    #[test]
    fn test_delay_longer_than_the_scratch_range() {
        type Q24p8 = lib_fixed::Fixed<i32, 8>;
        let mut near = vec![Q24p8::ZERO; 16];
        let mut far = vec![Q24p8::ZERO; 16];
        rect(&mut near, 1, 8, Q24p8::from_f64(0.5), Q24p8::from_f64(0.25)).unwrap();
        rect(&mut far, 1, 8, Q24p8::from_f64(0.5), Q24p8::from_f64(100_000.25)).unwrap();
        assert_eq!(near, far);
        assert!(rect(&mut far, 1, 8, Q24p8::from_int(70_000), Q24p8::ZERO).is_err());
    }

    #[test]
    fn test_noise_scaled() {
        let mut buf = vec![Q15::ZERO; 6];
        noise(&mut buf, Q15::q(0.5), &mut ParkMiller::new());

        let mut rng = ParkMiller::new();
        for &sample in &buf {
            assert_eq!(sample, rng.next::<i16, 15>() * Q15::q(0.5));
            assert!(sample.abs() <= Q15::q(0.5));
        }
    }
}
