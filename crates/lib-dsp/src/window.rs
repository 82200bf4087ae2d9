//! Windowing functions.
//!
//! A window multiplies each sample by a weight that depends on its index
//! `n` and the window length `N`. All windows here are symmetric, so only
//! the first `N / 2` weights are evaluated and each is applied to both
//! `n` and `N - 1 - n`. For odd `N` the centre sample has weight 1 and is
//! copied unchanged.
//!
//! Weights are evaluated in scratch precision and applied with a flooring
//! multiply, so a window never increases a sample's magnitude.

use crate::error::{ensure_len, DspError, DspResult};
use crate::wide;
use lib_fixed::{quantize, Fixed, Word};

const fn w(value: f64) -> i64 {
    quantize(value, wide::FRAC)
}

const HAMMING: (i64, i64) = (w(0.54), w(0.46));
const BLACKMAN: (i64, i64, i64) = (w(0.42), w(0.5), w(0.08));

/// Standard deviation of the Gaussian window relative to half its span.
pub const GAUSS_TETA: f64 = 0.5;

/// Kaiser shape parameter used when none is given.
pub const DEFAULT_KAISER_ALPHA: u32 = 3;

/// Largest Kaiser `alpha`; `I0(pi * alpha)` must fit the Bessel series.
pub const MAX_KAISER_ALPHA: u32 = 10;

/// Fractional bits of the Bessel series.
const BESSEL_FRAC: u32 = 32;

/// Zeroth-order modified Bessel function of the first kind,
/// `I0(x) = sum(((x / 2)^k / k!)^2)`, with `BESSEL_FRAC` fractional bits.
fn bessel_i0(x: i64) -> i128 {
    let half = ((x >> 1) >> (wide::FRAC - BESSEL_FRAC)) as i128;
    let q = (half * half) >> BESSEL_FRAC;
    let mut term: i128 = 1 << BESSEL_FRAC;
    let mut sum = term;
    let mut k: i128 = 1;
    while term > 0 {
        term = ((term * q) >> BESSEL_FRAC) / (k * k);
        sum += term;
        k += 1;
    }
    sum
}

/// Window function types.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum WindowType {
    /// No weighting.
    Rectangular,

    /// Triangular, `2n / (N - 1)` rising to the centre.
    Bartlett,

    /// `0.54 - 0.46 cos(2 pi n / (N - 1))`.
    #[default]
    Hamming,

    /// Raised cosine, `0.5 - 0.5 cos(2 pi n / (N - 1))`.
    Hann,

    /// `0.42 - 0.5 cos(2 pi n / (N - 1)) + 0.08 cos(4 pi n / (N - 1))`.
    Blackman,

    /// Parabolic, `1 - ((2n - (N - 1)) / (N - 1))^2`.
    Welch,

    /// `exp(-0.5 * (t / teta)^2)` with `t = (2n - (N - 1)) / (N - 1)` and
    /// `teta = GAUSS_TETA`.
    Gauss,

    /// `I0(pi * alpha * sqrt(1 - t^2)) / I0(pi * alpha)` with `t` as for
    /// [`WindowType::Gauss`]; `alpha` in `1..=MAX_KAISER_ALPHA`.
    Kaiser { alpha: u32 },
}

impl WindowType {
    /// Cosine and bell windows divide by `N - 1` and need at least two samples.
    pub fn min_size(self) -> usize {
        match self {
            Self::Hamming | Self::Hann | Self::Blackman | Self::Gauss | Self::Kaiser { .. } => 2,
            Self::Rectangular | Self::Bartlett | Self::Welch => 0,
        }
    }

    fn check_parameters(self) -> DspResult<()> {
        match self {
            Self::Kaiser { alpha } if alpha == 0 || alpha > MAX_KAISER_ALPHA => {
                Err(DspError::InvalidArgument(format!(
                    "Kaiser alpha must be in 1..={MAX_KAISER_ALPHA}, got {alpha}"
                )))
            }
            _ => Ok(()),
        }
    }

    fn check_size(self, size: usize) -> DspResult<()> {
        self.check_parameters()?;
        if size < self.min_size() {
            return Err(DspError::InvalidArgument(format!(
                "{self:?} window needs at least {} samples, got {size}",
                self.min_size()
            )));
        }
        Ok(())
    }

    /// Scratch-precision weight of sample `n` for `span = N - 1`, `n < N / 2`.
    pub(crate) fn weight<W: Word>(self, n: usize, span: usize) -> i64 {
        let ratio = |num: i64| (((num as i128) << wide::FRAC) / span as i128) as i64;
        match self {
            Self::Rectangular => wide::ONE,
            Self::Bartlett => ratio(2 * n as i64),
            Self::Welch => {
                let t = ratio(2 * n as i64 - span as i64);
                wide::ONE - wide::mul(t, t)
            }
            Self::Hamming => {
                let (a0, a1) = HAMMING;
                a0 - wide::mul(a1, wide::cos::<W>(ratio(2 * n as i64)))
            }
            Self::Hann => {
                let half = wide::HALF;
                half - wide::mul(half, wide::cos::<W>(ratio(2 * n as i64)))
            }
            Self::Blackman => {
                let (a0, a1, a2) = BLACKMAN;
                let angle = ratio(2 * n as i64);
                a0 - wide::mul(a1, wide::cos::<W>(angle))
                    + wide::mul(a2, wide::cos::<W>(2 * angle))
            }
            Self::Gauss => {
                let u = wide::div(ratio(2 * n as i64 - span as i64), w(GAUSS_TETA));
                wide::exp(-(wide::mul(u, u) >> 1))
            }
            Self::Kaiser { alpha } => {
                let t = ratio(2 * n as i64 - span as i64);
                let r = wide::sqrt(wide::ONE - wide::mul(t, t), W::SQRT_ITERATIONS);
                let beta = alpha as i64 * wide::PI;
                let num = bessel_i0(wide::mul(beta, r));
                ((num << wide::FRAC) / bessel_i0(beta)) as i64
            }
        }
    }
}

impl std::fmt::Display for WindowType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Rectangular => "rectangular",
            Self::Bartlett => "bartlett",
            Self::Hamming => "hamming",
            Self::Hann => "hann",
            Self::Blackman => "blackman",
            Self::Welch => "welch",
            Self::Gauss => "gauss",
            Self::Kaiser { alpha } => return write!(f, "kaiser:{alpha}"),
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for WindowType {
    type Err = DspError;

    /// Window names, with an optional `kaiser:<alpha>` parameter.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        let (name, param) = match lower.split_once(':') {
            Some((name, param)) => (name, Some(param.trim())),
            None => (lower.as_str(), None),
        };
        let kind = match name {
            "rectangular" | "rect" | "none" => Self::Rectangular,
            "bartlett" | "triangular" => Self::Bartlett,
            "hamming" => Self::Hamming,
            "hann" | "hanning" => Self::Hann,
            "blackman" => Self::Blackman,
            "welch" => Self::Welch,
            "gauss" | "gaussian" => Self::Gauss,
            "kaiser" => {
                let alpha = match param {
                    Some(p) => p.parse().map_err(|_| {
                        DspError::InvalidArgument(format!("bad Kaiser alpha '{p}'"))
                    })?,
                    None => DEFAULT_KAISER_ALPHA,
                };
                Self::Kaiser { alpha }
            }
            other => {
                return Err(DspError::InvalidArgument(format!("unknown window '{other}'")))
            }
        };
        if param.is_some() && !matches!(kind, Self::Kaiser { .. }) {
            return Err(DspError::InvalidArgument(format!("{kind} window takes no parameter")));
        }
        kind.check_parameters()?;
        Ok(kind)
    }
}

/// Weight `buf` in place; the size has already been checked.
fn weigh<W: Word, const F: u32>(kind: WindowType, buf: &mut [Fixed<W, F>]) {
    if kind == WindowType::Rectangular || buf.len() < 2 {
        return;
    }
    let span = buf.len() - 1;
    for n in 0..buf.len() / 2 {
        let weight = kind.weight::<W>(n, span);
        buf[n] = wide::scale(buf[n], weight);
        buf[span - n] = wide::scale(buf[span - n], weight);
    }
}

/// Apply `kind` to `input`, writing into `out`.
///
/// # Errors
///
/// `LengthMismatch` when the buffers differ in length, `InvalidArgument`
/// for a cosine window shorter than two samples.
pub fn apply_window<W: Word, const F: u32>(
    kind: WindowType,
    out: &mut [Fixed<W, F>],
    input: &[Fixed<W, F>],
) -> DspResult<()> {
    ensure_len(out.len(), input.len())?;
    kind.check_size(out.len())?;
    out.copy_from_slice(input);
    weigh(kind, out);
    Ok(())
}

/// Apply `kind` to `buf` in place.
pub fn apply_window_in_place<W: Word, const F: u32>(
    kind: WindowType,
    buf: &mut [Fixed<W, F>],
) -> DspResult<()> {
    kind.check_size(buf.len())?;
    weigh(kind, buf);
    Ok(())
}

/// Write the window weights themselves into `out`, rounded to the format.
pub fn generate_window<W: Word, const F: u32>(
    kind: WindowType,
    out: &mut [Fixed<W, F>],
) -> DspResult<()> {
    kind.check_size(out.len())?;
    out.fill(Fixed::one());
    if kind == WindowType::Rectangular || out.len() < 2 {
        return Ok(());
    }
    let span = out.len() - 1;
    for n in 0..out.len() / 2 {
        let weight = wide::to_fixed(kind.weight::<W>(n, span));
        out[n] = weight;
        out[span - n] = weight;
    }
    Ok(())
}

/// Triangular window.
pub fn bartlett<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    input: &[Fixed<W, F>],
) -> DspResult<()> {
    apply_window(WindowType::Bartlett, out, input)
}

/// Hamming window; `input` needs at least two samples.
pub fn hamming<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    input: &[Fixed<W, F>],
) -> DspResult<()> {
    apply_window(WindowType::Hamming, out, input)
}

/// Hann window; `input` needs at least two samples.
pub fn hann<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    input: &[Fixed<W, F>],
) -> DspResult<()> {
    apply_window(WindowType::Hann, out, input)
}

/// Blackman window; `input` needs at least two samples.
pub fn blackman<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    input: &[Fixed<W, F>],
) -> DspResult<()> {
    apply_window(WindowType::Blackman, out, input)
}

/// Welch window.
pub fn welch<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    input: &[Fixed<W, F>],
) -> DspResult<()> {
    apply_window(WindowType::Welch, out, input)
}

/// Gaussian window; `input` needs at least two samples.
pub fn gauss<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    input: &[Fixed<W, F>],
) -> DspResult<()> {
    apply_window(WindowType::Gauss, out, input)
}

/// Kaiser window with shape `alpha`; `input` needs at least two samples.
pub fn kaiser<W: Word, const F: u32>(
    out: &mut [Fixed<W, F>],
    input: &[Fixed<W, F>],
    alpha: u32,
) -> DspResult<()> {
    apply_window(WindowType::Kaiser { alpha }, out, input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use lib_fixed::{Q12, Q15, Q31};
    use std::f64::consts::PI;

    fn bessel_i0_f64(x: f64) -> f64 {
        let q = x * x / 4.0;
        let (mut term, mut sum) = (1.0, 1.0);
        for k in 1..200 {
            term *= q / (k * k) as f64;
            sum += term;
        }
        sum
    }

    fn reference(kind: WindowType, n: usize, size: usize) -> f64 {
        let x = n as f64 / (size - 1) as f64;
        let t = 2.0 * x - 1.0;
        match kind {
            WindowType::Rectangular => 1.0,
            WindowType::Bartlett => 1.0 - (2.0 * x - 1.0).abs(),
            WindowType::Hamming => 0.54 - 0.46 * (2.0 * PI * x).cos(),
            WindowType::Hann => 0.5 - 0.5 * (2.0 * PI * x).cos(),
            WindowType::Blackman => 0.42 - 0.5 * (2.0 * PI * x).cos() + 0.08 * (4.0 * PI * x).cos(),
            WindowType::Welch => 1.0 - (2.0 * x - 1.0).powi(2),
            WindowType::Gauss => (-0.5 * (t / GAUSS_TETA).powi(2)).exp(),
            WindowType::Kaiser { alpha } => {
                let beta = PI * alpha as f64;
                bessel_i0_f64(beta * (1.0 - t * t).max(0.0).sqrt()) / bessel_i0_f64(beta)
            }
        }
    }

    #[test]
    fn test_bartlett_on_unit_signal_is_triangle() {
        let input = vec![Q15::MAX; 5];
        let mut out = vec![Q15::ZERO; 5];
        bartlett(&mut out, &input).unwrap();
        let raw: Vec<i16> = out.iter().map(|q| q.raw()).collect();
        assert_eq!(raw, vec![0, 16383, 32767, 16383, 0]);
    }

    #[test]
    fn test_bartlett_even_length() {
        let mut buf = vec![Q12::q(1.0); 4];
        apply_window_in_place(WindowType::Bartlett, &mut buf).unwrap();
        let raw: Vec<i16> = buf.iter().map(|q| q.raw()).collect();
        assert_eq!(raw, vec![0, 2730, 2730, 0]);
    }

    #[test]
    fn test_generated_weights_match_float_reference() {
        let kinds = [
            WindowType::Rectangular,
            WindowType::Bartlett,
            WindowType::Hamming,
            WindowType::Hann,
            WindowType::Blackman,
            WindowType::Welch,
            WindowType::Gauss,
            WindowType::Kaiser { alpha: 1 },
            WindowType::Kaiser { alpha: 4 },
            WindowType::Kaiser { alpha: MAX_KAISER_ALPHA },
        ];
        for kind in kinds {
            for size in [2usize, 5, 16, 33] {
                let mut out = vec![Q31::ZERO; size];
                generate_window(kind, &mut out).unwrap();
                for (n, weight) in out.iter().enumerate() {
                    assert_abs_diff_eq!(weight.to_f64(), reference(kind, n, size), epsilon = 1e-8);
                }
            }
        }
    }

    #[test]
    fn test_windows_are_symmetric() {
        let input: Vec<Q15> = (0..9).map(|_| Q15::q(0.75)).collect();
        let mut out = vec![Q15::ZERO; 9];
        let kinds = [
            WindowType::Hamming,
            WindowType::Hann,
            WindowType::Blackman,
            WindowType::Welch,
            WindowType::Gauss,
            WindowType::Kaiser { alpha: 3 },
        ];
        for kind in kinds {
            apply_window(kind, &mut out, &input).unwrap();
            for n in 0..9 {
                assert_eq!(out[n], out[8 - n], "{kind} at {n}");
            }
            assert_eq!(out[4], Q15::q(0.75));
        }
    }

    #[test]
    fn test_window_never_grows_magnitude() {
        let input: Vec<Q15> = (0..12).map(|i| Q15::from_raw((-20000 + 3000 * i as i32) as i16)).collect();
        let mut out = vec![Q15::ZERO; 12];
        hann(&mut out, &input).unwrap();
        for (o, i) in out.iter().zip(&input) {
            assert!(o.to_f64().abs() <= i.to_f64().abs() + Q15::resolution());
        }
    }

    #[test]
    fn test_cosine_windows_need_two_samples() {
        let mut one = vec![Q15::q(0.5)];
        assert!(matches!(
            apply_window_in_place(WindowType::Hamming, &mut one),
            Err(DspError::InvalidArgument(_))
        ));
        assert!(hann::<i16, 15>(&mut [], &[]).is_err());

        bartlett(&mut one, &[Q15::q(0.25)]).unwrap();
        assert_eq!(one[0], Q15::q(0.25));
        welch::<i16, 15>(&mut [], &[]).unwrap();
    }

    #[test]
    fn test_length_mismatch() {
        let mut out = vec![Q15::ZERO; 3];
        let err = hamming(&mut out, &[Q15::ZERO; 4]).unwrap_err();
        assert!(matches!(err, DspError::LengthMismatch { expected: 3, actual: 4 }));
    }

    #[test]
    fn test_window_type_names() {
        assert_eq!(WindowType::default(), WindowType::Hamming);
        assert_eq!("Hann".parse::<WindowType>().unwrap(), WindowType::Hann);
        assert_eq!("triangular".parse::<WindowType>().unwrap(), WindowType::Bartlett);
        assert!("tukey".parse::<WindowType>().is_err());
        assert_eq!(WindowType::Blackman.to_string(), "blackman");
    }

    #[test]
    fn test_parameterized_window_names() {
        assert_eq!("Gaussian".parse::<WindowType>().unwrap(), WindowType::Gauss);
        assert_eq!(
            "kaiser".parse::<WindowType>().unwrap(),
            WindowType::Kaiser { alpha: DEFAULT_KAISER_ALPHA }
        );
        let kind: WindowType = "kaiser:7".parse().unwrap();
        assert_eq!(kind, WindowType::Kaiser { alpha: 7 });
        assert_eq!(kind.to_string(), "kaiser:7");
        assert_eq!(kind.to_string().parse::<WindowType>().unwrap(), kind);

        assert!("kaiser:0".parse::<WindowType>().is_err());
        assert!("kaiser:11".parse::<WindowType>().is_err());
        assert!("kaiser:x".parse::<WindowType>().is_err());
        assert!("hann:2".parse::<WindowType>().is_err());
    }

    #[test]
    fn test_kaiser_alpha_is_checked_on_use() {
        let mut out = vec![Q15::ZERO; 8];
        let input = vec![Q15::q(0.5); 8];
        assert!(matches!(
            kaiser(&mut out, &input, 0),
            Err(DspError::InvalidArgument(_))
        ));
        assert!(generate_window(WindowType::Kaiser { alpha: 11 }, &mut out).is_err());
        kaiser(&mut out, &input, 2).unwrap();
    }

    #[test]
    fn test_gauss_edges_and_centre() {
        let mut w = vec![Q31::ZERO; 9];
        generate_window(WindowType::Gauss, &mut w).unwrap();
        assert_abs_diff_eq!(w[0].to_f64(), (-2.0f64).exp(), epsilon = 1e-9);
        assert_eq!(w[4], Q31::MAX);

        let input = vec![Q15::q(0.5); 3];
        let mut out = vec![Q15::ZERO; 3];
        gauss(&mut out, &input).unwrap();
        assert_eq!(out[1], Q15::q(0.5));
        assert!(out[0] < Q15::q(0.07) && out[0] > Q15::q(0.06));
    }

    #[test]
    fn test_kaiser_narrows_with_alpha() {
        let mut soft = vec![Q31::ZERO; 16];
        let mut sharp = vec![Q31::ZERO; 16];
        generate_window(WindowType::Kaiser { alpha: 1 }, &mut soft).unwrap();
        generate_window(WindowType::Kaiser { alpha: 8 }, &mut sharp).unwrap();
        for n in 0..7 {
            assert!(sharp[n] < soft[n], "n = {n}");
            assert!(soft[n] < soft[n + 1] && sharp[n] < sharp[n + 1]);
        }
    }
}
