//! Pipeline execution over a runtime-selected Q-format.
//!
//! Configuration names the format as a string; the DSP library is generic
//! over it. Every entry point here resolves the format once and calls the
//! monomorphized implementation for one of the supported formats.

use crate::config::{adaptive_mu, AdaptiveOutput, FilterConfig, PipelineConfig, SourceConfig};
use anyhow::{Context, Result};
use lib_dsp::filter::{coefsort, lp_fir_table};
use lib_dsp::signal;
use lib_dsp::vector;
use lib_dsp::window::{apply_window_in_place, generate_window};
use lib_dsp::{
    DspResult, FirFilter, IirFilter, Interpolator, LmsFilter, NlmsFilter, ParkMiller, WindowType,
};
use lib_fixed::{CoefficientTable, Fixed, QFormat, Word};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info};

/// Call `$f::<W, F>(args)` with the storage word and fraction bits of `$format`.
macro_rules! with_format {
    ($format:expr, $f:ident($($arg:expr),*)) => {
        match $format {
            QFormat::Q1_15 => $f::<i16, 15>($($arg),*),
            QFormat::Q4_12 => $f::<i16, 12>($($arg),*),
            QFormat::Q1_31 => $f::<i32, 31>($($arg),*),
            QFormat::Q8_24 => $f::<i32, 24>($($arg),*),
            other => Err(anyhow::anyhow!("Unsupported Q-format {}", other)),
        }
    };
}

/// A buffer of raw samples tagged with their format.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Samples {
    pub format: QFormat,
    pub raw: Vec<i64>,
}

impl Samples {
    pub fn from_fixed<W: Word, const F: u32>(buf: &[Fixed<W, F>]) -> Self {
        Self {
            format: QFormat::of::<W, F>(),
            raw: buf.iter().map(|s| s.raw().to_i64()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.raw.len()
    }

    /// Real values of the samples.
    pub fn values(&self) -> Vec<f64> {
        self.raw.iter().map(|&r| self.format.to_real(r)).collect()
    }
}

/// Run a validated pipeline configuration.
pub fn run(config: &PipelineConfig) -> Result<Samples> {
    let format = config.q_format()?;
    info!(
        name = %config.name,
        format = %format,
        samples = config.samples,
        sources = config.sources.len(),
        "Running pipeline"
    );
    let samples = with_format!(format, run_in(config))?;
    info!(output = samples.len(), "Pipeline complete");
    Ok(samples)
}

fn run_in<W: Word, const F: u32>(config: &PipelineConfig) -> Result<Samples> {
    let mut rng = ParkMiller::with_seed(config.seed);
    let mut signal = synthesize::<W, F>(&config.sources, config.samples, &mut rng)?;

    if let Some(kind) = config.window_type()? {
        debug!(window = %kind, "Applying window");
        apply_window_in_place(kind, &mut signal)?;
    }

    let output = match &config.filter {
        Some(filter) => apply_filter(filter, &signal, &mut rng)?,
        None => signal,
    };
    Ok(Samples::from_fixed(&output))
}

/// Sum of all sources, `len` samples each.
fn synthesize<W: Word, const F: u32>(
    sources: &[SourceConfig],
    len: usize,
    rng: &mut ParkMiller,
) -> Result<Vec<Fixed<W, F>>> {
    let mut acc = vec![Fixed::ZERO; len];
    let mut scratch = vec![Fixed::ZERO; len];
    for (i, source) in sources.iter().enumerate() {
        render(source, &mut scratch, rng)
            .with_context(|| format!("Failed to generate source #{}", i + 1))?;
        vector::add_in_place(&mut acc, &scratch)?;
    }
    Ok(acc)
}

fn scale<W: Word, const F: u32>(out: &mut [Fixed<W, F>], amplitude: f64) {
    if amplitude != 1.0 {
        vector::real_mul_in_place(out, Fixed::from_f64(amplitude));
    }
}

fn render<W: Word, const F: u32>(
    source: &SourceConfig,
    out: &mut [Fixed<W, F>],
    rng: &mut ParkMiller,
) -> DspResult<()> {
    let q = Fixed::<W, F>::from_f64;
    match *source {
        SourceConfig::Sine { frequency, sample_rate, amplitude, phase } => {
            signal::gen_sin(out, frequency, sample_rate, q(phase))?;
            scale(out, amplitude);
        }
        SourceConfig::Cosine { frequency, sample_rate, amplitude, phase } => {
            signal::gen_cos(out, frequency, sample_rate, q(phase))?;
            scale(out, amplitude);
        }
        SourceConfig::Noise { amplitude } => signal::noise(out, q(amplitude), rng),
        SourceConfig::Square { frequency, sample_rate, amplitude, delay } => {
            signal::sqr(out, frequency, sample_rate, q(delay))?;
            scale(out, amplitude);
        }
        SourceConfig::Rect { frequency, sample_rate, duty, amplitude, delay } => {
            signal::rect(out, frequency, sample_rate, q(duty), q(delay))?;
            scale(out, amplitude);
        }
        SourceConfig::Saw { frequency, sample_rate, duty, amplitude, delay } => {
            signal::saw(out, frequency, sample_rate, q(duty), q(delay))?;
            scale(out, amplitude);
        }
        SourceConfig::Ramp { increment } => signal::ramp(out, q(increment))?,
        SourceConfig::Step { initial, final_value, index } => {
            signal::step(out, q(initial), q(final_value), index)
        }
        SourceConfig::Dirac { index } => signal::dirac(out, index),
        SourceConfig::DiracComb { frequency, sample_rate, delay } => {
            signal::dcomb(out, frequency, sample_rate, q(delay))?
        }
    }
    Ok(())
}

fn apply_filter<W: Word, const F: u32>(
    filter: &FilterConfig,
    input: &[Fixed<W, F>],
    rng: &mut ParkMiller,
) -> Result<Vec<Fixed<W, F>>> {
    let mut out = vec![Fixed::ZERO; input.len()];
    match filter {
        FilterConfig::Fir { taps, cutoff, sample_rate, table } => {
            let table = match table {
                Some(path) => load_table(path)?,
                None => lp_fir_table::<W, F>(*taps, *cutoff, *sample_rate)?,
            };
            debug!(taps = table.len(), "FIR filter");
            FirFilter::<W, F>::from_table(&table)?.process(input, &mut out)?;
        }
        FilterConfig::Iir {
            numerator,
            numerator_prediv,
            denominator,
            denominator_prediv,
        } => {
            let quantize = |reals: &[f64]| -> Vec<Fixed<W, F>> {
                reals.iter().map(|&r| Fixed::from_f64(r)).collect()
            };
            let mut iir = IirFilter::<W, F>::new(
                quantize(numerator),
                *numerator_prediv,
                quantize(denominator),
                *denominator_prediv,
            )?;
            debug!(order = denominator.len(), "IIR filter");
            iir.process(input, &mut out)?;
        }
        FilterConfig::Lms { taps, mu, normalized, desired, emit } => {
            let desired = synthesize::<W, F>(desired, input.len(), rng)?;
            let mu = adaptive_mu(*mu, *normalized);
            let weights = vec![Fixed::ZERO; *taps];
            if *normalized {
                let mut nlms = NlmsFilter::with_weights(weights, mu)?;
                adapt(input, &desired, &mut out, *emit, |x, d| nlms.process(x, d))?;
            } else {
                let mut lms = LmsFilter::with_weights(weights, mu)?;
                adapt(input, &desired, &mut out, *emit, |x, d| lms.process(x, d))?;
            }
        }
        FilterConfig::Interpolate { ratio, taps, sample_rate } => {
            let mut interpolator = Interpolator::<W, F>::design(*taps, *ratio, *sample_rate)?;
            out = vec![Fixed::ZERO; input.len() * interpolator.ratio()];
            debug!(ratio, taps, "Polyphase interpolation");
            interpolator.process(input, &mut out)?;
        }
    }
    Ok(out)
}

/// Drive an adaptive filter sample by sample, keeping one of its outputs.
fn adapt<W: Word, const F: u32>(
    input: &[Fixed<W, F>],
    desired: &[Fixed<W, F>],
    out: &mut [Fixed<W, F>],
    emit: AdaptiveOutput,
    mut step: impl FnMut(Fixed<W, F>, Fixed<W, F>) -> DspResult<(Fixed<W, F>, Fixed<W, F>)>,
) -> Result<()> {
    let mut last_error = Fixed::<W, F>::ZERO;
    for ((slot, &x), &d) in out.iter_mut().zip(input).zip(desired) {
        let (y, e) = step(x, d)?;
        *slot = match emit {
            AdaptiveOutput::Error => e,
            AdaptiveOutput::Output => y,
        };
        last_error = e;
    }
    info!(final_error = last_error.to_f64(), "Adaptive filter finished");
    Ok(())
}

/// Read a JSON coefficient table.
pub fn load_table(path: &Path) -> Result<CoefficientTable> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read coefficient table: {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse coefficient table: {:?}", path))
}

/// Weights of a window of `size` samples.
pub fn window_weights(kind: WindowType, format: QFormat, size: usize) -> Result<Samples> {
    with_format!(format, window_in(kind, size))
}

fn window_in<W: Word, const F: u32>(kind: WindowType, size: usize) -> Result<Samples> {
    let mut out = vec![Fixed::<W, F>::ZERO; size];
    generate_window(kind, &mut out)?;
    Ok(Samples::from_fixed(&out))
}

/// Design a low-pass FIR table.
pub fn design_lowpass(
    format: QFormat,
    taps: usize,
    cutoff: u32,
    sample_rate: u32,
) -> Result<CoefficientTable> {
    info!(format = %format, taps, cutoff, sample_rate, "Designing low-pass filter");
    with_format!(format, design_in(taps, cutoff, sample_rate))
}

fn design_in<W: Word, const F: u32>(
    taps: usize,
    cutoff: u32,
    sample_rate: u32,
) -> Result<CoefficientTable> {
    Ok(lp_fir_table::<W, F>(taps, cutoff, sample_rate)?)
}

/// Reorder a prototype table into `ratio` polyphase sub-filters of `n_tap` taps.
pub fn sort_table(
    table: &CoefficientTable,
    n_tap: usize,
    ratio: usize,
) -> Result<CoefficientTable> {
    with_format!(table.format, sort_in(table, n_tap, ratio))
}

fn sort_in<W: Word, const F: u32>(
    table: &CoefficientTable,
    n_tap: usize,
    ratio: usize,
) -> Result<CoefficientTable> {
    let mut coefs = table.to_fixed::<W, F>()?;
    coefsort(&mut coefs, n_tap, ratio)?;
    Ok(CoefficientTable::from_fixed(&coefs))
}

/// `count` Park–Miller values starting from `seed`.
pub fn random(format: QFormat, seed: i32, count: usize) -> Result<Samples> {
    with_format!(format, random_in(seed, count))
}

fn random_in<W: Word, const F: u32>(seed: i32, count: usize) -> Result<Samples> {
    let mut rng = ParkMiller::with_seed(seed);
    let mut out = vec![Fixed::<W, F>::ZERO; count];
    rng.fill(&mut out);
    Ok(Samples::from_fixed(&out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_fixed::{Q15, Q24};

    fn sine(frequency: u32, sample_rate: u32) -> SourceConfig {
        SourceConfig::Sine {
            frequency,
            sample_rate,
            amplitude: 1.0,
            phase: 0.0,
        }
    }

    #[test]
    fn test_single_sine_matches_generator() {
        let config = PipelineConfig::single_source(QFormat::Q1_15, 100, 1, sine(1, 100));
        let samples = run(&config).unwrap();

        let mut expected = vec![Q15::ZERO; 100];
        signal::gen_sin(&mut expected, 1, 100, Q15::ZERO).unwrap();
        assert_eq!(samples, Samples::from_fixed(&expected));
        assert_eq!(samples.format, QFormat::Q1_15);
    }

    #[test]
    fn test_sources_are_summed() {
        let mut config = PipelineConfig::single_source(
            QFormat::Q4_12,
            8,
            1,
            SourceConfig::Step { initial: 0.0, final_value: 1.0, index: 4 },
        );
        config.sources.push(SourceConfig::Dirac { index: 1 });
        let values = run(&config).unwrap().values();
        assert_eq!(values, vec![0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_fir_impulse_response_is_the_design() {
        let source = SourceConfig::Dirac { index: 0 };
        let mut config = PipelineConfig::single_source(QFormat::Q8_24, 32, 1, source);
        config.filter = Some(FilterConfig::Fir {
            taps: 15,
            cutoff: 1000,
            sample_rate: 8000,
            table: None,
        });
        let samples = run(&config).unwrap();

        let table = lp_fir_table::<i32, 24>(15, 1000, 8000).unwrap();
        assert_eq!(&samples.raw[..15], &table.coefficients[..]);
        assert!(samples.raw[15..].iter().all(|&r| r == 0));
    }

    #[test]
    fn test_fir_from_table_file() {
        let table = CoefficientTable::from_fixed(&[Q24::q(0.5), Q24::q(0.5)]);
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::fs::write(file.path(), serde_json::to_string(&table).unwrap()).unwrap();

        let mut config = PipelineConfig::single_source(
            QFormat::Q8_24,
            4,
            1,
            SourceConfig::Ramp { increment: 0.25 },
        );
        config.filter = Some(FilterConfig::Fir {
            taps: 0,
            cutoff: 0,
            sample_rate: 0,
            table: Some(file.path().to_path_buf()),
        });
        let values = run(&config).unwrap().values();
        assert_eq!(values, vec![0.0, 0.125, 0.375, 0.625]);
    }

    #[test]
    fn test_table_in_wrong_format_is_rejected() {
        let table = CoefficientTable::from_fixed(&[Q15::q(0.5)]);
        let file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        std::fs::write(file.path(), serde_json::to_string(&table).unwrap()).unwrap();

        let source = SourceConfig::Dirac { index: 0 };
        let mut config = PipelineConfig::single_source(QFormat::Q1_31, 4, 1, source);
        config.filter = Some(FilterConfig::Fir {
            taps: 0,
            cutoff: 0,
            sample_rate: 0,
            table: Some(file.path().to_path_buf()),
        });
        let err = run(&config).unwrap_err();
        assert!(format!("{err:#}").contains("Format mismatch"), "{err:#}");
    }

    #[test]
    fn test_iir_pipeline() {
        let source = SourceConfig::Dirac { index: 0 };
        let mut config = PipelineConfig::single_source(QFormat::Q1_15, 5, 1, source);
        config.filter = Some(FilterConfig::Iir {
            numerator: vec![0.5],
            numerator_prediv: 1,
            denominator: vec![-0.5],
            denominator_prediv: 0,
        });
        let samples = run(&config).unwrap();
        assert_eq!(samples.len(), 5);
        assert!(samples.raw[0] > 0);
        assert!(samples.raw.windows(2).all(|w| w[1] <= w[0]));
    }

    #[test]
    fn test_lms_output_plus_error_is_desired() {
        let run_emit = |emit| {
            let mut config = PipelineConfig::single_source(QFormat::Q1_15, 64, 1, sine(3, 64));
            config.filter = Some(FilterConfig::Lms {
                taps: 4,
                mu: None,
                normalized: false,
                desired: vec![SourceConfig::Step { initial: 0.0, final_value: 0.25, index: 8 }],
                emit,
            });
            run(&config).unwrap()
        };
        let y = run_emit(AdaptiveOutput::Output);
        let e = run_emit(AdaptiveOutput::Error);
        for (i, (y, e)) in y.raw.iter().zip(&e.raw).enumerate() {
            let d = Q15::wrapping_from_raw(y + e);
            let expected = if i < 8 { Q15::ZERO } else { Q15::q(0.25) };
            assert_eq!(d, expected, "sample {i}");
        }
    }

    #[test]
    fn test_interpolation_multiplies_length() {
        let mut config = PipelineConfig::single_source(QFormat::Q1_31, 20, 1, sine(1, 20));
        config.filter = Some(FilterConfig::Interpolate {
            ratio: 4,
            taps: 8,
            sample_rate: 8000,
        });
        assert_eq!(run(&config).unwrap().len(), 80);
    }

    #[test]
    fn test_noise_is_reproducible_from_seed() {
        let noise = SourceConfig::Noise { amplitude: 1.0 };
        let config = PipelineConfig::single_source(QFormat::Q4_12, 16, 42, noise);
        let a = run(&config).unwrap();
        assert_eq!(a, run(&config).unwrap());
        assert_eq!(a, random(QFormat::Q4_12, 42, 16).unwrap());
    }

    #[test]
    fn test_rectangular_window_changes_nothing() {
        let mut config = PipelineConfig::single_source(QFormat::Q1_15, 32, 1, sine(2, 32));
        let plain = run(&config).unwrap();
        config.window = Some("rectangular".into());
        assert_eq!(run(&config).unwrap(), plain);
    }

    #[test]
    fn test_window_weights() {
        let w = window_weights(WindowType::Bartlett, QFormat::Q1_15, 5).unwrap();
        assert_eq!(w.raw, vec![0, 16384, 32767, 16384, 0]);
    }

    #[test]
    fn test_sort_table() {
        let table = CoefficientTable {
            format: QFormat::Q1_15,
            coefficients: (0..6).collect(),
        };
        let sorted = sort_table(&table, 3, 2).unwrap();
        assert_eq!(sorted.coefficients, vec![0, 2, 4, 1, 3, 5]);
        assert!(sort_table(&table, 4, 2).is_err());
    }

    #[test]
    fn test_unsupported_format() {
        let format: QFormat = "Q2.14".parse().unwrap();
        assert!(random(format, 1, 4).is_err());
        assert!(design_lowpass(format, 5, 1, 4).is_err());
    }
}
