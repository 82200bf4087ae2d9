//! Pipeline configuration loading and validation.

use anyhow::{Context, Result};
use lib_dsp::filter::{DEFAULT_LMS_MU, DEFAULT_NLMS_MU};
use lib_dsp::rand::DEFAULT_SEED;
use lib_dsp::WindowType;
use lib_fixed::QFormat;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Formats the pipeline can run in.
pub const SUPPORTED_FORMATS: [QFormat; 4] = [
    QFormat::Q1_15,
    QFormat::Q4_12,
    QFormat::Q1_31,
    QFormat::Q8_24,
];

/// Upper bound on generated samples per run.
const MAX_SAMPLES: usize = 1 << 24;

/// Top-level pipeline configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Pipeline name/description.
    #[serde(default = "default_name")]
    pub name: String,

    /// Q-format of every buffer, e.g. "Q1.15".
    #[serde(default = "default_format")]
    pub format: String,

    /// Number of samples the sources generate.
    #[serde(default = "default_samples")]
    pub samples: usize,

    /// Park–Miller seed for noise sources.
    #[serde(default = "default_seed")]
    pub seed: i32,

    /// Signal sources, summed sample by sample.
    pub sources: Vec<SourceConfig>,

    /// Window applied to the summed signal.
    #[serde(default)]
    pub window: Option<String>,

    /// Filter stage applied last.
    #[serde(default)]
    pub filter: Option<FilterConfig>,
}

fn default_name() -> String {
    "pipeline".to_string()
}
fn default_format() -> String {
    "Q1.15".to_string()
}
fn default_samples() -> usize {
    256
}
fn default_seed() -> i32 {
    DEFAULT_SEED
}
fn default_amplitude() -> f64 {
    1.0
}
fn default_duty() -> f64 {
    0.5
}
fn default_fir_taps() -> usize {
    31
}
fn default_interpolation_taps() -> usize {
    8
}

/// One signal source.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SourceConfig {
    Sine {
        frequency: u32,
        sample_rate: u32,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        /// Start angle in half-turns.
        #[serde(default)]
        phase: f64,
    },
    Cosine {
        frequency: u32,
        sample_rate: u32,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        #[serde(default)]
        phase: f64,
    },
    Noise {
        #[serde(default = "default_amplitude")]
        amplitude: f64,
    },
    Square {
        frequency: u32,
        sample_rate: u32,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        /// Delay as a fraction of the period.
        #[serde(default)]
        delay: f64,
    },
    Rect {
        frequency: u32,
        sample_rate: u32,
        #[serde(default = "default_duty")]
        duty: f64,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        #[serde(default)]
        delay: f64,
    },
    Saw {
        frequency: u32,
        sample_rate: u32,
        #[serde(default = "default_duty")]
        duty: f64,
        #[serde(default = "default_amplitude")]
        amplitude: f64,
        #[serde(default)]
        delay: f64,
    },
    Ramp {
        increment: f64,
    },
    Step {
        initial: f64,
        #[serde(rename = "final")]
        final_value: f64,
        index: usize,
    },
    Dirac {
        #[serde(default)]
        index: usize,
    },
    DiracComb {
        frequency: u32,
        sample_rate: u32,
        #[serde(default)]
        delay: f64,
    },
}

impl SourceConfig {
    fn rate(&self) -> Option<(u32, u32)> {
        match *self {
            Self::Sine { frequency, sample_rate, .. }
            | Self::Cosine { frequency, sample_rate, .. }
            | Self::Square { frequency, sample_rate, .. }
            | Self::Rect { frequency, sample_rate, .. }
            | Self::Saw { frequency, sample_rate, .. }
            | Self::DiracComb { frequency, sample_rate, .. } => Some((frequency, sample_rate)),
            _ => None,
        }
    }

    fn duty(&self) -> Option<f64> {
        match *self {
            Self::Rect { duty, .. } | Self::Saw { duty, .. } => Some(duty),
            _ => None,
        }
    }
}

/// Which LMS signal the pipeline emits.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AdaptiveOutput {
    /// The error `d - y`.
    #[default]
    Error,
    /// The filter output `y`.
    Output,
}

/// Filter stage.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Low-pass FIR, designed or read from a coefficient table.
    Fir {
        #[serde(default = "default_fir_taps")]
        taps: usize,
        #[serde(default)]
        cutoff: u32,
        #[serde(default)]
        sample_rate: u32,
        /// JSON coefficient table; replaces the design parameters.
        #[serde(default)]
        table: Option<PathBuf>,
    },
    Iir {
        numerator: Vec<f64>,
        #[serde(default)]
        numerator_prediv: u32,
        #[serde(default)]
        denominator: Vec<f64>,
        #[serde(default)]
        denominator_prediv: u32,
    },
    /// Adaptive filter driven towards the `desired` sources.
    Lms {
        taps: usize,
        /// Step-size exponent; defaults per algorithm.
        #[serde(default)]
        mu: Option<u32>,
        #[serde(default)]
        normalized: bool,
        desired: Vec<SourceConfig>,
        #[serde(default)]
        emit: AdaptiveOutput,
    },
    /// Polyphase interpolation with a designed anti-imaging filter.
    Interpolate {
        ratio: usize,
        #[serde(default = "default_interpolation_taps")]
        taps: usize,
        sample_rate: u32,
    },
}

impl PipelineConfig {
    /// Parsed Q-format.
    pub fn q_format(&self) -> Result<QFormat> {
        self.format
            .parse::<QFormat>()
            .with_context(|| format!("Invalid Q-format: {:?}", self.format))
    }

    /// Parsed window, if any.
    pub fn window_type(&self) -> Result<Option<WindowType>> {
        self.window
            .as_deref()
            .map(|name| name.parse::<WindowType>())
            .transpose()
            .with_context(|| format!("Invalid window: {:?}", self.window))
    }

    /// A pipeline with a single source and nothing else.
    pub fn single_source(format: QFormat, samples: usize, seed: i32, source: SourceConfig) -> Self {
        Self {
            name: default_name(),
            format: format.to_string(),
            samples,
            seed,
            sources: vec![source],
            window: None,
            filter: None,
        }
    }
}

/// Load configuration from a file: JSON for `.json`, TOML otherwise.
pub fn load_config(path: &Path) -> Result<PipelineConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: PipelineConfig = if path.extension().is_some_and(|e| e == "json") {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config as JSON: {:?}", path))?
    } else {
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config as TOML: {:?}", path))?
    };

    validate_config(&config)?;

    Ok(config)
}

fn validate_source(source: &SourceConfig, label: &str) -> Result<()> {
    if let Some((frequency, sample_rate)) = source.rate() {
        if sample_rate == 0 {
            anyhow::bail!("{} source has a zero sample rate", label);
        }
        if frequency == 0 {
            anyhow::bail!("{} source has a zero frequency", label);
        }
    }
    if let SourceConfig::DiracComb { frequency, sample_rate, .. } = source {
        if frequency > sample_rate {
            anyhow::bail!(
                "{} dirac comb frequency {} exceeds sample rate {}",
                label,
                frequency,
                sample_rate
            );
        }
    }
    if let Some(duty) = source.duty() {
        if !(duty > 0.0 && duty <= 1.0) {
            anyhow::bail!("{} duty cycle must be in (0, 1], got {}", label, duty);
        }
    }
    if let SourceConfig::Ramp { increment } = source {
        if *increment < 0.0 {
            anyhow::bail!("{} ramp increment must be >= 0, got {}", label, increment);
        }
    }
    Ok(())
}

/// Validate configuration.
pub fn validate_config(config: &PipelineConfig) -> Result<()> {
    let format = config.q_format()?;
    if !SUPPORTED_FORMATS.contains(&format) {
        anyhow::bail!(
            "Unsupported Q-format {}. Must be one of Q1.15, Q4.12, Q1.31 or Q8.24",
            format
        );
    }

    if config.samples == 0 || config.samples > MAX_SAMPLES {
        anyhow::bail!("Sample count must be in 1..={}, got {}", MAX_SAMPLES, config.samples);
    }

    if config.sources.is_empty() {
        anyhow::bail!("At least one source is required");
    }
    for (i, source) in config.sources.iter().enumerate() {
        validate_source(source, &format!("Source #{}", i + 1))?;
    }

    let window = config.window_type()?;
    if let Some(kind) = window {
        if config.samples < kind.min_size() {
            anyhow::bail!("{} window needs at least {} samples", kind, kind.min_size());
        }
    }

    match &config.filter {
        Some(FilterConfig::Fir { taps, cutoff, sample_rate, table }) => {
            if let Some(table) = table {
                if !table.exists() {
                    anyhow::bail!("Coefficient table not found: {:?}", table);
                }
            } else {
                if *taps == 0 {
                    anyhow::bail!("FIR filter needs at least one tap");
                }
                if *sample_rate == 0 || *cutoff == 0 || 2 * *cutoff as u64 > *sample_rate as u64 {
                    anyhow::bail!(
                        "FIR cut-off {} must be in (0, sample_rate / 2] for sample_rate {}",
                        cutoff,
                        sample_rate
                    );
                }
            }
        }
        Some(FilterConfig::Iir {
            numerator,
            numerator_prediv,
            denominator_prediv,
            ..
        }) => {
            if numerator.is_empty() {
                anyhow::bail!("IIR numerator must not be empty");
            }
            if *numerator_prediv > format.frac || *denominator_prediv > format.frac {
                anyhow::bail!(
                    "IIR pre-division must not exceed the {} fractional bits",
                    format.frac
                );
            }
        }
        Some(FilterConfig::Lms { taps, mu, desired, .. }) => {
            if *taps == 0 {
                anyhow::bail!("LMS filter needs at least one tap");
            }
            if *mu == Some(0) {
                anyhow::bail!("LMS step-size exponent must be at least 1");
            }
            if desired.is_empty() {
                anyhow::bail!("LMS filter needs at least one desired source");
            }
            for (i, source) in desired.iter().enumerate() {
                validate_source(source, &format!("Desired source #{}", i + 1))?;
            }
        }
        Some(FilterConfig::Interpolate { ratio, taps, sample_rate }) => {
            if *ratio == 0 || *taps == 0 {
                anyhow::bail!("Interpolation needs a nonzero ratio and tap count");
            }
            if *sample_rate == 0 {
                anyhow::bail!("Interpolation needs a nonzero sample rate");
            }
        }
        None => {}
    }

    Ok(())
}

/// Step-size exponent for an adaptive filter, falling back to the
/// algorithm's default.
pub fn adaptive_mu(mu: Option<u32>, normalized: bool) -> u32 {
    mu.unwrap_or(if normalized { DEFAULT_NLMS_MU } else { DEFAULT_LMS_MU })
}
