//! qdsp: fixed-point signal generation, windowing and filtering from the
//! command line.

mod config;
mod output;
mod pipeline;

use anyhow::Result;
use clap::{Parser, Subcommand};
use config::{PipelineConfig, SourceConfig};
use lib_dsp::rand::DEFAULT_SEED;
use lib_dsp::WindowType;
use lib_fixed::QFormat;
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "qdsp")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
enum SignalKind {
    Sine,
    Cosine,
    Noise,
    Square,
    Rect,
    Saw,
    Ramp,
    Step,
    Dirac,
    DiracComb,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a pipeline described by a TOML or JSON file
    Run {
        /// Path to the pipeline configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Load and validate a pipeline configuration without running it
    Check {
        /// Path to the pipeline configuration file
        config: PathBuf,
    },

    /// Generate a test signal
    Generate {
        /// Signal shape
        kind: SignalKind,

        /// Q-format of the samples
        #[arg(short, long, default_value = "Q1.15")]
        q: QFormat,

        /// Number of samples
        #[arg(short = 'n', long, default_value = "256")]
        samples: usize,

        /// Signal frequency (Hz)
        #[arg(long, default_value = "1000")]
        frequency: u32,

        /// Sample rate (Hz)
        #[arg(long, default_value = "8000")]
        sample_rate: u32,

        /// Peak amplitude
        #[arg(long, default_value = "1.0")]
        amplitude: f64,

        /// Start angle of sine/cosine in half-turns
        #[arg(long, default_value = "0.0")]
        phase: f64,

        /// Duty cycle of rect/saw
        #[arg(long, default_value = "0.5")]
        duty: f64,

        /// Delay as a fraction of the period
        #[arg(long, default_value = "0.0")]
        delay: f64,

        /// Ramp increment per sample
        #[arg(long, default_value = "0.01")]
        increment: f64,

        /// Step/impulse position
        #[arg(long, default_value = "0")]
        index: usize,

        /// Noise seed
        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: i32,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print window weights
    Window {
        /// Window type (rectangular, bartlett, hamming, hann, blackman, welch,
        /// gauss, kaiser[:alpha])
        kind: WindowType,

        #[arg(short, long, default_value = "Q1.15")]
        q: QFormat,

        #[arg(short = 'n', long, default_value = "64")]
        samples: usize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Design a low-pass FIR filter
    Design {
        /// Number of taps
        #[arg(short, long, default_value = "31")]
        taps: usize,

        /// Cut-off frequency (Hz)
        #[arg(long)]
        cutoff: u32,

        /// Sample rate (Hz)
        #[arg(long)]
        sample_rate: u32,

        #[arg(short, long, default_value = "Q1.15")]
        q: QFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Reorder a coefficient table into polyphase sub-filters
    Coefsort {
        /// JSON coefficient table
        table: PathBuf,

        /// Taps per sub-filter
        #[arg(short, long)]
        taps: usize,

        /// Interpolation ratio (number of sub-filters)
        #[arg(short, long)]
        ratio: usize,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Draw Park-Miller pseudo-random values
    Rand {
        #[arg(short = 'n', long, default_value = "16")]
        count: usize,

        #[arg(long, default_value_t = DEFAULT_SEED)]
        seed: i32,

        #[arg(short, long, default_value = "Q1.15")]
        q: QFormat,

        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    let format = cli.format;
    match cli.command {
        Commands::Run { config, output } => {
            run_pipeline(&config, output.as_deref(), format)?;
        }
        Commands::Check { config } => {
            check_config(&config)?;
        }
        Commands::Generate {
            kind,
            q,
            samples,
            frequency,
            sample_rate,
            amplitude,
            phase,
            duty,
            delay,
            increment,
            index,
            seed,
            output,
        } => {
            let source = match kind {
                SignalKind::Sine => SourceConfig::Sine {
                    frequency,
                    sample_rate,
                    amplitude,
                    phase,
                },
                SignalKind::Cosine => SourceConfig::Cosine {
                    frequency,
                    sample_rate,
                    amplitude,
                    phase,
                },
                SignalKind::Noise => SourceConfig::Noise { amplitude },
                SignalKind::Square => SourceConfig::Square {
                    frequency,
                    sample_rate,
                    amplitude,
                    delay,
                },
                SignalKind::Rect => SourceConfig::Rect {
                    frequency,
                    sample_rate,
                    duty,
                    amplitude,
                    delay,
                },
                SignalKind::Saw => SourceConfig::Saw {
                    frequency,
                    sample_rate,
                    duty,
                    amplitude,
                    delay,
                },
                SignalKind::Ramp => SourceConfig::Ramp { increment },
                SignalKind::Step => SourceConfig::Step {
                    initial: 0.0,
                    final_value: amplitude,
                    index,
                },
                SignalKind::Dirac => SourceConfig::Dirac { index },
                SignalKind::DiracComb => SourceConfig::DiracComb {
                    frequency,
                    sample_rate,
                    delay,
                },
            };
            let config = PipelineConfig::single_source(q, samples, seed, source);
            config::validate_config(&config)?;
            let result = pipeline::run(&config)?;
            output::emit(output.as_deref(), |w| output::write_samples(&result, format, w))?;
        }
        Commands::Window { kind, q, samples, output } => {
            tracing::info!("Generating {} window of {} samples", kind, samples);
            let weights = pipeline::window_weights(kind, q, samples)?;
            output::emit(output.as_deref(), |w| output::write_samples(&weights, format, w))?;
        }
        Commands::Design { taps, cutoff, sample_rate, q, output } => {
            let table = pipeline::design_lowpass(q, taps, cutoff, sample_rate)?;
            output::emit(output.as_deref(), |w| output::write_table(&table, format, w))?;
        }
        Commands::Coefsort { table, taps, ratio, output } => {
            tracing::info!("Sorting {:?} into {} sub-filters of {} taps", table, ratio, taps);
            let sorted = pipeline::sort_table(&pipeline::load_table(&table)?, taps, ratio)?;
            output::emit(output.as_deref(), |w| output::write_table(&sorted, format, w))?;
        }
        Commands::Rand { count, seed, q, output } => {
            let values = pipeline::random(q, seed, count)?;
            output::emit(output.as_deref(), |w| output::write_samples(&values, format, w))?;
        }
    }

    Ok(())
}

fn run_pipeline(config_path: &Path, output: Option<&Path>, format: OutputFormat) -> Result<()> {
    tracing::info!("Loading configuration from {:?}", config_path);

    let config = config::load_config(config_path)?;
    let samples = pipeline::run(&config)?;

    output::emit(output, |w| output::write_samples(&samples, format, w))
}

fn check_config(config_path: &Path) -> Result<()> {
    let config = config::load_config(config_path)?;

    println!("Pipeline: {}", config.name);
    println!("  Format:  {}", config.q_format()?);
    println!("  Samples: {}", config.samples);
    println!("  Sources: {}", config.sources.len());
    for (i, source) in config.sources.iter().enumerate() {
        println!("    #{}: {:?}", i + 1, source);
    }
    match config.window_type()? {
        Some(kind) => println!("  Window:  {}", kind),
        None => println!("  Window:  none"),
    }
    match &config.filter {
        Some(filter) => println!("  Filter:  {:?}", filter),
        None => println!("  Filter:  none"),
    }

    Ok(())
}
