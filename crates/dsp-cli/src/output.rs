//! Result output formatting and writing.

use crate::pipeline::Samples;
use crate::OutputFormat;
use anyhow::{Context, Result};
use lib_fixed::CoefficientTable;
use std::io::Write;
use std::path::Path;

/// Write a sample buffer.
pub fn write_samples(samples: &Samples, format: OutputFormat, w: &mut dyn Write) -> Result<()> {
    let values = samples.values();
    match format {
        OutputFormat::Text => {
            writeln!(w, "{} samples in {}", samples.len(), samples.format)?;
            if let (Some(lo), Some(hi)) = (
                values.iter().copied().reduce(f64::min),
                values.iter().copied().reduce(f64::max),
            ) {
                writeln!(w, "Range: [{:.6}, {:.6}]", lo, hi)?;
            }
            writeln!(w)?;
            for (i, (raw, value)) in samples.raw.iter().zip(&values).enumerate() {
                writeln!(w, "{:>6}  {:>12}  {:>12.9}", i, raw, value)?;
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "format": samples.format.to_string(),
                "raw": samples.raw,
                "values": values,
            });
            writeln!(w, "{}", serde_json::to_string_pretty(&json)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "index,raw,value")?;
            for (i, (raw, value)) in samples.raw.iter().zip(&values).enumerate() {
                writeln!(w, "{},{},{}", i, raw, value)?;
            }
        }
    }
    Ok(())
}

/// Write a coefficient table. JSON output can be read back with
/// [`crate::pipeline::load_table`].
pub fn write_table(
    table: &CoefficientTable,
    format: OutputFormat,
    w: &mut dyn Write,
) -> Result<()> {
    match format {
        OutputFormat::Text => {
            writeln!(w, "{} coefficients in {}", table.len(), table.format)?;
            writeln!(w)?;
            for (i, (raw, value)) in table.coefficients.iter().zip(table.to_reals()).enumerate() {
                writeln!(w, "{:>6}  {:>12}  {:>12.9}", i, raw, value)?;
            }
        }
        OutputFormat::Json => {
            writeln!(w, "{}", serde_json::to_string_pretty(table)?)?;
        }
        OutputFormat::Csv => {
            writeln!(w, "index,raw,value")?;
            for (i, (raw, value)) in table.coefficients.iter().zip(table.to_reals()).enumerate() {
                writeln!(w, "{},{},{}", i, raw, value)?;
            }
        }
    }
    Ok(())
}

/// Run `write` against `path`, or stdout when there is none.
pub fn emit(path: Option<&Path>, write: impl FnOnce(&mut dyn Write) -> Result<()>) -> Result<()> {
    match path {
        Some(path) => {
            let file = std::fs::File::create(path)
                .with_context(|| format!("Failed to create output file: {:?}", path))?;
            let mut writer = std::io::BufWriter::new(file);
            write(&mut writer)?;
            writer.flush()?;
            tracing::info!("Wrote output to {:?}", path);
        }
        None => {
            let stdout = std::io::stdout();
            let mut lock = stdout.lock();
            write(&mut lock)?;
        }
    }
    Ok(())
}
