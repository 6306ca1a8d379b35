//! Output formatting.
//!
//! One line per target in plain mode (`host:port: OK <bytes>` or
//! `host:port: Error <description>`), or the full result set as JSON.

use crate::cli::OutputFormat;
use crate::types::{ProbeOutcome, ProbeResult};
use std::io::{self, Write};

/// Render one result as its report line.
pub fn format_line(result: &ProbeResult) -> String {
    match &result.outcome {
        ProbeOutcome::Success { bytes_received } => {
            format!("{}: OK {}", result.target, bytes_received)
        }
        ProbeOutcome::Failure { error } => format!("{}: Error {}", result.target, error),
    }
}

/// Print results to stdout in the requested format.
pub fn print_results(results: &[ProbeResult], format: OutputFormat) -> io::Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    write_results(&mut out, results, format)
}

/// Write results to any sink in the requested format.
pub fn write_results(
    out: &mut impl Write,
    results: &[ProbeResult],
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Plain => {
            for result in results {
                writeln!(out, "{}", format_line(result))?;
            }
            Ok(())
        }
        OutputFormat::Json => {
            serde_json::to_writer_pretty(&mut *out, results)?;
            writeln!(out)
        }
    }
}
