//! Align command - refine every mapping hint into an alignment.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use crate::align::AlignMode;
use crate::cli::{tsv_table, OutputFormat};
use crate::pipeline::{align_files, AlignInputs, MergeStrategy, PipelineConfig, PipelineSummary};
use crate::utils::validation::{DEFAULT_QUEUE_CAPACITY, MAX_THREADS};

/// Arguments for the align command
#[derive(Args)]
pub struct AlignArgs {
    /// Reference FASTA file(s), plain or gzip compressed
    #[arg(short, long, required = true, num_args = 1..)]
    pub reference: Vec<PathBuf>,

    /// Query FASTA file(s), read in the order given
    #[arg(short, long, required = true, num_args = 1..)]
    pub query: Vec<PathBuf>,

    /// Mapping hints, at least 9 whitespace-separated columns per line ("-" for stdin)
    #[arg(short, long)]
    pub mappings: PathBuf,

    /// Output file ("-" for stdout)
    #[arg(short, long, default_value = "-")]
    pub output: PathBuf,

    /// Number of worker threads
    #[arg(short, long, default_value = "1",
          value_parser = clap::value_parser!(u16).range(1..=MAX_THREADS as i64))]
    pub threads: u16,

    /// Minimum percentage identity (0 disables the edit-distance bound)
    #[arg(short, long, default_value = "0", value_parser = parse_identity)]
    pub pct_identity: f64,

    /// Capacity of each internal queue
    #[arg(long, default_value_t = DEFAULT_QUEUE_CAPACITY)]
    pub queue_capacity: usize,

    /// Alignment mode
    #[arg(long, default_value = "infix")]
    pub mode: AlignMode,

    /// How mappings are matched to query sequences
    #[arg(long, default_value = "streaming")]
    pub merge: MergeStrategy,

    /// Write output lines in mapping order rather than completion order
    #[arg(long)]
    pub ordered: bool,

    /// Microseconds to sleep when a queue is empty or full
    #[arg(long, default_value = "100")]
    pub poll_interval_us: u64,
}

impl AlignArgs {
    pub fn config(&self) -> PipelineConfig {
        PipelineConfig {
            threads: usize::from(self.threads),
            pct_identity: self.pct_identity,
            queue_capacity: self.queue_capacity,
            mode: self.mode,
            merge: self.merge,
            ordered: self.ordered,
            poll_interval_us: self.poll_interval_us,
        }
    }
}

fn parse_identity(value: &str) -> Result<f64, String> {
    let pct: f64 = value.parse().map_err(|_| format!("'{value}' is not a number"))?;
    if (0.0..=100.0).contains(&pct) {
        Ok(pct)
    } else {
        Err(format!("{pct} is not between 0 and 100"))
    }
}

/// Execute the align command
///
/// # Errors
///
/// Returns an error if an input cannot be read, a mapping is inconsistent
/// with the sequences, or the output cannot be written.
pub fn run(args: AlignArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let config = args.config();
    if verbose {
        eprintln!(
            "Aligning {} with {} worker(s), min identity {}%",
            args.mappings.display(),
            config.threads,
            config.pct_identity
        );
    }

    let output: Box<dyn Write + Send> = if args.output.as_os_str() == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(
            File::create(&args.output)
                .with_context(|| format!("Failed to create output file {}", args.output.display()))?,
        )
    };

    let inputs = AlignInputs {
        references: args.reference,
        queries: args.query,
        mappings: args.mappings,
    };
    let summary = align_files(&inputs, config, output)?;

    print_summary(&summary, format)?;
    Ok(())
}

/// Summaries go to stderr so they never mix with alignments on stdout
fn print_summary(summary: &PipelineSummary, format: OutputFormat) -> anyhow::Result<()> {
    let mut err = io::stderr().lock();
    match format {
        OutputFormat::Text => writeln!(err, "{summary}")?,
        OutputFormat::Json => writeln!(err, "{}", serde_json::to_string_pretty(summary)?)?,
        OutputFormat::Tsv => tsv_table(&mut err, &summary.fields())?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_identity() {
        assert_eq!(parse_identity("95.5"), Ok(95.5));
        assert_eq!(parse_identity("0"), Ok(0.0));
        assert!(parse_identity("100.1").is_err());
        assert!(parse_identity("-1").is_err());
        assert!(parse_identity("abc").is_err());
    }
}
