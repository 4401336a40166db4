//! Validate command - check mapping hints against the references without aligning.

use std::io::{self, Write};
use std::path::PathBuf;

use clap::Args;

use crate::cli::{tsv_table, OutputFormat};
use crate::parsing::mapping::MappingSource;
use crate::pipeline::{validate_mappings, ValidationReport};
use crate::store::SequenceStore;

/// Arguments for the validate command
#[derive(Args)]
pub struct ValidateArgs {
    /// Reference FASTA file(s), plain or gzip compressed
    #[arg(short, long, required = true, num_args = 1..)]
    pub reference: Vec<PathBuf>,

    /// Mapping hints ("-" for stdin)
    #[arg(short, long)]
    pub mappings: PathBuf,
}

/// Execute the validate command
///
/// # Errors
///
/// Returns an error if an input cannot be read, or if any mapping line
/// references a missing sequence or window.
#[allow(clippy::needless_pass_by_value)]
pub fn run(args: ValidateArgs, format: OutputFormat, verbose: bool) -> anyhow::Result<()> {
    let store = SequenceStore::load(&args.reference)?;
    if verbose {
        eprintln!(
            "Loaded {} reference sequences ({} bases)",
            store.len(),
            store.total_bases()
        );
    }

    let report = validate_mappings(MappingSource::from_path(&args.mappings)?, &store)?;

    let mut out = io::stdout().lock();
    match format {
        OutputFormat::Text => print_text_report(&mut out, &report)?,
        OutputFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?,
        OutputFormat::Tsv => tsv_table(
            &mut out,
            &[
                ("mapping_lines", report.mapping_lines),
                ("malformed_lines", report.malformed_lines),
                ("issues", report.issue_count),
            ],
        )?,
    }
    out.flush()?;

    if !report.is_clean() {
        anyhow::bail!(
            "{} mapping line(s) failed validation",
            report.issue_count
        );
    }
    Ok(())
}

fn print_text_report<W: Write>(out: &mut W, report: &ValidationReport) -> io::Result<()> {
    writeln!(out, "Mapping lines:   {}", report.mapping_lines)?;
    writeln!(out, "Malformed lines: {}", report.malformed_lines)?;
    writeln!(out, "Issues:          {}", report.issue_count)?;

    if !report.issues.is_empty() {
        writeln!(out)?;
        for issue in &report.issues {
            writeln!(out, "  {issue}")?;
        }
        let hidden = report.issue_count.saturating_sub(report.issues.len() as u64);
        if hidden > 0 {
            writeln!(out, "  ... and {hidden} more")?;
        }
    }
    Ok(())
}
