//! Command-line interface for map-refine.
//!
//! This module implements the CLI using clap. Available commands:
//!
//! - **align**: Refine mapping hints into edit-distance alignments
//! - **validate**: Check mapping hints against the reference sequences
//!
//! ## Usage
//!
//! ```text
//! # Align with 8 workers, requiring 90% identity
//! map-refine align -r ref.fa -q reads.fa -m hints.paf -t 8 -p 90 -o out.paf
//!
//! # Keep output in mapping order and tolerate unsorted hints
//! map-refine align -r ref.fa -q reads.fa -m hints.paf --ordered --merge indexed
//!
//! # Check a mapping file before a long run
//! map-refine validate -r ref.fa -m hints.paf --format json
//! ```

use clap::{Parser, Subcommand};

pub mod align;
pub mod validate;

#[derive(Parser)]
#[command(name = "map-refine")]
#[command(author = "Fulcrum Genomics")]
#[command(version)]
#[command(about = "Refine approximate sequence mappings into base-level alignments")]
#[command(
    long_about = "map-refine takes the approximate mapping hints written by a seed-and-filter mapper and computes a base-level edit-distance alignment for each one.\n\nEvery mapping line is echoed with four tags appended:\n- ed:i  edit distance\n- al:i  alignment length\n- ad:f  divergence (edit distance / alignment length)\n- cg:Z  CIGAR string over M, I and D"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for summaries and reports
    #[arg(short, long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Align every mapping hint
    Align(align::AlignArgs),

    /// Check mapping hints against the reference sequences
    Validate(validate::ValidateArgs),
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Tsv,
}

/// Print `(name, value)` pairs as a two-line TSV table
pub(crate) fn tsv_table<W: std::io::Write>(out: &mut W, fields: &[(&str, u64)]) -> std::io::Result<()> {
    let header: Vec<&str> = fields.iter().map(|(name, _)| *name).collect();
    let values: Vec<String> = fields.iter().map(|(_, value)| value.to_string()).collect();
    writeln!(out, "{}", header.join("\t"))?;
    writeln!(out, "{}", values.join("\t"))
}
