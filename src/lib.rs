//! # map-refine
//!
//! A library for turning approximate sequence mappings into base-level alignments.
//!
//! Seed-and-filter mappers report where a query probably lies on a reference,
//! one PAF-like line per hint, without saying exactly how the bases line up.
//! `map-refine` aligns the query window of each hint against its reference
//! window with a banded edit-distance kernel, and writes the original line back
//! with the edit distance, alignment length, divergence and CIGAR appended.
//!
//! ## Features
//!
//! - **Streaming merge**: mappings and query sequences are walked in lockstep
//! - **Indexed merge**: tolerates mappings in any order
//! - **Banded alignment**: only cells within the identity bound are computed
//! - **Worker pool**: lock-free bounded queues between reader, workers and writer
//! - **Ordered output**: optional reorder stage restores mapping order
//!
//! ## Example
//!
//! ```rust,no_run
//! use map_refine::parsing::fasta::MultiFastaReader;
//! use map_refine::parsing::mapping::MappingSource;
//! use map_refine::pipeline::builder::StreamingTaskBuilder;
//! use map_refine::{PipelineConfig, Scheduler, SequenceStore};
//! use std::path::Path;
//!
//! let store = SequenceStore::load(&["ref.fa"]).unwrap();
//! let mappings = MappingSource::from_path(Path::new("hints.paf")).unwrap();
//! let source = StreamingTaskBuilder::new(&store, mappings);
//! let queries = MultiFastaReader::new(&["reads.fa"]);
//!
//! let config = PipelineConfig { threads: 4, pct_identity: 90.0, ..PipelineConfig::default() };
//! let summary = Scheduler::new(&store, config)
//!     .unwrap()
//!     .run(queries, source, std::io::stdout())
//!     .unwrap();
//! eprintln!("{summary}");
//! ```
//!
//! ## Modules
//!
//! - [`align`]: Banded edit-distance kernel and CIGAR strings
//! - [`core`]: Core data types for sequences, mappings and tasks
//! - [`parsing`]: FASTA and mapping-hint readers
//! - [`pipeline`]: Reader, worker pool and writer
//! - [`store`]: In-memory reference sequences
//! - [`cli`]: Command-line interface implementation

pub mod align;
pub mod cli;
pub mod core;
pub mod parsing;
pub mod pipeline;
pub mod store;
pub mod utils;

// Re-export commonly used types for convenience
pub use align::{AlignMode, Alignment, AlignmentEngine, Cigar, CigarOp, EditBound};
pub use core::error::ConfigError;
pub use core::record::MappingRecord;
pub use core::sequence::Sequence;
pub use core::types::*;
pub use pipeline::{PipelineConfig, PipelineError, PipelineSummary, Scheduler};
pub use store::{SequenceStore, StoreError};
