//! The concurrent alignment pipeline.
//!
//! | Role   | Threads | Consumes            | Produces            |
//! |--------|---------|---------------------|---------------------|
//! | reader | 1       | queries + mappings  | [`AlignmentTask`]s  |
//! | worker | N       | tasks               | [`TaskOutcome`]s    |
//! | writer | 1       | outcomes            | output lines        |
//!
//! Roles talk only through two [`queue::BoundedQueue`]s and the flags of a
//! [`context::SchedulerContext`].
//!
//! [`AlignmentTask`]: crate::core::task::AlignmentTask
//! [`TaskOutcome`]: crate::core::task::TaskOutcome

pub mod builder;
pub mod context;
pub mod queue;
pub mod scheduler;
pub mod validate;
pub mod worker;
pub mod writer;

use std::fmt;
use std::io;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::align::AlignMode;
use crate::core::error::ConfigError;
use crate::parsing::ParseError;
use crate::store::StoreError;
use crate::utils::validation::{
    validate_identity, validate_queue_capacity, validate_threads, DEFAULT_QUEUE_CAPACITY,
};

pub use builder::{MergeStats, MergeStrategy, TaskSource};
pub use scheduler::{align_files, AlignInputs, Scheduler};
pub use validate::{validate_mappings, ValidationReport};
pub use writer::{ResultSink, SinkStats};

/// Errors that end a pipeline run
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to write output: {0}")]
    Write(#[from] io::Error),

    #[error("Failed to start {role} thread: {source}")]
    Spawn {
        role: String,
        #[source]
        source: io::Error,
    },

    #[error("The {0} thread panicked")]
    ThreadPanicked(&'static str),
}

/// Tunables for one pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Number of worker threads
    pub threads: usize,
    /// Minimum percentage identity; 0 disables the edit-distance bound
    pub pct_identity: f64,
    /// Capacity of each of the two queues
    pub queue_capacity: usize,
    pub mode: AlignMode,
    pub merge: MergeStrategy,
    /// Write results in mapping order instead of completion order
    pub ordered: bool,
    /// Sleep between polls of an empty or full queue
    pub poll_interval_us: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threads: 1,
            pct_identity: 0.0,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            mode: AlignMode::default(),
            merge: MergeStrategy::default(),
            ordered: false,
            poll_interval_us: 100,
        }
    }
}

impl PipelineConfig {
    /// Check every setting.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidSetting` for the first setting out of range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_threads(self.threads)?;
        validate_identity(self.pct_identity)?;
        validate_queue_capacity(self.queue_capacity)?;
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_micros(self.poll_interval_us)
    }
}

/// Counters reported at the end of a successful run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub queries_read: u64,
    pub mapping_lines: u64,
    pub malformed_lines: u64,
    pub tasks_built: u64,
    pub aligned: u64,
    pub not_found: u64,
    pub unmatched_mappings: u64,
}

impl PipelineSummary {
    pub(crate) fn new(queries_read: u64, merge: &MergeStats, sink: SinkStats) -> Self {
        Self {
            queries_read,
            mapping_lines: merge.mapping_lines,
            malformed_lines: merge.malformed_lines,
            tasks_built: merge.tasks_built,
            aligned: sink.aligned,
            not_found: sink.not_found,
            unmatched_mappings: merge.unmatched_mappings,
        }
    }

    /// Field names and values in display order
    pub fn fields(&self) -> [(&'static str, u64); 7] {
        [
            ("queries_read", self.queries_read),
            ("mapping_lines", self.mapping_lines),
            ("malformed_lines", self.malformed_lines),
            ("tasks_built", self.tasks_built),
            ("aligned", self.aligned),
            ("not_found", self.not_found),
            ("unmatched_mappings", self.unmatched_mappings),
        ]
    }
}

impl fmt::Display for PipelineSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Alignment summary")?;
        writeln!(f, "  Query sequences read:  {}", self.queries_read)?;
        writeln!(f, "  Mapping lines:         {}", self.mapping_lines)?;
        writeln!(f, "  Malformed lines:       {}", self.malformed_lines)?;
        writeln!(f, "  Tasks built:           {}", self.tasks_built)?;
        writeln!(f, "  Aligned:               {}", self.aligned)?;
        writeln!(f, "  Not found:             {}", self.not_found)?;
        write!(f, "  Unmatched mappings:    {}", self.unmatched_mappings)
    }
}
