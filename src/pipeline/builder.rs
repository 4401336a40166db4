//! Turning query sequences plus mapping hints into alignment tasks.
//!
//! Two merge strategies are provided:
//!
//! - [`StreamingTaskBuilder`] walks both inputs forward in lockstep. It needs
//!   no memory beyond one buffered mapping line but assumes the mapper wrote
//!   mappings in the same query order as the query files. A query with no
//!   mapping at the cursor is skipped without advancing the cursor, so
//!   mappings whose query was passed earlier are never used.
//! - [`IndexedTaskBuilder`] reads every mapping first and groups them by query
//!   id, so any ordering works.
//!
//! Both hand each task to the caller as soon as it is built, so a query with
//! many mappings never holds more than one task at a time.

use std::collections::HashMap;
use std::io::BufRead;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::error::ConfigError;
use crate::core::record::MappingRecord;
use crate::core::sequence::Sequence;
use crate::core::task::AlignmentTask;
use crate::parsing::mapping::MappingSource;
use crate::pipeline::PipelineError;
use crate::store::SequenceStore;
use crate::utils::validation::window_fits;

/// How mapping lines are matched up with query sequences
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum MergeStrategy {
    /// Forward-only merge; output identical to the upstream aligner
    #[default]
    Streaming,
    /// Index mappings by query id; tolerant of any ordering
    Indexed,
}

/// Mapping-side counts reported once the query stream ends
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    /// Mapping lines parsed into records
    pub mapping_lines: u64,
    /// Mapping lines skipped as malformed
    pub malformed_lines: u64,
    pub tasks_built: u64,
    /// Parsed mapping lines that never became a task
    pub unmatched_mappings: u64,
}

/// Produces the tasks for each query sequence in turn
pub trait TaskSource {
    /// Build the tasks for one query sequence, passing each to `emit`.
    ///
    /// `emit` returns `false` to stop early; the remaining mappings of the
    /// query are then left unread. Returns the number of tasks emitted, or
    /// `Ok(None)` if no later query can produce tasks either, so the reader
    /// can stop.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if a mapping is inconsistent with the
    /// loaded sequences, or `PipelineError::Parse` if the mapping input fails.
    fn tasks_for(
        &mut self,
        query: &Sequence,
        emit: &mut dyn FnMut(AlignmentTask) -> bool,
    ) -> Result<Option<u64>, PipelineError>;

    /// Final counts. Consumes whatever mapping input remains.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Parse` if reading the remaining input fails.
    fn finish(&mut self) -> Result<MergeStats, PipelineError>;
}

/// Build the task for one mapping line against its query sequence.
///
/// # Errors
///
/// Returns the `ConfigError` from resolving the reference window, or
/// `ConfigError::QueryWindowOutOfBounds` if the query window runs past the
/// end of the query sequence.
pub fn build_task(
    store: &SequenceStore,
    record: MappingRecord,
    query: &Sequence,
    serial: u64,
) -> Result<AlignmentTask, ConfigError> {
    let ref_range = store.resolve_window(&record)?;

    if !window_fits(record.query_start, record.query_end, query.len()) {
        return Err(ConfigError::QueryWindowOutOfBounds {
            query_id: record.query_id,
            start: record.query_start,
            end: record.query_end,
            length: query.len(),
            line: record.line_number,
        });
    }

    let query_window = query.bases[record.query_start..=record.query_end].to_vec();
    Ok(AlignmentTask {
        serial,
        record,
        query: query_window,
        ref_range,
    })
}

/// Forward-only merge-join over a mapping stream
pub struct StreamingTaskBuilder<'a, R> {
    store: &'a SequenceStore,
    mappings: MappingSource<R>,
    next_serial: u64,
}

impl<'a, R: BufRead> StreamingTaskBuilder<'a, R> {
    pub fn new(store: &'a SequenceStore, mappings: MappingSource<R>) -> Self {
        Self {
            store,
            mappings,
            next_serial: 0,
        }
    }
}

impl<R: BufRead> TaskSource for StreamingTaskBuilder<'_, R> {
    fn tasks_for(
        &mut self,
        query: &Sequence,
        emit: &mut dyn FnMut(AlignmentTask) -> bool,
    ) -> Result<Option<u64>, PipelineError> {
        let Some(current) = self.mappings.peek()? else {
            return Ok(None);
        };
        if current.query_id != query.id {
            debug!("No mapping at cursor for query {}", query.id);
            return Ok(Some(0));
        }

        let mut emitted = 0;
        loop {
            match self.mappings.peek()? {
                Some(record) if record.query_id == query.id => {}
                _ => break,
            }
            let Some(record) = self.mappings.advance()? else {
                break;
            };
            let task = build_task(self.store, record, query, self.next_serial)?;
            self.next_serial += 1;
            emitted += 1;
            if !emit(task) {
                break;
            }
        }
        Ok(Some(emitted))
    }

    fn finish(&mut self) -> Result<MergeStats, PipelineError> {
        let mut unmatched = 0;
        while self.mappings.advance()?.is_some() {
            unmatched += 1;
        }
        if unmatched > 0 {
            warn!(
                "{unmatched} mapping lines were not reached by the streaming merge; \
                 check that mappings follow query order or use the indexed merge"
            );
        }
        Ok(MergeStats {
            mapping_lines: self.mappings.records_read(),
            malformed_lines: self.mappings.malformed(),
            tasks_built: self.next_serial,
            unmatched_mappings: unmatched,
        })
    }
}

/// Merge that loads every mapping up front, grouped by query id
pub struct IndexedTaskBuilder<'a> {
    store: &'a SequenceStore,
    groups: HashMap<String, Vec<MappingRecord>>,
    mapping_lines: u64,
    malformed_lines: u64,
    next_serial: u64,
}

impl<'a> IndexedTaskBuilder<'a> {
    /// Read all of `mappings`, keeping file order within each query id.
    ///
    /// # Errors
    ///
    /// Returns `PipelineError::Parse` if the mapping input cannot be read.
    pub fn new<R: BufRead>(store: &'a SequenceStore, mut mappings: MappingSource<R>) -> Result<Self, PipelineError> {
        let mut groups: HashMap<String, Vec<MappingRecord>> = HashMap::new();
        for record in mappings.by_ref() {
            let record = record?;
            groups.entry(record.query_id.clone()).or_default().push(record);
        }
        debug!("Indexed mappings for {} query sequences", groups.len());

        Ok(Self {
            store,
            groups,
            mapping_lines: mappings.records_read(),
            malformed_lines: mappings.malformed(),
            next_serial: 0,
        })
    }
}

impl TaskSource for IndexedTaskBuilder<'_> {
    fn tasks_for(
        &mut self,
        query: &Sequence,
        emit: &mut dyn FnMut(AlignmentTask) -> bool,
    ) -> Result<Option<u64>, PipelineError> {
        if self.groups.is_empty() {
            return Ok(None);
        }
        let Some(records) = self.groups.remove(&query.id) else {
            return Ok(Some(0));
        };

        let mut emitted = 0;
        for record in records {
            let task = build_task(self.store, record, query, self.next_serial)?;
            self.next_serial += 1;
            emitted += 1;
            if !emit(task) {
                break;
            }
        }
        Ok(Some(emitted))
    }

    fn finish(&mut self) -> Result<MergeStats, PipelineError> {
        let unmatched: usize = self.groups.values().map(Vec::len).sum();
        if unmatched > 0 {
            warn!(
                "{unmatched} mapping lines name query sequences that were never read ({} ids)",
                self.groups.len()
            );
        }
        Ok(MergeStats {
            mapping_lines: self.mapping_lines,
            malformed_lines: self.malformed_lines,
            tasks_built: self.next_serial,
            unmatched_mappings: unmatched as u64,
        })
    }
}

/// Create the task source for a strategy.
///
/// # Errors
///
/// Returns `PipelineError::Parse` if the indexed strategy cannot read the mappings.
pub fn task_source<'a, R: BufRead + Send + 'a>(
    strategy: MergeStrategy,
    store: &'a SequenceStore,
    mappings: MappingSource<R>,
) -> Result<Box<dyn TaskSource + Send + 'a>, PipelineError> {
    Ok(match strategy {
        MergeStrategy::Streaming => Box::new(StreamingTaskBuilder::new(store, mappings)),
        MergeStrategy::Indexed => Box::new(IndexedTaskBuilder::new(store, mappings)?),
    })
}

impl<T: TaskSource + ?Sized> TaskSource for Box<T> {
    fn tasks_for(
        &mut self,
        query: &Sequence,
        emit: &mut dyn FnMut(AlignmentTask) -> bool,
    ) -> Result<Option<u64>, PipelineError> {
        (**self).tasks_for(query, emit)
    }

    fn finish(&mut self) -> Result<MergeStats, PipelineError> {
        (**self).finish()
    }
}
