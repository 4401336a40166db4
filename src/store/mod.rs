//! In-memory reference sequences.
//!
//! The store is built once before the pipeline starts and is read-only
//! afterwards, so workers share it by reference without locking.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::ops::Range;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::core::error::ConfigError;
use crate::core::record::MappingRecord;
use crate::core::sequence::Sequence;
use crate::parsing::fasta::{is_fasta_file, FastaSequences};
use crate::parsing::ParseError;
use crate::utils::validation::window_fits;

/// Errors from loading a store
#[derive(Error, Debug)]
pub enum StoreError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Reference sequences keyed by identifier
#[derive(Debug, Default)]
pub struct SequenceStore {
    sequences: HashMap<String, Vec<u8>>,
    total_bases: usize,
}

impl SequenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load every sequence from a list of FASTA files.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Parse` if a file cannot be read and
    /// `StoreError::Config` if an identifier appears more than once across
    /// all inputs.
    pub fn load<P: AsRef<Path>>(paths: &[P]) -> Result<Self, StoreError> {
        let mut store = Self::new();
        for path in paths {
            let path = path.as_ref();
            if !is_fasta_file(path) {
                warn!("{} does not have a FASTA extension; reading it as FASTA", path.display());
            }
            debug!("Parsing reference sequences in file {}", path.display());
            for sequence in FastaSequences::from_path(path)? {
                store.insert(sequence?, path)?;
            }
        }
        info!(
            "Loaded {} reference sequences ({} bases)",
            store.len(),
            store.total_bases
        );
        Ok(store)
    }

    /// Add a sequence, rejecting duplicate identifiers.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateSequenceId` if the id is already present.
    pub fn insert(&mut self, sequence: Sequence, source: &Path) -> Result<(), ConfigError> {
        match self.sequences.entry(sequence.id) {
            Entry::Occupied(entry) => Err(ConfigError::DuplicateSequenceId {
                id: entry.key().clone(),
                path: PathBuf::from(source),
            }),
            Entry::Vacant(entry) => {
                self.total_bases += sequence.bases.len();
                entry.insert(sequence.bases);
                Ok(())
            }
        }
    }

    /// Build a store from in-memory sequences
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::DuplicateSequenceId` on a repeated identifier.
    pub fn from_sequences(sequences: impl IntoIterator<Item = Sequence>) -> Result<Self, ConfigError> {
        let mut store = Self::new();
        for sequence in sequences {
            store.insert(sequence, Path::new("<memory>"))?;
        }
        Ok(store)
    }

    pub fn sequence_for(&self, id: &str) -> Option<&[u8]> {
        self.sequences.get(id).map(Vec::as_slice)
    }

    /// Resolve the reference window of a mapping to a half-open range.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::UnknownReference` if the reference id is not
    /// loaded, or `ConfigError::ReferenceWindowOutOfBounds` if the inclusive
    /// window runs past the end of the sequence.
    pub fn resolve_window(&self, record: &MappingRecord) -> Result<Range<usize>, ConfigError> {
        let sequence = self
            .sequence_for(&record.ref_id)
            .ok_or_else(|| ConfigError::UnknownReference {
                ref_id: record.ref_id.clone(),
                line: record.line_number,
            })?;

        if !window_fits(record.ref_start, record.ref_end, sequence.len()) {
            return Err(ConfigError::ReferenceWindowOutOfBounds {
                ref_id: record.ref_id.clone(),
                start: record.ref_start,
                end: record.ref_end,
                length: sequence.len(),
                line: record.line_number,
            });
        }

        Ok(record.ref_start..record.ref_end + 1)
    }

    /// Bases of `id` inside an already-resolved range
    pub fn window(&self, id: &str, range: Range<usize>) -> Option<&[u8]> {
        self.sequence_for(id)?.get(range)
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }

    pub fn total_bases(&self) -> usize {
        self.total_bases
    }
}
