use std::path::PathBuf;
use thiserror::Error;

/// Inconsistent inputs or settings. Always fatal: no task is built against them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Duplicate sequence id '{id}' in {}", path.display())]
    DuplicateSequenceId { id: String, path: PathBuf },

    #[error("Mapping on line {line} references unknown sequence '{ref_id}'")]
    UnknownReference { ref_id: String, line: usize },

    #[error(
        "Mapping on line {line}: reference window {start}-{end} exceeds length {length} of '{ref_id}'"
    )]
    ReferenceWindowOutOfBounds {
        ref_id: String,
        start: usize,
        end: usize,
        length: usize,
        line: usize,
    },

    #[error(
        "Mapping on line {line}: query window {start}-{end} exceeds length {length} of '{query_id}'"
    )]
    QueryWindowOutOfBounds {
        query_id: String,
        start: usize,
        end: usize,
        length: usize,
        line: usize,
    },

    #[error("Invalid setting: {0}")]
    InvalidSetting(String),
}
