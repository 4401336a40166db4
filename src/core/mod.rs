//! Core data types for mapping refinement.
//!
//! - [`Sequence`]: an identifier plus uppercased bases, used for references and queries
//! - [`Orientation`]: the strand a mapping hint places the query on
//! - [`MappingRecord`]: one parsed line of mapper output
//! - [`AlignmentTask`], [`TaskOutcome`]: the items handed between pipeline roles
//! - [`ConfigError`]: fatal input inconsistencies

pub mod error;
pub mod record;
pub mod sequence;
pub mod task;
pub mod types;

pub use error::ConfigError;
pub use record::MappingRecord;
pub use sequence::Sequence;
pub use task::{AlignedRecord, AlignmentOutcome, AlignmentTask, TaskOutcome};
pub use types::Orientation;
