use std::fmt;
use std::ops::Range;

use crate::align::cigar::Cigar;
use crate::core::record::MappingRecord;
use crate::utils::format::format_general;

/// Unit of work handed from the reader to a worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentTask {
    /// 0-based position in build order
    pub serial: u64,

    pub record: MappingRecord,

    /// Query window bases as given (not yet reverse-complemented)
    pub query: Vec<u8>,

    /// Half-open range into the reference sequence, already validated
    pub ref_range: Range<usize>,
}

/// Successful refinement of a mapping
#[derive(Debug, Clone, PartialEq)]
pub struct AlignedRecord {
    pub raw_line: String,
    pub edit_distance: usize,
    pub alignment_length: usize,
    pub divergence: f64,
    pub cigar: Cigar,
}

/// What a worker produced for one task
#[derive(Debug, Clone, PartialEq)]
pub enum AlignmentOutcome {
    Aligned(AlignedRecord),
    /// No alignment within the edit-distance bound
    NotFound { raw_line: String },
}

/// An outcome tagged with the serial of the task that produced it
#[derive(Debug, Clone, PartialEq)]
pub struct TaskOutcome {
    pub serial: u64,
    pub outcome: AlignmentOutcome,
}

impl fmt::Display for AlignedRecord {
    /// Formats the output line (without trailing newline).
    ///
    /// `al:i` deliberately has no colon before the value; downstream tools
    /// expect that exact spelling.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}\ted:i:{}\tal:i{}\tad:f:{}\tcg:Z:{}",
            self.raw_line,
            self.edit_distance,
            self.alignment_length,
            format_general(self.divergence),
            self.cigar
        )
    }
}
