use std::ops::RangeInclusive;

use crate::core::types::Orientation;

/// One mapping hint from the upstream mapper.
///
/// Coordinates are kept exactly as the mapper wrote them and are treated as
/// inclusive on both ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappingRecord {
    pub query_id: String,
    pub query_start: usize,
    pub query_end: usize,
    pub orientation: Orientation,
    pub ref_id: String,
    pub ref_start: usize,
    pub ref_end: usize,

    /// The line exactly as read, without the trailing newline
    pub raw_line: String,

    /// 1-based line number in the mapping input
    pub line_number: usize,
}

impl MappingRecord {
    pub fn ref_window(&self) -> RangeInclusive<usize> {
        self.ref_start..=self.ref_end
    }

    pub fn query_len(&self) -> usize {
        self.query_end - self.query_start + 1
    }

    pub fn ref_len(&self) -> usize {
        self.ref_end - self.ref_start + 1
    }
}
