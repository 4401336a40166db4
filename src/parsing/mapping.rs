//! Parser for mapping hints.
//!
//! Each non-blank line is one hint. Lines with too few columns, non-numeric
//! coordinates or bytes that are not valid UTF-8 are skipped with a warning
//! rather than aborting the stream.

use std::io::BufRead;
use std::path::Path;

use thiserror::Error;
use tracing::warn;

use crate::core::record::MappingRecord;
use crate::core::types::Orientation;
use crate::parsing::{open_input, ParseError};

/// Minimum number of whitespace-separated columns in a mapping line
pub const MIN_MAPPING_FIELDS: usize = 9;

/// Why a single mapping line could not be parsed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MalformedRecordError {
    #[error("Line {line} has {found} fields, expected at least {MIN_MAPPING_FIELDS}")]
    TooFewFields { line: usize, found: usize },

    #[error("Line {line}: invalid {field} '{value}'")]
    InvalidCoordinate {
        line: usize,
        field: &'static str,
        value: String,
    },

    #[error("Line {line}: {field} interval {start}-{end} has start after end")]
    InvertedInterval {
        line: usize,
        field: &'static str,
        start: usize,
        end: usize,
    },
}

/// Parse one mapping line.
///
/// # Errors
///
/// Returns `MalformedRecordError` if the line has fewer than
/// [`MIN_MAPPING_FIELDS`] columns, a coordinate is not a non-negative
/// integer, or an interval has its start after its end.
pub fn parse_mapping_line(line: &str, line_number: usize) -> Result<MappingRecord, MalformedRecordError> {
    let fields: Vec<&str> = line.split_ascii_whitespace().collect();
    if fields.len() < MIN_MAPPING_FIELDS {
        return Err(MalformedRecordError::TooFewFields {
            line: line_number,
            found: fields.len(),
        });
    }

    let coordinate = |idx: usize, field: &'static str| -> Result<usize, MalformedRecordError> {
        fields[idx]
            .parse()
            .map_err(|_| MalformedRecordError::InvalidCoordinate {
                line: line_number,
                field,
                value: fields[idx].to_string(),
            })
    };

    let query_start = coordinate(2, "query start")?;
    let query_end = coordinate(3, "query end")?;
    let ref_start = coordinate(7, "reference start")?;
    let ref_end = coordinate(8, "reference end")?;

    for (field, start, end) in [
        ("query", query_start, query_end),
        ("reference", ref_start, ref_end),
    ] {
        if start > end {
            return Err(MalformedRecordError::InvertedInterval {
                line: line_number,
                field,
                start,
                end,
            });
        }
    }

    Ok(MappingRecord {
        query_id: fields[0].to_string(),
        query_start,
        query_end,
        orientation: Orientation::from_token(fields[4]),
        ref_id: fields[5].to_string(),
        ref_start,
        ref_end,
        raw_line: line.to_string(),
        line_number,
    })
}

/// Forward-only stream of mapping records with one record of lookahead
pub struct MappingSource<R> {
    reader: R,
    buf: Vec<u8>,
    line_number: usize,
    pending: Option<MappingRecord>,
    exhausted: bool,
    records_read: u64,
    malformed: u64,
}

impl<R: BufRead> MappingSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::new(),
            line_number: 0,
            pending: None,
            exhausted: false,
            records_read: 0,
            malformed: 0,
        }
    }

    /// The current record, without consuming it.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if reading the underlying input fails.
    pub fn peek(&mut self) -> Result<Option<&MappingRecord>, ParseError> {
        if self.pending.is_none() {
            self.pending = self.read_record()?;
        }
        Ok(self.pending.as_ref())
    }

    /// Consume and return the current record.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if reading the underlying input fails.
    pub fn advance(&mut self) -> Result<Option<MappingRecord>, ParseError> {
        match self.pending.take() {
            Some(record) => Ok(Some(record)),
            None => self.read_record(),
        }
    }

    /// Number of lines successfully parsed so far
    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// Number of lines skipped because they could not be parsed
    pub fn malformed(&self) -> u64 {
        self.malformed
    }

    fn read_record(&mut self) -> Result<Option<MappingRecord>, ParseError> {
        while !self.exhausted {
            self.buf.clear();
            if self.reader.read_until(b'\n', &mut self.buf)? == 0 {
                self.exhausted = true;
                break;
            }
            self.line_number += 1;

            let Ok(text) = std::str::from_utf8(&self.buf) else {
                warn!("Skipping malformed mapping: line {} is not valid UTF-8", self.line_number);
                self.malformed += 1;
                continue;
            };
            let line = text.trim_end_matches(['\n', '\r']);
            if line.trim().is_empty() {
                continue;
            }

            match parse_mapping_line(line, self.line_number) {
                Ok(record) => {
                    self.records_read += 1;
                    return Ok(Some(record));
                }
                Err(e) => {
                    warn!("Skipping malformed mapping: {e}");
                    self.malformed += 1;
                }
            }
        }
        Ok(None)
    }
}

impl MappingSource<Box<dyn BufRead + Send>> {
    /// Open a mapping file, decompressing by extension (`-` reads stdin).
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be opened.
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        Ok(Self::new(open_input(path)?))
    }
}

impl<R: BufRead> Iterator for MappingSource<R> {
    type Item = Result<MappingRecord, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance().transpose()
    }
}
