//! Checking mapping lines against the reference store before any alignment.

use std::io::BufRead;

use serde::Serialize;
use tracing::{info, warn};

use crate::core::error::ConfigError;
use crate::parsing::mapping::MappingSource;
use crate::parsing::ParseError;
use crate::store::SequenceStore;

/// Maximum number of issue messages kept in a report
pub const MAX_REPORTED_ISSUES: usize = 100;

/// Result of checking every mapping line against the references
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationReport {
    pub mapping_lines: u64,
    pub malformed_lines: u64,
    /// Total number of lines with a reference problem
    pub issue_count: u64,
    /// Messages for the first issues found
    pub issues: Vec<String>,
    #[serde(skip)]
    first_issue: Option<ConfigError>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.issue_count == 0
    }

    /// The first issue as an error, or `Ok` if there were none.
    ///
    /// # Errors
    ///
    /// Returns the first `ConfigError` found during validation.
    pub fn into_result(self) -> Result<Self, ConfigError> {
        match self.first_issue {
            Some(err) => Err(err),
            None => Ok(self),
        }
    }

    fn record_issue(&mut self, issue: ConfigError) {
        self.issue_count += 1;
        if self.issues.len() < MAX_REPORTED_ISSUES {
            self.issues.push(issue.to_string());
        }
        if self.first_issue.is_none() {
            self.first_issue = Some(issue);
        }
    }
}

/// Check the reference id and window of every mapping line.
///
/// Query windows cannot be checked here since the query sequences are only
/// streamed once the pipeline runs.
///
/// # Errors
///
/// Returns `ParseError` if the mapping input cannot be read.
pub fn validate_mappings<R: BufRead>(
    mut mappings: MappingSource<R>,
    store: &SequenceStore,
) -> Result<ValidationReport, ParseError> {
    let mut report = ValidationReport::default();

    for record in mappings.by_ref() {
        let record = record?;
        if let Err(issue) = store.resolve_window(&record) {
            report.record_issue(issue);
        }
    }

    report.mapping_lines = mappings.records_read();
    report.malformed_lines = mappings.malformed();

    if report.is_clean() {
        info!("Validated {} mapping lines", report.mapping_lines);
    } else {
        warn!(
            "{} of {} mapping lines reference missing sequences or windows",
            report.issue_count, report.mapping_lines
        );
    }
    Ok(report)
}
