//! Readers for the pipeline's inputs.
//!
//! - **FASTA files**: reference and query sequences, plain or gzip compressed
//! - **Mapping files**: whitespace-delimited hints from an upstream mapper
//!   (PAF-like, at least 9 columns)
//!
//! ## Mapping columns
//!
//! | Column | Meaning |
//! |--------|---------|
//! | 0 | Query sequence id |
//! | 2 | Query start |
//! | 3 | Query end (inclusive) |
//! | 4 | Strand (`+` forward, anything else reverse) |
//! | 5 | Reference sequence id |
//! | 7 | Reference start |
//! | 8 | Reference end (inclusive) |

pub mod fasta;
pub mod mapping;

use std::io::{BufRead, BufReader};
use std::path::Path;

use flate2::read::MultiGzDecoder;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("noodles error: {0}")]
    Noodles(String),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Check if the path is a gzipped file
#[allow(clippy::case_sensitive_file_extension_comparisons)] // Already lowercased
pub fn is_gzipped(path: &Path) -> bool {
    let path_str = path.to_string_lossy().to_lowercase();
    path_str.ends_with(".gz") || path_str.ends_with(".bgz")
}

/// Open a file for buffered reading, decompressing gzip/bgzip by extension.
///
/// The path `-` reads standard input.
///
/// # Errors
///
/// Returns `ParseError::Io` if the file cannot be opened.
pub fn open_input(path: &Path) -> Result<Box<dyn BufRead + Send>, ParseError> {
    if path.as_os_str() == "-" {
        return Ok(Box::new(BufReader::new(std::io::stdin())));
    }

    let file = std::fs::File::open(path)?;
    if is_gzipped(path) {
        // bgzip is a series of gzip members, so use the multi-member decoder
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}
