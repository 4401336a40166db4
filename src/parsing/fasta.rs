//! FASTA reading using noodles.
//!
//! Sequences are streamed one record at a time and uppercased as they are
//! read. Supports both uncompressed and gzip/bgzip compressed files.
//!
//! Supported extensions:
//! - `.fa`, `.fasta`, `.fna` (uncompressed)
//! - `.fa.gz`, `.fasta.gz`, `.fna.gz` (gzip compressed)
//! - `.fa.bgz`, `.fasta.bgz`, `.fna.bgz` (bgzip compressed)

use std::collections::VecDeque;
use std::ffi::OsStr;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use noodles::fasta;
use tracing::debug;

use crate::core::sequence::Sequence;
use crate::parsing::{is_gzipped, open_input, ParseError};

/// Check if the path has a FASTA extension
pub fn is_fasta_file(path: &Path) -> bool {
    let inner = if is_gzipped(path) {
        path.file_stem().map(Path::new)
    } else {
        Some(path)
    };

    matches!(
        inner
            .and_then(Path::extension)
            .and_then(OsStr::to_str)
            .map(str::to_lowercase)
            .as_deref(),
        Some("fa" | "fasta" | "fna")
    )
}

/// Streaming reader over the records of one FASTA source
pub struct FastaSequences<R> {
    reader: fasta::io::Reader<R>,
}

impl<R: BufRead> FastaSequences<R> {
    pub fn new(inner: R) -> Self {
        Self {
            reader: fasta::io::Reader::new(inner),
        }
    }
}

impl FastaSequences<Box<dyn BufRead + Send>> {
    /// Open a FASTA file, decompressing by extension.
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be opened.
    pub fn from_path(path: &Path) -> Result<Self, ParseError> {
        Ok(Self::new(open_input(path)?))
    }
}

impl<R: BufRead> Iterator for FastaSequences<R> {
    type Item = Result<Sequence, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        let result = self.reader.records().next()?;
        Some(
            result
                .map_err(|e| ParseError::Noodles(format!("Failed to parse FASTA record: {e}")))
                .map(|record| {
                    let id = String::from_utf8_lossy(record.name()).to_string();
                    Sequence::new(id, record.sequence().as_ref().to_vec())
                }),
        )
    }
}

/// Streams the sequences of several FASTA files back to back, in the order given
pub struct MultiFastaReader {
    pending: VecDeque<PathBuf>,
    current: Option<(PathBuf, FastaSequences<Box<dyn BufRead + Send>>)>,
}

impl MultiFastaReader {
    pub fn new<P: AsRef<Path>>(paths: &[P]) -> Self {
        Self {
            pending: paths.iter().map(|p| p.as_ref().to_path_buf()).collect(),
            current: None,
        }
    }
}

impl Iterator for MultiFastaReader {
    type Item = Result<Sequence, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some((path, reader)) = self.current.as_mut() {
                if let Some(item) = reader.next() {
                    return Some(item);
                }
                debug!("Finished sequences in file {}", path.display());
                self.current = None;
            }

            let path = self.pending.pop_front()?;
            debug!("Parsing sequences in file {}", path.display());
            match FastaSequences::from_path(&path) {
                Ok(reader) => self.current = Some((path, reader)),
                Err(e) => return Some(Err(e)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_is_fasta_file() {
        assert!(is_fasta_file(Path::new("ref.fa")));
        assert!(is_fasta_file(Path::new("ref.FASTA")));
        assert!(is_fasta_file(Path::new("ref.fna.gz")));
        assert!(is_fasta_file(Path::new("ref.fa.bgz")));
        assert!(!is_fasta_file(Path::new("ref.paf")));
        assert!(!is_fasta_file(Path::new("ref.gz")));
    }

    #[test]
    fn test_reads_and_uppercases() {
        let text = b">chr1 first contig\nacgt\nNNAC\n>chr2\nGGCC\n";
        let seqs: Vec<Sequence> = FastaSequences::new(&text[..])
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(seqs.len(), 2);
        assert_eq!(seqs[0].id, "chr1");
        assert_eq!(seqs[0].bases, b"ACGTNNAC");
        assert_eq!(seqs[1].id, "chr2");
        assert_eq!(seqs[1].bases, b"GGCC");
    }

    #[test]
    fn test_multi_reader_concatenates_files() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.fa");
        let b = dir.path().join("b.fa.gz");
        std::fs::write(&a, ">q1\nACGT\n>q2\nTTTT\n").unwrap();

        let file = std::fs::File::create(&b).unwrap();
        let mut encoder = flate2::write::GzEncoder::new(file, flate2::Compression::default());
        encoder.write_all(b">q3\nGGGG\n").unwrap();
        encoder.finish().unwrap();

        let ids: Vec<String> = MultiFastaReader::new(&[a, b])
            .map(|r| r.unwrap().id)
            .collect();
        assert_eq!(ids, vec!["q1", "q2", "q3"]);
    }

    #[test]
    fn test_multi_reader_reports_missing_file() {
        let mut reader = MultiFastaReader::new(&[PathBuf::from("/nonexistent/q.fa")]);
        assert!(matches!(reader.next(), Some(Err(ParseError::Io(_)))));
        assert!(reader.next().is_none());
    }
}
