//! Run-length encoded alignment operations.

use std::fmt;

/// Alignment operation
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CigarOp {
    /// Match or mismatch
    M = b'M',
    /// Insertion in the query (consumes query only)
    I = b'I',
    /// Deletion from the query (consumes reference only)
    D = b'D',
}

impl CigarOp {
    #[inline]
    pub const fn to_byte(self) -> u8 {
        self as u8
    }

    #[inline]
    pub const fn consumes_query(self) -> bool {
        matches!(self, Self::M | Self::I)
    }

    #[inline]
    pub const fn consumes_ref(self) -> bool {
        matches!(self, Self::M | Self::D)
    }
}

/// A CIGAR with adjacent identical operations always merged
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cigar {
    runs: Vec<(CigarOp, u32)>,
}

impl Cigar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `len` copies of `op`, merging with the last run when it has the same op.
    pub fn push(&mut self, op: CigarOp, len: u32) {
        if len == 0 {
            return;
        }
        match self.runs.last_mut() {
            Some((last, n)) if *last == op => *n += len,
            _ => self.runs.push((op, len)),
        }
    }

    pub fn runs(&self) -> &[(CigarOp, u32)] {
        &self.runs
    }

    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }

    /// Total number of alignment columns
    pub fn alignment_len(&self) -> usize {
        self.runs.iter().map(|&(_, n)| n as usize).sum()
    }

    /// Number of query bases covered
    pub fn query_len(&self) -> usize {
        self.sum_where(CigarOp::consumes_query)
    }

    /// Number of reference bases covered
    pub fn ref_len(&self) -> usize {
        self.sum_where(CigarOp::consumes_ref)
    }

    fn sum_where(&self, pred: impl Fn(CigarOp) -> bool) -> usize {
        self.runs
            .iter()
            .filter(|&&(op, _)| pred(op))
            .map(|&(_, n)| n as usize)
            .sum()
    }
}

impl FromIterator<CigarOp> for Cigar {
    fn from_iter<T: IntoIterator<Item = CigarOp>>(iter: T) -> Self {
        let mut cigar = Self::new();
        for op in iter {
            cigar.push(op, 1);
        }
        cigar
    }
}

impl fmt::Display for Cigar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &(op, n) in &self.runs {
            write!(f, "{n}{}", op.to_byte() as char)?;
        }
        Ok(())
    }
}
