//! Edit-distance refinement of mapping windows.
//!
//! - [`engine`]: the banded dynamic-programming kernel
//! - [`cigar`]: run-length encoded alignment operations

pub mod cigar;
pub mod engine;

use serde::{Deserialize, Serialize};

pub use cigar::{Cigar, CigarOp};
pub use engine::{Alignment, AlignmentEngine};

/// How much of the reference window an alignment must cover
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AlignMode {
    /// The whole query against any substring of the reference window
    #[default]
    Infix,
    /// The whole query against the whole reference window
    Global,
}

/// Upper limit on the edit distance of an accepted alignment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditBound {
    Unbounded,
    AtMost(usize),
}

impl EditBound {
    /// Convert a signed limit where any negative value means unbounded
    pub fn from_signed(limit: i64) -> Self {
        usize::try_from(limit).map_or(Self::Unbounded, Self::AtMost)
    }

    /// Bound implied by a minimum percentage identity over a query window.
    ///
    /// An identity of 0 means unbounded; otherwise the bound is
    /// `floor((1 - pct / 100) * query_len)`.
    pub fn from_identity(pct_identity: f64, query_len: usize) -> Self {
        if pct_identity <= 0.0 {
            return Self::Unbounded;
        }
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let limit = ((1.0 - pct_identity / 100.0) * query_len as f64).floor().max(0.0) as usize;
        Self::AtMost(limit)
    }

    /// The effective limit for windows of the given lengths.
    ///
    /// No alignment of a `query_len` by `ref_len` pair can cost more than the
    /// sum of the two, so the unbounded case collapses to that.
    pub fn limit_for(self, query_len: usize, ref_len: usize) -> usize {
        let ceiling = query_len + ref_len;
        match self {
            Self::Unbounded => ceiling,
            Self::AtMost(k) => k.min(ceiling),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_signed() {
        assert_eq!(EditBound::from_signed(-1), EditBound::Unbounded);
        assert_eq!(EditBound::from_signed(0), EditBound::AtMost(0));
        assert_eq!(EditBound::from_signed(7), EditBound::AtMost(7));
    }

    #[test]
    fn test_from_identity() {
        assert_eq!(EditBound::from_identity(0.0, 1000), EditBound::Unbounded);
        assert_eq!(EditBound::from_identity(100.0, 1000), EditBound::AtMost(0));
        assert_eq!(EditBound::from_identity(95.0, 1000), EditBound::AtMost(50));
        // floor, not round
        assert_eq!(EditBound::from_identity(90.0, 19), EditBound::AtMost(1));
    }

    #[test]
    fn test_limit_for() {
        assert_eq!(EditBound::Unbounded.limit_for(10, 12), 22);
        assert_eq!(EditBound::AtMost(3).limit_for(10, 12), 3);
        assert_eq!(EditBound::AtMost(100).limit_for(10, 12), 22);
    }
}
