//! Nucleotide helpers.

/// Complement a single base, preserving case.
///
/// Only `A`, `C`, `G` and `T` are swapped; every other byte (ambiguity codes,
/// `N`, gaps) maps to itself.
#[inline]
pub const fn complement(base: u8) -> u8 {
    match base {
        b'A' => b'T',
        b'T' => b'A',
        b'C' => b'G',
        b'G' => b'C',
        b'a' => b't',
        b't' => b'a',
        b'c' => b'g',
        b'g' => b'c',
        other => other,
    }
}

/// Reverse complement of a sequence.
///
/// # Examples
///
/// ```
/// use map_refine::utils::sequence::reverse_complement;
///
/// assert_eq!(reverse_complement(b"AACG"), b"CGTT");
/// ```
#[must_use]
pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter().rev().map(|&b| complement(b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_reverse_complement() {
        assert_eq!(reverse_complement(b"AACG"), b"CGTT");
        assert_eq!(reverse_complement(b"acgtN"), b"Nacgt");
        assert_eq!(reverse_complement(b""), b"");
    }

    #[test]
    fn test_ambiguous_bases_map_to_themselves() {
        for &b in b"NRYKMSWBDHV-" {
            assert_eq!(complement(b), b);
        }
    }

    proptest! {
        #[test]
        fn prop_complement_is_involution(seq in "[ACGTNacgtn]{0,64}") {
            let bytes = seq.as_bytes();
            let twice: Vec<u8> = bytes.iter().map(|&b| complement(complement(b))).collect();
            prop_assert_eq!(twice.as_slice(), bytes);
        }

        #[test]
        fn prop_reverse_complement_is_involution(seq in "[ACGTN]{0,64}") {
            let bytes = seq.as_bytes();
            prop_assert_eq!(reverse_complement(&reverse_complement(bytes)), bytes.to_vec());
        }
    }
}
