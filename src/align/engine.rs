//! Banded edit-distance alignment.
//!
//! The kernel fills a unit-cost dynamic-programming matrix column by column
//! (one column per reference base, one row per query base). With a finite
//! bound `k` it uses Ukkonen's cut-off: a column is only evaluated down to one
//! row past the last row of the previous column whose value was `<= k`. Every
//! cell below that is provably `> k` and can never lie on an accepted path.
//!
//! Traceback directions are packed two bits per cell and stored per column for
//! the evaluated rows only. Matrices above a cell limit are not stored at all:
//! a score-only pass finds the end of the best alignment, a reversed pass
//! finds its start, and Hirschberg's divide-and-conquer rebuilds the CIGAR in
//! memory linear in the window lengths.

use std::ops::Range;

use crate::align::cigar::{Cigar, CigarOp};
use crate::align::{AlignMode, EditBound};
use crate::core::types::Orientation;
use crate::utils::sequence::reverse_complement;

const FROM_DIAG: u8 = 0;
const FROM_UP: u8 = 1;
const FROM_LEFT: u8 = 2;

/// Largest matrix, in cells, whose traceback is kept whole (4 MiB packed)
pub const TRACEBACK_CELL_LIMIT: usize = 1 << 24;

/// Hirschberg subproblems at or below this size are traced back directly
const DIRECT_CELL_LIMIT: usize = 1 << 16;

/// A completed alignment of a query window against a reference window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alignment {
    pub edit_distance: usize,
    pub cigar: Cigar,

    /// Half-open span of the reference window covered by the alignment
    pub ref_span: Range<usize>,
}

impl Alignment {
    /// Number of alignment columns
    pub fn alignment_length(&self) -> usize {
        self.cigar.alignment_len()
    }

    /// Edit distance divided by alignment length
    #[allow(clippy::cast_precision_loss)]
    pub fn divergence(&self) -> f64 {
        self.edit_distance as f64 / self.alignment_length() as f64
    }
}

/// Stateless alignment kernel shared by all workers
#[derive(Debug, Clone, Copy)]
pub struct AlignmentEngine {
    mode: AlignMode,
    traceback_cell_limit: usize,
}

impl Default for AlignmentEngine {
    fn default() -> Self {
        Self::new(AlignMode::default())
    }
}

impl AlignmentEngine {
    pub fn new(mode: AlignMode) -> Self {
        Self {
            mode,
            traceback_cell_limit: TRACEBACK_CELL_LIMIT,
        }
    }

    /// Switch to linear-memory traceback for matrices above `cells`
    #[must_use]
    pub fn with_traceback_cell_limit(mut self, cells: usize) -> Self {
        self.traceback_cell_limit = cells;
        self
    }

    /// Align a query window against a reference window.
    ///
    /// A reverse orientation aligns the reverse complement of `query`.
    /// Returns `None` when no alignment reaches an edit distance within
    /// `bound`, or when the alignment would have no columns.
    pub fn align(
        &self,
        reference: &[u8],
        query: &[u8],
        orientation: Orientation,
        bound: EditBound,
    ) -> Option<Alignment> {
        match orientation {
            Orientation::Forward => self.align_oriented(reference, query, bound),
            Orientation::Reverse => {
                let query = reverse_complement(query);
                self.align_oriented(reference, &query, bound)
            }
        }
    }

    fn align_oriented(&self, reference: &[u8], query: &[u8], bound: EditBound) -> Option<Alignment> {
        let k = bound.limit_for(query.len(), reference.len());
        let (ops, ref_span, edit_distance) = if self.keeps_full_traceback(query.len(), reference.len()) {
            let matrix = BandedMatrix::fill(reference, query, k, self.mode, true)?;
            let (ops, ref_start) = matrix.traceback(query.len(), self.mode);
            (ops, ref_start..matrix.end_column, matrix.score)
        } else {
            self.align_linear(reference, query, k)?
        };

        if ops.is_empty() {
            return None;
        }

        Some(Alignment {
            edit_distance,
            cigar: ops.into_iter().collect(),
            ref_span,
        })
    }

    fn keeps_full_traceback(&self, query_len: usize, ref_len: usize) -> bool {
        (query_len + 1).saturating_mul(ref_len + 1) <= self.traceback_cell_limit
    }

    /// Score-only passes locate the alignment, then Hirschberg rebuilds it
    fn align_linear(&self, reference: &[u8], query: &[u8], k: usize) -> Option<(Vec<CigarOp>, Range<usize>, usize)> {
        let scan = BandedMatrix::fill(reference, query, k, self.mode, false)?;
        let end = scan.end_column;

        let start = match self.mode {
            AlignMode::Global => 0,
            AlignMode::Infix => {
                // No cheaper alignment ends left of `end`, so the best reversed
                // alignment starts exactly there and ends at the forward start
                let rev_ref: Vec<u8> = reference[..end].iter().rev().copied().collect();
                let rev_query: Vec<u8> = query.iter().rev().copied().collect();
                let back = BandedMatrix::fill(&rev_ref, &rev_query, scan.score, AlignMode::Infix, false)?;
                end - back.end_column
            }
        };

        let direct_cells = self.traceback_cell_limit.min(DIRECT_CELL_LIMIT);
        let mut ops = Vec::with_capacity(query.len() + end - start);
        hirschberg(&reference[start..end], query, direct_cells, &mut ops);
        Some((ops, start..end, scan.score))
    }
}

/// Two-bit traceback directions for one column
struct Directions {
    bits: Vec<u8>,
}

impl Directions {
    fn new(rows: usize) -> Self {
        Self {
            bits: vec![0; rows.div_ceil(4)],
        }
    }

    fn filled(rows: usize, op: u8) -> Self {
        let mut column = Self::new(rows);
        for i in 0..rows {
            column.set(i, op);
        }
        column
    }

    /// Cells start as `FROM_DIAG`, so each may be set once
    fn set(&mut self, row: usize, op: u8) {
        self.bits[row / 4] |= op << ((row % 4) * 2);
    }

    fn get(&self, row: usize) -> u8 {
        (self.bits[row / 4] >> ((row % 4) * 2)) & 0b11
    }
}

/// Traceback directions for the evaluated part of the matrix
struct BandedMatrix {
    /// One entry per reference position 0..=Lr when kept; empty for a score-only pass
    columns: Vec<Directions>,
    score: usize,
    /// Reference position (exclusive) where the best alignment ends
    end_column: usize,
}

impl BandedMatrix {
    /// Fill the matrix, returning `None` if no cell in the last row is `<= k`.
    /// Directions are only recorded when `keep` is set.
    fn fill(reference: &[u8], query: &[u8], k: usize, mode: AlignMode, keep: bool) -> Option<Self> {
        let m = query.len();
        let n = reference.len();
        // Cells above the bound saturate here; the only thing that matters is "> k"
        let cap = k + 1;

        let mut prev = vec![cap; m + 1];
        let mut cur = vec![cap; m + 1];
        let mut columns = Vec::with_capacity(if keep { n + 1 } else { 0 });

        // Column 0: reaching row i costs i insertions in either mode
        let first_rows = m.min(k);
        for (i, value) in prev.iter_mut().enumerate().take(first_rows + 1) {
            *value = i;
        }
        if keep {
            columns.push(Directions::filled(first_rows + 1, FROM_UP));
        }
        let mut prev_len = first_rows + 1;
        let mut last_active = first_rows;

        let mut best: Option<(usize, usize)> = None;
        if mode == AlignMode::Infix && prev_len > m {
            best = Some((prev[m], 0));
        }

        for (j, &base) in reference.iter().enumerate().map(|(j, b)| (j + 1, b)) {
            let limit = (last_active + 1).min(m);
            let mut ops = keep.then(|| Directions::new(limit + 1));

            cur[0] = match mode {
                AlignMode::Infix => 0,
                AlignMode::Global => j.min(cap),
            };
            if let Some(ops) = ops.as_mut() {
                ops.set(0, FROM_LEFT);
            }
            let mut active = (cur[0] <= k).then_some(0);

            for i in 1..=limit {
                let diag = prev[i - 1] + usize::from(query[i - 1] != base);
                let up = cur[i - 1] + 1;
                let left = if i < prev_len { prev[i] + 1 } else { cap };

                let (value, op) = if diag <= up && diag <= left {
                    (diag, FROM_DIAG)
                } else if up <= left {
                    (up, FROM_UP)
                } else {
                    (left, FROM_LEFT)
                };
                let value = value.min(cap);

                cur[i] = value;
                if let Some(ops) = ops.as_mut() {
                    ops.set(i, op);
                }
                if value <= k {
                    active = Some(i);
                }
            }
            if let Some(ops) = ops {
                columns.push(ops);
            }

            // Only a global alignment can run out of live cells: its row 0 grows with j
            last_active = active?;
            std::mem::swap(&mut prev, &mut cur);
            prev_len = limit + 1;

            if mode == AlignMode::Infix
                && prev_len > m
                && prev[m] <= k
                && best.map_or(true, |(score, _)| prev[m] < score)
            {
                best = Some((prev[m], j));
            }
        }

        if mode == AlignMode::Global && prev_len > m && prev[m] <= k {
            best = Some((prev[m], n));
        }

        let (score, end_column) = best?;
        Some(Self {
            columns,
            score,
            end_column,
        })
    }

    /// Walk back from the best end cell. Returns the operations in reference
    /// order and the reference start.
    fn traceback(&self, query_len: usize, mode: AlignMode) -> (Vec<CigarOp>, usize) {
        let mut ops = Vec::with_capacity(query_len + self.end_column);
        let mut i = query_len;
        let mut j = self.end_column;

        loop {
            if i == 0 {
                match mode {
                    AlignMode::Infix => break,
                    AlignMode::Global if j == 0 => break,
                    AlignMode::Global => {
                        ops.push(CigarOp::D);
                        j -= 1;
                        continue;
                    }
                }
            }

            match self.columns[j].get(i) {
                FROM_DIAG => {
                    ops.push(CigarOp::M);
                    i -= 1;
                    j -= 1;
                }
                FROM_UP => {
                    ops.push(CigarOp::I);
                    i -= 1;
                }
                _ => {
                    ops.push(CigarOp::D);
                    j -= 1;
                }
            }
        }

        ops.reverse();
        (ops, j)
    }
}

/// Append an optimal global alignment of `query` against all of `reference`.
///
/// The query is split at its middle row. A forward cost row over the top half
/// and a reverse cost row over the bottom half give, for every reference
/// position, the best cost of an alignment crossing the middle row there; the
/// cheapest crossing splits the problem in two.
fn hirschberg(reference: &[u8], query: &[u8], direct_cells: usize, ops: &mut Vec<CigarOp>) {
    let m = query.len();
    let n = reference.len();
    if m == 0 {
        ops.extend(std::iter::repeat(CigarOp::D).take(n));
        return;
    }
    if m == 1 || (m + 1).saturating_mul(n + 1) <= direct_cells {
        if let Some(matrix) = BandedMatrix::fill(reference, query, m + n, AlignMode::Global, true) {
            ops.extend(matrix.traceback(m, AlignMode::Global).0);
        }
        return;
    }

    let mid = m / 2;
    let top = last_row(reference, &query[..mid], false);
    // bottom[t] is the cost against the last t reference bases
    let bottom = last_row(reference, &query[mid..], true);
    let split = (0..=n).min_by_key(|&j| top[j] + bottom[n - j]).unwrap_or(0);

    hirschberg(&reference[..split], &query[..mid], direct_cells, ops);
    hirschberg(&reference[split..], &query[mid..], direct_cells, ops);
}

/// Global costs of `query` against every prefix of `reference`, or of both
/// reversed when `reversed` is set
fn last_row(reference: &[u8], query: &[u8], reversed: bool) -> Vec<usize> {
    fn at(bases: &[u8], idx: usize, reversed: bool) -> u8 {
        if reversed {
            bases[bases.len() - 1 - idx]
        } else {
            bases[idx]
        }
    }

    let n = reference.len();
    let mut row: Vec<usize> = (0..=n).collect();
    for i in 0..query.len() {
        let base = at(query, i, reversed);
        let mut diag = row[0];
        row[0] = i + 1;
        for j in 1..=n {
            let sub = diag + usize::from(base != at(reference, j - 1, reversed));
            diag = row[j];
            row[j] = sub.min(row[j] + 1).min(row[j - 1] + 1);
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn forward(engine: AlignmentEngine, reference: &[u8], query: &[u8], bound: EditBound) -> Option<Alignment> {
        engine.align(reference, query, Orientation::Forward, bound)
    }

    /// Plain O(n*m) edit distance with no banding or traceback
    fn brute_force(reference: &[u8], query: &[u8], mode: AlignMode) -> usize {
        let m = query.len();
        let n = reference.len();
        let mut dp = vec![vec![0usize; n + 1]; m + 1];
        for (i, row) in dp.iter_mut().enumerate() {
            row[0] = i;
        }
        for j in 0..=n {
            dp[0][j] = match mode {
                AlignMode::Infix => 0,
                AlignMode::Global => j,
            };
        }
        for i in 1..=m {
            for j in 1..=n {
                let sub = dp[i - 1][j - 1] + usize::from(query[i - 1] != reference[j - 1]);
                dp[i][j] = sub.min(dp[i - 1][j] + 1).min(dp[i][j - 1] + 1);
            }
        }
        match mode {
            AlignMode::Infix => *dp[m].iter().min().unwrap(),
            AlignMode::Global => dp[m][n],
        }
    }

    /// Recount the edit distance implied by a CIGAR
    fn cigar_cost(alignment: &Alignment, reference: &[u8], query: &[u8]) -> usize {
        let mut cost = 0;
        let mut qi = 0;
        let mut rj = alignment.ref_span.start;
        for &(op, n) in alignment.cigar.runs() {
            for _ in 0..n {
                match op {
                    CigarOp::M => {
                        cost += usize::from(query[qi] != reference[rj]);
                        qi += 1;
                        rj += 1;
                    }
                    CigarOp::I => {
                        cost += 1;
                        qi += 1;
                    }
                    CigarOp::D => {
                        cost += 1;
                        rj += 1;
                    }
                }
            }
        }
        cost
    }

    #[test]
    fn test_identical_sequences() {
        let engine = AlignmentEngine::default();
        let aln = forward(engine, b"ACGTACGT", b"ACGTACGT", EditBound::Unbounded).unwrap();
        assert_eq!(aln.edit_distance, 0);
        assert_eq!(aln.alignment_length(), 8);
        assert_eq!(aln.cigar.to_string(), "8M");
        assert!((aln.divergence() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_single_substitution_counts_as_match_op() {
        let engine = AlignmentEngine::default();
        let aln = forward(engine, b"ACGTACGT", b"ACGTTCGT", EditBound::Unbounded).unwrap();
        assert_eq!(aln.edit_distance, 1);
        assert_eq!(aln.alignment_length(), 8);
        assert_eq!(aln.cigar.to_string(), "8M");
        assert!((aln.divergence() - 0.125).abs() < 1e-12);
    }

    #[test]
    fn test_bound_zero_rejects_one_edit() {
        let engine = AlignmentEngine::default();
        assert!(forward(engine, b"ACGTACGT", b"ACGTTCGT", EditBound::AtMost(0)).is_none());
        assert!(forward(engine, b"ACGTACGT", b"ACGTTCGT", EditBound::AtMost(1)).is_some());
    }

    #[test]
    fn test_insertion_in_query() {
        let engine = AlignmentEngine::new(AlignMode::Global);
        let aln = forward(engine, b"ACGTCGT", b"ACGTACGT", EditBound::Unbounded).unwrap();
        assert_eq!(aln.edit_distance, 1);
        assert_eq!(aln.cigar.query_len(), 8);
        assert_eq!(aln.cigar.ref_len(), 7);
        assert_eq!(aln.cigar.runs().iter().filter(|(op, _)| *op == CigarOp::I).count(), 1);
    }

    #[test]
    fn test_infix_skips_flanking_reference() {
        let engine = AlignmentEngine::new(AlignMode::Infix);
        let aln = forward(engine, b"TTTTACGTACGTTTTT", b"ACGTACGT", EditBound::AtMost(0)).unwrap();
        assert_eq!(aln.edit_distance, 0);
        assert_eq!(aln.cigar.to_string(), "8M");
        assert_eq!(aln.ref_span, 4..12);
    }

    #[test]
    fn test_global_consumes_whole_reference() {
        let engine = AlignmentEngine::new(AlignMode::Global);
        let aln = forward(engine, b"TTACGTTT", b"ACGT", EditBound::Unbounded).unwrap();
        assert_eq!(aln.edit_distance, 4);
        assert_eq!(aln.ref_span, 0..8);
        assert_eq!(aln.cigar.ref_len(), 8);
        assert!(forward(engine, b"TTACGTTT", b"ACGT", EditBound::AtMost(3)).is_none());
    }

    #[test]
    fn test_reverse_orientation_uses_reverse_complement() {
        let engine = AlignmentEngine::default();
        // reverse complement of AACG is CGTT
        let aln = engine
            .align(b"GGCGTTGG", b"AACG", Orientation::Reverse, EditBound::AtMost(0))
            .unwrap();
        assert_eq!(aln.ref_span, 2..6);
        assert!(engine
            .align(b"GGCGTTGG", b"AACG", Orientation::Forward, EditBound::AtMost(0))
            .is_none());
    }

    #[test]
    fn test_empty_query_is_not_found() {
        let engine = AlignmentEngine::default();
        assert!(forward(engine, b"ACGT", b"", EditBound::Unbounded).is_none());
        let global = AlignmentEngine::new(AlignMode::Global);
        assert!(forward(global, b"", b"", EditBound::Unbounded).is_none());
    }

    #[test]
    fn test_empty_reference_aligns_as_insertions() {
        let engine = AlignmentEngine::default();
        let aln = forward(engine, b"", b"ACG", EditBound::Unbounded).unwrap();
        assert_eq!(aln.edit_distance, 3);
        assert_eq!(aln.cigar.to_string(), "3I");
        assert!(forward(engine, b"", b"ACG", EditBound::AtMost(2)).is_none());
    }

    #[test]
    fn test_band_finds_distant_diagonal() {
        // The match sits far from the main diagonal; infix mode must still find it with a tight bound
        let mut reference = vec![b'T'; 500];
        reference.extend_from_slice(b"GATTACAGATTACA");
        reference.extend(std::iter::repeat(b'T').take(100));
        let engine = AlignmentEngine::default();
        let aln = forward(engine, &reference, b"GATTACAGATCACA", EditBound::AtMost(1)).unwrap();
        assert_eq!(aln.edit_distance, 1);
        assert_eq!(aln.ref_span, 500..514);
    }

    /// Deterministic pseudo-random bases
    fn random_bases(len: usize, seed: u64) -> Vec<u8> {
        let mut state = seed;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(6_364_136_223_846_793_005).wrapping_add(1_442_695_040_888_963_407);
                b"ACGT"[(state >> 62) as usize]
            })
            .collect()
    }

    #[test]
    fn test_directions_pack_four_per_byte() {
        let mut column = Directions::new(9);
        assert_eq!(column.bits.len(), 3);
        column.set(0, FROM_LEFT);
        column.set(3, FROM_UP);
        column.set(8, FROM_LEFT);
        assert_eq!(column.get(0), FROM_LEFT);
        assert_eq!(column.get(1), FROM_DIAG);
        assert_eq!(column.get(3), FROM_UP);
        assert_eq!(column.get(8), FROM_LEFT);
    }

    #[test]
    fn test_long_windows_skip_full_traceback() {
        let engine = AlignmentEngine::default();
        assert!(engine.keeps_full_traceback(1_000, 1_000));
        // A 20 kb window against a 20 kb query would need 400M stored cells
        assert!(!engine.keeps_full_traceback(20_000, 20_000));
        assert!(!engine.keeps_full_traceback(usize::MAX - 1, 2));
    }

    #[test]
    fn test_linear_memory_traceback_on_long_window() {
        let reference = random_bases(4_000, 11);
        let mut query = reference[500..3_500].to_vec();
        query[100] = if query[100] == b'A' { b'C' } else { b'A' };
        query.insert(1_200, b'G');
        query.remove(2_400);
        query.drain(2_800..2_803);

        for mode in [AlignMode::Infix, AlignMode::Global] {
            let direct = AlignmentEngine::new(mode).with_traceback_cell_limit(usize::MAX);
            let linear = AlignmentEngine::new(mode).with_traceback_cell_limit(1 << 14);
            assert!(!linear.keeps_full_traceback(query.len(), reference.len()));

            let expected = forward(direct, &reference, &query, EditBound::Unbounded).unwrap();
            let aln = forward(linear, &reference, &query, EditBound::Unbounded).unwrap();
            assert_eq!(aln.edit_distance, expected.edit_distance, "{mode:?}");
            assert_eq!(aln.ref_span.end, expected.ref_span.end);
            assert_eq!(aln.cigar.query_len(), query.len());
            assert_eq!(aln.cigar.ref_len(), aln.ref_span.len());
            assert_eq!(cigar_cost(&aln, &reference, &query), aln.edit_distance);
        }

        // Infix places the query exactly and finds all six edits
        let infix = AlignmentEngine::default().with_traceback_cell_limit(1 << 14);
        let aln = forward(infix, &reference, &query, EditBound::AtMost(30)).unwrap();
        assert_eq!(aln.edit_distance, 6);
        assert_eq!(aln.ref_span, 500..3_500);
    }

    proptest! {
        #[test]
        fn prop_unbounded_matches_brute_force(
            reference in "[ACGT]{0,50}",
            query in "[ACGT]{1,50}",
        ) {
            for mode in [AlignMode::Infix, AlignMode::Global] {
                let engine = AlignmentEngine::new(mode);
                let expected = brute_force(reference.as_bytes(), query.as_bytes(), mode);
                let aln = forward(engine, reference.as_bytes(), query.as_bytes(), EditBound::Unbounded)
                    .expect("unbounded alignment of a non-empty query always exists");
                prop_assert_eq!(aln.edit_distance, expected);
            }
        }

        #[test]
        fn prop_cigar_is_consistent(
            reference in "[ACGT]{0,40}",
            query in "[ACGT]{1,40}",
            k in 0usize..12,
        ) {
            for mode in [AlignMode::Infix, AlignMode::Global] {
                let engine = AlignmentEngine::new(mode);
                let expected = brute_force(reference.as_bytes(), query.as_bytes(), mode);
                let result = forward(engine, reference.as_bytes(), query.as_bytes(), EditBound::AtMost(k));

                let Some(aln) = result else {
                    prop_assert!(expected > k);
                    continue;
                };
                prop_assert_eq!(aln.edit_distance, expected);
                prop_assert_eq!(aln.cigar.query_len(), query.len());
                prop_assert_eq!(aln.cigar.ref_len(), aln.ref_span.len());
                prop_assert_eq!(aln.cigar.alignment_len(), aln.alignment_length());
                prop_assert_eq!(cigar_cost(&aln, reference.as_bytes(), query.as_bytes()), aln.edit_distance);
                if mode == AlignMode::Global {
                    prop_assert_eq!(aln.ref_span.clone(), 0..reference.len());
                }
            }
        }

        #[test]
        fn prop_linear_memory_matches_brute_force(
            reference in "[ACGT]{0,40}",
            query in "[ACGT]{1,40}",
            k in 0usize..12,
        ) {
            for mode in [AlignMode::Infix, AlignMode::Global] {
                // A zero limit sends every alignment through Hirschberg down to single rows
                let engine = AlignmentEngine::new(mode).with_traceback_cell_limit(0);
                let expected = brute_force(reference.as_bytes(), query.as_bytes(), mode);
                let result = forward(engine, reference.as_bytes(), query.as_bytes(), EditBound::AtMost(k));

                let Some(aln) = result else {
                    prop_assert!(expected > k);
                    continue;
                };
                prop_assert_eq!(aln.edit_distance, expected);
                prop_assert_eq!(aln.cigar.query_len(), query.len());
                prop_assert_eq!(aln.cigar.ref_len(), aln.ref_span.len());
                prop_assert_eq!(cigar_cost(&aln, reference.as_bytes(), query.as_bytes()), aln.edit_distance);
            }
        }
    }
}
