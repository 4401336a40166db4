//! Writer role: drain results and emit output lines.
//!
//! Output is one line per aligned task. Tasks without an alignment are counted
//! but produce no line. By default lines appear in completion order; with
//! ordering enabled a reorder buffer holds early results until every lower
//! serial has been written.

use std::collections::BTreeMap;
use std::io::{self, BufWriter, Write};

use serde::Serialize;
use tracing::{debug, error};

use crate::core::task::{AlignmentOutcome, AlignmentTask, TaskOutcome};
use crate::pipeline::context::SchedulerContext;
use crate::pipeline::queue::BoundedQueue;

/// Counts of outcomes seen by the writer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    pub aligned: u64,
    pub not_found: u64,
}

/// Holds out-of-order outcomes until their predecessors arrive
#[derive(Debug, Default)]
struct ReorderBuffer {
    next_serial: u64,
    pending: BTreeMap<u64, AlignmentOutcome>,
}

impl ReorderBuffer {
    fn insert(&mut self, outcome: TaskOutcome) {
        self.pending.insert(outcome.serial, outcome.outcome);
    }

    /// Next outcome in serial order, if it has arrived
    fn pop_ready(&mut self) -> Option<AlignmentOutcome> {
        let outcome = self.pending.remove(&self.next_serial)?;
        self.next_serial += 1;
        Some(outcome)
    }
}

/// Destination for outcomes
pub struct ResultSink<W: Write> {
    out: BufWriter<W>,
    reorder: Option<ReorderBuffer>,
    stats: SinkStats,
}

impl<W: Write> ResultSink<W> {
    /// `ordered` emits lines in task serial order instead of completion order
    pub fn new(out: W, ordered: bool) -> Self {
        Self {
            out: BufWriter::new(out),
            reorder: ordered.then(ReorderBuffer::default),
            stats: SinkStats::default(),
        }
    }

    /// Record one outcome, writing any lines that became ready.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if writing fails.
    pub fn accept(&mut self, outcome: TaskOutcome) -> io::Result<()> {
        match self.reorder.as_mut() {
            None => self.emit(outcome.outcome),
            Some(buffer) => {
                buffer.insert(outcome);
                while let Some(ready) = self.reorder.as_mut().and_then(ReorderBuffer::pop_ready) {
                    self.emit(ready)?;
                }
                Ok(())
            }
        }
    }

    fn emit(&mut self, outcome: AlignmentOutcome) -> io::Result<()> {
        match outcome {
            AlignmentOutcome::Aligned(record) => {
                self.stats.aligned += 1;
                writeln!(self.out, "{record}")
            }
            AlignmentOutcome::NotFound { .. } => {
                self.stats.not_found += 1;
                Ok(())
            }
        }
    }

    /// Outcomes still held back waiting for a lower serial
    pub fn buffered(&self) -> usize {
        self.reorder.as_ref().map_or(0, |b| b.pending.len())
    }

    /// Flush and return the final counts.
    ///
    /// Anything still held in the reorder buffer (possible only after an
    /// abort) is written in serial order, skipping the gaps.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error if writing or flushing fails.
    pub fn finish(mut self) -> io::Result<SinkStats> {
        if let Some(buffer) = self.reorder.take() {
            if !buffer.pending.is_empty() {
                debug!("Flushing {} results with missing predecessors", buffer.pending.len());
            }
            for outcome in buffer.pending.into_values() {
                self.emit(outcome)?;
            }
        }
        self.out.flush()?;
        Ok(self.stats)
    }
}

/// Writer loop.
///
/// Exits once no further result can be produced, or when the run is aborted.
/// A write failure aborts the whole run.
///
/// # Errors
///
/// Returns the first I/O error raised while writing.
pub fn run_writer<W: Write>(
    ctx: &SchedulerContext,
    tasks: &BoundedQueue<AlignmentTask>,
    results: &BoundedQueue<TaskOutcome>,
    mut sink: ResultSink<W>,
) -> io::Result<SinkStats> {
    loop {
        if let Some(outcome) = results.try_pop() {
            if let Err(e) = sink.accept(outcome) {
                error!("Failed to write output: {e}");
                ctx.abort();
                return Err(e);
            }
            continue;
        }
        if ctx.is_aborted() || ctx.writer_may_exit(tasks, results) {
            break;
        }
        results.idle();
    }

    sink.finish().map_err(|e| {
        error!("Failed to flush output: {e}");
        ctx.abort();
        e
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::{Cigar, CigarOp};
    use crate::core::task::AlignedRecord;
    use crate::pipeline::queue::DEFAULT_POLL_INTERVAL;

    fn aligned(serial: u64, name: &str) -> TaskOutcome {
        let mut cigar = Cigar::new();
        cigar.push(CigarOp::M, 4);
        TaskOutcome {
            serial,
            outcome: AlignmentOutcome::Aligned(AlignedRecord {
                raw_line: name.to_string(),
                edit_distance: 0,
                alignment_length: 4,
                divergence: 0.0,
                cigar,
            }),
        }
    }

    fn missing(serial: u64) -> TaskOutcome {
        TaskOutcome {
            serial,
            outcome: AlignmentOutcome::NotFound {
                raw_line: "gone".to_string(),
            },
        }
    }

    fn names(output: &[u8]) -> Vec<String> {
        String::from_utf8(output.to_vec())
            .unwrap()
            .lines()
            .map(|l| l.split('\t').next().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_completion_order() {
        let mut out = Vec::new();
        let mut sink = ResultSink::new(&mut out, false);
        sink.accept(aligned(2, "c")).unwrap();
        sink.accept(aligned(0, "a")).unwrap();
        sink.accept(missing(1)).unwrap();
        let stats = sink.finish().unwrap();

        assert_eq!(stats, SinkStats { aligned: 2, not_found: 1 });
        assert_eq!(names(&out), vec!["c", "a"]);
    }

    #[test]
    fn test_line_format() {
        let mut out = Vec::new();
        let mut sink = ResultSink::new(&mut out, false);
        sink.accept(aligned(0, "q1\t4\t0\t3\t+\tr1\t4\t0\t3")).unwrap();
        sink.finish().unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "q1\t4\t0\t3\t+\tr1\t4\t0\t3\ted:i:0\tal:i4\tad:f:0\tcg:Z:4M\n"
        );
    }

    #[test]
    fn test_ordered_output() {
        let mut out = Vec::new();
        let mut sink = ResultSink::new(&mut out, true);
        sink.accept(aligned(2, "c")).unwrap();
        sink.accept(aligned(3, "d")).unwrap();
        assert_eq!(sink.buffered(), 2);
        // A not-found result still releases its successors
        sink.accept(missing(1)).unwrap();
        assert_eq!(sink.buffered(), 3);
        sink.accept(aligned(0, "a")).unwrap();
        assert_eq!(sink.buffered(), 0);
        let stats = sink.finish().unwrap();

        assert_eq!(stats.aligned, 3);
        assert_eq!(stats.not_found, 1);
        assert_eq!(names(&out), vec!["a", "c", "d"]);
    }

    #[test]
    fn test_finish_flushes_gaps() {
        let mut out = Vec::new();
        let mut sink = ResultSink::new(&mut out, true);
        sink.accept(aligned(4, "e")).unwrap();
        sink.accept(aligned(2, "c")).unwrap();
        sink.finish().unwrap();
        assert_eq!(names(&out), vec!["c", "e"]);
    }

    #[test]
    fn test_run_writer_drains_closed_pipeline() {
        let ctx = SchedulerContext::new(2);
        let tasks = BoundedQueue::new(4, DEFAULT_POLL_INTERVAL);
        let results = BoundedQueue::new(4, DEFAULT_POLL_INTERVAL);
        results.try_push(aligned(0, "a")).unwrap();
        results.try_push(missing(1)).unwrap();
        ctx.close_input();

        let mut out = Vec::new();
        let stats = run_writer(&ctx, &tasks, &results, ResultSink::new(&mut out, false)).unwrap();
        assert_eq!(stats, SinkStats { aligned: 1, not_found: 1 });
        assert!(results.is_empty());
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_write_failure_aborts() {
        let ctx = SchedulerContext::new(1);
        let tasks = BoundedQueue::new(4, DEFAULT_POLL_INTERVAL);
        let results = BoundedQueue::new(4, DEFAULT_POLL_INTERVAL);
        results.try_push(aligned(0, "a")).unwrap();
        ctx.close_input();

        let err = run_writer(&ctx, &tasks, &results, ResultSink::new(FailingWriter, false)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        assert!(ctx.is_aborted());
    }
}
