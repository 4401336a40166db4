//! Worker role: claim tasks, align them, hand results to the writer.

use tracing::{debug, trace, warn};

use crate::align::{AlignmentEngine, EditBound};
use crate::core::task::{AlignedRecord, AlignmentOutcome, AlignmentTask, TaskOutcome};
use crate::pipeline::context::{SchedulerContext, WorkerGuard};
use crate::pipeline::queue::BoundedQueue;
use crate::store::SequenceStore;

/// Align one task.
///
/// The edit-distance bound is derived from `pct_identity` and the length of
/// the query window.
pub fn process_task(
    task: AlignmentTask,
    store: &SequenceStore,
    engine: &AlignmentEngine,
    pct_identity: f64,
) -> TaskOutcome {
    let AlignmentTask {
        serial,
        record,
        query,
        ref_range,
    } = task;

    let Some(reference) = store.window(&record.ref_id, ref_range.clone()) else {
        // Windows are resolved against the same store when the task is built
        warn!(
            "Reference window {}:{:?} vanished for mapping on line {}",
            record.ref_id, ref_range, record.line_number
        );
        return TaskOutcome {
            serial,
            outcome: AlignmentOutcome::NotFound {
                raw_line: record.raw_line,
            },
        };
    };

    let bound = EditBound::from_identity(pct_identity, query.len());
    let outcome = match engine.align(reference, &query, record.orientation, bound) {
        Some(alignment) => AlignmentOutcome::Aligned(AlignedRecord {
            edit_distance: alignment.edit_distance,
            alignment_length: alignment.alignment_length(),
            divergence: alignment.divergence(),
            cigar: alignment.cigar,
            raw_line: record.raw_line,
        }),
        None => {
            debug!(
                "No alignment within {bound:?} for {} line {}",
                record.query_id, record.line_number
            );
            AlignmentOutcome::NotFound {
                raw_line: record.raw_line,
            }
        }
    };

    TaskOutcome { serial, outcome }
}

/// Worker loop. Returns the number of tasks processed.
///
/// The busy flag is raised before every pop and only lowered after a failed
/// pop, so between claiming a task and pushing its result the worker always
/// reads as busy.
pub fn run_worker(
    id: usize,
    ctx: &SchedulerContext,
    tasks: &BoundedQueue<AlignmentTask>,
    results: &BoundedQueue<TaskOutcome>,
    store: &SequenceStore,
    engine: &AlignmentEngine,
    pct_identity: f64,
) -> u64 {
    let _guard = WorkerGuard { ctx, worker: id };
    let mut processed = 0;

    while !ctx.is_aborted() {
        ctx.set_busy(id, true);
        if let Some(task) = tasks.try_pop() {
            let outcome = process_task(task, store, engine, pct_identity);
            if results.push_with_backoff(outcome, || ctx.is_aborted()).is_err() {
                break;
            }
            processed += 1;
            continue;
        }

        ctx.set_busy(id, false);
        if ctx.worker_may_exit(tasks) {
            break;
        }
        tasks.idle();
    }

    trace!("Worker {id} finished after {processed} tasks");
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::AlignMode;
    use crate::core::sequence::Sequence;
    use crate::parsing::mapping::parse_mapping_line;
    use crate::pipeline::queue::DEFAULT_POLL_INTERVAL;

    fn store() -> SequenceStore {
        SequenceStore::from_sequences([Sequence::new("r1", b"ACGTACGTAA".to_vec())]).unwrap()
    }

    fn task(serial: u64, line: &str, query: &[u8]) -> AlignmentTask {
        let store = store();
        let record = parse_mapping_line(line, 1).unwrap();
        let ref_range = store.resolve_window(&record).unwrap();
        AlignmentTask {
            serial,
            record,
            query: query.to_vec(),
            ref_range,
        }
    }

    #[test]
    fn test_exact_match() {
        let engine = AlignmentEngine::new(AlignMode::Infix);
        let outcome = process_task(task(3, "q 8 0 7 + r1 10 0 7", b"ACGTACGT"), &store(), &engine, 0.0);
        assert_eq!(outcome.serial, 3);
        match outcome.outcome {
            AlignmentOutcome::Aligned(record) => {
                assert_eq!(record.edit_distance, 0);
                assert_eq!(record.alignment_length, 8);
                assert_eq!(record.cigar.to_string(), "8M");
                assert!(record.divergence.abs() < f64::EPSILON);
            }
            AlignmentOutcome::NotFound { .. } => panic!("expected an alignment"),
        }
    }

    #[test]
    fn test_identity_bound_rejects() {
        // Query has 3 mismatches over 8 bases; 90% identity allows floor(0.8) = 0 edits
        let engine = AlignmentEngine::new(AlignMode::Infix);
        let outcome = process_task(task(0, "q 8 0 7 + r1 10 0 7", b"AGGTTCGA"), &store(), &engine, 90.0);
        assert!(matches!(outcome.outcome, AlignmentOutcome::NotFound { .. }));
    }

    #[test]
    fn test_reverse_orientation() {
        // ACGTACGT is its own reverse complement
        let engine = AlignmentEngine::new(AlignMode::Infix);
        let outcome = process_task(task(0, "q 8 0 7 - r1 10 0 7", b"ACGTACGT"), &store(), &engine, 100.0);
        assert!(matches!(
            outcome.outcome,
            AlignmentOutcome::Aligned(AlignedRecord { edit_distance: 0, .. })
        ));
    }

    #[test]
    fn test_worker_drains_queue_and_exits() {
        let store = store();
        let engine = AlignmentEngine::default();
        let ctx = SchedulerContext::new(1);
        let tasks = BoundedQueue::new(8, DEFAULT_POLL_INTERVAL);
        let results = BoundedQueue::new(8, DEFAULT_POLL_INTERVAL);
        for serial in 0..5 {
            tasks.try_push(task(serial, "q 4 0 3 + r1 10 0 7", b"ACGT")).unwrap();
        }
        ctx.close_input();

        let processed = run_worker(0, &ctx, &tasks, &results, &store, &engine, 0.0);
        assert_eq!(processed, 5);
        assert_eq!(results.len(), 5);
        assert!(!ctx.is_busy(0));
    }

    #[test]
    fn test_worker_stops_on_abort() {
        let store = store();
        let engine = AlignmentEngine::default();
        let ctx = SchedulerContext::new(1);
        let tasks: BoundedQueue<AlignmentTask> = BoundedQueue::new(2, DEFAULT_POLL_INTERVAL);
        let results = BoundedQueue::new(2, DEFAULT_POLL_INTERVAL);
        // Input never closes; only the abort lets the worker return
        ctx.abort();
        assert_eq!(run_worker(0, &ctx, &tasks, &results, &store, &engine, 0.0), 0);
    }
}
