//! Wiring the reader, worker pool and writer together.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::thread::{self, Scope, ScopedJoinHandle};

use tracing::{debug, info};

use crate::align::AlignmentEngine;
use crate::core::sequence::Sequence;
use crate::core::task::{AlignmentTask, TaskOutcome};
use crate::parsing::fasta::MultiFastaReader;
use crate::parsing::mapping::MappingSource;
use crate::parsing::ParseError;
use crate::pipeline::builder::{task_source, MergeStats, TaskSource};
use crate::pipeline::context::{InputClosedGuard, SchedulerContext};
use crate::pipeline::queue::BoundedQueue;
use crate::pipeline::validate::validate_mappings;
use crate::pipeline::worker::run_worker;
use crate::pipeline::writer::{run_writer, ResultSink};
use crate::pipeline::{PipelineConfig, PipelineError, PipelineSummary};
use crate::store::SequenceStore;

/// Runs one pipeline over a loaded reference store
pub struct Scheduler<'a> {
    store: &'a SequenceStore,
    config: PipelineConfig,
}

impl<'a> Scheduler<'a> {
    /// # Errors
    ///
    /// Returns `PipelineError::Config` if `config` has a setting out of range.
    pub fn new(store: &'a SequenceStore, config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        Ok(Self { store, config })
    }

    /// Align every task `source` builds from `queries`, writing to `output`.
    ///
    /// Spawns one reader, `threads` workers and one writer, and returns once
    /// all of them have exited.
    ///
    /// # Errors
    ///
    /// Returns the first failure, preferring in order: a thread that could not
    /// be started, a reader error (bad input or inconsistent mapping), a
    /// panicked thread, then a write error.
    pub fn run<Q, S, W>(&self, queries: Q, source: S, output: W) -> Result<PipelineSummary, PipelineError>
    where
        Q: Iterator<Item = Result<Sequence, ParseError>> + Send,
        S: TaskSource + Send,
        W: Write + Send,
    {
        let config = &self.config;
        let store = self.store;
        let engine = AlignmentEngine::new(config.mode);
        let ctx = SchedulerContext::new(config.threads);
        let tasks: BoundedQueue<AlignmentTask> = BoundedQueue::new(config.queue_capacity, config.poll_interval());
        let results: BoundedQueue<TaskOutcome> = BoundedQueue::new(config.queue_capacity, config.poll_interval());

        info!(
            "Aligning with {} workers (mode {:?}, merge {:?}, min identity {}%)",
            config.threads, config.mode, config.merge, config.pct_identity
        );

        let (ctx, tasks, results, engine) = (&ctx, &tasks, &results, &engine);
        let pct_identity = config.pct_identity;

        thread::scope(|scope| {
            let reader = spawn_role(scope, ctx, "reader".to_string(), move || {
                run_reader(ctx, tasks, queries, source)
            })?;

            let mut spawn_error = None;
            let mut workers = Vec::with_capacity(config.threads);
            for id in 0..config.threads {
                let spawned = spawn_role(scope, ctx, format!("worker-{id}"), move || {
                    run_worker(id, ctx, tasks, results, store, engine, pct_identity)
                });
                match spawned {
                    Ok(handle) => workers.push(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        break;
                    }
                }
            }

            let writer = if spawn_error.is_none() {
                let sink = ResultSink::new(output, config.ordered);
                match spawn_role(scope, ctx, "writer".to_string(), move || {
                    run_writer(ctx, tasks, results, sink)
                }) {
                    Ok(handle) => Some(handle),
                    Err(e) => {
                        spawn_error = Some(e);
                        None
                    }
                }
            } else {
                None
            };

            let reader_result = reader.join();
            let mut processed = 0;
            let mut worker_panicked = false;
            for handle in workers {
                match handle.join() {
                    Ok(count) => processed += count,
                    Err(_) => worker_panicked = true,
                }
            }
            let writer_result = writer.map(ScopedJoinHandle::join);

            if let Some(e) = spawn_error {
                return Err(e);
            }
            let (queries_read, merge) = match reader_result {
                Ok(Ok(stats)) => stats,
                Ok(Err(e)) => return Err(e),
                Err(_) => return Err(PipelineError::ThreadPanicked("reader")),
            };
            if worker_panicked {
                return Err(PipelineError::ThreadPanicked("worker"));
            }
            let sink_stats = match writer_result {
                Some(Ok(Ok(stats))) => stats,
                Some(Ok(Err(e))) => return Err(PipelineError::Write(e)),
                Some(Err(_)) => return Err(PipelineError::ThreadPanicked("writer")),
                None => return Err(PipelineError::ThreadPanicked("writer")),
            };

            debug!("Workers processed {processed} tasks");
            let summary = PipelineSummary::new(queries_read, &merge, sink_stats);
            info!(
                "Aligned {} of {} tasks ({} without alignment)",
                summary.aligned, summary.tasks_built, summary.not_found
            );
            Ok(summary)
        })
    }
}

/// Start a named role thread, aborting the run if the OS refuses
fn spawn_role<'scope, 'env, T, F>(
    scope: &'scope Scope<'scope, 'env>,
    ctx: &SchedulerContext,
    name: String,
    f: F,
) -> Result<ScopedJoinHandle<'scope, T>, PipelineError>
where
    F: FnOnce() -> T + Send + 'scope,
    T: Send + 'scope,
{
    thread::Builder::new()
        .name(name.clone())
        .spawn_scoped(scope, f)
        .map_err(|source| {
            ctx.abort();
            PipelineError::Spawn { role: name, source }
        })
}

/// Reader loop. Returns the number of query sequences read and merge counts.
fn run_reader<Q, S>(
    ctx: &SchedulerContext,
    tasks: &BoundedQueue<AlignmentTask>,
    queries: Q,
    mut source: S,
) -> Result<(u64, MergeStats), PipelineError>
where
    Q: Iterator<Item = Result<Sequence, ParseError>>,
    S: TaskSource,
{
    let _guard = InputClosedGuard(ctx);
    let result = feed_tasks(ctx, tasks, queries, &mut source);
    if result.is_err() {
        ctx.abort();
    }
    result
}

fn feed_tasks<Q, S>(
    ctx: &SchedulerContext,
    tasks: &BoundedQueue<AlignmentTask>,
    queries: Q,
    source: &mut S,
) -> Result<(u64, MergeStats), PipelineError>
where
    Q: Iterator<Item = Result<Sequence, ParseError>>,
    S: TaskSource,
{
    let mut queries_read = 0;

    // Each task goes to the queue as soon as it is built, so a full queue
    // stalls the merge itself
    let mut push = |task: AlignmentTask| tasks.push_with_backoff(task, || ctx.is_aborted()).is_ok();

    for query in queries {
        if ctx.is_aborted() {
            break;
        }
        let query = query?;
        queries_read += 1;

        if source.tasks_for(&query, &mut push)?.is_none() {
            debug!("Mappings exhausted at query {}; remaining queries are skipped", query.id);
            break;
        }
    }

    let stats = source.finish()?;
    Ok((queries_read, stats))
}

/// File inputs of one alignment run
#[derive(Debug, Clone)]
pub struct AlignInputs {
    pub references: Vec<PathBuf>,
    pub queries: Vec<PathBuf>,
    /// Mapping file; `-` reads stdin
    pub mappings: PathBuf,
}

/// Load references, check the mappings against them, then run the pipeline.
///
/// Pre-validation needs a second pass over the mapping file, so it is
/// skipped when the mappings come from stdin. The same checks still run as
/// each task is built.
///
/// # Errors
///
/// Returns `PipelineError::Config` for the first mapping that references a
/// missing sequence or window, or any error from loading inputs or running
/// the pipeline.
pub fn align_files<W: Write + Send>(
    inputs: &AlignInputs,
    config: PipelineConfig,
    output: W,
) -> Result<PipelineSummary, PipelineError> {
    config.validate()?;
    let store = SequenceStore::load(&inputs.references)?;

    if is_stdin(&inputs.mappings) {
        debug!("Mappings read from stdin; skipping pre-validation");
    } else {
        let report = validate_mappings(MappingSource::from_path(&inputs.mappings)?, &store)?;
        report.into_result()?;
    }

    let mappings = MappingSource::from_path(&inputs.mappings)?;
    let source = task_source(config.merge, &store, mappings)?;
    let queries = MultiFastaReader::new(&inputs.queries);

    Scheduler::new(&store, config)?.run(queries, source, output)
}

fn is_stdin(path: &Path) -> bool {
    path.as_os_str() == "-"
}
