//! Run orchestration: discover, shard, fan out, join, merge, select.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::time::Instant;

use rayon::ThreadPoolBuilder;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::discover::discover;
use crate::error::{EngineError, WorkerError};
use crate::merge;
use crate::record::{CombinedLogFormat, LineExtractor};
use crate::report::{GlobalTotals, Report, RunStats};
use crate::shard::{shard, ShardAssignment};
use crate::topk::top_k;
use crate::worker::{Worker, WorkerOutput};

pub struct Engine<E = CombinedLogFormat> {
    config: EngineConfig,
    extractor: E,
}

impl Engine<CombinedLogFormat> {
    pub fn new(config: EngineConfig) -> Self {
        Self::with_extractor(config, CombinedLogFormat)
    }
}

impl<E: LineExtractor + Sync> Engine<E> {
    pub fn with_extractor(config: EngineConfig, extractor: E) -> Self {
        Self { config, extractor }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Validates the configuration, discovers the log directory and runs.
    pub fn run(&self) -> Result<Report, EngineError> {
        self.config.validate()?;

        let files = discover(&self.config.log_dir)?;
        if files.is_empty() {
            return Err(EngineError::invalid(format!(
                "no log files found in {}",
                self.config.log_dir.display()
            )));
        }
        self.run_files(files)
    }

    /// Runs over an explicit file list. `config.log_dir` is not consulted.
    pub fn run_files(&self, files: Vec<PathBuf>) -> Result<Report, EngineError> {
        if self.config.top_k == 0 {
            return Err(EngineError::invalid("top-k must be positive"));
        }

        let started = Instant::now();
        let file_count = files.len();
        let shards = shard(files, self.config.workers)?;
        info!(
            files = file_count,
            workers = shards.len(),
            top_k = self.config.top_k,
            "starting aggregation"
        );

        let outputs = self.fan_out(&shards)?;
        let report = self.reduce(outputs)?;

        info!(
            total_bytes = report.totals.total_bytes,
            lines = report.stats.lines_processed,
            skipped_lines = report.stats.lines_skipped,
            skipped_files = report.stats.files_skipped,
            failed_workers = report.stats.workers_failed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "aggregation finished"
        );
        Ok(report)
    }

    /// One pool thread per shard. `broadcast` returns once every thread has
    /// finished, which is the only synchronisation point of the run.
    fn fan_out(
        &self,
        shards: &[ShardAssignment],
    ) -> Result<Vec<Result<WorkerOutput, WorkerError>>, EngineError> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(shards.len())
            .thread_name(|i| format!("logtally-worker-{i}"))
            .build()?;

        Ok(pool.broadcast(|ctx| self.run_shard(&shards[ctx.index()])))
    }

    fn run_shard(&self, shard: &ShardAssignment) -> Result<WorkerOutput, WorkerError> {
        debug!(
            worker = shard.worker_index,
            files = shard.files.len(),
            "worker started"
        );
        let worker = Worker::new(shard.worker_index, &self.extractor);
        panic::catch_unwind(AssertUnwindSafe(|| worker.run(&shard.files[..]))).unwrap_or_else(
            |payload| {
                Err(WorkerError::Panicked {
                    worker: shard.worker_index,
                    message: panic_message(payload.as_ref()),
                })
            },
        )
    }

    fn reduce(
        &self,
        outputs: Vec<Result<WorkerOutput, WorkerError>>,
    ) -> Result<Report, EngineError> {
        let workers = outputs.len();
        let mut stats = RunStats::default();
        let mut total_bytes = 0i64;
        let mut urls = Vec::with_capacity(workers);
        let mut referers = Vec::with_capacity(workers);
        let mut first_failure = None;

        for output in outputs {
            match output {
                Ok(out) => {
                    total_bytes += out.total_bytes;
                    stats.absorb(&out.stats);
                    urls.push(out.urls);
                    referers.push(out.referers);
                }
                Err(e) => {
                    warn!(worker = e.worker(), error = %e, "worker failed, its shard is left out of the totals");
                    stats.workers_failed += 1;
                    first_failure.get_or_insert(e);
                }
            }
        }

        if urls.is_empty() {
            if let Some(first) = first_failure {
                return Err(EngineError::AllWorkersFailed { workers, first });
            }
        }

        let urls = merge::join(urls)?;
        let referers = merge::join(referers)?;
        debug!(
            urls = urls.len(),
            referers = referers.len(),
            "merged worker maps"
        );

        Ok(Report {
            totals: GlobalTotals {
                total_bytes,
                top_urls: top_k(&urls, self.config.top_k),
                top_referers: top_k(&referers, self.config.top_k),
            },
            stats,
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
