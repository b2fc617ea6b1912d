use std::collections::TryReserveError;
use thiserror::Error;

/// Failure to grow an [`AggregationMap`](crate::AggregationMap).
#[derive(Debug, Error)]
pub enum MapError {
    #[error("aggregation map allocation failed")]
    Allocation(#[from] TryReserveError),
}

/// A worker that could not finish its shard. Its partial maps are discarded,
/// the other shards are unaffected.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("worker {worker} ran out of memory growing its {dimension} map")]
    Allocation {
        worker: usize,
        dimension: &'static str,
        #[source]
        source: MapError,
    },

    #[error("worker {worker} panicked: {message}")]
    Panicked { worker: usize, message: String },
}

impl WorkerError {
    pub fn worker(&self) -> usize {
        match self {
            WorkerError::Allocation { worker, .. } | WorkerError::Panicked { worker, .. } => {
                *worker
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum EngineError {
    //-------------------------------------------------------------------------
    // Reported before any work starts
    //-------------------------------------------------------------------------
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("failed to build worker pool")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    //-------------------------------------------------------------------------
    // Run-level failures
    //-------------------------------------------------------------------------
    #[error("all {workers} workers failed")]
    AllWorkersFailed {
        workers: usize,
        #[source]
        first: WorkerError,
    },

    #[error("merging worker results failed")]
    Merge(#[from] MapError),
}

impl EngineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        EngineError::InvalidConfiguration(message.into())
    }
}
