use std::path::PathBuf;

use crate::error::EngineError;

/// The files one worker processes, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardAssignment {
    pub worker_index: usize,
    pub files: Vec<PathBuf>,
}

/// Splits `files` into contiguous, order-preserving shards.
///
/// With `n` files over `w` workers the first `n % w` shards get one extra
/// file. When there are fewer files than workers the worker count is reduced
/// to the file count so that no shard is empty.
pub fn shard(files: Vec<PathBuf>, workers: usize) -> Result<Vec<ShardAssignment>, EngineError> {
    if workers == 0 {
        return Err(EngineError::invalid("worker count must be positive"));
    }
    if files.is_empty() {
        return Err(EngineError::invalid("no log files to process"));
    }

    let workers = workers.min(files.len());
    let base = files.len() / workers;
    let extra = files.len() % workers;

    let mut files = files.into_iter();
    let shards = (0..workers)
        .map(|worker_index| {
            let take = base + usize::from(worker_index < extra);
            ShardAssignment {
                worker_index,
                files: files.by_ref().take(take).collect(),
            }
        })
        .collect();
    Ok(shards)
}
