use std::path::PathBuf;

use crate::error::EngineError;

pub const DEFAULT_TOP_K: usize = 10;

/// Everything a run needs. Validated once before any file is touched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub workers: usize,
    pub log_dir: PathBuf,
    pub top_k: usize,
}

impl EngineConfig {
    pub fn new(workers: usize, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            workers,
            log_dir: log_dir.into(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.workers == 0 {
            return Err(EngineError::invalid("worker count must be positive"));
        }
        if self.top_k == 0 {
            return Err(EngineError::invalid("top-k must be positive"));
        }
        if !self.log_dir.is_dir() {
            return Err(EngineError::invalid(format!(
                "log directory {} does not exist or is not a directory",
                self.log_dir.display()
            )));
        }
        Ok(())
    }
}
