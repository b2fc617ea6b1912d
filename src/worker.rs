//! Per-shard aggregation.
//!
//! A [`Worker`] owns its URL map, its referer map and its byte total for its
//! whole lifetime. Nothing in here is shared with other workers; the result
//! is handed back by value once the shard is done.

use std::fs::File;
use std::path::Path;

use memchr::memchr;
use memmap2::Mmap;
use tracing::{debug, trace, warn};

use crate::error::{MapError, WorkerError};
use crate::map::AggregationMap;
use crate::record::LineExtractor;
use crate::report::RunStats;

/// What a finished worker hands to the merge phase.
#[derive(Debug)]
pub struct WorkerOutput {
    pub urls: AggregationMap,
    pub referers: AggregationMap,
    pub total_bytes: i64,
    pub stats: RunStats,
}

pub struct Worker<'e, E> {
    index: usize,
    extractor: &'e E,
    urls: AggregationMap,
    referers: AggregationMap,
    total_bytes: i64,
    stats: RunStats,
}

impl<'e, E: LineExtractor> Worker<'e, E> {
    pub fn new(index: usize, extractor: &'e E) -> Self {
        Self {
            index,
            extractor,
            urls: AggregationMap::new(),
            referers: AggregationMap::new(),
            total_bytes: 0,
            stats: RunStats::default(),
        }
    }

    /// Processes `files` in order and returns the accumulated output.
    ///
    /// Files that cannot be opened or mapped are skipped. Only map allocation
    /// failure aborts the shard.
    pub fn run<P: AsRef<Path>>(mut self, files: &[P]) -> Result<WorkerOutput, WorkerError> {
        for path in files {
            self.process_file(path.as_ref())?;
        }

        debug!(
            worker = self.index,
            files = self.stats.files_processed,
            skipped_files = self.stats.files_skipped,
            lines = self.stats.lines_processed,
            skipped_lines = self.stats.lines_skipped,
            total_bytes = self.total_bytes,
            urls = self.urls.len(),
            referers = self.referers.len(),
            "worker finished"
        );

        Ok(WorkerOutput {
            urls: self.urls,
            referers: self.referers,
            total_bytes: self.total_bytes,
            stats: self.stats,
        })
    }

    fn process_file(&mut self, path: &Path) -> Result<(), WorkerError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!(worker = self.index, path = %path.display(), error = %e, "skipping unreadable log file");
                self.stats.files_skipped += 1;
                return Ok(());
            }
        };

        // Zero-length files cannot be mapped on every platform.
        if file.metadata().map(|m| m.len() == 0).unwrap_or(false) {
            self.stats.files_processed += 1;
            return Ok(());
        }

        // SAFETY: the mapping is read-only and dropped before this call
        // returns. Log files truncated underneath us are outside the contract.
        let mmap = match unsafe { Mmap::map(&file) } {
            Ok(m) => m,
            Err(e) => {
                warn!(worker = self.index, path = %path.display(), error = %e, "skipping log file that could not be mapped");
                self.stats.files_skipped += 1;
                return Ok(());
            }
        };

        trace!(worker = self.index, path = %path.display(), len = mmap.len(), "processing file");
        self.process_chunk(&mmap)?;
        self.stats.files_processed += 1;
        Ok(())
    }

    /// Feeds every newline-separated line of `buf` to the extractor. A final
    /// line without a trailing newline is processed too.
    pub fn process_chunk(&mut self, buf: &[u8]) -> Result<(), WorkerError> {
        let mut rest = buf;
        while !rest.is_empty() {
            let (line, next) = match memchr(b'\n', rest) {
                Some(nl) => (&rest[..nl], &rest[nl + 1..]),
                None => (rest, &rest[rest.len()..]),
            };
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            self.process_line(line)?;
            rest = next;
        }
        Ok(())
    }

    pub fn process_line(&mut self, line: &[u8]) -> Result<(), WorkerError> {
        let Some(record) = self.extractor.extract(line) else {
            trace!(worker = self.index, "skipping unparseable line");
            self.stats.lines_skipped += 1;
            return Ok(());
        };

        self.urls
            .add(&record.url, record.bytes)
            .map_err(|e| self.allocation_failure("url", e))?;
        self.referers
            .add(&record.referer, record.bytes)
            .map_err(|e| self.allocation_failure("referer", e))?;
        self.total_bytes += record.bytes;
        self.stats.lines_processed += 1;
        Ok(())
    }

    fn allocation_failure(&self, dimension: &'static str, source: MapError) -> WorkerError {
        WorkerError::Allocation {
            worker: self.index,
            dimension,
            source,
        }
    }
}
