//! Concurrent access-log aggregation.
//!
//! A run discovers the log files in a directory, shards them over a fixed
//! pool of workers, lets every worker tally bytes per URL and per referer in
//! its own private [`AggregationMap`], merges the per-worker maps after all
//! workers have finished and finally selects the top-K keys of each merged map.
//!
//! ```text
//! discover -> shard -> Worker x W -> (barrier) -> join -> top_k -> Report
//! ```

pub mod config;
pub mod discover;
pub mod engine;
pub mod error;
pub mod logging;
pub mod map;
pub mod merge;
pub mod record;
pub mod report;
pub mod shard;
pub mod topk;
pub mod worker;

pub use config::EngineConfig;
pub use engine::Engine;
pub use error::{EngineError, MapError, WorkerError};
pub use map::AggregationMap;
pub use record::{CombinedLogFormat, LineExtractor, Record};
pub use report::{GlobalTotals, Report, RunStats};
