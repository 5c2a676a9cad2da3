mod record;
mod stats;

pub use record::Record;
pub(crate) use stats::ErrorLog;
pub use stats::{MAX_COLLECTED_ERRORS, ProducerReport, RunStatistics, WorkerReport};

/// Identifier of a receiver within a single run, starting at 1.
pub type WorkerId = usize;
