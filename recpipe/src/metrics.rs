//! Metrics definitions for pipeline monitoring.

/// Label for the receiver id in metrics.
pub const WORKER_ID_LABEL: &str = "worker_id";

/// Label for the completion cause in metrics.
pub const COMPLETION_CAUSE_LABEL: &str = "completion_cause";

/// Counter for records handed off by the producer.
pub const RECPIPE_RECORDS_PROCESSED_TOTAL: &str = "recpipe_records_processed_total";

/// Counter for rows the producer could not parse.
pub const RECPIPE_RECORDS_FAILED_TOTAL: &str = "recpipe_records_failed_total";

/// Counter for records a receiver could not decode.
pub const RECPIPE_RECORDS_SKIPPED_TOTAL: &str = "recpipe_records_skipped_total";

/// Counter for records matching the configured predicate.
pub const RECPIPE_MATCHES_TOTAL: &str = "recpipe_matches_total";

/// Histogram of whole run durations in seconds.
pub const RECPIPE_RUN_DURATION_SECONDS: &str = "recpipe_run_duration_seconds";
