use std::time::Duration;

use crate::concurrency::signal::CompletionCause;
use crate::error::PipelineError;
use crate::types::WorkerId;

/// Maximum number of errors kept by a single participant.
///
/// Errors past this limit are only counted, so that a run over a badly broken input keeps a
/// bounded memory footprint.
pub const MAX_COLLECTED_ERRORS: usize = 1_000;

/// Errors collected by one participant of a run.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorLog {
    errors: Vec<PipelineError>,
    dropped: u64,
}

impl ErrorLog {
    pub(crate) fn push(&mut self, error: PipelineError) {
        if self.errors.len() < MAX_COLLECTED_ERRORS {
            self.errors.push(error);
        } else {
            self.dropped += 1;
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<PipelineError>, u64) {
        (self.errors, self.dropped)
    }
}

/// Outcome of the producer for a single run.
#[derive(Debug, Clone, Default)]
pub struct ProducerReport {
    /// Records accepted by a receiver.
    pub processed: u64,
    /// Rows that could not be parsed into a record.
    pub failed: u64,
    /// Time spent reading and handing off records.
    pub duration: Duration,
    /// Parse and I/O errors hit while reading.
    pub errors: Vec<PipelineError>,
    /// Errors counted but not kept, see [`MAX_COLLECTED_ERRORS`].
    pub dropped_errors: u64,
}

impl ProducerReport {
    pub(crate) fn with_errors(mut self, log: ErrorLog) -> Self {
        let (errors, dropped) = log.into_parts();
        self.errors = errors;
        self.dropped_errors = dropped;
        self
    }
}

/// Outcome of one receiver for a single run.
#[derive(Debug, Clone)]
pub struct WorkerReport<E> {
    pub worker_id: WorkerId,
    /// Records taken from the record channel, drained ones included.
    pub received: u64,
    /// Records that failed decoding.
    pub skipped: u64,
    /// Records taken after the completion signal fired.
    pub drained: u64,
    /// Entities that satisfied the predicate.
    pub matches: Vec<E>,
    pub errors: Vec<PipelineError>,
    pub dropped_errors: u64,
}

impl<E> WorkerReport<E> {
    pub(crate) fn new(worker_id: WorkerId) -> Self {
        Self {
            worker_id,
            received: 0,
            skipped: 0,
            drained: 0,
            matches: Vec::new(),
            errors: Vec::new(),
            dropped_errors: 0,
        }
    }

    pub(crate) fn with_errors(mut self, log: ErrorLog) -> Self {
        let (errors, dropped) = log.into_parts();
        self.errors = errors;
        self.dropped_errors = dropped;
        self
    }
}

/// Aggregated outcome of a pipeline run.
///
/// `processed` counts records a receiver actually accepted, so the sum of all receivers'
/// `received` counters always equals it.
#[derive(Debug, Clone)]
pub struct RunStatistics<E> {
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    /// Wall-clock duration of the whole run.
    pub duration: Duration,
    /// Time the producer spent reading, a subset of `duration`.
    pub read_duration: Duration,
    /// Cause the completion signal fired with, set once the run returned.
    ///
    /// When the producer panicked before firing, the coordinator fires
    /// [`CompletionCause::Cancelled`] on its behalf.
    pub completion: Option<CompletionCause>,
    pub matches: Vec<E>,
    /// Per receiver reports, ordered by worker id.
    pub workers: Vec<WorkerReport<E>>,
    /// Record level and task errors, producer first.
    pub errors: Vec<PipelineError>,
    pub dropped_errors: u64,
}

impl<E: Clone> RunStatistics<E> {
    pub(crate) fn new() -> Self {
        Self {
            processed: 0,
            failed: 0,
            skipped: 0,
            duration: Duration::ZERO,
            read_duration: Duration::ZERO,
            completion: None,
            matches: Vec::new(),
            workers: Vec::new(),
            errors: Vec::new(),
            dropped_errors: 0,
        }
    }

    pub(crate) fn absorb_producer(&mut self, report: ProducerReport) {
        self.processed = report.processed;
        self.failed = report.failed;
        self.read_duration = report.duration;
        self.dropped_errors += report.dropped_errors;

        // Producer errors come first since they precede every decode error in source order.
        let mut errors = report.errors;
        errors.append(&mut self.errors);
        self.errors = errors;
    }

    pub(crate) fn absorb_worker(&mut self, report: WorkerReport<E>) {
        self.skipped += report.skipped;
        self.dropped_errors += report.dropped_errors;
        self.errors.extend(report.errors.iter().cloned());
        self.matches.extend(report.matches.iter().cloned());

        let position = self
            .workers
            .partition_point(|worker| worker.worker_id < report.worker_id);
        self.workers.insert(position, report);
    }

    /// Returns the number of records taken by all receivers.
    pub fn received(&self) -> u64 {
        self.workers.iter().map(|worker| worker.received).sum()
    }

    /// Returns the first entity that satisfied the predicate, if any.
    pub fn first_match(&self) -> Option<&E> {
        self.matches.first()
    }

    /// Returns `true` when the run stopped because of the deadline or caller cancellation.
    pub fn timed_out(&self) -> bool {
        matches!(
            self.completion,
            Some(CompletionCause::DeadlineExceeded | CompletionCause::Cancelled)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::pipeline_error;

    #[test]
    fn worker_reports_are_ordered_by_id() {
        let mut stats = RunStatistics::<u32>::new();
        for worker_id in [3, 1, 2] {
            let mut report = WorkerReport::new(worker_id);
            report.received = worker_id as u64;
            report.matches.push(worker_id as u32);
            stats.absorb_worker(report);
        }

        let ids: Vec<_> = stats.workers.iter().map(|w| w.worker_id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(stats.received(), 6);
        assert_eq!(stats.first_match(), Some(&3));
    }

    #[test]
    fn producer_errors_precede_worker_errors() {
        let mut stats = RunStatistics::<u32>::new();
        let mut worker = WorkerReport::new(1);
        worker.errors.push(pipeline_error!(
            ErrorKind::RequiredFieldMissing,
            "Required field is empty"
        ));
        stats.absorb_worker(worker);

        let mut log = ErrorLog::default();
        log.push(pipeline_error!(
            ErrorKind::MalformedRecord,
            "Row could not be parsed"
        ));
        stats.absorb_producer(ProducerReport::default().with_errors(log));

        let kinds: Vec<_> = stats.errors.iter().map(|e| e.kind()).collect();
        assert_eq!(
            kinds,
            vec![ErrorKind::MalformedRecord, ErrorKind::RequiredFieldMissing]
        );
    }

    #[test]
    fn error_log_is_bounded() {
        let mut log = ErrorLog::default();
        for _ in 0..MAX_COLLECTED_ERRORS + 5 {
            log.push(pipeline_error!(
                ErrorKind::MalformedRecord,
                "Row could not be parsed"
            ));
        }

        let (errors, dropped) = log.into_parts();
        assert_eq!(errors.len(), MAX_COLLECTED_ERRORS);
        assert_eq!(dropped, 5);
    }
}
