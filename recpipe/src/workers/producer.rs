use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use metrics::counter;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info, warn};

use crate::concurrency::handoff::{RecordSender, SendOutcome};
use crate::concurrency::scope::RunScope;
use crate::concurrency::signal::{CompletionCause, CompletionRx, CompletionTx};
use crate::error::{ErrorKind, PipelineResult};
use crate::metrics::{RECPIPE_RECORDS_FAILED_TOTAL, RECPIPE_RECORDS_PROCESSED_TOTAL};
use crate::pipeline_error;
use crate::source::RecordSource;
use crate::types::{ErrorLog, ProducerReport, Record};
use crate::workers::base::{WorkerHandle, WorkerType};

/// Counters of a producer, published as it goes so they outlive a panicking read loop.
#[derive(Debug, Default)]
pub struct ProducerProgress {
    processed: AtomicU64,
    failed: AtomicU64,
}

impl ProducerProgress {
    /// Records accepted by a receiver so far.
    pub fn processed(&self) -> u64 {
        self.processed.load(Ordering::Acquire)
    }

    /// Rows that could not be parsed so far.
    pub fn failed(&self) -> u64 {
        self.failed.load(Ordering::Acquire)
    }

    /// Returns a report holding the counts published so far, without errors or duration.
    pub fn snapshot(&self) -> ProducerReport {
        ProducerReport {
            processed: self.processed(),
            failed: self.failed(),
            ..ProducerReport::default()
        }
    }
}

/// Handle of a spawned [`Producer`].
#[derive(Debug)]
pub struct ProducerHandle {
    handle: JoinHandle<ProducerReport>,
    progress: Arc<ProducerProgress>,
}

impl ProducerHandle {
    /// Returns the live counters of the producer.
    pub fn progress(&self) -> Arc<ProducerProgress> {
        self.progress.clone()
    }
}

impl WorkerHandle<ProducerReport> for ProducerHandle {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Producer
    }

    async fn wait(self) -> PipelineResult<ProducerReport> {
        self.handle.await.map_err(|err| {
            if err.is_cancelled() {
                pipeline_error!(
                    ErrorKind::InvalidState,
                    "Producer was cancelled",
                    source: err
                )
            } else {
                pipeline_error!(ErrorKind::ProducerPanic, "Producer panicked", source: err)
            }
        })
    }
}

/// Reads records from a source and hands each one off to a receiver.
///
/// The producer is the only sender on the record channel. Before every read it checks the
/// completion signal and the run scope, and every handoff is abandoned as soon as either of
/// them fires. On exit it fires the completion signal, then closes the channel, whatever
/// made it stop.
#[derive(Debug)]
pub struct Producer<S> {
    source: S,
    records: RecordSender<Record>,
    completion_tx: CompletionTx,
    completion_rx: CompletionRx,
    scope: RunScope,
    progress: Arc<ProducerProgress>,
}

impl<S> Producer<S>
where
    S: RecordSource,
{
    pub fn new(
        source: S,
        records: RecordSender<Record>,
        completion_tx: CompletionTx,
        scope: RunScope,
    ) -> Self {
        let completion_rx = completion_tx.subscribe();

        Self {
            source,
            records,
            completion_tx,
            completion_rx,
            scope,
            progress: Arc::new(ProducerProgress::default()),
        }
    }

    /// Spawns the producer on the current runtime.
    pub fn spawn(self) -> ProducerHandle {
        let span = tracing::info_span!("producer");
        let progress = self.progress.clone();
        let handle = tokio::spawn(self.read().instrument(span));

        ProducerHandle { handle, progress }
    }

    /// Runs the read loop to completion.
    pub async fn read(self) -> ProducerReport {
        let Producer {
            mut source,
            records,
            completion_tx,
            mut completion_rx,
            scope,
            progress,
        } = self;

        let started = Instant::now();
        let mut report = ProducerReport::default();
        let mut errors = ErrorLog::default();

        let cause = loop {
            if let Some(cause) = completion_rx.cause().or_else(|| scope.check()) {
                break cause;
            }

            let record = match source.next_record() {
                Ok(Some(record)) => record,
                Ok(None) => break CompletionCause::EndOfStream,
                Err(err) if err.kind() == ErrorKind::SourceIoError => {
                    warn!(error = %err.description(), "source stream failed, stopping");
                    errors.push(err);
                    break CompletionCause::SourceFailed;
                }
                Err(err) => {
                    debug!(error = %err.description(), detail = ?err.detail(), "failed to read row");
                    report.failed += 1;
                    progress.failed.fetch_add(1, Ordering::Release);
                    errors.push(err);
                    continue;
                }
            };

            let interrupt = async {
                tokio::select! {
                    _ = completion_rx.fired() => {}
                    _ = scope.expired() => {}
                }
            };

            match records.send_until(record, interrupt).await {
                SendOutcome::Delivered => {
                    report.processed += 1;
                    progress.processed.fetch_add(1, Ordering::Release);
                }
                // The next iteration picks up whatever interrupted the send.
                SendOutcome::Interrupted => continue,
                SendOutcome::Closed => {
                    warn!("every receiver exited before the end of the run");
                    break CompletionCause::Cancelled;
                }
            }
        };

        if completion_tx.fire(cause) {
            info!(%cause, "producer completed the run");
        }
        records.close();
        drop(source);

        report.duration = started.elapsed();

        counter!(RECPIPE_RECORDS_PROCESSED_TOTAL).increment(report.processed);
        counter!(RECPIPE_RECORDS_FAILED_TOTAL).increment(report.failed);

        info!(
            processed = report.processed,
            failed = report.failed,
            duration_ms = report.duration.as_millis() as u64,
            "producer finished"
        );

        report.with_errors(errors)
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use recpipe_config::shared::DrainPolicy;
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::concurrency::handoff::create_record_channel;
    use crate::concurrency::signal::create_completion_signal;
    use crate::source::MemorySource;

    fn rows(count: usize) -> Vec<Vec<String>> {
        (0..count).map(|i| vec![i.to_string()]).collect()
    }

    #[tokio::test]
    async fn hands_off_every_row_then_closes() {
        let (records_tx, records_rx) = create_record_channel(DrainPolicy::Discard);
        let (completion_tx, _) = create_completion_signal();
        let scope = RunScope::new(&CancellationToken::new(), Duration::from_secs(60));

        let producer = Producer::new(
            MemorySource::from_rows(rows(5)),
            records_tx,
            completion_tx.clone(),
            scope,
        )
        .spawn();

        let mut received = Vec::new();
        while let Some(record) = records_rx.recv().await {
            received.push(record.line());
        }

        let report = producer.wait().await.unwrap();
        assert_eq!(report.processed, 5);
        assert_eq!(received, vec![1, 2, 3, 4, 5]);
        assert_eq!(completion_tx.cause(), Some(CompletionCause::EndOfStream));
    }

    #[tokio::test]
    async fn stops_when_signal_fires_during_handoff() {
        let (records_tx, records_rx) = create_record_channel(DrainPolicy::Discard);
        let (completion_tx, _) = create_completion_signal();
        let scope = RunScope::new(&CancellationToken::new(), Duration::from_secs(60));

        let producer = Producer::new(
            MemorySource::from_rows(rows(100)),
            records_tx,
            completion_tx.clone(),
            scope,
        )
        .spawn();

        assert!(records_rx.recv().await.is_some());
        completion_tx.fire(CompletionCause::MatchFound { worker_id: 1 });

        let report = producer.wait().await.unwrap();
        assert_eq!(report.processed, 1);
        assert_eq!(records_rx.recv().await, None);
        assert_eq!(
            completion_tx.cause(),
            Some(CompletionCause::MatchFound { worker_id: 1 })
        );
    }

    #[tokio::test]
    async fn read_failures_stop_the_run() {
        let (records_tx, records_rx) = create_record_channel::<Record>(DrainPolicy::Discard);
        let (completion_tx, _) = create_completion_signal();
        let scope = RunScope::new(&CancellationToken::new(), Duration::from_secs(60));

        let source = MemorySource::new(
            std::iter::repeat_with(|| {
                Err(pipeline_error!(
                    ErrorKind::SourceIoError,
                    "Source stream read failed"
                ))
            })
            .take(1_000_000),
        );
        let producer = Producer::new(source, records_tx, completion_tx.clone(), scope).spawn();

        let report = producer.wait().await.unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(report.failed, 0);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(completion_tx.cause(), Some(CompletionCause::SourceFailed));
        assert_eq!(records_rx.recv().await, None);
    }

    struct PanicAfter {
        inner: MemorySource<std::vec::IntoIter<PipelineResult<Vec<String>>>>,
        remaining: usize,
    }

    impl RecordSource for PanicAfter {
        fn next_record(&mut self) -> PipelineResult<Option<Record>> {
            if self.remaining == 0 {
                panic!("source broke mid-stream");
            }
            self.remaining -= 1;
            self.inner.next_record()
        }
    }

    #[tokio::test]
    async fn progress_survives_a_panicking_source() {
        let (records_tx, records_rx) = create_record_channel(DrainPolicy::Discard);
        let (completion_tx, _) = create_completion_signal();
        let scope = RunScope::new(&CancellationToken::new(), Duration::from_secs(60));

        let source = PanicAfter {
            inner: MemorySource::from_rows(rows(10)),
            remaining: 4,
        };
        let producer = Producer::new(source, records_tx, completion_tx, scope).spawn();
        let progress = producer.progress();

        let mut received = 0;
        while records_rx.recv().await.is_some() {
            received += 1;
        }

        let err = producer.wait().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProducerPanic);
        assert_eq!(received, 4);
        assert_eq!(progress.processed(), 4);
        assert_eq!(progress.snapshot().processed, 4);
    }

    #[tokio::test]
    async fn caller_cancellation_stops_a_blocked_handoff() {
        let (records_tx, _records_rx) = create_record_channel::<Record>(DrainPolicy::Discard);
        let (completion_tx, _) = create_completion_signal();
        let parent = CancellationToken::new();
        let scope = RunScope::new(&parent, Duration::from_secs(60));

        let producer = Producer::new(
            MemorySource::from_rows(rows(3)),
            records_tx,
            completion_tx.clone(),
            scope,
        )
        .spawn();

        tokio::time::sleep(Duration::from_millis(10)).await;
        parent.cancel();

        let report = tokio::time::timeout(Duration::from_secs(5), producer.wait())
            .await
            .expect("producer did not observe cancellation")
            .unwrap();
        assert_eq!(report.processed, 0);
        assert_eq!(completion_tx.cause(), Some(CompletionCause::Cancelled));
    }
}
