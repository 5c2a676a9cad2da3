use std::sync::Arc;

use metrics::counter;
use recpipe_config::shared::DrainPolicy;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, info};

use crate::concurrency::handoff::RecordReceiver;
use crate::concurrency::scope::RunScope;
use crate::concurrency::signal::{CompletionCause, CompletionRx, CompletionTx};
use crate::decode::{Decoder, EntityPool, Predicate};
use crate::error::{ErrorKind, PipelineResult};
use crate::metrics::{
    RECPIPE_MATCHES_TOTAL, RECPIPE_RECORDS_SKIPPED_TOTAL, WORKER_ID_LABEL,
};
use crate::pipeline_error;
use crate::types::{ErrorLog, Record, WorkerId, WorkerReport};
use crate::workers::base::{WorkerHandle, WorkerType};

/// Handle of a spawned [`Receiver`].
#[derive(Debug)]
pub struct ReceiverHandle<E> {
    worker_id: WorkerId,
    handle: JoinHandle<WorkerReport<E>>,
}

impl<E: Send + 'static> WorkerHandle<WorkerReport<E>> for ReceiverHandle<E> {
    fn worker_type(&self) -> WorkerType {
        WorkerType::Receiver {
            worker_id: self.worker_id,
        }
    }

    async fn wait(self) -> PipelineResult<WorkerReport<E>> {
        let worker_id = self.worker_id;

        self.handle.await.map_err(|err| {
            if err.is_cancelled() {
                pipeline_error!(
                    ErrorKind::InvalidState,
                    "Receiver was cancelled",
                    format!("receiver #{worker_id}"),
                    source: err
                )
            } else {
                pipeline_error!(
                    ErrorKind::WorkerPanic,
                    "Receiver panicked",
                    format!("receiver #{worker_id}"),
                    source: err
                )
            }
        })
    }
}

/// What woke a receiver up.
enum Wake {
    Completed,
    Expired(CompletionCause),
    Record(Option<Record>),
}

/// Whether a receiver keeps consuming after handling a record.
#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Stop,
}

/// Consumes records from the shared record channel, decodes them and evaluates the predicate.
///
/// A receiver stops when the completion signal fires, when the run scope expires, when the
/// channel is closed and empty, or right after it found a match. Decode failures are counted
/// as skipped records and never stop the receiver.
pub struct Receiver<E, D> {
    worker_id: WorkerId,
    records: RecordReceiver<Record>,
    completion_tx: CompletionTx,
    completion_rx: CompletionRx,
    scope: RunScope,
    decoder: Arc<D>,
    predicate: Option<Arc<dyn Predicate<E>>>,
    pool: EntityPool<E>,
    drain_policy: DrainPolicy,
}

impl<E, D> Receiver<E, D>
where
    E: Clone + Default + Send + Sync + 'static,
    D: Decoder<E>,
{
    #[expect(clippy::too_many_arguments)]
    pub fn new(
        worker_id: WorkerId,
        records: RecordReceiver<Record>,
        completion_tx: CompletionTx,
        scope: RunScope,
        decoder: Arc<D>,
        predicate: Option<Arc<dyn Predicate<E>>>,
        pool: EntityPool<E>,
        drain_policy: DrainPolicy,
    ) -> Self {
        let completion_rx = completion_tx.subscribe();

        Self {
            worker_id,
            records,
            completion_tx,
            completion_rx,
            scope,
            decoder,
            predicate,
            pool,
            drain_policy,
        }
    }

    /// Spawns the receiver on the current runtime.
    pub fn spawn(self) -> ReceiverHandle<E> {
        let worker_id = self.worker_id;
        let span = tracing::info_span!("receiver", worker_id);
        let handle = tokio::spawn(self.receive().instrument(span));

        ReceiverHandle { worker_id, handle }
    }

    /// Runs the receive loop to completion.
    pub async fn receive(mut self) -> WorkerReport<E> {
        let mut report = WorkerReport::new(self.worker_id);
        let mut errors = ErrorLog::default();

        loop {
            let wake = tokio::select! {
                _ = self.completion_rx.fired() => Wake::Completed,
                cause = self.scope.expired() => Wake::Expired(cause),
                record = self.records.recv() => Wake::Record(record),
            };

            match wake {
                Wake::Completed => break,
                Wake::Expired(cause) => {
                    self.completion_tx.fire(cause);
                    break;
                }
                Wake::Record(None) => break,
                Wake::Record(Some(record)) => {
                    if self.handle(record, &mut report, &mut errors, true) == Flow::Stop {
                        break;
                    }
                }
            }
        }

        if self.drain_policy == DrainPolicy::Drain {
            while let Some(record) = self.records.recv().await {
                report.drained += 1;
                self.handle(record, &mut report, &mut errors, false);
            }
        }

        let worker_label = self.worker_id.to_string();
        counter!(RECPIPE_RECORDS_SKIPPED_TOTAL, WORKER_ID_LABEL => worker_label.clone())
            .increment(report.skipped);
        counter!(RECPIPE_MATCHES_TOTAL, WORKER_ID_LABEL => worker_label)
            .increment(report.matches.len() as u64);

        info!(
            received = report.received,
            skipped = report.skipped,
            drained = report.drained,
            matches = report.matches.len(),
            "receiver finished"
        );

        report.with_errors(errors)
    }

    fn handle(
        &self,
        record: Record,
        report: &mut WorkerReport<E>,
        errors: &mut ErrorLog,
        may_complete: bool,
    ) -> Flow {
        report.received += 1;

        let mut entity = self.pool.acquire();
        if let Err(err) = self.decoder.decode(&record, &mut entity) {
            debug!(
                line = record.line(),
                error = %err.description(),
                detail = ?err.detail(),
                "skipping record"
            );
            report.skipped += 1;
            errors.push(err);
            return Flow::Continue;
        }

        let Some(predicate) = &self.predicate else {
            return Flow::Continue;
        };

        if !predicate.matches(&entity) {
            return Flow::Continue;
        }

        report.matches.push(E::clone(&entity));
        if !may_complete {
            return Flow::Continue;
        }

        let cause = CompletionCause::MatchFound {
            worker_id: self.worker_id,
        };
        if self.completion_tx.fire(cause) {
            info!(line = record.line(), "match found, completing the run");
        }

        Flow::Stop
    }
}
