//! Pipeline coordinator.
//!
//! [`Pipeline`] owns the lifecycle of a run: it validates the configuration, opens the source,
//! creates the completion signal and record channel, spawns the producer and the receivers,
//! waits for every participant to exit and aggregates their reports into [`RunStatistics`].

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::histogram;
use recpipe_config::shared::PipelineConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::concurrency::handoff::create_record_channel;
use crate::concurrency::scope::RunScope;
use crate::concurrency::signal::{CompletionCause, create_completion_signal};
use crate::decode::{Decoder, EntityPool, Predicate};
use crate::error::{ErrorKind, PipelineResult};
use crate::metrics::{COMPLETION_CAUSE_LABEL, RECPIPE_RUN_DURATION_SECONDS};
use crate::pipeline_error;
use crate::source::SourceOpener;
use crate::types::{Record, RunStatistics};
use crate::workers::base::{WorkerHandle, WorkerType};
use crate::workers::producer::Producer;
use crate::workers::receiver::Receiver;

/// A configured, not yet started pipeline run.
///
/// `O` opens the source, `D` decodes records into entities of type `E`, which are matched
/// against the optional predicate.
pub struct Pipeline<O, D, E> {
    config: PipelineConfig,
    opener: O,
    decoder: Arc<D>,
    predicate: Option<Arc<dyn Predicate<E>>>,
    cancellation: CancellationToken,
}

impl<O, D, E> Pipeline<O, D, E>
where
    O: SourceOpener,
    D: Decoder<E>,
    E: Clone + Default + Send + Sync + 'static,
{
    pub fn new(config: PipelineConfig, opener: O, decoder: D) -> Self {
        Self {
            config,
            opener,
            decoder: Arc::new(decoder),
            predicate: None,
            cancellation: CancellationToken::new(),
        }
    }

    /// Sets the predicate whose first match completes the run.
    pub fn with_predicate<P>(mut self, predicate: P) -> Self
    where
        P: Predicate<E>,
    {
        self.predicate = Some(Arc::new(predicate));
        self
    }

    /// Ties the run to `token`: cancelling it completes the run with
    /// [`CompletionCause::Cancelled`].
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    /// Returns the configuration of the run.
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs the pipeline to completion.
    ///
    /// Returns an error only when the configuration is invalid or the source cannot be
    /// opened. Every other failure, including a panicking participant, is reported in the
    /// returned statistics.
    pub async fn run(self) -> PipelineResult<RunStatistics<E>> {
        let Pipeline {
            config,
            opener,
            decoder,
            predicate,
            cancellation,
        } = self;

        config.validate().map_err(|err| {
            pipeline_error!(
                ErrorKind::ConfigError,
                "Invalid pipeline configuration",
                err.to_string(),
                source: err
            )
        })?;

        let started = Instant::now();
        let source = opener.open()?;

        let receivers = config.effective_receivers();
        info!(
            receivers,
            max_run_time_ms = config.max_run_time_ms,
            drain_policy = ?config.drain_policy,
            has_predicate = predicate.is_some(),
            "starting pipeline"
        );

        let scope = RunScope::new(&cancellation, config.max_run_time());
        let (completion_tx, _) = create_completion_signal();
        let (records_tx, records_rx) = create_record_channel::<Record>(config.drain_policy);
        let pool = EntityPool::new(config.entity_pool_capacity);

        let receiver_handles: Vec<_> = (1..=receivers)
            .map(|worker_id| {
                Receiver::new(
                    worker_id,
                    records_rx.clone(),
                    completion_tx.clone(),
                    scope.clone(),
                    decoder.clone(),
                    predicate.clone(),
                    pool.clone(),
                    config.drain_policy,
                )
                .spawn()
            })
            .collect();
        drop(records_rx);

        let producer_handle =
            Producer::new(source, records_tx, completion_tx.clone(), scope.clone()).spawn();

        let mut stats = RunStatistics::new();

        for handle in receiver_handles {
            let worker_type = handle.worker_type();
            match handle.wait().await {
                Ok(report) => stats.absorb_worker(report),
                Err(err) => {
                    error!(?worker_type, error = %err.description(), "participant failed");
                    stats.errors.push(err);
                }
            }
        }

        let producer_progress = producer_handle.progress();
        match producer_handle.wait().await {
            Ok(report) => stats.absorb_producer(report),
            Err(err) => {
                error!(worker_type = ?WorkerType::Producer, error = %err.description(), "participant failed");
                // Counts published before the failure still match what the receivers saw.
                stats.absorb_producer(producer_progress.snapshot());
                stats.errors.push(err);
            }
        }

        // A producer that panicked never fired the signal, which still has to happen once.
        if completion_tx.fire(CompletionCause::Cancelled) {
            error!("run ended without a completion cause");
        }
        scope.cancel();

        stats.completion = completion_tx.cause();
        stats.duration = started.elapsed();

        let cause = stats.completion.map(|c| c.as_str()).unwrap_or("none");
        histogram!(RECPIPE_RUN_DURATION_SECONDS, COMPLETION_CAUSE_LABEL => cause)
            .record(stats.duration.as_secs_f64());

        info!(
            processed = stats.processed,
            failed = stats.failed,
            skipped = stats.skipped,
            matches = stats.matches.len(),
            completion = cause,
            duration_ms = stats.duration.as_millis() as u64,
            "pipeline completed"
        );

        Ok(stats)
    }
}

/// Runs a pipeline with default settings apart from the receiver count and run time.
///
/// Non-positive receiver counts are normalized to a single receiver.
pub async fn run<O, D, E, P>(
    opener: O,
    decoder: D,
    receivers: i64,
    max_run_time: Duration,
    predicate: Option<P>,
) -> PipelineResult<RunStatistics<E>>
where
    O: SourceOpener,
    D: Decoder<E>,
    E: Clone + Default + Send + Sync + 'static,
    P: Predicate<E>,
{
    let config = PipelineConfig {
        receivers: PipelineConfig::normalize_receivers(receivers),
        max_run_time_ms: u64::try_from(max_run_time.as_millis()).unwrap_or(u64::MAX),
        ..PipelineConfig::default()
    };

    let mut pipeline = Pipeline::new(config, opener, decoder);
    if let Some(predicate) = predicate {
        pipeline = pipeline.with_predicate(predicate);
    }

    pipeline.run().await
}

#[cfg(test)]
mod tests {
    use recpipe_config::shared::DrainPolicy;

    use super::*;
    use crate::schema::{Title, primary_title_equals};
    use crate::source::{MemorySource, RecordSource};

    fn title_row(index: usize) -> Vec<String> {
        vec![
            format!("tt{index:07}"),
            "movie".to_string(),
            format!("Title {index}"),
            format!("Title {index}"),
            "0".to_string(),
            "1999".to_string(),
            "\\N".to_string(),
            "90".to_string(),
            "Drama".to_string(),
        ]
    }

    type Rows = std::vec::IntoIter<PipelineResult<Vec<String>>>;

    fn opener(count: usize) -> impl Fn() -> PipelineResult<MemorySource<Rows>> {
        move || Ok(MemorySource::from_rows((1..=count).map(title_row).collect()))
    }

    #[tokio::test]
    async fn invalid_config_is_fatal() {
        let config = PipelineConfig {
            max_run_time_ms: 0,
            ..PipelineConfig::default()
        };

        let err = Pipeline::new(config, opener(1), Title::mapping())
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigError);
    }

    #[tokio::test]
    async fn open_failure_is_fatal() {
        let opener = || -> PipelineResult<MemorySource<Rows>> {
            Err(pipeline_error!(
                ErrorKind::SourceOpenFailed,
                "Source file could not be opened"
            ))
        };

        let err = Pipeline::new(PipelineConfig::default(), opener, Title::mapping())
            .run()
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::SourceOpenFailed);
    }

    #[tokio::test]
    async fn counts_every_record_without_predicate() {
        let stats = Pipeline::new(PipelineConfig::default(), opener(25), Title::mapping())
            .run()
            .await
            .unwrap();

        assert_eq!(stats.processed, 25);
        assert_eq!(stats.received(), 25);
        assert_eq!(stats.completion, Some(CompletionCause::EndOfStream));
        assert!(stats.errors.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn first_match_completes_the_run() {
        let config = PipelineConfig {
            receivers: 3,
            drain_policy: DrainPolicy::Discard,
            ..PipelineConfig::default()
        };

        let stats = Pipeline::new(config, opener(1_000), Title::mapping())
            .with_predicate(primary_title_equals("Title 10"))
            .run()
            .await
            .unwrap();

        assert_eq!(stats.matches.len(), 1);
        assert_eq!(stats.matches[0].primary_title, "Title 10");
        assert!(stats.processed < 1_000);
        assert!(matches!(
            stats.completion,
            Some(CompletionCause::MatchFound { .. })
        ));
        assert_eq!(stats.workers.len(), 3);
    }

    #[tokio::test]
    async fn free_function_normalizes_receivers() {
        let stats = run(
            opener(5),
            Title::mapping(),
            -2,
            Duration::from_secs(5),
            None::<fn(&Title) -> bool>,
        )
        .await
        .unwrap();

        assert_eq!(stats.workers.len(), 1);
        assert_eq!(stats.processed, 5);
    }

    #[tokio::test]
    async fn cancelled_token_completes_the_run_early() {
        let token = CancellationToken::new();
        token.cancel();

        let stats = Pipeline::new(PipelineConfig::default(), opener(100), Title::mapping())
            .with_cancellation(token)
            .run()
            .await
            .unwrap();

        assert_eq!(stats.completion, Some(CompletionCause::Cancelled));
        assert!(stats.timed_out());
        assert_eq!(stats.processed, 0);
    }

    struct BreaksAtLine {
        rows: MemorySource<Rows>,
        line: u64,
    }

    impl RecordSource for BreaksAtLine {
        fn next_record(&mut self) -> PipelineResult<Option<Record>> {
            let record = self.rows.next_record()?;
            if record.as_ref().is_some_and(|record| record.line() == self.line) {
                panic!("source broke at line {}", self.line);
            }
            Ok(record)
        }
    }

    #[tokio::test]
    async fn producer_panic_keeps_counts_consistent() {
        let opener = || -> PipelineResult<BreaksAtLine> {
            Ok(BreaksAtLine {
                rows: MemorySource::from_rows((1..=10).map(title_row).collect()),
                line: 5,
            })
        };
        let config = PipelineConfig {
            receivers: 2,
            ..PipelineConfig::default()
        };

        let stats = Pipeline::new(config, opener, Title::mapping())
            .run()
            .await
            .unwrap();

        assert_eq!(stats.processed, 4);
        assert_eq!(stats.received(), stats.processed);
        assert_eq!(stats.completion, Some(CompletionCause::Cancelled));
        assert_eq!(
            stats.errors.iter().map(|err| err.kind()).collect::<Vec<_>>(),
            vec![ErrorKind::ProducerPanic]
        );
    }
}
