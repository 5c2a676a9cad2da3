//! Tracing subscriber initialization.
//!
//! Development builds log human-readable output to stdout. Production builds log JSON lines
//! to a daily-rotated file through a non-blocking writer, whose buffered lines are flushed
//! when the returned [`LogFlusher`] is dropped.

use std::sync::Once;

use recpipe_config::Environment;
use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Directory where production log files are written.
const LOGS_DIR: &str = "logs";

/// Filter directive used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "info";

static INIT_TEST_TRACING: Once = Once::new();

/// Errors raised while installing the global tracing subscriber.
#[derive(Debug, Error)]
pub enum TracingError {
    /// The runtime environment could not be determined.
    #[error("failed to determine runtime environment: {0}")]
    Environment(#[from] std::io::Error),

    /// A global subscriber was already installed or could not be installed.
    #[error("failed to install tracing subscriber: {0}")]
    Init(String),
}

/// Keeps the non-blocking log writer alive.
///
/// Dropping this value flushes pending log lines, so binaries must hold it until exit.
#[must_use = "dropping the flusher stops background log writing"]
#[derive(Debug)]
pub struct LogFlusher {
    _guard: Option<WorkerGuard>,
}

/// Initializes tracing for the binary named `app_name`.
pub fn init_tracing(app_name: &str) -> Result<LogFlusher, TracingError> {
    let environment = Environment::load()?;
    let flusher = init_tracing_for(app_name, environment)?;

    ::tracing::info!(app = app_name, environment = %environment, "tracing initialized");

    Ok(flusher)
}

fn init_tracing_for(app_name: &str, environment: Environment) -> Result<LogFlusher, TracingError> {
    let filter = env_filter();

    match environment {
        Environment::Dev => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_target(false)
                .try_init()
                .map_err(|err| TracingError::Init(err.to_string()))?;

            Ok(LogFlusher { _guard: None })
        }
        Environment::Prod => {
            let file_appender =
                tracing_appender::rolling::daily(LOGS_DIR, format!("{app_name}.log"));
            let (writer, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::fmt()
                .json()
                .with_current_span(true)
                .with_env_filter(filter)
                .with_writer(writer)
                .try_init()
                .map_err(|err| TracingError::Init(err.to_string()))?;

            Ok(LogFlusher {
                _guard: Some(guard),
            })
        }
    }
}

/// Installs a subscriber writing to the test harness output.
///
/// Safe to call from every test; only the first call installs the subscriber.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_test_writer()
            .try_init();
    });
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}
