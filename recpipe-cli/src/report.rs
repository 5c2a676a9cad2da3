//! Sinks consuming the statistics of a finished run.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use recpipe::types::RunStatistics;
use serde::Serialize;
use tracing::info;

use crate::error::CliError;

/// Summary of a run, rendered by every sink.
#[derive(Debug, Serialize)]
pub struct RunReport<'a, E> {
    pub file_name: String,
    #[serde(skip)]
    pub entity_name: &'static str,
    pub completed_at: String,
    pub completion: &'static str,
    pub processed: u64,
    pub failed: u64,
    pub skipped: u64,
    pub duration_secs: f64,
    pub workers: Vec<WorkerSummary>,
    pub matches: &'a [E],
    pub errors: Vec<String>,
    pub dropped_errors: u64,
}

#[derive(Debug, Serialize)]
pub struct WorkerSummary {
    pub worker_id: usize,
    pub received: u64,
    pub skipped: u64,
    pub drained: u64,
}

impl<'a, E> RunReport<'a, E> {
    pub fn new(
        source: &Path,
        entity_name: &'static str,
        completed_at: DateTime<Utc>,
        stats: &'a RunStatistics<E>,
    ) -> Self {
        let file_name = source
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| source.display().to_string());

        Self {
            file_name,
            entity_name,
            completed_at: completed_at.to_rfc3339_opts(SecondsFormat::Secs, true),
            completion: stats.completion.map(|cause| cause.as_str()).unwrap_or("none"),
            processed: stats.processed,
            failed: stats.failed,
            skipped: stats.skipped,
            duration_secs: stats.duration.as_secs_f64(),
            workers: stats
                .workers
                .iter()
                .map(|worker| WorkerSummary {
                    worker_id: worker.worker_id,
                    received: worker.received,
                    skipped: worker.skipped,
                    drained: worker.drained,
                })
                .collect(),
            matches: &stats.matches,
            errors: stats
                .errors
                .iter()
                .map(|err| match err.detail() {
                    Some(detail) => format!("{}: {detail}", err.description()),
                    None => err.description().to_string(),
                })
                .collect(),
            dropped_errors: stats.dropped_errors,
        }
    }
}

/// Consumer of a finished run's report.
pub trait StatisticsSink {
    fn write<E>(&self, report: &RunReport<'_, E>) -> Result<(), CliError>
    where
        E: Serialize + std::fmt::Debug;
}

/// Prints a human readable summary on stdout.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    fn render<E: std::fmt::Debug>(report: &RunReport<'_, E>) -> String {
        let mut out = String::new();

        for worker in &report.workers {
            let _ = writeln!(
                out,
                "Receiver # {} Received {} {}",
                worker.worker_id, worker.received, report.entity_name
            );
        }
        for found in report.matches {
            let _ = writeln!(out, "Found {found:?}");
        }

        let _ = writeln!(out, "Total Read: {}", report.processed);
        let _ = writeln!(out, "Total Failed: {}", report.failed);
        let _ = writeln!(out, "Total Skipped: {}", report.skipped);
        let _ = writeln!(out, "Completion: {}", report.completion);
        let _ = writeln!(out, "Duration: {:.2}s", report.duration_secs);

        out
    }
}

impl StatisticsSink for StdoutSink {
    fn write<E>(&self, report: &RunReport<'_, E>) -> Result<(), CliError>
    where
        E: Serialize + std::fmt::Debug,
    {
        print!("{}", Self::render(report));
        Ok(())
    }
}

/// Writes the report as JSON to `<dir>/<file name>_<completion time>.json`.
#[derive(Debug)]
pub struct JsonReportSink {
    directory: PathBuf,
}

impl JsonReportSink {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    fn path_for<E>(&self, report: &RunReport<'_, E>) -> PathBuf {
        self.directory
            .join(format!("{}_{}.json", report.file_name, report.completed_at))
    }
}

impl StatisticsSink for JsonReportSink {
    fn write<E>(&self, report: &RunReport<'_, E>) -> Result<(), CliError>
    where
        E: Serialize + std::fmt::Debug,
    {
        let path = self.path_for(report);
        let json = serde_json::to_vec_pretty(report)?;

        fs::create_dir_all(&self.directory)
            .and_then(|()| fs::write(&path, json))
            .map_err(|source| CliError::Report {
                path: path.clone(),
                source,
            })?;

        info!(path = %path.display(), "report written");

        Ok(())
    }
}
