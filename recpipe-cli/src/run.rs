use std::path::Path;

use chrono::Utc;
use recpipe::decode::Decoder;
use recpipe::pipeline::Pipeline;
use recpipe::schema::{Sale, Title, primary_title_equals};
use recpipe::source::DelimitedFileOpener;
use recpipe::types::RunStatistics;
use recpipe_config::{CONFIGURATION_DIR, load_config};
use recpipe_config::shared::AppConfig;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::args::{Args, Schema, check_source_file};
use crate::error::CliError;
use crate::report::{JsonReportSink, RunReport, StatisticsSink, StdoutSink};

/// Resolves the configuration, runs the pipeline and writes its report.
pub async fn run(args: Args, cancellation: CancellationToken) -> Result<(), CliError> {
    let schema = args.schema;
    let report_dir = args.report_dir.clone();

    let base = if Path::new(CONFIGURATION_DIR).is_dir() {
        Some(load_config::<AppConfig>()?)
    } else {
        None
    };
    let config = args.into_config(base)?;
    config.validate()?;
    check_source_file(&config.source.path)?;

    info!(
        path = %config.source.path.display(),
        ?schema,
        receivers = config.pipeline.effective_receivers(),
        max_run_time_ms = config.pipeline.max_run_time_ms,
        "scanning file"
    );

    let opener = DelimitedFileOpener::new(config.source.clone());

    match schema {
        Schema::Title => {
            let mut pipeline = Pipeline::new(config.pipeline.clone(), opener, Title::mapping())
                .with_cancellation(cancellation);
            if let Some(title) = config.filter.primary_title() {
                pipeline = pipeline.with_predicate(primary_title_equals(title));
            }

            let stats = pipeline.run().await?;
            report(&config, schema, report_dir, &stats)
        }
        Schema::Sale => {
            if config.filter.primary_title().is_some() {
                warn!("the primary title filter only applies to titles and is ignored");
            }

            let stats = run_unfiltered(&config, opener, Sale::mapping(), cancellation).await?;
            report(&config, schema, report_dir, &stats)
        }
    }
}

async fn run_unfiltered<D, E>(
    config: &AppConfig,
    opener: DelimitedFileOpener,
    decoder: D,
    cancellation: CancellationToken,
) -> Result<RunStatistics<E>, CliError>
where
    D: Decoder<E>,
    E: Clone + Default + Send + Sync + 'static,
{
    let stats = Pipeline::new(config.pipeline.clone(), opener, decoder)
        .with_cancellation(cancellation)
        .run()
        .await?;

    Ok(stats)
}

fn report<E>(
    config: &AppConfig,
    schema: Schema,
    report_dir: Option<std::path::PathBuf>,
    stats: &RunStatistics<E>,
) -> Result<(), CliError>
where
    E: Serialize + std::fmt::Debug,
{
    let report = RunReport::new(&config.source.path, schema.entity_name(), Utc::now(), stats);

    StdoutSink.write(&report)?;
    if let Some(directory) = report_dir {
        JsonReportSink::new(directory).write(&report)?;
    }

    Ok(())
}
