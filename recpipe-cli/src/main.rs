//! `recpipe` command line tool.
//!
//! Scans a delimited file with a pool of concurrent receivers and prints a summary of the run.
//! Settings come from `configuration/` when that directory exists, overridden by the command
//! line flags.

use clap::{CommandFactory, Parser};
use recpipe_telemetry::tracing::init_tracing;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::args::Args;

mod args;
mod error;
mod report;
mod run;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Invoked without any flag, the tool only explains itself.
    if std::env::args_os().len() <= 1 {
        Args::command().print_help()?;
        println!();
        return Ok(());
    }

    let args = Args::parse();
    let _log_flusher = init_tracing(env!("CARGO_BIN_NAME"))?;

    let cancellation = CancellationToken::new();
    tokio::spawn({
        let cancellation = cancellation.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("received ctrl-c, cancelling the run");
                cancellation.cancel();
            }
        }
    });

    if let Err(err) = run::run(args, cancellation).await {
        error!(error = %err, "run failed");
        return Err(err.into());
    }

    Ok(())
}
