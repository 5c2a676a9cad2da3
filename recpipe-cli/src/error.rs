use std::io;
use std::path::PathBuf;

use recpipe::error::PipelineError;
use recpipe_config::LoadConfigError;
use recpipe_config::shared::ValidationError;
use thiserror::Error;

/// Errors that stop the command line tool.
#[derive(Debug, Error)]
pub enum CliError {
    /// No source file was given on the command line or in the configuration.
    #[error("no source file given, pass `--file-path` or set `source.path` in the configuration")]
    MissingFilePath,

    #[error("source file `{0}` does not exist")]
    FileNotFound(PathBuf),

    #[error("source path `{0}` is a directory, not a file")]
    IsDirectory(PathBuf),

    #[error("failed to inspect source file `{path}`: {source}")]
    Inspect {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] LoadConfigError),

    #[error("invalid configuration: {0}")]
    Validation(#[from] ValidationError),

    #[error("pipeline failed: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("failed to write report `{path}`: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}
