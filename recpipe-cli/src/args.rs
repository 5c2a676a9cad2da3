use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use recpipe::schema::Sale;
use recpipe_config::shared::{AppConfig, DrainPolicy, FilterConfig, PipelineConfig, SourceConfig};

use crate::error::CliError;

/// Record schema of the scanned file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Schema {
    /// IMDb `title.basics` dump, tab separated.
    Title,
    /// Sales export, comma separated.
    Sale,
}

impl Schema {
    /// Noun used when reporting per receiver counts.
    pub fn entity_name(&self) -> &'static str {
        match self {
            Schema::Title => "titles",
            Schema::Sale => "sales",
        }
    }

    fn default_delimiter(&self) -> char {
        match self {
            Schema::Title => SourceConfig::DEFAULT_DELIMITER,
            Schema::Sale => Sale::DELIMITER,
        }
    }
}

/// Scans a delimited file with concurrent receivers, optionally stopping at the first title
/// matching a filter.
#[derive(Parser, Debug)]
#[command(name = "recpipe", version, about, long_about = None)]
pub struct Args {
    /// Path of the file to scan.
    #[arg(long)]
    pub file_path: Option<PathBuf>,

    /// Stop at the first title whose primary title equals this value.
    #[arg(long)]
    pub primary_title: Option<String>,

    /// Number of receivers. Non-positive values fall back to one.
    #[arg(long, allow_negative_numbers = true)]
    pub receivers: Option<i64>,

    /// Maximum run time in milliseconds.
    #[arg(long)]
    pub max_run_time_ms: Option<u64>,

    /// Keep processing records already handed off after the run completed.
    #[arg(long)]
    pub drain: bool,

    /// Field delimiter, defaults to the schema's delimiter.
    #[arg(long)]
    pub delimiter: Option<char>,

    /// Schema of the scanned file.
    #[arg(long, value_enum, default_value_t = Schema::Title)]
    pub schema: Schema,

    /// Directory where a JSON report of the run is written.
    #[arg(long)]
    pub report_dir: Option<PathBuf>,
}

impl Args {
    /// Applies the command line flags over `base`, or over defaults when no configuration
    /// was loaded.
    pub fn into_config(self, base: Option<AppConfig>) -> Result<AppConfig, CliError> {
        let mut config = match (base, self.file_path.as_ref()) {
            (Some(base), _) => base,
            (None, Some(path)) => AppConfig {
                source: SourceConfig::new(path),
                pipeline: PipelineConfig::default(),
                filter: FilterConfig::default(),
            },
            (None, None) => return Err(CliError::MissingFilePath),
        };

        if let Some(path) = self.file_path {
            config.source.path = path;
        }
        match self.delimiter {
            Some(delimiter) => config.source.delimiter = delimiter,
            // A delimiter set in configuration wins over the schema's one.
            None if config.source.delimiter == SourceConfig::DEFAULT_DELIMITER => {
                config.source.delimiter = self.schema.default_delimiter();
            }
            None => {}
        }
        if let Some(receivers) = self.receivers {
            config.pipeline.receivers = PipelineConfig::normalize_receivers(receivers);
        }
        if let Some(max_run_time_ms) = self.max_run_time_ms {
            config.pipeline.max_run_time_ms = max_run_time_ms;
        }
        if self.drain {
            config.pipeline.drain_policy = DrainPolicy::Drain;
        }
        if self.primary_title.is_some() {
            config.filter.primary_title = self.primary_title;
        }

        if config.source.path.as_os_str().is_empty() {
            return Err(CliError::MissingFilePath);
        }

        Ok(config)
    }
}

/// Checks that `path` names an existing regular file.
pub fn check_source_file(path: &Path) -> Result<(), CliError> {
    let metadata = match path.metadata() {
        Ok(metadata) => metadata,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(CliError::FileNotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(CliError::Inspect {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    if metadata.is_dir() {
        return Err(CliError::IsDirectory(path.to_path_buf()));
    }

    Ok(())
}
