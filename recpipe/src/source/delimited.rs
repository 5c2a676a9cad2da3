use std::fs::File;
use std::io;

use recpipe_config::shared::SourceConfig;
use tracing::debug;

use crate::error::{ErrorKind, PipelineResult};
use crate::pipeline_error;
use crate::source::{RecordSource, SourceOpener};
use crate::types::Record;

/// Delimited source reading from a file on disk.
pub type DelimitedFileSource = DelimitedSource<File>;

/// Opens delimited text files described by a [`SourceConfig`].
#[derive(Debug, Clone)]
pub struct DelimitedFileOpener {
    config: SourceConfig,
}

impl DelimitedFileOpener {
    pub fn new(config: SourceConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SourceConfig {
        &self.config
    }
}

impl SourceOpener for DelimitedFileOpener {
    type Source = DelimitedFileSource;

    fn open(&self) -> PipelineResult<Self::Source> {
        self.config.validate().map_err(|err| {
            pipeline_error!(
                ErrorKind::ConfigError,
                "Invalid source configuration",
                err.to_string(),
                source: err
            )
        })?;

        let path = &self.config.path;

        if path.is_dir() {
            return Err(pipeline_error!(
                ErrorKind::SourceOpenFailed,
                "Source path is a directory",
                path.display()
            ));
        }

        let file = File::open(path).map_err(|err| {
            pipeline_error!(
                ErrorKind::SourceOpenFailed,
                "Source file could not be opened",
                path.display(),
                source: err
            )
        })?;

        debug!(path = %path.display(), "opened delimited source");

        DelimitedSource::from_reader(file, &self.config)
    }
}

/// Strict delimited reader: every row must have as many fields as the first one (the header
/// when present).
///
/// Rows with a different field count or invalid UTF-8 are reported as
/// [`ErrorKind::MalformedRecord`] and skipped, and reading continues with the next row.
#[derive(Debug)]
pub struct DelimitedSource<R> {
    reader: csv::Reader<R>,
    buffer: csv::StringRecord,
}

impl<R: io::Read> DelimitedSource<R> {
    /// Wraps `reader` using the delimiter, header and quoting settings of `config`.
    ///
    /// Fails with [`ErrorKind::ConfigError`] when the delimiter is not a single ASCII byte.
    pub fn from_reader(reader: R, config: &SourceConfig) -> PipelineResult<Self> {
        let delimiter = config.delimiter_byte().map_err(|err| {
            pipeline_error!(
                ErrorKind::ConfigError,
                "Invalid source delimiter",
                err.to_string(),
                source: err
            )
        })?;

        let reader = csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(config.has_header)
            .quoting(config.quoting)
            .flexible(false)
            .from_reader(reader);

        Ok(Self {
            reader,
            buffer: csv::StringRecord::new(),
        })
    }
}

impl<R> RecordSource for DelimitedSource<R>
where
    R: io::Read + Send + 'static,
{
    fn next_record(&mut self) -> PipelineResult<Option<Record>> {
        if !self.reader.read_record(&mut self.buffer)? {
            return Ok(None);
        }

        let line = self
            .buffer
            .position()
            .map(|position| position.line())
            .unwrap_or_default();
        let fields = self.buffer.iter().map(str::to_owned).collect();

        Ok(Some(Record::new(line, fields)))
    }
}
