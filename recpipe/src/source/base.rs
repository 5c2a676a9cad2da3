use crate::error::PipelineResult;
use crate::types::Record;

/// Ordered stream of records read by the producer.
pub trait RecordSource: Send + 'static {
    /// Reads the next record.
    ///
    /// Returns `Ok(None)` at the end of the stream. Errors of a record level kind describe a
    /// single row and reading may continue afterwards, while an
    /// [`crate::error::ErrorKind::SourceIoError`] means the stream cannot make progress.
    fn next_record(&mut self) -> PipelineResult<Option<Record>>;
}

/// Opens a [`RecordSource`] for a single run.
///
/// Implemented for closures returning a source, which is convenient for in-memory inputs.
pub trait SourceOpener {
    type Source: RecordSource;

    /// Opens the source. A failure here is fatal to the run.
    fn open(&self) -> PipelineResult<Self::Source>;
}

impl<F, S> SourceOpener for F
where
    F: Fn() -> PipelineResult<S>,
    S: RecordSource,
{
    type Source = S;

    fn open(&self) -> PipelineResult<S> {
        self()
    }
}
