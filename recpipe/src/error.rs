//! Error types and result definitions for pipeline operations.
//!
//! [`PipelineError`] carries an [`ErrorKind`] classification, a static description, optional
//! dynamic detail, an optional source error, and the callsite where it was created. Multiple
//! errors, such as the ones collected from several receivers, can be aggregated into a single
//! value.

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error;
use std::fmt;
use std::panic::Location;
use std::sync::Arc;

/// Convenient result type for pipeline operations using [`PipelineError`] as the error type.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Detailed payload stored for single [`PipelineError`] instances.
#[derive(Debug, Clone)]
struct ErrorPayload {
    kind: ErrorKind,
    description: Cow<'static, str>,
    detail: Option<Cow<'static, str>>,
    source: Option<Arc<dyn error::Error + Send + Sync>>,
    location: &'static Location<'static>,
    backtrace: Arc<Backtrace>,
}

/// Main error type for pipeline operations.
#[derive(Debug, Clone)]
pub struct PipelineError {
    repr: ErrorRepr,
}

/// Internal representation of error data.
#[derive(Debug, Clone)]
enum ErrorRepr {
    /// Single error payload holding rich metadata.
    Single(ErrorPayload),
    /// Multiple aggregated errors.
    Many {
        errors: Vec<PipelineError>,
        location: &'static Location<'static>,
    },
}

/// Categories of errors that can occur while running a pipeline.
///
/// Only the source and configuration kinds are fatal to a run. Record level kinds are
/// collected into the run statistics and never stop the pipeline.
#[derive(PartialEq, Eq, Copy, Clone, Debug, Hash)]
#[non_exhaustive]
pub enum ErrorKind {
    // Source Errors
    SourceOpenFailed,
    SourceIoError,

    // Record Errors
    MalformedRecord,
    FieldCountMismatch,
    RequiredFieldMissing,
    InvalidFieldValue,

    // Configuration Errors
    ConfigError,

    // Task Errors
    ProducerPanic,
    WorkerPanic,
    InvalidState,

    // Unknown / Uncategorized
    Unknown,
}

impl ErrorKind {
    /// Returns `true` when the kind describes a problem with a single record.
    pub fn is_record_level(&self) -> bool {
        matches!(
            self,
            ErrorKind::MalformedRecord
                | ErrorKind::FieldCountMismatch
                | ErrorKind::RequiredFieldMissing
                | ErrorKind::InvalidFieldValue
        )
    }
}

impl PipelineError {
    /// Returns the [`ErrorKind`] of this error.
    ///
    /// For multiple errors, returns the kind of the first error or [`ErrorKind::Unknown`]
    /// if the error list is empty.
    pub fn kind(&self) -> ErrorKind {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.kind,
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.kind())
                .unwrap_or(ErrorKind::Unknown),
        }
    }

    /// Returns all [`ErrorKind`]s present in this error.
    pub fn kinds(&self) -> Vec<ErrorKind> {
        match self.repr {
            ErrorRepr::Single(ref payload) => vec![payload.kind],
            ErrorRepr::Many { ref errors, .. } => errors
                .iter()
                .flat_map(|err| err.kinds())
                .collect::<Vec<_>>(),
        }
    }

    /// Returns the static description of this error, or of the first aggregated one.
    pub fn description(&self) -> &str {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.description.as_ref(),
            ErrorRepr::Many { ref errors, .. } => errors
                .first()
                .map(|err| err.description())
                .unwrap_or("no errors"),
        }
    }

    /// Returns the detailed error information if available.
    ///
    /// For multiple errors, returns the detail of the first error that has one.
    pub fn detail(&self) -> Option<&str> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.detail.as_deref(),
            ErrorRepr::Many { ref errors, .. } => errors.iter().find_map(|e| e.detail()),
        }
    }

    /// Returns the captured backtrace for this error.
    pub fn backtrace(&self) -> Option<&Backtrace> {
        match self.repr {
            ErrorRepr::Single(ref payload) => Some(payload.backtrace.as_ref()),
            ErrorRepr::Many { .. } => None,
        }
    }

    /// Returns the captured callsite location for this error.
    pub fn location(&self) -> &'static Location<'static> {
        match self.repr {
            ErrorRepr::Single(ref payload) => payload.location,
            ErrorRepr::Many { location, .. } => location,
        }
    }

    /// Attaches an originating [`error::Error`] to this error and returns the modified instance.
    ///
    /// Has no effect on aggregated errors, which forward their first error as source.
    pub fn with_source<E>(mut self, source: E) -> Self
    where
        E: error::Error + Send + Sync + 'static,
    {
        if let ErrorRepr::Single(ref mut payload) = self.repr {
            payload.source = Some(Arc::new(source));
        }
        self
    }

    /// Creates a [`PipelineError`] from its components.
    #[track_caller]
    fn from_components(
        kind: ErrorKind,
        description: Cow<'static, str>,
        detail: Option<Cow<'static, str>>,
        source: Option<Arc<dyn error::Error + Send + Sync>>,
    ) -> Self {
        PipelineError {
            repr: ErrorRepr::Single(ErrorPayload {
                kind,
                description,
                detail,
                source,
                location: Location::caller(),
                backtrace: Arc::new(Backtrace::capture()),
            }),
        }
    }
}

impl PartialEq for PipelineError {
    fn eq(&self, other: &PipelineError) -> bool {
        match (&self.repr, &other.repr) {
            (ErrorRepr::Single(a), ErrorRepr::Single(b)) => a.kind == b.kind,
            (
                ErrorRepr::Many {
                    errors: errors_a, ..
                },
                ErrorRepr::Many {
                    errors: errors_b, ..
                },
            ) => errors_a == errors_b,
            _ => false,
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match &self.repr {
            ErrorRepr::Single(payload) => {
                let location = payload.location;
                write!(
                    f,
                    "[{:?}] {} @ {}:{}:{}",
                    payload.kind,
                    payload.description,
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                write_detail(payload.detail.as_deref(), f)?;
                write_backtrace(payload.backtrace.as_ref(), f)?;

                Ok(())
            }
            ErrorRepr::Many { errors, location } => {
                let count = errors.len();
                write!(
                    f,
                    "[Many] {} error{} aggregated @ {}:{}:{}",
                    count,
                    if count == 1 { "" } else { "s" },
                    location.file(),
                    location.line(),
                    location.column()
                )?;

                if errors.is_empty() {
                    write!(f, "\n  (no inner errors provided)")?;
                }

                for (index, error) in errors.iter().enumerate() {
                    let rendered = format!("{error}");
                    let mut lines = rendered.lines();
                    if let Some(first_line) = lines.next() {
                        write!(f, "\n  {}. {}", index + 1, first_line)?;
                    }

                    for line in lines {
                        write!(f, "\n     {line}")?;
                    }
                }

                Ok(())
            }
        }
    }
}

impl error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.repr {
            ErrorRepr::Single(payload) => payload
                .source
                .as_ref()
                .map(|source| source as &(dyn error::Error + 'static)),
            ErrorRepr::Many { errors, .. } => errors
                .first()
                .map(|error| error as &(dyn error::Error + 'static)),
        }
    }
}

/// Writes the captured backtrace with indentation.
fn write_backtrace(backtrace: &Backtrace, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let rendered_backtrace = format!("{backtrace}");
    if rendered_backtrace.trim().is_empty() {
        return Ok(());
    }

    write!(f, "\n  Backtrace:")?;
    for line in rendered_backtrace.lines() {
        write!(f, "\n    {line}")?;
    }

    Ok(())
}

/// Writes the detail block with indentation.
fn write_detail(detail: Option<&str>, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Some(detail) = detail else {
        return Ok(());
    };

    if detail.trim().is_empty() {
        return write!(f, "\n  Detail: <empty>");
    }

    write!(f, "\n  Detail:")?;
    for line in detail.lines() {
        write!(f, "\n    {line}")?;
    }

    Ok(())
}

/// Creates a [`PipelineError`] from an error kind and static description.
impl From<(ErrorKind, &'static str)> for PipelineError {
    #[track_caller]
    fn from((kind, desc): (ErrorKind, &'static str)) -> PipelineError {
        PipelineError::from_components(kind, Cow::Borrowed(desc), None, None)
    }
}

/// Creates a [`PipelineError`] from an error kind, static description, and dynamic detail.
impl<D> From<(ErrorKind, &'static str, D)> for PipelineError
where
    D: Into<Cow<'static, str>>,
{
    #[track_caller]
    fn from((kind, desc, detail): (ErrorKind, &'static str, D)) -> PipelineError {
        PipelineError::from_components(kind, Cow::Borrowed(desc), Some(detail.into()), None)
    }
}

/// Creates a [`PipelineError`] from a vector of errors for aggregation.
///
/// If the vector contains exactly one error, returns that error directly.
impl<E> From<Vec<E>> for PipelineError
where
    E: Into<PipelineError>,
{
    #[track_caller]
    fn from(errors: Vec<E>) -> PipelineError {
        let location = Location::caller();
        let mut errors: Vec<PipelineError> = errors.into_iter().map(Into::into).collect();

        if errors.len() == 1
            && let Some(error) = errors.pop()
        {
            return error;
        }

        PipelineError {
            repr: ErrorRepr::Many { errors, location },
        }
    }
}

/// Converts [`std::io::Error`] to [`PipelineError`] with [`ErrorKind::SourceIoError`].
impl From<std::io::Error> for PipelineError {
    #[track_caller]
    fn from(err: std::io::Error) -> PipelineError {
        let detail = err.to_string();
        PipelineError::from_components(
            ErrorKind::SourceIoError,
            Cow::Borrowed("I/O operation failed"),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

/// Converts [`csv::Error`] to [`PipelineError`].
///
/// I/O failures map to [`ErrorKind::SourceIoError`] since the stream cannot make progress,
/// while every other failure describes a single malformed row and maps to
/// [`ErrorKind::MalformedRecord`].
impl From<csv::Error> for PipelineError {
    #[track_caller]
    fn from(err: csv::Error) -> PipelineError {
        let (kind, description) = match err.kind() {
            csv::ErrorKind::Io(_) => (ErrorKind::SourceIoError, "Source stream read failed"),
            csv::ErrorKind::UnequalLengths { .. } => (
                ErrorKind::MalformedRecord,
                "Row has an unexpected number of fields",
            ),
            csv::ErrorKind::Utf8 { .. } => {
                (ErrorKind::MalformedRecord, "Row is not valid UTF-8")
            }
            _ => (ErrorKind::MalformedRecord, "Row could not be parsed"),
        };

        let detail = err.to_string();
        PipelineError::from_components(
            kind,
            Cow::Borrowed(description),
            Some(Cow::Owned(detail)),
            Some(Arc::new(err)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline_error;

    #[test]
    fn single_error_keeps_kind_and_detail() {
        let err = pipeline_error!(
            ErrorKind::RequiredFieldMissing,
            "Required field is empty",
            "field `primaryTitle` at line 4"
        );

        assert_eq!(err.kind(), ErrorKind::RequiredFieldMissing);
        assert_eq!(err.description(), "Required field is empty");
        assert_eq!(err.detail(), Some("field `primaryTitle` at line 4"));
        assert!(err.kind().is_record_level());
        assert!(err.to_string().contains("[RequiredFieldMissing]"));
    }

    #[test]
    fn aggregation_of_one_error_returns_it_unchanged() {
        let err: PipelineError =
            vec![pipeline_error!(ErrorKind::WorkerPanic, "Receiver panicked")].into();

        assert_eq!(err.kinds(), vec![ErrorKind::WorkerPanic]);
        assert!(err.backtrace().is_some());
    }

    #[test]
    fn aggregation_flattens_kinds() {
        let err: PipelineError = vec![
            pipeline_error!(ErrorKind::WorkerPanic, "Receiver panicked"),
            pipeline_error!(ErrorKind::ProducerPanic, "Producer panicked"),
        ]
        .into();

        assert_eq!(err.kind(), ErrorKind::WorkerPanic);
        assert_eq!(
            err.kinds(),
            vec![ErrorKind::WorkerPanic, ErrorKind::ProducerPanic]
        );
        assert!(err.to_string().starts_with("[Many] 2 errors aggregated"));
    }

    #[test]
    fn io_errors_are_source_errors() {
        let err: PipelineError =
            std::io::Error::new(std::io::ErrorKind::NotFound, "missing file").into();

        assert_eq!(err.kind(), ErrorKind::SourceIoError);
        assert!(error::Error::source(&err).is_some());
        assert!(!err.kind().is_record_level());
    }
}
