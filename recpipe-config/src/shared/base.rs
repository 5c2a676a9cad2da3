use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The maximum run time cannot be zero.
    #[error("`max_run_time_ms` cannot be zero")]
    MaxRunTimeZero,
    /// The entity pool needs room for at least one entity.
    #[error("`entity_pool_capacity` cannot be zero")]
    EntityPoolCapacityZero,
    /// The source path is empty.
    #[error("`source.path` must be set")]
    MissingSourcePath,
    /// A field holds a value outside of its accepted range.
    #[error("invalid value for `{field}`: {constraint}")]
    InvalidFieldValue { field: String, constraint: String },
}
