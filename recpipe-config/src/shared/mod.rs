//! Shared configuration types for record pipelines.

mod app;
mod base;
mod filter;
mod pipeline;
mod source;

pub use app::AppConfig;
pub use base::ValidationError;
pub use filter::FilterConfig;
pub use pipeline::{DrainPolicy, PipelineConfig};
pub use source::SourceConfig;
