//! Concurrent scanning pipeline over delimited record streams.
//!
//! A single producer reads records from a [`source::RecordSource`] and hands them one at a
//! time to a pool of receivers, which decode each record into a typed entity and evaluate an
//! optional predicate. The run ends exactly once, when the source is exhausted, a receiver finds
//! a match, the deadline elapses or the caller cancels it, and the coordinator then returns the
//! aggregated [`types::RunStatistics`].
//!
//! ```no_run
//! use recpipe::pipeline::Pipeline;
//! use recpipe::schema::{Title, primary_title_equals};
//! use recpipe::source::DelimitedFileOpener;
//! use recpipe_config::shared::{PipelineConfig, SourceConfig};
//!
//! # async fn example() -> recpipe::error::PipelineResult<()> {
//! let opener = DelimitedFileOpener::new(SourceConfig::new("title.basics.tsv"));
//! let stats = Pipeline::new(PipelineConfig::default(), opener, Title::mapping())
//!     .with_predicate(primary_title_equals("Carmencita"))
//!     .run()
//!     .await?;
//!
//! println!("processed {} records", stats.processed);
//! # Ok(())
//! # }
//! ```

mod macros;

pub mod concurrency;
pub mod decode;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod schema;
pub mod source;
pub mod types;
pub mod workers;
