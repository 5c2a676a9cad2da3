//! Record sources feeding the producer.
//!
//! A [`SourceOpener`] is resolved by the pipeline before any task is spawned, so a source that
//! cannot be opened fails the run without starting it. The opened [`RecordSource`] is then
//! owned by the producer and released when the producer exits.

mod base;
mod delimited;
mod memory;

pub use base::{RecordSource, SourceOpener};
pub use delimited::{DelimitedFileOpener, DelimitedFileSource, DelimitedSource};
pub use memory::MemorySource;
