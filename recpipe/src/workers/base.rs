use std::future::Future;

use crate::error::PipelineResult;
use crate::types::WorkerId;

/// Classification of pipeline participants, used in logs and errors.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WorkerType {
    /// Reads the source and hands records off.
    Producer,
    /// Decodes records and evaluates the predicate.
    Receiver { worker_id: WorkerId },
}

/// Handle of a spawned participant.
pub trait WorkerHandle<R> {
    /// Returns which participant this handle observes.
    fn worker_type(&self) -> WorkerType;

    /// Waits for the participant to exit and returns its report.
    ///
    /// A panic inside the participant is returned as an error.
    fn wait(self) -> impl Future<Output = PipelineResult<R>> + Send;
}
