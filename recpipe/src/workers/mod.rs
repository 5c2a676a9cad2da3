//! Tasks taking part in a pipeline run.
//!
//! A run is made of one [`producer::Producer`] and any number of [`receiver::Receiver`]s. Each
//! participant is spawned on its own task and observed through a handle implementing
//! [`base::WorkerHandle`], whose `wait` turns a panic into an error instead of propagating it.

pub mod base;
pub mod producer;
pub mod receiver;
