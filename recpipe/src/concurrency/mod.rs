//! Concurrency primitives coordinating the producer and its receivers.
//!
//! A run is held together by three primitives:
//!
//! - The [`signal`] module provides the completion signal, a broadcast that fires at most once
//!   per run and tells every participant to stop, together with the cause that fired it.
//! - The [`scope`] module bounds a run by a deadline and by the caller's cancellation token.
//! - The [`handoff`] module implements the record channel, a rendezvous channel where a send
//!   only completes once a receiver has taken the record.
//!
//! Every blocking wait in a participant is raced against the completion signal and the run
//! scope, so no participant can stay blocked after the run has completed.

pub mod handoff;
pub mod scope;
pub mod signal;
