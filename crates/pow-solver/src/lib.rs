//! The nonce-search worker: a thread-isolated command/event state machine
//! that hashes toward a difficulty target, self-raising that target every
//! time it finds a qualifying nonce so that a worker asked to keep
//! searching (`Swap`) only ever reports strictly better results.

mod error;
mod handle;
mod protocol;
mod worker;

pub use error::SolverError;
pub use handle::{WorkerHandle, WorkerState};
pub use protocol::{Command, Event};
