//! The three consensus roles the host validator instantiates per candidate
//! block: [`BlockPublisher`] orchestrates mining, [`BlockVerifier`] checks a
//! received block's PoW tag and difficulty, and [`ForkResolver`] decides
//! between two PoW fork heads by cumulative work.
//!
//! None of the three persist anything of their own; they read blocks through
//! `pow_types::BlockCache` and write consensus metadata into blocks the host
//! owns.

mod error;
mod fork;
mod publisher;
mod verifier;

pub use error::{ConsensusError, ForkError};
pub use fork::ForkResolver;
pub use publisher::BlockPublisher;
pub use verifier::BlockVerifier;
