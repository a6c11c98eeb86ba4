use thiserror::Error;

/// Errors surfaced by the publisher. `WorkerProtocol` corresponds to an
/// `ERROR` event from a solver and is fatal: the host should treat the
/// candidate as unrecoverable and restart it.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("solver worker reported a protocol error: {0}")]
    WorkerProtocol(String),
    #[error(transparent)]
    Solver(#[from] pow_solver::SolverError),
    #[error(transparent)]
    Difficulty(#[from] pow_difficulty::DifficultyError),
}

/// Errors from fork comparison. Walk aborts (missing or non-PoW ancestors)
/// are not represented here — they are caught internally and turned into a
/// `false` comparison result, per the type's documented contract.
#[derive(Debug, Error)]
pub enum ForkError {
    #[error("fork head is not a PoW block")]
    NotPow,
    #[error(transparent)]
    Difficulty(#[from] pow_difficulty::DifficultyError),
}
