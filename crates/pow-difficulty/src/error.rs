use thiserror::Error;

#[derive(Debug, Error)]
pub enum DifficultyError {
    #[error("block expected to carry a PoW consensus field did not: {0}")]
    InvalidConsensusField(#[from] pow_types::PowTypesError),
    #[error("missing predecessor during a retarget walk the regulator itself initiated")]
    MissingPredecessor,
}
