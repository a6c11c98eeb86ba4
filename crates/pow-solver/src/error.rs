use thiserror::Error;

#[derive(Debug, Error)]
pub enum SolverError {
    #[error("solver worker thread is no longer running")]
    WorkerGone,
}
