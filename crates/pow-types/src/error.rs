use thiserror::Error;

/// Errors from decoding a consensus field. Always recoverable: callers on
/// the verification path map any variant to `false` rather than propagate.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PowTypesError {
    #[error("consensus field is not tagged PoW")]
    NotPow,
    #[error("malformed consensus field: {0}")]
    Malformed(&'static str),
}
