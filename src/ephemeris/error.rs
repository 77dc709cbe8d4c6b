use thiserror::Error;

#[derive(Debug, Error)]
pub enum EphemerisError {
    #[error("propagation error: {0}")]
    Propagation(String),
    #[error("no horizon crossing within the next {0} hours")]
    NoCrossing(i64),
}
