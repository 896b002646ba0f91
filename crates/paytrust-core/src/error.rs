use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    #[error("random source failure: {0}")]
    Random(String),

    #[error("unsupported http method: {0}")]
    InvalidMethod(String),

    #[error("invalid request uri: {0}")]
    InvalidUri(String),

    #[error("transport error: {0}")]
    Transport(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
