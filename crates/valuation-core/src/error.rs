use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValuationError {
    /// Upstream payload is not a field map, or a display map entry is malformed.
    #[error("Data format error: {0}")]
    DataFormat(String),

    /// Parameters make the requested formula meaningless (e.g. discount <= growth).
    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Provider error: {0}")]
    Provider(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type CoreResult<T> = Result<T, ValuationError>;
