use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Ineligible or malformed url / visit data. Never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Persistence failed; the mutation that triggered it was rolled back.
    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("History provider is not initialized")]
    NotInitialized,

    #[error("Unknown event: {0}")]
    UnknownEvent(String),
}

impl Error {
    /// Wrap a persistence failure as `Store`
    pub(crate) fn store(context: &str, err: &Error) -> Self {
        Error::Store(format!("{context}: {err}"))
    }
}

impl From<placerank_types::ParseKindError> for Error {
    fn from(err: placerank_types::ParseKindError) -> Self {
        Error::UnknownEvent(err.value().to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
