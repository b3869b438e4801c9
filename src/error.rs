use thiserror::Error;

#[derive(Error, Debug)]
pub enum PennyError {
    #[error("Database error: {0}")]
    Db(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown transaction: {0}")]
    UnknownTransaction(String),

    #[error("Unknown account: {0}")]
    UnknownAccount(String),

    /// The model subprocess could not be started or exited abnormally.
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// The model response was not the JSON object we asked for.
    #[error("Could not parse model response: {0}")]
    Parse(String),

    #[error("Settings error: {0}")]
    Settings(String),

    #[error("{0}")]
    Other(String),
}

impl PennyError {
    /// Failures of the model round trip, as opposed to local store or IO failures.
    pub fn is_gateway_failure(&self) -> bool {
        matches!(self, PennyError::Gateway(_) | PennyError::Parse(_))
    }
}

pub type Result<T> = std::result::Result<T, PennyError>;
