use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum SyncError {
    #[error("GPIO error: {0}")]
    Gpio(#[from] rppal::gpio::Error),

    #[error("Database error: {0}")]
    Database(#[from] mongodb::error::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API responded with status code {0}")]
    UnexpectedStatusCode(u16),

    #[error("Malformed status value: {0}")]
    MalformedStatus(String),

    #[error("Missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("Output driver failure: {0}")]
    Output(String),

    #[error(transparent)]
    SerdeJsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, SyncError>;
