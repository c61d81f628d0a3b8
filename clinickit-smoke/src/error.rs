use thiserror::Error;

#[derive(Error, Debug)]
pub enum SmokeError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    #[error("Login failed with status {status}: {body}")]
    LoginFailed { status: u16, body: String },

    #[error("Decode error: {0}")]
    DecodeError(String),
}

pub type Result<T> = std::result::Result<T, SmokeError>;
