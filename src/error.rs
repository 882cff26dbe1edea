use thiserror::Error;

/// Why a caption request produced no captions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptionError {
    #[error("Please choose an image first")]
    NoImage,

    #[error("Network error: {0}")]
    NetworkFailure(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Unexpected response: {0}")]
    MalformedResponse(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NoImage,
    NetworkFailure,
    ServerError,
    MalformedResponse,
}

impl CaptionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CaptionError::NoImage => ErrorKind::NoImage,
            CaptionError::NetworkFailure(_) => ErrorKind::NetworkFailure,
            CaptionError::ServerError(_) => ErrorKind::ServerError,
            CaptionError::MalformedResponse(_) => ErrorKind::MalformedResponse,
        }
    }
}

impl From<reqwest::Error> for CaptionError {
    fn from(e: reqwest::Error) -> Self {
        CaptionError::NetworkFailure(e.to_string())
    }
}

/// Rejected form interactions. These never change form state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Unknown {field} option: {value}")]
    UnknownOption { field: &'static str, value: String },

    #[error("No caption at position {0}")]
    NoSuchEntry(usize),
}
