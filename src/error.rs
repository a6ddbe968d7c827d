use thiserror::Error;

/// Failure of a single user-triggered action. None of these leave a controller
/// unusable; the next action starts from a clean slate.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Bad user input, caught before any request is made.
    #[error("{0}")]
    Validation(String),

    /// The server answered, but with a non-2xx status or `success: false`.
    #[error("{0}")]
    Server(String),

    #[error("Network error: {0}")]
    Network(String),

    /// Re-entrancy guard: the named operation is still running.
    #[error("A {0} is already in progress")]
    ConcurrentOperation(&'static str),

    #[error("Please select a file first.")]
    NoFileSelected,

    #[error("FFmpeg is not installed on the server. Video conversion is currently unavailable.")]
    UnavailableCapability,

    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Network(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
