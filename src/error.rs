use thiserror::Error;

/// Failure to obtain a usable reply from the responder.
///
/// The pipeline recovers from every variant the same way; they only differ in
/// the diagnostic that gets logged.
#[derive(Debug, Error)]
pub enum TransportFailure {
    #[error("webhook request failed: {0}")]
    Request(String),
    #[error("webhook responded with status {0}")]
    Status(u16),
    #[error("webhook response could not be decoded: {0}")]
    Body(String),
}

impl From<reqwest::Error> for TransportFailure {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            TransportFailure::Body(err.to_string())
        } else {
            TransportFailure::Request(err.to_string())
        }
    }
}

/// Errors from admin credential handling.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("environment variable '{0}' is not set")]
    MissingEnv(String),
    #[error("unsupported password reference: {0}")]
    UnsupportedRef(String),
    #[error("keyring error: {0}")]
    Keyring(#[from] keyring::Error),
}
