//! Error taxonomy for console REST calls.
//!
//! Transport problems, unexpected HTTP statuses, and undecodable bodies are
//! kept distinct so callers can map them onto exit codes without string
//! matching.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    /// The console answered with a status the caller did not expect.
    #[error("{method} {path} returned HTTP {status}: {message}")]
    Status {
        method: &'static str,
        path: String,
        status: u16,
        message: String,
    },

    /// The request never produced an HTTP response.
    #[error("request to {path} failed")]
    Transport {
        path: String,
        #[source]
        source: ureq::Error,
    },

    /// The response body could not be decoded into the expected shape.
    #[error("invalid response body from {path}")]
    Decode {
        path: String,
        #[source]
        source: ureq::Error,
    },
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// True for responses that indicate a bad key or missing permission.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self.status_code(), Some(401) | Some(403))
    }
}
