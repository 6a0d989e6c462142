// src/error.rs
// Error types for the SDK test support crate

use thiserror::Error;

/// Main error type for harness construction and client calls
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind mock server: {0}")]
    Bind(#[source] std::io::Error),

    #[error("JSON decode error: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("controller returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("client API version {client} is not compatible with controller API version {server}")]
    ApiMismatch { client: String, server: String },
}

/// Convenience type alias for Result using this crate's Error
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_error_from() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_bind_error_display() {
        let err = Error::Bind(std::io::Error::new(
            std::io::ErrorKind::AddrInUse,
            "in use",
        ));
        assert!(err.to_string().contains("bind"));
        assert!(err.to_string().contains("in use"));
    }

    #[test]
    fn test_decode_error_from() {
        let err: Error = serde_json::from_str::<serde_json::Value>("{").unwrap_err().into();
        assert!(err.to_string().contains("JSON decode error"));
    }

    #[test]
    fn test_status_error_display() {
        let err = Error::Status {
            status: 404,
            body: "not found".to_string(),
        };
        assert_eq!(err.to_string(), "controller returned 404: not found");
    }

    #[test]
    fn test_api_mismatch_display() {
        let err = Error::ApiMismatch {
            client: "2.3".to_string(),
            server: "1.0".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("2.3"));
        assert!(msg.contains("1.0"));
    }
}
