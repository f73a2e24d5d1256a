//! Error types for whatsapp-broadcast

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Backend error: {0}")]
    Backend(String),

    #[error("Pairing abandoned before completion")]
    PairingAbandoned,

    #[error("Connection timeout")]
    ConnectionTimeout,

    #[error("No valid contacts found in {0}")]
    NoContacts(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("invalid delay range 35-15".to_string());
        assert!(err.to_string().contains("35-15"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_connection_timeout_display() {
        assert_eq!(Error::ConnectionTimeout.to_string(), "Connection timeout");
    }
}
