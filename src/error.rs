//! Error types for the ingress defaulting webhook

use thiserror::Error;

/// Main error type for webhook operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Policy document missing, unreadable, or malformed
    #[error("configuration error: {0}")]
    Config(String),

    /// Inbound AdmissionReview could not be decoded
    #[error("decode error: {0}")]
    Decode(String),

    /// Embedded resource body is not a valid object of the expected kind
    #[error("unmarshal error: {0}")]
    Unmarshal(String),

    /// TLS certificate or key could not be loaded
    #[error("TLS error: {0}")]
    Tls(String),

    /// HTTPS listener failed
    #[error("server error: {0}")]
    Server(String),
}

impl Error {
    /// Create a configuration error with the given message
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a decode error with the given message
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Create an unmarshal error with the given message
    pub fn unmarshal(msg: impl Into<String>) -> Self {
        Self::Unmarshal(msg.into())
    }

    /// Create a TLS error with the given message
    pub fn tls(msg: impl Into<String>) -> Self {
        Self::Tls(msg.into())
    }

    /// Create a server error with the given message
    pub fn server(msg: impl Into<String>) -> Self {
        Self::Server(msg.into())
    }
}
