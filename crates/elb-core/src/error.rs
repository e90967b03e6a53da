//! Error types for load balancer provisioning
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Result type alias for provisioning operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for load balancer provisioning
#[derive(Error, Debug)]
pub enum Error {
    /// Certificate or port lookup could not produce a usable value
    #[error("Resolution error: {0}")]
    Resolution(String),

    /// A create/update/describe call against the control plane failed
    #[error("Control plane error ({operation}): {message}")]
    ControlPlane {
        /// Control plane operation that was attempted
        operation: String,
        /// Error message
        message: String,
    },

    /// Load balancer creation failed for a reason other than a name collision
    #[error("Error creating ELB: {request} ({message})")]
    CreateFailed {
        /// Description of the attempted create request
        request: String,
        /// Underlying failure
        message: String,
    },

    /// DNS registrar-related errors
    #[error("DNS registrar error: {0}")]
    DnsRegistrar(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP transport errors (from adapter APIs)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a control plane error for the named operation
    pub fn control_plane(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ControlPlane {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create a create-failure error carrying the attempted request
    pub fn create_failed(request: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CreateFailed {
            request: request.into(),
            message: message.into(),
        }
    }

    /// Create a DNS registrar error
    pub fn dns_registrar(msg: impl Into<String>) -> Self {
        Self::DnsRegistrar(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a "not found" error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create an HTTP error
    pub fn http(msg: impl Into<String>) -> Self {
        Self::Http(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Wrap this error with the control plane operation that produced it
    /// and the parameters of the attempted request.
    ///
    /// Errors that already name an operation keep it; the request is
    /// appended to their message. Create failures already carry their
    /// request and are returned unchanged.
    pub fn in_operation(self, operation: &str, request: impl std::fmt::Display) -> Self {
        match self {
            Self::CreateFailed { .. } => self,
            Self::ControlPlane { operation, message } => Self::ControlPlane {
                operation,
                message: format!("{} (request: {})", message, request),
            },
            other => Self::control_plane(operation, format!("{} (request: {})", other, request)),
        }
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}
