//! Error types of the service layer.
//!
//! - [`ConfigurationError`]: a registration or the options are unusable
//! - [`StartupError`]: the listener could not be started
//! - [`HandlerError`]: a handler failed, either with an HTTP status or with an internal fault
//! - [`DiscoveryError`]: a discovery collaborator failed to record an endpoint

use http::StatusCode;
use std::error::Error;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigurationError {
    #[error("bad pattern '{pattern}': {source}")]
    BadPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("invalid http method '{method}'")]
    InvalidMethod { method: String },

    #[error("invalid status code {code}")]
    InvalidStatusCode { code: u16 },

    #[error("invalid options: {reason}")]
    InvalidOptions { reason: String },

    #[error("routes and error handlers can't be registered once the server is started")]
    RegistryFrozen,
}

impl ConfigurationError {
    pub fn bad_pattern<S: ToString>(pattern: S, source: regex::Error) -> Self {
        Self::BadPattern { pattern: pattern.to_string(), source }
    }

    pub fn invalid_method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn invalid_options<S: ToString>(reason: S) -> Self {
        Self::InvalidOptions { reason: reason.to_string() }
    }
}

#[derive(Error, Debug)]
pub enum StartupError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("unable to bind service [http] to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },
}

/// Error returned by a request handler.
///
/// A [`HandlerError::Status`] is answered with its status, through the error handler registered
/// for it if there is one. Everything else is an [`HandlerError::Internal`] fault, answered with
/// `500 Internal Server Error`.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error("http status {status}")]
    Status { status: StatusCode, message: Option<String> },

    #[error("internal error: {0}")]
    Internal(Box<dyn Error + Send + Sync>),
}

impl HandlerError {
    pub fn status(status: StatusCode) -> Self {
        Self::Status { status, message: None }
    }

    pub fn with_message<S: Into<String>>(status: StatusCode, message: S) -> Self {
        Self::Status { status, message: Some(message.into()) }
    }

    pub fn not_found() -> Self {
        Self::status(StatusCode::NOT_FOUND)
    }

    pub fn internal<E: Into<Box<dyn Error + Send + Sync>>>(e: E) -> Self {
        Self::Internal(e.into())
    }

    /// The status this error is answered with, before error handler overrides.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Status { status, .. } => *status,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StatusCode> for HandlerError {
    fn from(status: StatusCode) -> Self {
        Self::status(status)
    }
}

impl From<io::Error> for HandlerError {
    fn from(e: io::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

impl From<std::str::Utf8Error> for HandlerError {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

impl From<std::string::FromUtf8Error> for HandlerError {
    fn from(e: std::string::FromUtf8Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        Self::Internal(Box::new(e))
    }
}

impl From<Box<dyn Error + Send + Sync>> for HandlerError {
    fn from(e: Box<dyn Error + Send + Sync>) -> Self {
        Self::Internal(e)
    }
}

/// Failure reported by a discovery collaborator; logged and otherwise ignored.
pub type DiscoveryError = Box<dyn Error + Send + Sync>;
