use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

use super::builder::StandardError;
use super::types::ErrorObject;

/// Error reported by the remote peer in a response's `error` member
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} ({code})")]
pub struct ResponseError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl From<ErrorObject> for ResponseError {
    fn from(error: ErrorObject) -> Self {
        Self {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

/// No matching response arrived within the configured duration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} ({}ms)", .timeout.as_millis())]
pub struct TimeoutError {
    pub timeout: Duration,
    pub message: String,
}

impl TimeoutError {
    pub fn timeout_ms(&self) -> u128 {
        self.timeout.as_millis()
    }
}

/// Every way an outstanding request can fail
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RequestError {
    #[error(transparent)]
    Response(#[from] ResponseError),

    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    #[error("Requester dropped before the request settled")]
    Closed,

    #[error("Failed to decode result: {0}")]
    Decode(String),
}

impl RequestError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout(_))
    }
}

/// Failure signalled by a method handler; becomes the `error` member of the reply
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message} ({code})")]
pub struct HandlerError {
    pub code: i64,
    pub message: String,
    pub data: Option<Value>,
}

impl HandlerError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

impl From<StandardError> for HandlerError {
    fn from(kind: StandardError) -> Self {
        Self::new(kind.code(), kind.message())
    }
}

impl From<HandlerError> for ErrorObject {
    fn from(error: HandlerError) -> Self {
        ErrorObject {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuilderError {
    #[error("Unknown standard error kind: {0}")]
    UnknownErrorKind(String),
}
