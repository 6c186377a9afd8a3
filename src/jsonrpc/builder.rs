use serde_json::Value;
use std::fmt;
use std::str::FromStr;

use super::error::BuilderError;
use super::id::{IdGenerator, IdGeneratorOption};
use super::types::{ErrorObject, Id, Params, Request, Response, Version};

/// Reserved JSONRPC error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StandardError {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl StandardError {
    pub const ALL: [StandardError; 5] = [
        StandardError::ParseError,
        StandardError::InvalidRequest,
        StandardError::MethodNotFound,
        StandardError::InvalidParams,
        StandardError::InternalError,
    ];

    /// Symbolic name, e.g. `METHOD_NOT_FOUND`
    pub fn name(&self) -> &'static str {
        match self {
            StandardError::ParseError => "PARSE_ERROR",
            StandardError::InvalidRequest => "INVALID_REQUEST",
            StandardError::MethodNotFound => "METHOD_NOT_FOUND",
            StandardError::InvalidParams => "INVALID_PARAMS",
            StandardError::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            StandardError::ParseError => -32700,
            StandardError::InvalidRequest => -32600,
            StandardError::MethodNotFound => -32601,
            StandardError::InvalidParams => -32602,
            StandardError::InternalError => -32603,
        }
    }

    /// Lowercased name with underscores turned into spaces
    pub fn message(&self) -> String {
        self.name().replace('_', " ").to_lowercase()
    }

    pub fn to_error_object(self) -> ErrorObject {
        ErrorObject::new(self.code(), self.message())
    }
}

impl fmt::Display for StandardError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for StandardError {
    type Err = BuilderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StandardError::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| BuilderError::UnknownErrorKind(s.to_string()))
    }
}

/// Builds protocol messages, drawing request ids from its generator
pub struct JsonRpcBuilder {
    id_generator: Box<dyn IdGenerator>,
}

impl JsonRpcBuilder {
    pub fn new(id_generator: IdGeneratorOption) -> Self {
        Self {
            id_generator: id_generator.into_generator(),
        }
    }

    pub fn set_id_generator(&mut self, id_generator: IdGeneratorOption) {
        self.id_generator = id_generator.into_generator();
    }

    pub fn next_id(&mut self) -> Id {
        self.id_generator.next_id()
    }

    /// Build a request with a fresh id, or a notification with `id: null`.
    ///
    /// Notifications never consume an id from the generator.
    pub fn create_request(
        &mut self,
        method: impl Into<String>,
        params: Option<Params>,
        notification: bool,
    ) -> Request {
        let id = if notification {
            None
        } else {
            Some(self.id_generator.next_id())
        };
        create_request_with_id(method, params, id, notification)
    }
}

impl Default for JsonRpcBuilder {
    fn default() -> Self {
        Self::new(IdGeneratorOption::default())
    }
}

pub fn create_request_with_id(
    method: impl Into<String>,
    params: Option<Params>,
    id: Option<Id>,
    notification: bool,
) -> Request {
    Request {
        jsonrpc: Version::V2,
        id: if notification { None } else { id },
        method: method.into(),
        params,
    }
}

/// Success response; a missing result is sent as `null`
pub fn create_success_response(id: Option<Id>, result: Option<Value>) -> Response {
    Response {
        jsonrpc: Version::V2,
        id,
        result: Some(result.unwrap_or(Value::Null)),
        error: None,
    }
}

pub fn create_error_response(
    code: i64,
    message: impl Into<String>,
    id: Option<Id>,
    data: Option<Value>,
) -> Response {
    Response {
        jsonrpc: Version::V2,
        id,
        result: None,
        error: Some(ErrorObject {
            code,
            message: message.into(),
            data,
        }),
    }
}

pub fn create_standard_error_response(
    kind: StandardError,
    id: Option<Id>,
    data: Option<Value>,
) -> Response {
    create_error_response(kind.code(), kind.message(), id, data)
}

/// String-keyed form of [`create_standard_error_response`].
///
/// Fails when `kind` is not one of the reserved symbolic names.
pub fn create_standard_error_res(
    kind: &str,
    id: Option<Id>,
    data: Option<Value>,
) -> Result<Response, BuilderError> {
    let kind = kind.parse::<StandardError>()?;
    Ok(create_standard_error_response(kind, id, data))
}
