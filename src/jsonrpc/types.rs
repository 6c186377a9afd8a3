use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Number, Value};
use std::fmt;

/// Protocol version string carried by every message
pub const JSONRPC_VERSION: &str = "2.0";

/// JSONRPC version marker - serialized as exactly "2.0"
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Version {
    #[default]
    #[serde(rename = "2.0")]
    V2,
}

impl Version {
    pub fn as_str(&self) -> &'static str {
        JSONRPC_VERSION
    }
}

/// Request identifier (string or any JSON number, kept exactly as received)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Id {
    Number(Number),
    String(String),
}

impl Id {
    /// Read an identifier out of a raw JSON value.
    ///
    /// `null` and structured values have no identifier form.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Number(number) => Some(Id::Number(number.clone())),
            Value::String(text) => Some(Id::String(text.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Id::Number(number) => write!(f, "{}", number),
            Id::String(text) => write!(f, "{}", text),
        }
    }
}

impl From<i64> for Id {
    fn from(value: i64) -> Self {
        Id::Number(value.into())
    }
}

impl From<Number> for Id {
    fn from(value: Number) -> Self {
        Id::Number(value)
    }
}

impl From<String> for Id {
    fn from(value: String) -> Self {
        Id::String(value)
    }
}

impl From<&str> for Id {
    fn from(value: &str) -> Self {
        Id::String(value.to_string())
    }
}

impl From<Id> for Value {
    fn from(id: Id) -> Self {
        match id {
            Id::Number(number) => Value::Number(number),
            Id::String(text) => Value::String(text),
        }
    }
}

/// Call parameters - either positional or named
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    Array(Vec<Value>),
    Object(Map<String, Value>),
}

impl From<Vec<Value>> for Params {
    fn from(values: Vec<Value>) -> Self {
        Params::Array(values)
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Params::Object(map)
    }
}

/// Only arrays and objects are valid parameter structures; anything else is
/// handed back unchanged.
impl TryFrom<Value> for Params {
    type Error = Value;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Array(values) => Ok(Params::Array(values)),
            Value::Object(map) => Ok(Params::Object(map)),
            other => Err(other),
        }
    }
}

impl From<Params> for Value {
    fn from(params: Params) -> Self {
        match params {
            Params::Array(values) => Value::Array(values),
            Params::Object(map) => Value::Object(map),
        }
    }
}

/// JSONRPC 2.0 Request message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Request {
    /// JSONRPC version - MUST be exactly "2.0"
    pub jsonrpc: Version,

    /// Request identifier (`None` for notifications, serialized as `null`)
    #[serde(default)]
    pub id: Option<Id>,

    /// Method name to be invoked
    pub method: String,

    /// Parameters for the method (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Params>,
}

impl Request {
    /// Check if this is a notification (no id)
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// JSONRPC 2.0 Response message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// JSONRPC version - MUST be exactly "2.0"
    pub jsonrpc: Version,

    /// Request identifier from the original request
    #[serde(default)]
    pub id: Option<Id>,

    /// Result value (required on success, `Some(Value::Null)` for void returns)
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_present"
    )]
    pub result: Option<Value>,

    /// Error object (required on error)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    /// True when the response carries no error object
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Keeps an explicit `"result": null` distinct from an absent key.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// JSONRPC 2.0 Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// Error type indicator (must be integer)
    pub code: i64,

    /// Short error description
    pub message: String,

    /// Additional error information (optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
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

impl From<ErrorObject> for Value {
    fn from(error: ErrorObject) -> Self {
        let mut obj = Map::new();
        obj.insert("code".to_string(), Value::Number(error.code.into()));
        obj.insert("message".to_string(), Value::String(error.message));
        if let Some(data) = error.data {
            obj.insert("data".to_string(), data);
        }
        Value::Object(obj)
    }
}

impl From<Request> for Value {
    fn from(request: Request) -> Self {
        let mut obj = Map::new();
        obj.insert(
            "jsonrpc".to_string(),
            Value::String(JSONRPC_VERSION.to_string()),
        );
        obj.insert("id".to_string(), request.id.map_or(Value::Null, Value::from));
        obj.insert("method".to_string(), Value::String(request.method));
        if let Some(params) = request.params {
            obj.insert("params".to_string(), params.into());
        }
        Value::Object(obj)
    }
}

impl From<Response> for Value {
    fn from(response: Response) -> Self {
        let mut obj = Map::new();
        obj.insert(
            "jsonrpc".to_string(),
            Value::String(JSONRPC_VERSION.to_string()),
        );
        obj.insert(
            "id".to_string(),
            response.id.map_or(Value::Null, Value::from),
        );
        if let Some(result) = response.result {
            obj.insert("result".to_string(), result);
        }
        if let Some(error) = response.error {
            obj.insert("error".to_string(), error.into());
        }
        Value::Object(obj)
    }
}
