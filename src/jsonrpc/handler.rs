use futures::future::BoxFuture;
use futures::FutureExt;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use super::error::HandlerError;

pub type HandlerResult = Result<Value, HandlerError>;

/// What a method handler hands back: a value now, or a computation to await
pub enum MethodOutput {
    Immediate(HandlerResult),
    Deferred(BoxFuture<'static, HandlerResult>),
}

impl MethodOutput {
    pub fn deferred<F>(future: F) -> Self
    where
        F: Future<Output = HandlerResult> + Send + 'static,
    {
        MethodOutput::Deferred(future.boxed())
    }
}

impl From<HandlerResult> for MethodOutput {
    fn from(result: HandlerResult) -> Self {
        MethodOutput::Immediate(result)
    }
}

impl fmt::Debug for MethodOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodOutput::Immediate(result) => f.debug_tuple("Immediate").field(result).finish(),
            MethodOutput::Deferred(_) => f.write_str("Deferred(..)"),
        }
    }
}

/// Receives the raw `params` member of the request, if any
pub type MethodHandler = Arc<dyn Fn(Option<Value>) -> MethodOutput + Send + Sync>;

/// Method name → handler table owned by a responder
#[derive(Clone, Default)]
pub struct MethodRegistry {
    methods: HashMap<String, MethodHandler>,
}

impl MethodRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a handler that answers synchronously
    pub fn with_method<F>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Option<Value>) -> HandlerResult + Send + Sync + 'static,
    {
        self.with_handler(
            name,
            Arc::new(move |params: Option<Value>| MethodOutput::Immediate(handler(params))),
        )
    }

    /// Register a handler whose answer is a future
    pub fn with_async_method<F, Fut>(self, name: impl Into<String>, handler: F) -> Self
    where
        F: Fn(Option<Value>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.with_handler(
            name,
            Arc::new(move |params: Option<Value>| MethodOutput::deferred(handler(params))),
        )
    }

    pub fn with_handler(mut self, name: impl Into<String>, handler: MethodHandler) -> Self {
        self.methods.insert(name.into(), handler);
        self
    }

    pub fn get(&self, name: &str) -> Option<MethodHandler> {
        self.methods.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.methods.len()
    }

    pub fn is_empty(&self) -> bool {
        self.methods.is_empty()
    }

    pub fn method_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.methods.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl fmt::Debug for MethodRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodRegistry")
            .field("methods", &self.method_names())
            .finish()
    }
}
