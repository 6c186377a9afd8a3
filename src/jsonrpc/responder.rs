use futures::FutureExt;
use log::{debug, trace, warn};
use serde_json::Value;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, PoisonError, RwLock};

use super::builder::{
    create_error_response, create_standard_error_response, create_success_response, StandardError,
};
use super::classify::is_request_shaped;
use super::error::HandlerError;
use super::handler::{HandlerResult, MethodOutput, MethodRegistry};
use super::transport::{OnMessage, PostMessage};
use super::types::Id;

/// Where a reply goes.
///
/// `None` marks a notification (`id` absent or `null`): its handler still runs
/// but nothing is ever posted back, not even METHOD_NOT_FOUND.
type ReplyTo = Option<Option<Id>>;

struct Inner {
    registry: RwLock<MethodRegistry>,
    sink: Arc<dyn PostMessage>,
}

/// Dispatches inbound requests to registered handlers and posts their replies
#[derive(Clone)]
pub struct Responder {
    inner: Arc<Inner>,
}

impl Responder {
    /// Create a responder and register its listener on `on`.
    pub fn new<P, O>(registry: MethodRegistry, post: P, on: O) -> Self
    where
        P: PostMessage,
        O: OnMessage,
    {
        let inner = Arc::new(Inner {
            registry: RwLock::new(registry),
            sink: Arc::new(post),
        });

        let weak = Arc::downgrade(&inner);
        on.on_message(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_message(message);
            }
        });

        Self { inner }
    }

    /// Swap in a new method table; requests already dispatched are unaffected
    pub fn set_method_registry(&self, registry: MethodRegistry) {
        let mut current = self
            .inner
            .registry
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        debug!("Method registry replaced: {:?}", registry.method_names());
        *current = registry;
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(name)
    }

    /// Feed one inbound transport message to the dispatcher
    pub fn handle_message(&self, message: Value) {
        self.inner.handle_message(message);
    }
}

impl Inner {
    fn handle_message(&self, message: Value) {
        if !is_request_shaped(&message) {
            return;
        }
        let Value::Object(mut obj) = message else {
            return;
        };

        let reply_to: ReplyTo = match obj.remove("id") {
            None | Some(Value::Null) => None,
            Some(raw) => Some(Id::from_value(&raw)),
        };
        let params = obj.remove("params");
        let method = match obj.remove("method") {
            Some(Value::String(method)) => Some(method),
            _ => None,
        };

        let handler = method.as_deref().and_then(|name| {
            self.registry
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .get(name)
        });
        let (Some(method), Some(handler)) = (method, handler) else {
            if let Some(id) = reply_to {
                let response = create_standard_error_response(StandardError::MethodNotFound, id, None);
                self.sink.post_message(response.into());
            }
            return;
        };

        trace!("Dispatching {}", method);
        let output = match panic::catch_unwind(AssertUnwindSafe(|| handler(params))) {
            Ok(output) => output,
            Err(_) => {
                warn!("Handler for {} panicked", method);
                MethodOutput::Immediate(Err(HandlerError::from(StandardError::InternalError)))
            }
        };

        match output {
            MethodOutput::Immediate(result) => reply(self.sink.as_ref(), reply_to, result),
            MethodOutput::Deferred(future) => {
                let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                    warn!("No tokio runtime to drive deferred handler for {}", method);
                    reply(
                        self.sink.as_ref(),
                        reply_to,
                        Err(StandardError::InternalError.into()),
                    );
                    return;
                };

                let sink = self.sink.clone();
                runtime.spawn(async move {
                    let result = match AssertUnwindSafe(future).catch_unwind().await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!("Deferred handler for {} panicked", method);
                            Err(StandardError::InternalError.into())
                        }
                    };
                    reply(sink.as_ref(), reply_to, result);
                });
            }
        }
    }
}

fn reply(sink: &dyn PostMessage, reply_to: ReplyTo, result: HandlerResult) {
    let Some(id) = reply_to else {
        return;
    };
    let response = match result {
        Ok(value) => create_success_response(id, Some(value)),
        Err(error) => create_error_response(error.code, error.message, id, error.data),
    };
    sink.post_message(response.into());
}

impl fmt::Debug for Responder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let registry = self
            .inner
            .registry
            .read()
            .unwrap_or_else(PoisonError::into_inner);
        f.debug_struct("Responder")
            .field("registry", &*registry)
            .finish()
    }
}
