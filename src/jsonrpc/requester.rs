use log::{debug, trace, warn};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;

use super::builder::{create_request_with_id, JsonRpcBuilder, StandardError};
use super::classify::is_response_shaped;
use super::error::{RequestError, ResponseError, TimeoutError};
use super::id::IdGeneratorOption;
use super::transport::{OnMessage, PostMessage};
use super::types::{ErrorObject, Id, Params, Request};

/// Message carried by timeout errors unless configured otherwise
pub const DEFAULT_TIMEOUT_MESSAGE: &str = "Timeout";

/// Result type delivered to a caller waiting on a request
pub type RequestResult = Result<Value, RequestError>;

/// Construction options for [`Requester`]
#[derive(Debug, Default)]
pub struct RequesterOptions {
    pub id_generator: IdGeneratorOption,
    pub timeout: Option<Duration>,
    pub timeout_message: Option<String>,
}

impl RequesterOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id_generator(mut self, id_generator: impl Into<IdGeneratorOption>) -> Self {
        self.id_generator = id_generator.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_message(mut self, message: impl Into<String>) -> Self {
        self.timeout_message = Some(message.into());
        self
    }
}

struct PendingRequest {
    completion: oneshot::Sender<RequestResult>,
    timer: Option<AbortHandle>,
}

struct Inner {
    builder: Mutex<JsonRpcBuilder>,
    sink: Box<dyn PostMessage>,
    timeout: Option<Duration>,
    timeout_message: String,
    pending: Mutex<HashMap<Id, PendingRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Sends requests over a transport and correlates the responses that come back.
///
/// Cloning yields another handle to the same pending table. When the last
/// handle is dropped, every outstanding [`ResponseFuture`] resolves with
/// [`RequestError::Closed`].
#[derive(Clone)]
pub struct Requester {
    inner: Arc<Inner>,
}

impl Requester {
    /// Create a requester and register its listener on `on`.
    ///
    /// With a channel receiver as `on`, this must run inside a tokio runtime.
    pub fn new<P, O>(options: RequesterOptions, post: P, on: O) -> Self
    where
        P: PostMessage,
        O: OnMessage,
    {
        let inner = Arc::new(Inner {
            builder: Mutex::new(JsonRpcBuilder::new(options.id_generator)),
            sink: Box::new(post),
            timeout: options.timeout,
            timeout_message: options
                .timeout_message
                .unwrap_or_else(|| DEFAULT_TIMEOUT_MESSAGE.to_string()),
            pending: Mutex::new(HashMap::new()),
        });

        let weak = Arc::downgrade(&inner);
        on.on_message(move |message| {
            if let Some(inner) = weak.upgrade() {
                inner.handle_message(message);
            }
        });

        Self { inner }
    }

    /// Send a request and return a future for its result.
    ///
    /// The request is registered and posted before this returns; the future
    /// only observes the outcome.
    pub fn request(&self, method: impl Into<String>, params: Option<Params>) -> ResponseFuture {
        self.send_request(method.into(), params, self.inner.timeout)
    }

    /// Like [`request`](Self::request) with a per-call timeout; `Duration::ZERO` disables it
    pub fn request_with_timeout(
        &self,
        method: impl Into<String>,
        params: Option<Params>,
        timeout: Duration,
    ) -> ResponseFuture {
        self.send_request(method.into(), params, Some(timeout))
    }

    /// Send a request and decode its result into `R`
    pub async fn call<R>(
        &self,
        method: impl Into<String>,
        params: Option<Params>,
    ) -> Result<R, RequestError>
    where
        R: DeserializeOwned,
    {
        let value = self.request(method, params).await?;
        serde_json::from_value(value).map_err(|e| RequestError::Decode(e.to_string()))
    }

    /// Send a notification; nothing is tracked and nothing is awaited
    pub fn notify(&self, method: impl Into<String>, params: Option<Params>) -> Request {
        let notification = lock(&self.inner.builder).create_request(method, params, true);
        trace!("Sending notification: {}", notification.method);
        self.inner.sink.post_message(notification.clone().into());
        notification
    }

    /// Feed one inbound transport message to the correlation layer
    pub fn handle_message(&self, message: Value) {
        self.inner.handle_message(message);
    }

    pub fn pending_count(&self) -> usize {
        lock(&self.inner.pending).len()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.inner.timeout
    }

    fn send_request(
        &self,
        method: String,
        params: Option<Params>,
        timeout: Option<Duration>,
    ) -> ResponseFuture {
        let id = lock(&self.inner.builder).next_id();
        let request = create_request_with_id(method, params, Some(id.clone()), false);
        let (completion, receiver) = oneshot::channel();

        // Registered before posting: a synchronous transport may answer inside post_message.
        {
            let mut pending = lock(&self.inner.pending);
            let entry = PendingRequest {
                completion,
                timer: None,
            };
            if let Some(previous) = pending.insert(id.clone(), entry) {
                warn!("Request id {} reused while still pending", id);
                if let Some(timer) = previous.timer {
                    timer.abort();
                }
            }
        }

        debug!("Sending request {}: {}", id, request.method);
        self.inner.sink.post_message(request.into());

        // a zero duration means no timeout
        if let Some(timeout) = timeout.filter(|d| !d.is_zero()) {
            self.arm_timer(id.clone(), timeout);
        }

        ResponseFuture { id, receiver }
    }

    fn arm_timer(&self, id: Id, timeout: Duration) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("No tokio runtime, request {} will not time out", id);
            return;
        };

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let timer_id = id.clone();
        let task = runtime.spawn(async move {
            tokio::time::sleep(timeout).await;
            if let Some(inner) = weak.upgrade() {
                inner.expire(&timer_id, timeout);
            }
        });

        match lock(&self.inner.pending).get_mut(&id) {
            Some(entry) => entry.timer = Some(task.abort_handle()),
            // already settled by a response delivered during post_message
            None => task.abort(),
        }
    }
}

impl Inner {
    fn handle_message(&self, message: Value) {
        if !is_response_shaped(&message) {
            return;
        }
        let Some(id) = message.get("id").and_then(Id::from_value) else {
            return;
        };
        let Some(entry) = lock(&self.pending).remove(&id) else {
            return;
        };

        if let Some(timer) = entry.timer {
            timer.abort();
        }

        let outcome = outcome_of(message);
        trace!("Request {} settled (ok: {})", id, outcome.is_ok());
        if entry.completion.send(outcome).is_err() {
            trace!("Caller stopped waiting for request {}", id);
        }
    }

    fn expire(&self, id: &Id, timeout: Duration) {
        let Some(entry) = lock(&self.pending).remove(id) else {
            return;
        };

        debug!("Request {} timed out after {}ms", id, timeout.as_millis());
        let error = TimeoutError {
            timeout,
            message: self.timeout_message.clone(),
        };
        let _ = entry.completion.send(Err(error.into()));
    }
}

impl Drop for Inner {
    fn drop(&mut self) {
        let pending = self.pending.get_mut().unwrap_or_else(PoisonError::into_inner);
        if !pending.is_empty() {
            debug!("Requester dropped with {} pending requests", pending.len());
        }
        for (_, entry) in pending.drain() {
            if let Some(timer) = entry.timer {
                timer.abort();
            }
        }
    }
}

/// Resolve with `result` unless a non-null `error` member is present
fn outcome_of(message: Value) -> RequestResult {
    let Value::Object(mut obj) = message else {
        return Ok(Value::Null);
    };

    match obj.remove("error") {
        Some(error) if !error.is_null() => Err(RequestError::Response(response_error(error))),
        _ => Ok(obj.remove("result").unwrap_or(Value::Null)),
    }
}

fn response_error(raw: Value) -> ResponseError {
    match serde_json::from_value::<ErrorObject>(raw.clone()) {
        Ok(error) => error.into(),
        Err(_) => {
            let kind = StandardError::InternalError;
            ResponseError {
                code: kind.code(),
                message: kind.message(),
                data: Some(raw),
            }
        }
    }
}

impl fmt::Debug for Requester {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Requester")
            .field("timeout", &self.inner.timeout)
            .field("pending", &self.pending_count())
            .finish()
    }
}

/// Completion handle for one outstanding request.
///
/// Resolves exactly once: with the result, the peer's error, a timeout, or
/// [`RequestError::Closed`] if the requester went away first.
#[derive(Debug)]
pub struct ResponseFuture {
    id: Id,
    receiver: oneshot::Receiver<RequestResult>,
}

impl ResponseFuture {
    pub fn id(&self) -> &Id {
        &self.id
    }
}

impl Future for ResponseFuture {
    type Output = RequestResult;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(Err(RequestError::Closed)),
            Poll::Pending => Poll::Pending,
        }
    }
}
