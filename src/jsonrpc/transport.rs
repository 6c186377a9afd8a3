//! Transport seams: the outbound `postMessage` primitive and the inbound
//! `onMessage` registration, plus an in-process channel implementation.

use serde_json::Value;
use tokio::sync::mpsc;

/// Hands a fully built protocol message to the outside world.
///
/// Delivery is not observable from here.
pub trait PostMessage: Send + Sync + 'static {
    fn post_message(&self, message: Value);
}

impl<F> PostMessage for F
where
    F: Fn(Value) + Send + Sync + 'static,
{
    fn post_message(&self, message: Value) {
        self(message)
    }
}

/// Registers the single inbound callback of a transport.
///
/// Consumed by value, so a transport can only ever be listened to once.
pub trait OnMessage: Send + 'static {
    fn on_message<C>(self, callback: C)
    where
        C: Fn(Value) + Send + Sync + 'static;
}

/// チャンネルから受信したメッセージを順にコールバックへ渡す。
/// Must be called from within a tokio runtime.
impl OnMessage for mpsc::UnboundedReceiver<Value> {
    fn on_message<C>(mut self, callback: C)
    where
        C: Fn(Value) + Send + Sync + 'static,
    {
        tokio::spawn(async move {
            while let Some(message) = self.recv().await {
                callback(message);
            }
            log::debug!("Inbound channel closed, listener stopped");
        });
    }
}

/// Inbound side for callers that push messages through `handle_message` themselves
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualInbound;

impl OnMessage for ManualInbound {
    fn on_message<C>(self, _callback: C)
    where
        C: Fn(Value) + Send + Sync + 'static,
    {
    }
}

/// Outbound half of an in-process channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    sender: mpsc::UnboundedSender<Value>,
}

impl ChannelSink {
    pub fn new(sender: mpsc::UnboundedSender<Value>) -> Self {
        Self { sender }
    }
}

impl PostMessage for ChannelSink {
    fn post_message(&self, message: Value) {
        if self.sender.send(message).is_err() {
            log::debug!("Peer dropped, outbound message discarded");
        }
    }
}

/// One side of a linked in-process transport
#[derive(Debug)]
pub struct Endpoint {
    pub outbound: ChannelSink,
    pub inbound: mpsc::UnboundedReceiver<Value>,
}

impl Endpoint {
    pub fn split(self) -> (ChannelSink, mpsc::UnboundedReceiver<Value>) {
        (self.outbound, self.inbound)
    }
}

/// Two endpoints wired to each other: whatever one posts, the other receives
pub fn duplex() -> (Endpoint, Endpoint) {
    let (a_tx, a_rx) = mpsc::unbounded_channel();
    let (b_tx, b_rx) = mpsc::unbounded_channel();

    let a = Endpoint {
        outbound: ChannelSink::new(b_tx),
        inbound: a_rx,
    };
    let b = Endpoint {
        outbound: ChannelSink::new(a_tx),
        inbound: b_rx,
    };
    (a, b)
}
