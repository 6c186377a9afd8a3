// Responder のディスパッチ・応答テスト
// リクエストはチャンネルの反対端から直接投入する

use postrpc::jsonrpc::{
    create_standard_error_res, duplex, Endpoint, HandlerError, Id, MethodRegistry, PostMessage,
    Responder, StandardError,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Notify};

fn init_logger() {
    let _ = env_logger::builder()
        .filter_level(log::LevelFilter::Debug)
        .is_test(true)
        .try_init();
}

fn serve(registry: MethodRegistry) -> (Responder, Endpoint) {
    init_logger();
    let (server, peer) = duplex();
    let (outbound, inbound) = server.split();
    (Responder::new(registry, outbound, inbound), peer)
}

fn send(peer: &Endpoint, message: Value) {
    peer.outbound.post_message(message);
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

fn assert_silent(peer: &mut Endpoint) {
    assert!(
        matches!(peer.inbound.try_recv(), Err(mpsc::error::TryRecvError::Empty)),
        "unexpected outbound message"
    );
}

#[tokio::test]
async fn test_unregistered_method_yields_method_not_found() {
    let (_responder, mut peer) = serve(MethodRegistry::new());

    send(&peer, json!({"jsonrpc": "2.0", "id": "abc", "method": "nope", "params": [1]}));

    let expected =
        create_standard_error_res("METHOD_NOT_FOUND", Some(Id::from("abc")), None).unwrap();
    assert_eq!(peer.inbound.recv().await, Some(Value::from(expected)));

    settle().await;
    assert_silent(&mut peer);
}

#[tokio::test]
async fn test_deferred_result_is_sent_after_it_settles() {
    let gate = Arc::new(Notify::new());
    let registry = {
        let gate = gate.clone();
        MethodRegistry::new().with_async_method("wait", move |_| {
            let gate = gate.clone();
            async move {
                gate.notified().await;
                Ok(json!("R"))
            }
        })
    };
    let (_responder, mut peer) = serve(registry);

    send(&peer, json!({"jsonrpc": "2.0", "id": 1, "method": "wait"}));
    settle().await;
    assert_silent(&mut peer);

    gate.notify_one();
    assert_eq!(
        peer.inbound.recv().await,
        Some(json!({"jsonrpc": "2.0", "id": 1, "result": "R"}))
    );

    settle().await;
    assert_silent(&mut peer);
}

#[tokio::test]
async fn test_non_request_messages_produce_nothing() {
    let registry = MethodRegistry::new().with_method("ping", |_| Ok(json!("pong")));
    let (_responder, mut peer) = serve(registry);

    send(&peer, json!({"jsonrpc": "2.0", "id": 1, "result": "pong"}));
    send(&peer, json!({"jsonrpc": "2.0", "id": 2, "error": {"code": 1, "message": "x"}}));
    send(&peer, json!([{"jsonrpc": "2.0", "id": 3, "method": "ping"}]));
    send(&peer, json!(42));
    settle().await;
    assert_silent(&mut peer);

    send(&peer, json!({"jsonrpc": "2.0", "id": 4, "method": "ping"}));
    assert_eq!(
        peer.inbound.recv().await,
        Some(json!({"jsonrpc": "2.0", "id": 4, "result": "pong"}))
    );
}

#[tokio::test]
async fn test_handler_errors_become_error_responses() {
    let registry = MethodRegistry::new()
        .with_method("sync_fail", |_| {
            Err(HandlerError::new(-32000, "sync failure").with_data(json!({"field": "a"})))
        })
        .with_async_method("async_fail", |_| async {
            Err(HandlerError::from(StandardError::InvalidParams))
        });
    let (_responder, mut peer) = serve(registry);

    send(&peer, json!({"jsonrpc": "2.0", "id": 1, "method": "sync_fail"}));
    assert_eq!(
        peer.inbound.recv().await,
        Some(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32000, "message": "sync failure", "data": {"field": "a"}}
        }))
    );

    send(&peer, json!({"jsonrpc": "2.0", "id": 2, "method": "async_fail"}));
    assert_eq!(
        peer.inbound.recv().await,
        Some(json!({
            "jsonrpc": "2.0",
            "id": 2,
            "error": {"code": -32602, "message": "invalid params"}
        }))
    );
}

#[tokio::test]
async fn test_async_panic_becomes_internal_error() {
    let registry = MethodRegistry::new()
        .with_async_method("boom", |_| async { panic!("deferred failure") })
        .with_method("ping", |_| Ok(json!("pong")));
    let (_responder, mut peer) = serve(registry);

    send(&peer, json!({"jsonrpc": "2.0", "id": 1, "method": "boom"}));
    assert_eq!(
        peer.inbound.recv().await,
        Some(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32603, "message": "internal error"}
        }))
    );

    // dispatch keeps working afterwards
    send(&peer, json!({"jsonrpc": "2.0", "id": 2, "method": "ping"}));
    assert_eq!(peer.inbound.recv().await.unwrap()["result"], json!("pong"));
}

#[tokio::test(start_paused = true)]
async fn test_responses_follow_completion_order() {
    let registry = MethodRegistry::new().with_async_method("sleep", |params| async move {
        let Some(ms) = params.as_ref().and_then(|p| p.get("ms")).and_then(Value::as_u64) else {
            return Err(HandlerError::from(StandardError::InvalidParams));
        };
        tokio::time::sleep(Duration::from_millis(ms)).await;
        Ok(json!(ms))
    });
    let (_responder, mut peer) = serve(registry);

    send(&peer, json!({"jsonrpc": "2.0", "id": "slow", "method": "sleep", "params": {"ms": 200}}));
    send(&peer, json!({"jsonrpc": "2.0", "id": "fast", "method": "sleep", "params": {"ms": 10}}));

    let first = peer.inbound.recv().await.unwrap();
    let second = peer.inbound.recv().await.unwrap();
    assert_eq!(first["id"], json!("fast"));
    assert_eq!(second["id"], json!("slow"));
    assert_eq!(second["result"], json!(200));
}

#[tokio::test]
async fn test_handler_receives_raw_params() {
    let registry = MethodRegistry::new().with_method("echo", |params| {
        Ok(json!({ "params": params }))
    });
    let (_responder, mut peer) = serve(registry);

    send(&peer, json!({"jsonrpc": "2.0", "id": 1, "method": "echo", "params": {"k": [1, 2]}}));
    send(&peer, json!({"jsonrpc": "2.0", "id": 2, "method": "echo"}));

    assert_eq!(
        peer.inbound.recv().await.unwrap()["result"],
        json!({"params": {"k": [1, 2]}})
    );
    assert_eq!(
        peer.inbound.recv().await.unwrap()["result"],
        json!({"params": null})
    );
}

#[tokio::test]
async fn test_notification_dispatch_without_reply() {
    let (seen_tx, mut seen_rx) = mpsc::unbounded_channel();
    let registry = MethodRegistry::new().with_method("event", move |params| {
        let _ = seen_tx.send(params);
        Ok(Value::Null)
    });
    let (_responder, mut peer) = serve(registry);

    send(&peer, json!({"jsonrpc": "2.0", "id": null, "method": "event", "params": ["x"]}));

    assert_eq!(seen_rx.recv().await, Some(Some(json!(["x"]))));
    settle().await;
    assert_silent(&mut peer);
}
