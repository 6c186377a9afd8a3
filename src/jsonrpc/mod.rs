//! JSON-RPC 2.0 Implementation
//!
//! 呼び出し側が用意した postMessage / onMessage の組の上で動く
//! JSON-RPC 2.0 のリクエスト送信側とレスポンス返却側の実装。
//!
//! ## 主要コンポーネント
//!
//! - [`types`]: JSON-RPC 2.0メッセージ型定義
//! - [`id`]: リクエストID生成戦略
//! - [`builder`]: メッセージ生成と標準エラーコード表
//! - [`classify`]: 受信メッセージの形状判定
//! - [`requester`]: リクエスト送信とレスポンスの突き合わせ、タイムアウト
//! - [`responder`]: メソッドハンドラへのディスパッチと応答
//! - [`transport`]: 送受信プリミティブとプロセス内チャンネル
//!
//! ## 使用例
//!
//! ```rust,no_run
//! use postrpc::jsonrpc::{duplex, MethodRegistry, Requester, RequesterOptions, Responder};
//! use serde_json::json;
//!
//! # async fn run() -> Result<(), postrpc::jsonrpc::RequestError> {
//! let (client, server) = duplex();
//! let (server_out, server_in) = server.split();
//! let _responder = Responder::new(
//!     MethodRegistry::new().with_method("ping", |_| Ok(json!("pong"))),
//!     server_out,
//!     server_in,
//! );
//!
//! let (client_out, client_in) = client.split();
//! let requester = Requester::new(RequesterOptions::new(), client_out, client_in);
//! let pong = requester.request("ping", None).await?;
//! assert_eq!(pong, json!("pong"));
//! # Ok(())
//! # }
//! ```

pub mod builder;
pub mod classify;
pub mod error;
pub mod handler;
pub mod id;
pub mod requester;
pub mod responder;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use builder::{
    create_error_response, create_request_with_id, create_standard_error_res,
    create_standard_error_response, create_success_response, JsonRpcBuilder, StandardError,
};
pub use classify::{is_request_shaped, is_response_shaped};
pub use error::{BuilderError, HandlerError, RequestError, ResponseError, TimeoutError};
pub use handler::{HandlerResult, MethodHandler, MethodOutput, MethodRegistry};
pub use id::{
    CounterIdGenerator, IdGenerator, IdGeneratorOption, IdStrategy, TimestampIdGenerator,
    TimestampWithRandomIdGenerator, UuidV4IdGenerator,
};
pub use requester::{Requester, RequesterOptions, ResponseFuture, DEFAULT_TIMEOUT_MESSAGE};
pub use responder::Responder;
pub use transport::{duplex, ChannelSink, Endpoint, ManualInbound, OnMessage, PostMessage};
pub use types::{ErrorObject, Id, Params, Request, Response, Version, JSONRPC_VERSION};
