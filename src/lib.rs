pub mod config;
pub mod jsonrpc;

// 公開API
pub use config::{ConfigError, RequesterConfig};
pub use jsonrpc::{
    duplex, HandlerError, Id, MethodRegistry, Params, Request, RequestError, Requester,
    RequesterOptions, Responder, Response,
};
