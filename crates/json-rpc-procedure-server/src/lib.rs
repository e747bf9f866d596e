//! # JSON-RPC 2.0 Procedure Server
//!
//! A transport-agnostic JSON-RPC 2.0 request pipeline. Raw or already decoded
//! payloads go in, wire-ready response text (plus transport hints) comes out.
//!
//! ## Features
//! - Named procedures backed by closures, object methods, or type-name factories
//! - Positional and named argument binding against declared parameters with defaults
//! - Optional before-hook on object targets and a middleware chain
//! - Batch requests with notification suppression
//! - A closed error taxonomy mapped onto JSON-RPC error envelopes
//!
//! ```rust
//! use json_rpc_procedure_server::prelude::*;
//!
//! let mut server = Server::new();
//! server.registry_mut().register_fn(
//!     "add",
//!     Signature::new().required("a").optional("b", 1),
//!     |args: Arguments| -> RpcResult<i64> { Ok(args.get::<i64>("a")? + args.get::<i64>("b")?) },
//! );
//!
//! let response = server.execute(r#"{"jsonrpc":"2.0","method":"add","params":[41],"id":7}"#);
//! assert_eq!(response.body, r#"{"jsonrpc":"2.0","result":42,"id":7}"#);
//! ```

pub mod batch;
pub mod binder;
pub mod error;
pub mod middleware;
pub mod params;
pub mod prelude;
pub mod procedure;
pub mod registry;
pub mod request;
pub mod response;
pub mod server;
pub mod types;

// Re-export main types
pub use batch::{BatchRequestParser, is_batch};
pub use error::{ArgumentError, JsonRpcErrorCode, JsonRpcErrorObject, RpcError, RpcResult};
pub use middleware::{Credentials, Middleware, MiddlewareHandler};
pub use params::RequestParams;
pub use procedure::{Arguments, ParameterSpec, Procedure, ProcedureTarget, RpcObject, Signature};
pub use registry::ProcedureRegistry;
pub use request::{RequestParser, RpcRequest};
pub use response::{JsonRpcMessage, RenderedResponse, ResponseBuilder, TransportHints};
pub use server::{Server, ServerConfig};
pub use types::{JsonRpcVersion, RequestId};

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;

    // Transport-level failures reported through the error envelope
    pub const UNAUTHORIZED: i64 = 401;
    pub const FORBIDDEN: i64 = 403;
}
