//! # JSON-RPC Procedure Server Prelude
//!
//! This module provides convenient re-exports of the most commonly used types
//! from the JSON-RPC procedure server library.
//!
//! ```rust
//! use json_rpc_procedure_server::prelude::*;
//! ```

// Server entry point and configuration
pub use crate::server::{Server, ServerConfig};

// Procedures and registration
pub use crate::procedure::{Arguments, ParameterSpec, Procedure, ProcedureTarget, RpcObject, Signature};
pub use crate::registry::ProcedureRegistry;

// Middleware
pub use crate::middleware::{Credentials, Middleware, MiddlewareHandler};

// Errors
pub use crate::error::{ArgumentError, JsonRpcErrorCode, RpcError, RpcResult};

// Wire types
pub use crate::params::RequestParams;
pub use crate::response::{JsonRpcMessage, RenderedResponse, TransportHints};
pub use crate::types::RequestId;

// Standard error codes
pub use crate::error_codes::*;
