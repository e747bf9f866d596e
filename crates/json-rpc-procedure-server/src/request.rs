use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::error::{RpcError, RpcResult};
use crate::middleware::{Credentials, MiddlewareHandler};
use crate::params::{RequestParams, kind_of};
use crate::registry::ProcedureRegistry;
use crate::response::{RenderedResponse, ResponseBuilder};
use crate::server::ServerConfig;
use crate::types::RequestId;

/// One validated request, consumed once by the [`RequestParser`]
#[derive(Debug, Clone, PartialEq)]
pub struct RpcRequest {
    /// Echoed id; `None` if absent or neither a string nor a number
    pub id: Option<RequestId>,
    pub method: String,
    pub params: RequestParams,
    notification: bool,
}

impl RpcRequest {
    /// Validate the protocol shape of a decoded request object
    pub fn from_value(payload: Value) -> RpcResult<Self> {
        let mut object = match payload {
            Value::Object(object) => object,
            other => {
                return Err(RpcError::InvalidRpcFormat(format!(
                    "request must be an object, got {}",
                    kind_of(&other)
                )));
            }
        };

        match object.get("jsonrpc") {
            Some(Value::String(version)) if version == crate::JSONRPC_VERSION => {}
            _ => {
                return Err(RpcError::InvalidRpcFormat(
                    "jsonrpc must be \"2.0\"".to_string(),
                ));
            }
        }

        let method = match object.remove("method") {
            Some(Value::String(method)) if !method.is_empty() => method,
            _ => {
                return Err(RpcError::InvalidRpcFormat(
                    "method must be a non-empty string".to_string(),
                ));
            }
        };

        let params = RequestParams::from_member(object.remove("params"))?;
        let (id, notification) = read_id(&object);

        Ok(Self {
            id,
            method,
            params,
            notification,
        })
    }

    /// No response is expected for a notification
    pub fn is_notification(&self) -> bool {
        self.notification
    }
}

/// Only an absent id marks a notification; an explicit `null` is echoed back
fn read_id(object: &Map<String, Value>) -> (Option<RequestId>, bool) {
    match object.get("id") {
        None => (None, true),
        Some(value) => (RequestId::from_value(value), false),
    }
}

/// Runs one decoded request through validation, middleware and dispatch
#[derive(Clone, Copy)]
pub struct RequestParser<'a> {
    registry: &'a ProcedureRegistry,
    middleware: &'a MiddlewareHandler,
    credentials: &'a Credentials,
    config: &'a ServerConfig,
}

impl<'a> RequestParser<'a> {
    pub fn new(
        registry: &'a ProcedureRegistry,
        middleware: &'a MiddlewareHandler,
        credentials: &'a Credentials,
        config: &'a ServerConfig,
    ) -> Self {
        Self {
            registry,
            middleware,
            credentials,
            config,
        }
    }

    /// Process one request payload. The returned body is empty when the
    /// request was a notification and nothing must be sent back.
    pub fn parse(&self, payload: Value) -> RenderedResponse {
        let request = match RpcRequest::from_value(payload) {
            Ok(request) => request,
            Err(error) => {
                warn!("Rejecting malformed request: {}", error);
                return self.error_response(None, error);
            }
        };

        let notification = request.is_notification();
        let RpcRequest {
            id, method, params, ..
        } = request;

        match self.execute(&method, params) {
            Ok(_) if notification => {
                debug!("Notification {} handled, no response sent", method);
                RenderedResponse::empty(&self.config.content_type)
            }
            Ok(result) => ResponseBuilder::new(self.config)
                .with_id(id)
                .with_result(result)
                .build(),
            Err(error) if notification => {
                debug!("Suppressing error for notification {}: {}", method, error);
                RenderedResponse::empty(&self.config.content_type)
            }
            Err(error) => {
                debug!("Procedure {} failed: {}", method, error);
                self.error_response(id, error)
            }
        }
    }

    fn execute(&self, method: &str, params: RequestParams) -> RpcResult<Value> {
        self.middleware.execute(self.credentials, method)?;
        self.registry.dispatch(method, params)
    }

    fn error_response(&self, id: Option<RequestId>, error: RpcError) -> RenderedResponse {
        ResponseBuilder::new(self.config)
            .with_id(id)
            .with_error(error)
            .build()
    }
}
