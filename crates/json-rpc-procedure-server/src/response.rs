//! Response envelopes and the builder that renders them to wire text.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{JsonRpcErrorObject, RpcError, TransportSignal};
use crate::server::ServerConfig;
use crate::types::{JsonRpcVersion, RequestId};

/// Last-resort body if even the Internal error envelope cannot be encoded
const INTERNAL_ERROR_BODY: &str =
    r#"{"jsonrpc":"2.0","error":{"code":-32603,"message":"Internal error"},"id":null}"#;

/// A successful JSON-RPC response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub result: Value,
    pub id: Option<RequestId>,
}

impl JsonRpcResponse {
    pub fn new(id: Option<RequestId>, result: Value) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            result,
            id,
        }
    }
}

/// JSON-RPC Error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    #[serde(rename = "jsonrpc")]
    pub version: JsonRpcVersion,
    pub error: JsonRpcErrorObject,
    pub id: Option<RequestId>,
}

impl JsonRpcError {
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorObject) -> Self {
        Self {
            version: JsonRpcVersion::V2_0,
            error,
            id,
        }
    }
}

/// Union type that represents either a successful response or an error response
/// This ensures JSON-RPC 2.0 compliance by keeping success and error responses separate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcMessage {
    /// Successful response with result field
    Response(JsonRpcResponse),
    /// Error response with error field
    Error(JsonRpcError),
}

impl JsonRpcMessage {
    pub fn is_error(&self) -> bool {
        matches!(self, JsonRpcMessage::Error(_))
    }

    pub fn id(&self) -> Option<&RequestId> {
        match self {
            JsonRpcMessage::Response(resp) => resp.id.as_ref(),
            JsonRpcMessage::Error(err) => err.id.as_ref(),
        }
    }
}

/// Status line and headers the transport should emit with a body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportHints {
    pub status: Option<String>,
    pub headers: BTreeMap<String, String>,
}

impl TransportHints {
    pub fn new(content_type: &str) -> Self {
        Self {
            status: None,
            headers: BTreeMap::from([("Content-Type".to_string(), content_type.to_string())]),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    fn apply(&mut self, signal: TransportSignal, realm: &str) {
        match signal {
            TransportSignal::None => {}
            TransportSignal::Unauthorized => {
                self.status = Some("HTTP/1.0 401 Unauthorized".to_string());
                self.headers.insert(
                    "WWW-Authenticate".to_string(),
                    format!("Basic realm=\"{}\"", realm),
                );
            }
            TransportSignal::Forbidden => {
                self.status = Some("HTTP/1.0 403 Forbidden".to_string());
            }
        }
    }

    /// Fold another element's hints into these. The first status set wins.
    pub fn merge(&mut self, other: TransportHints) {
        if self.status.is_none() {
            self.status = other.status;
        }
        for (name, value) in other.headers {
            self.headers.entry(name).or_insert(value);
        }
    }
}

/// Wire-ready output. An empty body means nothing is sent back.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderedResponse {
    pub body: String,
    pub transport: TransportHints,
}

impl RenderedResponse {
    /// Output for a suppressed notification
    pub fn empty(content_type: &str) -> Self {
        Self {
            body: String::new(),
            transport: TransportHints::new(content_type),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Outcome {
    Result(Value),
    Error(RpcError),
}

/// Renders one result or failure into a JSON-RPC envelope
#[derive(Debug, Clone)]
pub struct ResponseBuilder {
    id: Option<RequestId>,
    outcome: Outcome,
    content_type: String,
    auth_realm: String,
}

impl ResponseBuilder {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            id: None,
            outcome: Outcome::Result(Value::Null),
            content_type: config.content_type.clone(),
            auth_realm: config.auth_realm.clone(),
        }
    }

    pub fn with_id(mut self, id: Option<RequestId>) -> Self {
        self.id = id;
        self
    }

    pub fn with_result(mut self, result: Value) -> Self {
        self.outcome = Outcome::Result(result);
        self
    }

    pub fn with_error(mut self, error: RpcError) -> Self {
        self.outcome = Outcome::Error(error);
        self
    }

    /// Envelope plus transport hints, before encoding
    pub fn message(self) -> (JsonRpcMessage, TransportHints) {
        let mut transport = TransportHints::new(&self.content_type);
        let message = match self.outcome {
            Outcome::Result(result) => JsonRpcMessage::Response(JsonRpcResponse::new(self.id, result)),
            Outcome::Error(error) => {
                let disposition = error.classify();
                transport.apply(disposition.signal, &self.auth_realm);
                let id = if disposition.clears_id { None } else { self.id };
                JsonRpcMessage::Error(JsonRpcError::new(id, disposition.object))
            }
        };
        (message, transport)
    }

    pub fn build(self) -> RenderedResponse {
        let (message, transport) = self.message();
        let body = match serde_json::to_string(&message) {
            Ok(body) => body,
            Err(e) => {
                warn!("Failed to encode response, reporting Internal error: {}", e);
                encode_internal_error(message.id().cloned(), e.to_string())
            }
        };
        RenderedResponse { body, transport }
    }
}

/// Re-render an encoding failure once, without another fallback round
fn encode_internal_error(id: Option<RequestId>, detail: String) -> String {
    let disposition = RpcError::ResponseEncoding(detail).classify();
    serde_json::to_string(&JsonRpcError::new(id, disposition.object))
        .unwrap_or_else(|_| INTERNAL_ERROR_BODY.to_string())
}
