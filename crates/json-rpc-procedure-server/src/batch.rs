//! Batch requests: an ordered array of independent requests answered as one
//! array of responses.

use serde_json::Value;
use tracing::debug;

use crate::request::RequestParser;
use crate::response::{RenderedResponse, TransportHints};

/// True for a non-empty JSON array. An object is never a batch, whatever
/// its keys look like; an empty array is a single (invalid) request.
pub fn is_batch(payload: &Value) -> bool {
    payload.as_array().is_some_and(|items| !items.is_empty())
}

/// Fans a batch out to the [`RequestParser`], one element at a time
#[derive(Clone, Copy)]
pub struct BatchRequestParser<'a> {
    parser: RequestParser<'a>,
}

impl<'a> BatchRequestParser<'a> {
    pub fn new(parser: RequestParser<'a>) -> Self {
        Self { parser }
    }

    /// Process every element in order. Suppressed elements contribute
    /// nothing; if all are suppressed the body is empty rather than `[]`.
    /// A payload that is not an array is handled as a batch of one.
    pub fn parse(&self, payload: Value, content_type: &str) -> RenderedResponse {
        let payload = match payload {
            Value::Array(items) => items,
            other => vec![other],
        };
        let total = payload.len();
        let mut transport = TransportHints::new(content_type);
        let mut bodies = Vec::with_capacity(total);

        for element in payload {
            let rendered = self.parser.parse(element);
            if rendered.is_empty() {
                continue;
            }
            transport.merge(rendered.transport);
            bodies.push(rendered.body);
        }

        debug!(
            "Batch of {} requests produced {} responses",
            total,
            bodies.len()
        );

        let body = if bodies.is_empty() {
            String::new()
        } else {
            format!("[{}]", bodies.join(","))
        };
        RenderedResponse { body, transport }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{RpcError, RpcResult};
    use crate::middleware::{Credentials, MiddlewareHandler};
    use crate::procedure::Signature;
    use crate::registry::ProcedureRegistry;
    use crate::server::ServerConfig;
    use serde_json::json;

    fn registry() -> ProcedureRegistry {
        let mut registry = ProcedureRegistry::new();
        registry.register_fn("echo", Signature::new().required("value"), |args| {
            args.get::<Value>("value").map_err(RpcError::from)
        });
        registry
    }

    fn run(
        registry: &ProcedureRegistry,
        middleware: &MiddlewareHandler,
        payload: Value,
    ) -> RenderedResponse {
        let credentials = Credentials::anonymous();
        let config = ServerConfig::default();
        let parser = RequestParser::new(registry, middleware, &credentials, &config);
        BatchRequestParser::new(parser).parse(payload, &config.content_type)
    }

    #[test]
    fn test_is_batch() {
        assert!(is_batch(&json!([{"jsonrpc": "2.0", "method": "a"}])));
        assert!(is_batch(&json!([1, 2])));
        assert!(!is_batch(&json!([])));
        assert!(!is_batch(&json!({"0": "a", "1": "b"})));
        assert!(!is_batch(&json!({"jsonrpc": "2.0", "method": "a"})));
        assert!(!is_batch(&json!("[1]")));
    }

    #[test]
    fn test_all_notifications_yield_empty_body() {
        let rendered = run(
            &registry(),
            &MiddlewareHandler::new(),
            json!([
                {"jsonrpc": "2.0", "method": "echo", "params": [1]},
                {"jsonrpc": "2.0", "method": "echo", "params": [2]},
            ]),
        );
        assert_eq!(rendered.body, "");
        assert!(rendered.is_empty());
    }

    #[test]
    fn test_mixed_batch_keeps_order() {
        let rendered = run(
            &registry(),
            &MiddlewareHandler::new(),
            json!([
                {"jsonrpc": "2.0", "method": "echo", "params": ["a"], "id": 1},
                {"jsonrpc": "2.0", "method": "missing", "id": 2},
            ]),
        );
        assert_eq!(
            rendered.body,
            r#"[{"jsonrpc":"2.0","result":"a","id":1},{"jsonrpc":"2.0","error":{"code":-32601,"message":"Method not found"},"id":2}]"#
        );
    }

    #[test]
    fn test_malformed_element_does_not_abort_batch() {
        let rendered = run(
            &registry(),
            &MiddlewareHandler::new(),
            json!([
                1,
                {"jsonrpc": "2.0", "method": "echo", "params": {"value": true}, "id": "b"},
                {"jsonrpc": "2.0", "method": "missing"},
            ]),
        );
        assert_eq!(
            rendered.body,
            r#"[{"jsonrpc":"2.0","error":{"code":-32600,"message":"Invalid Request"},"id":null},{"jsonrpc":"2.0","result":true,"id":"b"}]"#
        );
    }

    #[test]
    fn test_transport_hints_merged_across_elements() {
        let mut middleware = MiddlewareHandler::new();
        middleware.push(|_: &Credentials, procedure: &str| -> RpcResult<()> {
            if procedure == "echo" {
                Err(RpcError::AccessDenied("echo is restricted".into()))
            } else {
                Ok(())
            }
        });

        let rendered = run(
            &registry(),
            &middleware,
            json!([
                {"jsonrpc": "2.0", "method": "missing", "id": 1},
                {"jsonrpc": "2.0", "method": "echo", "params": [1], "id": 2},
            ]),
        );
        assert_eq!(
            rendered.transport.status.as_deref(),
            Some("HTTP/1.0 403 Forbidden")
        );
        assert!(rendered.body.contains(r#""code":403"#));
    }
}
