//! Server facade: configuration, registry and middleware behind one entry point.

use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::batch::{BatchRequestParser, is_batch};
use crate::error::RpcError;
use crate::middleware::{Credentials, Middleware, MiddlewareHandler};
use crate::registry::ProcedureRegistry;
use crate::request::RequestParser;
use crate::response::{RenderedResponse, ResponseBuilder};

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Method run on object targets, with the procedure name, before the target method
    pub before_hook: Option<String>,
    /// Realm announced in the `WWW-Authenticate` challenge
    pub auth_realm: String,
    /// `Content-Type` hint attached to every response
    pub content_type: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            before_hook: None,
            auth_realm: "JsonRPC".to_string(),
            content_type: "application/json".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn with_before_hook(mut self, hook_name: impl Into<String>) -> Self {
        self.before_hook = Some(hook_name.into());
        self
    }

    pub fn with_auth_realm(mut self, realm: impl Into<String>) -> Self {
        self.auth_realm = realm.into();
        self
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }
}

/// JSON-RPC server. Register procedures during setup, then call one of the
/// `execute*` methods per incoming payload.
#[derive(Default)]
pub struct Server {
    config: ServerConfig,
    registry: ProcedureRegistry,
    middleware: MiddlewareHandler,
}

impl Server {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ServerConfig) -> Self {
        let mut registry = ProcedureRegistry::new();
        if let Some(hook) = &config.before_hook {
            registry.set_before_hook(hook.clone());
        }
        Self {
            config,
            registry,
            middleware: MiddlewareHandler::new(),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn registry(&self) -> &ProcedureRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ProcedureRegistry {
        &mut self.registry
    }

    pub fn add_middleware<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.middleware.push(middleware);
    }

    /// Handle raw request text from an anonymous caller
    pub fn execute(&self, raw: &str) -> RenderedResponse {
        self.execute_with_credentials(raw, &Credentials::anonymous())
    }

    /// Handle raw request text; malformed JSON yields a Parse error
    pub fn execute_with_credentials(&self, raw: &str, credentials: &Credentials) -> RenderedResponse {
        match serde_json::from_str::<Value>(raw) {
            Ok(payload) => self.execute_value(payload, credentials),
            Err(e) => {
                warn!("Rejecting unparseable payload: {}", e);
                ResponseBuilder::new(&self.config)
                    .with_error(RpcError::InvalidJsonFormat(e.to_string()))
                    .build()
            }
        }
    }

    /// Handle an already decoded payload, single or batch
    pub fn execute_value(&self, payload: Value, credentials: &Credentials) -> RenderedResponse {
        let parser = RequestParser::new(&self.registry, &self.middleware, credentials, &self.config);

        if is_batch(&payload) {
            debug!("Processing batch request");
            return BatchRequestParser::new(parser).parse(payload, &self.config.content_type);
        }
        parser.parse(payload)
    }
}
