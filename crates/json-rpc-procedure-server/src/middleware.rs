//! Middleware run after a request passes shape validation and before its
//! procedure is dispatched.

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::error::RpcResult;

/// Credentials supplied by the transport (for example from HTTP basic auth)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// A check or side effect that runs before every dispatched procedure.
///
/// Returning an error aborts the request; the error is reported exactly as
/// if the procedure had raised it.
pub trait Middleware: Send + Sync {
    fn execute(&self, credentials: &Credentials, procedure: &str) -> RpcResult<()>;
}

impl<F> Middleware for F
where
    F: Fn(&Credentials, &str) -> RpcResult<()> + Send + Sync,
{
    fn execute(&self, credentials: &Credentials, procedure: &str) -> RpcResult<()> {
        self(credentials, procedure)
    }
}

/// Ordered middleware chain
#[derive(Clone, Default)]
pub struct MiddlewareHandler {
    middleware: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push<M>(&mut self, middleware: M)
    where
        M: Middleware + 'static,
    {
        self.middleware.push(Arc::new(middleware));
    }

    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Run every middleware in order, stopping at the first failure
    pub fn execute(&self, credentials: &Credentials, procedure: &str) -> RpcResult<()> {
        for (index, middleware) in self.middleware.iter().enumerate() {
            middleware.execute(credentials, procedure).inspect_err(|e| {
                debug!("Middleware #{} rejected {}: {}", index, procedure, e);
            })?;
        }
        Ok(())
    }
}

impl fmt::Debug for MiddlewareHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MiddlewareHandler")
            .field("len", &self.middleware.len())
            .finish()
    }
}
