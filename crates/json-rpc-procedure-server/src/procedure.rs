//! Callable targets and their declared parameters.
//!
//! A procedure declares its parameters once, as a [`Signature`], when it is
//! registered. The binder matches supplied values against that signature and
//! hands the procedure an [`Arguments`] value in declaration order.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{ArgumentError, RpcError, RpcResult};

/// One declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSpec {
    pub name: String,
    /// `Some` when the parameter may be omitted. A `null` default is still a default.
    pub default: Option<Value>,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default: None,
        }
    }

    pub fn optional(name: impl Into<String>, default: impl Into<Value>) -> Self {
        Self {
            name: name.into(),
            default: Some(default.into()),
        }
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

/// Ordered parameter list of a callable
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Signature {
    params: Vec<ParameterSpec>,
}

impl Signature {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter without a default
    pub fn required(mut self, name: impl Into<String>) -> Self {
        self.params.push(ParameterSpec::required(name));
        self
    }

    /// Append a parameter with a default
    pub fn optional(mut self, name: impl Into<String>, default: impl Into<Value>) -> Self {
        self.params.push(ParameterSpec::optional(name, default));
        self
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Number of parameters without a default
    pub fn required_count(&self) -> usize {
        self.params.iter().filter(|p| !p.has_default()).count()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|p| p.name == name)
    }
}

impl FromIterator<ParameterSpec> for Signature {
    fn from_iter<I: IntoIterator<Item = ParameterSpec>>(iter: I) -> Self {
        Self {
            params: iter.into_iter().collect(),
        }
    }
}

/// Bound argument values, one per declared parameter, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Arguments {
    names: Vec<String>,
    values: Vec<Value>,
}

impl Arguments {
    pub(crate) fn new(names: Vec<String>, values: Vec<Value>) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self { names, values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Raw value bound to `name`
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|index| &self.values[index])
    }

    /// Deserialize the value bound to `name`
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, ArgumentError> {
        let value = self
            .value(name)
            .ok_or_else(|| ArgumentError::UndefinedArgument {
                name: name.to_string(),
            })?;
        decode(name, value)
    }

    /// Deserialize the value bound to the parameter at `index`
    pub fn get_index<T: DeserializeOwned>(&self, index: usize) -> Result<T, ArgumentError> {
        let name = self
            .names
            .get(index)
            .ok_or_else(|| ArgumentError::UndefinedArgument {
                name: index.to_string(),
            })?;
        decode(name, &self.values[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.names.iter().map(String::as_str).zip(self.values.iter())
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

fn decode<T: DeserializeOwned>(name: &str, value: &Value) -> Result<T, ArgumentError> {
    T::deserialize(value).map_err(|e| ArgumentError::InvalidValue {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

type ProcedureFn = dyn Fn(Arguments) -> RpcResult<Value> + Send + Sync;

/// A free-standing callable with its declared parameters
#[derive(Clone)]
pub struct Procedure {
    signature: Signature,
    handler: Arc<ProcedureFn>,
}

impl Procedure {
    /// Wrap a closure. Its result is converted to JSON when it returns; a
    /// conversion failure is reported as an encoding failure.
    pub fn new<F, T>(signature: Signature, handler: F) -> Self
    where
        F: Fn(Arguments) -> RpcResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        Self {
            signature,
            handler: Arc::new(move |args| {
                let output = handler(args)?;
                serde_json::to_value(output).map_err(|e| RpcError::ResponseEncoding(e.to_string()))
            }),
        }
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    pub fn call(&self, args: Arguments) -> RpcResult<Value> {
        (self.handler)(args)
    }
}

impl fmt::Debug for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Procedure")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

/// An object exposing named methods.
///
/// State the methods share (for example what a before-hook records) lives
/// behind interior mutability, since calls receive `&self`.
pub trait RpcObject: Send + Sync {
    /// Declared parameters of `method`, or `None` if there is no such method
    fn signature(&self, method: &str) -> Option<Signature>;

    /// Invoke `method` with arguments already bound against its signature
    fn call(&self, method: &str, args: Arguments) -> RpcResult<Value>;
}

/// Builds a fresh instance for a type-name target
pub type ObjectFactory = Arc<dyn Fn() -> Arc<dyn RpcObject> + Send + Sync>;

/// How a registered procedure name resolves to executable code
#[derive(Clone)]
pub enum ProcedureTarget {
    /// A closure
    Function(Procedure),
    /// A method on an existing instance. The signature is looked up once at
    /// construction; `None` means the instance has no such method.
    Method {
        instance: Arc<dyn RpcObject>,
        method: String,
        signature: Option<Signature>,
    },
    /// A method on a type resolved by name when the procedure is called
    TypeMethod { type_name: String, method: String },
}

impl ProcedureTarget {
    pub fn function<F, T>(signature: Signature, handler: F) -> Self
    where
        F: Fn(Arguments) -> RpcResult<T> + Send + Sync + 'static,
        T: Serialize,
    {
        ProcedureTarget::Function(Procedure::new(signature, handler))
    }

    pub fn method(instance: Arc<dyn RpcObject>, method: impl Into<String>) -> Self {
        let method = method.into();
        let signature = instance.signature(&method);
        ProcedureTarget::Method {
            instance,
            method,
            signature,
        }
    }

    pub fn type_method(type_name: impl Into<String>, method: impl Into<String>) -> Self {
        ProcedureTarget::TypeMethod {
            type_name: type_name.into(),
            method: method.into(),
        }
    }
}

impl fmt::Debug for ProcedureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcedureTarget::Function(procedure) => {
                f.debug_tuple("Function").field(procedure).finish()
            }
            ProcedureTarget::Method {
                method, signature, ..
            } => f
                .debug_struct("Method")
                .field("method", method)
                .field("signature", signature)
                .finish_non_exhaustive(),
            ProcedureTarget::TypeMethod { type_name, method } => f
                .debug_struct("TypeMethod")
                .field("type_name", type_name)
                .field("method", method)
                .finish(),
        }
    }
}
