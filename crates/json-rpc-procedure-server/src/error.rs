use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::error_codes;

/// Result alias used by procedures, middleware and the dispatch pipeline
pub type RpcResult<T> = Result<T, RpcError>;

/// JSON-RPC error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonRpcErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    Unauthorized,
    Forbidden,
    Custom(i64),
}

impl JsonRpcErrorCode {
    pub fn code(&self) -> i64 {
        match self {
            JsonRpcErrorCode::ParseError => error_codes::PARSE_ERROR,
            JsonRpcErrorCode::InvalidRequest => error_codes::INVALID_REQUEST,
            JsonRpcErrorCode::MethodNotFound => error_codes::METHOD_NOT_FOUND,
            JsonRpcErrorCode::InvalidParams => error_codes::INVALID_PARAMS,
            JsonRpcErrorCode::InternalError => error_codes::INTERNAL_ERROR,
            JsonRpcErrorCode::Unauthorized => error_codes::UNAUTHORIZED,
            JsonRpcErrorCode::Forbidden => error_codes::FORBIDDEN,
            JsonRpcErrorCode::Custom(code) => *code,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            JsonRpcErrorCode::ParseError => "Parse error",
            JsonRpcErrorCode::InvalidRequest => "Invalid Request",
            JsonRpcErrorCode::MethodNotFound => "Method not found",
            JsonRpcErrorCode::InvalidParams => "Invalid params",
            JsonRpcErrorCode::InternalError => "Internal error",
            JsonRpcErrorCode::Unauthorized => "Unauthorized",
            JsonRpcErrorCode::Forbidden => "Forbidden",
            JsonRpcErrorCode::Custom(_) => "Server error",
        }
    }
}

impl fmt::Display for JsonRpcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// JSON-RPC Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorObject {
    pub fn new(code: JsonRpcErrorCode, message: Option<String>, data: Option<Value>) -> Self {
        Self {
            code: code.code(),
            message: message.unwrap_or_else(|| code.message().to_string()),
            data: data.filter(|value| !is_empty_data(value)),
        }
    }

    /// Error object carrying the fixed message of a standard code
    pub fn standard(code: JsonRpcErrorCode) -> Self {
        Self::new(code, None, None)
    }

    /// Standard code and message with a detail payload
    pub fn with_detail(code: JsonRpcErrorCode, detail: impl Into<String>) -> Self {
        Self::new(code, None, Some(Value::String(detail.into())))
    }
}

/// `null`, `false`, zero, `""`, `"0"` and empty containers carry no data
fn is_empty_data(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.is_empty() || s == "0",
        Value::Array(items) => items.is_empty(),
        Value::Object(map) => map.is_empty(),
    }
}

/// An empty message falls back to the code's generic text
fn non_empty(message: &str) -> Option<String> {
    (!message.is_empty()).then(|| message.to_string())
}

/// Failures raised while binding supplied values to declared parameters
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArgumentError {
    #[error("Too many arguments")]
    TooManyArguments { accepted: usize, supplied: usize },

    #[error("Missing argument: {name}")]
    NotEnoughArguments { name: String },

    #[error("Undefined argument: {name}")]
    UndefinedArgument { name: String },

    #[error("Invalid value for argument {name}: {reason}")]
    InvalidValue { name: String, reason: String },
}

/// Every failure the pipeline knows how to report.
///
/// Procedure bodies and middleware return this type too, so an application
/// can raise any kind, including binding-style failures and authentication
/// failures, and have it rendered the same way as a pipeline failure.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RpcError {
    #[error("Malformed JSON payload: {0}")]
    InvalidJsonFormat(String),

    #[error("Malformed JSON-RPC request: {0}")]
    InvalidRpcFormat(String),

    #[error("Procedure not found: {0}")]
    ProcedureNotFound(String),

    #[error(transparent)]
    InvalidArguments(#[from] ArgumentError),

    #[error("Unable to encode response: {0}")]
    ResponseEncoding(String),

    #[error("Authentication failure: {0}")]
    AuthenticationFailure(String),

    #[error("Access denied: {0}")]
    AccessDenied(String),

    #[error("{message}")]
    Application {
        code: i64,
        message: String,
        data: Option<Value>,
    },

    #[error("{message}")]
    Other { code: i64, message: String },
}

/// What the transport collaborator should do besides sending the body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportSignal {
    None,
    Unauthorized,
    Forbidden,
}

/// Result of classifying an [`RpcError`] against the error table
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorDisposition {
    pub object: JsonRpcErrorObject,
    /// The response id must be `null` regardless of the request id
    pub clears_id: bool,
    pub signal: TransportSignal,
}

impl ErrorDisposition {
    fn new(object: JsonRpcErrorObject) -> Self {
        Self {
            object,
            clears_id: false,
            signal: TransportSignal::None,
        }
    }

    fn clearing_id(mut self) -> Self {
        self.clears_id = true;
        self
    }

    fn signalling(mut self, signal: TransportSignal) -> Self {
        self.signal = signal;
        self
    }
}

impl RpcError {
    /// Application error with its own code and message
    pub fn application(code: i64, message: impl Into<String>) -> Self {
        RpcError::Application {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Application error with its own code, message and data
    pub fn application_with_data(code: i64, message: impl Into<String>, data: Value) -> Self {
        RpcError::Application {
            code,
            message: message.into(),
            data: Some(data),
        }
    }

    /// Unclassified failure; reported with code 0
    pub fn other(message: impl Into<String>) -> Self {
        RpcError::Other {
            code: 0,
            message: message.into(),
        }
    }

    /// Protocol-shape failures are reported even for notifications
    pub fn is_protocol_shape(&self) -> bool {
        matches!(
            self,
            RpcError::InvalidJsonFormat(_) | RpcError::InvalidRpcFormat(_)
        )
    }

    /// Map this failure onto its error envelope contents
    pub fn classify(&self) -> ErrorDisposition {
        match self {
            RpcError::InvalidJsonFormat(_) => {
                ErrorDisposition::new(JsonRpcErrorObject::standard(JsonRpcErrorCode::ParseError))
                    .clearing_id()
            }
            RpcError::InvalidRpcFormat(_) => ErrorDisposition::new(JsonRpcErrorObject::standard(
                JsonRpcErrorCode::InvalidRequest,
            ))
            .clearing_id(),
            RpcError::ProcedureNotFound(_) => ErrorDisposition::new(
                JsonRpcErrorObject::standard(JsonRpcErrorCode::MethodNotFound),
            ),
            RpcError::InvalidArguments(cause) => ErrorDisposition::new(
                JsonRpcErrorObject::with_detail(JsonRpcErrorCode::InvalidParams, cause.to_string()),
            ),
            RpcError::ResponseEncoding(detail) => ErrorDisposition::new(
                JsonRpcErrorObject::with_detail(JsonRpcErrorCode::InternalError, detail.clone()),
            ),
            RpcError::AuthenticationFailure(_) => ErrorDisposition::new(
                JsonRpcErrorObject::standard(JsonRpcErrorCode::Unauthorized),
            )
            .signalling(TransportSignal::Unauthorized),
            RpcError::AccessDenied(_) => {
                ErrorDisposition::new(JsonRpcErrorObject::standard(JsonRpcErrorCode::Forbidden))
                    .signalling(TransportSignal::Forbidden)
            }
            RpcError::Application {
                code,
                message,
                data,
            } => ErrorDisposition::new(JsonRpcErrorObject::new(
                JsonRpcErrorCode::Custom(*code),
                non_empty(message),
                data.clone(),
            )),
            RpcError::Other { code, message } => ErrorDisposition::new(JsonRpcErrorObject::new(
                JsonRpcErrorCode::Custom(*code),
                non_empty(message),
                None,
            )),
        }
    }
}
