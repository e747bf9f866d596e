use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{RpcError, RpcResult};

/// Arguments supplied with a request
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RequestParams {
    /// Positional parameters as an array
    Array(Vec<Value>),
    /// Named parameters as an object
    Object(HashMap<String, Value>),
}

impl RequestParams {
    /// Read the `params` member of a request. Absent or `null` means no
    /// arguments (an empty positional set); any scalar is a shape failure.
    pub fn from_member(member: Option<Value>) -> RpcResult<Self> {
        match member {
            None | Some(Value::Null) => Ok(RequestParams::default()),
            Some(Value::Array(values)) => Ok(RequestParams::Array(values)),
            Some(Value::Object(map)) => Ok(RequestParams::Object(map.into_iter().collect())),
            Some(other) => Err(RpcError::InvalidRpcFormat(format!(
                "params must be an array or an object, got {}",
                kind_of(&other)
            ))),
        }
    }

    /// An empty array counts as positional
    pub fn is_positional(&self) -> bool {
        matches!(self, RequestParams::Array(_))
    }

    /// Get a parameter by name (for object params)
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            RequestParams::Object(map) => map.get(key),
            RequestParams::Array(_) => None,
        }
    }

    /// Get a parameter by index (for array params)
    pub fn get_index(&self, index: usize) -> Option<&Value> {
        match self {
            RequestParams::Array(vec) => vec.get(index),
            RequestParams::Object(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RequestParams::Object(map) => map.len(),
            RequestParams::Array(vec) => vec.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RequestParams {
    fn default() -> Self {
        RequestParams::Array(Vec::new())
    }
}

impl From<HashMap<String, Value>> for RequestParams {
    fn from(map: HashMap<String, Value>) -> Self {
        RequestParams::Object(map)
    }
}

impl From<Vec<Value>> for RequestParams {
    fn from(vec: Vec<Value>) -> Self {
        RequestParams::Array(vec)
    }
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
