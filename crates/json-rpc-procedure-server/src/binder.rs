//! Binding of supplied request arguments onto a declared [`Signature`].

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::ArgumentError;
use crate::params::RequestParams;
use crate::procedure::{Arguments, Signature};

/// Bind `params` against `signature`, filling omitted parameters from their
/// defaults.
pub fn bind(signature: &Signature, params: RequestParams) -> Result<Arguments, ArgumentError> {
    match params {
        RequestParams::Array(values) => bind_positional(signature, values),
        RequestParams::Object(values) => bind_named(signature, values),
    }
}

/// Supplied values map left to right onto parameters in declaration order.
pub fn bind_positional(
    signature: &Signature,
    supplied: Vec<Value>,
) -> Result<Arguments, ArgumentError> {
    if supplied.len() > signature.len() {
        debug!(
            "Positional binding rejected: {} values for {} parameters",
            supplied.len(),
            signature.len()
        );
        return Err(ArgumentError::TooManyArguments {
            accepted: signature.len(),
            supplied: supplied.len(),
        });
    }

    let mut supplied = supplied.into_iter();
    let mut names = Vec::with_capacity(signature.len());
    let mut values = Vec::with_capacity(signature.len());

    for param in signature.params() {
        let value = match supplied.next() {
            Some(value) => value,
            None => param
                .default
                .clone()
                .ok_or_else(|| ArgumentError::NotEnoughArguments {
                    name: param.name.clone(),
                })?,
        };
        names.push(param.name.clone());
        values.push(value);
    }

    Ok(Arguments::new(names, values))
}

/// Each supplied name must match a declared parameter; order is irrelevant.
pub fn bind_named(
    signature: &Signature,
    mut supplied: HashMap<String, Value>,
) -> Result<Arguments, ArgumentError> {
    // Smallest offending name keeps the reported failure stable across runs
    if let Some(unknown) = supplied
        .keys()
        .filter(|name| signature.position(name).is_none())
        .min()
    {
        debug!("Named binding rejected: undefined argument {}", unknown);
        return Err(ArgumentError::UndefinedArgument {
            name: unknown.clone(),
        });
    }

    let mut names = Vec::with_capacity(signature.len());
    let mut values = Vec::with_capacity(signature.len());

    for param in signature.params() {
        let value = supplied
            .remove(&param.name)
            .or_else(|| param.default.clone())
            .ok_or_else(|| ArgumentError::NotEnoughArguments {
                name: param.name.clone(),
            })?;
        names.push(param.name.clone());
        values.push(value);
    }

    Ok(Arguments::new(names, values))
}
