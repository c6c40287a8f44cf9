// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Runtime ABI handling for user-supplied contract interfaces.
//!
//! Function lookups return an [`AbiLookup`] instead of failing, so the clause
//! assembler can aggregate problems. Arguments arrive as JSON and are coerced
//! to the parameter types declared by the ABI.

use alloy::dyn_abi::{DynSolType, DynSolValue, EventExt, JsonAbiExt, Specifier};
use alloy::json_abi::{Event, Function, JsonAbi};
use alloy::primitives::{keccak256, Bytes, B256};
use serde_json::{Map, Value};

use super::client::ThorError;
use super::types::to_hex;

/// Result of looking up a function by name and arity.
#[derive(Debug, Clone, Copy)]
pub enum AbiLookup<'a> {
    Found(&'a Function),
    NotFound,
}

impl<'a> AbiLookup<'a> {
    pub fn found(self) -> Option<&'a Function> {
        match self {
            AbiLookup::Found(function) => Some(function),
            AbiLookup::NotFound => None,
        }
    }
}

/// Parse a JSON ABI given either as an array or as a string holding one.
pub fn parse_abi(value: &Value) -> Result<JsonAbi, ThorError> {
    let parsed = match value {
        Value::String(text) => serde_json::from_str::<JsonAbi>(text),
        other => serde_json::from_value::<JsonAbi>(other.clone()),
    };
    parsed.map_err(|e| ThorError::Encoding(format!("invalid ABI: {e}")))
}

/// Find a function by name, picking the overload with `arity` inputs.
pub fn find_function<'a>(abi: &'a JsonAbi, name: &str, arity: usize) -> AbiLookup<'a> {
    abi.function(name)
        .and_then(|overloads| overloads.iter().find(|f| f.inputs.len() == arity))
        .map(AbiLookup::Found)
        .unwrap_or(AbiLookup::NotFound)
}

/// ABI-encode a call (selector followed by arguments).
pub fn encode_function_call(function: &Function, args: &[Value]) -> Result<Bytes, ThorError> {
    if function.inputs.len() != args.len() {
        return Err(ThorError::Encoding(format!(
            "`{}` expects {} arguments, got {}",
            function.name,
            function.inputs.len(),
            args.len()
        )));
    }

    let values = function
        .inputs
        .iter()
        .zip(args)
        .enumerate()
        .map(|(i, (param, arg))| {
            let ty = param
                .resolve()
                .map_err(|e| ThorError::Encoding(format!("unsupported type `{}`: {e}", param.ty)))?;
            coerce_value(&ty, arg).map_err(|reason| {
                ThorError::Encoding(format!(
                    "argument {i} (`{}`) of `{}`: {reason}",
                    param.name, function.name
                ))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    function
        .abi_encode_input(&values)
        .map(Bytes::from)
        .map_err(|e| ThorError::Encoding(e.to_string()))
}

/// Look up `method` in a JSON ABI and encode a call to it.
pub fn encode_call_by_name(abi: &Value, method: &str, args: &[Value]) -> Result<Bytes, ThorError> {
    let abi = parse_abi(abi)?;
    match find_function(&abi, method, args.len()) {
        AbiLookup::Found(function) => encode_function_call(function, args),
        AbiLookup::NotFound => Err(ThorError::Encoding(format!(
            "function `{method}` with {} arguments not found in ABI",
            args.len()
        ))),
    }
}

/// Deployment payload: bytecode followed by encoded constructor arguments.
pub fn encode_deploy(
    bytecode: &Bytes,
    abi: Option<&Value>,
    args: &[Value],
) -> Result<Bytes, ThorError> {
    if bytecode.is_empty() {
        return Err(ThorError::Encoding("bytecode is empty".to_string()));
    }
    if args.is_empty() {
        return Ok(bytecode.clone());
    }

    let abi = abi
        .map(parse_abi)
        .transpose()?
        .ok_or_else(|| ThorError::Encoding("constructor arguments need an ABI".to_string()))?;
    let constructor = abi
        .constructor()
        .ok_or_else(|| ThorError::Encoding("ABI has no constructor".to_string()))?;
    if constructor.inputs.len() != args.len() {
        return Err(ThorError::Encoding(format!(
            "constructor expects {} arguments, got {}",
            constructor.inputs.len(),
            args.len()
        )));
    }

    let values = constructor
        .inputs
        .iter()
        .zip(args)
        .map(|(param, arg)| {
            let ty = param
                .resolve()
                .map_err(|e| ThorError::Encoding(format!("unsupported type `{}`: {e}", param.ty)))?;
            coerce_value(&ty, arg).map_err(|reason| {
                ThorError::Encoding(format!("constructor argument `{}`: {reason}", param.name))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    let encoded = constructor
        .abi_encode_input(&values)
        .map_err(|e| ThorError::Encoding(e.to_string()))?;

    let mut payload = bytecode.to_vec();
    payload.extend_from_slice(&encoded);
    Ok(payload.into())
}

/// Coerce a JSON value into a typed ABI value.
///
/// Arrays and tuples recurse element-wise; scalars go through the type's
/// string coercion so `"0x..."`, decimal strings and JSON numbers all work.
pub fn coerce_value(ty: &DynSolType, value: &Value) -> Result<DynSolValue, String> {
    match (ty, value) {
        (DynSolType::Array(inner), Value::Array(items)) => items
            .iter()
            .map(|item| coerce_value(inner, item))
            .collect::<Result<Vec<_>, _>>()
            .map(DynSolValue::Array),
        (DynSolType::FixedArray(inner, len), Value::Array(items)) => {
            if items.len() != *len {
                return Err(format!("expected {len} elements, got {}", items.len()));
            }
            items
                .iter()
                .map(|item| coerce_value(inner, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::FixedArray)
        }
        (DynSolType::Tuple(types), Value::Array(items)) => {
            if items.len() != types.len() {
                return Err(format!("expected {} tuple fields, got {}", types.len(), items.len()));
            }
            types
                .iter()
                .zip(items)
                .map(|(ty, item)| coerce_value(ty, item))
                .collect::<Result<Vec<_>, _>>()
                .map(DynSolValue::Tuple)
        }
        (_, Value::String(text)) => ty.coerce_str(text).map_err(|e| e.to_string()),
        (_, Value::Number(n)) => ty.coerce_str(&n.to_string()).map_err(|e| e.to_string()),
        (_, Value::Bool(b)) => ty
            .coerce_str(if *b { "true" } else { "false" })
            .map_err(|e| e.to_string()),
        _ => Err(format!("cannot encode {value} as `{}`", ty.sol_type_name())),
    }
}

// =============================================================================
// Events
// =============================================================================

/// Parse a human-readable event signature; the `event` keyword is optional.
pub fn parse_event(signature: &str) -> Result<Event, ThorError> {
    let trimmed = signature.trim();
    let text = if trimmed.starts_with("event ") {
        trimmed.to_string()
    } else {
        format!("event {trimmed}")
    };
    Event::parse(&text)
        .map_err(|e| ThorError::Encoding(format!("invalid event `{signature}`: {e}")))
}

/// Topic0 of an event: keccak256 of its canonical signature.
///
/// Signatures that do not parse are hashed verbatim.
pub fn event_topic(signature: &str) -> B256 {
    match parse_event(signature) {
        Ok(event) => event.selector(),
        Err(_) => keccak256(signature.trim().as_bytes()),
    }
}

/// Decode a log into named JSON fields.
///
/// Unnamed inputs are keyed by position.
pub fn decode_event(
    event: &Event,
    topics: &[B256],
    data: &[u8],
) -> Result<Map<String, Value>, ThorError> {
    let decoded = event
        .decode_log_parts(topics.iter().copied(), data)
        .map_err(|e| ThorError::Encoding(format!("cannot decode `{}`: {e}", event.name)))?;

    let mut indexed = decoded.indexed.into_iter();
    let mut body = decoded.body.into_iter();
    let mut fields = Map::new();
    for (i, input) in event.inputs.iter().enumerate() {
        let value = if input.indexed { indexed.next() } else { body.next() };
        let key = if input.name.is_empty() {
            i.to_string()
        } else {
            input.name.clone()
        };
        if let Some(value) = value {
            fields.insert(key, value_to_json(&value));
        }
    }
    Ok(fields)
}

/// Render an ABI value as JSON. Integers become decimal strings.
pub fn value_to_json(value: &DynSolValue) -> Value {
    match value {
        DynSolValue::Bool(b) => Value::Bool(*b),
        DynSolValue::Int(i, _) => Value::String(i.to_string()),
        DynSolValue::Uint(u, _) => Value::String(u.to_string()),
        DynSolValue::Address(a) => Value::String(to_hex(a)),
        DynSolValue::FixedBytes(word, size) => Value::String(to_hex(&word[..*size])),
        DynSolValue::Bytes(bytes) => Value::String(to_hex(bytes)),
        DynSolValue::String(s) => Value::String(s.clone()),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            Value::Array(items.iter().map(value_to_json).collect())
        }
        #[allow(unreachable_patterns)]
        other => other
            .as_word()
            .map(|word| Value::String(to_hex(word)))
            .unwrap_or(Value::Null),
    }
}
