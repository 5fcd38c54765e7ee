//! JSON argument bridge
//!
//! JSON numbers become `int` scalars and JSON strings are parsed as literals,
//! so `"b'00ff'"`, `"PubKey(b'02..')"` and big integers written as strings
//! all work. Objects become [`Value::Object`]. Hashed-container values have
//! no JSON form here and are built with [`Value::Map`] / [`Value::Set`].

use super::{Scalar, ScalarData, Value};
use crate::error::{Error, Result};
use crate::lexer::parse_literal;
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde_json::Value as Json;

/// Convert a JSON argument into a [`Value`]
pub fn from_json(json: &Json) -> Result<Value> {
    match json {
        Json::Null => Err(Error::parse("null", "null is not an argument value")),
        Json::Bool(b) => Ok(Value::bool(*b)),
        Json::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(Value::int(i))
            } else if let Some(u) = n.as_u64() {
                Ok(Value::int(u))
            } else {
                Err(Error::parse(n.to_string(), "only integers are supported"))
            }
        }
        Json::String(s) => Ok(Value::Scalar(parse_literal(s)?.value)),
        Json::Array(items) => items.iter().map(from_json).collect::<Result<Vec<_>>>().map(Value::Array),
        Json::Object(map) => map
            .iter()
            .map(|(k, v)| Ok((k.clone(), from_json(v)?)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Object),
    }
}

/// Convert a JSON argument list into values
pub fn from_json_args(args: &[Json]) -> Result<Vec<Value>> {
    args.iter().map(from_json).collect()
}

/// Render a [`Value`] as JSON.
///
/// Integers that fit an `i64` become numbers, other scalars their canonical
/// literal string, so [`from_json`] reads scalars, arrays and objects back
/// unchanged. Maps become arrays of `[key, value]` pairs and sets plain
/// arrays; both read back as [`Value::Array`].
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Scalar(s) => scalar_to_json(s),
        Value::Array(items) | Value::Set(items) => Json::Array(items.iter().map(to_json).collect()),
        Value::Object(fields) => Json::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), to_json(v)))
                .collect(),
        ),
        Value::Map(entries) => Json::Array(
            entries
                .iter()
                .map(|(k, v)| Json::Array(vec![to_json(k), to_json(v)]))
                .collect(),
        ),
    }
}

fn scalar_to_json(s: &Scalar) -> Json {
    match s.data() {
        ScalarData::Bool(b) if !s.ty().is_wrapper() => Json::Bool(*b),
        ScalarData::Int(n) if !s.ty().is_wrapper() => match small_int(n) {
            Some(i) => Json::from(i),
            None => Json::String(s.to_literal()),
        },
        _ => Json::String(s.to_literal()),
    }
}

fn small_int(n: &BigInt) -> Option<i64> {
    n.to_i64()
}
