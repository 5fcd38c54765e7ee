//! Argument values
//!
//! A [`Value`] is the caller-owned argument tree handed to the coder: scalars
//! at the leaves, arrays, keyed objects for structs and property-style
//! libraries, and maps/sets for the built-in hashed containers.

pub mod json;

use crate::codec::scalar::{decode_bool, decode_hex, decode_int, encode_script_num};
use crate::codec::script::Chunk;
use crate::error::{Error, Result};
use crate::types::{DataKind, ScalarType, TypeExpr};
use num_bigint::BigInt;
use num_traits::Zero;
use std::fmt;

/// Payload of a scalar
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarData {
    /// Arbitrary-precision integer
    Int(BigInt),
    /// Boolean
    Bool(bool),
    /// Byte string
    Bytes(Vec<u8>),
}

impl ScalarData {
    fn kind(&self) -> DataKind {
        match self {
            ScalarData::Int(_) => DataKind::Int,
            ScalarData::Bool(_) => DataKind::Bool,
            ScalarData::Bytes(_) => DataKind::Bytes,
        }
    }
}

/// A typed leaf value
///
/// The payload always matches the type's [`DataKind`]; the constructors
/// enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Scalar {
    ty: ScalarType,
    data: ScalarData,
}

impl Scalar {
    /// `int` scalar
    pub fn int(n: impl Into<BigInt>) -> Self {
        Scalar {
            ty: ScalarType::Int,
            data: ScalarData::Int(n.into()),
        }
    }

    /// `bool` scalar
    pub fn bool(flag: bool) -> Self {
        Scalar {
            ty: ScalarType::Bool,
            data: ScalarData::Bool(flag),
        }
    }

    /// `bytes` scalar
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Scalar {
            ty: ScalarType::Bytes,
            data: ScalarData::Bytes(bytes.into()),
        }
    }

    /// Scalar of any type; fails if the payload does not fit the type
    pub fn new(ty: ScalarType, data: ScalarData) -> Result<Self> {
        if ty.data_kind() != data.kind() {
            return Err(Error::type_mismatch(
                ty.name(),
                ty.name(),
                format!("{:?} payload", data.kind()).to_lowercase(),
            ));
        }
        Ok(Scalar { ty, data })
    }

    /// Byte-backed scalar from a hex string
    pub fn from_hex(ty: ScalarType, hex: &str) -> Result<Self> {
        Scalar::new(ty, ScalarData::Bytes(decode_hex(hex)?))
    }

    /// Declared scalar type
    pub fn ty(&self) -> ScalarType {
        self.ty
    }

    /// Payload
    pub fn data(&self) -> &ScalarData {
        &self.data
    }

    /// Integer payload, for `int` and `PrivKey`
    pub fn as_int(&self) -> Option<&BigInt> {
        match &self.data {
            ScalarData::Int(n) => Some(n),
            _ => None,
        }
    }

    /// Boolean payload
    pub fn as_bool(&self) -> Option<bool> {
        match self.data {
            ScalarData::Bool(b) => Some(b),
            _ => None,
        }
    }

    /// Byte payload, for `bytes` and the byte-backed wrappers
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.data {
            ScalarData::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Canonical source literal; parsing it yields this scalar again
    pub fn to_literal(&self) -> String {
        let inner = match &self.data {
            ScalarData::Int(n) => n.to_string(),
            ScalarData::Bool(b) => b.to_string(),
            ScalarData::Bytes(b) => format!("b'{}'", hex::encode(b)),
        };
        if self.ty.is_wrapper() {
            format!("{}({})", self.ty.name(), inner)
        } else {
            inner
        }
    }

    /// ASM token for a locking-script template
    pub fn to_asm(&self) -> String {
        match &self.data {
            ScalarData::Int(n) if n.is_zero() => "00".to_string(),
            ScalarData::Int(n) => hex::encode(encode_script_num(n)),
            ScalarData::Bool(true) => "OP_TRUE".to_string(),
            ScalarData::Bool(false) => "OP_FALSE".to_string(),
            ScalarData::Bytes(b) if b.is_empty() => "OP_0".to_string(),
            ScalarData::Bytes(b) => hex::encode(b),
        }
    }

    /// Bytes pushed for this scalar inside a state blob
    pub fn state_bytes(&self) -> Vec<u8> {
        match &self.data {
            ScalarData::Int(n) => encode_script_num(n),
            ScalarData::Bool(b) => vec![u8::from(*b)],
            ScalarData::Bytes(b) => b.clone(),
        }
    }

    /// Rebuild a scalar of type `ty` from one decoded state push
    pub fn from_chunk(ty: ScalarType, chunk: &Chunk) -> Result<Self> {
        let data = match (ty.data_kind(), chunk) {
            (DataKind::Int, Chunk::Data(bytes)) => ScalarData::Int(decode_int(bytes)),
            (DataKind::Int, Chunk::SmallInt(n)) => ScalarData::Int(BigInt::from(*n)),
            (DataKind::Bool, Chunk::Data(bytes)) => ScalarData::Bool(decode_bool(bytes)?),
            (DataKind::Bool, Chunk::SmallInt(1)) => ScalarData::Bool(true),
            (DataKind::Bool, Chunk::SmallInt(n)) => {
                return Err(Error::malformed_state(format!(
                    "small integer {} is not a boolean",
                    n
                )))
            }
            (DataKind::Bytes, Chunk::Data(bytes)) => ScalarData::Bytes(bytes.clone()),
            (DataKind::Bytes, Chunk::SmallInt(n)) => {
                ScalarData::Bytes(encode_script_num(&BigInt::from(*n)))
            }
        };
        Ok(Scalar { ty, data })
    }

    /// Re-tag the payload with another type of the same representation
    pub fn retyped(&self, ty: ScalarType) -> Result<Self> {
        Scalar::new(ty, self.data.clone())
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_literal())
    }
}

/// Argument tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// Leaf scalar
    Scalar(Scalar),
    /// Fixed-size array, or positional library arguments
    Array(Vec<Value>),
    /// Struct or property-style library, keys in caller order
    Object(Vec<(String, Value)>),
    /// `HashedMap` entries
    Map(Vec<(Value, Value)>),
    /// `HashedSet` elements
    Set(Vec<Value>),
}

impl Value {
    /// Int leaf
    pub fn int(n: impl Into<BigInt>) -> Self {
        Value::Scalar(Scalar::int(n))
    }

    /// Bool leaf
    pub fn bool(flag: bool) -> Self {
        Value::Scalar(Scalar::bool(flag))
    }

    /// Bytes leaf
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Scalar(Scalar::bytes(bytes))
    }

    /// Array from values
    pub fn array(values: impl IntoIterator<Item = Value>) -> Self {
        Value::Array(values.into_iter().collect())
    }

    /// Object from `(key, value)` pairs
    pub fn object<K: Into<String>>(fields: impl IntoIterator<Item = (K, Value)>) -> Self {
        Value::Object(fields.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Parse a JSON argument, see [`json::from_json`]
    pub fn from_json(json: &serde_json::Value) -> Result<Self> {
        json::from_json(json)
    }

    /// Render as JSON, see [`json::to_json`]
    pub fn to_json(&self) -> serde_json::Value {
        json::to_json(self)
    }

    /// Short description of the value's shape, used in diagnostics
    pub fn type_name(&self) -> String {
        match self {
            Value::Scalar(s) => s.ty().name().to_string(),
            Value::Array(items) => format!("array of {}", items.len()),
            Value::Object(_) => "object".to_string(),
            Value::Map(_) => "map".to_string(),
            Value::Set(_) => "set".to_string(),
        }
    }

    /// Leaf scalar, if this is one
    pub fn as_scalar(&self) -> Option<&Scalar> {
        match self {
            Value::Scalar(s) => Some(s),
            _ => None,
        }
    }

    /// Field of an object by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(fields) => fields.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Concrete type observable from the value alone.
    ///
    /// Scalars report their type; non-empty homogeneous arrays report
    /// `elem[len]`; containers report `HashedMap<K,V>` / `HashedSet<E>` from
    /// their first entry. Objects and empty collections carry no type.
    pub fn infer_type(&self) -> Option<TypeExpr> {
        match self {
            Value::Scalar(s) => Some(TypeExpr::scalar(s.ty())),
            Value::Array(items) => {
                let first = items.first()?.infer_type()?;
                if items[1..].iter().any(|v| v.infer_type().as_ref() != Some(&first)) {
                    return None;
                }
                Some(first.with_outer_dims(&[items.len()]))
            }
            Value::Map(entries) => {
                let (k, v) = entries.first()?;
                Some(TypeExpr {
                    name: "HashedMap".to_string(),
                    args: vec![k.infer_type()?, v.infer_type()?],
                    dims: Vec::new(),
                })
            }
            Value::Set(items) => Some(TypeExpr {
                name: "HashedSet".to_string(),
                args: vec![items.first()?.infer_type()?],
                dims: Vec::new(),
            }),
            Value::Object(_) => None,
        }
    }
}

impl From<i64> for Scalar {
    fn from(n: i64) -> Self {
        Scalar::int(n)
    }
}

impl From<i32> for Scalar {
    fn from(n: i32) -> Self {
        Scalar::int(n)
    }
}

impl From<BigInt> for Scalar {
    fn from(n: BigInt) -> Self {
        Scalar::int(n)
    }
}

impl From<bool> for Scalar {
    fn from(b: bool) -> Self {
        Scalar::bool(b)
    }
}

impl From<Scalar> for Value {
    fn from(s: Scalar) -> Self {
        Value::Scalar(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::int(n)
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::int(n)
    }
}

impl From<BigInt> for Value {
    fn from(n: BigInt) -> Self {
        Value::int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::bool(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(values)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Scalar(s) => write!(f, "{}", s),
            Value::Array(items) | Value::Set(items) => {
                write!(f, "[")?;
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", v)?;
                }
                write!(f, "]")
            }
            Value::Object(fields) => {
                write!(f, "{{")?;
                for (i, (k, v)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} => {}", k, v)?;
                }
                write!(f, "}}")
            }
        }
    }
}
