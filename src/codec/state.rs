//! Contract state blob
//!
//! ```text
//! push(field_1) ‖ push(field_2) ‖ … ‖ push(field_N) ‖ len
//! ```
//!
//! `len` is a fixed-width sign-magnitude integer holding the byte length of
//! the pushes before it. The blob sits at the very end of a locking script,
//! after `OP_RETURN`, so a reader finds it by reading the suffix first.

use super::scalar::{decode_hex, decode_int, encode_int};
use super::script::{push_data, ChunkReader, OP_RETURN};
use crate::error::{Error, Result};
use crate::types::ScalarType;
use crate::value::{Scalar, Value};
use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Width of the trailing length field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LengthWidth {
    /// 1 byte
    One,
    /// 2 bytes
    #[default]
    Two,
    /// 4 bytes
    Four,
    /// 8 bytes
    Eight,
}

impl LengthWidth {
    /// Width in bytes
    pub fn bytes(&self) -> usize {
        match self {
            LengthWidth::One => 1,
            LengthWidth::Two => 2,
            LengthWidth::Four => 4,
            LengthWidth::Eight => 8,
        }
    }

    /// Width from a byte count
    pub fn from_bytes(n: usize) -> Option<LengthWidth> {
        match n {
            1 => Some(LengthWidth::One),
            2 => Some(LengthWidth::Two),
            4 => Some(LengthWidth::Four),
            8 => Some(LengthWidth::Eight),
            _ => None,
        }
    }
}

/// One declared state property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateField {
    /// Property name (flattened path for structured properties)
    pub name: String,
    /// Scalar type stored in the blob
    pub ty: ScalarType,
}

impl StateField {
    /// Create a field
    pub fn new(name: impl Into<String>, ty: ScalarType) -> Self {
        StateField {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered list of state properties a blob is decoded against
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StateSchema {
    fields: Vec<StateField>,
}

impl StateSchema {
    /// Schema from named fields, in blob order
    pub fn new(fields: Vec<StateField>) -> Self {
        StateSchema { fields }
    }

    /// Schema from types only; fields are named by position (`"0"`, `"1"`, ...)
    pub fn positional(types: &[ScalarType]) -> Self {
        StateSchema {
            fields: types
                .iter()
                .enumerate()
                .map(|(i, ty)| StateField::new(i.to_string(), *ty))
                .collect(),
        }
    }

    /// Schema with the names and types of a sample state
    pub fn from_sample(sample: &State) -> Self {
        StateSchema {
            fields: sample
                .iter()
                .map(|(name, value)| StateField::new(name, value.ty()))
                .collect(),
        }
    }

    /// Schema with the leaf paths and types of a structured sample value
    pub fn from_value(sample: &Value) -> Result<Self> {
        Ok(Self::from_sample(&State::from_value(sample)?))
    }

    /// Fields in blob order
    pub fn fields(&self) -> &[StateField] {
        &self.fields
    }

    /// Number of fields
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the schema has no fields
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Named state values, in declaration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct State {
    entries: Vec<(String, Scalar)>,
}

impl State {
    /// Empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style append
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Scalar>) -> Self {
        self.push(name, value);
        self
    }

    /// Append a property
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<Scalar>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Value of a property
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Properties in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Scalar)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no properties
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Values only, in order
    pub fn values(&self) -> Vec<Scalar> {
        self.entries.iter().map(|(_, v)| v.clone()).collect()
    }

    /// Leaves of a structured value, named by path (`a.b`, `a[0]`).
    ///
    /// Hashed-container values have no state form of their own and are
    /// rejected; declared contract state handles them through its schema.
    pub fn from_value(value: &Value) -> Result<Self> {
        let mut state = State::new();
        collect_leaves("", value, &mut state)?;
        Ok(state)
    }

    /// Rebuild a value shaped like `sample` from these leaves, in order
    pub fn to_value_like(&self, sample: &Value) -> Result<Value> {
        let mut leaves = self.entries.iter().map(|(_, v)| v.clone());
        let value = rebuild_like(sample, &mut leaves)?;
        if leaves.next().is_some() {
            return Err(Error::malformed_state(format!(
                "{} state values do not fit the sample shape",
                self.len()
            )));
        }
        Ok(value)
    }
}

fn child_path(path: &str, key: &str) -> String {
    if path.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", path, key)
    }
}

fn collect_leaves(path: &str, value: &Value, state: &mut State) -> Result<()> {
    match value {
        Value::Scalar(s) => state.push(path, s.clone()),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                collect_leaves(&format!("{}[{}]", path, i), item, state)?;
            }
        }
        Value::Object(fields) => {
            for (key, field) in fields {
                collect_leaves(&child_path(path, key), field, state)?;
            }
        }
        Value::Map(_) | Value::Set(_) => {
            return Err(Error::type_mismatch(path, "state value", value.type_name()));
        }
    }
    Ok(())
}

fn rebuild_like(sample: &Value, leaves: &mut dyn Iterator<Item = Scalar>) -> Result<Value> {
    match sample {
        Value::Scalar(s) => {
            let leaf = leaves
                .next()
                .ok_or_else(|| Error::malformed_state("fewer state values than the sample has"))?;
            Ok(Value::Scalar(leaf.retyped(s.ty())?))
        }
        Value::Array(items) => items
            .iter()
            .map(|item| rebuild_like(item, &mut *leaves))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(fields) => fields
            .iter()
            .map(|(key, field)| Ok((key.clone(), rebuild_like(field, &mut *leaves)?)))
            .collect::<Result<Vec<_>>>()
            .map(Value::Object),
        Value::Map(_) | Value::Set(_) => Err(Error::type_mismatch(
            "sample",
            "state value",
            sample.type_name(),
        )),
    }
}

impl<K: Into<String>> FromIterator<(K, Scalar)> for State {
    fn from_iter<I: IntoIterator<Item = (K, Scalar)>>(iter: I) -> Self {
        State {
            entries: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

/// Serializer/deserializer for a fixed length-suffix width
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateCodec {
    width: LengthWidth,
}

impl StateCodec {
    /// Codec using `width` for the length suffix
    pub fn new(width: LengthWidth) -> Self {
        StateCodec { width }
    }

    /// Length-suffix width
    pub fn width(&self) -> LengthWidth {
        self.width
    }

    /// Serialize `state` into a blob
    pub fn serialize(&self, state: &State) -> Result<Vec<u8>> {
        let mut blob = Vec::new();
        for (_, value) in state.iter() {
            push_data(&mut blob, &value.state_bytes());
        }
        let suffix = encode_int(&BigInt::from(blob.len()), Some(self.width.bytes()))?;
        blob.extend_from_slice(&suffix);

        tracing::debug!(
            fields = state.len(),
            bytes = blob.len(),
            "serialized state"
        );
        Ok(blob)
    }

    /// Serialize `state` into a hex blob
    pub fn serialize_hex(&self, state: &State) -> Result<String> {
        self.serialize(state).map(hex::encode)
    }

    /// Decode the blob at the end of `script` against `schema`.
    ///
    /// `script` may be the bare blob or a whole locking script ending in one.
    pub fn deserialize(&self, script: &[u8], schema: &StateSchema) -> Result<State> {
        let width = self.width.bytes();
        let suffix_start = script.len().checked_sub(width).ok_or_else(|| {
            Error::malformed_state(format!(
                "{} bytes cannot hold a {}-byte length suffix",
                script.len(),
                width
            ))
        })?;

        let declared = decode_int(&script[suffix_start..]);
        let region_len = match declared.to_usize() {
            Some(n) => n,
            None => {
                return Err(Error::malformed_state(format!(
                    "length suffix {} is not a valid length",
                    declared
                )))
            }
        };
        let region_start = suffix_start.checked_sub(region_len).ok_or_else(|| {
            Error::malformed_state(format!(
                "declared state length {} exceeds the {} bytes available",
                region_len, suffix_start
            ))
        })?;

        let chunks = ChunkReader::new(&script[region_start..suffix_start]).read_all()?;
        if chunks.len() != schema.len() {
            return Err(Error::malformed_state(format!(
                "expected {} state fields, found {}",
                schema.len(),
                chunks.len()
            )));
        }

        schema
            .fields()
            .iter()
            .zip(&chunks)
            .map(|(field, chunk)| {
                Scalar::from_chunk(field.ty, chunk).map(|v| (field.name.clone(), v))
            })
            .collect()
    }

    /// Decode a hex script against `schema`
    pub fn deserialize_hex(&self, script_hex: &str, schema: &StateSchema) -> Result<State> {
        self.deserialize(&decode_hex(script_hex)?, schema)
    }

    /// Serialize the leaves of a structured value
    pub fn serialize_value(&self, value: &Value) -> Result<Vec<u8>> {
        self.serialize(&State::from_value(value)?)
    }

    /// Decode the blob at the end of `script` into a value shaped like `sample`
    pub fn deserialize_value(&self, script: &[u8], sample: &Value) -> Result<Value> {
        self.deserialize(script, &StateSchema::from_value(sample)?)?
            .to_value_like(sample)
    }

    /// `code ‖ OP_RETURN ‖ blob`
    pub fn append_to(&self, code: &[u8], state: &State) -> Result<Vec<u8>> {
        let blob = self.serialize(state)?;
        let mut script = Vec::with_capacity(code.len() + 1 + blob.len());
        script.extend_from_slice(code);
        script.push(OP_RETURN);
        script.extend_from_slice(&blob);
        Ok(script)
    }
}

/// Serialize `state` with the given suffix width
pub fn serialize_state(state: &State, width: LengthWidth) -> Result<Vec<u8>> {
    StateCodec::new(width).serialize(state)
}

/// Decode the state at the end of `script`, typed after `sample`
pub fn deserialize_state(script: &[u8], sample: &State, width: LengthWidth) -> Result<State> {
    StateCodec::new(width).deserialize(script, &StateSchema::from_sample(sample))
}

/// Decode the state at the end of `script` into a value shaped like `sample`
pub fn deserialize_state_value(script: &[u8], sample: &Value, width: LengthWidth) -> Result<Value> {
    StateCodec::new(width).deserialize_value(script, sample)
}
