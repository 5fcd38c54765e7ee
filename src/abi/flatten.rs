//! Structure flattening
//!
//! Decomposes a structured argument into scalar leaves in declaration order:
//!
//! ```text
//! p: Point {x: 3, y: true}      ->  p.x: int = 3, p.y: bool = true
//! a: int[2][2] [[1,2],[3,4]]    ->  a[0][0], a[0][1], a[1][0], a[1][1]
//! m: HashedMap<int,int> {...}   ->  m._data: bytes
//! ```
//!
//! With no value supplied (shape-only mode) the same walk yields paths and
//! types without values, which is what tooling needs to describe an interface.

use crate::codec::script::push_data;
use crate::error::{Error, Result, ShapeDetail};
use crate::types::{
    ContainerKind, GenericDeducer, Param, ScalarType, TemplateEntity, TypeExpr, TypeResolver,
    CONTAINER_DATA_FIELD,
};
use crate::value::{Scalar, Value};
use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashSet;

/// Deepest struct/array/library nesting walked before giving up
pub const MAX_NESTING_DEPTH: usize = 64;

/// A scalar leaf of a flattened argument
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatArg {
    /// Diagnostic path: `s.x`, `a[0]`, `lib.x`
    pub path: String,
    /// Declared scalar type
    pub ty: ScalarType,
    /// Leaf value, absent in shape-only mode
    pub value: Option<Scalar>,
}

/// How library arguments are matched against the declaration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibraryMode {
    /// Positional array matched against constructor params
    #[default]
    Constructor,
    /// Keyed object matched against properties
    Properties,
}

/// Walks arguments against declared types
pub struct Flattener<'a> {
    resolver: &'a TypeResolver,
    mode: LibraryMode,
}

impl<'a> Flattener<'a> {
    /// Create a flattener
    pub fn new(resolver: &'a TypeResolver, mode: LibraryMode) -> Self {
        Flattener { resolver, mode }
    }

    /// Flatten `value`, declared as `name: ty`
    pub fn flatten(&self, name: &str, ty: &TypeExpr, value: &Value) -> Result<Vec<FlatArg>> {
        let mut out = Vec::new();
        self.visit(name, ty, Some(value), 0, &mut out)?;
        Ok(out)
    }

    /// Leaf paths and types of `name: ty`, without values
    pub fn flatten_shape(&self, name: &str, ty: &TypeExpr) -> Result<Vec<FlatArg>> {
        let mut out = Vec::new();
        self.visit(name, ty, None, 0, &mut out)?;
        Ok(out)
    }

    /// Flatten a keyed object against a list of top-level slots.
    ///
    /// Slot paths are the bare slot names; `None` yields the shape only.
    pub fn flatten_slots(&self, slots: &[Param], value: Option<&Value>) -> Result<Vec<FlatArg>> {
        let mut out = Vec::new();
        self.visit_keyed("", "object", slots, value, 0, &mut out)?;
        Ok(out)
    }

    /// Rebuild a keyed object over `slots` from leaves in flattening order.
    ///
    /// Inverse of [`Flattener::flatten_slots`]: structs and property-style
    /// libraries become objects, arrays and positional libraries arrays.
    /// A hashed container comes back as its `_data` bytes leaf, since the
    /// entries cannot be recovered from their hashes.
    pub fn unflatten_slots(
        &self,
        slots: &[Param],
        leaves: impl IntoIterator<Item = Scalar>,
    ) -> Result<Value> {
        let mut leaves = leaves.into_iter();
        let mut fields = Vec::with_capacity(slots.len());
        for slot in slots {
            let value = self.rebuild(&slot.name, &slot.ty, &mut leaves, 0)?;
            fields.push((slot.name.clone(), value));
        }
        if leaves.next().is_some() {
            return Err(Error::malformed_state("more leaves than declared properties"));
        }
        Ok(Value::Object(fields))
    }

    fn rebuild(
        &self,
        path: &str,
        ty: &TypeExpr,
        leaves: &mut dyn Iterator<Item = Scalar>,
        depth: usize,
    ) -> Result<Value> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::resolution(
                ty.to_string(),
                format!("`{}` nests too deeply", path),
            ));
        }
        let ty = self.resolver.resolve_type(ty)?;

        if let Some(element) = ty.element() {
            return (0..ty.dims[0])
                .map(|i| self.rebuild(&format!("{}[{}]", path, i), &element, &mut *leaves, depth + 1))
                .collect::<Result<Vec<_>>>()
                .map(Value::Array);
        }

        let container = self
            .resolver
            .library_entity(&ty.name)
            .and_then(|l| l.container_kind());
        let leaf_type = match (ty.scalar_type(), container) {
            (Some(scalar), _) => Some(scalar),
            (None, Some(_)) => Some(ScalarType::Bytes),
            (None, None) => None,
        };
        if let Some(scalar) = leaf_type {
            let leaf = leaves
                .next()
                .ok_or_else(|| Error::malformed_state(format!("no value for `{}`", path)))?;
            let leaf = if leaf.ty() == scalar { leaf } else { leaf.retyped(scalar)? };
            return Ok(Value::Scalar(leaf));
        }

        match self.instantiate(path, &ty, None)? {
            TemplateEntity::Struct(s) => self
                .rebuild_slots(path, &s.fields, leaves, depth)
                .map(Value::Object),
            TemplateEntity::Library(l) => match self.mode {
                LibraryMode::Constructor => self
                    .rebuild_slots(path, &l.params, leaves, depth)
                    .map(|fields| Value::Array(fields.into_iter().map(|(_, v)| v).collect())),
                LibraryMode::Properties => self
                    .rebuild_slots(path, &l.properties, leaves, depth)
                    .map(Value::Object),
            },
        }
    }

    fn rebuild_slots(
        &self,
        path: &str,
        slots: &[Param],
        leaves: &mut dyn Iterator<Item = Scalar>,
        depth: usize,
    ) -> Result<Vec<(String, Value)>> {
        let mut fields = Vec::with_capacity(slots.len());
        for slot in slots {
            let child = format!("{}.{}", path, slot.name);
            let value = self.rebuild(&child, &slot.ty, &mut *leaves, depth + 1)?;
            fields.push((slot.name.clone(), value));
        }
        Ok(fields)
    }

    fn visit(
        &self,
        path: &str,
        ty: &TypeExpr,
        value: Option<&Value>,
        depth: usize,
        out: &mut Vec<FlatArg>,
    ) -> Result<()> {
        if depth > MAX_NESTING_DEPTH {
            return Err(Error::resolution(
                ty.to_string(),
                format!("`{}` nests too deeply", path),
            ));
        }
        let ty = self.resolver.resolve_type(ty)?;
        tracing::trace!(path, ty = %ty, "flatten");

        if let Some(element) = ty.element() {
            return self.visit_array(path, &ty, &element, value, depth, out);
        }

        if let Some(scalar) = ty.scalar_type() {
            let value = match value {
                None => None,
                Some(Value::Scalar(s)) if s.ty() == scalar => Some(s.clone()),
                Some(Value::Scalar(s)) => {
                    return Err(Error::type_mismatch(path, scalar.name(), s.ty().name()))
                }
                Some(other) => {
                    return Err(Error::type_mismatch(path, scalar.name(), other.type_name()))
                }
            };
            out.push(FlatArg {
                path: path.to_string(),
                ty: scalar,
                value,
            });
            return Ok(());
        }

        if let Some(kind) = self
            .resolver
            .library_entity(&ty.name)
            .and_then(|l| l.container_kind())
        {
            return self.visit_container(path, kind, &ty, value, depth, out);
        }

        let entity = self.instantiate(path, &ty, value)?;
        match &entity {
            TemplateEntity::Struct(s) => {
                self.visit_keyed(path, &s.name, &s.fields, value, depth, out)
            }
            TemplateEntity::Library(l) => match self.mode {
                LibraryMode::Constructor => {
                    self.visit_positional(path, &l.name, &l.params, value, depth, out)
                }
                LibraryMode::Properties => {
                    self.visit_keyed(path, &l.name, &l.properties, value, depth, out)
                }
            },
        }
    }

    fn visit_array(
        &self,
        path: &str,
        ty: &TypeExpr,
        element: &TypeExpr,
        value: Option<&Value>,
        depth: usize,
        out: &mut Vec<FlatArg>,
    ) -> Result<()> {
        let size = ty.dims[0];
        match value {
            None => {
                for i in 0..size {
                    self.visit(&format!("{}[{}]", path, i), element, None, depth + 1, out)?;
                }
                Ok(())
            }
            Some(Value::Array(items)) => {
                if items.len() != size {
                    return Err(Error::length_mismatch(path, size, items.len()));
                }
                for (i, item) in items.iter().enumerate() {
                    self.visit(&format!("{}[{}]", path, i), element, Some(item), depth + 1, out)?;
                }
                Ok(())
            }
            Some(other) => Err(Error::type_mismatch(path, ty.to_string(), other.type_name())),
        }
    }

    /// Bind the generic parameters of the struct or library named by `ty`,
    /// inferring them from `value` when the type carries no arguments.
    fn instantiate(&self, path: &str, ty: &TypeExpr, value: Option<&Value>) -> Result<TemplateEntity> {
        let deducer = GenericDeducer::new(self.resolver);
        let template = self
            .resolver
            .template(&ty.name)
            .ok_or_else(|| Error::resolution(&ty.name, "not a struct or library"))?;

        if !template.is_generic() || !ty.args.is_empty() {
            return Ok(deducer.deduce(ty)?.entity);
        }

        let slots: Vec<Param> = match &template {
            TemplateEntity::Struct(s) => s.fields.clone(),
            TemplateEntity::Library(l) => match self.mode {
                LibraryMode::Constructor => l.params.clone(),
                LibraryMode::Properties => l.properties.clone(),
            },
        };
        let observed = slots
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let seen = match value {
                    Some(Value::Array(items)) => items.get(i),
                    Some(v @ Value::Object(_)) => v.get(&slot.name),
                    _ => None,
                };
                match seen {
                    Some(v) => self.observe(&format!("{}.{}", path, slot.name), v),
                    None => Ok(None),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        let inst = deducer.infer(&ty.name, &slots, &observed).map_err(|e| match e {
            Error::ResolutionError { name, reason } => {
                Error::resolution(name, format!("{} (at `{}`)", reason, path))
            }
            other => other,
        })?;
        Ok(inst.entity)
    }

    /// Concrete type observable from `value`.
    ///
    /// An object is typed as the one declared struct whose field names equal
    /// its keys; arrays of such objects become `Struct[n]`.
    fn observe(&self, path: &str, value: &Value) -> Result<Option<TypeExpr>> {
        match value {
            Value::Object(fields) => {
                let mut keys: Vec<&str> = fields.iter().map(|(k, _)| k.as_str()).collect();
                keys.sort_unstable();
                let mut matches: Vec<&str> = self
                    .resolver
                    .structs()
                    .filter(|s| {
                        let mut names: Vec<&str> = s.fields.iter().map(|f| f.name.as_str()).collect();
                        names.sort_unstable();
                        names == keys
                    })
                    .map(|s| s.name.as_str())
                    .collect();
                matches.sort_unstable();
                match matches.as_slice() {
                    [] => Ok(None),
                    [name] => Ok(Some(TypeExpr::named(*name))),
                    several => Err(Error::resolution(
                        path,
                        format!("object fields match several structs: {}", several.join(", ")),
                    )),
                }
            }
            Value::Array(items) => {
                let Some((first, rest)) = items.split_first() else {
                    return Ok(None);
                };
                let Some(element) = self.observe(path, first)? else {
                    return Ok(None);
                };
                for item in rest {
                    if self.observe(path, item)?.as_ref() != Some(&element) {
                        return Ok(None);
                    }
                }
                Ok(Some(element.with_outer_dims(&[items.len()])))
            }
            other => Ok(other.infer_type()),
        }
    }

    fn visit_keyed(
        &self,
        path: &str,
        owner: &str,
        slots: &[Param],
        value: Option<&Value>,
        depth: usize,
        out: &mut Vec<FlatArg>,
    ) -> Result<()> {
        let child = |name: &str| {
            if path.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", path, name)
            }
        };
        let shape_error = |detail| Error::ShapeMismatch {
            path: if path.is_empty() { owner.to_string() } else { path.to_string() },
            detail,
        };

        let fields = match value {
            None => {
                for slot in slots {
                    self.visit(&child(&slot.name), &slot.ty, None, depth + 1, out)?;
                }
                return Ok(());
            }
            Some(Value::Object(fields)) => fields,
            Some(other) => {
                return Err(Error::type_mismatch(
                    if path.is_empty() { owner } else { path },
                    owner,
                    other.type_name(),
                ))
            }
        };

        let mut seen = HashSet::new();
        for (key, _) in fields {
            if !seen.insert(key.as_str()) {
                return Err(shape_error(ShapeDetail::DuplicateKey(key.clone())));
            }
            if !slots.iter().any(|s| s.name == *key) {
                return Err(shape_error(ShapeDetail::UnknownField(key.clone())));
            }
        }

        for slot in slots {
            let field = fields
                .iter()
                .find(|(k, _)| *k == slot.name)
                .map(|(_, v)| v)
                .ok_or_else(|| shape_error(ShapeDetail::MissingField(slot.name.clone())))?;
            self.visit(&child(&slot.name), &slot.ty, Some(field), depth + 1, out)?;
        }
        Ok(())
    }

    fn visit_positional(
        &self,
        path: &str,
        owner: &str,
        slots: &[Param],
        value: Option<&Value>,
        depth: usize,
        out: &mut Vec<FlatArg>,
    ) -> Result<()> {
        let items = match value {
            None => {
                for slot in slots {
                    self.visit(&format!("{}.{}", path, slot.name), &slot.ty, None, depth + 1, out)?;
                }
                return Ok(());
            }
            Some(Value::Array(items)) => items,
            Some(other) => {
                return Err(Error::type_mismatch(
                    path,
                    format!("positional arguments of {}", owner),
                    other.type_name(),
                ))
            }
        };
        if items.len() != slots.len() {
            return Err(Error::length_mismatch(path, slots.len(), items.len()));
        }
        for (slot, item) in slots.iter().zip(items) {
            self.visit(&format!("{}.{}", path, slot.name), &slot.ty, Some(item), depth + 1, out)?;
        }
        Ok(())
    }

    fn visit_container(
        &self,
        path: &str,
        kind: ContainerKind,
        ty: &TypeExpr,
        value: Option<&Value>,
        depth: usize,
        out: &mut Vec<FlatArg>,
    ) -> Result<()> {
        let data_path = format!("{}.{}", path, CONTAINER_DATA_FIELD);

        let Some(value) = value else {
            out.push(FlatArg {
                path: data_path,
                ty: ScalarType::Bytes,
                value: None,
            });
            return Ok(());
        };

        let args = if ty.args.is_empty() {
            value.infer_type().map(|t| t.args).unwrap_or_default()
        } else {
            ty.args.clone()
        };
        let arity = if kind == ContainerKind::Map { 2 } else { 1 };
        if args.len() != arity {
            return Err(Error::resolution(
                ty.to_string(),
                format!("cannot determine the element types at `{}`", path),
            ));
        }

        let mut entries: Vec<(Vec<u8>, Vec<u8>)> = match (kind, value) {
            (ContainerKind::Map, Value::Map(pairs)) => pairs
                .iter()
                .enumerate()
                .map(|(i, (k, v))| {
                    let entry = format!("{}[{}]", path, i);
                    let key = self.leaf_hash(&format!("{}.key", entry), &args[0], k, depth)?;
                    let val = self.leaf_hash(&format!("{}.value", entry), &args[1], v, depth)?;
                    Ok((key, val))
                })
                .collect::<Result<_>>()?,
            (ContainerKind::Set, Value::Set(items)) => items
                .iter()
                .enumerate()
                .map(|(i, e)| {
                    let key = self.leaf_hash(&format!("{}[{}]", path, i), &args[0], e, depth)?;
                    Ok((key, Vec::new()))
                })
                .collect::<Result<_>>()?,
            (_, other) => {
                return Err(Error::type_mismatch(path, ty.to_string(), other.type_name()));
            }
        };

        entries.sort_by(|(a, _), (b, _)| BigUint::from_bytes_le(a).cmp(&BigUint::from_bytes_le(b)));
        if let Some(pair) = entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(Error::ShapeMismatch {
                path: path.to_string(),
                detail: ShapeDetail::DuplicateKey(hex::encode(&pair[0].0)),
            });
        }

        let data: Vec<u8> = entries
            .into_iter()
            .flat_map(|(key, val)| key.into_iter().chain(val))
            .collect();
        out.push(FlatArg {
            path: data_path,
            ty: ScalarType::Bytes,
            value: Some(Scalar::bytes(data)),
        });
        Ok(())
    }

    /// SHA-256 of the canonical pushes of every leaf of `value`
    fn leaf_hash(&self, path: &str, ty: &TypeExpr, value: &Value, depth: usize) -> Result<Vec<u8>> {
        let mut leaves = Vec::new();
        self.visit(path, ty, Some(value), depth + 1, &mut leaves)?;
        let mut script = Vec::new();
        for leaf in leaves.iter().filter_map(|l| l.value.as_ref()) {
            push_data(&mut script, &leaf.state_bytes());
        }
        Ok(Sha256::digest(&script).to_vec())
    }
}
