//! # Contract Type System
//!
//! Type strings in a contract artifact look like:
//!
//! ```text
//! int                      ;; built-in scalar
//! PubKey                   ;; scalar wrapper (byte-string backed)
//! Point                    ;; user struct
//! Coord                    ;; alias of another type
//! int[2][3]                ;; fixed-size array, outer dimension first
//! Box<int,bytes>           ;; generic library instantiation
//! HashedMap<int,Point>[2]  ;; array of built-in container instances
//! ```
//!
//! [`TypeExpr`] is the parsed form of such a string. The [`TypeResolver`]
//! canonicalizes names (aliases, built-ins) and the [`GenericDeducer`] binds
//! template parameters.

pub mod generics;
pub mod resolver;

pub use generics::{unify, GenericBindings, GenericDeducer, Instantiation};
pub use resolver::{AliasDecl, TypeResolver};

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Built-in scalar types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarType {
    /// Arbitrary-precision integer
    #[serde(rename = "int")]
    Int,
    /// Boolean
    #[serde(rename = "bool")]
    Bool,
    /// Raw byte string
    #[serde(rename = "bytes")]
    Bytes,
    /// Private key (integer backed)
    PrivKey,
    /// Public key
    PubKey,
    /// Signature
    Sig,
    /// RIPEMD-160 digest
    Ripemd160,
    /// SHA-1 digest
    Sha1,
    /// SHA-256 digest
    Sha256,
    /// Signature hash flags
    SigHashType,
    /// Serialized signature preimage
    SigHashPreimage,
    /// Single opcode
    OpCodeType,
}

/// Underlying representation of a scalar type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataKind {
    /// Integer payload
    Int,
    /// Boolean payload
    Bool,
    /// Byte-string payload
    Bytes,
}

impl ScalarType {
    /// Every scalar type, in declaration order
    pub const ALL: [ScalarType; 12] = [
        ScalarType::Int,
        ScalarType::Bool,
        ScalarType::Bytes,
        ScalarType::PrivKey,
        ScalarType::PubKey,
        ScalarType::Sig,
        ScalarType::Ripemd160,
        ScalarType::Sha1,
        ScalarType::Sha256,
        ScalarType::SigHashType,
        ScalarType::SigHashPreimage,
        ScalarType::OpCodeType,
    ];

    /// Look up a scalar type by its source name
    pub fn from_name(name: &str) -> Option<ScalarType> {
        ScalarType::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// Source-level name
    pub fn name(&self) -> &'static str {
        match self {
            ScalarType::Int => "int",
            ScalarType::Bool => "bool",
            ScalarType::Bytes => "bytes",
            ScalarType::PrivKey => "PrivKey",
            ScalarType::PubKey => "PubKey",
            ScalarType::Sig => "Sig",
            ScalarType::Ripemd160 => "Ripemd160",
            ScalarType::Sha1 => "Sha1",
            ScalarType::Sha256 => "Sha256",
            ScalarType::SigHashType => "SigHashType",
            ScalarType::SigHashPreimage => "SigHashPreimage",
            ScalarType::OpCodeType => "OpCodeType",
        }
    }

    /// Representation of the payload
    pub fn data_kind(&self) -> DataKind {
        match self {
            ScalarType::Int | ScalarType::PrivKey => DataKind::Int,
            ScalarType::Bool => DataKind::Bool,
            _ => DataKind::Bytes,
        }
    }

    /// Whether literals of this type use the `Name(...)` constructor form
    pub fn is_wrapper(&self) -> bool {
        !matches!(self, ScalarType::Int | ScalarType::Bool | ScalarType::Bytes)
    }
}

impl fmt::Display for ScalarType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Parsed type string: `Name<Arg, ...>[d1][d2]...`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    /// Base name (scalar, struct, library, alias or generic parameter)
    pub name: String,
    /// Generic type arguments
    pub args: Vec<TypeExpr>,
    /// Array dimensions, outermost first
    pub dims: Vec<usize>,
}

impl TypeExpr {
    /// A bare name with no arguments or dimensions
    pub fn named(name: impl Into<String>) -> Self {
        TypeExpr {
            name: name.into(),
            args: Vec::new(),
            dims: Vec::new(),
        }
    }

    /// Type expression for a scalar
    pub fn scalar(ty: ScalarType) -> Self {
        TypeExpr::named(ty.name())
    }

    /// Parse a type string
    pub fn parse(input: &str) -> Result<TypeExpr> {
        let malformed = |reason: &str| Error::resolution(input, reason);
        let mut rest = input.trim();

        // Array suffixes, read right to left
        let mut dims = Vec::new();
        while let Some(stripped) = rest.strip_suffix(']') {
            let open = stripped
                .rfind('[')
                .ok_or_else(|| malformed("unbalanced `]`"))?;
            let size = stripped[open + 1..]
                .trim()
                .parse::<usize>()
                .map_err(|_| malformed("array size must be a non-negative integer"))?;
            dims.push(size);
            rest = stripped[..open].trim_end();
        }
        dims.reverse();

        let (name, args) = match rest.find('<') {
            Some(open) => {
                let inner = rest[open + 1..]
                    .strip_suffix('>')
                    .ok_or_else(|| malformed("unbalanced `<`"))?;
                let args = split_type_params(inner)
                    .into_iter()
                    .map(TypeExpr::parse)
                    .collect::<Result<Vec<_>>>()?;
                if args.is_empty() {
                    return Err(malformed("empty type argument list"));
                }
                (rest[..open].trim(), args)
            }
            None => (rest, Vec::new()),
        };

        if !is_identifier(name) {
            return Err(malformed("not a type name"));
        }

        Ok(TypeExpr {
            name: name.to_string(),
            args,
            dims,
        })
    }

    /// Whether this is an array type
    pub fn is_array(&self) -> bool {
        !self.dims.is_empty()
    }

    /// Element type of an array (outer dimension removed)
    pub fn element(&self) -> Option<TypeExpr> {
        let (_, inner_dims) = self.dims.split_first()?;
        Some(TypeExpr {
            name: self.name.clone(),
            args: self.args.clone(),
            dims: inner_dims.to_vec(),
        })
    }

    /// The type without any array dimensions
    pub fn base(&self) -> TypeExpr {
        TypeExpr {
            name: self.name.clone(),
            args: self.args.clone(),
            dims: Vec::new(),
        }
    }

    /// Wrap this type in outer array dimensions: `int[2]` with `[3]` is `int[3][2]`
    pub fn with_outer_dims(mut self, outer: &[usize]) -> TypeExpr {
        if !outer.is_empty() {
            let mut dims = outer.to_vec();
            dims.append(&mut self.dims);
            self.dims = dims;
        }
        self
    }

    /// Scalar type of the base name, if it is a built-in scalar
    pub fn scalar_type(&self) -> Option<ScalarType> {
        if self.args.is_empty() {
            ScalarType::from_name(&self.name)
        } else {
            None
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.args.is_empty() {
            write!(f, "<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    write!(f, ",")?;
                }
                write!(f, "{}", arg)?;
            }
            write!(f, ">")?;
        }
        for dim in &self.dims {
            write!(f, "[{}]", dim)?;
        }
        Ok(())
    }
}

impl std::str::FromStr for TypeExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        TypeExpr::parse(s)
    }
}

/// Split type parameters respecting nested angle brackets.
///
/// Given `"A, B<C, D>, E"`, returns `["A", "B<C, D>", "E"]`.
pub fn split_type_params(s: &str) -> Vec<&str> {
    let mut result = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;

    for (i, c) in s.char_indices() {
        match c {
            '<' => depth += 1,
            '>' => depth -= 1,
            ',' if depth == 0 => {
                result.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }

    if !s[start..].trim().is_empty() {
        result.push(s[start..].trim());
    }

    result
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Kind of symbol a resolved type denotes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    /// Built-in scalar
    Scalar(ScalarType),
    /// User struct (possibly generic)
    Struct,
    /// Library template (possibly generic)
    Library,
    /// Fixed-size array of any of the above
    Array,
}

/// Canonical description of a declared type
#[derive(Debug, Clone, PartialEq)]
pub struct TypeDescriptor {
    /// Type string as written by the caller
    pub declared: String,
    /// Alias-free canonical type
    pub final_type: TypeExpr,
    /// What the type denotes
    pub kind: SymbolKind,
    /// Explicit generic arguments paired with the template's parameter names
    pub generic_bindings: GenericBindings,
}

impl TypeDescriptor {
    /// Scalar type for scalar descriptors
    pub fn scalar_type(&self) -> Option<ScalarType> {
        match self.kind {
            SymbolKind::Scalar(ty) => Some(ty),
            _ => None,
        }
    }
}

/// Named, typed slot: a parameter, struct field or library property
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    /// Slot name
    pub name: String,
    /// Declared type
    pub ty: TypeExpr,
}

impl Param {
    /// Create a parameter from a name and a type string
    pub fn new(name: impl Into<String>, ty: &str) -> Result<Self> {
        Ok(Param {
            name: name.into(),
            ty: TypeExpr::parse(ty)?,
        })
    }
}

/// Struct declaration
#[derive(Debug, Clone, PartialEq)]
pub struct StructEntity {
    /// Struct name
    pub name: String,
    /// Fields in declaration order
    pub fields: Vec<Param>,
    /// Generic parameter names (empty for plain structs)
    pub generic_types: Vec<String>,
}

/// Library declaration
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryEntity {
    /// Library name
    pub name: String,
    /// Constructor parameters in declaration order
    pub params: Vec<Param>,
    /// Stateful properties in declaration order
    pub properties: Vec<Param>,
    /// Generic parameter names (empty for plain libraries)
    pub generic_types: Vec<String>,
}

/// The two built-in hash-keyed container templates
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    /// `HashedMap<K,V>`
    Map,
    /// `HashedSet<E>`
    Set,
}

/// Name of the single backing field of a hashed container
pub const CONTAINER_DATA_FIELD: &str = "_data";

impl ContainerKind {
    /// Template name
    pub fn name(&self) -> &'static str {
        match self {
            ContainerKind::Map => "HashedMap",
            ContainerKind::Set => "HashedSet",
        }
    }

    /// Built-in library declaration for this container
    pub fn entity(&self) -> LibraryEntity {
        let generic_types = match self {
            ContainerKind::Map => vec!["K".to_string(), "V".to_string()],
            ContainerKind::Set => vec!["E".to_string()],
        };
        let data = Param {
            name: CONTAINER_DATA_FIELD.to_string(),
            ty: TypeExpr::scalar(ScalarType::Bytes),
        };
        LibraryEntity {
            name: self.name().to_string(),
            params: vec![data.clone()],
            properties: vec![data],
            generic_types,
        }
    }
}

impl LibraryEntity {
    /// Container kind if this is one of the built-in hashed containers
    pub fn container_kind(&self) -> Option<ContainerKind> {
        match self.name.as_str() {
            "HashedMap" => Some(ContainerKind::Map),
            "HashedSet" => Some(ContainerKind::Set),
            _ => None,
        }
    }
}

/// A generic-capable declaration: struct or library
#[derive(Debug, Clone, PartialEq)]
pub enum TemplateEntity {
    /// Struct declaration
    Struct(StructEntity),
    /// Library declaration
    Library(LibraryEntity),
}

impl TemplateEntity {
    /// Declaration name
    pub fn name(&self) -> &str {
        match self {
            TemplateEntity::Struct(s) => &s.name,
            TemplateEntity::Library(l) => &l.name,
        }
    }

    /// Generic parameter names
    pub fn generic_types(&self) -> &[String] {
        match self {
            TemplateEntity::Struct(s) => &s.generic_types,
            TemplateEntity::Library(l) => &l.generic_types,
        }
    }

    /// Whether the declaration takes generic parameters
    pub fn is_generic(&self) -> bool {
        !self.generic_types().is_empty()
    }

    /// Every declared slot type (struct fields, library params and properties)
    pub fn slot_types(&self) -> Vec<&TypeExpr> {
        match self {
            TemplateEntity::Struct(s) => s.fields.iter().map(|p| &p.ty).collect(),
            TemplateEntity::Library(l) => l
                .params
                .iter()
                .chain(l.properties.iter())
                .map(|p| &p.ty)
                .collect(),
        }
    }

    /// Copy with every slot type rewritten by `f`
    pub fn map_slot_types<F>(&self, mut f: F) -> TemplateEntity
    where
        F: FnMut(&TypeExpr) -> TypeExpr,
    {
        let mut map = |params: &[Param]| -> Vec<Param> {
            params
                .iter()
                .map(|p| Param {
                    name: p.name.clone(),
                    ty: f(&p.ty),
                })
                .collect()
        };
        match self {
            TemplateEntity::Struct(s) => TemplateEntity::Struct(StructEntity {
                name: s.name.clone(),
                fields: map(&s.fields),
                generic_types: s.generic_types.clone(),
            }),
            TemplateEntity::Library(l) => {
                let params = map(&l.params);
                let properties = map(&l.properties);
                TemplateEntity::Library(LibraryEntity {
                    name: l.name.clone(),
                    params,
                    properties,
                    generic_types: l.generic_types.clone(),
                })
            }
        }
    }
}
