//! Compiled contract artifact
//!
//! ## Format
//! ```json
//! {
//!   "version": 9,
//!   "compilerVersion": "1.0.0",
//!   "contract": "Demo",
//!   "abi": [{"type": "function", "name": "unlock", "index": 1, "params": [...]},
//!           {"type": "constructor", "params": [...]}],
//!   "structs": [{"name": "Point", "params": [...], "genericTypes": []}],
//!   "library": [{"name": "Box", "params": [...], "properties": [...], "genericTypes": ["T"]}],
//!   "alias": [{"name": "Coord", "type": "Point"}],
//!   "stateProps": [{"name": "counter", "type": "int"}],
//!   "asm": "$_x OP_ADD"
//! }
//! ```

use super::coder::{AbiEntity, AbiKind};
use crate::error::{Error, Result};
use crate::types::{AliasDecl, LibraryEntity, Param, StructEntity};
use serde::{Deserialize, Serialize};

/// Oldest artifact schema version understood
pub const MINIMUM_ARTIFACT_VERSION: u32 = 8;
/// Artifact schema version written by current compilers
pub const CURRENT_ARTIFACT_VERSION: u32 = 9;

/// Artifact as read from JSON
///
/// Required fields are optional here so that their absence is reported as a
/// version problem rather than a JSON one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractArtifact {
    /// Schema version
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
    /// Version of the compiler that produced the artifact
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler_version: Option<String>,
    /// Contract name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contract: Option<String>,
    /// Constructor and public functions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abi: Option<Vec<AbiEntry>>,
    /// Struct declarations
    #[serde(default)]
    pub structs: Vec<StructDecl>,
    /// Library declarations
    #[serde(default)]
    pub library: Vec<LibraryDecl>,
    /// Type aliases
    #[serde(default)]
    pub alias: Vec<AliasEntry>,
    /// Stateful properties, in blob order
    #[serde(default)]
    pub state_props: Vec<ParamDecl>,
    /// Locking-script template with `$param` placeholders
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asm: Option<String>,
}

/// `{name, type}` pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamDecl {
    /// Slot name
    pub name: String,
    /// Type string
    #[serde(rename = "type")]
    pub ty: String,
}

/// ABI entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbiEntry {
    /// `constructor` or `function`
    #[serde(rename = "type")]
    pub kind: AbiKind,
    /// Function name; absent for the constructor
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Dispatch index
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,
    /// Parameters
    #[serde(default)]
    pub params: Vec<ParamDecl>,
}

/// Struct declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructDecl {
    /// Struct name
    pub name: String,
    /// Fields
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    /// Generic parameter names
    #[serde(default)]
    pub generic_types: Vec<String>,
}

/// Library declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LibraryDecl {
    /// Library name
    pub name: String,
    /// Constructor parameters
    #[serde(default)]
    pub params: Vec<ParamDecl>,
    /// Stateful properties
    #[serde(default)]
    pub properties: Vec<ParamDecl>,
    /// Generic parameter names
    #[serde(default)]
    pub generic_types: Vec<String>,
}

/// Alias declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Alias name
    pub name: String,
    /// Target type string
    #[serde(rename = "type")]
    pub ty: String,
}

fn params(decls: &[ParamDecl]) -> Result<Vec<Param>> {
    decls.iter().map(|p| Param::new(&p.name, &p.ty)).collect()
}

impl ContractArtifact {
    /// Parse artifact JSON
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize back to JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check the schema version and the required fields
    pub fn validate(&self, minimum: u32) -> Result<()> {
        let unsupported = |reason: String| Error::VersionError { reason, minimum };
        match self.version {
            None => return Err(unsupported("artifact has no version".to_string())),
            Some(v) if v < minimum => {
                return Err(unsupported(format!("artifact version is {}", v)))
            }
            Some(_) => {}
        }
        for (field, present) in [
            ("contract", self.contract.is_some()),
            ("abi", self.abi.is_some()),
            ("asm", self.asm.is_some()),
        ] {
            if !present {
                return Err(unsupported(format!("artifact is missing `{}`", field)));
            }
        }
        Ok(())
    }

    /// ABI entries as entities; a missing constructor becomes a zero-parameter one
    pub fn abi_entities(&self) -> Result<Vec<AbiEntity>> {
        let mut entities = Vec::new();
        for entry in self.abi.iter().flatten() {
            let entity = match entry.kind {
                AbiKind::Constructor => AbiEntity::constructor(params(&entry.params)?),
                AbiKind::Function => {
                    let name = entry.name.clone().ok_or_else(|| {
                        Error::InvalidArtifact("function entry without a name".to_string())
                    })?;
                    AbiEntity::function(name, entry.index, params(&entry.params)?)
                }
            };
            entities.push(entity);
        }
        if !entities.iter().any(|e| e.kind == AbiKind::Constructor) {
            entities.push(AbiEntity::constructor(Vec::new()));
        }
        Ok(entities)
    }

    /// Struct declarations as entities
    pub fn struct_entities(&self) -> Result<Vec<StructEntity>> {
        self.structs
            .iter()
            .map(|s| {
                Ok(StructEntity {
                    name: s.name.clone(),
                    fields: params(&s.params)?,
                    generic_types: s.generic_types.clone(),
                })
            })
            .collect()
    }

    /// Library declarations as entities
    pub fn library_entities(&self) -> Result<Vec<LibraryEntity>> {
        self.library
            .iter()
            .map(|l| {
                Ok(LibraryEntity {
                    name: l.name.clone(),
                    params: params(&l.params)?,
                    properties: params(&l.properties)?,
                    generic_types: l.generic_types.clone(),
                })
            })
            .collect()
    }

    /// Alias declarations
    pub fn alias_decls(&self) -> Vec<AliasDecl> {
        self.alias
            .iter()
            .map(|a| AliasDecl::new(&a.name, &a.ty))
            .collect()
    }

    /// State properties
    pub fn state_params(&self) -> Result<Vec<Param>> {
        params(&self.state_props)
    }
}
