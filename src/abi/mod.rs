//! Contract interface encoding
//!
//! [`ContractDescription`] is built once from a compiled artifact and is
//! read-only afterwards. It ties together the type table, the ABI coder and
//! the state codec.
//!
//! ```ignore
//! use scriptabi::{CodecOptions, ContractDescription, Value};
//!
//! let contract = ContractDescription::from_json(&artifact_json, CodecOptions::default())?;
//! let locking_asm = contract.encode_constructor(&[Value::int(5)])?;
//! let unlock = contract.encode_call("unlock", &[Value::int(7)])?;
//! println!("{} / {}", locking_asm, unlock.to_asm());
//! ```

pub mod artifact;
pub mod coder;
pub mod flatten;

pub use artifact::{ContractArtifact, CURRENT_ARTIFACT_VERSION, MINIMUM_ARTIFACT_VERSION};
pub use coder::{AbiCoder, AbiEntity, AbiKind, Operand, UnlockingScript};
pub use flatten::{FlatArg, Flattener, LibraryMode};

use crate::codec::state::{State, StateField, StateSchema};
use crate::config::CodecOptions;
use crate::error::{Error, Result};
use crate::types::{Param, TypeResolver};
use crate::value::Value;

/// Leaf shape of one ABI entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityShape {
    /// Entry kind
    pub kind: AbiKind,
    /// Entry name
    pub name: String,
    /// Leaves of every parameter, in order, without values
    pub leaves: Vec<FlatArg>,
}

/// Immutable, shareable view of a compiled contract
#[derive(Debug, Clone)]
pub struct ContractDescription {
    name: String,
    resolver: TypeResolver,
    abi: Vec<AbiEntity>,
    state_props: Vec<Param>,
    asm: String,
    options: CodecOptions,
}

impl ContractDescription {
    /// Build from a parsed artifact
    pub fn from_artifact(artifact: &ContractArtifact, options: CodecOptions) -> Result<Self> {
        artifact.validate(options.minimum_artifact_version)?;

        let resolver = TypeResolver::new(
            &artifact.alias_decls(),
            artifact.struct_entities()?,
            artifact.library_entities()?,
        )?;

        let description = ContractDescription {
            name: artifact.contract.clone().unwrap_or_default(),
            resolver,
            abi: artifact.abi_entities()?,
            state_props: artifact.state_params()?,
            asm: artifact.asm.clone().unwrap_or_default(),
            options,
        };

        // Every declared type must resolve up front
        for param in description
            .abi
            .iter()
            .flat_map(|e| e.params.iter())
            .chain(description.state_props.iter())
        {
            description.resolver.resolve_expr(&param.ty)?;
        }

        tracing::debug!(
            contract = %description.name,
            functions = description.functions().count(),
            state_props = description.state_props.len(),
            "loaded contract description"
        );
        Ok(description)
    }

    /// Build from artifact JSON
    pub fn from_json(json: &str, options: CodecOptions) -> Result<Self> {
        Self::from_artifact(&ContractArtifact::from_json(json)?, options)
    }

    /// Contract name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Locking-script template
    pub fn asm_template(&self) -> &str {
        &self.asm
    }

    /// Type table
    pub fn resolver(&self) -> &TypeResolver {
        &self.resolver
    }

    /// Options in effect
    pub fn options(&self) -> &CodecOptions {
        &self.options
    }

    /// All ABI entries
    pub fn abi(&self) -> &[AbiEntity] {
        &self.abi
    }

    /// Public functions in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &AbiEntity> {
        self.abi.iter().filter(|e| e.kind == AbiKind::Function)
    }

    /// Constructor entry
    pub fn constructor(&self) -> Result<&AbiEntity> {
        self.abi
            .iter()
            .find(|e| e.kind == AbiKind::Constructor)
            .ok_or_else(|| Error::resolution("constructor", "contract declares no constructor"))
    }

    /// Declared state properties
    pub fn state_props(&self) -> &[Param] {
        &self.state_props
    }

    fn coder(&self) -> AbiCoder<'_> {
        AbiCoder::new(
            &self.resolver,
            &self.abi,
            self.options.library_mode,
            self.options.dispatch_threshold,
        )
    }

    /// Locking-script ASM with constructor arguments substituted
    pub fn encode_constructor(&self, args: &[Value]) -> Result<String> {
        self.coder()
            .encode_constructor(self.constructor()?, &self.asm, args)
    }

    /// Unlocking-script operands for a call to `function`
    pub fn encode_call(&self, function: &str, args: &[Value]) -> Result<UnlockingScript> {
        self.coder().encode_call_by_name(function, args)
    }

    /// Leaf paths and types of every ABI entry
    pub fn interface_shape(&self) -> Result<Vec<EntityShape>> {
        let flattener = Flattener::new(&self.resolver, self.options.library_mode);
        self.abi
            .iter()
            .map(|entity| {
                let mut leaves = Vec::new();
                for param in &entity.params {
                    leaves.extend(flattener.flatten_shape(&param.name, &param.ty)?);
                }
                Ok(EntityShape {
                    kind: entity.kind,
                    name: entity.name.clone(),
                    leaves,
                })
            })
            .collect()
    }

    /// Blob schema of the state properties, structured ones flattened
    pub fn state_schema(&self) -> Result<StateSchema> {
        let leaves = self
            .state_flattener()
            .flatten_slots(&self.state_props, None)?;
        Ok(StateSchema::new(
            leaves
                .into_iter()
                .map(|leaf| StateField::new(leaf.path, leaf.ty))
                .collect(),
        ))
    }

    /// Flatten a keyed object of state property values into a [`State`]
    pub fn state_from_value(&self, props: &Value) -> Result<State> {
        let leaves = self
            .state_flattener()
            .flatten_slots(&self.state_props, Some(props))?;
        Ok(leaves
            .into_iter()
            .filter_map(|leaf| Some((leaf.path, leaf.value?)))
            .collect())
    }

    /// State blob for `props`
    pub fn serialize_state(&self, props: &Value) -> Result<Vec<u8>> {
        self.options
            .state_codec()
            .serialize(&self.state_from_value(props)?)
    }

    /// State blob for `props`, as hex
    pub fn serialize_state_hex(&self, props: &Value) -> Result<String> {
        self.serialize_state(props).map(hex::encode)
    }

    /// Decode the state at the end of `script`
    pub fn deserialize_state(&self, script: &[u8]) -> Result<State> {
        self.options
            .state_codec()
            .deserialize(script, &self.state_schema()?)
    }

    /// Decode the state at the end of a hex script
    pub fn deserialize_state_hex(&self, script_hex: &str) -> Result<State> {
        self.options
            .state_codec()
            .deserialize_hex(script_hex, &self.state_schema()?)
    }

    /// Rebuild the keyed object of state properties from decoded leaves
    pub fn state_to_value(&self, state: &State) -> Result<Value> {
        let schema = self.state_schema()?;
        let names = state.iter().map(|(name, _)| name);
        if state.len() != schema.len()
            || !names.zip(schema.fields()).all(|(name, field)| name == field.name)
        {
            return Err(Error::malformed_state(
                "state entries do not follow the declared state properties",
            ));
        }
        self.state_flattener()
            .unflatten_slots(&self.state_props, state.values())
    }

    /// Decode the state at the end of `script` back into structured props
    pub fn deserialize_props(&self, script: &[u8]) -> Result<Value> {
        self.state_to_value(&self.deserialize_state(script)?)
    }

    /// Decode the state at the end of a hex script back into structured props
    pub fn deserialize_props_hex(&self, script_hex: &str) -> Result<Value> {
        self.state_to_value(&self.deserialize_state_hex(script_hex)?)
    }

    /// State properties are keyed objects, so libraries among them are too
    fn state_flattener(&self) -> Flattener<'_> {
        Flattener::new(&self.resolver, LibraryMode::Properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_send_sync<T: Send + Sync>() {}

    #[test]
    fn test_description_is_shareable() {
        assert_send_sync::<ContractDescription>();
    }

    #[test]
    fn test_struct_state_flattened() {
        let json = r#"{
            "version": 9,
            "contract": "Tracker",
            "abi": [{"type": "constructor", "params": []}],
            "structs": [{"name": "Point", "params": [{"name": "x", "type": "int"}, {"name": "y", "type": "int"}]}],
            "stateProps": [{"name": "count", "type": "int"}, {"name": "at", "type": "Point"}],
            "asm": "OP_NOP"
        }"#;
        let contract = ContractDescription::from_json(json, CodecOptions::default()).unwrap();
        let schema = contract.state_schema().unwrap();
        let names: Vec<_> = schema.fields().iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["count", "at.x", "at.y"]);

        let props = Value::object([
            ("count", Value::int(3)),
            ("at", Value::object([("x", Value::int(-4)), ("y", Value::int(0))])),
        ]);
        let blob = contract.serialize_state(&props).unwrap();
        let state = contract.deserialize_state(&blob).unwrap();
        assert_eq!(state, contract.state_from_value(&props).unwrap());
        assert_eq!(contract.deserialize_props(&blob).unwrap(), props);
    }

    #[test]
    fn test_props_rebuilt_in_declared_order() {
        let json = r#"{
            "version": 9,
            "contract": "Board",
            "abi": [{"type": "constructor", "params": []}],
            "structs": [{"name": "Cell", "params": [{"name": "owner", "type": "PubKeyHash"}, {"name": "hits", "type": "int[2]"}]}],
            "library": [{"name": "Tally", "params": [{"name": "seed", "type": "int"}],
                         "properties": [{"name": "total", "type": "int"}, {"name": "done", "type": "bool"}]}],
            "stateProps": [{"name": "cells", "type": "Cell[2]"}, {"name": "tally", "type": "Tally"}],
            "asm": "OP_NOP"
        }"#;
        let contract = ContractDescription::from_json(json, CodecOptions::default()).unwrap();

        let owner = Value::Scalar(
            crate::value::Scalar::from_hex(crate::types::ScalarType::Ripemd160, &"11".repeat(20))
                .unwrap(),
        );
        let cell = |a: i64, b: i64| {
            Value::object([
                ("owner", owner.clone()),
                ("hits", Value::array(vec![Value::int(a), Value::int(b)])),
            ])
        };
        let props = Value::object([
            ("cells", Value::array(vec![cell(1, 2), cell(0, -7)])),
            ("tally", Value::object([("total", Value::int(300)), ("done", Value::bool(true))])),
        ]);

        let hex = contract.serialize_state_hex(&props).unwrap();
        assert_eq!(contract.deserialize_props_hex(&hex).unwrap(), props);

        // Caller key order is not kept; declared order is
        let reordered = Value::object([
            ("tally", Value::object([("done", Value::bool(true)), ("total", Value::int(300))])),
            ("cells", Value::array(vec![cell(1, 2), cell(0, -7)])),
        ]);
        let blob = contract.serialize_state(&reordered).unwrap();
        assert_eq!(contract.deserialize_props(&blob).unwrap(), props);
    }

    #[test]
    fn test_foreign_state_rejected() {
        let json = r#"{
            "version": 9,
            "contract": "C",
            "abi": [],
            "stateProps": [{"name": "a", "type": "int"}],
            "asm": ""
        }"#;
        let contract = ContractDescription::from_json(json, CodecOptions::default()).unwrap();
        let state = State::new().with("b", 1);
        let err = contract.state_to_value(&state).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::MalformedState);
    }

    #[test]
    fn test_unresolvable_param_fails_load() {
        let json = r#"{
            "version": 9,
            "contract": "Bad",
            "abi": [{"type": "function", "name": "f", "params": [{"name": "p", "type": "Nowhere"}]}],
            "asm": ""
        }"#;
        assert!(ContractDescription::from_json(json, CodecOptions::default()).is_err());
    }
}
