//! # scriptabi - ABI and State Encoding for Script Contracts
//!
//! Turns typed contract arguments into stack-machine script operands and
//! back. A compiled contract artifact describes the interface: constructor
//! and public functions, structs, generic libraries and type aliases. This
//! crate validates caller arguments against that interface and produces:
//!
//! - the locking-script ASM with constructor arguments substituted,
//! - unlocking-script operands for a public function call,
//! - the state blob appended after `OP_RETURN` for stateful contracts.
//!
//! ## Quick Start
//!
//! ```rust
//! use scriptabi::{CodecOptions, ContractDescription, Value};
//!
//! # fn main() -> scriptabi::Result<()> {
//! let artifact = r#"{
//!     "version": 9,
//!     "contract": "Counter",
//!     "abi": [
//!         {"type": "constructor", "params": [{"name": "_x", "type": "int"}]},
//!         {"type": "function", "name": "increment", "params": [{"name": "by", "type": "int"}]}
//!     ],
//!     "stateProps": [{"name": "counter", "type": "int"}, {"name": "flag", "type": "bool"}],
//!     "asm": "$_x OP_ADD"
//! }"#;
//!
//! let contract = ContractDescription::from_json(artifact, CodecOptions::default())?;
//!
//! assert_eq!(contract.encode_constructor(&[Value::int(5)])?, "05 OP_ADD");
//! assert_eq!(contract.encode_call("increment", &[Value::int(2)])?.to_asm(), "02");
//!
//! let props = Value::object([("counter", Value::int(11)), ("flag", Value::bool(true))]);
//! assert_eq!(contract.serialize_state_hex(&props)?, "010b01010400");
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! artifact JSON → ContractArtifact → TypeResolver ─┐
//!                                                  ├→ Flattener → AbiCoder → ASM / operands
//! caller Value ────────────────────────────────────┘            → StateCodec → state blob
//! ```
//!
//! ### Main Components
//!
//! - [`parse_literal`] - literal text (`5`, `b'00ff'`, `PubKey(b'..')`) to a typed [`Scalar`]
//! - [`codec`] - script-number codec, push framing, state blobs
//! - [`TypeResolver`] / [`GenericDeducer`] - aliases, structs, libraries, generics
//! - [`Flattener`] - structured arguments to scalar leaves
//! - [`AbiCoder`] - constructor templates and function-call operands
//! - [`ContractDescription`] - everything above, built from one artifact
//!
//! ## Error Handling
//!
//! Every operation returns [`Result`]; failures carry the offending path or
//! name and never leave partial state behind.
//!
//! ```rust
//! use scriptabi::{ErrorKind, Flattener, LibraryMode, TypeExpr, TypeResolver, Value};
//!
//! let resolver = TypeResolver::builtin();
//! let flattener = Flattener::new(&resolver, LibraryMode::Constructor);
//! let ty = TypeExpr::parse("int[2]").unwrap();
//! let err = flattener
//!     .flatten("a", &ty, &Value::array(vec![Value::int(1), Value::int(2), Value::int(3)]))
//!     .unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
//! ```

#![allow(clippy::result_large_err)] // Error variants carry owned diagnostics

/// Version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod abi;
pub mod codec;
pub mod config;
pub mod error;
pub mod lexer;
pub mod parallel;
pub mod types;
pub mod value;

// Re-export main types
pub use abi::{
    AbiCoder, AbiEntity, AbiKind, ContractArtifact, ContractDescription, EntityShape, FlatArg,
    Flattener, LibraryMode, Operand, UnlockingScript,
};
pub use codec::{LengthWidth, State, StateCodec, StateField, StateSchema};
pub use config::CodecOptions;
pub use error::{Error, ErrorKind, Result, ShapeDetail};
pub use lexer::{parse_literal, Literal, LiteralKind};
pub use parallel::{encode_calls, CallRequest, ParallelConfig};
pub use types::{
    GenericBindings, GenericDeducer, ScalarType, TypeDescriptor, TypeExpr, TypeResolver,
};
pub use value::{Scalar, ScalarData, Value};
