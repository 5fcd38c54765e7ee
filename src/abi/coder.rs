//! Constructor and function-call encoding

use super::flatten::{FlatArg, Flattener, LibraryMode};
use crate::codec::scalar::encode_script_num;
use crate::codec::script::{push_data, OP_0, OP_1, OP_1NEGATE};
use crate::error::{Error, Result};
use crate::types::{Param, TypeResolver};
use crate::value::{Scalar, ScalarData, Value};
use num_bigint::BigInt;
use num_traits::{ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kind of ABI entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AbiKind {
    /// Contract constructor
    Constructor,
    /// Public function
    Function,
}

/// A constructor or public function
#[derive(Debug, Clone, PartialEq)]
pub struct AbiEntity {
    /// Entry kind
    pub kind: AbiKind,
    /// Function name (`constructor` for the constructor)
    pub name: String,
    /// Declared dispatch index
    pub index: Option<u32>,
    /// Parameters in declaration order
    pub params: Vec<Param>,
}

impl AbiEntity {
    /// Constructor entry
    pub fn constructor(params: Vec<Param>) -> Self {
        AbiEntity {
            kind: AbiKind::Constructor,
            name: "constructor".to_string(),
            index: None,
            params,
        }
    }

    /// Public function entry
    pub fn function(name: impl Into<String>, index: Option<u32>, params: Vec<Param>) -> Self {
        AbiEntity {
            kind: AbiKind::Function,
            name: name.into(),
            index,
            params,
        }
    }
}

/// One unlocking-script operand
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    /// Script number, pushed in its smallest form
    Int(BigInt),
    /// Data push
    Data(Vec<u8>),
    /// `OP_TRUE` / `OP_FALSE`
    Bool(bool),
}

impl Operand {
    /// Operand carrying `scalar`
    pub fn from_scalar(scalar: &Scalar) -> Self {
        match scalar.data() {
            ScalarData::Int(n) => Operand::Int(n.clone()),
            ScalarData::Bool(b) => Operand::Bool(*b),
            ScalarData::Bytes(b) => Operand::Data(b.clone()),
        }
    }

    /// ASM token; integers render as their sign-magnitude hex, zero as `00`
    pub fn to_asm(&self) -> String {
        match self {
            Operand::Int(n) if n.is_zero() => "00".to_string(),
            Operand::Int(n) => hex::encode(encode_script_num(n)),
            Operand::Data(d) if d.is_empty() => "OP_0".to_string(),
            Operand::Data(d) => hex::encode(d),
            Operand::Bool(true) => "OP_TRUE".to_string(),
            Operand::Bool(false) => "OP_FALSE".to_string(),
        }
    }

    /// Append the script bytes of this operand.
    ///
    /// Integers use `OP_0`, `OP_1NEGATE` and `OP_1..OP_16` when they can.
    pub fn write_to(&self, script: &mut Vec<u8>) {
        match self {
            Operand::Int(n) => match n.to_i8() {
                Some(0) => script.push(OP_0),
                Some(-1) => script.push(OP_1NEGATE),
                Some(small @ 1..=16) => script.push(OP_1 + (small as u8 - 1)),
                _ => push_data(script, &encode_script_num(n)),
            },
            Operand::Data(d) => push_data(script, d),
            Operand::Bool(true) => script.push(OP_1),
            Operand::Bool(false) => script.push(OP_0),
        }
    }
}

/// Encoded function-call arguments
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnlockingScript {
    operands: Vec<Operand>,
}

impl UnlockingScript {
    /// Operands in push order
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Number of operands
    pub fn len(&self) -> usize {
        self.operands.len()
    }

    /// Whether there are no operands
    pub fn is_empty(&self) -> bool {
        self.operands.is_empty()
    }

    /// Space-separated ASM
    pub fn to_asm(&self) -> String {
        self.operands
            .iter()
            .map(Operand::to_asm)
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Script bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut script = Vec::new();
        for op in &self.operands {
            op.write_to(&mut script);
        }
        script
    }

    /// Script hex
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }
}

/// Validates arguments against an ABI and assembles operands
pub struct AbiCoder<'a> {
    resolver: &'a TypeResolver,
    abi: &'a [AbiEntity],
    library_mode: LibraryMode,
    dispatch_threshold: usize,
}

impl<'a> AbiCoder<'a> {
    /// Create a coder over `abi`
    pub fn new(
        resolver: &'a TypeResolver,
        abi: &'a [AbiEntity],
        library_mode: LibraryMode,
        dispatch_threshold: usize,
    ) -> Self {
        AbiCoder {
            resolver,
            abi,
            library_mode,
            dispatch_threshold,
        }
    }

    /// Public functions in declaration order
    pub fn functions(&self) -> impl Iterator<Item = &'a AbiEntity> {
        self.abi.iter().filter(|e| e.kind == AbiKind::Function)
    }

    /// Public function by name
    pub fn function(&self, name: &str) -> Result<&'a AbiEntity> {
        self.functions()
            .find(|e| e.name == name)
            .ok_or_else(|| Error::resolution(name, "no public function with this name"))
    }

    /// Arity-check and flatten `args` against `entity`
    pub fn flatten_args(&self, entity: &AbiEntity, args: &[Value]) -> Result<Vec<FlatArg>> {
        if args.len() != entity.params.len() {
            return Err(Error::ArityError {
                entity: entity.name.clone(),
                expected: entity.params.len(),
                got: args.len(),
            });
        }
        let flattener = Flattener::new(self.resolver, self.library_mode);
        let mut leaves = Vec::new();
        for (param, arg) in entity.params.iter().zip(args) {
            leaves.extend(flattener.flatten(&param.name, &param.ty, arg)?);
        }
        Ok(leaves)
    }

    /// Substitute constructor arguments into the locking-script template.
    ///
    /// Every whitespace-delimited `$path` token naming a leaf is replaced by
    /// that leaf's ASM in place. Unknown placeholders and all whitespace stay
    /// as written.
    pub fn encode_constructor(
        &self,
        entity: &AbiEntity,
        template: &str,
        args: &[Value],
    ) -> Result<String> {
        let leaves = self.flatten_args(entity, args)?;
        let tokens: HashMap<&str, String> = leaves
            .iter()
            .filter_map(|leaf| Some((leaf.path.as_str(), leaf.value.as_ref()?.to_asm())))
            .collect();

        let mut asm = String::with_capacity(template.len());
        let mut rest = template;
        while !rest.is_empty() {
            let start = rest.find(|c: char| !c.is_whitespace()).unwrap_or(rest.len());
            asm.push_str(&rest[..start]);
            rest = &rest[start..];
            let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
            let token = &rest[..end];
            rest = &rest[end..];

            match token.strip_prefix('$') {
                Some(path) => match tokens.get(path) {
                    Some(leaf_asm) => asm.push_str(leaf_asm),
                    None => {
                        tracing::warn!(placeholder = token, "no constructor argument for placeholder");
                        asm.push_str(token);
                    }
                },
                None => asm.push_str(token),
            }
        }

        tracing::debug!(params = entity.params.len(), leaves = leaves.len(), "encoded constructor");
        Ok(asm)
    }

    /// Encode a public function call.
    ///
    /// When the contract has more public functions than the dispatch
    /// threshold, the function's dispatch index is pushed after the arguments.
    pub fn encode_call(&self, entity: &AbiEntity, args: &[Value]) -> Result<UnlockingScript> {
        let leaves = self.flatten_args(entity, args)?;
        let mut operands: Vec<Operand> = leaves
            .iter()
            .filter_map(|leaf| leaf.value.as_ref())
            .map(Operand::from_scalar)
            .collect();

        if self.functions().count() > self.dispatch_threshold {
            let index = self.dispatch_index(entity)?;
            operands.push(Operand::Int(BigInt::from(index)));
        }

        tracing::debug!(
            function = %entity.name,
            operands = operands.len(),
            "encoded function call"
        );
        Ok(UnlockingScript { operands })
    }

    /// Encode a call by function name
    pub fn encode_call_by_name(&self, name: &str, args: &[Value]) -> Result<UnlockingScript> {
        self.encode_call(self.function(name)?, args)
    }

    /// Declared index, else one-based position among public functions
    pub fn dispatch_index(&self, entity: &AbiEntity) -> Result<u32> {
        if let Some(index) = entity.index {
            return Ok(index);
        }
        self.functions()
            .position(|e| e.name == entity.name)
            .map(|i| i as u32 + 1)
            .ok_or_else(|| Error::resolution(&entity.name, "not a public function of this contract"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn params(list: &[(&str, &str)]) -> Vec<Param> {
        list.iter().map(|(n, t)| Param::new(*n, t).unwrap()).collect()
    }

    fn abi(functions: usize) -> Vec<AbiEntity> {
        let mut abi = vec![AbiEntity::constructor(params(&[("_x", "int")]))];
        for i in 0..functions {
            abi.push(AbiEntity::function(
                format!("f{}", i),
                None,
                params(&[("x", "int"), ("ok", "bool")]),
            ));
        }
        abi
    }

    #[test]
    fn test_constructor_template() {
        let r = TypeResolver::builtin();
        let abi = abi(1);
        let coder = AbiCoder::new(&r, &abi, LibraryMode::Constructor, 2);
        let asm = coder
            .encode_constructor(&abi[0], "$_x OP_ADD", &[Value::int(5)])
            .unwrap();
        assert_eq!(asm, "05 OP_ADD");
    }

    #[test]
    fn test_constructor_unknown_placeholder_kept() {
        let r = TypeResolver::builtin();
        let abi = abi(1);
        let coder = AbiCoder::new(&r, &abi, LibraryMode::Constructor, 2);
        let asm = coder
            .encode_constructor(&abi[0], "$_x $other OP_EQUAL", &[Value::int(-1)])
            .unwrap();
        assert_eq!(asm, "81 $other OP_EQUAL");
    }

    #[test]
    fn test_constructor_keeps_template_layout() {
        let r = TypeResolver::builtin();
        let abi = abi(1);
        let coder = AbiCoder::new(&r, &abi, LibraryMode::Constructor, 2);
        let asm = coder
            .encode_constructor(&abi[0], "OP_DUP\n$_x   OP_ADD\n", &[Value::int(0)])
            .unwrap();
        assert_eq!(asm, "OP_DUP\n00   OP_ADD\n");
    }

    #[test]
    fn test_int_operands_use_minimal_pushes() {
        let cases: [(i64, &str); 6] = [
            (0, "00"),
            (-1, "4f"),
            (1, "51"),
            (16, "60"),
            (17, "0111"),
            (-1000, "02e883"),
        ];
        for (n, expected) in cases {
            let script = UnlockingScript {
                operands: vec![Operand::from_scalar(&Scalar::int(n))],
            };
            assert_eq!(script.to_hex(), expected, "encoding {}", n);
        }
        assert_eq!(Operand::from_scalar(&Scalar::int(0)).to_asm(), "00");
        assert_eq!(Operand::from_scalar(&Scalar::int(16)).to_asm(), "10");
    }

    #[test]
    fn test_arity_error() {
        let r = TypeResolver::builtin();
        let abi = abi(1);
        let coder = AbiCoder::new(&r, &abi, LibraryMode::Constructor, 2);
        let err = coder.encode_constructor(&abi[0], "$_x", &[]).unwrap_err();
        assert_eq!(
            err,
            Error::ArityError {
                entity: "constructor".to_string(),
                expected: 1,
                got: 0
            }
        );
    }

    #[test]
    fn test_dispatch_index_appended_over_threshold() {
        let r = TypeResolver::builtin();
        let args = [Value::int(7), Value::bool(true)];

        let three = abi(3);
        let coder = AbiCoder::new(&r, &three, LibraryMode::Constructor, 2);
        let script = coder.encode_call_by_name("f1", &args).unwrap();
        assert_eq!(script.len(), 3);
        assert_eq!(script.to_asm(), "07 OP_TRUE 02");
        // 7 and the index 2 use small-integer opcodes
        assert_eq!(script.to_hex(), "575152");

        let one = abi(1);
        let coder = AbiCoder::new(&r, &one, LibraryMode::Constructor, 2);
        let script = coder.encode_call_by_name("f0", &args).unwrap();
        assert_eq!(script.len(), 2);
    }

    #[test]
    fn test_declared_index_wins() {
        let r = TypeResolver::builtin();
        let mut abi = abi(3);
        abi[3].index = Some(9);
        let coder = AbiCoder::new(&r, &abi, LibraryMode::Constructor, 2);
        let script = coder
            .encode_call_by_name("f2", &[Value::int(0), Value::bool(false)])
            .unwrap();
        assert_eq!(script.to_asm(), "00 OP_FALSE 09");
    }

    #[test]
    fn test_unknown_function() {
        let r = TypeResolver::builtin();
        let abi = abi(1);
        let coder = AbiCoder::new(&r, &abi, LibraryMode::Constructor, 2);
        let err = coder.encode_call_by_name("missing", &[]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn test_call_type_error() {
        let r = TypeResolver::builtin();
        let abi = abi(1);
        let coder = AbiCoder::new(&r, &abi, LibraryMode::Constructor, 2);
        let err = coder
            .encode_call_by_name("f0", &[Value::bool(true), Value::bool(true)])
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Type);
    }
}
