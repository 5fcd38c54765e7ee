/// End-to-end tests for contract interface encoding
/// Demonstrates: artifact JSON → ContractDescription → constructor / call encodings
use scriptabi::value::json::from_json;
use scriptabi::{
    CodecOptions, ContractDescription, Error, ErrorKind, LibraryMode, ScalarType, ShapeDetail,
    Value,
};
use serde_json::json;

const AUCTION: &str = r#"{
    "version": 9,
    "compilerVersion": "1.19.0",
    "contract": "Auction",
    "abi": [
        {"type": "function", "name": "bid", "index": 0, "params": [
            {"name": "bidder", "type": "PubKeyHash"},
            {"name": "amount", "type": "int"}
        ]},
        {"type": "function", "name": "close", "index": 1, "params": [
            {"name": "sig", "type": "Sig"}
        ]},
        {"type": "function", "name": "move", "index": 2, "params": [
            {"name": "path", "type": "Route"}
        ]},
        {"type": "constructor", "params": [
            {"name": "owner", "type": "PubKey"},
            {"name": "origin", "type": "Coord"},
            {"name": "limits", "type": "int[2]"},
            {"name": "vault", "type": "Vault<int>"}
        ]}
    ],
    "structs": [
        {"name": "Point", "params": [{"name": "x", "type": "int"}, {"name": "y", "type": "int"}], "genericTypes": []}
    ],
    "library": [
        {"name": "Vault", "params": [{"name": "cap", "type": "T"}, {"name": "open", "type": "bool"}],
         "properties": [{"name": "cap", "type": "T"}], "genericTypes": ["T"]}
    ],
    "alias": [
        {"name": "Route", "type": "Coord[2]"},
        {"name": "Coord", "type": "Point"}
    ],
    "stateProps": [{"name": "highest", "type": "int"}, {"name": "active", "type": "bool"}],
    "asm": "$owner $origin.x $origin.y OP_2DROP $limits[0] $limits[1] $vault.cap $vault.open OP_CHECKSIG"
}"#;

fn auction() -> ContractDescription {
    ContractDescription::from_json(AUCTION, CodecOptions::default()).unwrap()
}

fn point(x: i64, y: i64) -> Value {
    Value::object([("x", Value::int(x)), ("y", Value::int(y))])
}

#[test]
fn test_constructor_substitutes_every_leaf() {
    let contract = auction();
    let args = from_json_args(json!([
        "PubKey(b'02aa')",
        {"x": 1, "y": -1},
        [100, 0],
        [200, true]
    ]));
    let asm = contract.encode_constructor(&args).unwrap();
    assert_eq!(asm, "02aa 01 81 OP_2DROP 64 00 c800 OP_TRUE OP_CHECKSIG");
}

#[test]
fn test_constructor_example_template() {
    let json = r#"{
        "version": 8,
        "contract": "Adder",
        "abi": [{"type": "constructor", "params": [{"name": "_x", "type": "int"}]}],
        "asm": "$_x OP_ADD"
    }"#;
    let contract = ContractDescription::from_json(json, CodecOptions::default()).unwrap();
    assert_eq!(contract.encode_constructor(&[Value::int(5)]).unwrap(), "05 OP_ADD");
}

#[test]
fn test_call_appends_dispatch_index_for_three_functions() {
    let contract = auction();
    let script = contract
        .encode_call("move", &[Value::array(vec![point(1, 2), point(3, 4)])])
        .unwrap();
    // 4 leaves + dispatch index
    assert_eq!(script.len(), 5);
    assert_eq!(script.to_asm(), "01 02 03 04 02");
}

#[test]
fn test_call_alias_resolves_to_scalar() {
    let contract = auction();
    let bidder = scriptabi::parse_literal("Ripemd160(b'0011')").unwrap().value;
    let script = contract
        .encode_call("bid", &[Value::Scalar(bidder), Value::int(0)])
        .unwrap();
    assert_eq!(script.to_asm(), "0011 00 00");
}

#[test]
fn test_call_errors() {
    let contract = auction();

    let err = contract.encode_call("close", &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Arity);

    let err = contract.encode_call("close", &[Value::int(1)]).unwrap_err();
    assert_eq!(
        err,
        Error::TypeError {
            name: "sig".to_string(),
            expected: "Sig".to_string(),
            got: "int".to_string(),
        }
    );

    let err = contract
        .encode_call("move", &[Value::array(vec![point(1, 2)])])
        .unwrap_err();
    assert_eq!(err, Error::length_mismatch("path", 2, 1));

    let err = contract.encode_call("withdraw", &[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
}

#[test]
fn test_unknown_struct_member_rejected() {
    let contract = auction();
    let bad = Value::object([
        ("x", Value::int(1)),
        ("y", Value::int(2)),
        ("z", Value::int(3)),
    ]);
    let err = contract
        .encode_call("move", &[Value::array(vec![point(0, 0), bad])])
        .unwrap_err();
    match err {
        Error::ShapeMismatch { path, detail } => {
            assert_eq!(path, "path[1]");
            assert_eq!(detail, ShapeDetail::UnknownField("z".to_string()));
        }
        other => panic!("expected shape mismatch, got {:?}", other),
    }
}

#[test]
fn test_two_functions_skip_dispatch_index() {
    let json = r#"{
        "version": 9,
        "contract": "Pair",
        "abi": [
            {"type": "function", "name": "a", "params": [{"name": "x", "type": "bool"}]},
            {"type": "function", "name": "b", "params": []}
        ],
        "asm": ""
    }"#;
    let contract = ContractDescription::from_json(json, CodecOptions::default()).unwrap();
    assert_eq!(contract.encode_call("a", &[Value::bool(false)]).unwrap().to_asm(), "OP_FALSE");
    assert!(contract.encode_call("b", &[]).unwrap().is_empty());
}

#[test]
fn test_dispatch_threshold_configurable() {
    let json = r#"{
        "version": 9,
        "contract": "Solo",
        "abi": [{"type": "function", "name": "only", "params": []}],
        "asm": ""
    }"#;
    let options = CodecOptions {
        dispatch_threshold: 0,
        ..CodecOptions::default()
    };
    let contract = ContractDescription::from_json(json, options).unwrap();
    assert_eq!(contract.encode_call("only", &[]).unwrap().to_asm(), "01");
}

#[test]
fn test_interface_shape() {
    let contract = auction();
    let shape = contract.interface_shape().unwrap();
    let ctor = shape.iter().find(|s| s.name == "constructor").unwrap();
    let paths: Vec<_> = ctor.leaves.iter().map(|l| l.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "owner",
            "origin.x",
            "origin.y",
            "limits[0]",
            "limits[1]",
            "vault.cap",
            "vault.open"
        ]
    );
    assert_eq!(ctor.leaves[0].ty, ScalarType::PubKey);
    assert!(ctor.leaves.iter().all(|l| l.value.is_none()));
}

#[test]
fn test_library_properties_mode() {
    let options = CodecOptions {
        library_mode: LibraryMode::Properties,
        ..CodecOptions::default()
    };
    let contract = ContractDescription::from_json(AUCTION, options).unwrap();
    let shape = contract.interface_shape().unwrap();
    let ctor = shape.iter().find(|s| s.name == "constructor").unwrap();
    assert_eq!(ctor.leaves.last().map(|l| l.path.as_str()), Some("vault.cap"));
}

#[test]
fn test_old_artifact_rejected() {
    let json = r#"{"version": 6, "contract": "Old", "abi": [], "asm": ""}"#;
    let err = ContractDescription::from_json(json, CodecOptions::default()).unwrap_err();
    assert_eq!(
        err,
        Error::VersionError {
            reason: "artifact version is 6".to_string(),
            minimum: 8,
        }
    );
}

#[test]
fn test_cyclic_alias_rejected() {
    let json = r#"{
        "version": 9,
        "contract": "Loop",
        "abi": [],
        "alias": [{"name": "A", "type": "B"}, {"name": "B", "type": "A"}],
        "asm": ""
    }"#;
    let err = ContractDescription::from_json(json, CodecOptions::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Resolution);
}

#[test]
fn test_encoding_is_deterministic() {
    let contract = auction();
    let args = vec![Value::array(vec![point(5, 6), point(7, 8)])];
    let first = contract.encode_call("move", &args).unwrap();
    let second = contract.encode_call("move", &args).unwrap();
    assert_eq!(first.to_hex(), second.to_hex());
}

fn from_json_args(value: serde_json::Value) -> Vec<Value> {
    match from_json(&value).unwrap() {
        Value::Array(items) => items,
        other => panic!("expected array, got {}", other),
    }
}
