/// State blob tests through the public API
/// Demonstrates: state props → blob → locking script → decoded state
use scriptabi::codec::{deserialize_state, serialize_state};
use scriptabi::{
    CodecOptions, ContractDescription, ErrorKind, LengthWidth, Scalar, ScalarType, State,
    StateCodec, StateField, StateSchema, Value,
};

#[test]
fn test_counter_and_flag_blob() {
    let state = State::new().with("counter", 11).with("flag", true);
    let blob = serialize_state(&state, LengthWidth::Two).unwrap();

    // push(11) ‖ push(0x01) ‖ len = 4 as two bytes
    assert_eq!(blob, vec![0x01, 0x0b, 0x01, 0x01, 0x04, 0x00]);
    assert_eq!(deserialize_state(&blob, &state, LengthWidth::Two).unwrap(), state);
}

#[test]
fn test_every_width() {
    let state = State::new()
        .with("a", -1000)
        .with("b", Scalar::bytes(vec![0xfe; 130]))
        .with("c", false);
    let schema = StateSchema::from_sample(&state);

    // 137 bytes of pushes do not fit a one-byte sign-magnitude length
    let err = StateCodec::new(LengthWidth::One).serialize(&state).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Overflow);

    for width in [LengthWidth::Two, LengthWidth::Four, LengthWidth::Eight] {
        let codec = StateCodec::new(width);
        let blob = codec.serialize(&state).unwrap();
        assert_eq!(blob.len(), 3 + 132 + 2 + width.bytes());
        assert_eq!(codec.deserialize(&blob, &schema).unwrap(), state);
    }
}

#[test]
fn test_explicit_schema_with_wrappers() {
    let key = Scalar::from_hex(ScalarType::PubKey, &"02".repeat(33)).unwrap();
    let state = State::new().with("owner", key.clone()).with("nonce", 0);
    let codec = StateCodec::default();
    let hex = codec.serialize_hex(&state).unwrap();

    let schema = StateSchema::new(vec![
        StateField::new("owner", ScalarType::PubKey),
        StateField::new("nonce", ScalarType::Int),
    ]);
    let back = codec.deserialize_hex(&hex, &schema).unwrap();
    assert_eq!(back.get("owner"), Some(&key));
    assert_eq!(back.get("nonce"), Some(&Scalar::int(0)));
}

#[test]
fn test_malformed_blobs() {
    let codec = StateCodec::new(LengthWidth::Two);
    let schema = StateSchema::positional(&[ScalarType::Int]);

    // too short for the suffix
    assert_eq!(codec.deserialize(&[0x01], &schema).unwrap_err().kind(), ErrorKind::MalformedState);
    // bool that is neither 0 nor 1
    let blob = [0x01, 0x07, 0x02, 0x00];
    let bool_schema = StateSchema::positional(&[ScalarType::Bool]);
    assert_eq!(
        codec.deserialize(&blob, &bool_schema).unwrap_err().kind(),
        ErrorKind::MalformedState
    );
    // non-push opcode inside the region
    let blob = [0xac, 0x01, 0x00];
    assert_eq!(codec.deserialize(&blob, &schema).unwrap_err().kind(), ErrorKind::MalformedState);
    assert_eq!(
        codec.deserialize_hex("zz", &schema).unwrap_err().kind(),
        ErrorKind::InvalidHex
    );
}

#[test]
fn test_small_int_opcodes_accepted() {
    // OP_5 and OP_1NEGATE written by other encoders
    let blob = [0x55, 0x4f, 0x02, 0x00];
    let schema = StateSchema::positional(&[ScalarType::Int, ScalarType::Int]);
    let state = StateCodec::default().deserialize(&blob, &schema).unwrap();
    assert_eq!(state.values(), vec![Scalar::int(5), Scalar::int(-1)]);
}

#[test]
fn test_contract_state_from_artifact() {
    let json = r#"{
        "version": 9,
        "contract": "Ledger",
        "abi": [{"type": "constructor", "params": []}],
        "structs": [{"name": "Entry", "params": [{"name": "who", "type": "PubKeyHash"}, {"name": "amount", "type": "int"}]}],
        "stateProps": [
            {"name": "entries", "type": "Entry[2]"},
            {"name": "closed", "type": "bool"}
        ],
        "asm": "OP_TRUE"
    }"#;
    let options = CodecOptions {
        state_length_width: LengthWidth::Four,
        ..CodecOptions::default()
    };
    let contract = ContractDescription::from_json(json, options).unwrap();

    let who = Value::Scalar(Scalar::from_hex(ScalarType::Ripemd160, &"ab".repeat(20)).unwrap());
    let entry = |amount: i64| Value::object([("who", who.clone()), ("amount", Value::int(amount))]);
    let props = Value::object([
        ("entries", Value::array(vec![entry(10), entry(0)])),
        ("closed", Value::bool(false)),
    ]);

    let blob = contract.serialize_state(&props).unwrap();
    let mut script = vec![0x51];
    script.push(0x6a);
    script.extend_from_slice(&blob);

    let state = contract.deserialize_state(&script).unwrap();
    let names: Vec<_> = state.iter().map(|(n, _)| n.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "entries[0].who",
            "entries[0].amount",
            "entries[1].who",
            "entries[1].amount",
            "closed"
        ]
    );
    assert_eq!(state.get("entries[0].amount"), Some(&Scalar::int(10)));
    assert_eq!(state.get("closed"), Some(&Scalar::bool(false)));

    // The nested props come back as written
    assert_eq!(contract.deserialize_props(&script).unwrap(), props);
}

#[test]
fn test_structured_sample_roundtrip() {
    let props = Value::object([
        ("owner", Value::Scalar(Scalar::from_hex(ScalarType::PubKey, &"03".repeat(33)).unwrap())),
        ("grid", Value::array(vec![
            Value::array(vec![Value::int(0), Value::int(1)]),
            Value::array(vec![Value::int(-1), Value::int(1 << 20)]),
        ])),
    ]);
    let codec = StateCodec::new(LengthWidth::Two);
    let script = [vec![0x00, 0x6a], codec.serialize_value(&props).unwrap()].concat();
    assert_eq!(
        scriptabi::codec::deserialize_state_value(&script, &props, LengthWidth::Two).unwrap(),
        props
    );
}

#[test]
fn test_contract_state_missing_prop() {
    let json = r#"{
        "version": 9,
        "contract": "C",
        "abi": [],
        "stateProps": [{"name": "a", "type": "int"}, {"name": "b", "type": "int"}],
        "asm": ""
    }"#;
    let contract = ContractDescription::from_json(json, CodecOptions::default()).unwrap();
    let err = contract
        .serialize_state(&Value::object([("a", Value::int(1))]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
}
