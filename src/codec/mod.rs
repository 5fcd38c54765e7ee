//! Byte-level encodings: script numbers, push framing, and state blobs

pub mod scalar;
pub mod script;
pub mod state;

pub use scalar::{decode_bool, decode_hex, decode_int, encode_bool, encode_int, encode_script_num};
pub use script::{encode_push, push_data, Chunk, ChunkReader};
pub use state::{
    deserialize_state, deserialize_state_value, serialize_state, LengthWidth, State, StateCodec, StateField, StateSchema,
};
