//! Parallel batch encoding
//!
//! Encodes many function calls against one shared contract description.

mod executor;

pub use executor::{encode_calls, CallRequest, ParallelConfig};
