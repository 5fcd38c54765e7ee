//! Batch call encoder
//!
//! Uses Rayon for work-stealing parallelism over a shared, read-only
//! [`ContractDescription`].

use crate::abi::{ContractDescription, UnlockingScript};
use crate::error::Result;
use crate::value::Value;
use rayon::prelude::*;

/// Configuration for batch encoding
#[derive(Debug, Clone)]
pub struct ParallelConfig {
    /// Upper bound on concurrently encoded calls (default: num_cpus)
    pub max_parallelism: usize,
    /// Stop at the first failing call instead of reporting each result
    pub fail_fast: bool,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            max_parallelism: num_cpus::get(),
            fail_fast: false,
        }
    }
}

/// One function call to encode
#[derive(Debug, Clone, PartialEq)]
pub struct CallRequest {
    /// Public function name
    pub function: String,
    /// Arguments in declaration order
    pub args: Vec<Value>,
}

impl CallRequest {
    /// Create a request
    pub fn new(function: impl Into<String>, args: Vec<Value>) -> Self {
        CallRequest {
            function: function.into(),
            args,
        }
    }
}

/// Encode many calls against the same contract
///
/// # Returns
/// * `Ok(results)` - one result per request, in request order
/// * `Err(Error)` - the first failure, only when `fail_fast` is set
///
/// # Example
/// ```ignore
/// let calls = vec![
///     CallRequest::new("unlock", vec![Value::int(1)]),
///     CallRequest::new("unlock", vec![Value::int(2)]),
/// ];
/// let scripts = encode_calls(&contract, calls, ParallelConfig::default())?;
/// ```
pub fn encode_calls(
    contract: &ContractDescription,
    requests: Vec<CallRequest>,
    config: ParallelConfig,
) -> Result<Vec<Result<UnlockingScript>>> {
    if requests.is_empty() {
        return Ok(Vec::new());
    }

    let encode = |req: &CallRequest| contract.encode_call(&req.function, &req.args);

    if requests.len() == 1 {
        let result = encode(&requests[0]);
        if config.fail_fast {
            return result.map(|script| vec![Ok(script)]);
        }
        return Ok(vec![result]);
    }

    // Each worker takes at least this many calls, bounding the split count
    let min_len = requests.len().div_ceil(config.max_parallelism.max(1));
    tracing::debug!(
        calls = requests.len(),
        max_parallelism = config.max_parallelism,
        "encoding calls in parallel"
    );

    if config.fail_fast {
        requests
            .par_iter()
            .with_min_len(min_len)
            .map(|req| encode(req).map(Ok))
            .collect()
    } else {
        Ok(requests
            .par_iter()
            .with_min_len(min_len)
            .map(encode)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CodecOptions;
    use crate::error::ErrorKind;

    fn contract() -> ContractDescription {
        let json = r#"{
            "version": 9,
            "contract": "Multi",
            "abi": [
                {"type": "function", "name": "a", "params": [{"name": "x", "type": "int"}]},
                {"type": "function", "name": "b", "params": [{"name": "x", "type": "int"}]},
                {"type": "function", "name": "c", "params": [{"name": "x", "type": "int"}]}
            ],
            "asm": "OP_NOP"
        }"#;
        ContractDescription::from_json(json, CodecOptions::default()).unwrap()
    }

    #[test]
    fn test_encode_calls_in_order() {
        let contract = contract();
        let requests: Vec<_> = (0..20)
            .map(|i| CallRequest::new(["a", "b", "c"][i % 3], vec![Value::int(i as i64)]))
            .collect();
        let results = encode_calls(&contract, requests, ParallelConfig::default()).unwrap();
        assert_eq!(results.len(), 20);
        let third = results[2].as_ref().unwrap();
        assert_eq!(third.to_asm(), "02 03");
    }

    #[test]
    fn test_encode_calls_empty() {
        let results = encode_calls(&contract(), vec![], ParallelConfig::default()).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_fail_fast() {
        let requests = vec![
            CallRequest::new("a", vec![Value::int(1)]),
            CallRequest::new("nope", vec![]),
            CallRequest::new("b", vec![Value::int(1)]),
        ];
        let config = ParallelConfig {
            fail_fast: true,
            ..Default::default()
        };
        let err = encode_calls(&contract(), requests, config).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }

    #[test]
    fn test_collect_all() {
        let requests = vec![
            CallRequest::new("a", vec![Value::int(1)]),
            CallRequest::new("b", vec![Value::bool(true)]),
            CallRequest::new("c", vec![Value::int(3)]),
        ];
        let config = ParallelConfig {
            fail_fast: false,
            max_parallelism: 2,
        };
        let results = encode_calls(&contract(), requests, config).unwrap();
        assert!(results[0].is_ok());
        assert_eq!(results[1].as_ref().unwrap_err().kind(), ErrorKind::Type);
        assert!(results[2].is_ok());
    }
}
