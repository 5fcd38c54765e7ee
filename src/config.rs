//! Codec options

use crate::abi::artifact::MINIMUM_ARTIFACT_VERSION;
use crate::abi::flatten::LibraryMode;
use crate::codec::state::{LengthWidth, StateCodec};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Options applied to every encoding made through a contract description
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodecOptions {
    /// Width of the state blob's length suffix
    pub state_length_width: LengthWidth,
    /// How library-typed arguments are matched
    pub library_mode: LibraryMode,
    /// Public-function count above which calls carry a dispatch index
    pub dispatch_threshold: usize,
    /// Oldest artifact version accepted
    pub minimum_artifact_version: u32,
}

impl Default for CodecOptions {
    fn default() -> Self {
        Self {
            state_length_width: LengthWidth::Two,
            library_mode: LibraryMode::Constructor,
            dispatch_threshold: 2,
            minimum_artifact_version: MINIMUM_ARTIFACT_VERSION,
        }
    }
}

impl CodecOptions {
    /// Load options from JSON; absent keys keep their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::InvalidArtifact(format!("codec options: {}", e)))
    }

    /// State codec with the configured suffix width
    pub fn state_codec(&self) -> StateCodec {
        StateCodec::new(self.state_length_width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = CodecOptions::default();
        assert_eq!(opts.state_length_width, LengthWidth::Two);
        assert_eq!(opts.dispatch_threshold, 2);
        assert_eq!(opts.minimum_artifact_version, 8);
    }

    #[test]
    fn test_partial_json() {
        let opts =
            CodecOptions::from_json(r#"{"state_length_width": "four", "library_mode": "properties"}"#)
                .unwrap();
        assert_eq!(opts.state_length_width, LengthWidth::Four);
        assert_eq!(opts.library_mode, LibraryMode::Properties);
        assert_eq!(opts.dispatch_threshold, 2);
    }

    #[test]
    fn test_bad_json() {
        assert!(CodecOptions::from_json(r#"{"state_length_width": "three"}"#).is_err());
    }
}
