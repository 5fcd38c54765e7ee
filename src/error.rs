//! Error types for the ABI and state encoding engine

use std::fmt;
use thiserror::Error;

/// Engine errors
///
/// Every failure is raised synchronously and leaves no partial state behind;
/// the caller corrects the input and retries.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Literal matched no supported grammar production
    ///
    /// **Triggered by:** `b'abc'` (odd-length hex), `1.5`, `Foo(3)`
    #[error("Parse error: cannot parse literal `{literal}`: {reason}")]
    ParseError {
        /// The literal text as supplied
        literal: String,
        /// Which production failed
        reason: String,
    },

    /// Argument count differs from the declared parameter count
    #[error("Arity error: `{entity}` expects {expected} arguments, got {got}")]
    ArityError {
        /// Constructor or function name
        entity: String,
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        got: usize,
    },

    /// Argument type differs from the declared type
    ///
    /// **Triggered by:** passing `true` for an `int` parameter, or an object for an array
    #[error("Type error: `{name}` expects {expected}, got {got}")]
    TypeError {
        /// Diagnostic path of the offending argument
        name: String,
        /// Declared type
        expected: String,
        /// Actual type or value shape
        got: String,
    },

    /// Array length or struct field set differs from the declared shape
    #[error("Shape mismatch at `{path}`: {detail}")]
    ShapeMismatch {
        /// Diagnostic path of the offending argument
        path: String,
        /// What exactly mismatched
        detail: ShapeDetail,
    },

    /// A generic parameter was bound to two different concrete types
    #[error("Generic conflict in `{template}`: parameter `{param}` bound to both {first} and {second}")]
    GenericConflict {
        /// Template (struct or library) being instantiated
        template: String,
        /// Generic parameter name
        param: String,
        /// Existing binding
        first: String,
        /// Conflicting binding
        second: String,
    },

    /// Unknown or cyclic alias/struct/library name
    #[error("Resolution error: `{name}`: {reason}")]
    ResolutionError {
        /// Name that failed to resolve
        name: String,
        /// Why it failed
        reason: String,
    },

    /// Numeric magnitude exceeds the requested fixed-width encoding
    #[error("Overflow: {value} does not fit in {length} bytes")]
    Overflow {
        /// Decimal rendering of the value
        value: String,
        /// Requested width in bytes
        length: usize,
    },

    /// Artifact schema version unsupported or required fields missing
    #[error("Unsupported artifact: {reason}; minimum supported version is {minimum}")]
    VersionError {
        /// What was wrong with the artifact
        reason: String,
        /// Minimum supported schema version
        minimum: u32,
    },

    /// State blob cannot be decoded against the schema
    #[error("Malformed state: {reason}")]
    MalformedState {
        /// Error description
        reason: String,
    },

    /// Artifact JSON could not be deserialized
    #[error("Invalid artifact: {0}")]
    InvalidArtifact(String),

    /// Hex input is malformed
    #[error("Invalid hex `{input}`: {reason}")]
    InvalidHex {
        /// Offending input
        input: String,
        /// Decoder message
        reason: String,
    },
}

/// Detail attached to [`Error::ShapeMismatch`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeDetail {
    /// Array or positional argument list has the wrong length
    Length {
        /// Declared length
        expected: usize,
        /// Supplied length
        actual: usize,
    },
    /// A declared field is absent from the argument object
    MissingField(String),
    /// The argument object carries a key that is not declared
    UnknownField(String),
    /// A key appears twice in an object, map or set
    DuplicateKey(String),
}

impl fmt::Display for ShapeDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShapeDetail::Length { expected, actual } => {
                write!(f, "expected length {}, got {}", expected, actual)
            }
            ShapeDetail::MissingField(field) => write!(f, "missing field `{}`", field),
            ShapeDetail::UnknownField(field) => write!(f, "unknown field `{}`", field),
            ShapeDetail::DuplicateKey(key) => write!(f, "duplicate key `{}`", key),
        }
    }
}

/// Fieldless classification of [`Error`], convenient for matching
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`Error::ParseError`]
    Parse,
    /// See [`Error::ArityError`]
    Arity,
    /// See [`Error::TypeError`]
    Type,
    /// See [`Error::ShapeMismatch`]
    ShapeMismatch,
    /// See [`Error::GenericConflict`]
    GenericConflict,
    /// See [`Error::ResolutionError`]
    Resolution,
    /// See [`Error::Overflow`]
    Overflow,
    /// See [`Error::VersionError`]
    Version,
    /// See [`Error::MalformedState`]
    MalformedState,
    /// See [`Error::InvalidArtifact`]
    InvalidArtifact,
    /// See [`Error::InvalidHex`]
    InvalidHex,
}

impl Error {
    /// Create a parse error for a literal
    pub fn parse(literal: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ParseError {
            literal: literal.into(),
            reason: reason.into(),
        }
    }

    /// Create a resolution error for a type name
    pub fn resolution(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::ResolutionError {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a type mismatch error
    pub fn type_mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Error::TypeError {
            name: name.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    /// Create a length mismatch error
    pub fn length_mismatch(path: impl Into<String>, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch {
            path: path.into(),
            detail: ShapeDetail::Length { expected, actual },
        }
    }

    /// Create a malformed state error
    pub fn malformed_state(reason: impl Into<String>) -> Self {
        Error::MalformedState {
            reason: reason.into(),
        }
    }

    /// Classify the error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ParseError { .. } => ErrorKind::Parse,
            Error::ArityError { .. } => ErrorKind::Arity,
            Error::TypeError { .. } => ErrorKind::Type,
            Error::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            Error::GenericConflict { .. } => ErrorKind::GenericConflict,
            Error::ResolutionError { .. } => ErrorKind::Resolution,
            Error::Overflow { .. } => ErrorKind::Overflow,
            Error::VersionError { .. } => ErrorKind::Version,
            Error::MalformedState { .. } => ErrorKind::MalformedState,
            Error::InvalidArtifact(_) => ErrorKind::InvalidArtifact,
            Error::InvalidHex { .. } => ErrorKind::InvalidHex,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::InvalidArtifact(err.to_string())
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = Error::length_mismatch("a", 2, 3);
        assert_eq!(
            err.to_string(),
            "Shape mismatch at `a`: expected length 2, got 3"
        );
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_generic_conflict_names_both_types() {
        let err = Error::GenericConflict {
            template: "Pair".to_string(),
            param: "T".to_string(),
            first: "int".to_string(),
            second: "bool".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("`T`"));
        assert!(msg.contains("int"));
        assert!(msg.contains("bool"));
    }

    #[test]
    fn test_version_error_names_minimum() {
        let err = Error::VersionError {
            reason: "version 7".to_string(),
            minimum: 8,
        };
        assert!(err.to_string().contains("minimum supported version is 8"));
    }
}
