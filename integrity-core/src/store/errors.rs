/*
    errors.rs - Error types for the keyspace

    Covers everything the composite key codec can reject:
    - Wrong number of segments for an encode or prefix request
    - Keys that were not produced by this codec
*/

use thiserror::Error;

/// Errors raised while encoding or splitting composite keys
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyError {
    /// Full key requested with the wrong number of segments
    #[error("expected {expected} key segments, got {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    /// Prefix requested with as many (or more) segments as a full key
    #[error("prefix must have fewer than {arity} segments, got {actual}")]
    PrefixTooLong { arity: usize, actual: usize },

    /// Key belongs to a different keyspace
    #[error("key namespace mismatch: expected {expected:?}, found {found:?}")]
    NamespaceMismatch { expected: String, found: String },

    /// Key bytes are not a valid encoding
    #[error("malformed key: {0}")]
    Malformed(String),
}

/// Result type for keyspace operations
pub type KeyResult<T> = Result<T, KeyError>;
