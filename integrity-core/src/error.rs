//! Error types for hash submission and query
//!
//! Every failure an operation can produce is one `IntegrityError` variant.
//! Caller errors and most system errors carry a wire code and are reported
//! in the `{"code": .., "reason": ..}` envelope. Failures while reading a
//! sender's records carry no code and are reported as bare text.

use crate::store::KeyError;
use thiserror::Error;

/// Result type for integrity operations
pub type IntegrityResult<T> = Result<T, IntegrityError>;

/// Wire code for host or store failures
pub const CODE_SYSTEM: u16 = 300;

/// Wire code for malformed invocations
pub const CODE_WRONG_FORMAT: u16 = 301;

/// Errors surfaced by the dispatcher and handlers
#[derive(Error, Debug)]
pub enum IntegrityError {
    /// Argument count does not match the operation
    #[error("{operation} expects {expected} argument(s), got {actual}")]
    WrongFormat {
        operation: &'static str,
        expected: usize,
        actual: usize,
    },

    /// Operation name is not part of the surface
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// Execution context could not supply the caller identity
    #[error("caller identity unavailable: {0}")]
    IdentityUnavailable(String),

    /// Execution context could not supply the invocation
    #[error("invocation unavailable: {0}")]
    InvocationUnavailable(String),

    /// Host rejected the write
    #[error("store write failed: {0}")]
    StoreWriteFailed(String),

    /// Host failed to open a scan over a sender's records
    #[error("Could not retrieve value for {sender}: {detail}")]
    RetrieveFailed { sender: String, detail: String },

    /// Host failed to advance or close a scan
    #[error("store read failed: {0}")]
    StoreReadFailed(String),

    /// Query found no records for the sender
    #[error("No variable by the name {0} exists")]
    NoSuchSender(String),

    /// Key could not be encoded or split
    #[error("malformed key: {0}")]
    MalformedKey(#[from] KeyError),

    /// A stored key under the record namespace failed to split
    #[error("store corruption at key {key}: {source}")]
    StoreCorruption {
        key: String,
        #[source]
        source: KeyError,
    },

    /// Response payload could not be serialized
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl IntegrityError {
    /// Wire code reported to the host, if the error is sent in an envelope
    pub fn code(&self) -> Option<u16> {
        match self {
            IntegrityError::WrongFormat { .. } | IntegrityError::UnknownOperation(_) => {
                Some(CODE_WRONG_FORMAT)
            }
            IntegrityError::NoSuchSender(_)
            | IntegrityError::RetrieveFailed { .. }
            | IntegrityError::StoreReadFailed(_)
            | IntegrityError::StoreCorruption { .. }
            | IntegrityError::Serialization(_) => None,
            _ => Some(CODE_SYSTEM),
        }
    }

    /// True for failures caused by the environment rather than the caller
    pub fn is_system(&self) -> bool {
        !matches!(
            self,
            IntegrityError::WrongFormat { .. }
                | IntegrityError::UnknownOperation(_)
                | IntegrityError::NoSuchSender(_)
        )
    }

    /// Reason string reported to the host
    ///
    /// Caller errors collapse to one message so malformed arguments and
    /// unknown operations are indistinguishable on the wire. Scan and
    /// decode failures report the underlying error text only.
    pub fn reason(&self) -> String {
        match self {
            IntegrityError::WrongFormat { .. } | IntegrityError::UnknownOperation(_) => {
                "command format is wrong".to_string()
            }
            IntegrityError::StoreReadFailed(detail) | IntegrityError::Serialization(detail) => {
                detail.clone()
            }
            IntegrityError::StoreCorruption { source, .. } => source.to_string(),
            IntegrityError::NoSuchSender(_) | IntegrityError::RetrieveFailed { .. } => {
                self.to_string()
            }
            _ => format!("system error: {}", self),
        }
    }
}

impl From<serde_json::Error> for IntegrityError {
    fn from(e: serde_json::Error) -> Self {
        IntegrityError::Serialization(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = IntegrityError::WrongFormat {
            operation: "submitHash",
            expected: 3,
            actual: 1,
        };
        assert_eq!(err.code(), Some(CODE_WRONG_FORMAT));
        assert!(!err.is_system());

        let err = IntegrityError::UnknownOperation("deleteHash".to_string());
        assert_eq!(err.code(), Some(CODE_WRONG_FORMAT));

        let err = IntegrityError::StoreWriteFailed("disk full".to_string());
        assert_eq!(err.code(), Some(CODE_SYSTEM));
        assert!(err.is_system());
    }

    #[test]
    fn test_query_failures_are_uncoded() {
        let err = IntegrityError::NoSuchSender("ab".to_string());
        assert_eq!(err.code(), None);
        assert!(!err.is_system());

        let err = IntegrityError::RetrieveFailed {
            sender: "ab".to_string(),
            detail: "peer unreachable".to_string(),
        };
        assert_eq!(err.code(), None);
        assert!(err.is_system());
        assert_eq!(err.reason(), "Could not retrieve value for ab: peer unreachable");

        let err = IntegrityError::StoreReadFailed("scan interrupted".to_string());
        assert_eq!(err.code(), None);
        assert_eq!(err.reason(), "scan interrupted");
    }

    #[test]
    fn test_corruption_reports_key_error_text() {
        let err = IntegrityError::StoreCorruption {
            key: "00ff".to_string(),
            source: KeyError::Malformed("unterminated segment".to_string()),
        };
        assert_eq!(err.code(), None);
        assert_eq!(err.reason(), "malformed key: unterminated segment");
    }

    #[test]
    fn test_caller_errors_share_reason() {
        let wrong = IntegrityError::WrongFormat {
            operation: "queryHash",
            expected: 1,
            actual: 0,
        };
        let unknown = IntegrityError::UnknownOperation("init".to_string());
        assert_eq!(wrong.reason(), unknown.reason());
        assert_eq!(wrong.reason(), "command format is wrong");
    }

    #[test]
    fn test_system_reason_prefix() {
        let err = IntegrityError::IdentityUnavailable("no creator".to_string());
        assert_eq!(err.reason(), "system error: caller identity unavailable: no creator");
    }

    #[test]
    fn test_no_such_sender_reason() {
        let err = IntegrityError::NoSuchSender("beef".to_string());
        assert_eq!(err.reason(), "No variable by the name beef exists");
    }

    #[test]
    fn test_key_error_conversion() {
        let err: IntegrityError = KeyError::Malformed("x".to_string()).into();
        assert!(matches!(err, IntegrityError::MalformedKey(_)));
        assert!(err.is_system());
    }

    #[test]
    fn test_json_error_conversion() {
        let json_err = serde_json::from_str::<String>("invalid json").unwrap_err();
        let err: IntegrityError = json_err.into();
        assert!(matches!(err, IntegrityError::Serialization(_)));
    }
}
