//! Host execution environment
//!
//! The host owns persistence, consensus and caller authentication. This
//! module only describes what the handlers consume from it: the caller's
//! identity bytes, point writes, prefix scans and the invocation arguments.

use thiserror::Error;

pub mod memory;
pub mod sqlite;

pub use memory::MemoryHost;
pub use sqlite::{SqliteHost, SqliteStateDb};

/// Errors reported by a host implementation
#[derive(Debug, Error)]
pub enum HostError {
    /// Execution context has no caller identity
    #[error("identity unavailable: {0}")]
    IdentityUnavailable(String),

    /// Execution context has no invocation
    #[error("invocation unavailable: {0}")]
    InvocationUnavailable(String),

    /// Underlying state database failed
    #[error("storage error: {0}")]
    Storage(String),

    /// Scan handle used after close
    #[error("scan already closed")]
    ScanClosed,
}

/// Result type for host calls
pub type HostResult<T> = Result<T, HostError>;

/// One key/value pair yielded by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Operation name and positional arguments of one call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub function: String,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new<S: Into<String>>(function: impl Into<String>, args: impl IntoIterator<Item = S>) -> Self {
        Self {
            function: function.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

/// Range iteration handle over the host's state
///
/// Entries come back in ascending key order. The handle is finite, cannot
/// be restarted, and must be closed once the caller is done with it.
pub trait StateScan {
    /// Next entry, or `None` once the range is exhausted
    fn next_entry(&mut self) -> HostResult<Option<StateEntry>>;

    /// Release host-side scan resources
    fn close(&mut self) -> HostResult<()>;
}

/// Everything a handler needs from the execution environment
pub trait ChaincodeHost {
    /// Opaque identity bytes of the caller of the current invocation
    fn caller_identity(&self) -> HostResult<Vec<u8>>;

    /// Create or overwrite the value at `key`
    fn put_state(&self, key: &[u8], value: &[u8]) -> HostResult<()>;

    /// Open a scan over every key starting with `prefix`
    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> HostResult<Box<dyn StateScan + 'a>>;

    /// Operation name and arguments of the current invocation
    fn invocation(&self) -> HostResult<Invocation>;
}

/// Smallest key strictly greater than every key starting with `prefix`
///
/// Returns `None` when no such bound exists (empty prefix or all 0xff),
/// meaning the range is unbounded above.
pub fn prefix_successor(prefix: &[u8]) -> Option<Vec<u8>> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < u8::MAX {
            end.push(last + 1);
            return Some(end);
        }
    }
    None
}
