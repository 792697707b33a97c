//! In-memory host
//!
//! Ordered map state shared between any number of caller contexts, plus
//! switches for injecting failures. Used by tests and benchmarks.

use super::{ChaincodeHost, HostError, HostResult, Invocation, StateEntry, StateScan};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

type State = BTreeMap<Vec<u8>, Vec<u8>>;

fn handle_poison<T>(_err: PoisonError<T>) -> HostError {
    HostError::Storage("Lock poisoned: a thread panicked while holding the lock".to_string())
}

/// In-memory host context
///
/// Clones made through `with_caller` share state and scan accounting, so
/// several callers can act on one store.
#[derive(Debug, Clone, Default)]
pub struct MemoryHost {
    state: Arc<Mutex<State>>,
    open_scans: Arc<AtomicUsize>,
    identity: Option<Vec<u8>>,
    invocation: Option<Invocation>,
    fail_writes: bool,
    fail_scan_after: Option<usize>,
    fail_scan_open: bool,
}

impl MemoryHost {
    /// Empty store with no caller identity
    pub fn new() -> Self {
        Self::default()
    }

    /// Context on the same store acting as `identity`
    pub fn with_caller(&self, identity: impl Into<Vec<u8>>) -> Self {
        Self {
            identity: Some(identity.into()),
            invocation: None,
            ..self.clone()
        }
    }

    /// Context on the same store with no caller identity
    pub fn without_caller(&self) -> Self {
        Self {
            identity: None,
            invocation: None,
            ..self.clone()
        }
    }

    /// Same context carrying `invocation`
    pub fn invoking(mut self, invocation: Invocation) -> Self {
        self.invocation = Some(invocation);
        self
    }

    /// Make every `put_state` fail
    pub fn fail_writes(mut self, enabled: bool) -> Self {
        self.fail_writes = enabled;
        self
    }

    /// Make scans fail after yielding `entries` entries
    pub fn fail_scan_after(mut self, entries: usize) -> Self {
        self.fail_scan_after = Some(entries);
        self
    }

    /// Make every `scan_prefix` fail before a scan is opened
    pub fn fail_scan_open(mut self, enabled: bool) -> Self {
        self.fail_scan_open = enabled;
        self
    }

    /// Write a raw key, bypassing any codec
    pub fn insert_raw(&self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) -> HostResult<()> {
        self.state
            .lock()
            .map_err(handle_poison)?
            .insert(key.into(), value.into());
        Ok(())
    }

    /// Value stored at `key`
    pub fn get_raw(&self, key: &[u8]) -> HostResult<Option<Vec<u8>>> {
        Ok(self.state.lock().map_err(handle_poison)?.get(key).cloned())
    }

    /// Number of stored keys
    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Scans opened and not yet closed
    pub fn open_scans(&self) -> usize {
        self.open_scans.load(Ordering::SeqCst)
    }
}

impl ChaincodeHost for MemoryHost {
    fn caller_identity(&self) -> HostResult<Vec<u8>> {
        self.identity
            .clone()
            .ok_or_else(|| HostError::IdentityUnavailable("no caller in context".to_string()))
    }

    fn put_state(&self, key: &[u8], value: &[u8]) -> HostResult<()> {
        if self.fail_writes {
            return Err(HostError::Storage("write rejected".to_string()));
        }
        self.insert_raw(key, value)
    }

    fn scan_prefix<'a>(&'a self, prefix: &[u8]) -> HostResult<Box<dyn StateScan + 'a>> {
        if self.fail_scan_open {
            return Err(HostError::Storage("range query rejected".to_string()));
        }
        let entries: Vec<StateEntry> = self
            .state
            .lock()
            .map_err(handle_poison)?
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| StateEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect();

        self.open_scans.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryScan {
            entries: entries.into_iter(),
            yielded: 0,
            fail_after: self.fail_scan_after,
            open_scans: Arc::clone(&self.open_scans),
            closed: false,
        }))
    }

    fn invocation(&self) -> HostResult<Invocation> {
        self.invocation
            .clone()
            .ok_or_else(|| HostError::InvocationUnavailable("no invocation in context".to_string()))
    }
}

/// Snapshot scan taken when the scan is opened
struct MemoryScan {
    entries: std::vec::IntoIter<StateEntry>,
    yielded: usize,
    fail_after: Option<usize>,
    open_scans: Arc<AtomicUsize>,
    closed: bool,
}

impl StateScan for MemoryScan {
    fn next_entry(&mut self) -> HostResult<Option<StateEntry>> {
        if self.closed {
            return Err(HostError::ScanClosed);
        }
        if self.fail_after == Some(self.yielded) {
            return Err(HostError::Storage("scan interrupted".to_string()));
        }
        let entry = self.entries.next();
        if entry.is_some() {
            self.yielded += 1;
        }
        Ok(entry)
    }

    fn close(&mut self) -> HostResult<()> {
        if !self.closed {
            self.closed = true;
            self.open_scans.fetch_sub(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
