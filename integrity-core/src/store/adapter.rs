/*
    adapter.rs - Record store adapter

    Puts the composite key codec in front of the host's key/value calls:
    - put: (sender, bucket, index) -> key, hash -> value
    - scan_sender: prefix scan over one sender, yielding decoded records

    A RecordScan owns the host scan handle and closes it exactly once,
    either through `close` or when it is dropped on an early return.
*/

use super::composite_key::{CompositeKeyCodec, RECORD_ARITY};
use super::errors::KeyError;
use super::record::HashRecord;
use crate::error::{IntegrityError, IntegrityResult};
use crate::host::{ChaincodeHost, StateEntry, StateScan};
use crate::identity::SenderToken;
use tracing::{trace, warn};

/// Record-level view over a host's state
pub struct RecordStore<'h, H: ChaincodeHost + ?Sized> {
    host: &'h H,
    codec: &'h CompositeKeyCodec,
}

impl<'h, H: ChaincodeHost + ?Sized> RecordStore<'h, H> {
    pub fn new(host: &'h H, codec: &'h CompositeKeyCodec) -> Self {
        debug_assert_eq!(codec.arity(), RECORD_ARITY);
        Self { host, codec }
    }

    /// Create or overwrite the record at `(sender, bucket, index)`
    pub fn put(
        &self,
        sender: &SenderToken,
        bucket: &str,
        index: &str,
        hash: &str,
    ) -> IntegrityResult<()> {
        let key = self.codec.encode(&[sender.as_str(), bucket, index])?;
        trace!(key = %hex::encode(&key), "Writing record");
        self.host
            .put_state(&key, hash.as_bytes())
            .map_err(|e| IntegrityError::StoreWriteFailed(e.to_string()))
    }

    /// Open a scan over every record anchored by `sender`
    pub fn scan_sender(&self, sender: &str) -> IntegrityResult<RecordScan<'h>> {
        let prefix = self.codec.encode_prefix(&[sender])?;
        let scan = self
            .host
            .scan_prefix(&prefix)
            .map_err(|e| IntegrityError::RetrieveFailed {
                sender: sender.to_string(),
                detail: e.to_string(),
            })?;
        Ok(RecordScan {
            scan: Some(scan),
            codec: self.codec,
            fused: false,
        })
    }
}

/// Iterator of decoded records over an open host scan
///
/// Yields records in key order. Stops after the first error.
pub struct RecordScan<'h> {
    scan: Option<Box<dyn StateScan + 'h>>,
    codec: &'h CompositeKeyCodec,
    fused: bool,
}

impl RecordScan<'_> {
    /// Close the host scan, reporting any failure to release it
    pub fn close(mut self) -> IntegrityResult<()> {
        self.release()
    }

    fn release(&mut self) -> IntegrityResult<()> {
        match self.scan.take() {
            Some(mut scan) => scan
                .close()
                .map_err(|e| IntegrityError::StoreReadFailed(e.to_string())),
            None => Ok(()),
        }
    }

    fn decode(&self, entry: StateEntry) -> IntegrityResult<HashRecord> {
        let corrupt = |source: KeyError| IntegrityError::StoreCorruption {
            key: hex::encode(&entry.key),
            source,
        };

        let segments = self.codec.split(&entry.key).map_err(corrupt)?;
        let [sender, bucket, index]: [String; RECORD_ARITY] =
            segments.try_into().map_err(|segments: Vec<String>| {
                corrupt(KeyError::ArityMismatch {
                    expected: RECORD_ARITY,
                    actual: segments.len(),
                })
            })?;

        let hash = match String::from_utf8(entry.value) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(key = %hex::encode(&entry.key), "Stored hash is not UTF-8");
                String::from_utf8_lossy(e.as_bytes()).into_owned()
            }
        };

        Ok(HashRecord {
            sender,
            bucket,
            index,
            hash,
        })
    }
}

impl Iterator for RecordScan<'_> {
    type Item = IntegrityResult<HashRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused {
            return None;
        }
        let entry = match self.scan.as_mut()?.next_entry() {
            Ok(Some(entry)) => entry,
            Ok(None) => return None,
            Err(e) => {
                self.fused = true;
                return Some(Err(IntegrityError::StoreReadFailed(e.to_string())));
            }
        };

        let record = self.decode(entry);
        if record.is_err() {
            self.fused = true;
        }
        Some(record)
    }
}

impl Drop for RecordScan<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!(error = %e, "Failed to close state scan");
        }
    }
}
