//! Operation handlers
//!
//! `submit` binds the caller to a sender token and writes one record;
//! `query` scans every record of one sender. Neither keeps state between
//! calls.

use crate::dispatch::Operation;
use crate::error::{IntegrityError, IntegrityResult};
use crate::host::ChaincodeHost;
use crate::identity::SenderToken;
use crate::metrics::{
    record_counter, QUERY_FAILED, QUERY_RECORDS, QUERY_TOTAL, SUBMIT_FAILED, SUBMIT_TOTAL,
};
use crate::store::{CompositeKeyCodec, HashRecord, RecordStore, RECORD_NAMESPACE};
use tracing::{debug, error, info, warn};

/// Handlers for `submitHash` and `queryHash`
#[derive(Debug, Clone)]
pub struct HashHandler {
    codec: CompositeKeyCodec,
}

impl Default for HashHandler {
    fn default() -> Self {
        Self::new(RECORD_NAMESPACE)
    }
}

impl HashHandler {
    /// Handler storing records under `namespace`
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            codec: CompositeKeyCodec::records(namespace),
        }
    }

    pub fn codec(&self) -> &CompositeKeyCodec {
        &self.codec
    }

    /// Anchor `hash` at `(caller, bucket, index)`; args are `[bucket, index, hash]`
    pub fn submit<H: ChaincodeHost + ?Sized>(
        &self,
        host: &H,
        args: &[String],
    ) -> IntegrityResult<()> {
        record_counter(SUBMIT_TOTAL, 1);
        let result = self.try_submit(host, args);
        if let Err(e) = &result {
            record_counter(SUBMIT_FAILED, 1);
            log_failure(Operation::SubmitHash, e);
        }
        result
    }

    /// Every record anchored by a sender, in key order; args are `[sender]`
    pub fn query<H: ChaincodeHost + ?Sized>(
        &self,
        host: &H,
        args: &[String],
    ) -> IntegrityResult<Vec<HashRecord>> {
        record_counter(QUERY_TOTAL, 1);
        let result = self.try_query(host, args);
        match &result {
            Ok(records) => record_counter(QUERY_RECORDS, records.len() as u64),
            Err(e) => {
                record_counter(QUERY_FAILED, 1);
                log_failure(Operation::QueryHash, e);
            }
        }
        result
    }

    fn try_submit<H: ChaincodeHost + ?Sized>(
        &self,
        host: &H,
        args: &[String],
    ) -> IntegrityResult<()> {
        let [bucket, index, hash] = args else {
            return Err(Operation::SubmitHash.wrong_format(args.len()));
        };

        let identity = host
            .caller_identity()
            .map_err(|e| IntegrityError::IdentityUnavailable(e.to_string()))?;
        let sender = SenderToken::bind(&identity);
        debug!(%sender, %bucket, %index, "Submitting hash");

        RecordStore::new(host, &self.codec).put(&sender, bucket, index, hash)?;

        info!(%sender, %bucket, %index, "Hash anchored");
        Ok(())
    }

    fn try_query<H: ChaincodeHost + ?Sized>(
        &self,
        host: &H,
        args: &[String],
    ) -> IntegrityResult<Vec<HashRecord>> {
        let [sender] = args else {
            return Err(Operation::QueryHash.wrong_format(args.len()));
        };
        debug!(%sender, "Querying hashes");

        let store = RecordStore::new(host, &self.codec);
        let mut scan = store.scan_sender(sender)?;
        let mut records = Vec::new();
        for record in scan.by_ref() {
            records.push(record?);
        }
        scan.close()?;

        if records.is_empty() {
            return Err(IntegrityError::NoSuchSender(sender.clone()));
        }

        info!(%sender, count = records.len(), "Hashes retrieved");
        Ok(records)
    }
}

fn log_failure(operation: Operation, err: &IntegrityError) {
    if err.is_system() {
        error!(operation = operation.name(), code = ?err.code(), error = %err, "Operation failed");
    } else {
        warn!(operation = operation.name(), code = ?err.code(), error = %err, "Operation rejected");
    }
}
