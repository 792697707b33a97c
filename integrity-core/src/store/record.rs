use serde::{Deserialize, Serialize};

/// One anchored hash, keyed by `(sender, bucket, index)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashRecord {
    pub sender: String,
    pub bucket: String,
    pub index: String,
    pub hash: String,
}

impl HashRecord {
    pub fn new(
        sender: impl Into<String>,
        bucket: impl Into<String>,
        index: impl Into<String>,
        hash: impl Into<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            bucket: bucket.into(),
            index: index.into(),
            hash: hash.into(),
        }
    }
}
