/*
    composite_key.rs - Composite key codec

    Packs an ordered list of string segments into one storage key that can be
    split back into exactly the same segments, and builds prefixes for range
    scans over the leading segments.

    Layout:
        SEP namespace SEP seg_1 SEP seg_2 ... seg_n SEP

    SEP (0x00) never appears inside an encoded segment. Raw content is escaped:
        0x00 -> 0x01 0x01
        0x01 -> 0x01 0x02
    Every other byte is copied verbatim. The escape preserves byte order, so
    sorting encoded keys sorts by segment 1, then segment 2, and so on, each
    compared as raw bytes.
*/

use super::errors::{KeyError, KeyResult};

/// Segment delimiter
pub const SEPARATOR: u8 = 0x00;

/// Escape introducer for SEPARATOR and itself
pub const ESCAPE: u8 = 0x01;

const ESCAPED_SEPARATOR: u8 = 0x01;
const ESCAPED_ESCAPE: u8 = 0x02;

/// Namespace under which hash records are stored
pub const RECORD_NAMESPACE: &str = "sender~bucket~index";

/// Number of segments in a record key: sender, bucket, index
pub const RECORD_ARITY: usize = 3;

/// Codec for one keyspace: a namespace plus a fixed segment count
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompositeKeyCodec {
    namespace: String,
    arity: usize,
}

impl CompositeKeyCodec {
    pub fn new(namespace: impl Into<String>, arity: usize) -> Self {
        Self {
            namespace: namespace.into(),
            arity,
        }
    }

    /// Codec for `(sender, bucket, index)` record keys
    pub fn records(namespace: impl Into<String>) -> Self {
        Self::new(namespace, RECORD_ARITY)
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn arity(&self) -> usize {
        self.arity
    }

    /// Encode a full key. `segments.len()` must equal the arity.
    pub fn encode<S: AsRef<str>>(&self, segments: &[S]) -> KeyResult<Vec<u8>> {
        if segments.len() != self.arity {
            return Err(KeyError::ArityMismatch {
                expected: self.arity,
                actual: segments.len(),
            });
        }
        Ok(self.encode_segments(segments))
    }

    /// Encode a scan prefix from fewer than `arity` leading segments.
    ///
    /// The result is a prefix of `encode(full)` for every completion of
    /// `segments`, and of no key whose leading segments differ. An empty
    /// list yields the prefix of the whole keyspace.
    pub fn encode_prefix<S: AsRef<str>>(&self, segments: &[S]) -> KeyResult<Vec<u8>> {
        if segments.len() >= self.arity {
            return Err(KeyError::PrefixTooLong {
                arity: self.arity,
                actual: segments.len(),
            });
        }
        Ok(self.encode_segments(segments))
    }

    /// Split a key produced by `encode` back into its segments
    pub fn split(&self, key: &[u8]) -> KeyResult<Vec<String>> {
        let body = match key.split_first() {
            Some((&SEPARATOR, rest)) => rest,
            Some(_) => return Err(KeyError::Malformed("missing leading separator".to_string())),
            None => return Err(KeyError::Malformed("empty key".to_string())),
        };

        let mut fields = Vec::with_capacity(self.arity + 1);
        let mut remaining = body;
        while !remaining.is_empty() {
            let end = remaining
                .iter()
                .position(|b| *b == SEPARATOR)
                .ok_or_else(|| KeyError::Malformed("unterminated segment".to_string()))?;
            fields.push(unescape(&remaining[..end])?);
            remaining = &remaining[end + 1..];
        }

        let mut fields = fields.into_iter();
        match fields.next() {
            Some(found) if found == self.namespace => {}
            Some(found) => {
                return Err(KeyError::NamespaceMismatch {
                    expected: self.namespace.clone(),
                    found,
                })
            }
            None => return Err(KeyError::Malformed("missing namespace".to_string())),
        }

        let segments: Vec<String> = fields.collect();
        if segments.len() != self.arity {
            return Err(KeyError::ArityMismatch {
                expected: self.arity,
                actual: segments.len(),
            });
        }
        Ok(segments)
    }

    fn encode_segments<S: AsRef<str>>(&self, segments: &[S]) -> Vec<u8> {
        let capacity = 2
            + self.namespace.len()
            + segments.iter().map(|s| s.as_ref().len() + 1).sum::<usize>();
        let mut key = Vec::with_capacity(capacity);
        key.push(SEPARATOR);
        escape_into(self.namespace.as_bytes(), &mut key);
        key.push(SEPARATOR);
        for segment in segments {
            escape_into(segment.as_ref().as_bytes(), &mut key);
            key.push(SEPARATOR);
        }
        key
    }
}

fn escape_into(raw: &[u8], out: &mut Vec<u8>) {
    for &byte in raw {
        match byte {
            SEPARATOR => out.extend_from_slice(&[ESCAPE, ESCAPED_SEPARATOR]),
            ESCAPE => out.extend_from_slice(&[ESCAPE, ESCAPED_ESCAPE]),
            other => out.push(other),
        }
    }
}

fn unescape(encoded: &[u8]) -> KeyResult<String> {
    let mut raw = Vec::with_capacity(encoded.len());
    let mut bytes = encoded.iter();
    while let Some(&byte) = bytes.next() {
        if byte != ESCAPE {
            raw.push(byte);
            continue;
        }
        match bytes.next() {
            Some(&ESCAPED_SEPARATOR) => raw.push(SEPARATOR),
            Some(&ESCAPED_ESCAPE) => raw.push(ESCAPE),
            Some(other) => {
                return Err(KeyError::Malformed(format!(
                    "invalid escape sequence 0x01 0x{:02x}",
                    other
                )))
            }
            None => return Err(KeyError::Malformed("dangling escape byte".to_string())),
        }
    }
    String::from_utf8(raw).map_err(|e| KeyError::Malformed(format!("segment is not UTF-8: {}", e)))
}
