//! Sender identity binding
//!
//! Turns the opaque identity bytes the host reports for a caller into the
//! printable token used as the leading key segment and returned in query
//! results.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Printable, stable token for a caller (lowercase hex of the identity bytes)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SenderToken(String);

impl SenderToken {
    /// Bind raw identity bytes to a token
    pub fn bind(identity: &[u8]) -> Self {
        SenderToken(hex::encode(identity))
    }

    /// Parse a token and recover the identity bytes it was bound from
    pub fn parse(s: &str) -> Result<(Self, Vec<u8>), hex::FromHexError> {
        let identity = hex::decode(s)?;
        Ok((Self::bind(&identity), identity))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for SenderToken {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SenderToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
