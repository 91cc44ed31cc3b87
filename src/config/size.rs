//! Byte size values accepted as an integer or a `"10KB"`-style string.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Size in bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "RawSize", into = "u64")]
pub struct ByteSize(u64);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Bytes(u64),
    Text(String),
}

impl ByteSize {
    pub const fn new(bytes: u64) -> Self {
        Self(bytes)
    }

    pub const fn bytes(self) -> u64 {
        self.0
    }

    /// Parse a size string (e.g., "5148", "10KB", "1 MB", "512B").
    ///
    /// Units are binary (1KB = 1024 bytes) and case-insensitive.
    pub fn parse(s: &str) -> Result<Self, String> {
        let upper = s.trim().to_ascii_uppercase();
        let (number, multiplier) = if let Some(n) = upper.strip_suffix("MB") {
            (n, 1024 * 1024)
        } else if let Some(n) = upper.strip_suffix("KB") {
            (n, 1024)
        } else if let Some(n) = upper.strip_suffix('B') {
            (n, 1)
        } else {
            (upper.as_str(), 1)
        };

        let value: u64 = number
            .trim()
            .parse()
            .map_err(|_| format!("invalid size `{s}`, expected e.g. 5148, \"10KB\" or \"1MB\""))?;

        value
            .checked_mul(multiplier)
            .map(Self)
            .ok_or_else(|| format!("size `{s}` is too large"))
    }
}

impl TryFrom<RawSize> for ByteSize {
    type Error = String;

    fn try_from(raw: RawSize) -> Result<Self, Self::Error> {
        match raw {
            RawSize::Bytes(bytes) => Ok(Self(bytes)),
            RawSize::Text(text) => Self::parse(&text),
        }
    }
}

impl From<ByteSize> for u64 {
    fn from(size: ByteSize) -> Self {
        size.0
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}B", self.0)
    }
}
