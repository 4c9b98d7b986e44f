use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Globally unique, totally ordered identifier of a version.
///
/// Combines a time component with a writer discriminator that breaks ties
/// between writers producing the same time value. Revisions order and
/// identify versions; they never decide which of two concurrent values wins
/// on their own, the graph structure does.
///
/// Ordering: `time` → `writer` (total order).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Revision {
    time: u64,
    writer: u64,
}

impl Revision {
    /// Byte length of the binary encoding.
    pub const BYTES: usize = 16;

    /// Create a revision from explicit components.
    pub const fn new(time: u64, writer: u64) -> Self {
        Self { time, writer }
    }

    /// The time component.
    pub fn time(&self) -> u64 {
        self.time
    }

    /// The writer discriminator.
    pub fn writer(&self) -> u64 {
        self.writer
    }

    /// Big-endian encoding: 8 bytes of time followed by 8 bytes of writer.
    ///
    /// Byte-wise comparison of encodings agrees with [`Ord`].
    pub fn to_bytes(&self) -> [u8; Self::BYTES] {
        let mut out = [0u8; Self::BYTES];
        out[..8].copy_from_slice(&self.time.to_be_bytes());
        out[8..].copy_from_slice(&self.writer.to_be_bytes());
        out
    }

    /// Decode the big-endian encoding produced by [`Revision::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypeError> {
        if bytes.len() != Self::BYTES {
            return Err(TypeError::InvalidLength {
                expected: Self::BYTES,
                actual: bytes.len(),
            });
        }
        let mut time = [0u8; 8];
        let mut writer = [0u8; 8];
        time.copy_from_slice(&bytes[..8]);
        writer.copy_from_slice(&bytes[8..]);
        Ok(Self {
            time: u64::from_be_bytes(time),
            writer: u64::from_be_bytes(writer),
        })
    }

    /// Hex-encoded string representation (32 characters).
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    /// Short form for log lines: time in hex, then the low 16 bits of the writer.
    pub fn short_hex(&self) -> String {
        format!("{:x}.{:04x}", self.time, self.writer & 0xffff)
    }

    /// Parse from a hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl PartialOrd for Revision {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Revision {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .cmp(&other.time)
            .then(self.writer.cmp(&other.writer))
    }
}

impl fmt::Debug for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Revision({}.w{})", self.time, self.writer)
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Revision {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}
