// Structure identity keys and their deterministic generator.
//
// An `IdentityKey` is the stable external name of a structure: it is what a
// cache is filed under in the registry, what survives the structure being
// torn down and rebuilt, and what observers receive in the sync delta.
// Keys are opaque strings. Fresh keys are UUID v4 strings, but keys loaded
// from a save or received over the wire are accepted as long as they are
// non-empty and fit the wire format's string limit.
//
// `KeyGenerator` produces fresh keys from a seeded SplitMix64 stream, so two
// simulations built from the same seed and fed the same commands hand out
// the same keys. No OS entropy, no system time.

use multiblock_protocol::MAX_STRING_BYTES;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// The stable external name of a structure.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    /// Wrap a string as a key. `None` if it is empty or longer than the wire
    /// format allows.
    pub fn new(key: impl Into<String>) -> Option<Self> {
        let key = key.into();
        if key.is_empty() || key.len() > MAX_STRING_BYTES {
            None
        } else {
            Some(Self(key))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl<'de> Deserialize<'de> for IdentityKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        IdentityKey::new(s).ok_or_else(|| serde::de::Error::custom("invalid identity key"))
    }
}

impl fmt::Debug for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IdentityKey({})", self.0)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Seeded source of fresh identity keys.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyGenerator {
    state: u64,
}

impl KeyGenerator {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Next key: a UUID v4 in 8-4-4-4-12 hex form.
    pub fn next_key(&mut self) -> IdentityKey {
        let mut bytes = [0u8; 16];
        bytes[..8].copy_from_slice(&splitmix64(&mut self.state).to_le_bytes());
        bytes[8..].copy_from_slice(&splitmix64(&mut self.state).to_le_bytes());
        // Version nibble 0100, variant bits 10 (RFC 4122).
        bytes[6] = (bytes[6] & 0x0F) | 0x40;
        bytes[8] = (bytes[8] & 0x3F) | 0x80;

        let mut out = String::with_capacity(36);
        for (i, b) in bytes.iter().enumerate() {
            if matches!(i, 4 | 6 | 8 | 10) {
                out.push('-');
            }
            out.push_str(&format!("{b:02x}"));
        }
        IdentityKey(out)
    }
}

fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E37_79B9_7F4A_7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
