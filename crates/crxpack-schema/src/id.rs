//! Package identifiers derived from public keys.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Length of the public identifier rendering.
pub const ID_LEN: usize = 32;

/// Length of the raw identifier embedded in the v3 signed header.
pub const CRX_ID_LEN: usize = 16;

/// Newtype for a package identifier (32 characters drawn from `a..=p`).
///
/// Identical public keys always produce identical identifiers, so reusing a
/// key pair makes two packages indistinguishable to the platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageId(String);

impl PackageId {
    /// Derive the identifier for a DER-encoded public key.
    pub fn from_public_key(public_key: &[u8]) -> Self {
        derive_identifier(public_key)
    }

    /// Render a raw identifier (as embedded in a v3 signed header).
    ///
    /// Each nibble `v` maps to the character `'a' + v`.
    pub fn from_raw(raw: &[u8]) -> Self {
        let rendered: String = raw
            .iter()
            .flat_map(|b| [b >> 4, b & 0x0f])
            .map(nibble_char)
            .take(ID_LEN)
            .collect();
        Self(rendered)
    }

    /// Return the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for PackageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for PackageId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Derive the public package identifier from a DER-encoded public key.
///
/// SHA-256 the key, render the digest as lowercase hex, remap every hex digit
/// `v` to `'a' + v`, and keep the first 32 characters. Total and
/// deterministic.
pub fn derive_identifier(public_key: &[u8]) -> PackageId {
    let digest = Sha256::digest(public_key);
    let rendered: String = hex::encode(digest)
        .bytes()
        .map(|c| match c {
            b'0'..=b'9' => c - b'0',
            _ => c - b'a' + 10,
        })
        .map(nibble_char)
        .take(ID_LEN)
        .collect();
    PackageId(rendered)
}

/// Raw identifier embedded in the v3 signed header: the SHA-256 digest of
/// the public key truncated to 16 bytes.
///
/// Kept separate from [`derive_identifier`]; both read the same digest but
/// neither is computed from the other.
pub fn crx_id(public_key: &[u8]) -> [u8; CRX_ID_LEN] {
    let digest = Sha256::digest(public_key);
    let mut raw = [0u8; CRX_ID_LEN];
    raw.copy_from_slice(&digest[..CRX_ID_LEN]);
    raw
}

fn nibble_char(v: u8) -> char {
    char::from(b'a' + v)
}
