//! Protobuf messages carried in the v3 container header.
//!
//! Field numbers match the published `crx3.proto` so containers interoperate
//! with existing readers:
//!
//! ```text
//! message CrxFileHeader {
//!   repeated AsymmetricKeyProof sha256_with_rsa = 2;
//!   repeated AsymmetricKeyProof sha256_with_ecdsa = 3;
//!   optional bytes signed_header_data = 10000;
//! }
//! message AsymmetricKeyProof {
//!   optional bytes public_key = 1;
//!   optional bytes signature = 2;
//! }
//! message SignedData {
//!   optional bytes crx_id = 1;
//! }
//! ```

use prost::Message;

/// Top-level v3 header: signature proofs keyed by algorithm plus the signed
/// header data.
#[derive(Clone, PartialEq, Message)]
pub struct CrxFileHeader {
    /// Proofs produced with PKCS#1 v1.5 / SHA-256 over an RSA key.
    #[prost(message, repeated, tag = "2")]
    pub sha256_with_rsa: Vec<AsymmetricKeyProof>,
    /// Proofs produced with ECDSA / SHA-256 over a P-256 key.
    #[prost(message, repeated, tag = "3")]
    pub sha256_with_ecdsa: Vec<AsymmetricKeyProof>,
    /// Serialized [`SignedData`]; covered by every signature.
    #[prost(bytes = "vec", optional, tag = "10000")]
    pub signed_header_data: Option<Vec<u8>>,
}

/// A `(publicKey, signature)` pair.
#[derive(Clone, PartialEq, Message)]
pub struct AsymmetricKeyProof {
    /// DER-encoded `SubjectPublicKeyInfo`.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub public_key: Option<Vec<u8>>,
    /// Signature bytes in the algorithm's native encoding.
    #[prost(bytes = "vec", optional, tag = "2")]
    pub signature: Option<Vec<u8>>,
}

/// Payload of `signed_header_data`.
#[derive(Clone, PartialEq, Message)]
pub struct SignedData {
    /// First 16 bytes of the SHA-256 digest of the primary public key.
    #[prost(bytes = "vec", optional, tag = "1")]
    pub crx_id: Option<Vec<u8>>,
}

impl CrxFileHeader {
    /// All proofs in the header, RSA first.
    pub fn proofs(&self) -> impl Iterator<Item = &AsymmetricKeyProof> {
        self.sha256_with_rsa
            .iter()
            .chain(self.sha256_with_ecdsa.iter())
    }

    /// Decode the embedded [`SignedData`], if present.
    ///
    /// # Errors
    ///
    /// Returns a decode error if `signed_header_data` is present but is not
    /// a valid `SignedData` message.
    pub fn signed_data(&self) -> Result<Option<SignedData>, prost::DecodeError> {
        self.signed_header_data
            .as_deref()
            .map(SignedData::decode)
            .transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signed_data_wire_bytes() {
        let data = SignedData {
            crx_id: Some(vec![0xAB; 16]),
        };
        let bytes = data.encode_to_vec();
        // field 1, wire type 2 (length-delimited), length 16
        assert_eq!(&bytes[..2], &[0x0A, 0x10]);
        assert_eq!(bytes.len(), 18);
    }

    #[test]
    fn header_without_signed_data() {
        let header = CrxFileHeader::default();
        assert!(header.signed_data().unwrap().is_none());
        assert_eq!(header.proofs().count(), 0);
    }

    #[test]
    fn signed_header_data_uses_tag_10000() {
        let header = CrxFileHeader {
            signed_header_data: Some(vec![1, 2, 3]),
            ..Default::default()
        };
        let bytes = header.encode_to_vec();
        // (10000 << 3) | 2 = 80002 -> varint 0x82 0xF1 0x04
        assert_eq!(&bytes[..3], &[0x82, 0xF1, 0x04]);
    }
}
