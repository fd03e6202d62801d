//! Container codec.
//!
//! Both formats open with the 4-byte magic `Cr24` and a 4-byte little-endian
//! format version, followed by a version-specific header and then the raw
//! archive bytes, untouched.
//!
//! ```text
//! v2:  "Cr24" | 2u32 | key_len u32 | sig_len u32 | key | sig | archive
//! v3:  "Cr24" | 3u32 | header_len u32 | CrxFileHeader | archive
//! ```
//!
//! All integers are little-endian. The v3 signature covers
//! `SIGNATURE_CONTEXT | len(signed_header_data) u32 | signed_header_data | archive`,
//! never the outer framing, so a signature is valid in whichever proof slot
//! it is stored.
//!
//! Decoding only demultiplexes the framing; signatures are not verified.

use prost::Message;
use thiserror::Error;

use crate::header::{AsymmetricKeyProof, CrxFileHeader, SignedData};
use crate::id::crx_id;
use crate::signer::{ContainerSigner, ProofAlgorithm, SignError};
use crate::{CRX_MAGIC, SIGNATURE_CONTEXT};

/// Fixed size of the v2 preamble (magic, version, key length, signature length).
const V2_PREAMBLE_LEN: usize = 16;

/// Fixed size of the v3 preamble (magic, version, header length).
const V3_PREAMBLE_LEN: usize = 12;

/// Supported container format versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CrxVersion {
    /// Legacy format: RSA public key and PKCS#1 v1.5 / SHA-1 signature.
    V2,
    /// Current format: protobuf header with SHA-256 proofs.
    #[default]
    V3,
}

impl CrxVersion {
    /// Map a numeric version to a supported format.
    pub fn from_number(version: u32) -> Option<Self> {
        match version {
            2 => Some(Self::V2),
            3 => Some(Self::V3),
            _ => None,
        }
    }

    /// The numeric version written into the container.
    pub fn number(self) -> u32 {
        match self {
            Self::V2 => 2,
            Self::V3 => 3,
        }
    }
}

impl std::fmt::Display for CrxVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.number())
    }
}

/// Malformed container framing. Always fatal.
#[derive(Error, Debug)]
pub enum FormatError {
    /// The buffer does not start with `Cr24`.
    #[error("Not a CRX container: bad magic bytes")]
    BadMagic,

    /// The version field is neither 2 nor 3.
    #[error("Unsupported CRX version: {0}")]
    UnsupportedVersion(u32),

    /// A declared length runs past the end of the buffer.
    #[error("Truncated container: needed {needed} bytes, only {available} available")]
    Truncated {
        /// Bytes required by the framing.
        needed: usize,
        /// Bytes present in the buffer.
        available: usize,
    },

    /// The v3 header is not a valid protobuf message.
    #[error("Invalid CRX3 header: {0}")]
    Header(#[from] prost::DecodeError),
}

/// Errors raised while producing a container.
#[derive(Error, Debug)]
pub enum EncodeError {
    /// The signing primitive failed or the key cannot produce this format.
    #[error(transparent)]
    Sign(#[from] SignError),

    /// A framed field does not fit in a 32-bit length.
    #[error("{field} is too large to frame ({len} bytes)")]
    Oversized {
        /// Which field overflowed.
        field: &'static str,
        /// Its length in bytes.
        len: usize,
    },
}

/// Version-specific header of a decoded container.
#[derive(Debug, Clone, PartialEq)]
pub enum ContainerHeader {
    /// Legacy fixed fields.
    V2 {
        /// DER-encoded RSA public key.
        public_key: Vec<u8>,
        /// PKCS#1 v1.5 / SHA-1 signature over the archive.
        signature: Vec<u8>,
    },
    /// Current protobuf header.
    V3(CrxFileHeader),
}

/// A demultiplexed container: header plus the archive bytes that follow it.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    /// Parsed header.
    pub header: ContainerHeader,
    /// Archive bytes, exactly as stored.
    pub archive: Vec<u8>,
}

impl Container {
    /// Format version of this container.
    pub fn version(&self) -> CrxVersion {
        match self.header {
            ContainerHeader::V2 { .. } => CrxVersion::V2,
            ContainerHeader::V3(_) => CrxVersion::V3,
        }
    }

    /// Every public key carried by the header, in proof order.
    pub fn public_keys(&self) -> Vec<&[u8]> {
        match &self.header {
            ContainerHeader::V2 { public_key, .. } => vec![public_key.as_slice()],
            ContainerHeader::V3(header) => header
                .proofs()
                .filter_map(|p| p.public_key.as_deref())
                .collect(),
        }
    }

    /// Raw identifier embedded in the v3 signed header, if any.
    pub fn crx_id(&self) -> Option<Vec<u8>> {
        match &self.header {
            ContainerHeader::V2 { .. } => None,
            ContainerHeader::V3(header) => header.signed_data().ok().flatten()?.crx_id,
        }
    }
}

/// Encode `contents` in the requested format.
///
/// # Errors
///
/// See [`encode_v2`] and [`encode_v3`].
pub fn encode(
    version: CrxVersion,
    signer: &dyn ContainerSigner,
    contents: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    match version {
        CrxVersion::V2 => encode_v2(signer, contents),
        CrxVersion::V3 => encode_v3(signer, contents),
    }
}

/// Encode a legacy v2 container.
///
/// The signature is PKCS#1 v1.5 / SHA-1 over `contents`. This format is
/// deprecated and kept for older consumers only.
///
/// # Errors
///
/// Returns [`EncodeError::Sign`] if the signer cannot produce a SHA-1
/// signature (non-RSA keys), or [`EncodeError::Oversized`] if a field does
/// not fit the 32-bit length prefix.
pub fn encode_v2(signer: &dyn ContainerSigner, contents: &[u8]) -> Result<Vec<u8>, EncodeError> {
    tracing::warn!("encoding deprecated CRX2 container (SHA-1 signature)");
    let signature = signer.sign_sha1(contents)?;
    let public_key = signer.public_key();

    let key_len = frame_len("public key", public_key.len())?;
    let sig_len = frame_len("signature", signature.len())?;

    let mut out = Vec::with_capacity(
        V2_PREAMBLE_LEN + public_key.len() + signature.len() + contents.len(),
    );
    out.extend_from_slice(&CRX_MAGIC);
    out.extend_from_slice(&CrxVersion::V2.number().to_le_bytes());
    out.extend_from_slice(&key_len.to_le_bytes());
    out.extend_from_slice(&sig_len.to_le_bytes());
    out.extend_from_slice(public_key);
    out.extend_from_slice(&signature);
    out.extend_from_slice(contents);
    Ok(out)
}

/// Encode a v3 container.
///
/// 1. Serialize a `SignedData` carrying the 16-byte raw identifier.
/// 2. Sign [`signing_payload`] with SHA-256.
/// 3. Store `{public_key, signature}` in the signer's proof slot.
/// 4. Frame: magic, version, header length, header, contents.
///
/// # Errors
///
/// Returns [`EncodeError::Sign`] if the signer fails, or
/// [`EncodeError::Oversized`] if a length does not fit in 32 bits.
pub fn encode_v3(signer: &dyn ContainerSigner, contents: &[u8]) -> Result<Vec<u8>, EncodeError> {
    let public_key = signer.public_key();
    let signed_header_data = SignedData {
        crx_id: Some(crx_id(public_key).to_vec()),
    }
    .encode_to_vec();

    let payload = signing_payload(&signed_header_data, contents)?;
    let signature = signer.sign_sha256(&payload)?;

    let proof = AsymmetricKeyProof {
        public_key: Some(public_key.to_vec()),
        signature: Some(signature),
    };
    let mut header = CrxFileHeader {
        signed_header_data: Some(signed_header_data),
        ..Default::default()
    };
    match signer.algorithm() {
        ProofAlgorithm::Sha256WithRsa => header.sha256_with_rsa.push(proof),
        ProofAlgorithm::Sha256WithEcdsa => header.sha256_with_ecdsa.push(proof),
    }
    let header_bytes = header.encode_to_vec();
    let header_len = frame_len("header", header_bytes.len())?;

    tracing::debug!(
        header_len,
        contents_len = contents.len(),
        algorithm = %signer.algorithm(),
        "encoded CRX3 header"
    );

    let mut out = Vec::with_capacity(V3_PREAMBLE_LEN + header_bytes.len() + contents.len());
    out.extend_from_slice(&CRX_MAGIC);
    out.extend_from_slice(&CrxVersion::V3.number().to_le_bytes());
    out.extend_from_slice(&header_len.to_le_bytes());
    out.extend_from_slice(&header_bytes);
    out.extend_from_slice(contents);
    Ok(out)
}

/// Canonical v3 signing payload:
/// `SIGNATURE_CONTEXT | len(signed_header_data) as u32 LE | signed_header_data | contents`.
///
/// # Errors
///
/// Returns [`EncodeError::Oversized`] if `signed_header_data` exceeds 4 GiB.
pub fn signing_payload(
    signed_header_data: &[u8],
    contents: &[u8],
) -> Result<Vec<u8>, EncodeError> {
    let shd_len = frame_len("signed header data", signed_header_data.len())?;
    let mut payload = Vec::with_capacity(
        SIGNATURE_CONTEXT.len() + 4 + signed_header_data.len() + contents.len(),
    );
    payload.extend_from_slice(SIGNATURE_CONTEXT);
    payload.extend_from_slice(&shd_len.to_le_bytes());
    payload.extend_from_slice(signed_header_data);
    payload.extend_from_slice(contents);
    Ok(payload)
}

/// Demultiplex a container buffer into its header and archive.
///
/// # Errors
///
/// Returns [`FormatError::BadMagic`] for any buffer not starting with `Cr24`
/// (including empty input), [`FormatError::UnsupportedVersion`] for versions
/// other than 2 and 3, [`FormatError::Truncated`] when a declared length
/// overruns the buffer, and [`FormatError::Header`] for an unparseable v3
/// header.
pub fn decode(buffer: &[u8]) -> Result<Container, FormatError> {
    if !buffer.starts_with(&CRX_MAGIC) {
        return Err(FormatError::BadMagic);
    }
    let version = read_u32_le(buffer, 4)?;

    match CrxVersion::from_number(version) {
        Some(CrxVersion::V2) => {
            let key_len = read_u32_le(buffer, 8)? as usize;
            let sig_len = read_u32_le(buffer, 12)? as usize;
            let public_key = slice(buffer, V2_PREAMBLE_LEN, key_len)?;
            let signature = slice(buffer, V2_PREAMBLE_LEN + key_len, sig_len)?;
            let archive = &buffer[V2_PREAMBLE_LEN + key_len + sig_len..];
            Ok(Container {
                header: ContainerHeader::V2 {
                    public_key: public_key.to_vec(),
                    signature: signature.to_vec(),
                },
                archive: archive.to_vec(),
            })
        }
        Some(CrxVersion::V3) => {
            let header_len = read_u32_le(buffer, 8)? as usize;
            let header_bytes = slice(buffer, V3_PREAMBLE_LEN, header_len)?;
            let header = CrxFileHeader::decode(header_bytes)?;
            let archive = &buffer[V3_PREAMBLE_LEN + header_len..];
            Ok(Container {
                header: ContainerHeader::V3(header),
                archive: archive.to_vec(),
            })
        }
        None => Err(FormatError::UnsupportedVersion(version)),
    }
}

fn frame_len(field: &'static str, len: usize) -> Result<u32, EncodeError> {
    u32::try_from(len).map_err(|_| EncodeError::Oversized { field, len })
}

fn read_u32_le(buffer: &[u8], offset: usize) -> Result<u32, FormatError> {
    let bytes = slice(buffer, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn slice(buffer: &[u8], start: usize, len: usize) -> Result<&[u8], FormatError> {
    let end = start.checked_add(len).ok_or(FormatError::Truncated {
        needed: usize::MAX,
        available: buffer.len(),
    })?;
    buffer.get(start..end).ok_or(FormatError::Truncated {
        needed: end,
        available: buffer.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use sha2::{Digest, Sha256};
    use std::cell::RefCell;

    /// Records every payload it is asked to sign and returns a digest of it.
    struct RecordingSigner {
        algorithm: ProofAlgorithm,
        public_key: Vec<u8>,
        payloads: RefCell<Vec<Vec<u8>>>,
    }

    impl RecordingSigner {
        fn new(algorithm: ProofAlgorithm) -> Self {
            Self {
                algorithm,
                public_key: b"test public key der".to_vec(),
                payloads: RefCell::new(Vec::new()),
            }
        }
    }

    impl ContainerSigner for RecordingSigner {
        fn algorithm(&self) -> ProofAlgorithm {
            self.algorithm
        }

        fn public_key(&self) -> &[u8] {
            &self.public_key
        }

        fn sign_sha256(&self, payload: &[u8]) -> Result<Vec<u8>, SignError> {
            self.payloads.borrow_mut().push(payload.to_vec());
            Ok(Sha256::digest(payload).to_vec())
        }

        fn sign_sha1(&self, payload: &[u8]) -> Result<Vec<u8>, SignError> {
            self.payloads.borrow_mut().push(payload.to_vec());
            Ok(vec![0x5A; 20])
        }
    }

    #[test]
    fn v3_round_trip_preserves_archive_and_id() {
        let signer = RecordingSigner::new(ProofAlgorithm::Sha256WithRsa);
        let contents = b"PK\x03\x04 pretend zip bytes".to_vec();

        let bytes = encode_v3(&signer, &contents).unwrap();
        assert_eq!(&bytes[..8], b"Cr24\x03\x00\x00\x00");

        let container = decode(&bytes).unwrap();
        assert_eq!(container.version(), CrxVersion::V3);
        assert_eq!(container.archive, contents);

        let digest = Sha256::digest(&signer.public_key);
        assert_eq!(container.crx_id().unwrap(), digest[..16].to_vec());
        assert_eq!(container.public_keys(), vec![signer.public_key.as_slice()]);
    }

    #[test]
    fn v3_signature_covers_length_prefixed_signed_data_and_contents() {
        let signer = RecordingSigner::new(ProofAlgorithm::Sha256WithRsa);
        let contents = b"archive".to_vec();
        let bytes = encode_v3(&signer, &contents).unwrap();

        let container = decode(&bytes).unwrap();
        let ContainerHeader::V3(header) = &container.header else {
            panic!("expected v3 header");
        };
        let shd = header.signed_header_data.clone().unwrap();

        let mut expected = b"CRX3 SignedData\0".to_vec();
        expected.extend_from_slice(&(shd.len() as u32).to_le_bytes());
        expected.extend_from_slice(&shd);
        expected.extend_from_slice(&contents);

        let payloads = signer.payloads.borrow();
        assert_eq!(payloads.len(), 1);
        assert_eq!(payloads[0], expected);
        assert_eq!(
            header.sha256_with_rsa[0].signature.as_deref(),
            Some(Sha256::digest(&expected).as_slice())
        );
    }

    #[test]
    fn v3_header_length_matches_bytes_written() {
        let signer = RecordingSigner::new(ProofAlgorithm::Sha256WithRsa);
        let contents = vec![7u8; 300];
        let bytes = encode_v3(&signer, &contents).unwrap();

        let header_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        assert_eq!(bytes.len(), 12 + header_len + contents.len());
    }

    #[test]
    fn ecdsa_proof_lands_in_ecdsa_slot_with_same_payload() {
        let rsa = RecordingSigner::new(ProofAlgorithm::Sha256WithRsa);
        let ecdsa = RecordingSigner::new(ProofAlgorithm::Sha256WithEcdsa);
        let contents = b"same contents".to_vec();

        let bytes = encode_v3(&ecdsa, &contents).unwrap();
        encode_v3(&rsa, &contents).unwrap();

        let container = decode(&bytes).unwrap();
        let ContainerHeader::V3(header) = &container.header else {
            panic!("expected v3 header");
        };
        assert!(header.sha256_with_rsa.is_empty());
        assert_eq!(header.sha256_with_ecdsa.len(), 1);
        assert_eq!(rsa.payloads.borrow()[0], ecdsa.payloads.borrow()[0]);
    }

    #[test]
    fn v2_round_trip() {
        let signer = RecordingSigner::new(ProofAlgorithm::Sha256WithRsa);
        let contents = b"legacy archive".to_vec();
        let bytes = encode_v2(&signer, &contents).unwrap();
        assert_eq!(&bytes[..8], b"Cr24\x02\x00\x00\x00");

        let container = decode(&bytes).unwrap();
        assert_eq!(container.version(), CrxVersion::V2);
        assert_eq!(container.archive, contents);
        let ContainerHeader::V2 {
            public_key,
            signature,
        } = &container.header
        else {
            panic!("expected v2 header");
        };
        assert_eq!(public_key, &signer.public_key);
        assert!(!signature.is_empty());
        assert!(container.crx_id().is_none());

        // v2 signs the contents alone
        assert_eq!(signer.payloads.borrow()[0], contents);
    }

    #[test]
    fn v2_fixed_offsets() {
        let signer = RecordingSigner::new(ProofAlgorithm::Sha256WithRsa);
        let bytes = encode_v2(&signer, b"x").unwrap();
        let key_len = u32::from_le_bytes(bytes[8..12].try_into().unwrap()) as usize;
        let sig_len = u32::from_le_bytes(bytes[12..16].try_into().unwrap()) as usize;
        assert_eq!(key_len, signer.public_key.len());
        assert_eq!(sig_len, 20);
        assert_eq!(bytes.len(), 16 + key_len + sig_len + 1);
    }

    #[test]
    fn decode_rejects_bad_magic() {
        for input in [&b""[..], b"Cr2", b"PK\x03\x04\x03\x00\x00\x00", b"cr24\x03\x00\x00\x00"] {
            assert!(matches!(decode(input), Err(FormatError::BadMagic)));
        }
    }

    #[test]
    fn decode_rejects_unknown_versions() {
        for version in [0u32, 1, 4, 0x0300_0000] {
            let mut buf = b"Cr24".to_vec();
            buf.extend_from_slice(&version.to_le_bytes());
            buf.extend_from_slice(&[0; 16]);
            assert!(matches!(
                decode(&buf),
                Err(FormatError::UnsupportedVersion(v)) if v == version
            ));
        }
    }

    #[test]
    fn decode_rejects_truncated_framing() {
        // Version missing entirely
        assert!(matches!(
            decode(b"Cr24\x03"),
            Err(FormatError::Truncated { .. })
        ));

        // Header length overruns the buffer
        let mut buf = b"Cr24\x03\x00\x00\x00".to_vec();
        buf.extend_from_slice(&100u32.to_le_bytes());
        buf.extend_from_slice(&[0; 10]);
        assert!(matches!(
            decode(&buf),
            Err(FormatError::Truncated {
                needed: 112,
                available: 22
            })
        ));

        // v2 key length overruns the buffer
        let mut buf = b"Cr24\x02\x00\x00\x00".to_vec();
        buf.extend_from_slice(&u32::MAX.to_le_bytes());
        buf.extend_from_slice(&0u32.to_le_bytes());
        assert!(matches!(decode(&buf), Err(FormatError::Truncated { .. })));
    }

    #[test]
    fn decode_empty_v3_archive() {
        let signer = RecordingSigner::new(ProofAlgorithm::Sha256WithRsa);
        let bytes = encode_v3(&signer, &[]).unwrap();
        assert!(decode(&bytes).unwrap().archive.is_empty());
    }
}
