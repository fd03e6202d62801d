//! Wire format for signed extension containers.
//!
//! This crate is the standalone half of crxpack: it knows the exact byte
//! layout of the legacy (v2) and current (v3) container formats, the protobuf
//! header messages, the canonical signing payload, and how a package
//! identifier is derived from a public key. It performs no filesystem I/O
//! and can be used without the resolution engine in `crxpack-core`.

pub mod codec;
pub mod header;
pub mod id;
pub mod signer;

// Re-exports
pub use codec::{
    Container, ContainerHeader, CrxVersion, EncodeError, FormatError, decode, encode, encode_v2,
    encode_v3, signing_payload,
};
pub use header::{AsymmetricKeyProof, CrxFileHeader, SignedData};
pub use id::{CRX_ID_LEN, PackageId, crx_id, derive_identifier};
pub use signer::{
    ContainerSigner, EcdsaSigner, ProofAlgorithm, RsaSigner, SignError, signer_from_der,
};

/// Magic bytes opening every container (`Cr24`).
pub const CRX_MAGIC: [u8; 4] = *b"Cr24";

/// Context prefix of the v3 signing payload, terminating NUL included.
pub const SIGNATURE_CONTEXT: &[u8; 16] = b"CRX3 SignedData\0";

/// Minimum platform version implied by the v3 container format.
pub const V3_MINIMUM_PLATFORM_VERSION: &str = "73.0.3683";
