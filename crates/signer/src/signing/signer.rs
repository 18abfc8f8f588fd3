use zeroize::Zeroizing;

use super::Curve;
use crate::error::Result;

/// A private ECDSA key that signs payloads.
///
/// Implementations are sync; signing is CPU-bound.
pub trait EcdsaPrivateKey: Send + Sync {
    /// Hash the payload with SHA-256 and sign the digest.
    ///
    /// Returns the fixed-length `r || s` signature (64 bytes).
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>>;

    /// The public key derived from this private key.
    fn public_key(&self) -> Box<dyn EcdsaPublicKey>;

    /// Unencrypted PKCS#8 DER encoding of the private key.
    fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>>;

    fn curve(&self) -> Curve;
}

/// A public ECDSA key that verifies signatures.
pub trait EcdsaPublicKey: Send + Sync {
    /// Verify a raw signature (64-byte `r || s` or ASN.1 DER) over the
    /// SHA-256 digest of `payload`.
    ///
    /// Returns `Ok(false)` when the signature is well formed but does not
    /// match, and `InvalidSignature` when the bytes are not a signature.
    fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<bool>;

    /// SubjectPublicKeyInfo DER encoding.
    fn to_public_key_der(&self) -> Result<Vec<u8>>;

    /// Compressed SEC1 point (33 bytes).
    fn to_sec1_bytes(&self) -> Vec<u8>;

    fn curve(&self) -> Curve;
}
