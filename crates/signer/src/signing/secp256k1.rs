use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::rand_core::OsRng;
use k256::pkcs8::{DecodePrivateKey, DecodePublicKey, EncodePrivateKey, EncodePublicKey};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use super::Curve;
use super::signer::{EcdsaPrivateKey, EcdsaPublicKey};
use crate::error::{Result, SignerError};

/// ECDSA private key on the secp256k1 curve.
pub struct Secp256k1PrivateKey {
    signing_key: SigningKey,
}

impl Secp256k1PrivateKey {
    /// Fresh random key. Panics if the OS entropy source fails.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::random(&mut OsRng),
        }
    }

    /// The SHA-256 hash of the seed becomes the 32-byte private key.
    pub fn from_seed(seed: &str) -> Result<Self> {
        let hash = Sha256::digest(seed.as_bytes());
        let signing_key = SigningKey::from_bytes((&hash).into())
            .map_err(|e| SignerError::key_not_loaded(format!("invalid seed: {e}")))?;
        Ok(Self { signing_key })
    }

    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let signing_key = SigningKey::from_pkcs8_der(der).map_err(|e| {
            SignerError::key_not_loaded(format!("malformed secp256k1 PKCS#8 key: {e}"))
        })?;
        Ok(Self { signing_key })
    }

    pub fn from_sec1_der(der: &[u8]) -> Result<Self> {
        let secret_key = k256::SecretKey::from_sec1_der(der).map_err(|e| {
            SignerError::key_not_loaded(format!("malformed secp256k1 SEC1 key: {e}"))
        })?;
        Ok(Self {
            signing_key: SigningKey::from(secret_key),
        })
    }
}

impl EcdsaPrivateKey for Secp256k1PrivateKey {
    fn sign(&self, payload: &[u8]) -> Result<Vec<u8>> {
        let digest = Sha256::digest(payload);
        let signature: Signature = self
            .signing_key
            .sign_prehash(&digest)
            .map_err(|e| SignerError::SigningFailed(format!("secp256k1 sign_prehash failed: {e}")))?;
        Ok(signature.to_bytes().to_vec())
    }

    fn public_key(&self) -> Box<dyn EcdsaPublicKey> {
        Box::new(Secp256k1PublicKey {
            verifying_key: VerifyingKey::from(&self.signing_key),
        })
    }

    fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let document = self
            .signing_key
            .to_pkcs8_der()
            .map_err(|e| SignerError::KeyEncoding(format!("secp256k1 private key: {e}")))?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    fn curve(&self) -> Curve {
        Curve::Secp256k1
    }
}

/// ECDSA public key on the secp256k1 curve.
pub struct Secp256k1PublicKey {
    verifying_key: VerifyingKey,
}

impl Secp256k1PublicKey {
    pub fn from_public_key_der(der: &[u8]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_public_key_der(der).map_err(|e| {
            SignerError::key_not_loaded(format!("malformed secp256k1 public key: {e}"))
        })?;
        Ok(Self { verifying_key })
    }

    pub fn from_sec1_bytes(bytes: &[u8]) -> Result<Self> {
        let verifying_key = VerifyingKey::from_sec1_bytes(bytes).map_err(|e| {
            SignerError::key_not_loaded(format!("malformed secp256k1 point: {e}"))
        })?;
        Ok(Self { verifying_key })
    }
}

impl EcdsaPublicKey for Secp256k1PublicKey {
    fn verify(&self, payload: &[u8], signature: &[u8]) -> Result<bool> {
        let signature = if signature.len() == 64 {
            Signature::from_slice(signature)
        } else {
            Signature::from_der(signature)
        }
        .map_err(|_| SignerError::InvalidSignature)?;
        // (r, n - s) is equally valid; k256 only accepts the low-S form
        let signature = signature.normalize_s().unwrap_or(signature);

        let digest = Sha256::digest(payload);
        Ok(self.verifying_key.verify_prehash(&digest, &signature).is_ok())
    }

    fn to_public_key_der(&self) -> Result<Vec<u8>> {
        let document = self
            .verifying_key
            .to_public_key_der()
            .map_err(|e| SignerError::KeyEncoding(format!("secp256k1 public key: {e}")))?;
        Ok(document.into_vec())
    }

    fn to_sec1_bytes(&self) -> Vec<u8> {
        self.verifying_key
            .to_encoded_point(true)
            .as_bytes()
            .to_vec()
    }

    fn curve(&self) -> Curve {
        Curve::Secp256k1
    }
}
