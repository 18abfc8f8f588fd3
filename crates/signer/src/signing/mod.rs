mod encoding;
mod secp256k1;
mod secp256r1;
mod signer;

use std::fmt;
use std::str::FromStr;

use tracing::{debug, warn};

pub use encoding::{decode_signature, encode_signature};
pub use secp256k1::{Secp256k1PrivateKey, Secp256k1PublicKey};
pub use secp256r1::{Secp256r1PrivateKey, Secp256r1PublicKey};
pub use signer::{EcdsaPrivateKey, EcdsaPublicKey};

use crate::error::{Result, SignerError};

/// Elliptic curve a key store is bound to.
///
/// Signer and verifier must agree on it out of band; signatures carry no
/// curve identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Curve {
    Secp256k1,
    #[default]
    Secp256r1,
}

impl Curve {
    pub fn name(&self) -> &'static str {
        match self {
            Curve::Secp256k1 => "secp256k1",
            Curve::Secp256r1 => "secp256r1",
        }
    }

    /// JOSE `alg` identifier for SHA-256 ECDSA over this curve.
    pub fn jws_algorithm(&self) -> &'static str {
        match self {
            Curve::Secp256k1 => "ES256K",
            Curve::Secp256r1 => "ES256",
        }
    }

    pub fn generate(&self) -> Box<dyn EcdsaPrivateKey> {
        match self {
            Curve::Secp256k1 => Box::new(Secp256k1PrivateKey::generate()),
            Curve::Secp256r1 => Box::new(Secp256r1PrivateKey::generate()),
        }
    }

    pub fn private_key_from_seed(&self, seed: &str) -> Result<Box<dyn EcdsaPrivateKey>> {
        Ok(match self {
            Curve::Secp256k1 => Box::new(Secp256k1PrivateKey::from_seed(seed)?),
            Curve::Secp256r1 => Box::new(Secp256r1PrivateKey::from_seed(seed)?),
        })
    }

    pub fn private_key_from_pkcs8_der(&self, der: &[u8]) -> Result<Box<dyn EcdsaPrivateKey>> {
        Ok(match self {
            Curve::Secp256k1 => Box::new(Secp256k1PrivateKey::from_pkcs8_der(der)?),
            Curve::Secp256r1 => Box::new(Secp256r1PrivateKey::from_pkcs8_der(der)?),
        })
    }

    pub fn private_key_from_sec1_der(&self, der: &[u8]) -> Result<Box<dyn EcdsaPrivateKey>> {
        Ok(match self {
            Curve::Secp256k1 => Box::new(Secp256k1PrivateKey::from_sec1_der(der)?),
            Curve::Secp256r1 => Box::new(Secp256r1PrivateKey::from_sec1_der(der)?),
        })
    }

    pub fn public_key_from_spki_der(&self, der: &[u8]) -> Result<Box<dyn EcdsaPublicKey>> {
        Ok(match self {
            Curve::Secp256k1 => Box::new(Secp256k1PublicKey::from_public_key_der(der)?),
            Curve::Secp256r1 => Box::new(Secp256r1PublicKey::from_public_key_der(der)?),
        })
    }

    pub fn public_key_from_sec1_bytes(&self, bytes: &[u8]) -> Result<Box<dyn EcdsaPublicKey>> {
        Ok(match self {
            Curve::Secp256k1 => Box::new(Secp256k1PublicKey::from_sec1_bytes(bytes)?),
            Curve::Secp256r1 => Box::new(Secp256r1PublicKey::from_sec1_bytes(bytes)?),
        })
    }
}

impl fmt::Display for Curve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Curve {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "secp256k1" | "k256" => Ok(Curve::Secp256k1),
            "secp256r1" | "p256" | "p-256" | "prime256v1" => Ok(Curve::Secp256r1),
            other => Err(format!("unknown curve: {other}")),
        }
    }
}

/// Sign a non-empty payload and return the wire-form signature.
pub fn sign(key: &dyn EcdsaPrivateKey, payload: &[u8]) -> Result<String> {
    if payload.is_empty() {
        return Err(SignerError::InvalidInput(
            "payload to sign must not be empty".into(),
        ));
    }
    let raw = key.sign(payload)?;
    debug!(curve = %key.curve(), payload_len = payload.len(), "signed payload");
    Ok(encode_signature(&raw))
}

/// Check a wire-form signature against a payload.
///
/// `Ok(false)` means the signature decoded but does not match.
pub fn verify(key: &dyn EcdsaPublicKey, signature: &str, payload: &[u8]) -> Result<bool> {
    let raw = decode_signature(signature)?;
    let valid = key.verify(payload, &raw)?;
    if valid {
        debug!(curve = %key.curve(), "verified signature");
    } else {
        warn!(curve = %key.curve(), payload_len = payload.len(), "signature does not match");
    }
    Ok(valid)
}
