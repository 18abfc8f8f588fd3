use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::{ClaimCodec, Claims};
use crate::error::{Result, SignerError};
use crate::signing::{EcdsaPrivateKey, EcdsaPublicKey};

const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    typ: Option<String>,
}

/// JWS compact serialization: `base64url(header).base64url(claims).base64url(r || s)`.
///
/// The header `alg` is `ES256` for P-256 keys and `ES256K` for secp256k1 keys,
/// and must match the verifying key's curve.
pub struct CompactCodec;

impl ClaimCodec for CompactCodec {
    fn encode(&self, key: &dyn EcdsaPrivateKey, claims: &Claims) -> Result<String> {
        let header = Header {
            alg: key.curve().jws_algorithm().to_string(),
            typ: Some("JWT".to_string()),
        };
        let header_b64 = encode_json(&header)?;
        let claims_b64 = encode_json(claims)?;

        let mut token = String::with_capacity(header_b64.len() + claims_b64.len() + 88);
        token.push_str(&header_b64);
        token.push('.');
        token.push_str(&claims_b64);

        let signature = key.sign(token.as_bytes())?;
        token.push('.');
        token.push_str(&URL_SAFE_NO_PAD.encode(signature));
        Ok(token)
    }

    fn decode(&self, key: &dyn EcdsaPublicKey, token: &str) -> Result<Claims> {
        let mut segments = token.split('.');
        let (Some(header_b64), Some(claims_b64), Some(signature_b64), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(SignerError::invalid_token("expected 3 dot-separated segments"));
        };

        let header: Header = decode_json(header_b64, "header")?;
        let expected = key.curve().jws_algorithm();
        if header.alg != expected {
            return Err(SignerError::invalid_token(format!(
                "unsupported algorithm {:?}, expected {expected}",
                header.alg
            )));
        }

        let claims: Claims = decode_json(claims_b64, "payload")?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| SignerError::invalid_token("signature segment is not base64url"))?;
        if signature.len() != SIGNATURE_LEN {
            return Err(SignerError::invalid_token(format!(
                "signature must be {SIGNATURE_LEN} bytes, got {}",
                signature.len()
            )));
        }

        let signing_input = &token[..header_b64.len() + 1 + claims_b64.len()];
        if !key.verify(signing_input.as_bytes(), &signature)? {
            return Err(SignerError::InvalidSignature);
        }
        Ok(claims)
    }

    fn name(&self) -> &str {
        "compact"
    }
}

fn encode_json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    let json = serde_json::to_vec(value)
        .map_err(|e| SignerError::InvalidInput(format!("claims are not serializable: {e}")))?;
    Ok(URL_SAFE_NO_PAD.encode(json))
}

fn decode_json<T: DeserializeOwned>(segment: &str, what: &str) -> Result<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| SignerError::invalid_token(format!("{what} segment is not base64url")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| SignerError::invalid_token(format!("{what} is not a JSON object: {e}")))
}
