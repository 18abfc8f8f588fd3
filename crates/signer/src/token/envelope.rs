use serde::{Deserialize, Serialize};

use super::{ClaimCodec, Claims};
use crate::error::{Result, SignerError};
use crate::signing::{self, EcdsaPrivateKey, EcdsaPublicKey};

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Envelope {
    alg: String,
    /// Serialized claims; the signature covers exactly these bytes.
    payload: String,
    signature: String,
}

/// Signed JSON envelope:
/// `{"alg": "ES256", "payload": "<claims JSON>", "signature": "<base64url>"}`.
///
/// The claims travel as a string so verification never depends on
/// re-serializing them.
pub struct EnvelopeCodec;

impl ClaimCodec for EnvelopeCodec {
    fn encode(&self, key: &dyn EcdsaPrivateKey, claims: &Claims) -> Result<String> {
        let payload = serde_json::to_string(claims)
            .map_err(|e| SignerError::InvalidInput(format!("claims are not serializable: {e}")))?;
        let signature = signing::sign(key, payload.as_bytes())?;
        let envelope = Envelope {
            alg: key.curve().jws_algorithm().to_string(),
            payload,
            signature,
        };
        serde_json::to_string(&envelope)
            .map_err(|e| SignerError::InvalidInput(format!("envelope is not serializable: {e}")))
    }

    fn decode(&self, key: &dyn EcdsaPublicKey, token: &str) -> Result<Claims> {
        let envelope: Envelope = serde_json::from_str(token)
            .map_err(|e| SignerError::invalid_token(format!("malformed envelope: {e}")))?;

        let expected = key.curve().jws_algorithm();
        if envelope.alg != expected {
            return Err(SignerError::invalid_token(format!(
                "unsupported algorithm {:?}, expected {expected}",
                envelope.alg
            )));
        }

        let claims: Claims = serde_json::from_str(&envelope.payload)
            .map_err(|e| SignerError::invalid_token(format!("payload is not a JSON object: {e}")))?;
        let signature = signing::decode_signature(&envelope.signature)
            .map_err(|_| SignerError::invalid_token("signature is not base64url"))?;

        if !key.verify(envelope.payload.as_bytes(), &signature)? {
            return Err(SignerError::InvalidSignature);
        }
        Ok(claims)
    }

    fn name(&self) -> &str {
        "envelope"
    }
}
