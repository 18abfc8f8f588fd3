mod compact;
mod envelope;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use tracing::{debug, warn};

pub use compact::CompactCodec;
pub use envelope::EnvelopeCodec;

use crate::error::{Result, SignerError};
use crate::signing::{EcdsaPrivateKey, EcdsaPublicKey};

/// Claim set carried by a token.
pub type Claims = serde_json::Map<String, Value>;

/// Serializes and signs claim sets, and reverses the process.
///
/// Codecs own structure and signature only; `exp`/`nbf` handling lives in
/// [`issue`] and [`parse_and_verify`] so every format applies it the same way.
pub trait ClaimCodec: Send + Sync {
    fn encode(&self, key: &dyn EcdsaPrivateKey, claims: &Claims) -> Result<String>;

    /// Check structure, algorithm and signature, then return the claims.
    fn decode(&self, key: &dyn EcdsaPublicKey, token: &str) -> Result<Claims>;

    /// Format name (e.g. "compact", "envelope").
    fn name(&self) -> &str;
}

/// Token formats a key store can issue. They do not interoperate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum TokenFormat {
    /// `header.payload.signature`, base64url segments.
    #[default]
    Compact,
    /// JSON object holding the serialized claims and a detached signature.
    Envelope,
}

impl TokenFormat {
    pub fn codec(&self) -> &'static dyn ClaimCodec {
        match self {
            TokenFormat::Compact => &CompactCodec,
            TokenFormat::Envelope => &EnvelopeCodec,
        }
    }
}

impl fmt::Display for TokenFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.codec().name())
    }
}

impl FromStr for TokenFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "compact" | "jwt" => Ok(TokenFormat::Compact),
            "envelope" => Ok(TokenFormat::Envelope),
            other => Err(format!("unknown token format: {other}")),
        }
    }
}

/// Sign `claims`, adding `exp = now + ttl_seconds` when absent.
pub fn issue(
    codec: &dyn ClaimCodec,
    key: &dyn EcdsaPrivateKey,
    claims: Claims,
    ttl_seconds: i64,
) -> Result<String> {
    issue_at(codec, key, claims, ttl_seconds, now())
}

/// Decode and verify a token, then reject it if `exp` has passed or `nbf`
/// is still in the future.
pub fn parse_and_verify(
    codec: &dyn ClaimCodec,
    key: &dyn EcdsaPublicKey,
    token: &str,
    leeway_seconds: i64,
) -> Result<Claims> {
    parse_and_verify_at(codec, key, token, leeway_seconds, now())
}

pub(crate) fn issue_at(
    codec: &dyn ClaimCodec,
    key: &dyn EcdsaPrivateKey,
    mut claims: Claims,
    ttl_seconds: i64,
    now: i64,
) -> Result<String> {
    if !claims.contains_key("exp") {
        claims.insert("exp".into(), Value::from(now.saturating_add(ttl_seconds)));
    }
    let token = codec.encode(key, &claims)?;
    debug!(format = codec.name(), claims = claims.len(), "issued token");
    Ok(token)
}

pub(crate) fn parse_and_verify_at(
    codec: &dyn ClaimCodec,
    key: &dyn EcdsaPublicKey,
    token: &str,
    leeway_seconds: i64,
    now: i64,
) -> Result<Claims> {
    let claims = codec
        .decode(key, token)
        .and_then(|claims| check_time_claims(&claims, now, leeway_seconds).map(|_| claims))
        .inspect_err(|e| warn!(format = codec.name(), error = %e, "rejected token"))?;
    debug!(format = codec.name(), "verified token");
    Ok(claims)
}

fn check_time_claims(claims: &Claims, now: i64, leeway_seconds: i64) -> Result<()> {
    if let Some(exp) = numeric_date(claims, "exp")? {
        if exp <= now.saturating_sub(leeway_seconds) {
            return Err(SignerError::invalid_token("token has expired"));
        }
    }
    if let Some(nbf) = numeric_date(claims, "nbf")? {
        if nbf > now.saturating_add(leeway_seconds) {
            return Err(SignerError::invalid_token("token is not yet valid"));
        }
    }
    numeric_date(claims, "iat")?;
    Ok(())
}

fn numeric_date(claims: &Claims, name: &str) -> Result<Option<i64>> {
    let Some(value) = claims.get(name) else {
        return Ok(None);
    };
    value
        .as_i64()
        .or_else(|| value.as_f64().map(|seconds| seconds as i64))
        .map(Some)
        .ok_or_else(|| SignerError::invalid_token(format!("{name} claim must be a number")))
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
