use std::fmt;

use zeroize::Zeroizing;

use crate::signing::Curve;
use crate::token::TokenFormat;

pub const DEFAULT_TOKEN_TTL_SECONDS: i64 = 86_400;
pub const DEFAULT_KDF_ITERATIONS: u32 = 600_000;

/// Construction-time settings for a [`KeyStore`](crate::KeyStore).
#[derive(Clone)]
pub struct KeyStoreConfig {
    pub curve: Curve,
    pub token_format: TokenFormat,
    /// Lifetime given to issued tokens that carry no `exp` claim.
    pub token_ttl_seconds: i64,
    /// Clock skew tolerated when checking `exp` and `nbf`.
    pub leeway_seconds: i64,
    /// PBKDF2 rounds used when encrypting the private key at rest.
    pub kdf_iterations: u32,
    passphrase: Option<Zeroizing<String>>,
}

impl KeyStoreConfig {
    pub fn new(curve: Curve) -> Self {
        Self {
            curve,
            ..Self::default()
        }
    }

    pub fn with_token_format(mut self, token_format: TokenFormat) -> Self {
        self.token_format = token_format;
        self
    }

    pub fn with_token_ttl(mut self, seconds: i64) -> Self {
        self.token_ttl_seconds = seconds;
        self
    }

    pub fn with_leeway(mut self, seconds: i64) -> Self {
        self.leeway_seconds = seconds;
        self
    }

    pub fn with_kdf_iterations(mut self, iterations: u32) -> Self {
        self.kdf_iterations = iterations;
        self
    }

    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.set_passphrase(passphrase);
        self
    }

    pub(crate) fn set_passphrase(&mut self, passphrase: impl Into<String>) {
        self.passphrase = Some(Zeroizing::new(passphrase.into()));
    }

    pub fn passphrase(&self) -> Option<&[u8]> {
        self.passphrase.as_ref().map(|p| p.as_bytes())
    }
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            curve: Curve::default(),
            token_format: TokenFormat::default(),
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
            leeway_seconds: 0,
            kdf_iterations: DEFAULT_KDF_ITERATIONS,
            passphrase: None,
        }
    }
}

impl fmt::Debug for KeyStoreConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStoreConfig")
            .field("curve", &self.curve)
            .field("token_format", &self.token_format)
            .field("token_ttl_seconds", &self.token_ttl_seconds)
            .field("leeway_seconds", &self.leeway_seconds)
            .field("kdf_iterations", &self.kdf_iterations)
            .field("passphrase", &self.passphrase.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}
