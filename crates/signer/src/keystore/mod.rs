mod codec;
mod file;
mod shared;

use std::fmt;
use std::path::Path;

use tracing::info;
use zeroize::Zeroizing;

pub use codec::{KeyFormat, decode_private_key, decode_public_key, fingerprint};
pub use shared::SharedKeyStore;

use crate::config::KeyStoreConfig;
use crate::error::{Result, SignerError};
use crate::signing::{self, Curve, EcdsaPrivateKey, EcdsaPublicKey};
use crate::token::{self, Claims};

/// Which keys a [`KeyStore`] currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyState {
    Unloaded,
    /// Verification only: built from a public key, or cleared.
    PublicOnly,
    Loaded,
}

/// Owner of the single active key pair.
///
/// The public key is always the one derived from the loaded private key.
/// Replacing or clearing the private key drops the old one, and the key
/// types zeroize their scalar on drop. Accessors hand out borrows, so no
/// reference to a replaced key can outlive the mutation.
pub struct KeyStore {
    config: KeyStoreConfig,
    private_key: Option<Box<dyn EcdsaPrivateKey>>,
    public_key: Option<Box<dyn EcdsaPublicKey>>,
}

impl KeyStore {
    /// An empty store in the [`KeyState::Unloaded`] state.
    pub fn new(config: KeyStoreConfig) -> Self {
        Self {
            config,
            private_key: None,
            public_key: None,
        }
    }

    pub fn generate(config: KeyStoreConfig) -> Self {
        let mut store = Self::new(config);
        store.generate_keys();
        store
    }

    /// Deterministic key pair from a seed string, for fixtures and tests.
    pub fn from_seed(config: KeyStoreConfig, seed: &str) -> Result<Self> {
        let key = config.curve.private_key_from_seed(seed)?;
        let mut store = Self::new(config);
        store.install(key);
        Ok(store)
    }

    pub fn from_private_key(config: KeyStoreConfig, bytes: &[u8]) -> Result<Self> {
        let mut store = Self::new(config);
        store.load_private_key(bytes)?;
        Ok(store)
    }

    /// A verification-only store.
    pub fn from_public_key(config: KeyStoreConfig, bytes: &[u8]) -> Result<Self> {
        let mut store = Self::new(config);
        store.load_public_key(bytes)?;
        Ok(store)
    }

    pub fn config(&self) -> &KeyStoreConfig {
        &self.config
    }

    pub fn curve(&self) -> Curve {
        self.config.curve
    }

    pub fn state(&self) -> KeyState {
        match (&self.private_key, &self.public_key) {
            (Some(_), _) => KeyState::Loaded,
            (None, Some(_)) => KeyState::PublicOnly,
            (None, None) => KeyState::Unloaded,
        }
    }

    /// Replace any held key pair with a fresh random one.
    ///
    /// Panics if the OS entropy source fails; a weak key is never produced.
    pub fn generate_keys(&mut self) {
        self.install(self.config.curve.generate());
        info!(curve = %self.curve(), fingerprint = %self.log_fingerprint(), "generated key pair");
    }

    /// Load a private key from PEM or DER bytes.
    ///
    /// On failure the store keeps whatever it held before.
    pub fn load_private_key(&mut self, bytes: &[u8]) -> Result<()> {
        let key = codec::decode_private_key(self.config.curve, bytes, self.config.passphrase())?;
        self.install(key);
        info!(
            format = ?KeyFormat::detect(bytes),
            fingerprint = %self.log_fingerprint(),
            "loaded private key"
        );
        Ok(())
    }

    pub fn load_private_key_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = Zeroizing::new(std::fs::read(path.as_ref())?);
        self.load_private_key(&bytes)
    }

    /// Load a public key alone, dropping any private key.
    pub fn load_public_key(&mut self, bytes: &[u8]) -> Result<()> {
        let key = codec::decode_public_key(self.config.curve, bytes)?;
        self.private_key = None;
        self.public_key = Some(key);
        info!(fingerprint = %self.log_fingerprint(), "loaded public key");
        Ok(())
    }

    pub fn load_public_key_file(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let bytes = std::fs::read(path.as_ref())?;
        self.load_public_key(&bytes)
    }

    /// Replace the key pair with a freshly generated one.
    ///
    /// A passphrase, when given, replaces the one used to encrypt the
    /// private key at rest.
    pub fn rotate(&mut self, passphrase: Option<&str>) {
        let previous = self.log_fingerprint();
        if let Some(passphrase) = passphrase {
            self.config.set_passphrase(passphrase);
        }
        self.install(self.config.curve.generate());
        info!(
            previous = %previous,
            current = %self.log_fingerprint(),
            passphrase_changed = passphrase.is_some(),
            "rotated key pair"
        );
    }

    /// Drop the private key. The derived public key stays available for
    /// verification.
    pub fn clear(&mut self) {
        if self.private_key.take().is_some() {
            info!(fingerprint = %self.log_fingerprint(), "cleared private key");
        }
    }

    pub fn private_key(&self) -> Result<&dyn EcdsaPrivateKey> {
        self.private_key
            .as_deref()
            .ok_or_else(|| SignerError::key_not_loaded("no private key; generate or load one first"))
    }

    pub fn public_key(&self) -> Result<&dyn EcdsaPublicKey> {
        self.public_key
            .as_deref()
            .ok_or_else(|| SignerError::key_not_loaded("no public key available"))
    }

    /// PKCS#8 PEM of the private key, encrypted when a passphrase is configured.
    pub fn private_key_pem(&self) -> Result<Zeroizing<String>> {
        codec::encode_private_key_pem(
            self.private_key()?,
            self.config.passphrase(),
            self.config.kdf_iterations,
        )
    }

    pub fn public_key_pem(&self) -> Result<String> {
        codec::encode_public_key_pem(self.public_key()?)
    }

    /// Write the private key PEM with owner-only permissions.
    pub fn save_private_key(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let pem = self.private_key_pem()?;
        file::write_private_key(path, &pem)?;
        info!(
            path = %path.display(),
            encrypted = self.config.passphrase().is_some(),
            "saved private key"
        );
        Ok(())
    }

    pub fn save_public_key(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        file::write_public_key(path, &self.public_key_pem()?)?;
        info!(path = %path.display(), "saved public key");
        Ok(())
    }

    pub fn fingerprint(&self) -> Result<String> {
        codec::fingerprint(self.public_key()?)
    }

    /// Sign a non-empty payload; returns the unpadded base64url signature.
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        signing::sign(self.private_key()?, payload)
    }

    pub fn verify(&self, signature: &str, payload: &[u8]) -> Result<bool> {
        signing::verify(self.public_key()?, signature, payload)
    }

    /// Issue a token with the configured TTL.
    pub fn issue_token(&self, claims: Claims) -> Result<String> {
        self.issue_token_with_ttl(claims, self.config.token_ttl_seconds)
    }

    pub fn issue_token_with_ttl(&self, claims: Claims, ttl_seconds: i64) -> Result<String> {
        token::issue(
            self.config.token_format.codec(),
            self.private_key()?,
            claims,
            ttl_seconds,
        )
    }

    pub fn parse_and_verify_token(&self, token: &str) -> Result<Claims> {
        token::parse_and_verify(
            self.config.token_format.codec(),
            self.public_key()?,
            token,
            self.config.leeway_seconds,
        )
    }

    fn install(&mut self, key: Box<dyn EcdsaPrivateKey>) {
        self.public_key = Some(key.public_key());
        self.private_key = Some(key);
    }

    fn log_fingerprint(&self) -> String {
        self.fingerprint().unwrap_or_else(|_| "none".to_string())
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("fingerprint", &self.fingerprint().ok())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn config() -> KeyStoreConfig {
        KeyStoreConfig::new(Curve::Secp256k1).with_kdf_iterations(1_000)
    }

    #[test]
    fn new_store_is_unloaded() {
        let store = KeyStore::new(config());
        assert_eq!(store.state(), KeyState::Unloaded);
        assert!(matches!(store.sign(b"data"), Err(SignerError::KeyNotLoaded(_))));
        assert!(matches!(store.verify("AAAA", b"data"), Err(SignerError::KeyNotLoaded(_))));
        assert!(matches!(store.public_key_pem(), Err(SignerError::KeyNotLoaded(_))));
        assert!(matches!(
            store.issue_token(Claims::new()),
            Err(SignerError::KeyNotLoaded(_))
        ));
    }

    #[test]
    fn generate_loads_both_keys() {
        let store = KeyStore::generate(config());
        assert_eq!(store.state(), KeyState::Loaded);
        assert_eq!(store.private_key().unwrap().curve(), Curve::Secp256k1);
    }

    #[test]
    fn clear_keeps_public_key() {
        let mut store = KeyStore::generate(config());
        let signature = store.sign(b"Test data").unwrap();
        store.clear();

        assert_eq!(store.state(), KeyState::PublicOnly);
        assert!(matches!(store.sign(b"Test data"), Err(SignerError::KeyNotLoaded(_))));
        assert!(store.verify(&signature, b"Test data").unwrap());
    }

    #[test]
    fn rotate_replaces_key_pair() {
        let mut store = KeyStore::generate(config());
        let before = store.fingerprint().unwrap();
        let signature = store.sign(b"Test data").unwrap();

        store.rotate(None);

        assert_ne!(store.fingerprint().unwrap(), before);
        assert!(!store.verify(&signature, b"Test data").unwrap());
    }

    #[test]
    fn rotate_from_unloaded_loads() {
        let mut store = KeyStore::new(config());
        store.rotate(None);
        assert_eq!(store.state(), KeyState::Loaded);
    }

    #[test]
    fn rotate_with_passphrase_encrypts_saved_key() {
        let mut store = KeyStore::generate(config());
        assert!(store.private_key_pem().unwrap().contains("BEGIN PRIVATE KEY"));

        store.rotate(Some("monpassphrase"));
        let pem = store.private_key_pem().unwrap();
        assert!(pem.contains("BEGIN ENCRYPTED PRIVATE KEY"));

        let reloaded =
            KeyStore::from_private_key(config().with_passphrase("monpassphrase"), pem.as_bytes())
                .unwrap();
        assert_eq!(reloaded.fingerprint().unwrap(), store.fingerprint().unwrap());
    }

    #[test]
    fn failed_load_keeps_previous_key() {
        let mut store = KeyStore::generate(config());
        let before = store.fingerprint().unwrap();
        assert!(matches!(
            store.load_private_key(b"garbage"),
            Err(SignerError::KeyNotLoaded(_))
        ));
        assert_eq!(store.fingerprint().unwrap(), before);
    }

    #[test]
    fn load_public_key_drops_private_key() {
        let signer = KeyStore::from_seed(config(), "pub").unwrap();
        let mut store = KeyStore::generate(config());
        store
            .load_public_key(signer.public_key_pem().unwrap().as_bytes())
            .unwrap();
        assert_eq!(store.state(), KeyState::PublicOnly);
        assert_eq!(store.fingerprint().unwrap(), signer.fingerprint().unwrap());
    }

    #[test]
    fn token_round_trip_uses_configured_format() {
        let store = KeyStore::from_seed(
            config().with_token_format(crate::token::TokenFormat::Envelope),
            "token",
        )
        .unwrap();
        let claims = json!({"aud": "https://example.com"}).as_object().cloned().unwrap();
        let token = store.issue_token(claims).unwrap();
        assert!(token.starts_with('{'));
        let verified = store.parse_and_verify_token(&token).unwrap();
        assert_eq!(verified["aud"], "https://example.com");
    }

    #[test]
    fn debug_does_not_print_key_material() {
        let store = KeyStore::from_seed(config(), "debug").unwrap();
        let pem = store.private_key_pem().unwrap();
        let body: String = pem.lines().nth(1).unwrap().to_string();
        assert!(!format!("{store:?}").contains(&body));
    }
}
