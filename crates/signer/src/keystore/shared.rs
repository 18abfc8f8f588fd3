use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;
use zeroize::Zeroizing;

use super::{KeyState, KeyStore};
use crate::error::Result;
use crate::token::Claims;

/// A [`KeyStore`] shared between concurrent callers.
///
/// Key lifecycle changes take the write lock; signing, verification and
/// token operations take the read lock, so no caller observes a half-rotated
/// key. Methods return owned values only.
#[derive(Clone, Debug)]
pub struct SharedKeyStore {
    inner: Arc<RwLock<KeyStore>>,
}

impl SharedKeyStore {
    pub fn new(store: KeyStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    pub fn state(&self) -> KeyState {
        self.inner.read().state()
    }

    pub fn generate_keys(&self) {
        self.inner.write().generate_keys();
    }

    pub fn load_private_key(&self, bytes: &[u8]) -> Result<()> {
        self.inner.write().load_private_key(bytes)
    }

    pub fn load_public_key(&self, bytes: &[u8]) -> Result<()> {
        self.inner.write().load_public_key(bytes)
    }

    pub fn rotate(&self, passphrase: Option<&str>) {
        self.inner.write().rotate(passphrase);
    }

    pub fn clear(&self) {
        self.inner.write().clear();
    }

    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        self.inner.read().sign(payload)
    }

    pub fn verify(&self, signature: &str, payload: &[u8]) -> Result<bool> {
        self.inner.read().verify(signature, payload)
    }

    pub fn issue_token(&self, claims: Claims) -> Result<String> {
        self.inner.read().issue_token(claims)
    }

    pub fn issue_token_with_ttl(&self, claims: Claims, ttl_seconds: i64) -> Result<String> {
        self.inner.read().issue_token_with_ttl(claims, ttl_seconds)
    }

    pub fn parse_and_verify_token(&self, token: &str) -> Result<Claims> {
        self.inner.read().parse_and_verify_token(token)
    }

    pub fn private_key_pem(&self) -> Result<Zeroizing<String>> {
        self.inner.read().private_key_pem()
    }

    pub fn public_key_pem(&self) -> Result<String> {
        self.inner.read().public_key_pem()
    }

    pub fn save_private_key(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.read().save_private_key(path)
    }

    pub fn save_public_key(&self, path: impl AsRef<Path>) -> Result<()> {
        self.inner.read().save_public_key(path)
    }

    pub fn fingerprint(&self) -> Result<String> {
        self.inner.read().fingerprint()
    }
}

impl From<KeyStore> for SharedKeyStore {
    fn from(store: KeyStore) -> Self {
        Self::new(store)
    }
}
