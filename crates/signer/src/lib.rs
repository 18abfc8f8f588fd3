pub mod config;
pub mod error;
pub mod keystore;
pub mod signing;
pub mod token;

pub use config::KeyStoreConfig;
pub use error::{Result, SignerError};
pub use keystore::{KeyFormat, KeyState, KeyStore, SharedKeyStore};
pub use signing::{Curve, EcdsaPrivateKey, EcdsaPublicKey};
pub use token::{ClaimCodec, Claims, CompactCodec, EnvelopeCodec, TokenFormat};
