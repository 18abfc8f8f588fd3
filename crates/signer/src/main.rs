use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecdsa_signer::{Claims, Curve, KeyStore, KeyStoreConfig, TokenFormat};
use serde_json::Value;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(version, about = "ECDSA key management, signing and claim tokens")]
struct Args {
    /// secp256k1 or secp256r1 (aliases: k256, p256, p-256, prime256v1).
    #[clap(long, env = "SIGNER_CURVE", default_value = "secp256r1", global = true)]
    curve: Curve,
    /// compact (alias: jwt) or envelope.
    #[clap(long, env = "SIGNER_TOKEN_FORMAT", default_value = "compact", global = true)]
    token_format: TokenFormat,
    #[clap(long, env = "SIGNER_TOKEN_TTL", default_value_t = 86_400, global = true)]
    token_ttl: i64,
    /// Passphrase protecting the private key file.
    #[clap(long, env = "SIGNER_KEY_PASSPHRASE", hide_env_values = true, global = true)]
    passphrase: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Generate a key pair and write both halves as PEM.
    Generate {
        #[clap(long, default_value = "private_key.pem")]
        private_key: PathBuf,
        #[clap(long, default_value = "public_key.pem")]
        public_key: PathBuf,
    },
    /// Replace the key pair on disk with a new one.
    Rotate {
        #[clap(long, default_value = "private_key.pem")]
        private_key: PathBuf,
        #[clap(long, default_value = "public_key.pem")]
        public_key: PathBuf,
        /// Passphrase for the rotated private key; defaults to the current one.
        #[clap(long, env = "SIGNER_NEW_PASSPHRASE", hide_env_values = true)]
        new_passphrase: Option<String>,
    },
    /// Print the public key PEM of a private key file.
    PublicKey {
        #[clap(long, default_value = "private_key.pem")]
        private_key: PathBuf,
    },
    /// Sign DATA and print the base64url signature.
    Sign {
        #[clap(long, default_value = "private_key.pem")]
        private_key: PathBuf,
        data: String,
    },
    /// Check SIGNATURE over DATA. Exits non-zero when it does not match.
    Verify {
        /// Public or private key file.
        #[clap(long, default_value = "public_key.pem")]
        key: PathBuf,
        signature: String,
        data: String,
    },
    /// Issue a signed claim token.
    IssueToken {
        #[clap(long, default_value = "private_key.pem")]
        private_key: PathBuf,
        /// Claim as KEY=VALUE; VALUE is parsed as JSON when possible.
        #[clap(long = "claim", value_parser = parse_claim)]
        claims: Vec<(String, Value)>,
        /// Lifetime in seconds when no `exp` claim is given.
        #[clap(long)]
        ttl: Option<i64>,
    },
    /// Verify a claim token and print its claims.
    VerifyToken {
        /// Public or private key file.
        #[clap(long, default_value = "public_key.pem")]
        key: PathBuf,
        token: String,
    },
}

impl Args {
    fn config(&self) -> KeyStoreConfig {
        let config = KeyStoreConfig::new(self.curve)
            .with_token_format(self.token_format)
            .with_token_ttl(self.token_ttl);
        match &self.passphrase {
            Some(passphrase) => config.with_passphrase(passphrase.clone()),
            None => config,
        }
    }
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("ecdsa_signer=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = args.config();

    match args.command {
        Command::Generate {
            private_key,
            public_key,
        } => {
            let store = KeyStore::generate(config);
            save_key_pair(&store, &private_key, &public_key)?;
            println!("{}", store.fingerprint()?);
        }
        Command::Rotate {
            private_key,
            public_key,
            new_passphrase,
        } => {
            let mut store = KeyStore::new(config);
            if private_key.exists() {
                if let Err(e) = store.load_private_key_file(&private_key) {
                    warn!(error = %e, "could not read current key; rotating anyway");
                }
            }
            store.rotate(new_passphrase.as_deref());
            save_key_pair(&store, &private_key, &public_key)?;
            println!("{}", store.fingerprint()?);
        }
        Command::PublicKey { private_key } => {
            let store = open_signer(config, &private_key)?;
            print!("{}", store.public_key_pem()?);
        }
        Command::Sign { private_key, data } => {
            let store = open_signer(config, &private_key)?;
            println!("{}", store.sign(data.as_bytes()).context("signing data")?);
        }
        Command::Verify {
            key,
            signature,
            data,
        } => {
            let store = open_verifier(config, &key)?;
            let valid = store
                .verify(&signature, data.as_bytes())
                .context("verifying signature")?;
            println!("{valid}");
            if !valid {
                return Ok(ExitCode::FAILURE);
            }
        }
        Command::IssueToken {
            private_key,
            claims,
            ttl,
        } => {
            let store = open_signer(config, &private_key)?;
            let claims: Claims = claims.into_iter().collect();
            let ttl = ttl.unwrap_or(store.config().token_ttl_seconds);
            println!("{}", store.issue_token_with_ttl(claims, ttl)?);
        }
        Command::VerifyToken { key, token } => {
            let store = open_verifier(config, &key)?;
            let claims = store
                .parse_and_verify_token(&token)
                .context("verifying token")?;
            println!("{}", serde_json::to_string_pretty(&Value::Object(claims))?);
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn open_signer(config: KeyStoreConfig, path: &Path) -> Result<KeyStore> {
    let mut store = KeyStore::new(config);
    store
        .load_private_key_file(path)
        .with_context(|| format!("loading private key from {}", path.display()))?;
    Ok(store)
}

/// Accepts either half of the key pair.
fn open_verifier(config: KeyStoreConfig, path: &Path) -> Result<KeyStore> {
    let bytes = std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    KeyStore::from_public_key(config.clone(), &bytes)
        .or_else(|_| KeyStore::from_private_key(config, &bytes))
        .with_context(|| format!("loading key from {}", path.display()))
}

fn save_key_pair(store: &KeyStore, private_key: &Path, public_key: &Path) -> Result<()> {
    store
        .save_private_key(private_key)
        .with_context(|| format!("writing {}", private_key.display()))?;
    store
        .save_public_key(public_key)
        .with_context(|| format!("writing {}", public_key.display()))?;
    info!(
        private_key = %private_key.display(),
        public_key = %public_key.display(),
        "key pair written"
    );
    Ok(())
}

fn parse_claim(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got {raw:?}"))?;
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}
