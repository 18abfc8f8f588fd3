use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use ecdsa_signer::{Claims, Curve, KeyStore, KeyStoreConfig, SignerError, TokenFormat};
use serde_json::{Value, json};

const FORMATS: [TokenFormat; 2] = [TokenFormat::Compact, TokenFormat::Envelope];

fn claims(value: Value) -> Claims {
    value.as_object().cloned().unwrap()
}

fn store(format: TokenFormat) -> KeyStore {
    KeyStore::from_seed(
        KeyStoreConfig::default().with_token_format(format),
        "token-tests",
    )
    .unwrap()
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

#[test]
fn audience_claim_round_trips_with_expiry() {
    for format in FORMATS {
        let store = store(format);
        let issued_at = unix_now();
        let token = store
            .issue_token(claims(json!({"aud": "https://example.com"})))
            .unwrap();

        let verified = store.parse_and_verify_token(&token).unwrap();
        assert_eq!(verified["aud"], "https://example.com", "{format}");
        assert!(verified["exp"].as_i64().unwrap() > issued_at, "{format}");
    }
}

#[test]
fn explicit_exp_is_kept() {
    let store = store(TokenFormat::Compact);
    let exp = unix_now() + 60;
    let token = store
        .issue_token(claims(json!({"sub": "alice", "exp": exp})))
        .unwrap();
    let verified = store.parse_and_verify_token(&token).unwrap();
    assert_eq!(verified["exp"], exp);
}

#[test]
fn already_expired_token_is_rejected() {
    for format in FORMATS {
        let store = store(format);
        let token = store
            .issue_token_with_ttl(claims(json!({"aud": "https://example.com"})), -1)
            .unwrap();
        assert!(
            matches!(
                store.parse_and_verify_token(&token),
                Err(SignerError::InvalidToken(_))
            ),
            "{format}"
        );
    }
}

#[test]
fn leeway_tolerates_recent_expiry() {
    let store = KeyStore::from_seed(
        KeyStoreConfig::default().with_leeway(60),
        "token-tests",
    )
    .unwrap();
    let token = store.issue_token_with_ttl(Claims::new(), -1).unwrap();
    assert!(store.parse_and_verify_token(&token).is_ok());
}

#[test]
fn future_nbf_is_rejected() {
    let store = store(TokenFormat::Compact);
    let token = store
        .issue_token(claims(json!({"nbf": unix_now() + 3_600})))
        .unwrap();
    assert!(matches!(
        store.parse_and_verify_token(&token),
        Err(SignerError::InvalidToken(_))
    ));
}

#[test]
fn compact_token_has_es256_header() {
    let token = store(TokenFormat::Compact)
        .issue_token(Claims::new())
        .unwrap();
    let header = token.split('.').next().unwrap();
    let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();
    assert_eq!(header["alg"], "ES256");
    assert_eq!(header["typ"], "JWT");
}

#[test]
fn secp256k1_tokens_use_es256k() {
    let store = KeyStore::generate(KeyStoreConfig::new(Curve::Secp256k1));
    let token = store.issue_token(Claims::new()).unwrap();
    let header = token.split('.').next().unwrap();
    let header: Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header).unwrap()).unwrap();
    assert_eq!(header["alg"], "ES256K");
    assert!(store.parse_and_verify_token(&token).is_ok());
}

#[test]
fn swapped_claims_fail_signature_check() {
    let store = store(TokenFormat::Compact);
    let token = store
        .issue_token(claims(json!({"sub": "alice"})))
        .unwrap();
    let parts: Vec<&str> = token.split('.').collect();

    let mut forged = claims(json!({"sub": "mallory"}));
    forged.insert("exp".into(), json!(unix_now() + 3_600));
    let forged = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged).unwrap());
    let tampered = format!("{}.{}.{}", parts[0], forged, parts[2]);

    assert!(matches!(
        store.parse_and_verify_token(&tampered),
        Err(SignerError::InvalidSignature)
    ));
}

#[test]
fn token_from_another_key_is_rejected() {
    for format in FORMATS {
        let issuer = store(format);
        let other = KeyStore::from_seed(
            KeyStoreConfig::default().with_token_format(format),
            "someone-else",
        )
        .unwrap();
        let token = issuer.issue_token(Claims::new()).unwrap();
        assert!(
            matches!(
                other.parse_and_verify_token(&token),
                Err(SignerError::InvalidSignature)
            ),
            "{format}"
        );
    }
}

#[test]
fn public_only_store_verifies_tokens() {
    for format in FORMATS {
        let issuer = store(format);
        let token = issuer
            .issue_token(claims(json!({"aud": "https://example.com"})))
            .unwrap();
        let verifier = KeyStore::from_public_key(
            KeyStoreConfig::default().with_token_format(format),
            issuer.public_key_pem().unwrap().as_bytes(),
        )
        .unwrap();
        assert_eq!(
            verifier.parse_and_verify_token(&token).unwrap()["aud"],
            "https://example.com"
        );
        assert!(matches!(
            verifier.issue_token(Claims::new()),
            Err(SignerError::KeyNotLoaded(_))
        ));
    }
}

#[test]
fn malformed_tokens_are_invalid() {
    for format in FORMATS {
        let store = store(format);
        for token in ["", "a.b", "not a token", "{}"] {
            assert!(
                matches!(
                    store.parse_and_verify_token(token),
                    Err(SignerError::InvalidToken(_))
                ),
                "{format}: {token:?}"
            );
        }
    }
}
