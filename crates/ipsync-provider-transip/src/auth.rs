//! Request signing and token handling for the TransIP API
//!
//! TransIP hands out bearer tokens in exchange for an authentication request
//! whose exact body is signed with the account's RSA private key
//! (PKCS#1 v1.5, SHA-512). The signature travels base64 encoded in the
//! `Signature` header.

use std::fmt;
use std::io::BufReader;

use base64::Engine as _;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{RSA_PKCS1_SHA512, RsaKeyPair};
use rustls_pemfile::Item;
use serde::{Deserialize, Serialize};

use ipsync_core::{Error, Result};

/// Lifetime requested for every token
pub const TOKEN_EXPIRATION: &str = "30 minutes";

/// Same lifetime, used when the token carries no readable expiry
pub(crate) const TOKEN_LIFETIME_SECS: i64 = 30 * 60;

/// Body of `POST /auth`
#[derive(Debug, Serialize)]
pub(crate) struct AuthRequest<'a> {
    pub login: &'a str,
    pub nonce: String,
    pub read_only: bool,
    pub expiration_time: &'a str,
    pub label: String,
    pub global_key: bool,
}

/// Response of `POST /auth`
#[derive(Deserialize)]
pub(crate) struct AuthResponse {
    pub token: String,
}

/// RSA key used to sign authentication requests
pub struct RequestSigner {
    key_pair: RsaKeyPair,
    rng: SystemRandom,
}

impl RequestSigner {
    /// Load a signer from a PEM document
    ///
    /// Accepts PKCS#8 (`BEGIN PRIVATE KEY`) and PKCS#1
    /// (`BEGIN RSA PRIVATE KEY`) RSA keys. The first key in the document wins.
    pub fn from_pem(pem: &[u8]) -> Result<Self> {
        let mut reader = BufReader::new(pem);

        loop {
            let item = rustls_pemfile::read_one(&mut reader)
                .map_err(|e| Error::config(format!("Malformed private key PEM: {}", e)))?;

            let key_pair = match item {
                Some(Item::Pkcs8Key(key)) => RsaKeyPair::from_pkcs8(key.secret_pkcs8_der()),
                Some(Item::Pkcs1Key(key)) => RsaKeyPair::from_der(key.secret_pkcs1_der()),
                Some(Item::Sec1Key(_)) => {
                    return Err(Error::config(
                        "Private key is an EC key; an RSA key is required",
                    ));
                }
                Some(_) => continue,
                None => return Err(Error::config("No private key found in PEM data")),
            };

            let key_pair = key_pair
                .map_err(|e| Error::config(format!("Private key rejected: {}", e)))?;

            return Ok(Self {
                key_pair,
                rng: SystemRandom::new(),
            });
        }
    }

    /// Sign `body` and return the base64 encoded signature
    pub fn sign(&self, body: &[u8]) -> Result<String> {
        let mut signature = vec![0; self.key_pair.public().modulus_len()];
        self.key_pair
            .sign(&RSA_PKCS1_SHA512, &self.rng, body, &mut signature)
            .map_err(|_| Error::auth("Failed to sign authentication request"))?;

        Ok(STANDARD.encode(signature))
    }

    /// A fresh random nonce, hex encoded
    pub fn nonce(&self) -> Result<String> {
        let mut bytes = [0u8; 16];
        self.rng
            .fill(&mut bytes)
            .map_err(|_| Error::auth("Failed to generate nonce"))?;

        Ok(hex::encode(bytes))
    }

    /// DER encoded public key, for verifying signatures
    pub fn public_key_der(&self) -> &[u8] {
        self.key_pair.public().as_ref()
    }
}

// Never print key material
impl fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_pair", &"<REDACTED>")
            .finish()
    }
}

#[derive(Deserialize)]
struct Claims {
    exp: Option<i64>,
}

/// Read the `exp` claim of a JWT without verifying it
///
/// The token is only ever sent back to the server that issued it, so the
/// signature is the server's business.
pub fn jwt_expiry(token: &str) -> Option<DateTime<Utc>> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let claims: Claims = serde_json::from_slice(&bytes).ok()?;

    DateTime::from_timestamp(claims.exp?, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ring::signature::{RSA_PKCS1_2048_8192_SHA512, UnparsedPublicKey};

    const PKCS8_KEY: &[u8] = include_bytes!("../tests/fixtures/test_key_pkcs8.pem");
    const PKCS1_KEY: &[u8] = include_bytes!("../tests/fixtures/test_key_pkcs1.pem");

    #[test]
    fn signature_verifies_with_public_key() {
        let signer = RequestSigner::from_pem(PKCS8_KEY).unwrap();
        let body = br#"{"login":"acme","nonce":"abc"}"#;

        let signature = STANDARD.decode(signer.sign(body).unwrap()).unwrap();
        let public_key =
            UnparsedPublicKey::new(&RSA_PKCS1_2048_8192_SHA512, signer.public_key_der());

        assert!(public_key.verify(body, &signature).is_ok());
        assert!(public_key.verify(b"tampered", &signature).is_err());
    }

    #[test]
    fn pkcs1_keys_load() {
        let signer = RequestSigner::from_pem(PKCS1_KEY).unwrap();
        assert!(!signer.sign(b"body").unwrap().is_empty());
    }

    #[test]
    fn garbage_pem_is_a_config_error() {
        assert!(matches!(
            RequestSigner::from_pem(b"not a key"),
            Err(Error::Config(_))
        ));
        assert!(RequestSigner::from_pem(b"").is_err());
    }

    #[test]
    fn nonces_are_unique_hex() {
        let signer = RequestSigner::from_pem(PKCS8_KEY).unwrap();
        let a = signer.nonce().unwrap();
        let b = signer.nonce().unwrap();

        assert_eq!(hex::decode(&a).unwrap().len(), 16);
        assert_ne!(a, b);
    }

    #[test]
    fn debug_output_redacts_key() {
        let signer = RequestSigner::from_pem(PKCS8_KEY).unwrap();
        assert!(format!("{:?}", signer).contains("<REDACTED>"));
    }

    #[test]
    fn reads_exp_claim() {
        let payload = URL_SAFE_NO_PAD.encode(br#"{"iss":"api.transip.nl","exp":1700000000}"#);
        let token = format!("eyJhbGciOiJSUzUxMiJ9.{}.c2ln", payload);

        assert_eq!(
            jwt_expiry(&token),
            DateTime::from_timestamp(1_700_000_000, 0)
        );
    }

    #[test]
    fn unreadable_tokens_have_no_expiry() {
        assert_eq!(jwt_expiry("opaque-token"), None);
        assert_eq!(jwt_expiry("a.!!!.c"), None);
        let no_exp = format!("a.{}.c", URL_SAFE_NO_PAD.encode(br#"{"iss":"x"}"#));
        assert_eq!(jwt_expiry(&no_exp), None);
    }
}
