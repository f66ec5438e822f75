//! Signed session tokens.
//!
//! ```text
//! base64url(json claims) "." base64url(ed25519 signature over the first part)
//! ```
//!
//! The Ed25519 seed is `SHA-256("amity-session-key-v1" || secret)`, so every
//! server configured with the same secret issues and accepts the same
//! tokens.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::{Error, Result};

/// Default session lifetime (3 days)
pub const DEFAULT_TOKEN_TTL_SECS: i64 = 3 * 24 * 60 * 60;

/// Longest lifetime the server accepts for a session.
pub const MAX_TOKEN_TTL_SECS: i64 = 365 * 24 * 3600;

const KEY_CONTEXT: &[u8] = b"amity-session-key-v1";

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    /// Issued at (Unix seconds)
    pub iat: i64,
    /// Expires at (Unix seconds)
    pub exp: i64,
}

/// Issues and verifies session tokens.
pub struct TokenSigner {
    signing_key: SigningKey,
    verifying_key: VerifyingKey,
    ttl_secs: i64,
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_secs: i64) -> Self {
        let seed: [u8; 32] = Sha256::new()
            .chain_update(KEY_CONTEXT)
            .chain_update(secret.as_bytes())
            .finalize()
            .into();
        let signing_key = SigningKey::from_bytes(&seed);
        let verifying_key = signing_key.verifying_key();

        Self {
            signing_key,
            verifying_key,
            ttl_secs,
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    /// Issue a token valid from now.
    pub fn issue(&self, user_id: &str, email: &str) -> Result<String> {
        self.issue_at(user_id, email, crate::time::now_timestamp())
    }

    pub fn issue_at(&self, user_id: &str, email: &str, now: i64) -> Result<String> {
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl_secs),
        };

        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?);
        let signature = self.signing_key.sign(payload.as_bytes());
        Ok(format!("{}.{}", payload, URL_SAFE_NO_PAD.encode(signature.to_bytes())))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.verify_at(token, crate::time::now_timestamp())
    }

    pub fn verify_at(&self, token: &str, now: i64) -> Result<Claims> {
        let (payload, signature) = token
            .split_once('.')
            .ok_or_else(|| Error::InvalidToken("malformed".into()))?;

        let signature = URL_SAFE_NO_PAD
            .decode(signature)
            .ok()
            .and_then(|bytes| Signature::from_slice(&bytes).ok())
            .ok_or_else(|| Error::InvalidToken("malformed signature".into()))?;

        self.verifying_key
            .verify(payload.as_bytes(), &signature)
            .map_err(|_| Error::InvalidToken("bad signature".into()))?;

        let claims: Claims = URL_SAFE_NO_PAD
            .decode(payload)
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .ok_or_else(|| Error::InvalidToken("malformed claims".into()))?;

        if claims.exp <= now {
            return Err(Error::InvalidToken("expired".into()));
        }

        Ok(claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("verifying_key", &hex::encode(self.verifying_key.as_bytes()))
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new("test-secret", DEFAULT_TOKEN_TTL_SECS)
    }

    #[test]
    fn test_issue_and_verify() {
        let signer = signer();
        let token = signer.issue_at("u1", "a@example.com", 1_000).unwrap();
        let claims = signer.verify_at(&token, 1_001).unwrap();

        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.email, "a@example.com");
        assert_eq!(claims.iat, 1_000);
        assert_eq!(claims.exp, 1_000 + DEFAULT_TOKEN_TTL_SECS);
    }

    #[test]
    fn test_same_secret_same_key() {
        let token = signer().issue("u1", "a@example.com").unwrap();
        assert!(signer().verify(&token).is_ok());

        let other = TokenSigner::new("another-secret", DEFAULT_TOKEN_TTL_SECS);
        assert!(matches!(other.verify(&token), Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_expired_token() {
        let signer = TokenSigner::new("s", 60);
        let token = signer.issue_at("u1", "a@example.com", 1_000).unwrap();
        match signer.verify_at(&token, 1_060) {
            Err(Error::InvalidToken(reason)) => assert_eq!(reason, "expired"),
            other => panic!("expected expiry, got {:?}", other),
        }
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let signer = signer();
        let token = signer.issue_at("u1", "a@example.com", 1_000).unwrap();
        let (_, signature) = token.split_once('.').unwrap();

        let forged_claims = Claims {
            user_id: "admin".into(),
            email: "a@example.com".into(),
            iat: 1_000,
            exp: i64::MAX,
        };
        let forged_payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&forged_claims).unwrap());
        let forged = format!("{}.{}", forged_payload, signature);

        assert!(matches!(signer.verify_at(&forged, 1_001), Err(Error::InvalidToken(_))));
    }

    #[test]
    fn test_huge_ttl_does_not_wrap() {
        let signer = TokenSigner::new("s", i64::MAX);
        let token = signer.issue_at("u1", "a@example.com", 1_000).unwrap();
        let claims = signer.verify_at(&token, 1_001).unwrap();
        assert_eq!(claims.exp, i64::MAX);
    }

    #[test]
    fn test_garbage_rejected() {
        let signer = signer();
        for token in ["", "no-dot", "a.b", "!!.??"] {
            assert!(matches!(signer.verify(token), Err(Error::InvalidToken(_))), "{}", token);
        }
    }
}
