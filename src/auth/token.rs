// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! HS256 access-token codec.
//!
//! Tokens are self-contained: verification is signature + clock only, there
//! is no server-side revocation list.
//!
//! The authoritative expiry is the `exp_ms` claim, checked at millisecond
//! resolution. `exp` carries the same instant rounded up to whole seconds.

use std::time::Duration;

use chrono::Utc;
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use thiserror::Error;

use super::claims::AccessClaims;

/// Failure kinds of [`TokenCodec::verify`].
///
/// The three verification kinds stay distinct: the gate treats an expired
/// token differently from one that was never valid.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token signature is invalid")]
    SignatureInvalid,
    #[error("token has expired")]
    Expired,
    #[error("token could not be signed: {0}")]
    Signing(String),
}

/// A token whose signature checked out and whose expiry lies in the future.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedToken {
    pub subject: String,
    /// Unix seconds
    pub issued_at: i64,
    /// Unix milliseconds
    pub expires_at_ms: i64,
}

/// Issues and verifies signed bearer tokens with a shared secret.
pub struct TokenCodec {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenCodec {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked after decoding, at millisecond resolution.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    /// Issue a token for `subject`, valid from now for the configured TTL.
    pub fn issue(&self, subject: &str) -> Result<String, TokenError> {
        let now_ms = Utc::now().timestamp_millis();
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        let exp_ms = now_ms.saturating_add(ttl_ms);
        let claims = AccessClaims {
            sub: subject.to_string(),
            iat: now_ms / 1000,
            exp: exp_ms / 1000 + i64::from(exp_ms % 1000 != 0),
            exp_ms,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))
    }

    /// Verify signature and expiry.
    ///
    /// `Expired` is only reported for tokens whose signature is authentic;
    /// a forged token past its expiry is `SignatureInvalid`.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        let data = decode::<AccessClaims>(token, &self.decoding, &self.validation).map_err(|e| {
            match e.kind() {
                ErrorKind::InvalidSignature | ErrorKind::InvalidAlgorithm => {
                    TokenError::SignatureInvalid
                }
                _ => TokenError::Malformed,
            }
        })?;

        let claims = data.claims;
        if claims.exp_ms <= Utc::now().timestamp_millis() {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken {
            subject: claims.sub,
            issued_at: claims.iat,
            expires_at_ms: claims.exp_ms,
        })
    }

    /// True iff the token verifies, is unexpired, and names `expected_subject`.
    pub fn is_valid(&self, token: &str, expected_subject: &str) -> bool {
        self.verify(token)
            .map(|verified| verified.subject == expected_subject)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

    const SECRET: &[u8] = b"test-secret-that-is-at-least-32-bytes-long";

    fn codec(ttl: Duration) -> TokenCodec {
        TokenCodec::new(SECRET, ttl)
    }

    #[test]
    fn verify_round_trips_subject() {
        let codec = codec(Duration::from_secs(3600));
        let token = codec.issue("owner").unwrap();

        let verified = codec.verify(&token).unwrap();
        assert_eq!(verified.subject, "owner");
        assert!(verified.expires_at_ms > verified.issued_at * 1000);
    }

    #[test]
    fn sub_second_ttl_is_valid_until_it_elapses() {
        let codec = codec(Duration::from_millis(500));

        for _ in 0..40 {
            let token = codec.issue("owner").unwrap();
            assert_eq!(codec.verify(&token).map(|v| v.subject), Ok("owner".to_string()));
            std::thread::sleep(Duration::from_millis(7));
        }
    }

    #[test]
    fn exp_seconds_rounds_up_from_exp_ms() {
        let codec = codec(Duration::from_millis(1500));
        let token = codec.issue("owner").unwrap();
        let payload = token.split('.').nth(1).unwrap();
        let claims: AccessClaims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload).unwrap()).unwrap();

        assert!(claims.exp * 1000 >= claims.exp_ms);
        assert!(claims.exp * 1000 - claims.exp_ms < 1000);
    }

    #[test]
    fn elapsed_ttl_reports_expired_not_signature() {
        let codec = codec(Duration::from_millis(1));
        let token = codec.issue("owner").unwrap();

        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(codec.verify(&token), Err(TokenError::Expired));
    }

    #[test]
    fn garbage_is_malformed() {
        let codec = codec(Duration::from_secs(60));
        assert_eq!(codec.verify("garbage"), Err(TokenError::Malformed));
        assert_eq!(codec.verify(""), Err(TokenError::Malformed));
    }

    #[test]
    fn foreign_secret_is_signature_invalid() {
        let other = TokenCodec::new(b"another-secret-that-is-also-32-bytes-long", Duration::from_secs(60));
        let token = other.issue("owner").unwrap();

        assert_eq!(codec(Duration::from_secs(60)).verify(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn tampered_payload_is_signature_invalid() {
        let codec = codec(Duration::from_secs(60));
        let token = codec.issue("owner").unwrap();
        let parts: Vec<&str> = token.split('.').collect();

        let forged_claims = format!(r#"{{"sub":"intruder","iat":0,"exp":{},"exp_ms":{}}}"#, i64::MAX / 1000, i64::MAX);
        let forged = format!(
            "{}.{}.{}",
            parts[0],
            URL_SAFE_NO_PAD.encode(forged_claims.as_bytes()),
            parts[2]
        );

        assert_eq!(codec.verify(&forged), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn forged_and_expired_is_signature_invalid() {
        let other = TokenCodec::new(b"another-secret-that-is-also-32-bytes-long", Duration::from_millis(1));
        let token = other.issue("owner").unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(codec(Duration::from_secs(60)).verify(&token), Err(TokenError::SignatureInvalid));
    }

    #[test]
    fn is_valid_requires_matching_subject() {
        let codec = codec(Duration::from_secs(60));
        let token = codec.issue("owner").unwrap();

        assert!(codec.is_valid(&token, "owner"));
        assert!(!codec.is_valid(&token, "someone-else"));
        assert!(!codec.is_valid("garbage", "owner"));
    }

    #[test]
    fn is_valid_rejects_expired_token() {
        let codec = codec(Duration::from_millis(1));
        let token = codec.issue("owner").unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert!(!codec.is_valid(&token, "owner"));
    }
}
