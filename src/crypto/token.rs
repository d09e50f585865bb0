//! Signed session tokens.
//!
//! Format: `base64url(header).base64url(claims).base64url(hmac_sha256)`,
//! the compact JWT layout with a fixed `HS256` header. Only tokens minted
//! by this server with the configured secret are accepted.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use uuid::Uuid;

use super::CryptoError;
use crate::config::SigningSecret;
use crate::models::{Role, User};

type HmacSha256 = Hmac<Sha256>;

/// `{"alg":"HS256","typ":"JWT"}`, pre-encoded.
const HEADER_B64: &str = "eyJhbGciOiJIUzI1NiIsInR5cCI6IkpXVCJ9";

/// Identity carried by a session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

/// Mints and verifies session tokens with one signing secret.
#[derive(Clone)]
pub struct TokenIssuer {
    secret: SigningSecret,
    ttl_secs: i64,
}

impl TokenIssuer {
    pub fn new(secret: SigningSecret, ttl_secs: i64) -> Self {
        Self { secret, ttl_secs }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl_secs
    }

    fn sign(&self, message: &str) -> Result<Vec<u8>, CryptoError> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| CryptoError::Encoding(e.to_string()))?;
        mac.update(message.as_bytes());
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Issue a token for `user` valid from now for the configured TTL.
    pub fn issue(&self, user: &User) -> Result<String, CryptoError> {
        self.issue_at(user, Utc::now().timestamp())
    }

    pub(crate) fn issue_at(&self, user: &User, now: i64) -> Result<String, CryptoError> {
        let claims = TokenClaims {
            sub: user.id,
            email: user.email.clone(),
            role: user.role,
            iat: now,
            exp: now + self.ttl_secs,
        };
        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| CryptoError::Encoding(e.to_string()))?;
        let message = format!("{HEADER_B64}.{}", URL_SAFE_NO_PAD.encode(claims_json));
        let signature = self.sign(&message)?;
        Ok(format!("{message}.{}", URL_SAFE_NO_PAD.encode(signature)))
    }

    /// Verify signature and expiry, returning the claims.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, CryptoError> {
        self.verify_at(token, Utc::now().timestamp())
    }

    pub(crate) fn verify_at(&self, token: &str, now: i64) -> Result<TokenClaims, CryptoError> {
        let mut parts = token.split('.');
        let (Some(header), Some(claims_b64), Some(signature_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(CryptoError::InvalidToken);
        };
        if header != HEADER_B64 {
            return Err(CryptoError::InvalidToken);
        }

        let provided = URL_SAFE_NO_PAD
            .decode(signature_b64)
            .map_err(|_| CryptoError::InvalidToken)?;
        let expected = self.sign(&format!("{header}.{claims_b64}"))?;
        if expected[..].ct_eq(&provided[..]).unwrap_u8() == 0 {
            return Err(CryptoError::InvalidToken);
        }

        let claims_json = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| CryptoError::InvalidToken)?;
        let claims: TokenClaims =
            serde_json::from_slice(&claims_json).map_err(|_| CryptoError::InvalidToken)?;

        if claims.exp <= now {
            return Err(CryptoError::TokenExpired);
        }
        Ok(claims)
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl_secs)
            .finish_non_exhaustive()
    }
}
