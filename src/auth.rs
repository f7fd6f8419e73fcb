// Bearer-token identity: HMAC-signed claims with a 7-day expiry.
//
// Token wire format: base64url(claims-json) "." base64url(hmac-sha256(claims-json)).
// Validation is stateless; there is no server-side revocation list, so logout
// only discards the token client-side and it stays valid until expiry.

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::{FromRef, FromRequestParts};
use axum::http::header;
use axum::http::request::Parts;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use thiserror::Error;

use crate::error::ApiError;
use crate::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Token lifetime: 7 days, in milliseconds.
const TOKEN_TTL_MS: i64 = 7 * 24 * 60 * 60 * 1000;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("malformed token")]
    Malformed,

    #[error("bad token signature")]
    BadSignature,

    #[error("token expired")]
    Expired,
}

/// Identity claims embedded in a bearer token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthClaims {
    pub creator_id: String,
    pub email: String,
    pub username: String,
    /// Issued-at, epoch milliseconds.
    pub iat: i64,
    /// Expiry, epoch milliseconds.
    pub exp: i64,
}

pub struct TokenSigner {
    secret: Vec<u8>,
}

impl TokenSigner {
    pub fn new(secret: impl Into<Vec<u8>>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    fn mac(&self, payload: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(&self.secret)
            .expect("hmac accepts any key length");
        mac.update(payload);
        mac
    }

    pub fn issue(&self, creator_id: &str, email: &str, username: &str) -> String {
        self.issue_at(creator_id, email, username, Utc::now().timestamp_millis())
    }

    fn issue_at(&self, creator_id: &str, email: &str, username: &str, now_ms: i64) -> String {
        let claims = AuthClaims {
            creator_id: creator_id.to_string(),
            email: email.to_string(),
            username: username.to_string(),
            iat: now_ms,
            exp: now_ms + TOKEN_TTL_MS,
        };
        let payload = serde_json::to_vec(&claims).expect("claims always serialize");
        let tag = self.mac(&payload).finalize().into_bytes();
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(&payload),
            URL_SAFE_NO_PAD.encode(tag)
        )
    }

    pub fn validate(&self, token: &str) -> Result<AuthClaims, AuthError> {
        self.validate_at(token, Utc::now().timestamp_millis())
    }

    fn validate_at(&self, token: &str, now_ms: i64) -> Result<AuthClaims, AuthError> {
        let (payload_b64, tag_b64) = token.split_once('.').ok_or(AuthError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| AuthError::Malformed)?;
        let tag = URL_SAFE_NO_PAD
            .decode(tag_b64)
            .map_err(|_| AuthError::Malformed)?;

        self.mac(&payload)
            .verify_slice(&tag)
            .map_err(|_| AuthError::BadSignature)?;

        let claims: AuthClaims =
            serde_json::from_slice(&payload).map_err(|_| AuthError::Malformed)?;
        if claims.exp < now_ms {
            return Err(AuthError::Expired);
        }
        Ok(claims)
    }
}

/// Authenticated-route gate: extracts and validates the bearer token, making
/// the decoded claims available as a handler argument.
#[async_trait]
impl<S> FromRequestParts<S> for AuthClaims
where
    S: Send + Sync,
    Arc<AppState>: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = Arc::<AppState>::from_ref(state);

        let header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default();
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;

        state
            .auth
            .validate(token)
            .map_err(|_| ApiError::unauthorized("Invalid or expired session"))
    }
}

/// Pulls the bearer token out of an authorization header value, if present.
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    header.and_then(|h| h.strip_prefix("Bearer "))
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY_MS: i64 = 24 * 60 * 60 * 1000;

    fn signer() -> TokenSigner {
        TokenSigner::new(*b"test-secret-test-secret-test-sec")
    }

    #[test]
    fn roundtrip_preserves_claims() {
        let signer = signer();
        let token = signer.issue("c1", "a@x.com", "alice");
        let claims = signer.validate(&token).unwrap();
        assert_eq!(claims.creator_id, "c1");
        assert_eq!(claims.email, "a@x.com");
        assert_eq!(claims.username, "alice");
        assert_eq!(claims.exp - claims.iat, TOKEN_TTL_MS);
    }

    #[test]
    fn valid_at_six_days_expired_at_eight() {
        let signer = signer();
        let issued = 1_700_000_000_000;
        let token = signer.issue_at("c1", "a@x.com", "alice", issued);

        assert!(signer.validate_at(&token, issued + 6 * DAY_MS).is_ok());
        assert!(matches!(
            signer.validate_at(&token, issued + 8 * DAY_MS),
            Err(AuthError::Expired)
        ));
    }

    #[test]
    fn forged_claims_are_rejected() {
        let signer = signer();
        let token = signer.issue("c1", "a@x.com", "alice");
        let (_, tag) = token.split_once('.').unwrap();

        // Re-encode different claims under the original tag.
        let forged_claims = serde_json::json!({
            "creatorId": "someone-else",
            "email": "evil@x.com",
            "username": "mallory",
            "iat": 0,
            "exp": i64::MAX,
        });
        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(forged_claims.to_string()),
            tag
        );
        assert!(matches!(
            signer.validate(&forged),
            Err(AuthError::BadSignature)
        ));
    }

    #[test]
    fn other_secret_cannot_mint_tokens() {
        let token = TokenSigner::new(*b"another-secret..................").issue(
            "c1",
            "a@x.com",
            "alice",
        );
        assert!(signer().validate(&token).is_err());
    }

    #[test]
    fn garbage_tokens_are_malformed() {
        assert!(matches!(
            signer().validate("not-a-token"),
            Err(AuthError::Malformed)
        ));
        assert!(matches!(
            signer().validate("!!!.???"),
            Err(AuthError::Malformed)
        ));
    }

    #[test]
    fn bearer_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc")), Some("abc"));
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(None), None);
    }
}
