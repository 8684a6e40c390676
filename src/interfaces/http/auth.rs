//! Bearer-token purchaser authentication.
//!
//! Tokens look like `{account_id}.{hex(HMAC_SHA256(secret, account_id))}`. They
//! are minted by the identity service; this crate only checks them.

use super::AppState;
use crate::domain::ids::AccountId;
use crate::error::{EnrollmentError, Result};
use crate::infrastructure::signing::{hmac_sha256_hex, verify_hmac_sha256_hex};
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

pub struct TokenAuthenticator {
    secret: String,
}

impl TokenAuthenticator {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    pub fn issue(&self, account: &AccountId) -> String {
        format!(
            "{account}.{}",
            hmac_sha256_hex(self.secret.as_bytes(), account.as_str().as_bytes())
        )
    }

    pub fn verify(&self, token: &str) -> Result<AccountId> {
        let (account, signature) = token
            .rsplit_once('.')
            .filter(|(account, _)| !account.is_empty())
            .ok_or_else(|| EnrollmentError::Unauthorized("Malformed token".to_string()))?;
        if !verify_hmac_sha256_hex(self.secret.as_bytes(), account.as_bytes(), signature) {
            return Err(EnrollmentError::Unauthorized("Invalid token".to_string()));
        }
        Ok(AccountId::new(account))
    }
}

/// The authenticated account making the request.
#[derive(Debug, Clone, PartialEq)]
pub struct Purchaser(pub AccountId);

impl FromRequestParts<AppState> for Purchaser {
    type Rejection = EnrollmentError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> std::result::Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or_else(|| EnrollmentError::Unauthorized("Missing bearer token".to_string()))?;
        state.auth.verify(token.trim()).map(Purchaser)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issued_token_verifies() {
        let auth = TokenAuthenticator::new("secret");
        let token = auth.issue(&"u1".into());
        assert_eq!(auth.verify(&token).unwrap(), AccountId::from("u1"));
    }

    #[test]
    fn test_forged_tokens_are_rejected() {
        let auth = TokenAuthenticator::new("secret");
        let other = TokenAuthenticator::new("other");

        let token = other.issue(&"u1".into());
        assert!(matches!(auth.verify(&token), Err(EnrollmentError::Unauthorized(_))));

        let valid = auth.issue(&"u1".into());
        let (_, signature) = valid.rsplit_once('.').unwrap();
        assert!(auth.verify(&format!("u2.{signature}")).is_err());
        assert!(auth.verify("no-dot").is_err());
        assert!(auth.verify(&format!(".{signature}")).is_err());
    }
}
