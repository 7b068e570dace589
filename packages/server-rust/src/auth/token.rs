//! Bearer-token capability consumed by the authentication layer.
//!
//! The pipeline treats tokens as opaque beyond this surface: claim
//! extraction for routing the tenant binding, and validity against a
//! loaded identity snapshot. Signature scheme is HS256 with a shared
//! secret; the cryptographic design of the format itself is not this
//! module's concern.

use std::time::Duration;

use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use campus_core::{TenantId, UserRecord};
use jsonwebtoken::{
    decode, encode, get_current_timestamp, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Token signing configuration.
#[derive(Debug, Clone)]
pub struct TokenConfig {
    /// HS256 shared secret.
    pub secret: String,
    /// Lifetime of issued tokens.
    pub ttl: Duration,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            secret: "campus-dev-secret-change-me".to_string(),
            ttl: Duration::from_secs(60 * 60),
        }
    }
}

/// Claim set carried by Campus bearer tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Login subject the token was issued for.
    pub sub: String,
    /// Tenant scope claim. Absent for platform-level tokens.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub iat: u64,
    pub exp: u64,
}

/// Error issuing a token.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    #[error("failed to sign token")]
    Signing(#[from] jsonwebtoken::errors::Error),
}

/// Verifies and decodes bearer tokens.
pub struct TokenService {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenService {
    #[must_use]
    pub fn new(config: &TokenConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        // No clock leeway: an expired token is expired.
        validation.leeway = 0;
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            validation,
            ttl: config.ttl,
        }
    }

    /// Issues a signed token for `subject`, optionally scoped to a tenant.
    ///
    /// # Errors
    ///
    /// Fails when the claim set cannot be serialized and signed.
    pub fn issue(
        &self,
        subject: &str,
        tenant: Option<&TenantId>,
        roles: &[String],
    ) -> Result<String, TokenError> {
        let now = get_current_timestamp();
        let claims = Claims {
            sub: subject.to_string(),
            tenant: tenant.map(|t| t.as_str().to_string()),
            roles: roles.to_vec(),
            iat: now,
            exp: now + self.ttl.as_secs(),
        };
        Ok(encode(&Header::default(), &claims, &self.encoding)?)
    }

    /// Decodes and verifies a token, returning its claims.
    ///
    /// Any failure (bad signature, expired, malformed) yields `None`; the
    /// caller treats the request as anonymous rather than erroring.
    #[must_use]
    pub fn decode(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(err) => {
                debug!(error = %err, "token rejected");
                None
            }
        }
    }

    /// Extracts the subject claim, `None` for any invalid token.
    #[must_use]
    pub fn extract_subject(&self, token: &str) -> Option<String> {
        self.decode(token).map(|claims| claims.sub)
    }

    /// Extracts the tenant claim, `None` when absent or the token is invalid.
    #[must_use]
    pub fn extract_tenant_claim(&self, token: &str) -> Option<TenantId> {
        self.decode(token)?.tenant.map(TenantId::from)
    }

    /// Whether the token is valid against the loaded identity snapshot:
    /// signature and expiry check out and the subject matches.
    #[must_use]
    pub fn is_valid(&self, token: &str, user: &UserRecord) -> bool {
        self.decode(token)
            .is_some_and(|claims| claims.sub == user.subject)
    }
}

/// Extracts the token of a bearer-scheme `Authorization` header.
///
/// Returns `None` for a missing header, a different scheme, or an empty
/// token, leaving the request anonymous.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;
    use campus_core::AccountStatus;

    use super::*;

    fn service() -> TokenService {
        TokenService::new(&TokenConfig::default())
    }

    fn user(subject: &str) -> UserRecord {
        UserRecord {
            id: "u-1".to_string(),
            subject: subject.to_string(),
            tenant_id: Some(TenantId::new("tn-acme")),
            status: AccountStatus::Active,
            roles: vec![],
        }
    }

    #[test]
    fn issued_token_roundtrips_claims() {
        let svc = service();
        let token = svc
            .issue("alice@acme.test", Some(&TenantId::new("tn-acme")), &["teacher".to_string()])
            .unwrap();

        assert_eq!(svc.extract_subject(&token).as_deref(), Some("alice@acme.test"));
        assert_eq!(
            svc.extract_tenant_claim(&token),
            Some(TenantId::new("tn-acme"))
        );
        let claims = svc.decode(&token).unwrap();
        assert_eq!(claims.roles, vec!["teacher".to_string()]);
    }

    #[test]
    fn token_without_tenant_claim_has_no_tenant() {
        let svc = service();
        let token = svc.issue("root@platform", None, &[]).unwrap();
        assert_eq!(svc.extract_tenant_claim(&token), None);
        assert_eq!(svc.extract_subject(&token).as_deref(), Some("root@platform"));
    }

    #[test]
    fn wrong_secret_rejects_token() {
        let svc = service();
        let other = TokenService::new(&TokenConfig {
            secret: "a-completely-different-secret".to_string(),
            ..TokenConfig::default()
        });

        let token = other.issue("alice@acme.test", None, &[]).unwrap();
        assert!(svc.decode(&token).is_none());
        assert!(svc.extract_subject(&token).is_none());
        assert!(!svc.is_valid(&token, &user("alice@acme.test")));
    }

    #[test]
    fn expired_token_is_rejected() {
        let svc = service();
        let now = get_current_timestamp();
        let claims = Claims {
            sub: "alice@acme.test".to_string(),
            tenant: None,
            roles: vec![],
            iat: now - 120,
            exp: now - 60,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(TokenConfig::default().secret.as_bytes()),
        )
        .unwrap();

        assert!(svc.decode(&token).is_none());
        assert!(!svc.is_valid(&token, &user("alice@acme.test")));
    }

    #[test]
    fn validity_requires_matching_subject() {
        let svc = service();
        let token = svc.issue("alice@acme.test", None, &[]).unwrap();
        assert!(svc.is_valid(&token, &user("alice@acme.test")));
        assert!(!svc.is_valid(&token, &user("mallory@acme.test")));
    }

    #[test]
    fn garbage_token_is_silently_invalid() {
        let svc = service();
        assert!(svc.decode("not-a-token").is_none());
        assert!(svc.extract_tenant_claim("a.b.c").is_none());
    }

    #[test]
    fn bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers), Some("abc.def.ghi"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("bearer abc"));
        assert_eq!(bearer_token(&headers), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwdw=="));
        assert_eq!(bearer_token(&headers), None);

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&headers), None);
    }
}
