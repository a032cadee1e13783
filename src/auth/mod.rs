//! JWT-backed verification for the optional auth layer: off by default,
//! enabled by `AUTH_REQUIRED`. Produces the [`AuthClaims`]
//! the tenant policy gates in [`crate::tenant::policy`] consume.

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use crate::config::AuthConfig;
use crate::domain::errors::{DomainError, DomainResult};
use crate::tenant::policy::AuthClaims;

/// Raw JWT claims this engine expects a token to carry: a subject, an
/// optional tenant scope, and role strings mapped to the two gates spec
/// §4.6 names (`enqueue_jobs`, `queue_admin`).
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawClaims {
    sub: String,
    tenant: Option<String>,
    #[serde(default)]
    roles: Vec<String>,
    exp: i64,
}

pub struct JwtVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn from_config(config: &AuthConfig) -> DomainResult<Self> {
        let secret = config
            .auth_jwt_secret
            .as_deref()
            .ok_or_else(|| DomainError::UsageError("AUTH_JWT_SECRET is required when AUTH_REQUIRED is set".into()))?;

        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &config.auth_issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &config.auth_audience {
            validation.set_audience(&[audience]);
        }

        Ok(Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        })
    }

    /// Verify `token` and translate it into [`AuthClaims`]. Unlike
    /// `AuthClaims::anonymous`, a verified token must explicitly carry the
    /// `enqueue_jobs`/`queue_admin` roles to get those permissions.
    pub fn verify(&self, token: &str) -> DomainResult<AuthClaims> {
        let data = decode::<RawClaims>(token, &self.decoding_key, &self.validation)
            .map_err(|e| DomainError::PermissionDenied(format!("invalid auth token: {e}")))?;
        let claims = data.claims;
        Ok(AuthClaims {
            subject: claims.sub,
            tenant: claims.tenant,
            can_enqueue: claims.roles.iter().any(|r| r == "enqueue_jobs"),
            can_administer: claims.roles.iter().any(|r| r == "queue_admin"),
        })
    }
}

/// Resolve the effective identity for a request: verified claims when
/// `auth_required` is on, [`AuthClaims::anonymous`] otherwise.
pub fn resolve_identity(config: &AuthConfig, token: Option<&str>) -> DomainResult<AuthClaims> {
    if !config.auth_required {
        return Ok(AuthClaims::anonymous());
    }
    let verifier = JwtVerifier::from_config(config)?;
    let token = token.ok_or_else(|| DomainError::PermissionDenied("AUTH_REQUIRED is set but no token was provided".into()))?;
    verifier.verify(token)
}
