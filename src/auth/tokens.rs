/// Token issuer: signed bearer credentials, independent of storage
///
/// Mints HS256 JWTs encoding account id, role and validity window. The
/// signing key and the per-role TTL table are constructor parameters rather
/// than ambient lookups, so tests can run with fixed keys and clocks.
use crate::auth::expiry::{expiry_from, resolve_duration_ms};
use crate::config::TokenTtlConfig;
use crate::db::models::{Account, Role, TokenKind};
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Claims carried by every issued credential
///
/// `iat_ms` carries sub-second issuance precision; two tokens minted for the
/// same claims in the same second still differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    pub sub: String,
    pub role: Role,
    pub kind: TokenKind,
    pub iat: i64,
    pub iat_ms: i64,
    pub exp: i64,
}

/// A minted credential together with its validity window
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

/// Signs and verifies bearer credentials
pub struct TokenIssuer {
    signing_key: String,
    ttl: TokenTtlConfig,
}

impl TokenIssuer {
    pub fn new(signing_key: String, ttl: TokenTtlConfig) -> Self {
        Self { signing_key, ttl }
    }

    /// TTL spec for a (role, kind) pair. Administrators have no refresh
    /// entry: no silent renewal for the highest-privilege role.
    fn ttl_spec(&self, role: Role, kind: TokenKind) -> ApiResult<&str> {
        match (role, kind) {
            (Role::Patient, TokenKind::Access) => Ok(&self.ttl.patient_access),
            (Role::Patient, TokenKind::Refresh) => Ok(&self.ttl.patient_refresh),
            (Role::Clinician, TokenKind::Access) => Ok(&self.ttl.clinician_access),
            (Role::Clinician, TokenKind::Refresh) => Ok(&self.ttl.clinician_refresh),
            (Role::Admin, TokenKind::Access) => Ok(&self.ttl.admin_access),
            (Role::Admin, TokenKind::Refresh) => Err(ApiError::Internal(
                "Refresh tokens are not issued for administrators".to_string(),
            )),
        }
    }

    fn issue(&self, account: &Account, kind: TokenKind, now: DateTime<Utc>) -> ApiResult<IssuedToken> {
        let spec = self.ttl_spec(account.role, kind)?;
        let expires_at = expiry_from(now, spec)?;

        let claims = TokenClaims {
            sub: account.id.clone(),
            role: account.role,
            kind,
            iat: now.timestamp(),
            iat_ms: now.timestamp_millis(),
            exp: expires_at.timestamp(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.signing_key.as_bytes()),
        )
        .map_err(|e| ApiError::Jwt(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            kind,
            expires_at,
        })
    }

    /// Mint a short-lived access token
    pub fn issue_access(&self, account: &Account, now: DateTime<Utc>) -> ApiResult<IssuedToken> {
        self.issue(account, TokenKind::Access, now)
    }

    /// Mint a refresh token. Errors for administrator accounts.
    pub fn issue_refresh(&self, account: &Account, now: DateTime<Utc>) -> ApiResult<IssuedToken> {
        self.issue(account, TokenKind::Refresh, now)
    }

    /// Access-token lifetime in seconds, for the `expiresIn` response field
    pub fn access_ttl_secs(&self, role: Role) -> ApiResult<i64> {
        Ok(resolve_duration_ms(self.ttl_spec(role, TokenKind::Access)?)? / 1000)
    }

    /// Verify a token's signature and expiry, returning its claims
    ///
    /// Uses the same key material as issuance. Protected routes go through
    /// this; the persisted fingerprint ledger plays no part in the decision.
    pub fn verify(&self, token: &str) -> ApiResult<TokenClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Allow some clock skew (5 minutes)
        validation.leeway = 300;

        let data = decode::<TokenClaims>(
            token,
            &DecodingKey::from_secret(self.signing_key.as_bytes()),
            &validation,
        )
        .map_err(|e| match e.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                ApiError::Authentication("Token has expired".to_string())
            }
            jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                ApiError::Authentication("Invalid token signature".to_string())
            }
            _ => ApiError::Authentication(format!("Invalid token: {}", e)),
        })?;

        Ok(data.claims)
    }
}
