/// Authentication subsystem: hashing, expiry, one-time codes, token
/// issuance, the persistence ledger, and the login orchestrator.

pub mod expiry;
pub mod hashing;
pub mod ledger;
pub mod login;
pub mod otc;
pub mod tokens;

use crate::{api::middleware::extract_bearer_token, context::AppContext, error::ApiError};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

pub use tokens::{TokenClaims, TokenIssuer};

/// Authenticated context - extracts and verifies the bearer token
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account_id: String,
    pub claims: TokenClaims,
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| ApiError::Authentication("Missing authorization header".to_string()))?;

        let claims = state.token_issuer.verify(&token)?;

        Ok(AuthContext {
            account_id: claims.sub.clone(),
            claims,
        })
    }
}
