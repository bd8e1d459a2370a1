/// Authentication endpoints
use crate::{
    auth::login::{AccountSnapshot, OtcLoginResult, TokenGrant},
    auth::AuthContext,
    context::AppContext,
    error::{ApiError, ApiResult},
};
use axum::{
    extract::{ConnectInfo, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use validator::Validate;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/auth/request-code", post(request_code))
        .route("/auth/verify-code", post(verify_code))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .route("/auth/me", get(me))
}

/// Password login request (clinicians and administrators)
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// Session metadata echoed back with a successful login
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    pub timestamp: DateTime<Utc>,
    pub client_addr: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub grant: TokenGrant,
    pub account: AccountSnapshot,
    pub session: SessionMeta,
}

/// Password login endpoint
async fn login(
    State(ctx): State<AppContext>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let success = ctx.login.password_login(&req.email, &req.password).await?;
    let timestamp = success.grant.issued_at;

    Ok(Json(LoginResponse {
        grant: success.grant,
        account: success.account,
        session: SessionMeta {
            timestamp,
            client_addr: addr.to_string(),
        },
    }))
}

/// Code delivery request
#[derive(Debug, Deserialize, Validate)]
pub struct RequestCodeRequest {
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestCodeResponse {
    pub sent: bool,
}

/// Mint and store a one-time code for a phone number
///
/// The SMS channel that delivers the code is an external collaborator; here
/// the code only reaches the debug log.
async fn request_code(
    State(ctx): State<AppContext>,
    Json(req): Json<RequestCodeRequest>,
) -> ApiResult<Json<RequestCodeResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let code = ctx
        .otc_store
        .issue(&req.phone, &ctx.config.authentication.otc_ttl)
        .await?;

    tracing::debug!(phone = %req.phone, code = %code, "Issued one-time code");

    Ok(Json(RequestCodeResponse { sent: true }))
}

/// Code verification request
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyCodeRequest {
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(equal = 4))]
    pub code: String,
}

/// One of three response shapes for the code entry point
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VerifyCodeResponse {
    #[serde(rename_all = "camelCase")]
    PatientLogin {
        #[serde(flatten)]
        grant: TokenGrant,
        account: AccountSnapshot,
    },
    #[serde(rename_all = "camelCase")]
    VerificationOnly { user_exists: bool, next: &'static str },
}

/// Code verification endpoint
async fn verify_code(
    State(ctx): State<AppContext>,
    Json(req): Json<VerifyCodeRequest>,
) -> ApiResult<Json<VerifyCodeResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let response = match ctx.login.verify_code_login(&req.phone, &req.code).await? {
        OtcLoginResult::PatientLogin { grant, account } => {
            VerifyCodeResponse::PatientLogin { grant, account }
        }
        OtcLoginResult::VerificationOnly { user_exists } => VerifyCodeResponse::VerificationOnly {
            user_exists,
            next: if user_exists {
                "/auth/login"
            } else {
                "/auth/register"
            },
        },
    };

    Ok(Json(response))
}

/// Patient registration request: a fresh code proves phone ownership
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    #[validate(length(min = 8, max = 20))]
    pub phone: String,
    #[validate(length(equal = 4))]
    pub code: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterResponse {
    #[serde(flatten)]
    pub grant: TokenGrant,
    pub account: AccountSnapshot,
}

/// Patient registration endpoint
async fn register(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    req.validate()
        .map_err(|e| ApiError::Validation(e.to_string()))?;

    let (grant, account) = ctx
        .login
        .register_patient(&req.phone, &req.code, req.first_name, req.last_name, req.email)
        .await?;

    Ok(Json(RegisterResponse { grant, account }))
}

/// Authenticated account snapshot
async fn me(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> ApiResult<Json<AccountSnapshot>> {
    let account = ctx.account_manager.get_account(&auth.account_id).await?;

    Ok(Json(AccountSnapshot::from(&account)))
}
