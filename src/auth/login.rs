/// Login orchestrator
///
/// Composes credential verification, one-time-code verification, token
/// issuance and the persistence ledger behind the two entry points: password
/// login for staff and code verification for patients.
///
/// The flow is two-phase. Gating is a pure decision over closed enums, so
/// every reachable outcome is enumerable; side effects (ledger writes) are
/// committed afterwards and cannot change an already-decided response.
use crate::account::AccountManager;
use crate::auth::hashing::verify_secret;
use crate::auth::ledger::TokenLedger;
use crate::auth::otc::{OtcOutcome, OtcStore};
use crate::auth::tokens::TokenIssuer;
use crate::db::models::{Account, AccountStatus, ClinicianProfile, Role, ValidationStatus};
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Plaintext tokens returned to the client exactly once
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGrant {
    pub access_token: String,
    /// Absent for administrators
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Access-token lifetime in seconds
    pub expires_in: i64,
    pub issued_at: DateTime<Utc>,
}

/// Public snapshot of account fields, returned alongside tokens
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSnapshot {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub role: Role,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

impl From<&Account> for AccountSnapshot {
    fn from(account: &Account) -> Self {
        AccountSnapshot {
            id: account.id.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            role: account.role,
            first_name: account.first_name.clone(),
            last_name: account.last_name.clone(),
        }
    }
}

/// Successful password login
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordLoginSuccess {
    #[serde(flatten)]
    pub grant: TokenGrant,
    pub account: AccountSnapshot,
}

/// Result of the one-time-code entry point
#[derive(Debug, Clone)]
pub enum OtcLoginResult {
    /// Active patient: tokens plus a profile snapshot
    PatientLogin {
        grant: TokenGrant,
        account: AccountSnapshot,
    },
    /// Phone ownership confirmed, no credentials issued. `user_exists`
    /// distinguishes "proceed to registration" from "existing staff account,
    /// use the password endpoint".
    VerificationOnly { user_exists: bool },
}

/// Pure gating decision for an account whose primary factor has already been
/// proven (password verified, or phone ownership confirmed).
///
/// Expressed as one match over (role, status, validation status) so the
/// whole decision table is visible and testable in one place.
pub(crate) fn gate_verified_account(
    account: &Account,
    profile: Option<&ClinicianProfile>,
) -> ApiResult<()> {
    let validation = profile.map(|p| p.validation_status);

    match (account.role, account.status, validation) {
        // Status gate applies to every role before anything else
        (_, AccountStatus::Suspended, _) | (_, AccountStatus::Inactive, _) => {
            Err(ApiError::AccountSuspended(account.status))
        }

        // Clinicians additionally pass the profile review gate
        (Role::Clinician, AccountStatus::Active, None) => {
            Err(ApiError::ProfileMissing(account.id.clone()))
        }
        (Role::Clinician, AccountStatus::Active, Some(ValidationStatus::Pending)) => {
            Err(ApiError::ValidationPending)
        }
        (Role::Clinician, AccountStatus::Active, Some(ValidationStatus::Rejected)) => Err(
            ApiError::ValidationRejected(profile.and_then(|p| p.rejection_reason.clone())),
        ),
        (Role::Clinician, AccountStatus::Active, Some(ValidationStatus::Approved)) => Ok(()),

        (Role::Patient, AccountStatus::Active, _) => Ok(()),
        (Role::Admin, AccountStatus::Active, _) => Ok(()),
    }
}

pub struct LoginOrchestrator {
    accounts: Arc<AccountManager>,
    otc: Arc<OtcStore>,
    issuer: Arc<TokenIssuer>,
    ledger: Arc<TokenLedger>,
}

impl LoginOrchestrator {
    pub fn new(
        accounts: Arc<AccountManager>,
        otc: Arc<OtcStore>,
        issuer: Arc<TokenIssuer>,
        ledger: Arc<TokenLedger>,
    ) -> Self {
        Self {
            accounts,
            otc,
            issuer,
            ledger,
        }
    }

    /// Password entry point, for clinician and administrator roles
    pub async fn password_login(
        &self,
        email: &str,
        password: &str,
    ) -> ApiResult<PasswordLoginSuccess> {
        // Not-found and bad-password are indistinguishable on purpose
        let account = self
            .accounts
            .find_by_email(email)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        // Role check comes before password verification: patients get
        // WrongAuthMethod regardless of password correctness.
        if account.role == Role::Patient {
            return Err(ApiError::WrongAuthMethod);
        }

        let hash = account
            .password_hash
            .as_deref()
            .ok_or(ApiError::InvalidCredentials)?;

        if !verify_secret(password, hash) {
            return Err(ApiError::InvalidCredentials);
        }

        let profile = if account.role == Role::Clinician {
            self.accounts.clinician_profile(&account.id).await?
        } else {
            None
        };

        gate_verified_account(&account, profile.as_ref())?;

        let grant = self.grant_tokens(&account).await?;

        tracing::info!(account_id = %account.id, role = account.role.as_str(), "Password login succeeded");

        Ok(PasswordLoginSuccess {
            grant,
            account: AccountSnapshot::from(&account),
        })
    }

    /// One-time-code entry point
    ///
    /// Code verification happens first; on failure no account lookup occurs.
    /// Tokens are only ever issued for patient accounts on this path.
    pub async fn verify_code_login(&self, phone: &str, code: &str) -> ApiResult<OtcLoginResult> {
        match self.otc.verify(phone, code).await? {
            OtcOutcome::Invalid => return Err(ApiError::OtpInvalid),
            OtcOutcome::Expired => return Err(ApiError::OtpExpired),
            OtcOutcome::Verified => {}
        }

        let phone = OtcStore::normalize_phone(phone);
        let Some(account) = self.accounts.find_by_phone(&phone).await? else {
            // Phone confirmed, no account yet: caller proceeds to registration
            return Ok(OtcLoginResult::VerificationOnly { user_exists: false });
        };

        match account.role {
            Role::Patient => {
                gate_verified_account(&account, None)?;

                let grant = self.grant_tokens(&account).await?;

                tracing::info!(account_id = %account.id, "Patient code login succeeded");

                Ok(OtcLoginResult::PatientLogin {
                    grant,
                    account: AccountSnapshot::from(&account),
                })
            }
            // Staff phone ownership is confirmed, but this path never
            // issues their tokens; point them at the password endpoint.
            Role::Clinician | Role::Admin => {
                Ok(OtcLoginResult::VerificationOnly { user_exists: true })
            }
        }
    }

    /// Patient registration: a code proves phone ownership, then the account
    /// is created and logged in, in one step.
    pub async fn register_patient(
        &self,
        phone: &str,
        code: &str,
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<String>,
    ) -> ApiResult<(TokenGrant, AccountSnapshot)> {
        match self.otc.verify(phone, code).await? {
            OtcOutcome::Invalid => return Err(ApiError::OtpInvalid),
            OtcOutcome::Expired => return Err(ApiError::OtpExpired),
            OtcOutcome::Verified => {}
        }

        let phone = OtcStore::normalize_phone(phone);
        let account = self
            .accounts
            .create_patient(&phone, first_name, last_name, email)
            .await?;

        let grant = self.grant_tokens(&account).await?;

        Ok((grant, AccountSnapshot::from(&account)))
    }

    /// Commit phase: mint tokens, then best-effort ledger write
    async fn grant_tokens(&self, account: &Account) -> ApiResult<TokenGrant> {
        let now = Utc::now();

        let access = self.issuer.issue_access(account, now)?;
        let refresh = if account.role == Role::Admin {
            None
        } else {
            Some(self.issuer.issue_refresh(account, now)?)
        };

        let mut issued = vec![access.clone()];
        if let Some(r) = &refresh {
            issued.push(r.clone());
        }
        self.ledger.record_issued(&account.id, &issued).await;

        Ok(TokenGrant {
            access_token: access.token,
            refresh_token: refresh.map(|r| r.token),
            expires_in: self.issuer.access_ttl_secs(account.role)?,
            issued_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::testing::{insert_account, insert_profile, setup_db};
    use crate::auth::hashing::hash_secret;
    use crate::config::ServerConfig;
    use chrono::Duration;
    use sqlx::SqlitePool;
    use uuid::Uuid;

    fn orchestrator(db: &SqlitePool) -> LoginOrchestrator {
        let config = ServerConfig::for_tests();
        LoginOrchestrator::new(
            Arc::new(AccountManager::new(db.clone())),
            Arc::new(OtcStore::new(db.clone())),
            Arc::new(TokenIssuer::new(
                config.authentication.jwt_secret,
                config.authentication.token_ttl,
            )),
            Arc::new(TokenLedger::new(db.clone())),
        )
    }

    async fn insert_otc(db: &SqlitePool, phone: &str, code: &str, minutes_from_now: i64) {
        sqlx::query(
            "INSERT INTO one_time_code (id, phone, code, expires_at, consumed, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(phone)
        .bind(code)
        .bind(Utc::now() + Duration::minutes(minutes_from_now))
        .bind(Utc::now())
        .execute(db)
        .await
        .unwrap();
    }

    async fn ledger_count(db: &SqlitePool) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM session_token")
            .fetch_one(db)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_approved_clinician_password_login() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "doc-1", Some("doc@x.ci"), None, Some(&hash), Role::Clinician, AccountStatus::Active).await;
        insert_profile(&db, "doc-1", ValidationStatus::Approved, None).await;
        let orch = orchestrator(&db);

        let success = orch.password_login("doc@x.ci", "P").await.unwrap();
        assert!(!success.grant.access_token.is_empty());
        assert!(success.grant.refresh_token.is_some());
        assert_eq!(success.account.role, Role::Clinician);

        // Fingerprints of both tokens recorded
        assert_eq!(ledger_count(&db).await, 2);

        // Wrong password: invalid credentials
        let result = orch.password_login("doc@x.ci", "wrongpass").await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_unknown_email_is_invalid_credentials() {
        let db = setup_db().await;
        let orch = orchestrator(&db);

        let result = orch.password_login("nobody@x.ci", "whatever").await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_email_lookup_is_normalized() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "doc-1", Some("doc@x.ci"), None, Some(&hash), Role::Clinician, AccountStatus::Active).await;
        insert_profile(&db, "doc-1", ValidationStatus::Approved, None).await;
        let orch = orchestrator(&db);

        assert!(orch.password_login("  DOC@X.CI ", "P").await.is_ok());
    }

    #[tokio::test]
    async fn test_patient_password_login_is_wrong_auth_method() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "pat-1", Some("pat@x.ci"), Some("0700000001"), Some(&hash), Role::Patient, AccountStatus::Active).await;
        let orch = orchestrator(&db);

        // Regardless of password correctness
        let result = orch.password_login("pat@x.ci", "P").await;
        assert!(matches!(result, Err(ApiError::WrongAuthMethod)));
        let result = orch.password_login("pat@x.ci", "nope").await;
        assert!(matches!(result, Err(ApiError::WrongAuthMethod)));
    }

    #[tokio::test]
    async fn test_missing_password_hash_is_invalid_credentials() {
        let db = setup_db().await;
        insert_account(&db, "doc-1", Some("doc@x.ci"), None, None, Role::Clinician, AccountStatus::Active).await;
        let orch = orchestrator(&db);

        let result = orch.password_login("doc@x.ci", "anything").await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_suspended_account_revealed_only_after_password_proof() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "doc-1", Some("doc@x.ci"), None, Some(&hash), Role::Clinician, AccountStatus::Suspended).await;
        insert_profile(&db, "doc-1", ValidationStatus::Approved, None).await;
        let orch = orchestrator(&db);

        // Correct password: status is revealed
        let result = orch.password_login("doc@x.ci", "P").await;
        assert!(matches!(result, Err(ApiError::AccountSuspended(AccountStatus::Suspended))));

        // Wrong password: still just invalid credentials
        let result = orch.password_login("doc@x.ci", "nope").await;
        assert!(matches!(result, Err(ApiError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_pending_clinician_gets_no_tokens_from_either_entry_point() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "doc-1", Some("doc@x.ci"), Some("0700000002"), Some(&hash), Role::Clinician, AccountStatus::Active).await;
        insert_profile(&db, "doc-1", ValidationStatus::Pending, None).await;
        insert_otc(&db, "0700000002", "1234", 5).await;
        let orch = orchestrator(&db);

        let result = orch.password_login("doc@x.ci", "P").await;
        assert!(matches!(result, Err(ApiError::ValidationPending)));

        // OTC path confirms the phone but never issues staff tokens
        let result = orch.verify_code_login("0700000002", "1234").await.unwrap();
        assert!(matches!(result, OtcLoginResult::VerificationOnly { user_exists: true }));

        assert_eq!(ledger_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_rejected_clinician_carries_reason() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "doc-1", Some("doc@x.ci"), None, Some(&hash), Role::Clinician, AccountStatus::Active).await;
        insert_profile(&db, "doc-1", ValidationStatus::Rejected, Some("incomplete dossier")).await;
        let orch = orchestrator(&db);

        match orch.password_login("doc@x.ci", "P").await {
            Err(ApiError::ValidationRejected(reason)) => {
                assert_eq!(reason.as_deref(), Some("incomplete dossier"));
            }
            other => panic!("expected ValidationRejected, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_clinician_without_profile_is_internal_error() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "doc-1", Some("doc@x.ci"), None, Some(&hash), Role::Clinician, AccountStatus::Active).await;
        let orch = orchestrator(&db);

        let result = orch.password_login("doc@x.ci", "P").await;
        assert!(matches!(result, Err(ApiError::ProfileMissing(_))));
    }

    #[tokio::test]
    async fn test_admin_login_has_no_refresh_token() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "adm-1", Some("admin@x.ci"), None, Some(&hash), Role::Admin, AccountStatus::Active).await;
        let orch = orchestrator(&db);

        let success = orch.password_login("admin@x.ci", "P").await.unwrap();
        assert!(success.grant.refresh_token.is_none());

        // Only the access fingerprint lands in the ledger
        assert_eq!(ledger_count(&db).await, 1);
    }

    #[tokio::test]
    async fn test_patient_code_login_issues_tokens_and_consumes_code() {
        let db = setup_db().await;
        insert_account(&db, "pat-1", None, Some("0700000000"), None, Role::Patient, AccountStatus::Active).await;
        insert_otc(&db, "0700000000", "1234", 5).await;
        let orch = orchestrator(&db);

        match orch.verify_code_login("0700000000", "1234").await.unwrap() {
            OtcLoginResult::PatientLogin { grant, account } => {
                assert!(grant.refresh_token.is_some());
                assert_eq!(account.phone.as_deref(), Some("0700000000"));
            }
            other => panic!("expected PatientLogin, got {:?} variant", variant_name(&other)),
        }
        assert_eq!(ledger_count(&db).await, 2);

        // Immediate repeat with the same code: consumed, so invalid
        let result = orch.verify_code_login("0700000000", "1234").await;
        assert!(matches!(result, Err(ApiError::OtpInvalid)));
    }

    #[tokio::test]
    async fn test_expired_code_short_circuits_before_account_lookup() {
        let db = setup_db().await;
        insert_account(&db, "pat-1", None, Some("0700000000"), None, Role::Patient, AccountStatus::Active).await;
        insert_otc(&db, "0700000000", "1234", -1).await;
        let orch = orchestrator(&db);

        let result = orch.verify_code_login("0700000000", "1234").await;
        assert!(matches!(result, Err(ApiError::OtpExpired)));
        assert_eq!(ledger_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_unknown_phone_gets_verification_only() {
        let db = setup_db().await;
        insert_otc(&db, "0799999999", "1234", 5).await;
        let orch = orchestrator(&db);

        let result = orch.verify_code_login("0799999999", "1234").await.unwrap();
        assert!(matches!(result, OtcLoginResult::VerificationOnly { user_exists: false }));
        assert_eq!(ledger_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_suspended_patient_code_login_is_account_suspended() {
        let db = setup_db().await;
        insert_account(&db, "pat-1", None, Some("0700000000"), None, Role::Patient, AccountStatus::Suspended).await;
        insert_otc(&db, "0700000000", "1234", 5).await;
        let orch = orchestrator(&db);

        let result = orch.verify_code_login("0700000000", "1234").await;
        assert!(matches!(result, Err(ApiError::AccountSuspended(AccountStatus::Suspended))));
        assert_eq!(ledger_count(&db).await, 0);
    }

    #[tokio::test]
    async fn test_register_patient_requires_valid_code() {
        let db = setup_db().await;
        insert_otc(&db, "0788888888", "4321", 5).await;
        let orch = orchestrator(&db);

        let result = orch
            .register_patient("0788888888", "0000", None, None, None)
            .await;
        assert!(matches!(result, Err(ApiError::OtpInvalid)));

        let (grant, account) = orch
            .register_patient("0788888888", "4321", Some("Awa".to_string()), None, None)
            .await
            .unwrap();
        assert!(grant.refresh_token.is_some());
        assert_eq!(account.role, Role::Patient);
        assert_eq!(account.phone.as_deref(), Some("0788888888"));

        // Registration consumed the code
        let result = orch.verify_code_login("0788888888", "4321").await;
        assert!(matches!(result, Err(ApiError::OtpInvalid)));
    }

    #[tokio::test]
    async fn test_register_existing_phone_conflicts() {
        let db = setup_db().await;
        insert_account(&db, "pat-1", None, Some("0700000000"), None, Role::Patient, AccountStatus::Active).await;
        insert_otc(&db, "0700000000", "1234", 5).await;
        let orch = orchestrator(&db);

        let result = orch
            .register_patient("0700000000", "1234", None, None, None)
            .await;
        assert!(matches!(result, Err(ApiError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_ledger_failure_does_not_block_login() {
        let db = setup_db().await;
        let hash = hash_secret("P").unwrap();
        insert_account(&db, "adm-1", Some("admin@x.ci"), None, Some(&hash), Role::Admin, AccountStatus::Active).await;
        sqlx::query("DROP TABLE session_token").execute(&db).await.unwrap();
        let orch = orchestrator(&db);

        // The ledger write fails internally; the login still succeeds
        let success = orch.password_login("admin@x.ci", "P").await.unwrap();
        assert!(!success.grant.access_token.is_empty());
    }

    fn variant_name(result: &OtcLoginResult) -> &'static str {
        match result {
            OtcLoginResult::PatientLogin { .. } => "PatientLogin",
            OtcLoginResult::VerificationOnly { .. } => "VerificationOnly",
        }
    }
}
