/// Account lookups and patient registration
///
/// Accounts are the identity records behind both login flows. Staff
/// (clinicians, administrators) are provisioned out of band with a password
/// hash; patients come into existence through phone verification followed by
/// registration, and never carry a password.
use crate::db::models::{Account, AccountStatus, ClinicianProfile, Role};
use crate::error::{ApiError, ApiResult};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct AccountManager {
    db: SqlitePool,
}

impl AccountManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Lower-case and trim an email for lookup
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_lowercase()
    }

    /// Find an account by normalized email
    pub async fn find_by_email(&self, email: &str) -> ApiResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, phone, password_hash, role, status, first_name, last_name, created_at
             FROM account WHERE email = ?1",
        )
        .bind(Self::normalize_email(email))
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(account)
    }

    /// Find an account by digits-only phone number
    pub async fn find_by_phone(&self, phone: &str) -> ApiResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(
            "SELECT id, email, phone, password_hash, role, status, first_name, last_name, created_at
             FROM account WHERE phone = ?1",
        )
        .bind(phone)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(account)
    }

    /// Get an account by id
    pub async fn get_account(&self, id: &str) -> ApiResult<Account> {
        sqlx::query_as::<_, Account>(
            "SELECT id, email, phone, password_hash, role, status, first_name, last_name, created_at
             FROM account WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Account not found".to_string()))
    }

    /// Get the clinician profile extension for an account, if any
    pub async fn clinician_profile(&self, account_id: &str) -> ApiResult<Option<ClinicianProfile>> {
        let profile = sqlx::query_as::<_, ClinicianProfile>(
            "SELECT account_id, validation_status, rejection_reason, specialty, created_at
             FROM clinician_profile WHERE account_id = ?1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(profile)
    }

    /// Create a patient account keyed by a verified phone number
    ///
    /// No password hash: patients authenticate exclusively through the
    /// one-time-code flow.
    pub async fn create_patient(
        &self,
        phone: &str,
        first_name: Option<String>,
        last_name: Option<String>,
        email: Option<String>,
    ) -> ApiResult<Account> {
        if phone.is_empty() {
            return Err(ApiError::Validation("Phone number required".to_string()));
        }

        let email = email.map(|e| Self::normalize_email(&e));

        let account = Account {
            id: Uuid::new_v4().to_string(),
            email,
            phone: Some(phone.to_string()),
            password_hash: None,
            role: Role::Patient,
            status: AccountStatus::Active,
            first_name,
            last_name,
            created_at: Utc::now(),
        };

        sqlx::query(
            "INSERT INTO account (id, email, phone, password_hash, role, status, first_name, last_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&account.id)
        .bind(&account.email)
        .bind(&account.phone)
        .bind(&account.password_hash)
        .bind(account.role.as_str())
        .bind(account.status.as_str())
        .bind(&account.first_name)
        .bind(&account.last_name)
        .bind(account.created_at)
        .execute(&self.db)
        .await
        .map_err(|e| {
            // The UNIQUE constraints are the arbiter: concurrent duplicate
            // registrations race past any pre-check, so the losing INSERT is
            // mapped here rather than screened beforehand.
            if let sqlx::Error::Database(db) = &e {
                if db.is_unique_violation() {
                    return if db.message().contains("account.phone") {
                        ApiError::Conflict("Phone number already registered".to_string())
                    } else {
                        ApiError::Conflict("Email already registered".to_string())
                    };
                }
            }
            ApiError::Database(e)
        })?;

        tracing::info!(account_id = %account.id, "Created patient account");

        Ok(account)
    }
}

#[cfg(test)]
pub mod testing {
    //! Shared fixtures for manager and orchestrator tests
    use super::*;
    use crate::db::models::ValidationStatus;

    /// In-memory database with the full schema
    pub async fn setup_db() -> SqlitePool {
        let db = SqlitePool::connect(":memory:").await.unwrap();

        sqlx::query(
            r#"
            CREATE TABLE account (
                id TEXT PRIMARY KEY,
                email TEXT UNIQUE,
                phone TEXT UNIQUE,
                password_hash TEXT,
                role TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'active',
                first_name TEXT,
                last_name TEXT,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE clinician_profile (
                account_id TEXT PRIMARY KEY,
                validation_status TEXT NOT NULL DEFAULT 'pending',
                rejection_reason TEXT,
                specialty TEXT,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (account_id) REFERENCES account(id)
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE one_time_code (
                id TEXT PRIMARY KEY,
                phone TEXT NOT NULL,
                code TEXT NOT NULL,
                expires_at DATETIME NOT NULL,
                consumed BOOLEAN NOT NULL DEFAULT 0,
                consumed_at DATETIME,
                created_at DATETIME NOT NULL
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        sqlx::query(
            r#"
            CREATE TABLE session_token (
                id TEXT PRIMARY KEY,
                account_id TEXT NOT NULL,
                kind TEXT NOT NULL,
                token_hash TEXT NOT NULL,
                expires_at DATETIME NOT NULL,
                used BOOLEAN NOT NULL DEFAULT 0,
                created_at DATETIME NOT NULL,
                FOREIGN KEY (account_id) REFERENCES account(id)
            )
            "#,
        )
        .execute(&db)
        .await
        .unwrap();

        db
    }

    /// Insert an account row directly
    pub async fn insert_account(
        db: &SqlitePool,
        id: &str,
        email: Option<&str>,
        phone: Option<&str>,
        password_hash: Option<&str>,
        role: Role,
        status: AccountStatus,
    ) {
        sqlx::query(
            "INSERT INTO account (id, email, phone, password_hash, role, status, first_name, last_name, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'Test', 'User', ?7)",
        )
        .bind(id)
        .bind(email)
        .bind(phone)
        .bind(password_hash)
        .bind(role.as_str())
        .bind(status.as_str())
        .bind(Utc::now())
        .execute(db)
        .await
        .unwrap();
    }

    /// Insert a clinician profile row directly
    pub async fn insert_profile(
        db: &SqlitePool,
        account_id: &str,
        validation_status: ValidationStatus,
        rejection_reason: Option<&str>,
    ) {
        sqlx::query(
            "INSERT INTO clinician_profile (account_id, validation_status, rejection_reason, specialty, created_at)
             VALUES (?1, ?2, ?3, 'cardiology', ?4)",
        )
        .bind(account_id)
        .bind(validation_status.as_str())
        .bind(rejection_reason)
        .bind(Utc::now())
        .execute(db)
        .await
        .unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use crate::db::models::ValidationStatus;

    #[tokio::test]
    async fn test_create_patient_and_find_by_phone() {
        let db = setup_db().await;
        let manager = AccountManager::new(db);

        let account = manager
            .create_patient("0700000000", Some("Awa".to_string()), None, None)
            .await
            .unwrap();

        assert_eq!(account.role, Role::Patient);
        assert!(account.password_hash.is_none());

        let found = manager.find_by_phone("0700000000").await.unwrap().unwrap();
        assert_eq!(found.id, account.id);
    }

    #[tokio::test]
    async fn test_create_patient_duplicate_phone_conflicts() {
        let db = setup_db().await;
        let manager = AccountManager::new(db);

        manager
            .create_patient("0700000000", None, None, None)
            .await
            .unwrap();
        let result = manager.create_patient("0700000000", None, None, None).await;

        // The unique constraint surfaces as a conflict, not a server fault
        match result {
            Err(ApiError::Conflict(message)) => assert!(message.contains("Phone")),
            other => panic!("expected Conflict, got {:?}", other.map(|a| a.id)),
        }
    }

    #[tokio::test]
    async fn test_create_patient_duplicate_email_conflicts() {
        let db = setup_db().await;
        let manager = AccountManager::new(db);

        manager
            .create_patient("0700000001", None, None, Some("awa@x.ci".to_string()))
            .await
            .unwrap();
        let result = manager
            .create_patient("0700000002", None, None, Some(" AWA@x.ci".to_string()))
            .await;

        match result {
            Err(ApiError::Conflict(message)) => assert!(message.contains("Email")),
            other => panic!("expected Conflict, got {:?}", other.map(|a| a.id)),
        }
    }

    #[tokio::test]
    async fn test_find_by_email_is_normalized() {
        let db = setup_db().await;
        insert_account(
            &db,
            "acc-1",
            Some("doc@x.ci"),
            None,
            Some("hash"),
            Role::Clinician,
            AccountStatus::Active,
        )
        .await;
        let manager = AccountManager::new(db);

        let found = manager.find_by_email("  Doc@X.CI ").await.unwrap();
        assert!(found.is_some());
    }

    #[tokio::test]
    async fn test_clinician_profile_lookup() {
        let db = setup_db().await;
        insert_account(
            &db,
            "acc-1",
            Some("doc@x.ci"),
            None,
            Some("hash"),
            Role::Clinician,
            AccountStatus::Active,
        )
        .await;
        insert_profile(&db, "acc-1", ValidationStatus::Rejected, Some("expired license")).await;
        let manager = AccountManager::new(db);

        let profile = manager.clinician_profile("acc-1").await.unwrap().unwrap();
        assert_eq!(profile.validation_status, ValidationStatus::Rejected);
        assert_eq!(profile.rejection_reason.as_deref(), Some("expired license"));

        assert!(manager.clinician_profile("missing").await.unwrap().is_none());
    }
}
