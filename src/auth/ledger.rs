/// Token persistence ledger
///
/// Records a hashed fingerprint of every issued credential with its kind,
/// owner and expiry, for audit and future revocation. Writes are best-effort:
/// the signed token itself is the source of truth for authorization, so a
/// ledger failure is logged and swallowed, never surfaced to the caller.
use crate::auth::hashing::fingerprint;
use crate::auth::tokens::IssuedToken;
use crate::error::{ApiError, ApiResult};
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

pub struct TokenLedger {
    db: SqlitePool,
}

impl TokenLedger {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Append fingerprints for a batch of issued tokens
    ///
    /// The batch goes into one transaction as a convenience (both-or-neither
    /// write). Failure here never rolls back the already-issued tokens.
    async fn record_all(&self, account_id: &str, tokens: &[IssuedToken]) -> ApiResult<()> {
        let mut tx = self.db.begin().await.map_err(ApiError::Database)?;
        let now = Utc::now();

        for issued in tokens {
            sqlx::query(
                "INSERT INTO session_token (id, account_id, kind, token_hash, expires_at, used, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
            )
            .bind(Uuid::new_v4().to_string())
            .bind(account_id)
            .bind(issued.kind.as_str())
            .bind(fingerprint(&issued.token))
            .bind(issued.expires_at)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::Database)?;
        }

        tx.commit().await.map_err(ApiError::Database)?;

        Ok(())
    }

    /// Best-effort record of issued tokens
    ///
    /// The login outcome is already decided when this runs; a failing write
    /// must not change the response.
    pub async fn record_issued(&self, account_id: &str, tokens: &[IssuedToken]) {
        if let Err(e) = self.record_all(account_id, tokens).await {
            tracing::warn!(
                account_id,
                count = tokens.len(),
                "Failed to record issued tokens in ledger: {}",
                e
            );
        }
    }
}
