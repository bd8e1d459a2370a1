/// One-time code store and verifier
///
/// Codes are keyed by phone number and kept as history: issuing a new code
/// supersedes older ones without deleting them. Only the newest code for a
/// phone can verify; a superseded code is rejected even while unexpired, and
/// stays rejected after the newer one is consumed. Consumption happens
/// through a single conditional UPDATE so that two concurrent submissions of
/// the same valid code cannot both observe `Verified`.
use crate::auth::expiry::expiry_from;
use crate::error::{ApiError, ApiResult};
use chrono::{DateTime, Utc};
use rand::Rng;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Length of the numeric code delivered to the phone
pub const CODE_LENGTH: usize = 4;

/// Outcome of a verification attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OtcOutcome {
    /// Code matched and was consumed by this caller
    Verified,
    /// The right code was submitted, but past its expiry instant
    Expired,
    /// No unconsumed code matches the phone + code pair
    Invalid,
}

/// Store for one-time verification codes
pub struct OtcStore {
    db: SqlitePool,
}

impl OtcStore {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Strip a phone number down to its digits
    pub fn normalize_phone(phone: &str) -> String {
        phone.chars().filter(|c| c.is_ascii_digit()).collect()
    }

    /// Mint and store a fresh code for a phone number
    ///
    /// Delivery to the handset is the caller's concern. Older codes for the
    /// same phone are superseded implicitly: they stay in the table but are
    /// no longer eligible to verify.
    pub async fn issue(&self, phone: &str, ttl_spec: &str) -> ApiResult<String> {
        let phone = Self::normalize_phone(phone);
        if phone.is_empty() {
            return Err(ApiError::Validation("Phone number required".to_string()));
        }

        let code: String = {
            let mut rng = rand::thread_rng();
            (0..CODE_LENGTH)
                .map(|_| char::from(b'0' + rng.gen_range(0..10)))
                .collect()
        };

        let now = Utc::now();
        let expires_at = expiry_from(now, ttl_spec)?;

        sqlx::query(
            "INSERT INTO one_time_code (id, phone, code, expires_at, consumed, created_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(&phone)
        .bind(&code)
        .bind(expires_at)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        Ok(code)
    }

    /// Verify a submitted code against the newest record for the phone
    ///
    /// Only the most recently created code is eligible: an older code is
    /// superseded the moment a newer one exists, whatever its own expiry.
    /// The consumed flag is flipped in the same statement that selects the
    /// winning row, guarded by `consumed = 0`, so at most one concurrent
    /// caller sees `Verified` for a given code. A second call with the same
    /// arguments after `Verified` returns `Invalid`: single-use semantics.
    pub async fn verify(&self, phone: &str, submitted_code: &str) -> ApiResult<OtcOutcome> {
        let phone = Self::normalize_phone(phone);
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE one_time_code
             SET consumed = 1, consumed_at = ?1
             WHERE consumed = 0 AND code = ?3 AND expires_at > ?1
               AND id = (
                   SELECT id FROM one_time_code
                   WHERE phone = ?2
                   ORDER BY created_at DESC, rowid DESC
                   LIMIT 1
               )",
        )
        .bind(now)
        .bind(&phone)
        .bind(submitted_code)
        .execute(&self.db)
        .await
        .map_err(ApiError::Database)?;

        if result.rows_affected() == 1 {
            return Ok(OtcOutcome::Verified);
        }

        // Distinguish "right code, too late" from "wrong or superseded code"
        // for better client messaging: the newest record must still match and
        // be unconsumed, only its expiry may have passed.
        let newest: Option<(String, DateTime<Utc>, bool)> = sqlx::query_as(
            "SELECT code, expires_at, consumed FROM one_time_code
             WHERE phone = ?1
             ORDER BY created_at DESC, rowid DESC
             LIMIT 1",
        )
        .bind(&phone)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?;

        match newest {
            Some((code, expires_at, false)) if code == submitted_code && expires_at <= now => {
                Ok(OtcOutcome::Expired)
            }
            _ => Ok(OtcOutcome::Invalid),
        }
    }
}
