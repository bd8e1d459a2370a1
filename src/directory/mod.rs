/// Clinician directory
///
/// Public listing of approved clinicians for the booking front end. Only
/// accounts that passed profile review are visible.
use crate::db::models::{AccountStatus, ValidationStatus};
use crate::error::{ApiError, ApiResult};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};

/// Public listing entry: account joined with its clinician profile
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClinicianListing {
    pub id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub specialty: Option<String>,
}

pub struct DirectoryManager {
    db: SqlitePool,
}

impl DirectoryManager {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// List approved, active clinicians ordered by id for consistent
    /// pagination. Use the last id as cursor for the next page.
    pub async fn list_clinicians(
        &self,
        cursor: Option<&str>,
        limit: i64,
    ) -> ApiResult<Vec<ClinicianListing>> {
        let query = if let Some(cursor_id) = cursor {
            sqlx::query_as::<_, ClinicianListing>(
                "SELECT a.id, a.first_name, a.last_name, p.specialty
                 FROM account a
                 JOIN clinician_profile p ON p.account_id = a.id
                 WHERE a.status = ?1 AND p.validation_status = ?2 AND a.id > ?3
                 ORDER BY a.id
                 LIMIT ?4",
            )
            .bind(AccountStatus::Active.as_str())
            .bind(ValidationStatus::Approved.as_str())
            .bind(cursor_id)
            .bind(limit)
        } else {
            sqlx::query_as::<_, ClinicianListing>(
                "SELECT a.id, a.first_name, a.last_name, p.specialty
                 FROM account a
                 JOIN clinician_profile p ON p.account_id = a.id
                 WHERE a.status = ?1 AND p.validation_status = ?2
                 ORDER BY a.id
                 LIMIT ?3",
            )
            .bind(AccountStatus::Active.as_str())
            .bind(ValidationStatus::Approved.as_str())
            .bind(limit)
        };

        let listings = query.fetch_all(&self.db).await?;

        Ok(listings)
    }

    /// Fetch one approved clinician by id
    pub async fn get_clinician(&self, id: &str) -> ApiResult<ClinicianListing> {
        sqlx::query_as::<_, ClinicianListing>(
            "SELECT a.id, a.first_name, a.last_name, p.specialty
             FROM account a
             JOIN clinician_profile p ON p.account_id = a.id
             WHERE a.id = ?1 AND a.status = ?2 AND p.validation_status = ?3",
        )
        .bind(id)
        .bind(AccountStatus::Active.as_str())
        .bind(ValidationStatus::Approved.as_str())
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::Database)?
        .ok_or_else(|| ApiError::NotFound("Clinician not found".to_string()))
    }
}
