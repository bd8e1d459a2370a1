/// Database models for accounts, clinician profiles, one-time codes,
/// and the session-token ledger.
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Account role. Closed set: gating logic matches on this exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Patient,
    Clinician,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "patient",
            Role::Clinician => "clinician",
            Role::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "patient" => Some(Role::Patient),
            "clinician" => Some(Role::Clinician),
            "admin" => Some(Role::Admin),
            _ => None,
        }
    }
}

/// Account lifecycle status, distinct from clinician validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    Active,
    Suspended,
    Inactive,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::Active => "active",
            AccountStatus::Suspended => "suspended",
            AccountStatus::Inactive => "inactive",
        }
    }
}

/// Clinician review gate. A clinician account can be active but still
/// pending specialty/credential review.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValidationStatus {
    Pending,
    Approved,
    Rejected,
}

impl ValidationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValidationStatus::Pending => "pending",
            ValidationStatus::Approved => "approved",
            ValidationStatus::Rejected => "rejected",
        }
    }
}

/// Kind of issued bearer credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Access => "access",
            TokenKind::Refresh => "refresh",
        }
    }
}

/// Account record in the database
///
/// `password_hash` is absent for phone-only patient identities. Invariant:
/// password login is only valid when a hash is present and role != patient.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub role: Role,
    pub status: AccountStatus,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One-to-one extension of a clinician account
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct ClinicianProfile {
    pub account_id: String,
    pub validation_status: ValidationStatus,
    pub rejection_reason: Option<String>,
    pub specialty: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Ephemeral phone-ownership challenge. Rows are never deleted by this
/// subsystem; issuing a new code supersedes older ones, and only the newest
/// code for a phone can verify, while unconsumed and unexpired.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct OneTimeCode {
    pub id: String,
    pub phone: String,
    pub code: String,
    pub expires_at: DateTime<Utc>,
    pub consumed: bool,
    pub consumed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Persisted fingerprint of an issued credential. The raw token value is
/// never stored; `token_hash` is its SHA-256 digest. `used` is reserved for
/// future single-use refresh semantics.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SessionToken {
    pub id: String,
    pub account_id: String,
    pub kind: TokenKind,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}
