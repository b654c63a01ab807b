//! Bank account entity
//!
//! A financial account linked by a user through an external aggregator. The
//! status fields are whatever the aggregator reports; no transition table is
//! enforced.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankAccount {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub api_token: String,
    pub account_status: String,
    pub connection_status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fields of a new bank account; the owner is supplied separately.
#[derive(Debug, Clone)]
pub struct NewBankAccount {
    pub name: String,
    pub api_token: String,
    pub account_status: String,
    pub connection_status: String,
}

/// Partial update of a bank account; the owner is never changed.
#[derive(Debug, Clone, Default)]
pub struct BankAccountChanges {
    pub name: Option<String>,
    pub api_token: Option<String>,
    pub account_status: Option<String>,
    pub connection_status: Option<String>,
}
