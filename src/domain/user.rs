//! User entity
//!
//! `UserRecord` is what the gateway stores, digest included. `User` is the
//! public projection handed to callers; it has no password field at all, so
//! the digest cannot be serialized by accident.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::credentials::PasswordDigest;

/// A user row as held by the persistence gateway.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub password: PasswordDigest,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Public view of a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserRecord> for User {
    fn from(record: UserRecord) -> Self {
        Self {
            id: record.id,
            name: record.name,
            email: record.email,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Values for a new user row. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: PasswordDigest,
}

/// Partial update of a user row; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<PasswordDigest>,
}
