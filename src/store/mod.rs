//! Persistence Gateway
//!
//! The storage contract consumed by the services: one async trait per
//! entity, shared as `Arc<dyn ...>` handles. `postgres` is the production
//! implementation; `memory` keeps the same contract in process.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{
    BankAccount, BankAccountChanges, Category, CategoryChanges, NewBankAccount, NewCategory,
    NewTransaction, NewUser, Page, TransactionChanges, TransactionWithCategory, UserChanges,
    UserRecord,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Errors reported by a gateway implementation
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A unique constraint rejected the write
    #[error("Unique constraint violated: {}", .constraint.as_deref().unwrap_or("unknown"))]
    UniqueViolation { constraint: Option<String> },

    /// A foreign key rejected the write (missing parent, or dependents on delete)
    #[error("Foreign key constraint violated: {}", .constraint.as_deref().unwrap_or("unknown"))]
    ForeignKeyViolation { constraint: Option<String> },

    /// The backing store could not serve the request
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(error: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_error) = &error {
            let constraint = db_error.constraint().map(str::to_owned);
            if db_error.is_unique_violation() {
                return StoreError::UniqueViolation { constraint };
            }
            if db_error.is_foreign_key_violation() {
                return StoreError::ForeignKeyViolation { constraint };
            }
        }
        StoreError::Database(error)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What to do when a deleted row still has dependents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeletePolicy {
    /// Refuse the delete with [`StoreError::ForeignKeyViolation`]
    #[default]
    Restrict,
    /// Delete dependents first, in the same database transaction
    Cascade,
}

impl FromStr for DeletePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "restrict" => Ok(DeletePolicy::Restrict),
            "cascade" => Ok(DeletePolicy::Cascade),
            other => Err(other.to_string()),
        }
    }
}

impl fmt::Display for DeletePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeletePolicy::Restrict => write!(f, "restrict"),
            DeletePolicy::Cascade => write!(f, "cascade"),
        }
    }
}

#[async_trait]
pub trait UserStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserRecord>;

    async fn list_users(&self, page: Page) -> StoreResult<Vec<UserRecord>>;

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>>;

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>>;

    /// Returns `None` when no row matched.
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<UserRecord>>;

    /// Returns `false` when no row matched.
    async fn delete_user(&self, id: Uuid, policy: DeletePolicy) -> StoreResult<bool>;
}

#[async_trait]
pub trait CategoryStore {
    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category>;

    async fn list_categories(&self, page: Page) -> StoreResult<Vec<Category>>;

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>>;

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>>;

    async fn delete_category(&self, id: Uuid, policy: DeletePolicy) -> StoreResult<bool>;
}

/// Every read and write is scoped by the owning user.
#[async_trait]
pub trait BankAccountStore {
    async fn insert_bank_account(
        &self,
        user_id: Uuid,
        account: NewBankAccount,
    ) -> StoreResult<BankAccount>;

    async fn list_bank_accounts(&self, user_id: Uuid) -> StoreResult<Vec<BankAccount>>;

    async fn bank_account_ids_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>>;

    async fn find_bank_account(&self, user_id: Uuid, id: Uuid)
        -> StoreResult<Option<BankAccount>>;

    async fn update_bank_account(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: BankAccountChanges,
    ) -> StoreResult<Option<BankAccount>>;

    async fn delete_bank_account(
        &self,
        user_id: Uuid,
        id: Uuid,
        policy: DeletePolicy,
    ) -> StoreResult<bool>;
}

/// Reads always join the transaction's category.
#[async_trait]
pub trait TransactionStore {
    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> StoreResult<TransactionWithCategory>;

    async fn list_transactions(&self, page: Page) -> StoreResult<Vec<TransactionWithCategory>>;

    /// Transactions on any of `bank_account_ids`, newest date first.
    async fn list_transactions_for_accounts(
        &self,
        bank_account_ids: &[Uuid],
        page: Page,
    ) -> StoreResult<Vec<TransactionWithCategory>>;

    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<TransactionWithCategory>>;

    async fn update_transaction(
        &self,
        id: Uuid,
        changes: TransactionChanges,
    ) -> StoreResult<Option<TransactionWithCategory>>;

    async fn delete_transaction(&self, id: Uuid) -> StoreResult<bool>;
}

pub type DynUserStore = Arc<dyn UserStore + Send + Sync>;
pub type DynCategoryStore = Arc<dyn CategoryStore + Send + Sync>;
pub type DynBankAccountStore = Arc<dyn BankAccountStore + Send + Sync>;
pub type DynTransactionStore = Arc<dyn TransactionStore + Send + Sync>;

/// The gateway handles injected into every service.
#[derive(Clone)]
pub struct Gateway {
    pub users: DynUserStore,
    pub categories: DynCategoryStore,
    pub bank_accounts: DynBankAccountStore,
    pub transactions: DynTransactionStore,
}

impl Gateway {
    /// Build a gateway where one value implements every store.
    pub fn from_store<S>(store: S) -> Self
    where
        S: UserStore + CategoryStore + BankAccountStore + TransactionStore + Send + Sync + 'static,
    {
        let store = Arc::new(store);
        Self {
            users: store.clone(),
            categories: store.clone(),
            bank_accounts: store.clone(),
            transactions: store,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delete_policy_parse() {
        assert_eq!("restrict".parse::<DeletePolicy>(), Ok(DeletePolicy::Restrict));
        assert_eq!(" CASCADE ".parse::<DeletePolicy>(), Ok(DeletePolicy::Cascade));
        assert!("orphan".parse::<DeletePolicy>().is_err());
        assert_eq!(DeletePolicy::default(), DeletePolicy::Restrict);
        assert_eq!(DeletePolicy::Cascade.to_string(), "cascade");
    }

    #[test]
    fn test_store_error_display() {
        let err = StoreError::UniqueViolation {
            constraint: Some("users_email_key".to_string()),
        };
        assert!(err.to_string().contains("users_email_key"));

        let err = StoreError::ForeignKeyViolation { constraint: None };
        assert!(err.to_string().contains("unknown"));
    }

    #[test]
    fn test_non_database_sqlx_error_is_opaque() {
        let err: StoreError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, StoreError::Database(_)));
    }
}
