//! In-memory gateway
//!
//! Keeps the same contract as the PostgreSQL gateway (unique email, foreign
//! keys, delete policy, store-stamped timestamps) over plain vectors. Backs
//! the unit and HTTP-level test suites.

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::{
    BankAccount, BankAccountChanges, Category, CategoryChanges, NewBankAccount, NewCategory,
    NewTransaction, NewUser, Page, Transaction, TransactionChanges, TransactionWithCategory,
    UserChanges, UserRecord,
};

use super::{
    BankAccountStore, CategoryStore, DeletePolicy, StoreError, StoreResult, TransactionStore,
    UserStore,
};

#[derive(Debug, Default)]
struct Tables {
    users: Vec<UserRecord>,
    categories: Vec<Category>,
    bank_accounts: Vec<BankAccount>,
    transactions: Vec<Transaction>,
}

fn unique_violation(constraint: &str) -> StoreError {
    StoreError::UniqueViolation {
        constraint: Some(constraint.to_string()),
    }
}

fn foreign_key_violation(constraint: &str) -> StoreError {
    StoreError::ForeignKeyViolation {
        constraint: Some(constraint.to_string()),
    }
}

impl Tables {
    fn email_taken(&self, email: &str, except: Option<Uuid>) -> bool {
        self.users
            .iter()
            .any(|user| user.email == email && Some(user.id) != except)
    }

    fn check_transaction_references(
        &self,
        bank_account_id: Uuid,
        category_id: Uuid,
    ) -> StoreResult<()> {
        if !self.categories.iter().any(|c| c.id == category_id) {
            return Err(foreign_key_violation("transactions_category_id_fkey"));
        }
        if !self.bank_accounts.iter().any(|a| a.id == bank_account_id) {
            return Err(foreign_key_violation("transactions_bank_account_id_fkey"));
        }
        Ok(())
    }

    fn join_category(&self, transaction: &Transaction) -> StoreResult<TransactionWithCategory> {
        let category = self
            .categories
            .iter()
            .find(|c| c.id == transaction.category_id)
            .cloned()
            .ok_or_else(|| {
                StoreError::Unavailable(format!(
                    "transaction {} references missing category {}",
                    transaction.id, transaction.category_id
                ))
            })?;

        Ok(TransactionWithCategory {
            transaction: transaction.clone(),
            category,
        })
    }

    fn join_all<'a>(
        &self,
        transactions: impl IntoIterator<Item = &'a Transaction>,
    ) -> StoreResult<Vec<TransactionWithCategory>> {
        transactions
            .into_iter()
            .map(|t| self.join_category(t))
            .collect()
    }

    /// Newest date first, ties broken by newest insert.
    fn sorted_by_date_desc<'a>(
        transactions: impl Iterator<Item = &'a Transaction>,
    ) -> Vec<&'a Transaction> {
        let mut sorted: Vec<&Transaction> = transactions.collect();
        sorted.sort_by(|a, b| {
            b.date
                .cmp(&a.date)
                .then_with(|| b.created_at.cmp(&a.created_at))
        });
        sorted
    }
}

/// Gateway holding every table in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

// =========================================================================
// Users
// =========================================================================

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        let mut tables = self.tables.write().await;

        if tables.email_taken(&user.email, None) {
            return Err(unique_violation("users_email_key"));
        }

        let now = Utc::now();
        let record = UserRecord {
            id: Uuid::new_v4(),
            name: user.name,
            email: user.email,
            password: user.password,
            created_at: now,
            updated_at: now,
        };
        tables.users.push(record.clone());

        Ok(record)
    }

    async fn list_users(&self, page: Page) -> StoreResult<Vec<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(page.slice(tables.users.iter().cloned()))
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<UserRecord>> {
        let mut tables = self.tables.write().await;

        if let Some(email) = changes.email.as_deref() {
            if tables.email_taken(email, Some(id)) {
                return Err(unique_violation("users_email_key"));
            }
        }

        let Some(user) = tables.users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(password) = changes.password {
            user.password = password;
        }
        user.updated_at = Utc::now();

        Ok(Some(user.clone()))
    }

    async fn delete_user(&self, id: Uuid, policy: DeletePolicy) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|u| u.id == id) {
            return Ok(false);
        }

        let owned_accounts: Vec<Uuid> = tables
            .bank_accounts
            .iter()
            .filter(|a| a.user_id == id)
            .map(|a| a.id)
            .collect();

        if !owned_accounts.is_empty() {
            match policy {
                DeletePolicy::Restrict => {
                    return Err(foreign_key_violation("bank_accounts_user_id_fkey"));
                }
                DeletePolicy::Cascade => {
                    tables
                        .transactions
                        .retain(|t| !owned_accounts.contains(&t.bank_account_id));
                    tables.bank_accounts.retain(|a| a.user_id != id);
                }
            }
        }

        tables.users.retain(|u| u.id != id);
        Ok(true)
    }
}

// =========================================================================
// Categories
// =========================================================================

#[async_trait]
impl CategoryStore for MemoryStore {
    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        let mut tables = self.tables.write().await;

        let now = Utc::now();
        let category = Category {
            id: Uuid::new_v4(),
            name: category.name,
            color: category.color,
            description: category.description,
            created_at: now,
            updated_at: now,
        };
        tables.categories.push(category.clone());

        Ok(category)
    }

    async fn list_categories(&self, page: Page) -> StoreResult<Vec<Category>> {
        let tables = self.tables.read().await;
        Ok(page.slice(tables.categories.iter().cloned()))
    }

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let mut tables = self.tables.write().await;

        let Some(category) = tables.categories.iter_mut().find(|c| c.id == id) else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            category.name = name;
        }
        if let Some(color) = changes.color {
            category.color = color;
        }
        if let Some(description) = changes.description {
            category.description = description;
        }
        category.updated_at = Utc::now();

        Ok(Some(category.clone()))
    }

    async fn delete_category(&self, id: Uuid, policy: DeletePolicy) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if !tables.categories.iter().any(|c| c.id == id) {
            return Ok(false);
        }

        if tables.transactions.iter().any(|t| t.category_id == id) {
            match policy {
                DeletePolicy::Restrict => {
                    return Err(foreign_key_violation("transactions_category_id_fkey"));
                }
                DeletePolicy::Cascade => tables.transactions.retain(|t| t.category_id != id),
            }
        }

        tables.categories.retain(|c| c.id != id);
        Ok(true)
    }
}

// =========================================================================
// Bank accounts
// =========================================================================

#[async_trait]
impl BankAccountStore for MemoryStore {
    async fn insert_bank_account(
        &self,
        user_id: Uuid,
        account: NewBankAccount,
    ) -> StoreResult<BankAccount> {
        let mut tables = self.tables.write().await;

        if !tables.users.iter().any(|u| u.id == user_id) {
            return Err(foreign_key_violation("bank_accounts_user_id_fkey"));
        }

        let now = Utc::now();
        let account = BankAccount {
            id: Uuid::new_v4(),
            user_id,
            name: account.name,
            api_token: account.api_token,
            account_status: account.account_status,
            connection_status: account.connection_status,
            created_at: now,
            updated_at: now,
        };
        tables.bank_accounts.push(account.clone());

        Ok(account)
    }

    async fn list_bank_accounts(&self, user_id: Uuid) -> StoreResult<Vec<BankAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bank_accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn bank_account_ids_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bank_accounts
            .iter()
            .filter(|a| a.user_id == user_id)
            .map(|a| a.id)
            .collect())
    }

    async fn find_bank_account(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<BankAccount>> {
        let tables = self.tables.read().await;
        Ok(tables
            .bank_accounts
            .iter()
            .find(|a| a.id == id && a.user_id == user_id)
            .cloned())
    }

    async fn update_bank_account(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: BankAccountChanges,
    ) -> StoreResult<Option<BankAccount>> {
        let mut tables = self.tables.write().await;

        let Some(account) = tables
            .bank_accounts
            .iter_mut()
            .find(|a| a.id == id && a.user_id == user_id)
        else {
            return Ok(None);
        };

        if let Some(name) = changes.name {
            account.name = name;
        }
        if let Some(api_token) = changes.api_token {
            account.api_token = api_token;
        }
        if let Some(account_status) = changes.account_status {
            account.account_status = account_status;
        }
        if let Some(connection_status) = changes.connection_status {
            account.connection_status = connection_status;
        }
        account.updated_at = Utc::now();

        Ok(Some(account.clone()))
    }

    async fn delete_bank_account(
        &self,
        user_id: Uuid,
        id: Uuid,
        policy: DeletePolicy,
    ) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;

        if !tables
            .bank_accounts
            .iter()
            .any(|a| a.id == id && a.user_id == user_id)
        {
            return Ok(false);
        }

        if tables.transactions.iter().any(|t| t.bank_account_id == id) {
            match policy {
                DeletePolicy::Restrict => {
                    return Err(foreign_key_violation("transactions_bank_account_id_fkey"));
                }
                DeletePolicy::Cascade => tables.transactions.retain(|t| t.bank_account_id != id),
            }
        }

        tables.bank_accounts.retain(|a| a.id != id);
        Ok(true)
    }
}

// =========================================================================
// Transactions
// =========================================================================

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> StoreResult<TransactionWithCategory> {
        let mut tables = self.tables.write().await;

        tables.check_transaction_references(transaction.bank_account_id, transaction.category_id)?;

        let now = Utc::now();
        let transaction = Transaction {
            id: Uuid::new_v4(),
            bank_account_id: transaction.bank_account_id,
            category_id: transaction.category_id,
            name: transaction.name,
            date: transaction.date,
            amount: transaction.amount,
            transaction_type: transaction.transaction_type,
            created_at: now,
            updated_at: now,
        };
        let joined = tables.join_category(&transaction)?;
        tables.transactions.push(transaction);

        Ok(joined)
    }

    async fn list_transactions(&self, page: Page) -> StoreResult<Vec<TransactionWithCategory>> {
        let tables = self.tables.read().await;
        let sorted = Tables::sorted_by_date_desc(tables.transactions.iter());
        tables.join_all(page.slice(sorted))
    }

    async fn list_transactions_for_accounts(
        &self,
        bank_account_ids: &[Uuid],
        page: Page,
    ) -> StoreResult<Vec<TransactionWithCategory>> {
        let tables = self.tables.read().await;
        let sorted = Tables::sorted_by_date_desc(
            tables
                .transactions
                .iter()
                .filter(|t| bank_account_ids.contains(&t.bank_account_id)),
        );
        tables.join_all(page.slice(sorted))
    }

    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<TransactionWithCategory>> {
        let tables = self.tables.read().await;
        tables
            .transactions
            .iter()
            .find(|t| t.id == id)
            .map(|t| tables.join_category(t))
            .transpose()
    }

    async fn update_transaction(
        &self,
        id: Uuid,
        changes: TransactionChanges,
    ) -> StoreResult<Option<TransactionWithCategory>> {
        let mut tables = self.tables.write().await;

        let Some(index) = tables.transactions.iter().position(|t| t.id == id) else {
            return Ok(None);
        };

        let mut updated = tables.transactions[index].clone();
        if let Some(bank_account_id) = changes.bank_account_id {
            updated.bank_account_id = bank_account_id;
        }
        if let Some(category_id) = changes.category_id {
            updated.category_id = category_id;
        }
        if let Some(name) = changes.name {
            updated.name = name;
        }
        if let Some(date) = changes.date {
            updated.date = date;
        }
        if let Some(amount) = changes.amount {
            updated.amount = amount;
        }
        if let Some(transaction_type) = changes.transaction_type {
            updated.transaction_type = transaction_type;
        }
        updated.updated_at = Utc::now();

        tables.check_transaction_references(updated.bank_account_id, updated.category_id)?;
        let joined = tables.join_category(&updated)?;
        tables.transactions[index] = updated;

        Ok(Some(joined))
    }

    async fn delete_transaction(&self, id: Uuid) -> StoreResult<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.transactions.len();
        tables.transactions.retain(|t| t.id != id);
        Ok(tables.transactions.len() < before)
    }
}
