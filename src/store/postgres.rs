//! PostgreSQL gateway
//!
//! Implements every store trait over a shared `PgPool`. Partial updates use
//! `COALESCE($n, column)` so an omitted field keeps its stored value, and
//! every mutation reports whether a row actually matched.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, Transaction as PgTransaction};
use uuid::Uuid;

use crate::domain::{
    Amount, BankAccount, BankAccountChanges, Category, CategoryChanges, NewBankAccount,
    NewCategory, NewTransaction, NewUser, Page, PasswordDigest, Transaction, TransactionChanges,
    TransactionType, TransactionWithCategory, UserChanges, UserRecord,
};

use super::{
    BankAccountStore, CategoryStore, DeletePolicy, StoreError, StoreResult, TransactionStore,
    UserStore,
};

/// Gateway backed by PostgreSQL
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Close every pooled connection; called once on shutdown.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

// =========================================================================
// Row types
// =========================================================================

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRow> for UserRecord {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            password: PasswordDigest::from_stored(row.password_hash),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CategoryRow {
    id: Uuid,
    name: String,
    color: String,
    description: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CategoryRow> for Category {
    fn from(row: CategoryRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            color: row.color,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct BankAccountRow {
    id: Uuid,
    user_id: Uuid,
    name: String,
    api_token: String,
    account_status: String,
    connection_status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<BankAccountRow> for BankAccount {
    fn from(row: BankAccountRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            api_token: row.api_token,
            account_status: row.account_status,
            connection_status: row.connection_status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// A transaction joined with its category.
#[derive(Debug, FromRow)]
struct TransactionRow {
    id: Uuid,
    bank_account_id: Uuid,
    category_id: Uuid,
    name: String,
    transaction_date: DateTime<Utc>,
    amount: Decimal,
    transaction_type: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    category_name: String,
    category_color: String,
    category_description: String,
    category_created_at: DateTime<Utc>,
    category_updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for TransactionWithCategory {
    type Error = StoreError;

    fn try_from(row: TransactionRow) -> Result<Self, Self::Error> {
        let transaction_type: TransactionType = row
            .transaction_type
            .parse()
            .map_err(|e| StoreError::Database(sqlx::Error::Decode(Box::new(e))))?;

        Ok(Self {
            transaction: Transaction {
                id: row.id,
                bank_account_id: row.bank_account_id,
                category_id: row.category_id,
                name: row.name,
                date: row.transaction_date,
                amount: Amount::from_stored(row.amount),
                transaction_type,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            category: Category {
                id: row.category_id,
                name: row.category_name,
                color: row.category_color,
                description: row.category_description,
                created_at: row.category_created_at,
                updated_at: row.category_updated_at,
            },
        })
    }
}

fn into_transactions(rows: Vec<TransactionRow>) -> StoreResult<Vec<TransactionWithCategory>> {
    rows.into_iter().map(TryFrom::try_from).collect()
}

const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

const CATEGORY_COLUMNS: &str = "id, name, color, description, created_at, updated_at";

const BANK_ACCOUNT_COLUMNS: &str =
    "id, user_id, name, api_token, account_status, connection_status, created_at, updated_at";

/// Select transactions from `source` (a table or CTE) joined with categories.
fn transaction_select(source: &str) -> String {
    format!(
        r#"
        SELECT
            t.id, t.bank_account_id, t.category_id, t.name, t.transaction_date,
            t.amount, t.transaction_type, t.created_at, t.updated_at,
            c.name AS category_name,
            c.color AS category_color,
            c.description AS category_description,
            c.created_at AS category_created_at,
            c.updated_at AS category_updated_at
        FROM {source} t
        JOIN categories c ON c.id = t.category_id
        "#
    )
}

// =========================================================================
// Users
// =========================================================================

#[async_trait]
impl UserStore for PostgresStore {
    async fn insert_user(&self, user: NewUser) -> StoreResult<UserRecord> {
        let row: UserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO users (id, name, email, password_hash)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.password.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_users(&self, page: Page) -> StoreResult<Vec<UserRecord>> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {USER_COLUMNS} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2"
        ))
        .bind(page.take())
        .bind(page.skip())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_user(&self, id: Uuid) -> StoreResult<Option<UserRecord>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    async fn find_user_by_email(&self, email: &str) -> StoreResult<Option<UserRecord>> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;

        Ok(row.map(Into::into))
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> StoreResult<Option<UserRecord>> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            r#"
            UPDATE users
            SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                password_hash = COALESCE($4, password_hash),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.email)
        .bind(changes.password.as_ref().map(PasswordDigest::as_str))
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_user(&self, id: Uuid, policy: DeletePolicy) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        if policy == DeletePolicy::Cascade {
            let transactions = sqlx::query(
                r#"
                DELETE FROM transactions
                WHERE bank_account_id IN (SELECT id FROM bank_accounts WHERE user_id = $1)
                "#,
            )
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            let accounts = sqlx::query("DELETE FROM bank_accounts WHERE user_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

            tracing::debug!(
                user_id = %id,
                bank_accounts = accounts,
                transactions = transactions,
                "Cascading user delete"
            );
        }

        let deleted = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted > 0)
    }
}

// =========================================================================
// Categories
// =========================================================================

#[async_trait]
impl CategoryStore for PostgresStore {
    async fn insert_category(&self, category: NewCategory) -> StoreResult<Category> {
        let row: CategoryRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO categories (id, name, color, description)
            VALUES ($1, $2, $3, $4)
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(&category.name)
        .bind(&category.color)
        .bind(&category.description)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_categories(&self, page: Page) -> StoreResult<Vec<Category>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY created_at, id LIMIT $1 OFFSET $2"
        ))
        .bind(page.take())
        .bind(page.skip())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_category(&self, id: Uuid) -> StoreResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_category(
        &self,
        id: Uuid,
        changes: CategoryChanges,
    ) -> StoreResult<Option<Category>> {
        let row: Option<CategoryRow> = sqlx::query_as(&format!(
            r#"
            UPDATE categories
            SET
                name = COALESCE($2, name),
                color = COALESCE($3, color),
                description = COALESCE($4, description),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {CATEGORY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.name)
        .bind(changes.color)
        .bind(changes.description)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_category(&self, id: Uuid, policy: DeletePolicy) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        if policy == DeletePolicy::Cascade {
            sqlx::query("DELETE FROM transactions WHERE category_id = $1")
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let deleted = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted > 0)
    }
}

// =========================================================================
// Bank accounts
// =========================================================================

#[async_trait]
impl BankAccountStore for PostgresStore {
    async fn insert_bank_account(
        &self,
        user_id: Uuid,
        account: NewBankAccount,
    ) -> StoreResult<BankAccount> {
        let row: BankAccountRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO bank_accounts
                (id, user_id, name, api_token, account_status, connection_status)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {BANK_ACCOUNT_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(&account.name)
        .bind(&account.api_token)
        .bind(&account.account_status)
        .bind(&account.connection_status)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn list_bank_accounts(&self, user_id: Uuid) -> StoreResult<Vec<BankAccount>> {
        let rows: Vec<BankAccountRow> = sqlx::query_as(&format!(
            "SELECT {BANK_ACCOUNT_COLUMNS} FROM bank_accounts WHERE user_id = $1 ORDER BY created_at, id"
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn bank_account_ids_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT id FROM bank_accounts WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn find_bank_account(
        &self,
        user_id: Uuid,
        id: Uuid,
    ) -> StoreResult<Option<BankAccount>> {
        let row: Option<BankAccountRow> = sqlx::query_as(&format!(
            "SELECT {BANK_ACCOUNT_COLUMNS} FROM bank_accounts WHERE id = $1 AND user_id = $2"
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_bank_account(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: BankAccountChanges,
    ) -> StoreResult<Option<BankAccount>> {
        let row: Option<BankAccountRow> = sqlx::query_as(&format!(
            r#"
            UPDATE bank_accounts
            SET
                name = COALESCE($3, name),
                api_token = COALESCE($4, api_token),
                account_status = COALESCE($5, account_status),
                connection_status = COALESCE($6, connection_status),
                updated_at = NOW()
            WHERE id = $1 AND user_id = $2
            RETURNING {BANK_ACCOUNT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(user_id)
        .bind(changes.name)
        .bind(changes.api_token)
        .bind(changes.account_status)
        .bind(changes.connection_status)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn delete_bank_account(
        &self,
        user_id: Uuid,
        id: Uuid,
        policy: DeletePolicy,
    ) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        if policy == DeletePolicy::Cascade {
            cascade_account_transactions(&mut tx, user_id, id).await?;
        }

        let deleted = sqlx::query("DELETE FROM bank_accounts WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        tx.commit().await?;

        Ok(deleted > 0)
    }
}

/// Remove the transactions of one owned bank account.
async fn cascade_account_transactions(
    tx: &mut PgTransaction<'_, Postgres>,
    user_id: Uuid,
    bank_account_id: Uuid,
) -> StoreResult<u64> {
    let deleted = sqlx::query(
        r#"
        DELETE FROM transactions
        WHERE bank_account_id = $1
          AND EXISTS (SELECT 1 FROM bank_accounts WHERE id = $1 AND user_id = $2)
        "#,
    )
    .bind(bank_account_id)
    .bind(user_id)
    .execute(&mut **tx)
    .await?
    .rows_affected();

    Ok(deleted)
}

// =========================================================================
// Transactions
// =========================================================================

#[async_trait]
impl TransactionStore for PostgresStore {
    async fn insert_transaction(
        &self,
        transaction: NewTransaction,
    ) -> StoreResult<TransactionWithCategory> {
        let sql = format!(
            r#"
            WITH inserted AS (
                INSERT INTO transactions
                    (id, bank_account_id, category_id, name, transaction_date, amount, transaction_type)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                RETURNING *
            )
            {}
            "#,
            transaction_select("inserted")
        );

        let row: TransactionRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(transaction.bank_account_id)
            .bind(transaction.category_id)
            .bind(&transaction.name)
            .bind(transaction.date)
            .bind(transaction.amount.value())
            .bind(transaction.transaction_type.as_str())
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn list_transactions(&self, page: Page) -> StoreResult<Vec<TransactionWithCategory>> {
        let sql = format!(
            "{} ORDER BY t.transaction_date DESC, t.created_at DESC LIMIT $1 OFFSET $2",
            transaction_select("transactions")
        );

        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(page.take())
            .bind(page.skip())
            .fetch_all(&self.pool)
            .await?;

        into_transactions(rows)
    }

    async fn list_transactions_for_accounts(
        &self,
        bank_account_ids: &[Uuid],
        page: Page,
    ) -> StoreResult<Vec<TransactionWithCategory>> {
        let sql = format!(
            r#"
            {}
            WHERE t.bank_account_id = ANY($1)
            ORDER BY t.transaction_date DESC, t.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
            transaction_select("transactions")
        );

        let rows: Vec<TransactionRow> = sqlx::query_as(&sql)
            .bind(bank_account_ids)
            .bind(page.take())
            .bind(page.skip())
            .fetch_all(&self.pool)
            .await?;

        into_transactions(rows)
    }

    async fn find_transaction(&self, id: Uuid) -> StoreResult<Option<TransactionWithCategory>> {
        let sql = format!("{} WHERE t.id = $1", transaction_select("transactions"));

        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryFrom::try_from).transpose()
    }

    async fn update_transaction(
        &self,
        id: Uuid,
        changes: TransactionChanges,
    ) -> StoreResult<Option<TransactionWithCategory>> {
        let sql = format!(
            r#"
            WITH updated AS (
                UPDATE transactions
                SET
                    bank_account_id = COALESCE($2, bank_account_id),
                    category_id = COALESCE($3, category_id),
                    name = COALESCE($4, name),
                    transaction_date = COALESCE($5, transaction_date),
                    amount = COALESCE($6, amount),
                    transaction_type = COALESCE($7, transaction_type),
                    updated_at = NOW()
                WHERE id = $1
                RETURNING *
            )
            {}
            "#,
            transaction_select("updated")
        );

        let row: Option<TransactionRow> = sqlx::query_as(&sql)
            .bind(id)
            .bind(changes.bank_account_id)
            .bind(changes.category_id)
            .bind(changes.name)
            .bind(changes.date)
            .bind(changes.amount.map(|amount| amount.value()))
            .bind(changes.transaction_type.map(|kind| kind.as_str()))
            .fetch_optional(&self.pool)
            .await?;

        row.map(TryFrom::try_from).transpose()
    }

    async fn delete_transaction(&self, id: Uuid) -> StoreResult<bool> {
        let deleted = sqlx::query("DELETE FROM transactions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}
