//! Transaction Ledger
//!
//! Dates arrive as ISO-8601 strings and are converted here, before any store
//! call. Every read returns the transaction with its category joined in.

use uuid::Uuid;

use crate::domain::{
    parse_transaction_date, Amount, NewTransaction, Page, ServiceError, ServiceResult,
    TransactionChanges, TransactionType, TransactionWithCategory,
};
use crate::store::{DynBankAccountStore, DynTransactionStore, StoreError};

/// Fields of a new transaction as received from a caller.
#[derive(Debug, Clone)]
pub struct TransactionInput {
    pub bank_account_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub date: String,
    pub amount: Amount,
    pub transaction_type: TransactionType,
}

/// Partial transaction update as received from a caller.
#[derive(Debug, Clone, Default)]
pub struct TransactionUpdate {
    pub bank_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub date: Option<String>,
    pub amount: Option<Amount>,
    pub transaction_type: Option<TransactionType>,
}

#[derive(Clone)]
pub struct TransactionService {
    accounts: DynBankAccountStore,
    store: DynTransactionStore,
}

impl TransactionService {
    pub fn new(accounts: DynBankAccountStore, store: DynTransactionStore) -> Self {
        Self { accounts, store }
    }

    pub async fn create(&self, input: TransactionInput) -> ServiceResult<TransactionWithCategory> {
        let date = parse_transaction_date(&input.date)?;

        let transaction = self
            .store
            .insert_transaction(NewTransaction {
                bank_account_id: input.bank_account_id,
                category_id: input.category_id,
                name: input.name,
                date,
                amount: input.amount,
                transaction_type: input.transaction_type,
            })
            .await
            .map_err(write_error)?;

        tracing::info!(
            transaction_id = %transaction.transaction.id,
            bank_account_id = %transaction.transaction.bank_account_id,
            amount = %transaction.transaction.amount,
            "Transaction recorded"
        );

        Ok(transaction)
    }

    pub async fn list(&self, page: Page) -> ServiceResult<Vec<TransactionWithCategory>> {
        Ok(self.store.list_transactions(page).await?)
    }

    /// Transactions on any bank account owned by `user_id`, newest first.
    pub async fn find_by_user(
        &self,
        user_id: Uuid,
        page: Page,
    ) -> ServiceResult<Vec<TransactionWithCategory>> {
        let account_ids = self.accounts.bank_account_ids_for_user(user_id).await?;
        if account_ids.is_empty() {
            return Ok(Vec::new());
        }

        Ok(self
            .store
            .list_transactions_for_accounts(&account_ids, page)
            .await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<TransactionWithCategory> {
        self.store
            .find_transaction(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("transaction", id))
    }

    pub async fn update(
        &self,
        id: Uuid,
        update: TransactionUpdate,
    ) -> ServiceResult<TransactionWithCategory> {
        self.get(id).await?;

        let date = update
            .date
            .as_deref()
            .map(parse_transaction_date)
            .transpose()?;

        let changes = TransactionChanges {
            bank_account_id: update.bank_account_id,
            category_id: update.category_id,
            name: update.name,
            date,
            amount: update.amount,
            transaction_type: update.transaction_type,
        };

        self.store
            .update_transaction(id, changes)
            .await
            .map_err(write_error)?
            .ok_or_else(|| ServiceError::not_found("transaction", id))
    }

    pub async fn remove(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?;

        if !self.store.delete_transaction(id).await? {
            return Err(ServiceError::not_found("transaction", id));
        }

        tracing::info!(transaction_id = %id, "Transaction removed");

        Ok(())
    }
}

fn write_error(error: StoreError) -> ServiceError {
    match error {
        StoreError::UniqueViolation { .. } => ServiceError::DuplicateEntry("transaction"),
        StoreError::ForeignKeyViolation { constraint } => {
            let target = match constraint.as_deref() {
                Some(name) if name.contains("category") => "category",
                Some(name) if name.contains("bank_account") => "bank account",
                _ => "category or bank account",
            };
            ServiceError::InvalidReference(target)
        }
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{BankAccount, Category, NewBankAccount, NewCategory, NewUser, PasswordDigest};
    use crate::store::{BankAccountStore, CategoryStore, MemoryStore, UserStore};
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    struct Fixture {
        service: TransactionService,
        store: Arc<MemoryStore>,
        category: Category,
    }

    impl Fixture {
        async fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let category = store
                .insert_category(NewCategory {
                    name: "Groceries".to_string(),
                    color: "#00ff00".to_string(),
                    description: String::new(),
                })
                .await
                .unwrap();
            let service = TransactionService::new(store.clone(), store.clone());
            Self {
                service,
                store,
                category,
            }
        }

        async fn user(&self, email: &str) -> Uuid {
            self.store
                .insert_user(NewUser {
                    name: "User".to_string(),
                    email: email.to_string(),
                    password: PasswordDigest::from_stored("$argon2id$x".to_string()),
                })
                .await
                .unwrap()
                .id
        }

        async fn account(&self, user_id: Uuid) -> BankAccount {
            self.store
                .insert_bank_account(
                    user_id,
                    NewBankAccount {
                        name: "Checking".to_string(),
                        api_token: "tok".to_string(),
                        account_status: "active".to_string(),
                        connection_status: "connected".to_string(),
                    },
                )
                .await
                .unwrap()
        }

        fn input(&self, account: &BankAccount, name: &str, date: &str) -> TransactionInput {
            TransactionInput {
                bank_account_id: account.id,
                category_id: self.category.id,
                name: name.to_string(),
                date: date.to_string(),
                amount: Amount::new(dec!(-42.50)).unwrap(),
                transaction_type: TransactionType::Expense,
            }
        }
    }

    #[tokio::test]
    async fn test_create_converts_date_and_joins_category() {
        let fx = Fixture::new().await;
        let account = fx.account(fx.user("a@example.com").await).await;

        let created = fx
            .service
            .create(fx.input(&account, "Market", "2024-03-01T12:30:00+01:00"))
            .await
            .unwrap();

        assert_eq!(
            created.transaction.date,
            Utc.with_ymd_and_hms(2024, 3, 1, 11, 30, 0).unwrap()
        );
        assert_eq!(created.category, fx.category);
        assert_eq!(fx.service.get(created.transaction.id).await.unwrap(), created);
    }

    #[tokio::test]
    async fn test_create_rejects_bad_date() {
        let fx = Fixture::new().await;
        let account = fx.account(fx.user("a@example.com").await).await;

        let result = fx.service.create(fx.input(&account, "Market", "yesterday")).await;
        assert!(matches!(result, Err(ServiceError::InvalidDate(_))));
        assert!(fx.service.list(Page::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_create_with_unknown_category() {
        let fx = Fixture::new().await;
        let account = fx.account(fx.user("a@example.com").await).await;

        let mut input = fx.input(&account, "Market", "2024-03-01");
        input.category_id = Uuid::new_v4();

        let result = fx.service.create(input).await;
        assert!(matches!(result, Err(ServiceError::InvalidReference("category"))));
    }

    #[tokio::test]
    async fn test_find_by_user_without_accounts_is_empty() {
        let fx = Fixture::new().await;
        let user = fx.user("a@example.com").await;

        let found = fx.service.find_by_user(user, Page::default()).await.unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn test_find_by_user_only_own_transactions_newest_first() {
        let fx = Fixture::new().await;
        let alice = fx.user("alice@example.com").await;
        let bob = fx.user("bob@example.com").await;
        let alice_checking = fx.account(alice).await;
        let alice_savings = fx.account(alice).await;
        let bob_checking = fx.account(bob).await;

        for (account, name, date) in [
            (&alice_checking, "oldest", "2024-01-01"),
            (&alice_savings, "newest", "2024-03-01"),
            (&alice_checking, "middle", "2024-02-01"),
            (&bob_checking, "bob's", "2024-02-15"),
        ] {
            fx.service.create(fx.input(account, name, date)).await.unwrap();
        }

        let found = fx.service.find_by_user(alice, Page::default()).await.unwrap();
        let names: Vec<&str> = found.iter().map(|t| t.transaction.name.as_str()).collect();
        assert_eq!(names, vec!["newest", "middle", "oldest"]);

        let paged = fx.service.find_by_user(alice, Page::new(1, 1)).await.unwrap();
        assert_eq!(paged.len(), 1);
        assert_eq!(paged[0].transaction.name, "middle");
    }

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let fx = Fixture::new().await;
        let account = fx.account(fx.user("a@example.com").await).await;
        let created = fx
            .service
            .create(fx.input(&account, "Market", "2024-03-01"))
            .await
            .unwrap();

        let updated = fx
            .service
            .update(
                created.transaction.id,
                TransactionUpdate {
                    name: Some("Farmers market".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.transaction.name, "Farmers market");
        assert_eq!(updated.transaction.date, created.transaction.date);
        assert_eq!(updated.transaction.amount, created.transaction.amount);
        assert_eq!(
            updated.transaction.transaction_type,
            created.transaction.transaction_type
        );
        assert_eq!(updated.transaction.category_id, created.transaction.category_id);
        assert_eq!(
            updated.transaction.bank_account_id,
            created.transaction.bank_account_id
        );
    }

    #[tokio::test]
    async fn test_update_date_is_converted() {
        let fx = Fixture::new().await;
        let account = fx.account(fx.user("a@example.com").await).await;
        let created = fx
            .service
            .create(fx.input(&account, "Market", "2024-03-01"))
            .await
            .unwrap();

        let updated = fx
            .service
            .update(
                created.transaction.id,
                TransactionUpdate {
                    date: Some("2024-04-15".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(
            updated.transaction.date,
            Utc.with_ymd_and_hms(2024, 4, 15, 0, 0, 0).unwrap()
        );
    }

    #[tokio::test]
    async fn test_missing_transaction() {
        let fx = Fixture::new().await;
        let id = Uuid::new_v4();

        assert!(matches!(fx.service.get(id).await, Err(ServiceError::NotFound { .. })));
        assert!(matches!(
            fx.service.update(id, TransactionUpdate::default()).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(fx.service.remove(id).await, Err(ServiceError::NotFound { .. })));
    }

    #[test]
    fn test_foreign_key_target_from_constraint() {
        let err = write_error(StoreError::ForeignKeyViolation {
            constraint: Some("transactions_bank_account_id_fkey".to_string()),
        });
        assert!(matches!(err, ServiceError::InvalidReference("bank account")));

        let err = write_error(StoreError::UniqueViolation { constraint: None });
        assert!(matches!(err, ServiceError::DuplicateEntry("transaction")));
    }
}
