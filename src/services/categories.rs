//! Category Registry

use uuid::Uuid;

use crate::domain::{Category, CategoryChanges, NewCategory, Page, ServiceError, ServiceResult};
use crate::store::{DeletePolicy, DynCategoryStore, StoreError};

#[derive(Clone)]
pub struct CategoryService {
    store: DynCategoryStore,
    delete_policy: DeletePolicy,
}

impl CategoryService {
    pub fn new(store: DynCategoryStore, delete_policy: DeletePolicy) -> Self {
        Self {
            store,
            delete_policy,
        }
    }

    pub async fn create(&self, category: NewCategory) -> ServiceResult<Category> {
        let category = self.store.insert_category(category).await.map_err(|e| match e {
            StoreError::UniqueViolation { .. } => ServiceError::DuplicateEntry("category"),
            other => other.into(),
        })?;

        tracing::info!(category_id = %category.id, name = %category.name, "Category created");

        Ok(category)
    }

    pub async fn list(&self, page: Page) -> ServiceResult<Vec<Category>> {
        Ok(self.store.list_categories(page).await?)
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<Category> {
        self.store
            .find_category(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    pub async fn update(&self, id: Uuid, changes: CategoryChanges) -> ServiceResult<Category> {
        self.get(id).await?;

        self.store
            .update_category(id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("category", id))
    }

    pub async fn remove(&self, id: Uuid) -> ServiceResult<()> {
        self.get(id).await?;

        let deleted = self
            .store
            .delete_category(id, self.delete_policy)
            .await
            .map_err(|e| match e {
                StoreError::ForeignKeyViolation { .. } => {
                    ServiceError::has_dependents("category", id)
                }
                other => other.into(),
            })?;

        if !deleted {
            return Err(ServiceError::not_found("category", id));
        }

        tracing::info!(category_id = %id, "Category removed");

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        Amount, NewBankAccount, NewTransaction, NewUser, PasswordDigest, TransactionType,
    };
    use crate::store::{BankAccountStore, MemoryStore, TransactionStore, UserStore};
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn groceries() -> NewCategory {
        NewCategory {
            name: "Groceries".to_string(),
            color: "#22aa22".to_string(),
            description: "Food and household".to_string(),
        }
    }

    #[tokio::test]
    async fn test_category_crud() {
        let service = CategoryService::new(Arc::new(MemoryStore::new()), DeletePolicy::Restrict);

        let created = service.create(groceries()).await.unwrap();
        assert_eq!(service.get(created.id).await.unwrap(), created);

        let updated = service
            .update(
                created.id,
                CategoryChanges {
                    color: Some("#0000ff".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.color, "#0000ff");
        assert_eq!(updated.name, "Groceries");
        assert_eq!(updated.description, "Food and household");

        service.remove(created.id).await.unwrap();
        assert!(matches!(
            service.get(created.id).await,
            Err(ServiceError::NotFound { entity: "category", .. })
        ));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let service = CategoryService::new(Arc::new(MemoryStore::new()), DeletePolicy::Restrict);
        for _ in 0..3 {
            service.create(groceries()).await.unwrap();
        }

        assert_eq!(service.list(Page::new(0, 2)).await.unwrap().len(), 2);
        assert_eq!(service.list(Page::new(2, 2)).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_category() {
        let service = CategoryService::new(Arc::new(MemoryStore::new()), DeletePolicy::Restrict);
        let id = Uuid::new_v4();

        assert!(matches!(
            service.update(id, CategoryChanges::default()).await,
            Err(ServiceError::NotFound { .. })
        ));
        assert!(matches!(service.remove(id).await, Err(ServiceError::NotFound { .. })));
    }

    /// Category with one transaction filed under it; returns (category, transaction)
    async fn seed_filed_transaction(
        store: &MemoryStore,
        service: &CategoryService,
    ) -> (Uuid, Uuid) {
        let user = store
            .insert_user(NewUser {
                name: "Erin".to_string(),
                email: "erin@example.com".to_string(),
                password: PasswordDigest::from_stored("$argon2id$x".to_string()),
            })
            .await
            .unwrap();
        let account = store
            .insert_bank_account(
                user.id,
                NewBankAccount {
                    name: "Savings".to_string(),
                    api_token: "tok".to_string(),
                    account_status: "active".to_string(),
                    connection_status: "connected".to_string(),
                },
            )
            .await
            .unwrap();
        let category = service.create(groceries()).await.unwrap();
        let transaction = store
            .insert_transaction(NewTransaction {
                bank_account_id: account.id,
                category_id: category.id,
                name: "Weekly shop".to_string(),
                date: Utc::now(),
                amount: Amount::new(dec!(-54.20)).unwrap(),
                transaction_type: TransactionType::Expense,
            })
            .await
            .unwrap();
        (category.id, transaction.transaction.id)
    }

    #[tokio::test]
    async fn test_remove_restricted_by_transactions() {
        let store = Arc::new(MemoryStore::new());
        let service = CategoryService::new(store.clone(), DeletePolicy::Restrict);
        let (category_id, transaction_id) = seed_filed_transaction(&store, &service).await;

        assert!(matches!(
            service.remove(category_id).await,
            Err(ServiceError::HasDependents { entity: "category", .. })
        ));
        assert!(service.get(category_id).await.is_ok());
        assert!(store.find_transaction(transaction_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_remove_cascades_to_transactions() {
        let store = Arc::new(MemoryStore::new());
        let service = CategoryService::new(store.clone(), DeletePolicy::Cascade);
        let (category_id, transaction_id) = seed_filed_transaction(&store, &service).await;

        service.remove(category_id).await.unwrap();

        assert!(matches!(service.get(category_id).await, Err(ServiceError::NotFound { .. })));
        assert!(store.find_transaction(transaction_id).await.unwrap().is_none());
    }
}
