//! Bank Account Registry
//!
//! Every operation is scoped by the owning user. A bank account that exists
//! but belongs to someone else is reported as `NotFound`, same as one that
//! does not exist at all.

use uuid::Uuid;

use crate::domain::{BankAccount, BankAccountChanges, NewBankAccount, ServiceError, ServiceResult};
use crate::store::{DeletePolicy, DynBankAccountStore, DynUserStore, StoreError};

#[derive(Clone)]
pub struct BankAccountService {
    users: DynUserStore,
    accounts: DynBankAccountStore,
    delete_policy: DeletePolicy,
}

impl BankAccountService {
    pub fn new(
        users: DynUserStore,
        accounts: DynBankAccountStore,
        delete_policy: DeletePolicy,
    ) -> Self {
        Self {
            users,
            accounts,
            delete_policy,
        }
    }

    pub async fn create(
        &self,
        user_id: Uuid,
        account: NewBankAccount,
    ) -> ServiceResult<BankAccount> {
        if self.users.find_user(user_id).await?.is_none() {
            return Err(ServiceError::not_found("user", user_id));
        }

        let account = self
            .accounts
            .insert_bank_account(user_id, account)
            .await
            .map_err(|e| match e {
                // The user was removed between the check and the insert
                StoreError::ForeignKeyViolation { .. } => ServiceError::not_found("user", user_id),
                StoreError::UniqueViolation { .. } => ServiceError::DuplicateEntry("bank account"),
                other => other.into(),
            })?;

        tracing::info!(user_id = %user_id, bank_account_id = %account.id, "Bank account created");

        Ok(account)
    }

    pub async fn list(&self, user_id: Uuid) -> ServiceResult<Vec<BankAccount>> {
        Ok(self.accounts.list_bank_accounts(user_id).await?)
    }

    pub async fn get(&self, user_id: Uuid, id: Uuid) -> ServiceResult<BankAccount> {
        self.accounts
            .find_bank_account(user_id, id)
            .await?
            .ok_or_else(|| ServiceError::not_found("bank account", id))
    }

    pub async fn update(
        &self,
        user_id: Uuid,
        id: Uuid,
        changes: BankAccountChanges,
    ) -> ServiceResult<BankAccount> {
        self.get(user_id, id).await?;

        self.accounts
            .update_bank_account(user_id, id, changes)
            .await?
            .ok_or_else(|| ServiceError::not_found("bank account", id))
    }

    pub async fn remove(&self, user_id: Uuid, id: Uuid) -> ServiceResult<()> {
        self.get(user_id, id).await?;

        let deleted = self
            .accounts
            .delete_bank_account(user_id, id, self.delete_policy)
            .await
            .map_err(|e| match e {
                StoreError::ForeignKeyViolation { .. } => {
                    ServiceError::has_dependents("bank account", id)
                }
                other => other.into(),
            })?;

        if !deleted {
            return Err(ServiceError::not_found("bank account", id));
        }

        tracing::info!(user_id = %user_id, bank_account_id = %id, "Bank account removed");

        Ok(())
    }
}
