//! User Directory

use uuid::Uuid;

use crate::domain::credentials::hash_password;
use crate::domain::{
    NewUser, Page, Password, ServiceError, ServiceResult, User, UserChanges, UserRecord,
};
use crate::store::{DeletePolicy, DynUserStore, StoreError};

/// Emails are compared case-insensitively; they are stored trimmed and
/// lower-cased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Partial user update as received from a caller. The password, when
/// present, is still plaintext here.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<Password>,
}

#[derive(Clone)]
pub struct UserService {
    store: DynUserStore,
    delete_policy: DeletePolicy,
}

impl UserService {
    pub fn new(store: DynUserStore, delete_policy: DeletePolicy) -> Self {
        Self {
            store,
            delete_policy,
        }
    }

    /// Hash the password and register the user.
    pub async fn create(
        &self,
        name: String,
        email: String,
        password: Password,
    ) -> ServiceResult<User> {
        let email = normalize_email(&email);
        let password = hash_password(password).await?;

        let user = self
            .store
            .insert_user(NewUser {
                name,
                email: email.clone(),
                password,
            })
            .await
            .map_err(|e| email_conflict(e, &email))?;

        tracing::info!(user_id = %user.id, "User created");

        Ok(user.into())
    }

    pub async fn list(&self, page: Page) -> ServiceResult<Vec<User>> {
        let users = self.store.list_users(page).await?;
        Ok(users.into_iter().map(User::from).collect())
    }

    pub async fn get(&self, id: Uuid) -> ServiceResult<User> {
        self.fetch(id).await.map(User::from)
    }

    /// Full record including the digest; only the authentication entry point
    /// should need this.
    pub async fn find_by_email(&self, email: &str) -> ServiceResult<Option<UserRecord>> {
        Ok(self.store.find_user_by_email(&normalize_email(email)).await?)
    }

    pub async fn update(&self, id: Uuid, update: UserUpdate) -> ServiceResult<User> {
        self.fetch(id).await?;

        let password = match update.password {
            Some(password) => Some(hash_password(password).await?),
            None => None,
        };
        let email = update.email.as_deref().map(normalize_email);

        let changes = UserChanges {
            name: update.name,
            email: email.clone(),
            password,
        };

        let updated = self
            .store
            .update_user(id, changes)
            .await
            .map_err(|e| email_conflict(e, email.as_deref().unwrap_or_default()))?
            .ok_or_else(|| ServiceError::not_found("user", id))?;

        tracing::info!(user_id = %id, "User updated");

        Ok(updated.into())
    }

    pub async fn remove(&self, id: Uuid) -> ServiceResult<()> {
        self.fetch(id).await?;

        let deleted = self
            .store
            .delete_user(id, self.delete_policy)
            .await
            .map_err(|e| match e {
                StoreError::ForeignKeyViolation { .. } => ServiceError::has_dependents("user", id),
                other => other.into(),
            })?;

        if !deleted {
            return Err(ServiceError::not_found("user", id));
        }

        tracing::info!(user_id = %id, policy = %self.delete_policy, "User removed");

        Ok(())
    }

    async fn fetch(&self, id: Uuid) -> ServiceResult<UserRecord> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ServiceError::not_found("user", id))
    }
}

fn email_conflict(error: StoreError, email: &str) -> ServiceError {
    match error {
        StoreError::UniqueViolation { .. } => ServiceError::DuplicateEmail(email.to_string()),
        other => other.into(),
    }
}
