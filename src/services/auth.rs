//! Authentication entry point
//!
//! Looks a user up by email and verifies the password against the stored
//! digest. Unknown email and wrong password surface as the same
//! [`ServiceError::Unauthorized`]. A digest the primitive cannot read is a
//! [`ServiceError::CredentialValidationError`].

use std::sync::OnceLock;

use crate::domain::credentials::verify_password;
use crate::domain::{Password, PasswordDigest, ServiceError, ServiceResult, User};
use crate::store::DynUserStore;

use super::users::normalize_email;

/// Digest verified against when the email is unknown, so a miss costs one
/// Argon2 run just like a hit.
fn decoy_digest() -> Option<&'static PasswordDigest> {
    static DECOY: OnceLock<Option<PasswordDigest>> = OnceLock::new();
    DECOY
        .get_or_init(|| PasswordDigest::hash(&Password::new("decoy password")).ok())
        .as_ref()
}

#[derive(Clone)]
pub struct AuthService {
    users: DynUserStore,
}

impl AuthService {
    pub fn new(users: DynUserStore) -> Self {
        Self { users }
    }

    pub async fn authenticate(&self, email: &str, password: Password) -> ServiceResult<User> {
        let email = normalize_email(email);

        let Some(user) = self.users.find_user_by_email(&email).await? else {
            let _ = tokio::task::spawn_blocking(move || {
                if let Some(decoy) = decoy_digest() {
                    let _ = decoy.verify(password.as_str());
                }
            })
            .await;
            tracing::warn!("Login failed: unknown email");
            return Err(ServiceError::Unauthorized);
        };

        match verify_password(password, user.password.clone()).await {
            Ok(true) => {
                tracing::info!(user_id = %user.id, "Login succeeded");
                Ok(user.into())
            }
            Ok(false) => {
                tracing::warn!(user_id = %user.id, "Login failed: wrong password");
                Err(ServiceError::Unauthorized)
            }
            Err(e) => {
                tracing::error!(user_id = %user.id, error = %e, "Stored password digest unusable");
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewUser;
    use crate::store::{MemoryStore, UserStore};
    use std::sync::Arc;

    async fn service_with_user() -> (AuthService, User) {
        let store = Arc::new(MemoryStore::new());
        let digest = PasswordDigest::hash(&Password::new("s3cret-pass")).unwrap();
        let user = store
            .insert_user(NewUser {
                name: "Carol".to_string(),
                email: "carol@example.com".to_string(),
                password: digest,
            })
            .await
            .unwrap();
        (AuthService::new(store), user.into())
    }

    #[tokio::test]
    async fn test_authenticate_success() {
        let (auth, user) = service_with_user().await;

        let authenticated = auth
            .authenticate("Carol@Example.com", Password::new("s3cret-pass"))
            .await
            .unwrap();
        assert_eq!(authenticated, user);
    }

    #[tokio::test]
    async fn test_wrong_password_and_unknown_email_are_indistinguishable() {
        let (auth, _) = service_with_user().await;

        let wrong_password = auth
            .authenticate("carol@example.com", Password::new("nope-nope"))
            .await
            .unwrap_err();
        let unknown_email = auth
            .authenticate("nobody@example.com", Password::new("s3cret-pass"))
            .await
            .unwrap_err();

        assert!(matches!(wrong_password, ServiceError::Unauthorized));
        assert!(matches!(unknown_email, ServiceError::Unauthorized));
        assert_eq!(wrong_password.to_string(), unknown_email.to_string());
    }

    #[tokio::test]
    async fn test_malformed_digest_is_credential_validation_error() {
        let store = Arc::new(MemoryStore::new());
        store
            .insert_user(NewUser {
                name: "Dave".to_string(),
                email: "dave@example.com".to_string(),
                password: PasswordDigest::from_stored("not-a-phc-string".to_string()),
            })
            .await
            .unwrap();
        let auth = AuthService::new(store);

        let result = auth
            .authenticate("dave@example.com", Password::new("whatever1"))
            .await;
        assert!(matches!(
            result,
            Err(ServiceError::CredentialValidationError(_))
        ));
    }
}
