//! Shared router state

use axum::extract::FromRef;

use crate::services::{
    AuthService, BankAccountService, CategoryService, Services, TransactionService, UserService,
};
use crate::store::{DeletePolicy, Gateway};

#[derive(Clone)]
pub struct AppState {
    services: Services,
}

impl AppState {
    pub fn new(gateway: Gateway, delete_policy: DeletePolicy) -> Self {
        Self {
            services: Services::new(gateway, delete_policy),
        }
    }
}

impl FromRef<AppState> for AuthService {
    fn from_ref(state: &AppState) -> Self {
        state.services.auth.clone()
    }
}

impl FromRef<AppState> for UserService {
    fn from_ref(state: &AppState) -> Self {
        state.services.users.clone()
    }
}

impl FromRef<AppState> for CategoryService {
    fn from_ref(state: &AppState) -> Self {
        state.services.categories.clone()
    }
}

impl FromRef<AppState> for BankAccountService {
    fn from_ref(state: &AppState) -> Self {
        state.services.bank_accounts.clone()
    }
}

impl FromRef<AppState> for TransactionService {
    fn from_ref(state: &AppState) -> Self {
        state.services.transactions.clone()
    }
}
