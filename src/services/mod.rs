//! Entity services
//!
//! One service per entity, each holding the gateway handles it needs. The
//! services own validation that depends on stored state, credential hashing,
//! and the translation of store errors into [`ServiceError`] kinds.
//!
//! [`ServiceError`]: crate::domain::ServiceError

mod auth;
mod bank_accounts;
mod categories;
mod transactions;
mod users;

pub use auth::AuthService;
pub use bank_accounts::BankAccountService;
pub use categories::CategoryService;
pub use transactions::{TransactionInput, TransactionService, TransactionUpdate};
pub use users::{normalize_email, UserService, UserUpdate};

use crate::store::{DeletePolicy, Gateway};

/// Every service wired over one gateway.
#[derive(Clone)]
pub struct Services {
    pub auth: AuthService,
    pub users: UserService,
    pub categories: CategoryService,
    pub bank_accounts: BankAccountService,
    pub transactions: TransactionService,
}

impl Services {
    pub fn new(gateway: Gateway, delete_policy: DeletePolicy) -> Self {
        Self {
            auth: AuthService::new(gateway.users.clone()),
            users: UserService::new(gateway.users.clone(), delete_policy),
            categories: CategoryService::new(gateway.categories.clone(), delete_policy),
            bank_accounts: BankAccountService::new(
                gateway.users.clone(),
                gateway.bank_accounts.clone(),
                delete_policy,
            ),
            transactions: TransactionService::new(gateway.bank_accounts, gateway.transactions),
        }
    }
}
