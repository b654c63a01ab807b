//! Domain module
//!
//! Entity types, value objects and the service error kinds.

pub mod amount;
pub mod bank_account;
pub mod category;
pub mod credentials;
pub mod error;
pub mod pagination;
pub mod transaction;
pub mod user;

pub use amount::{Amount, AmountError};
pub use bank_account::{BankAccount, BankAccountChanges, NewBankAccount};
pub use category::{Category, CategoryChanges, NewCategory};
pub use credentials::{CredentialError, Password, PasswordDigest};
pub use error::{ServiceError, ServiceResult};
pub use pagination::Page;
pub use transaction::{
    parse_transaction_date, InvalidDate, NewTransaction, Transaction, TransactionChanges,
    TransactionType, TransactionWithCategory,
};
pub use user::{NewUser, User, UserChanges, UserRecord};
