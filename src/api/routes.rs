//! API Routes
//!
//! HTTP endpoint definitions. Request bodies are checked for shape here;
//! everything that depends on stored state is left to the services.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::{
    Amount, BankAccount, BankAccountChanges, Category, CategoryChanges, NewBankAccount,
    NewCategory, Page, Password, TransactionType, TransactionWithCategory, User,
};
use crate::error::{AppError, AppResult};
use crate::services::{
    AuthService, BankAccountService, CategoryService, TransactionInput, TransactionService,
    TransactionUpdate, UserService, UserUpdate,
};

use super::AppState;

pub const MIN_PASSWORD_LENGTH: usize = 8;
pub const MAX_PASSWORD_LENGTH: usize = 512;

// =========================================================================
// Validation
// =========================================================================

fn validate_name(field: &str, value: &str) -> AppResult<()> {
    if value.trim().is_empty() {
        return Err(AppError::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}

fn validate_email(email: &str) -> AppResult<()> {
    let valid = match email.trim().split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.trim().contains(char::is_whitespace)
        }
        None => false,
    };

    if !valid {
        return Err(AppError::InvalidRequest(format!(
            "'{email}' is not a valid email address"
        )));
    }
    Ok(())
}

fn validate_password(password: &Password) -> AppResult<()> {
    let length = password.char_count();
    if !(MIN_PASSWORD_LENGTH..=MAX_PASSWORD_LENGTH).contains(&length) {
        return Err(AppError::InvalidRequest(format!(
            "password must be between {MIN_PASSWORD_LENGTH} and {MAX_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

fn validate_optional_name(field: &str, value: &Option<String>) -> AppResult<()> {
    match value {
        Some(value) => validate_name(field, value),
        None => Ok(()),
    }
}

// =========================================================================
// Request types
// =========================================================================

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: Password,
}

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub name: String,
    pub email: String,
    pub password: Password,
}

impl CreateUserRequest {
    fn validate(&self) -> AppResult<()> {
        validate_name("name", &self.name)?;
        validate_email(&self.email)?;
        validate_password(&self.password)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<Password>,
}

impl UpdateUserRequest {
    fn validate(&self) -> AppResult<()> {
        validate_optional_name("name", &self.name)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        if let Some(password) = &self.password {
            validate_password(password)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateCategoryRequest {
    pub name: String,
    pub color: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateCategoryRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBankAccountRequest {
    pub name: String,
    pub api_token: String,
    pub account_status: String,
    pub connection_status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBankAccountRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
    #[serde(default)]
    pub account_status: Option<String>,
    #[serde(default)]
    pub connection_status: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTransactionRequest {
    pub bank_account_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    /// ISO-8601 timestamp or calendar date
    pub date: String,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTransactionRequest {
    #[serde(default)]
    pub bank_account_id: Option<Uuid>,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default, rename = "type")]
    pub transaction_type: Option<TransactionType>,
}

// =========================================================================
// API Router
// =========================================================================

/// Create the API router
pub fn create_router() -> Router<AppState> {
    Router::new()
        .route("/auth/login", post(login))
        // Users
        .route("/users", post(create_user).get(list_users))
        .route(
            "/users/:user_id",
            get(get_user).patch(update_user).delete(delete_user),
        )
        // Categories
        .route("/categories", post(create_category).get(list_categories))
        .route(
            "/categories/:category_id",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
        // Bank accounts, always under their owner
        .route(
            "/users/:user_id/bank-accounts",
            post(create_bank_account).get(list_bank_accounts),
        )
        .route(
            "/users/:user_id/bank-accounts/:account_id",
            get(get_bank_account)
                .patch(update_bank_account)
                .delete(delete_bank_account),
        )
        // Transactions
        .route("/users/:user_id/transactions", get(list_user_transactions))
        .route(
            "/transactions",
            post(create_transaction).get(list_transactions),
        )
        .route(
            "/transactions/:transaction_id",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
}

// =========================================================================
// POST /auth/login
// =========================================================================

async fn login(
    State(auth): State<AuthService>,
    Json(request): Json<LoginRequest>,
) -> AppResult<Json<User>> {
    let user = auth.authenticate(&request.email, request.password).await?;
    Ok(Json(user))
}

// =========================================================================
// /users
// =========================================================================

async fn create_user(
    State(users): State<UserService>,
    Json(request): Json<CreateUserRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    request.validate()?;

    let user = users
        .create(request.name, request.email, request.password)
        .await?;

    Ok((StatusCode::CREATED, Json(user)))
}

async fn list_users(
    State(users): State<UserService>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<User>>> {
    Ok(Json(users.list(page).await?))
}

async fn get_user(
    State(users): State<UserService>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<User>> {
    Ok(Json(users.get(user_id).await?))
}

async fn update_user(
    State(users): State<UserService>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<UpdateUserRequest>,
) -> AppResult<Json<User>> {
    request.validate()?;

    let update = UserUpdate {
        name: request.name,
        email: request.email,
        password: request.password,
    };

    Ok(Json(users.update(user_id, update).await?))
}

async fn delete_user(
    State(users): State<UserService>,
    Path(user_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    users.remove(user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// /categories
// =========================================================================

async fn create_category(
    State(categories): State<CategoryService>,
    Json(request): Json<CreateCategoryRequest>,
) -> AppResult<(StatusCode, Json<Category>)> {
    validate_name("name", &request.name)?;

    let category = categories
        .create(NewCategory {
            name: request.name,
            color: request.color,
            description: request.description,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(category)))
}

async fn list_categories(
    State(categories): State<CategoryService>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<Category>>> {
    Ok(Json(categories.list(page).await?))
}

async fn get_category(
    State(categories): State<CategoryService>,
    Path(category_id): Path<Uuid>,
) -> AppResult<Json<Category>> {
    Ok(Json(categories.get(category_id).await?))
}

async fn update_category(
    State(categories): State<CategoryService>,
    Path(category_id): Path<Uuid>,
    Json(request): Json<UpdateCategoryRequest>,
) -> AppResult<Json<Category>> {
    validate_optional_name("name", &request.name)?;

    let changes = CategoryChanges {
        name: request.name,
        color: request.color,
        description: request.description,
    };

    Ok(Json(categories.update(category_id, changes).await?))
}

async fn delete_category(
    State(categories): State<CategoryService>,
    Path(category_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    categories.remove(category_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// /users/:user_id/bank-accounts
// =========================================================================

async fn create_bank_account(
    State(accounts): State<BankAccountService>,
    Path(user_id): Path<Uuid>,
    Json(request): Json<CreateBankAccountRequest>,
) -> AppResult<(StatusCode, Json<BankAccount>)> {
    validate_name("name", &request.name)?;

    let account = accounts
        .create(
            user_id,
            NewBankAccount {
                name: request.name,
                api_token: request.api_token,
                account_status: request.account_status,
                connection_status: request.connection_status,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(account)))
}

async fn list_bank_accounts(
    State(accounts): State<BankAccountService>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<Vec<BankAccount>>> {
    Ok(Json(accounts.list(user_id).await?))
}

async fn get_bank_account(
    State(accounts): State<BankAccountService>,
    Path((user_id, account_id)): Path<(Uuid, Uuid)>,
) -> AppResult<Json<BankAccount>> {
    Ok(Json(accounts.get(user_id, account_id).await?))
}

async fn update_bank_account(
    State(accounts): State<BankAccountService>,
    Path((user_id, account_id)): Path<(Uuid, Uuid)>,
    Json(request): Json<UpdateBankAccountRequest>,
) -> AppResult<Json<BankAccount>> {
    validate_optional_name("name", &request.name)?;

    let changes = BankAccountChanges {
        name: request.name,
        api_token: request.api_token,
        account_status: request.account_status,
        connection_status: request.connection_status,
    };

    Ok(Json(accounts.update(user_id, account_id, changes).await?))
}

async fn delete_bank_account(
    State(accounts): State<BankAccountService>,
    Path((user_id, account_id)): Path<(Uuid, Uuid)>,
) -> AppResult<StatusCode> {
    accounts.remove(user_id, account_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// /transactions
// =========================================================================

async fn create_transaction(
    State(transactions): State<TransactionService>,
    Json(request): Json<CreateTransactionRequest>,
) -> AppResult<(StatusCode, Json<TransactionWithCategory>)> {
    validate_name("name", &request.name)?;

    let transaction = transactions
        .create(TransactionInput {
            bank_account_id: request.bank_account_id,
            category_id: request.category_id,
            name: request.name,
            date: request.date,
            amount: request.amount,
            transaction_type: request.transaction_type,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(transaction)))
}

async fn list_transactions(
    State(transactions): State<TransactionService>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<TransactionWithCategory>>> {
    Ok(Json(transactions.list(page).await?))
}

async fn list_user_transactions(
    State(transactions): State<TransactionService>,
    Path(user_id): Path<Uuid>,
    Query(page): Query<Page>,
) -> AppResult<Json<Vec<TransactionWithCategory>>> {
    Ok(Json(transactions.find_by_user(user_id, page).await?))
}

async fn get_transaction(
    State(transactions): State<TransactionService>,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<Json<TransactionWithCategory>> {
    Ok(Json(transactions.get(transaction_id).await?))
}

async fn update_transaction(
    State(transactions): State<TransactionService>,
    Path(transaction_id): Path<Uuid>,
    Json(request): Json<UpdateTransactionRequest>,
) -> AppResult<Json<TransactionWithCategory>> {
    validate_optional_name("name", &request.name)?;

    let update = TransactionUpdate {
        bank_account_id: request.bank_account_id,
        category_id: request.category_id,
        name: request.name,
        date: request.date,
        amount: request.amount,
        transaction_type: request.transaction_type,
    };

    Ok(Json(transactions.update(transaction_id, update).await?))
}

async fn delete_transaction(
    State(transactions): State<TransactionService>,
    Path(transaction_id): Path<Uuid>,
) -> AppResult<StatusCode> {
    transactions.remove(transaction_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_user_request_deserialize() {
        let json = r#"{
            "name": "Alice",
            "email": "alice@example.com",
            "password": "correct horse"
        }"#;

        let request: CreateUserRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.name, "Alice");
        assert!(request.validate().is_ok());
        assert!(!format!("{request:?}").contains("correct horse"));
    }

    #[test]
    fn test_create_user_request_validation() {
        let request = CreateUserRequest {
            name: "  ".to_string(),
            email: "alice@example.com".to_string(),
            password: Password::new("long enough"),
        };
        assert!(request.validate().is_err());

        let request = CreateUserRequest {
            name: "Alice".to_string(),
            email: "alice.example.com".to_string(),
            password: Password::new("long enough"),
        };
        assert!(request.validate().is_err());

        let request = CreateUserRequest {
            name: "Alice".to_string(),
            email: "alice@example.com".to_string(),
            password: Password::new("short"),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_email_shapes() {
        assert!(validate_email("a@b").is_ok());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice@").is_err());
        assert!(validate_email("a@b@c").is_err());
        assert!(validate_email("al ice@example.com").is_err());
    }

    #[test]
    fn test_password_length_counts_characters() {
        assert!(validate_password(&Password::new("ñññññññ")).is_err());
        assert!(validate_password(&Password::new("ññññññññ")).is_ok());
        assert!(validate_password(&Password::new("x".repeat(MAX_PASSWORD_LENGTH))).is_ok());
        assert!(validate_password(&Password::new("x".repeat(MAX_PASSWORD_LENGTH + 1))).is_err());
    }

    #[test]
    fn test_transaction_request_deserialize() {
        let json = r#"{
            "bankAccountId": "550e8400-e29b-41d4-a716-446655440001",
            "categoryId": "550e8400-e29b-41d4-a716-446655440002",
            "name": "Coffee",
            "date": "2024-03-01",
            "amount": "-3.50",
            "type": "expense"
        }"#;

        let request: CreateTransactionRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.transaction_type, TransactionType::Expense);
        assert_eq!(request.amount.to_string(), "-3.50");
    }

    #[test]
    fn test_update_transaction_request_defaults() {
        let request: UpdateTransactionRequest = serde_json::from_str("{}").unwrap();
        assert!(request.name.is_none());
        assert!(request.amount.is_none());
        assert!(request.transaction_type.is_none());
    }
}
