//! Transaction entity
//!
//! Dated monetary movements bound to one bank account and one category.
//! Dates cross the API boundary as ISO-8601 strings and are held internally
//! as `DateTime<Utc>`.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::amount::Amount;
use super::category::Category;

/// Direction of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Income,
    Expense,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Income => "income",
            TransactionType::Expense => "expense",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown transaction type: {0}")]
pub struct UnknownTransactionType(pub String);

impl FromStr for TransactionType {
    type Err = UnknownTransactionType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "income" => Ok(TransactionType::Income),
            "expense" => Ok(TransactionType::Expense),
            other => Err(UnknownTransactionType(other.to_string())),
        }
    }
}

/// A transaction row without its category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub id: Uuid,
    pub bank_account_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub date: DateTime<Utc>,
    pub amount: Amount,
    #[serde(rename = "type")]
    pub transaction_type: TransactionType,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A transaction with its category joined in, as returned by every read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionWithCategory {
    #[serde(flatten)]
    pub transaction: Transaction,
    pub category: Category,
}

#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub bank_account_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub date: DateTime<Utc>,
    pub amount: Amount,
    pub transaction_type: TransactionType,
}

/// Partial update of a transaction; `None` leaves the column untouched.
#[derive(Debug, Clone, Default)]
pub struct TransactionChanges {
    pub bank_account_id: Option<Uuid>,
    pub category_id: Option<Uuid>,
    pub name: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub amount: Option<Amount>,
    pub transaction_type: Option<TransactionType>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid date '{0}': expected an RFC 3339 timestamp or YYYY-MM-DD")]
pub struct InvalidDate(pub String);

/// Convert an external ISO-8601 date into the internal representation.
///
/// Timestamps with an offset are normalized to UTC; bare calendar dates are
/// taken as midnight UTC.
pub fn parse_transaction_date(input: &str) -> Result<DateTime<Utc>, InvalidDate> {
    let trimmed = input.trim();

    if let Ok(timestamp) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(timestamp.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| InvalidDate(input.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_rfc3339_normalizes_to_utc() {
        let date = parse_transaction_date("2024-03-01T12:30:00+02:00").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 3, 1, 10, 30, 0).unwrap());
    }

    #[test]
    fn test_parse_calendar_date_is_midnight_utc() {
        let date = parse_transaction_date("2024-03-01").unwrap();
        assert_eq!(date, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_transaction_date("01/03/2024").is_err());
        assert!(parse_transaction_date("2024-02-30").is_err());
        assert!(parse_transaction_date("").is_err());
    }

    #[test]
    fn test_transaction_type_round_trip() {
        assert_eq!("income".parse::<TransactionType>().unwrap(), TransactionType::Income);
        assert_eq!(TransactionType::Expense.to_string(), "expense");
        assert!("transfer".parse::<TransactionType>().is_err());

        let json: TransactionType = serde_json::from_str("\"expense\"").unwrap();
        assert_eq!(json, TransactionType::Expense);
        assert!(serde_json::from_str::<TransactionType>("\"Expense\"").is_err());
    }
}
