/// Database models and row mapping
use super::decimal_column;
use crate::error::BankResult;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

/// Customer identity record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub first_name: String,
    pub middle_name: String,
    pub last_name: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    /// Opaque reference to the stored photo
    pub photo: Option<String>,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

impl Customer {
    pub const COLUMNS: &'static str = "id, first_name, middle_name, last_name, phone_number, \
                                       email, address, photo, deleted, created_at";

    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(Customer {
            id: row.try_get("id")?,
            first_name: row.try_get("first_name")?,
            middle_name: row.try_get("middle_name")?,
            last_name: row.try_get("last_name")?,
            phone_number: row.try_get("phone_number")?,
            email: row.try_get("email")?,
            address: row.try_get("address")?,
            photo: row.try_get("photo")?,
            deleted: row.try_get("deleted")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Balance-bearing ledger account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// 11-digit minted account number
    pub id: i64,
    pub customer_id: Option<i64>,
    pub account_type: String,
    pub balance: Decimal,
    pub transaction_key: i64,
    /// Restriction marker: the owner must visit the bank
    pub flag: bool,
    pub closed: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    pub const COLUMNS: &'static str =
        "id, customer_id, account_type, balance, transaction_key, flag, closed, created_at";

    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(Account {
            id: row.try_get("id")?,
            customer_id: row.try_get("customer_id")?,
            account_type: row.try_get("account_type")?,
            balance: decimal_column(row, "balance")?,
            transaction_key: row.try_get("transaction_key")?,
            flag: row.try_get("flag")?,
            closed: row.try_get("closed")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Withdrawal record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Withdraw {
    pub id: String,
    pub account_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Withdraw {
    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(Withdraw {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            amount: decimal_column(row, "amount")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Deposit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deposit {
    pub id: String,
    pub account_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Deposit {
    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(Deposit {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            amount: decimal_column(row, "amount")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Account-to-account transfer record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transfer {
    pub id: String,
    pub debit_account_id: i64,
    pub credit_account_id: i64,
    pub amount: Decimal,
    pub created_at: DateTime<Utc>,
}

impl Transfer {
    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(Transfer {
            id: row.try_get("id")?,
            debit_account_id: row.try_get("debit_account_id")?,
            credit_account_id: row.try_get("credit_account_id")?,
            amount: decimal_column(row, "amount")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Mobile app user, one per account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppUser {
    pub account_id: i64,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub verified: bool,
    pub created_at: DateTime<Utc>,
    pub verified_at: Option<DateTime<Utc>>,
}

impl AppUser {
    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(AppUser {
            account_id: row.try_get("account_id")?,
            password_hash: row.try_get("password_hash")?,
            verified: row.try_get("verified")?,
            created_at: row.try_get("created_at")?,
            verified_at: row.try_get("verified_at")?,
        })
    }
}

/// One-time verification code
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppOtp {
    pub id: i64,
    pub account_id: i64,
    pub closed: bool,
    pub created_at: DateTime<Utc>,
}

impl AppOtp {
    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(AppOtp {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            closed: row.try_get("closed")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Mobile bearer token
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppUserToken {
    pub id: String,
    pub account_id: i64,
    pub created_at: DateTime<Utc>,
}

impl AppUserToken {
    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(AppUserToken {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Back-office web user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebUser {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_admin: bool,
    pub created_at: DateTime<Utc>,
}

impl WebUser {
    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(WebUser {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            is_admin: row.try_get("is_admin")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// Point-of-sale customer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosCustomer {
    pub id: i64,
    pub account_id: i64,
    pub full_name: String,
    pub phone_number: String,
    pub email: String,
    pub work_address: String,
    pub bank_name: String,
    pub nin: String,
    pub bvn: String,
    pub profile_picture: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl PosCustomer {
    pub fn from_row(row: &SqliteRow) -> BankResult<Self> {
        Ok(PosCustomer {
            id: row.try_get("id")?,
            account_id: row.try_get("account_id")?,
            full_name: row.try_get("full_name")?,
            phone_number: row.try_get("phone_number")?,
            email: row.try_get("email")?,
            work_address: row.try_get("work_address")?,
            bank_name: row.try_get("bank_name")?,
            nin: row.try_get("nin")?,
            bvn: row.try_get("bvn")?,
            profile_picture: row.try_get("profile_picture")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
