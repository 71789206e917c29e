/// Account ledger
///
/// Customers, accounts and the immutable withdraw/deposit/transfer history,
/// plus the engine that moves money between them.

mod account;
mod engine;
mod locks;
mod store;

pub use engine::TransactionEngine;
pub use locks::{AccountGuard, AccountLocks};
pub use store::LedgerStore;
pub(crate) use store::fetch_account;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Customer creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateCustomerRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: String,
    #[serde(default)]
    #[validate(length(max = 50))]
    pub middle_name: String,
    #[validate(length(min = 1, max = 50))]
    pub last_name: String,
    #[validate(length(min = 1, max = 20))]
    pub phone_number: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub address: String,
    pub photo: Option<String>,
}

/// Customer update request; absent fields are left alone on PATCH
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateCustomerRequest {
    #[validate(length(min = 1, max = 50))]
    pub first_name: Option<String>,
    #[validate(length(max = 50))]
    pub middle_name: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub last_name: Option<String>,
    #[validate(length(min = 1, max = 20))]
    pub phone_number: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 1, max = 255))]
    pub address: Option<String>,
    pub photo: Option<String>,
    pub deleted: Option<bool>,
}

impl UpdateCustomerRequest {
    /// Fields a full replacement must carry
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.first_name.is_none() {
            missing.push("first_name");
        }
        if self.last_name.is_none() {
            missing.push("last_name");
        }
        if self.phone_number.is_none() {
            missing.push("phone_number");
        }
        if self.email.is_none() {
            missing.push("email");
        }
        if self.address.is_none() {
            missing.push("address");
        }
        missing
    }
}

/// Account creation request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateAccountRequest {
    pub customer: Option<i64>,
    #[validate(length(min = 1, max = 10))]
    pub account_type: String,
    /// Opening balance, zero when omitted
    #[serde(default, alias = "amount")]
    pub balance: Option<Decimal>,
    #[validate(range(min = 0, max = 9999))]
    pub transaction_key: i64,
}

/// Account update request; the balance is deliberately absent
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateAccountRequest {
    pub customer: Option<i64>,
    #[validate(length(min = 1, max = 10))]
    pub account_type: Option<String>,
    #[validate(range(min = 0, max = 9999))]
    pub transaction_key: Option<i64>,
    pub flag: Option<bool>,
    pub closed: Option<bool>,
}

impl UpdateAccountRequest {
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.account_type.is_none() {
            missing.push("account_type");
        }
        if self.transaction_key.is_none() {
            missing.push("transaction_key");
        }
        missing
    }
}

/// Withdraw or deposit request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovementRequest {
    pub account: i64,
    pub amount: Decimal,
}

/// Transfer request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferRequest {
    pub debit: i64,
    pub credit: i64,
    pub amount: Decimal,
}
