/// Point-of-sale customer channel
///
/// POS customers are tied to a ledger account and log in with the account
/// number and their own password, receiving a short-lived HS256 JWT.

mod service;

pub use service::{PosClaims, PosService};

use crate::db::models::{Account, PosCustomer};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// POS customer registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterPosCustomerRequest {
    pub account: i64,
    #[validate(length(min = 1, max = 100))]
    pub full_name: String,
    #[validate(length(min = 1, max = 20))]
    pub phone_number: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub work_address: String,
    #[validate(length(min = 1, max = 100))]
    pub bank_name: String,
    #[validate(length(equal = 11))]
    pub nin: String,
    #[validate(length(equal = 11))]
    pub bvn: String,
    pub profile_picture: Option<String>,
    #[validate(length(min = 8))]
    pub password: String,
}

/// POS login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosLoginRequest {
    pub account_number: i64,
    pub password: String,
}

/// POS login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosLoginResponse {
    pub token: String,
    pub customer_details: PosCustomer,
    pub customer_accounts: Vec<Account>,
}
