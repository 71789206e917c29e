/// Mobile app authentication
///
/// An account moves through three states on the mobile channel:
/// unregistered, registered but unverified, and verified. Registration
/// issues a one-time code and a bearer token; the code verifies the account,
/// after which account number plus password log in and the token opens the
/// app home view.

mod manager;

pub use manager::AppAuthManager;

use crate::db::models::{Account, AppOtp, AppUser, AppUserToken, Customer};
use serde::{Deserialize, Serialize};

/// App user registration request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAppUserRequest {
    pub account: i64,
    pub password: String,
}

/// App user registration response; the code itself goes out of band
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterAppUserResponse {
    pub account: i64,
    pub verified: bool,
}

/// OTP verification request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub account: i64,
    /// The one-time code
    pub token: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpResponse {
    pub account: i64,
    pub verified: bool,
    pub detail: String,
}

/// App login request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppLoginRequest {
    pub account: i64,
    pub password: String,
}

/// App login response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppLoginResponse {
    pub token: String,
    pub account: i64,
    pub customer: Option<Customer>,
}

/// App home view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppHomeResponse {
    pub customer: Option<Customer>,
    pub accounts: Vec<Account>,
}

/// Everything a registration created
#[derive(Debug, Clone)]
pub struct Registration {
    pub app_user: AppUser,
    pub otp: AppOtp,
    pub token: AppUserToken,
}

/// Resolved bearer token
#[derive(Debug, Clone)]
pub struct AppSession {
    pub token: String,
    pub account: Account,
    pub app_user: AppUser,
}
