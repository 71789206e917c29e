/// Back-office web authentication
///
/// Staff log in with username and password and receive a durable token,
/// sent back as `Authorization: Token <key>` on every ledger request.

mod gateway;

pub use gateway::WebAuthGateway;

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Web user registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 3, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[serde(default)]
    pub is_admin: bool,
}

/// Credentials for `/auth/`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticateResponse {
    pub token: String,
    pub user: String,
}
