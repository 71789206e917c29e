//! SpeedPay banking ledger backend

pub mod api;
pub mod app_auth;
pub mod auth;
pub mod config;
pub mod context;
pub mod db;
pub mod error;
pub mod ledger;
pub mod mailer;
pub mod minter;
pub mod password;
pub mod pos;
pub mod rate_limit;
pub mod resources;
pub mod server;
pub mod validation;
pub mod web_auth;
