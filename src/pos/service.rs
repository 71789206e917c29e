use super::{PosLoginResponse, RegisterPosCustomerRequest};
use crate::{
    config::AuthConfig,
    db::models::PosCustomer,
    error::{BankError, BankResult},
    ledger::LedgerStore,
    password::{hash_password, verify_password},
    validation::validate_request,
};
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use uuid::Uuid;

const POS_COLUMNS: &str = "id, account_id, full_name, phone_number, email, work_address, \
                           bank_name, nin, bvn, profile_picture, password_hash, created_at";

const INVALID_LOGIN: &str = "Invalid account number or password";

/// Claims carried by a POS token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosClaims {
    /// POS customer id
    pub sub: String,
    pub account: i64,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

#[derive(Clone)]
pub struct PosService {
    db: SqlitePool,
    ledger: LedgerStore,
    jwt_secret: String,
    token_ttl_secs: i64,
}

impl PosService {
    pub fn new(db: SqlitePool, ledger: LedgerStore, auth: &AuthConfig) -> Self {
        Self {
            db,
            ledger,
            jwt_secret: auth.jwt_secret.clone(),
            token_ttl_secs: auth.pos_token_ttl_secs,
        }
    }

    /// Register a POS customer against an existing account
    pub async fn register_customer(
        &self,
        req: RegisterPosCustomerRequest,
    ) -> BankResult<PosCustomer> {
        validate_request(&req)?;
        // Linked account must exist
        self.ledger.get_account(req.account).await?;

        let password_hash = hash_password(&req.password)?;
        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO pos_customer (account_id, full_name, phone_number, email, work_address,
                                       bank_name, nin, bvn, profile_picture, password_hash,
                                       created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        )
        .bind(req.account)
        .bind(&req.full_name)
        .bind(&req.phone_number)
        .bind(&req.email)
        .bind(&req.work_address)
        .bind(&req.bank_name)
        .bind(&req.nin)
        .bind(&req.bvn)
        .bind(&req.profile_picture)
        .bind(&password_hash)
        .bind(now)
        .execute(&self.db)
        .await?;

        let id = result.last_insert_rowid();
        tracing::info!("Registered POS customer {} on account {}", id, req.account);

        Ok(PosCustomer {
            id,
            account_id: req.account,
            full_name: req.full_name,
            phone_number: req.phone_number,
            email: req.email,
            work_address: req.work_address,
            bank_name: req.bank_name,
            nin: req.nin,
            bvn: req.bvn,
            profile_picture: req.profile_picture,
            password_hash,
            created_at: now,
        })
    }

    /// Log a POS customer in; every mismatch looks the same to the caller
    pub async fn login(&self, account_number: i64, password: &str) -> BankResult<PosLoginResponse> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pos_customer WHERE account_id = ?1 ORDER BY id",
            POS_COLUMNS
        ))
        .bind(account_number)
        .fetch_all(&self.db)
        .await?;

        let mut matched = None;
        for row in &rows {
            let candidate = PosCustomer::from_row(row)?;
            if verify_password(password, &candidate.password_hash)? {
                matched = Some(candidate);
                break;
            }
        }

        let Some(customer) = matched else {
            tracing::debug!("POS login rejected for account {}", account_number);
            return Err(BankError::Validation(INVALID_LOGIN.to_string()));
        };

        let account = self.ledger.get_account(customer.account_id).await?;
        let accounts = match account.customer_id {
            Some(owner) => self.ledger.accounts_for_customer(owner).await?,
            None => vec![account],
        };

        let token = self.issue_token(&customer)?;
        tracing::info!("POS customer {} logged in", customer.id);

        Ok(PosLoginResponse {
            token,
            customer_details: customer,
            customer_accounts: accounts,
        })
    }

    fn issue_token(&self, customer: &PosCustomer) -> BankResult<String> {
        let now = Utc::now().timestamp();
        let claims = PosClaims {
            sub: customer.id.to_string(),
            account: customer.account_id,
            iat: now,
            exp: now + self.token_ttl_secs,
            jti: Uuid::new_v4().to_string(),
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_bytes()),
        )?;

        Ok(token)
    }

    /// Verify a POS token and return its claims
    ///
    /// Login only issues tokens; POS terminals and downstream services present
    /// them back and check them here.
    pub fn verify_token(&self, token: &str) -> BankResult<PosClaims> {
        let validation = Validation::new(Algorithm::HS256);
        let data = decode::<PosClaims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_bytes()),
            &validation,
        )
        .map_err(|e| BankError::Authentication(format!("Invalid POS token: {}", e)))?;

        Ok(data.claims)
    }
}
