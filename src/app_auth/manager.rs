/// App auth manager using runtime queries
use super::{AppHomeResponse, AppLoginResponse, AppSession, Registration};
use crate::{
    db::{
        begin_write, begin_write_on, is_id_collision, is_unique_violation,
        models::{AppOtp, AppUser, AppUserToken},
    },
    error::{BankError, BankResult},
    ledger::{fetch_account, LedgerStore},
    mailer::Mailer,
    minter::{IdSpace, IdentifierMinter},
    password::{hash_password, verify_password},
};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

/// Mobile channel authentication service
#[derive(Clone)]
pub struct AppAuthManager {
    db: SqlitePool,
    ledger: LedgerStore,
    minter: IdentifierMinter,
    mailer: Mailer,
}

impl AppAuthManager {
    pub fn new(
        db: SqlitePool,
        ledger: LedgerStore,
        minter: IdentifierMinter,
        mailer: Mailer,
    ) -> Self {
        Self {
            db,
            ledger,
            minter,
            mailer,
        }
    }

    /// Register the app user for an account and issue its OTP and token
    pub async fn register(&self, account_id: i64, password: &str) -> BankResult<Registration> {
        // Hashing is slow; keep it outside the write lock
        let password_hash = if password.is_empty() {
            None
        } else {
            Some(hash_password(password)?)
        };

        let mut tx = begin_write(&self.db).await?;

        if fetch_account(&mut tx, account_id).await?.is_none() {
            return Err(BankError::UnknownAccount(account_id));
        }
        if get_app_user(&mut tx, account_id).await?.is_some() {
            return Err(BankError::AccountAlreadyRegistered(account_id));
        }
        let password_hash = password_hash
            .ok_or_else(|| BankError::Validation("Password cannot be empty".to_string()))?;
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO app_user (account_id, password_hash, verified, created_at, verified_at)
             VALUES (?1, ?2, 0, ?3, NULL)",
        )
        .bind(account_id)
        .bind(&password_hash)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BankError::AccountAlreadyRegistered(account_id)
            } else {
                BankError::Database(e)
            }
        })?;

        let otp = self.insert_otp(&mut tx, account_id, now).await?;
        let token = self.insert_token(&mut tx, account_id, now).await?;

        tx.commit().await?;

        tracing::info!("Registered app user for account {}", account_id);
        self.deliver_otp(account_id, otp.id).await;

        Ok(Registration {
            app_user: AppUser {
                account_id,
                password_hash,
                verified: false,
                created_at: now,
                verified_at: None,
            },
            otp,
            token,
        })
    }

    /// Verify an account with the OTP issued to it
    pub async fn verify(&self, otp: i64, account_id: i64) -> BankResult<AppUser> {
        let mut tx = begin_write(&self.db).await?;

        let issued = sqlx::query("SELECT id FROM app_otp WHERE id = ?1 AND account_id = ?2")
            .bind(otp)
            .bind(account_id)
            .fetch_optional(&mut *tx)
            .await?;
        if issued.is_none() {
            tracing::debug!("Rejected OTP for account {}", account_id);
            return Err(BankError::InvalidOtp);
        }

        let mut app_user = get_app_user(&mut tx, account_id)
            .await?
            .ok_or(BankError::UnknownAccount(account_id))?;
        if app_user.verified {
            return Err(BankError::AccountAlreadyVerified(account_id));
        }

        let now = Utc::now();
        let result = sqlx::query(
            "UPDATE app_user SET verified = 1, verified_at = ?1
             WHERE account_id = ?2 AND verified = 0",
        )
        .bind(now)
        .bind(account_id)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(BankError::AccountAlreadyVerified(account_id));
        }

        sqlx::query("UPDATE app_otp SET closed = 1 WHERE id = ?1")
            .bind(otp)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!("Verified app user for account {}", account_id);

        app_user.verified = true;
        app_user.verified_at = Some(now);
        Ok(app_user)
    }

    /// Exchange account number and password for the bearer token
    pub async fn login(&self, account_id: i64, password: &str) -> BankResult<AppLoginResponse> {
        let mut conn = self.db.acquire().await?;

        let account = fetch_account(&mut conn, account_id)
            .await?
            .ok_or(BankError::UnknownAccount(account_id))?;
        let app_user = get_app_user(&mut conn, account_id)
            .await?
            .ok_or(BankError::UnregisteredAppUser(account_id))?;

        if !app_user.verified {
            return Err(BankError::NotVerified(account_id));
        }
        if !verify_password(password, &app_user.password_hash)? {
            tracing::debug!("Bad app password for account {}", account_id);
            return Err(BankError::InvalidPassword);
        }

        let token = match get_token_for_account(&mut conn, account_id).await? {
            Some(token) => token,
            None => {
                // Tokens cascade with their account, so this only repairs manual deletes
                let mut tx = begin_write_on(&mut conn).await?;
                let token = self.insert_token(&mut tx, account_id, Utc::now()).await?;
                tx.commit().await?;
                token
            }
        };
        drop(conn);

        let customer = match account.customer_id {
            Some(customer_id) => Some(self.ledger.get_customer(customer_id).await?),
            None => None,
        };

        tracing::info!("App login for account {}", account_id);

        Ok(AppLoginResponse {
            token: token.id,
            account: account_id,
            customer,
        })
    }

    /// Resolve a bearer token to a verified app session
    pub async fn authorize(&self, token: &str) -> BankResult<AppSession> {
        let mut conn = self.db.acquire().await?;

        let row = sqlx::query("SELECT id, account_id, created_at FROM app_user_token WHERE id = ?1")
            .bind(token)
            .fetch_optional(&mut *conn)
            .await?
            .ok_or(BankError::InvalidToken)?;
        let issued = AppUserToken::from_row(&row)?;

        let account = fetch_account(&mut conn, issued.account_id)
            .await?
            .ok_or(BankError::UnknownAccount(issued.account_id))?;
        let app_user = get_app_user(&mut conn, account.id)
            .await?
            .ok_or(BankError::UnregisteredAppUser(account.id))?;
        if !app_user.verified {
            return Err(BankError::NotVerified(account.id));
        }

        Ok(AppSession {
            token: issued.id,
            account,
            app_user,
        })
    }

    /// Customer details and accounts behind a bearer token
    pub async fn home(&self, token: &str) -> BankResult<AppHomeResponse> {
        let session = self.authorize(token).await?;

        match session.account.customer_id {
            Some(customer_id) => {
                let customer = self.ledger.get_customer(customer_id).await?;
                let accounts = self.ledger.accounts_for_customer(customer_id).await?;
                Ok(AppHomeResponse {
                    customer: Some(customer),
                    accounts,
                })
            }
            None => Ok(AppHomeResponse {
                customer: None,
                accounts: vec![session.account],
            }),
        }
    }

    async fn insert_otp(
        &self,
        conn: &mut SqliteConnection,
        account_id: i64,
        now: DateTime<Utc>,
    ) -> BankResult<AppOtp> {
        for id in self.minter.otps() {
            let result = sqlx::query(
                "INSERT INTO app_otp (id, account_id, closed, created_at) VALUES (?1, ?2, 0, ?3)",
            )
            .bind(id)
            .bind(account_id)
            .bind(now)
            .execute(&mut *conn)
            .await;

            match result {
                Ok(_) => {
                    return Ok(AppOtp {
                        id,
                        account_id,
                        closed: false,
                        created_at: now,
                    })
                }
                Err(e) if is_id_collision(&e, "app_otp") => {
                    tracing::debug!("OTP collision, redrawing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.minter.exhausted(IdSpace::Otp))
    }

    async fn insert_token(
        &self,
        conn: &mut SqliteConnection,
        account_id: i64,
        now: DateTime<Utc>,
    ) -> BankResult<AppUserToken> {
        for id in self.minter.hex_ids() {
            let result = sqlx::query(
                "INSERT INTO app_user_token (id, account_id, created_at) VALUES (?1, ?2, ?3)",
            )
            .bind(&id)
            .bind(account_id)
            .bind(now)
            .execute(&mut *conn)
            .await;

            match result {
                Ok(_) => {
                    return Ok(AppUserToken {
                        id,
                        account_id,
                        created_at: now,
                    })
                }
                Err(e) if is_id_collision(&e, "app_user_token") => {
                    tracing::debug!("App token collision, redrawing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.minter.exhausted(IdSpace::Hex128))
    }

    /// Send the OTP to the account owner
    ///
    /// Without a mail route the code only reaches `trace` logs.
    async fn deliver_otp(&self, account_id: i64, otp: i64) {
        let email: Option<String> = match sqlx::query_scalar(
            "SELECT c.email FROM customer c JOIN account a ON a.customer_id = c.id WHERE a.id = ?1",
        )
        .bind(account_id)
        .fetch_optional(&self.db)
        .await
        {
            Ok(email) => email,
            Err(e) => {
                tracing::warn!("Could not look up owner of account {}: {}", account_id, e);
                None
            }
        };

        match email {
            Some(email) if self.mailer.is_configured() => {
                if let Err(e) = self.mailer.send_otp_email(&email, account_id, otp).await {
                    tracing::warn!("Failed to send OTP email for account {}: {}", account_id, e);
                }
            }
            _ => {
                tracing::info!("OTP delivery skipped for account {}, no mail route", account_id);
                tracing::trace!("OTP for account {}: {}", account_id, otp);
            }
        }
    }
}

async fn get_app_user(conn: &mut SqliteConnection, account_id: i64) -> BankResult<Option<AppUser>> {
    let row = sqlx::query(
        "SELECT account_id, password_hash, verified, created_at, verified_at
         FROM app_user WHERE account_id = ?1",
    )
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(AppUser::from_row).transpose()
}

async fn get_token_for_account(
    conn: &mut SqliteConnection,
    account_id: i64,
) -> BankResult<Option<AppUserToken>> {
    let row = sqlx::query(
        "SELECT id, account_id, created_at FROM app_user_token WHERE account_id = ?1",
    )
    .bind(account_id)
    .fetch_optional(&mut *conn)
    .await?;

    row.as_ref().map(AppUserToken::from_row).transpose()
}
