use super::{AuthenticateResponse, RegisterUserRequest};
use crate::{
    db::{begin_write, is_key_collision, is_unique_violation, models::WebUser},
    error::{BankError, BankResult},
    minter::{IdSpace, IdentifierMinter},
    password::{hash_password, verify_password},
    validation::validate_request,
};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

const USER_COLUMNS: &str = "id, username, email, password_hash, is_admin, created_at";

/// Username/password to token exchange for staff
#[derive(Clone)]
pub struct WebAuthGateway {
    db: SqlitePool,
    minter: IdentifierMinter,
}

impl WebAuthGateway {
    pub fn new(db: SqlitePool, minter: IdentifierMinter) -> Self {
        Self { db, minter }
    }

    /// Create a web user
    ///
    /// While no user exists anyone may register and the first user is made
    /// admin. Afterwards only an admin `actor` may register users.
    pub async fn register_user(
        &self,
        req: RegisterUserRequest,
        actor: Option<&WebUser>,
    ) -> BankResult<WebUser> {
        validate_request(&req)?;
        let password_hash = hash_password(&req.password)?;

        let mut tx = begin_write(&self.db).await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM web_user")
            .fetch_one(&mut *tx)
            .await?;

        let is_admin = if existing == 0 {
            tracing::info!("Bootstrapping first web user {} as admin", req.username);
            true
        } else {
            match actor {
                Some(user) if user.is_admin => req.is_admin,
                Some(user) => {
                    return Err(BankError::Authorization(format!(
                        "User {} may not register users",
                        user.username
                    )))
                }
                None => {
                    return Err(BankError::Authentication(
                        "Authentication credentials were not provided".to_string(),
                    ))
                }
            }
        };

        let now = Utc::now();

        let result = sqlx::query(
            "INSERT INTO web_user (username, email, password_hash, is_admin, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )
        .bind(&req.username)
        .bind(&req.email)
        .bind(&password_hash)
        .bind(is_admin)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                BankError::Conflict(format!("Username {} already taken", req.username))
            } else {
                BankError::Database(e)
            }
        })?;
        let id = result.last_insert_rowid();

        // Every user gets a token up front
        self.insert_token(&mut tx, id, now).await?;

        tx.commit().await?;

        tracing::info!("Registered web user {} (admin={})", req.username, is_admin);

        Ok(WebUser {
            id,
            username: req.username,
            email: req.email,
            password_hash,
            is_admin,
            created_at: now,
        })
    }

    /// Check credentials and return the user's durable token
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> BankResult<AuthenticateResponse> {
        let user = self
            .get_user_by_username(username)
            .await?
            .ok_or_else(|| BankError::UnknownUser(username.to_string()))?;

        if !verify_password(password, &user.password_hash)? {
            tracing::debug!("Bad password for web user {}", username);
            return Err(BankError::InvalidPassword);
        }

        let token = self.get_or_create_token(user.id).await?;
        tracing::info!("Web user {} authenticated", username);

        Ok(AuthenticateResponse {
            token,
            user: user.username,
        })
    }

    /// Resolve a token key to its user
    pub async fn validate_token(&self, key: &str) -> BankResult<WebUser> {
        let row = sqlx::query(
            "SELECT u.id, u.username, u.email, u.password_hash, u.is_admin, u.created_at
             FROM web_token t JOIN web_user u ON u.id = t.user_id
             WHERE t.key = ?1",
        )
        .bind(key)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| BankError::Authentication("Invalid token".to_string()))?;

        WebUser::from_row(&row)
    }

    /// Whether the bootstrap window is still open
    pub async fn has_users(&self) -> BankResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM web_user")
            .fetch_one(&self.db)
            .await?;
        Ok(count > 0)
    }

    async fn get_user_by_username(&self, username: &str) -> BankResult<Option<WebUser>> {
        let row = sqlx::query(&format!("SELECT {} FROM web_user WHERE username = ?1", USER_COLUMNS))
            .bind(username)
            .fetch_optional(&self.db)
            .await?;

        row.as_ref().map(WebUser::from_row).transpose()
    }

    async fn get_or_create_token(&self, user_id: i64) -> BankResult<String> {
        let existing: Option<String> =
            sqlx::query_scalar("SELECT key FROM web_token WHERE user_id = ?1")
                .bind(user_id)
                .fetch_optional(&self.db)
                .await?;
        if let Some(key) = existing {
            return Ok(key);
        }

        let mut conn = self.db.acquire().await?;
        match self.insert_token(&mut conn, user_id, Utc::now()).await {
            Ok(key) => Ok(key),
            // Lost a race with a concurrent login; theirs wins
            Err(BankError::Database(e)) if is_unique_violation(&e) => {
                let key: String = sqlx::query_scalar("SELECT key FROM web_token WHERE user_id = ?1")
                    .bind(user_id)
                    .fetch_one(&mut *conn)
                    .await?;
                Ok(key)
            }
            Err(e) => Err(e),
        }
    }

    async fn insert_token(
        &self,
        conn: &mut SqliteConnection,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> BankResult<String> {
        for key in self.minter.hex_ids() {
            let result = sqlx::query(
                "INSERT INTO web_token (key, user_id, created_at) VALUES (?1, ?2, ?3)",
            )
            .bind(&key)
            .bind(user_id)
            .bind(now)
            .execute(&mut *conn)
            .await;

            match result {
                Ok(_) => return Ok(key),
                Err(e) if is_key_collision(&e, "web_token", "key") => {
                    tracing::debug!("Web token collision, redrawing");
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.minter.exhausted(IdSpace::Hex128))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;

    async fn create_test_gateway() -> WebAuthGateway {
        let db = memory_pool().await.unwrap();
        WebAuthGateway::new(db, IdentifierMinter::new(16))
    }

    fn request(username: &str, is_admin: bool) -> RegisterUserRequest {
        RegisterUserRequest {
            username: username.to_string(),
            email: format!("{}@bank.test", username),
            password: "long-enough-pw".to_string(),
            is_admin,
        }
    }

    #[tokio::test]
    async fn test_first_user_becomes_admin() {
        let gateway = create_test_gateway().await;
        assert!(!gateway.has_users().await.unwrap());

        let admin = gateway.register_user(request("root", false), None).await.unwrap();
        assert!(admin.is_admin);
        assert!(gateway.has_users().await.unwrap());
    }

    #[tokio::test]
    async fn test_registration_closes_after_bootstrap() {
        let gateway = create_test_gateway().await;
        let admin = gateway.register_user(request("root", false), None).await.unwrap();

        match gateway.register_user(request("eve", false), None).await.unwrap_err() {
            BankError::Authentication(_) => {}
            other => panic!("Expected Authentication, got {:?}", other),
        }

        let teller = gateway
            .register_user(request("teller", false), Some(&admin))
            .await
            .unwrap();
        assert!(!teller.is_admin);

        match gateway
            .register_user(request("intern", false), Some(&teller))
            .await
            .unwrap_err()
        {
            BankError::Authorization(_) => {}
            other => panic!("Expected Authorization, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let gateway = create_test_gateway().await;
        let admin = gateway.register_user(request("root", false), None).await.unwrap();

        match gateway.register_user(request("root", false), Some(&admin)).await.unwrap_err() {
            BankError::Conflict(_) => {}
            other => panic!("Expected Conflict, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_registration_validates_payload() {
        let gateway = create_test_gateway().await;

        let mut short = request("ab", false);
        short.password = "short".to_string();
        assert!(matches!(
            gateway.register_user(short, None).await,
            Err(BankError::Validation(_))
        ));
        assert!(!gateway.has_users().await.unwrap());
    }

    #[tokio::test]
    async fn test_authenticate_and_validate_token() {
        let gateway = create_test_gateway().await;
        gateway.register_user(request("root", false), None).await.unwrap();

        assert!(matches!(
            gateway.authenticate("nobody", "whatever").await,
            Err(BankError::UnknownUser(_))
        ));
        assert!(matches!(
            gateway.authenticate("root", "wrong-password").await,
            Err(BankError::InvalidPassword)
        ));

        let first = gateway.authenticate("root", "long-enough-pw").await.unwrap();
        let second = gateway.authenticate("root", "long-enough-pw").await.unwrap();
        assert_eq!(first.token, second.token);
        assert_eq!(first.user, "root");

        let user = gateway.validate_token(&first.token).await.unwrap();
        assert_eq!(user.username, "root");

        assert!(matches!(
            gateway.validate_token("deadbeef").await,
            Err(BankError::Authentication(_))
        ));
    }
}
