/// Customer and account persistence, plus read access to transaction records
use super::{
    CreateAccountRequest, CreateCustomerRequest, UpdateAccountRequest, UpdateCustomerRequest,
};
use crate::{
    db::{
        is_id_collision, is_unique_violation,
        models::{Account, Customer, Deposit, Transfer, Withdraw},
    },
    error::{BankError, BankResult},
    minter::{IdSpace, IdentifierMinter},
    validation::{require_fields, validate_request},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};

/// Ledger repository
#[derive(Clone)]
pub struct LedgerStore {
    db: SqlitePool,
    minter: IdentifierMinter,
}

impl LedgerStore {
    pub fn new(db: SqlitePool, minter: IdentifierMinter) -> Self {
        Self { db, minter }
    }

    // ========== Customers ==========

    pub async fn list_customers(&self) -> BankResult<Vec<Customer>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM customer ORDER BY id",
            Customer::COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Customer::from_row).collect()
    }

    pub async fn get_customer(&self, id: i64) -> BankResult<Customer> {
        let row = sqlx::query(&format!("SELECT {} FROM customer WHERE id = ?1", Customer::COLUMNS))
            .bind(id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| BankError::NotFound(format!("Customer {}", id)))?;

        Customer::from_row(&row)
    }

    pub async fn create_customer(&self, req: CreateCustomerRequest) -> BankResult<Customer> {
        validate_request(&req)?;

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO customer (first_name, middle_name, last_name, phone_number, email,
                                   address, photo, deleted, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0, ?8)",
        )
        .bind(&req.first_name)
        .bind(&req.middle_name)
        .bind(&req.last_name)
        .bind(&req.phone_number)
        .bind(&req.email)
        .bind(&req.address)
        .bind(&req.photo)
        .bind(now)
        .execute(&self.db)
        .await
        .map_err(customer_conflict)?;

        let id = result.last_insert_rowid();
        tracing::info!("Created customer {} <{}>", id, req.email);

        Ok(Customer {
            id,
            first_name: req.first_name,
            middle_name: req.middle_name,
            last_name: req.last_name,
            phone_number: req.phone_number,
            email: req.email,
            address: req.address,
            photo: req.photo,
            deleted: false,
            created_at: now,
        })
    }

    /// Update a customer; with `partial == false` the required fields must all be present
    pub async fn update_customer(
        &self,
        id: i64,
        req: UpdateCustomerRequest,
        partial: bool,
    ) -> BankResult<Customer> {
        validate_request(&req)?;
        if !partial {
            require_fields(req.missing_required())?;
        }

        let mut customer = self.get_customer(id).await?;
        if let Some(v) = req.first_name {
            customer.first_name = v;
        }
        if let Some(v) = req.middle_name {
            customer.middle_name = v;
        }
        if let Some(v) = req.last_name {
            customer.last_name = v;
        }
        if let Some(v) = req.phone_number {
            customer.phone_number = v;
        }
        if let Some(v) = req.email {
            customer.email = v;
        }
        if let Some(v) = req.address {
            customer.address = v;
        }
        if req.photo.is_some() {
            customer.photo = req.photo;
        }
        if let Some(v) = req.deleted {
            customer.deleted = v;
        }

        sqlx::query(
            "UPDATE customer SET first_name = ?1, middle_name = ?2, last_name = ?3,
                    phone_number = ?4, email = ?5, address = ?6, photo = ?7, deleted = ?8
             WHERE id = ?9",
        )
        .bind(&customer.first_name)
        .bind(&customer.middle_name)
        .bind(&customer.last_name)
        .bind(&customer.phone_number)
        .bind(&customer.email)
        .bind(&customer.address)
        .bind(&customer.photo)
        .bind(customer.deleted)
        .bind(id)
        .execute(&self.db)
        .await
        .map_err(customer_conflict)?;

        tracing::debug!("Updated customer {}", id);
        Ok(customer)
    }

    // ========== Accounts ==========

    pub async fn list_accounts(&self) -> BankResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM account ORDER BY created_at, id",
            Account::COLUMNS
        ))
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Account::from_row).collect()
    }

    pub async fn accounts_for_customer(&self, customer_id: i64) -> BankResult<Vec<Account>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM account WHERE customer_id = ?1 ORDER BY created_at, id",
            Account::COLUMNS
        ))
        .bind(customer_id)
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Account::from_row).collect()
    }

    pub async fn get_account(&self, id: i64) -> BankResult<Account> {
        let mut conn = self.db.acquire().await?;
        fetch_account(&mut *conn, id)
            .await?
            .ok_or_else(|| BankError::NotFound(format!("Account {}", id)))
    }

    /// Open an account under a freshly minted account number
    pub async fn create_account(&self, req: CreateAccountRequest) -> BankResult<Account> {
        validate_request(&req)?;

        let balance = req.balance.unwrap_or(Decimal::ZERO);
        if balance < Decimal::ZERO {
            return Err(BankError::Validation(
                "Opening balance cannot be negative".to_string(),
            ));
        }

        if let Some(customer_id) = req.customer {
            self.get_customer(customer_id).await?;
        }

        let now = Utc::now();
        for id in self.minter.account_numbers() {
            let result = sqlx::query(
                "INSERT INTO account (id, customer_id, account_type, balance, transaction_key,
                                      flag, closed, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6)",
            )
            .bind(id)
            .bind(req.customer)
            .bind(&req.account_type)
            .bind(balance.to_string())
            .bind(req.transaction_key)
            .bind(now)
            .execute(&self.db)
            .await;

            match result {
                Ok(_) => {
                    tracing::info!("Opened {} account {}", req.account_type, id);
                    return Ok(Account {
                        id,
                        customer_id: req.customer,
                        account_type: req.account_type,
                        balance,
                        transaction_key: req.transaction_key,
                        flag: false,
                        closed: false,
                        created_at: now,
                    });
                }
                Err(e) if is_id_collision(&e, "account") => {
                    tracing::debug!("Account number {} taken, redrawing", id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.minter.exhausted(IdSpace::AccountNumber))
    }

    /// Update account metadata; the balance is never touched here
    pub async fn update_account(
        &self,
        id: i64,
        req: UpdateAccountRequest,
        partial: bool,
    ) -> BankResult<Account> {
        validate_request(&req)?;
        if !partial {
            require_fields(req.missing_required())?;
        }

        if let Some(customer_id) = req.customer {
            self.get_customer(customer_id).await?;
        }

        let mut account = self.get_account(id).await?;
        if req.customer.is_some() {
            account.customer_id = req.customer;
        }
        if let Some(v) = req.account_type {
            account.account_type = v;
        }
        if let Some(v) = req.transaction_key {
            account.transaction_key = v;
        }
        if let Some(v) = req.flag {
            account.flag = v;
        }
        if let Some(v) = req.closed {
            account.closed = v;
        }

        sqlx::query(
            "UPDATE account SET customer_id = ?1, account_type = ?2, transaction_key = ?3,
                    flag = ?4, closed = ?5
             WHERE id = ?6",
        )
        .bind(account.customer_id)
        .bind(&account.account_type)
        .bind(account.transaction_key)
        .bind(account.flag)
        .bind(account.closed)
        .bind(id)
        .execute(&self.db)
        .await?;

        tracing::debug!(
            "Updated account {} (flag={}, closed={})",
            id,
            account.flag,
            account.closed
        );
        Ok(account)
    }

    // ========== Transaction records ==========

    pub async fn list_withdraws(&self) -> BankResult<Vec<Withdraw>> {
        let rows = sqlx::query(
            "SELECT id, account_id, amount, created_at FROM withdraw ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Withdraw::from_row).collect()
    }

    pub async fn get_withdraw(&self, id: &str) -> BankResult<Withdraw> {
        let row =
            sqlx::query("SELECT id, account_id, amount, created_at FROM withdraw WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| BankError::NotFound(format!("Withdraw {}", id)))?;

        Withdraw::from_row(&row)
    }

    pub async fn list_deposits(&self) -> BankResult<Vec<Deposit>> {
        let rows = sqlx::query(
            "SELECT id, account_id, amount, created_at FROM deposit ORDER BY created_at",
        )
        .fetch_all(&self.db)
        .await?;

        rows.iter().map(Deposit::from_row).collect()
    }

    pub async fn get_deposit(&self, id: &str) -> BankResult<Deposit> {
        let row =
            sqlx::query("SELECT id, account_id, amount, created_at FROM deposit WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| BankError::NotFound(format!("Deposit {}", id)))?;

        Deposit::from_row(&row)
    }

    pub async fn get_transfer(&self, id: &str) -> BankResult<Transfer> {
        let row = sqlx::query(
            "SELECT id, debit_account_id, credit_account_id, amount, created_at
             FROM transfer WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| BankError::NotFound(format!("Transfer {}", id)))?;

        Transfer::from_row(&row)
    }
}

/// Load an account on an existing connection or transaction
pub(crate) async fn fetch_account(
    conn: &mut SqliteConnection,
    id: i64,
) -> BankResult<Option<Account>> {
    let row = sqlx::query(&format!("SELECT {} FROM account WHERE id = ?1", Account::COLUMNS))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(Account::from_row).transpose()
}

fn customer_conflict(e: sqlx::Error) -> BankError {
    if is_unique_violation(&e) {
        BankError::Conflict("A customer with this phone number or email already exists".to_string())
    } else {
        BankError::Database(e)
    }
}
