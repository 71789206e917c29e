/// Transaction engine
///
/// Every operation locks the accounts it touches, then loads, validates,
/// mutates and records inside a single database transaction. Nothing is
/// written unless every step succeeds.
use super::account::ensure_positive;
use super::locks::AccountLocks;
use super::store::fetch_account;
use crate::{
    db::{
        begin_write, is_id_collision,
        models::{Account, Deposit, Transfer, Withdraw},
    },
    error::{BankError, BankResult},
    minter::{IdSpace, IdentifierMinter},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{SqliteConnection, SqlitePool};

#[derive(Clone)]
pub struct TransactionEngine {
    db: SqlitePool,
    locks: AccountLocks,
    minter: IdentifierMinter,
}

impl TransactionEngine {
    pub fn new(db: SqlitePool, locks: AccountLocks, minter: IdentifierMinter) -> Self {
        Self { db, locks, minter }
    }

    /// Take `amount` out of an account
    pub async fn withdraw(&self, account_id: i64, amount: Decimal) -> BankResult<Withdraw> {
        ensure_positive(amount)?;

        let _guard = self.locks.acquire(&[account_id]).await;
        let mut tx = begin_write(&self.db).await?;

        let mut account = load(&mut tx, account_id).await?;
        if !account.can_cover(amount) {
            return Err(BankError::InsufficientFunds {
                account: account_id,
                balance: account.balance,
                requested: amount,
            });
        }
        if account.is_restricted() {
            return Err(BankError::AccountRestricted(account_id));
        }

        let previous = account.balance;
        account.debit(amount)?;
        store_balance(&mut tx, &account, previous).await?;

        let now = Utc::now();
        let id = self
            .insert_movement(&mut tx, "withdraw", account_id, amount, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Withdrew {} from account {} (balance {} -> {})",
            amount,
            account_id,
            previous,
            account.balance
        );

        Ok(Withdraw {
            id,
            account_id,
            amount,
            created_at: now,
        })
    }

    /// Put `amount` into an account; restrictions do not block deposits
    pub async fn deposit(&self, account_id: i64, amount: Decimal) -> BankResult<Deposit> {
        ensure_positive(amount)?;

        let _guard = self.locks.acquire(&[account_id]).await;
        let mut tx = begin_write(&self.db).await?;

        let mut account = load(&mut tx, account_id).await?;
        let previous = account.balance;
        account.credit(amount)?;
        store_balance(&mut tx, &account, previous).await?;

        let now = Utc::now();
        let id = self
            .insert_movement(&mut tx, "deposit", account_id, amount, now)
            .await?;

        tx.commit().await?;

        tracing::info!(
            "Deposited {} into account {} (balance {} -> {})",
            amount,
            account_id,
            previous,
            account.balance
        );

        Ok(Deposit {
            id,
            account_id,
            amount,
            created_at: now,
        })
    }

    /// Move `amount` from `debit_id` to `credit_id` atomically
    pub async fn transfer(
        &self,
        debit_id: i64,
        credit_id: i64,
        amount: Decimal,
    ) -> BankResult<Transfer> {
        if debit_id == credit_id {
            return Err(BankError::SameAccountTransfer(debit_id));
        }
        ensure_positive(amount)?;

        let _guard = self.locks.acquire(&[debit_id, credit_id]).await;
        let mut tx = begin_write(&self.db).await?;

        let mut debit = load(&mut tx, debit_id).await?;
        let mut credit = load(&mut tx, credit_id).await?;

        if !debit.can_cover(amount) {
            return Err(BankError::InsufficientFunds {
                account: debit_id,
                balance: debit.balance,
                requested: amount,
            });
        }
        if debit.is_restricted() {
            return Err(BankError::AccountRestricted(debit_id));
        }

        let debit_before = debit.balance;
        let credit_before = credit.balance;
        credit.credit(amount)?;
        debit.debit(amount)?;
        store_balance(&mut tx, &credit, credit_before).await?;
        store_balance(&mut tx, &debit, debit_before).await?;

        let now = Utc::now();
        let mut minted = None;
        for id in self.minter.hex_ids() {
            let result = sqlx::query(
                "INSERT INTO transfer (id, debit_account_id, credit_account_id, amount, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
            )
            .bind(&id)
            .bind(debit_id)
            .bind(credit_id)
            .bind(amount.to_string())
            .bind(now)
            .execute(&mut *tx)
            .await;

            match result {
                Ok(_) => {
                    minted = Some(id);
                    break;
                }
                Err(e) if is_id_collision(&e, "transfer") => {
                    tracing::debug!("Transfer id {} taken, redrawing", id);
                }
                Err(e) => return Err(e.into()),
            }
        }
        let id = minted.ok_or_else(|| self.minter.exhausted(IdSpace::Hex128))?;

        tx.commit().await?;

        tracing::info!(
            "Transferred {} from {} to {} (transfer {})",
            amount,
            debit_id,
            credit_id,
            id
        );

        Ok(Transfer {
            id,
            debit_account_id: debit_id,
            credit_account_id: credit_id,
            amount,
            created_at: now,
        })
    }

    /// Insert a withdraw or deposit row under a fresh hex id
    async fn insert_movement(
        &self,
        conn: &mut SqliteConnection,
        table: &'static str,
        account_id: i64,
        amount: Decimal,
        now: DateTime<Utc>,
    ) -> BankResult<String> {
        let sql = format!(
            "INSERT INTO {} (id, account_id, amount, created_at) VALUES (?1, ?2, ?3, ?4)",
            table
        );

        for id in self.minter.hex_ids() {
            let result = sqlx::query(&sql)
                .bind(&id)
                .bind(account_id)
                .bind(amount.to_string())
                .bind(now)
                .execute(&mut *conn)
                .await;

            match result {
                Ok(_) => return Ok(id),
                Err(e) if is_id_collision(&e, table) => {
                    tracing::debug!("{} id {} taken, redrawing", table, id);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(self.minter.exhausted(IdSpace::Hex128))
    }
}

async fn load(conn: &mut SqliteConnection, account_id: i64) -> BankResult<Account> {
    fetch_account(conn, account_id)
        .await?
        .ok_or_else(|| BankError::NotFound(format!("Account {}", account_id)))
}

/// Write the new balance only if the stored one still equals `previous`
async fn store_balance(
    conn: &mut SqliteConnection,
    account: &Account,
    previous: Decimal,
) -> BankResult<()> {
    let result = sqlx::query("UPDATE account SET balance = ?1 WHERE id = ?2 AND balance = ?3")
        .bind(account.balance.to_string())
        .bind(account.id)
        .bind(previous.to_string())
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() == 0 {
        return Err(BankError::Conflict(format!(
            "Balance of account {} changed underneath this operation",
            account.id
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_pool;
    use crate::ledger::{CreateAccountRequest, LedgerStore, UpdateAccountRequest};
    use rust_decimal_macros::dec;

    async fn setup() -> (TransactionEngine, LedgerStore) {
        let db = memory_pool().await.unwrap();
        let minter = IdentifierMinter::new(16);
        (
            TransactionEngine::new(db.clone(), AccountLocks::new(), minter.clone()),
            LedgerStore::new(db, minter),
        )
    }

    async fn open(store: &LedgerStore, balance: Decimal) -> Account {
        store
            .create_account(CreateAccountRequest {
                customer: None,
                account_type: "current".to_string(),
                balance: Some(balance),
                transaction_key: 1111,
            })
            .await
            .unwrap()
    }

    async fn balance(store: &LedgerStore, id: i64) -> Decimal {
        store.get_account(id).await.unwrap().balance
    }

    #[tokio::test]
    async fn test_withdraw_until_insufficient() {
        let (engine, store) = setup().await;
        let account = open(&store, dec!(100.00)).await;

        let withdraw = engine.withdraw(account.id, dec!(60.00)).await.unwrap();
        assert_eq!(withdraw.id.len(), 32);
        assert_eq!(balance(&store, account.id).await, dec!(40.00));

        match engine.withdraw(account.id, dec!(50.00)).await.unwrap_err() {
            BankError::InsufficientFunds {
                balance, requested, ..
            } => {
                assert_eq!(balance, dec!(40.00));
                assert_eq!(requested, dec!(50.00));
            }
            other => panic!("Expected InsufficientFunds, got {:?}", other),
        }
        assert_eq!(balance(&store, account.id).await, dec!(40.00));

        let recorded = store.get_withdraw(&withdraw.id).await.unwrap();
        assert_eq!(recorded.amount, dec!(60.00));
        assert_eq!(store.list_withdraws().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_withdraw_from_restricted_account() {
        let (engine, store) = setup().await;
        let account = open(&store, dec!(100.00)).await;
        let flag = UpdateAccountRequest {
            flag: Some(true),
            ..Default::default()
        };
        store.update_account(account.id, flag, true).await.unwrap();

        match engine.withdraw(account.id, dec!(10.00)).await.unwrap_err() {
            BankError::AccountRestricted(id) => assert_eq!(id, account.id),
            other => panic!("Expected AccountRestricted, got {:?}", other),
        }
        assert_eq!(balance(&store, account.id).await, dec!(100.00));

        // Overdraft is reported ahead of the restriction
        assert!(matches!(
            engine.withdraw(account.id, dec!(500.00)).await,
            Err(BankError::InsufficientFunds { .. })
        ));

        // Deposits still land
        engine.deposit(account.id, dec!(5.00)).await.unwrap();
        assert_eq!(balance(&store, account.id).await, dec!(105.00));
    }

    #[tokio::test]
    async fn test_invalid_amounts_and_unknown_accounts() {
        let (engine, store) = setup().await;
        let account = open(&store, dec!(10.00)).await;

        assert!(matches!(
            engine.withdraw(account.id, dec!(0)).await,
            Err(BankError::InvalidAmount(_))
        ));
        assert!(matches!(
            engine.deposit(account.id, dec!(-3)).await,
            Err(BankError::InvalidAmount(_))
        ));
        assert!(matches!(
            engine.withdraw(20000000000, dec!(1)).await,
            Err(BankError::NotFound(_))
        ));
        assert!(matches!(
            engine.deposit(20000000000, dec!(1)).await,
            Err(BankError::NotFound(_))
        ));
        assert_eq!(balance(&store, account.id).await, dec!(10.00));
    }

    #[tokio::test]
    async fn test_deposit_records_and_credits() {
        let (engine, store) = setup().await;
        let account = open(&store, dec!(0)).await;

        let deposit = engine.deposit(account.id, dec!(12.34)).await.unwrap();

        assert_eq!(balance(&store, account.id).await, dec!(12.34));
        let recorded = store.get_deposit(&deposit.id).await.unwrap();
        assert_eq!(recorded.account_id, account.id);
        assert_eq!(store.list_deposits().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transfer_moves_funds() {
        let (engine, store) = setup().await;
        let a = open(&store, dec!(100.00)).await;
        let b = open(&store, dec!(10.00)).await;

        let transfer = engine.transfer(a.id, b.id, dec!(25.00)).await.unwrap();

        assert_eq!(balance(&store, a.id).await, dec!(75.00));
        assert_eq!(balance(&store, b.id).await, dec!(35.00));

        let recorded = store.get_transfer(&transfer.id).await.unwrap();
        assert_eq!(recorded.debit_account_id, a.id);
        assert_eq!(recorded.credit_account_id, b.id);
        assert_eq!(recorded.amount, dec!(25.00));
    }

    #[tokio::test]
    async fn test_transfer_to_same_account() {
        let (engine, store) = setup().await;
        let a = open(&store, dec!(100.00)).await;

        assert!(matches!(
            engine.transfer(a.id, a.id, dec!(5.00)).await,
            Err(BankError::SameAccountTransfer(_))
        ));
        // Checked before the amount or the account is looked at
        assert!(matches!(
            engine.transfer(42, 42, dec!(-1)).await,
            Err(BankError::SameAccountTransfer(42))
        ));
        assert_eq!(balance(&store, a.id).await, dec!(100.00));
    }

    #[tokio::test]
    async fn test_failed_transfer_mutates_nothing() {
        let (engine, store) = setup().await;
        let a = open(&store, dec!(20.00)).await;
        let b = open(&store, dec!(10.00)).await;

        assert!(matches!(
            engine.transfer(a.id, b.id, dec!(20.01)).await,
            Err(BankError::InsufficientFunds { .. })
        ));
        assert!(matches!(
            engine.transfer(a.id, 20000000000, dec!(1.00)).await,
            Err(BankError::NotFound(_))
        ));

        assert_eq!(balance(&store, a.id).await, dec!(20.00));
        assert_eq!(balance(&store, b.id).await, dec!(10.00));
    }

    #[tokio::test]
    async fn test_stale_balance_write_conflicts() {
        let db = memory_pool().await.unwrap();
        let store = LedgerStore::new(db.clone(), IdentifierMinter::new(16));
        let mut account = open(&store, dec!(30.00)).await;

        account.balance = dec!(20.00);
        let mut conn = db.acquire().await.unwrap();
        let err = store_balance(&mut conn, &account, dec!(99.00))
            .await
            .unwrap_err();
        drop(conn);

        assert!(matches!(err, BankError::Conflict(_)));
        assert_eq!(balance(&store, account.id).await, dec!(30.00));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_withdrawals_never_overdraw() {
        let (engine, store) = setup().await;
        let account = open(&store, dec!(100.00)).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let engine = engine.clone();
            let id = account.id;
            handles.push(tokio::spawn(
                async move { engine.withdraw(id, dec!(15.00)).await },
            ));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(BankError::InsufficientFunds { .. }) => {}
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }

        assert_eq!(succeeded, 6);
        assert_eq!(balance(&store, account.id).await, dec!(10.00));
    }

    async fn setup_on_disk() -> (TransactionEngine, LedgerStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let db = crate::db::create_pool(
            &dir.path().join("ledger.sqlite"),
            crate::db::DatabaseOptions::default(),
        )
        .await
        .unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        let minter = IdentifierMinter::new(16);
        (
            TransactionEngine::new(db.clone(), AccountLocks::new(), minter.clone()),
            LedgerStore::new(db, minter),
            dir,
        )
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_pooled_withdrawals_across_accounts_all_commit() {
        let (engine, store, _dir) = setup_on_disk().await;
        let mut accounts = Vec::new();
        for _ in 0..16 {
            accounts.push(open(&store, dec!(1000)).await.id);
        }

        let mut handles = Vec::new();
        for i in 0..80 {
            let engine = engine.clone();
            let id = accounts[i % accounts.len()];
            handles.push(tokio::spawn(async move { engine.withdraw(id, dec!(1)).await }));
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for id in accounts {
            assert_eq!(balance(&store, id).await, dec!(995));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_pooled_withdrawals_on_one_account_never_overdraw() {
        let (engine, store, _dir) = setup_on_disk().await;
        let account = open(&store, dec!(100.00)).await;

        let mut handles = Vec::new();
        for _ in 0..10 {
            let engine = engine.clone();
            let id = account.id;
            handles.push(tokio::spawn(async move { engine.withdraw(id, dec!(15.00)).await }));
        }

        let mut succeeded = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => succeeded += 1,
                Err(BankError::InsufficientFunds { .. }) => {}
                Err(other) => panic!("Unexpected error: {:?}", other),
            }
        }

        assert_eq!(succeeded, 6);
        assert_eq!(balance(&store, account.id).await, dec!(10.00));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_pooled_mixed_operations_on_disjoint_accounts() {
        let (engine, store, _dir) = setup_on_disk().await;
        let mut pairs = Vec::new();
        for _ in 0..6 {
            let debit = open(&store, dec!(500)).await.id;
            let credit = open(&store, dec!(500)).await.id;
            pairs.push((debit, credit));
        }
        let mut solo = Vec::new();
        for _ in 0..6 {
            solo.push(open(&store, dec!(500)).await.id);
        }

        let mut handles = Vec::new();
        for round in 0..5 {
            for &(debit, credit) in &pairs {
                let engine = engine.clone();
                handles.push(tokio::spawn(async move {
                    engine.transfer(debit, credit, dec!(10)).await.map(|_| ())
                }));
            }
            for &id in &solo {
                let engine = engine.clone();
                let amount = Decimal::from(round + 1);
                handles.push(tokio::spawn(async move {
                    engine.withdraw(id, amount).await.map(|_| ())
                }));
            }
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for (debit, credit) in pairs {
            assert_eq!(balance(&store, debit).await, dec!(450));
            assert_eq!(balance(&store, credit).await, dec!(550));
        }
        for id in solo {
            assert_eq!(balance(&store, id).await, dec!(485));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_pooled_transfers_in_opposite_directions() {
        let (engine, store, _dir) = setup_on_disk().await;
        let a = open(&store, dec!(100)).await.id;
        let b = open(&store, dec!(100)).await.id;

        let mut handles = Vec::new();
        for _ in 0..20 {
            for (debit, credit) in [(a, b), (b, a)] {
                let engine = engine.clone();
                handles.push(tokio::spawn(async move {
                    engine.transfer(debit, credit, dec!(1)).await
                }));
            }
        }

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(balance(&store, a).await, dec!(100));
        assert_eq!(balance(&store, b).await, dec!(100));

        let transfers: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM transfer")
            .fetch_one(&engine.db)
            .await
            .unwrap();
        assert_eq!(transfers, 40);
    }
}
