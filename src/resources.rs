/// Ledger resources and the capabilities each one exposes
///
/// A resource implements only the capability traits it supports; the router
/// registers routes only for those, so unsupported verbs are never reachable.
use crate::{
    context::AppContext,
    db::models::{Account, Customer, Deposit, Transfer, Withdraw},
    error::BankResult,
    ledger::{
        CreateAccountRequest, CreateCustomerRequest, LedgerStore, MovementRequest,
        TransactionEngine, TransferRequest, UpdateAccountRequest, UpdateCustomerRequest,
    },
};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use std::sync::Arc;

/// A resource reachable under `/{NAME}`
pub trait Resource: Send + Sync + Sized + 'static {
    const NAME: &'static str;
    type Id: DeserializeOwned + Send + std::fmt::Display + 'static;
    type Record: Serialize + Send + 'static;

    fn from_context(ctx: &AppContext) -> Self;
}

#[async_trait]
pub trait ListResource: Resource {
    async fn list(&self) -> BankResult<Vec<Self::Record>>;
}

#[async_trait]
pub trait CreateResource: Resource {
    type Create: DeserializeOwned + Send + 'static;

    async fn create(&self, req: Self::Create) -> BankResult<Self::Record>;
}

#[async_trait]
pub trait RetrieveResource: Resource {
    async fn retrieve(&self, id: Self::Id) -> BankResult<Self::Record>;
}

#[async_trait]
pub trait UpdateResource: Resource {
    type Update: DeserializeOwned + Send + 'static;

    /// `partial` is true for PATCH, false for PUT
    async fn update(
        &self,
        id: Self::Id,
        req: Self::Update,
        partial: bool,
    ) -> BankResult<Self::Record>;
}

// ========== Customer: list, create, retrieve, update ==========

pub struct CustomerResource {
    ledger: Arc<LedgerStore>,
}

impl Resource for CustomerResource {
    const NAME: &'static str = "customer";
    type Id = i64;
    type Record = Customer;

    fn from_context(ctx: &AppContext) -> Self {
        Self {
            ledger: ctx.ledger.clone(),
        }
    }
}

#[async_trait]
impl ListResource for CustomerResource {
    async fn list(&self) -> BankResult<Vec<Customer>> {
        self.ledger.list_customers().await
    }
}

#[async_trait]
impl CreateResource for CustomerResource {
    type Create = CreateCustomerRequest;

    async fn create(&self, req: CreateCustomerRequest) -> BankResult<Customer> {
        self.ledger.create_customer(req).await
    }
}

#[async_trait]
impl RetrieveResource for CustomerResource {
    async fn retrieve(&self, id: i64) -> BankResult<Customer> {
        self.ledger.get_customer(id).await
    }
}

#[async_trait]
impl UpdateResource for CustomerResource {
    type Update = UpdateCustomerRequest;

    async fn update(
        &self,
        id: i64,
        req: UpdateCustomerRequest,
        partial: bool,
    ) -> BankResult<Customer> {
        self.ledger.update_customer(id, req, partial).await
    }
}

// ========== Account: list, create, retrieve, update ==========

pub struct AccountResource {
    ledger: Arc<LedgerStore>,
}

impl Resource for AccountResource {
    const NAME: &'static str = "account";
    type Id = i64;
    type Record = Account;

    fn from_context(ctx: &AppContext) -> Self {
        Self {
            ledger: ctx.ledger.clone(),
        }
    }
}

#[async_trait]
impl ListResource for AccountResource {
    async fn list(&self) -> BankResult<Vec<Account>> {
        self.ledger.list_accounts().await
    }
}

#[async_trait]
impl CreateResource for AccountResource {
    type Create = CreateAccountRequest;

    async fn create(&self, req: CreateAccountRequest) -> BankResult<Account> {
        self.ledger.create_account(req).await
    }
}

#[async_trait]
impl RetrieveResource for AccountResource {
    async fn retrieve(&self, id: i64) -> BankResult<Account> {
        self.ledger.get_account(id).await
    }
}

#[async_trait]
impl UpdateResource for AccountResource {
    type Update = UpdateAccountRequest;

    async fn update(
        &self,
        id: i64,
        req: UpdateAccountRequest,
        partial: bool,
    ) -> BankResult<Account> {
        self.ledger.update_account(id, req, partial).await
    }
}

// ========== Withdraw: list, create, retrieve ==========

pub struct WithdrawResource {
    ledger: Arc<LedgerStore>,
    engine: Arc<TransactionEngine>,
}

impl Resource for WithdrawResource {
    const NAME: &'static str = "withdraw";
    type Id = String;
    type Record = Withdraw;

    fn from_context(ctx: &AppContext) -> Self {
        Self {
            ledger: ctx.ledger.clone(),
            engine: ctx.engine.clone(),
        }
    }
}

#[async_trait]
impl ListResource for WithdrawResource {
    async fn list(&self) -> BankResult<Vec<Withdraw>> {
        self.ledger.list_withdraws().await
    }
}

#[async_trait]
impl CreateResource for WithdrawResource {
    type Create = MovementRequest;

    async fn create(&self, req: MovementRequest) -> BankResult<Withdraw> {
        self.engine.withdraw(req.account, req.amount).await
    }
}

#[async_trait]
impl RetrieveResource for WithdrawResource {
    async fn retrieve(&self, id: String) -> BankResult<Withdraw> {
        self.ledger.get_withdraw(&id).await
    }
}

// ========== Deposit: list, create, retrieve ==========

pub struct DepositResource {
    ledger: Arc<LedgerStore>,
    engine: Arc<TransactionEngine>,
}

impl Resource for DepositResource {
    const NAME: &'static str = "deposit";
    type Id = String;
    type Record = Deposit;

    fn from_context(ctx: &AppContext) -> Self {
        Self {
            ledger: ctx.ledger.clone(),
            engine: ctx.engine.clone(),
        }
    }
}

#[async_trait]
impl ListResource for DepositResource {
    async fn list(&self) -> BankResult<Vec<Deposit>> {
        self.ledger.list_deposits().await
    }
}

#[async_trait]
impl CreateResource for DepositResource {
    type Create = MovementRequest;

    async fn create(&self, req: MovementRequest) -> BankResult<Deposit> {
        self.engine.deposit(req.account, req.amount).await
    }
}

#[async_trait]
impl RetrieveResource for DepositResource {
    async fn retrieve(&self, id: String) -> BankResult<Deposit> {
        self.ledger.get_deposit(&id).await
    }
}

// ========== Transfer: create, retrieve ==========

pub struct TransferResource {
    ledger: Arc<LedgerStore>,
    engine: Arc<TransactionEngine>,
}

impl Resource for TransferResource {
    const NAME: &'static str = "transfer";
    type Id = String;
    type Record = Transfer;

    fn from_context(ctx: &AppContext) -> Self {
        Self {
            ledger: ctx.ledger.clone(),
            engine: ctx.engine.clone(),
        }
    }
}

#[async_trait]
impl CreateResource for TransferResource {
    type Create = TransferRequest;

    async fn create(&self, req: TransferRequest) -> BankResult<Transfer> {
        self.engine.transfer(req.debit, req.credit, req.amount).await
    }
}

#[async_trait]
impl RetrieveResource for TransferResource {
    async fn retrieve(&self, id: String) -> BankResult<Transfer> {
        self.ledger.get_transfer(&id).await
    }
}
