/// Ledger resource endpoints
///
/// Handlers are generic over the capability traits; each resource gets routes
/// only for the capabilities it implements.
use crate::{
    auth::WebAuth,
    context::AppContext,
    error::BankResult,
    resources::{
        AccountResource, CreateResource, CustomerResource, DepositResource, ListResource,
        Resource, RetrieveResource, TransferResource, UpdateResource, WithdrawResource,
    },
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

fn collection<R: Resource>() -> String {
    format!("/{}", R::NAME)
}

fn member<R: Resource>() -> String {
    format!("/{}/:id", R::NAME)
}

/// Build resource routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route(
            &collection::<CustomerResource>(),
            get(list::<CustomerResource>).post(create::<CustomerResource>),
        )
        .route(
            &member::<CustomerResource>(),
            get(retrieve::<CustomerResource>)
                .put(replace::<CustomerResource>)
                .patch(patch::<CustomerResource>),
        )
        .route(
            &collection::<AccountResource>(),
            get(list::<AccountResource>).post(create::<AccountResource>),
        )
        .route(
            &member::<AccountResource>(),
            get(retrieve::<AccountResource>)
                .put(replace::<AccountResource>)
                .patch(patch::<AccountResource>),
        )
        .route(
            &collection::<WithdrawResource>(),
            get(list::<WithdrawResource>).post(create::<WithdrawResource>),
        )
        .route(&member::<WithdrawResource>(), get(retrieve::<WithdrawResource>))
        .route(
            &collection::<DepositResource>(),
            get(list::<DepositResource>).post(create::<DepositResource>),
        )
        .route(&member::<DepositResource>(), get(retrieve::<DepositResource>))
        .route(&collection::<TransferResource>(), post(create::<TransferResource>))
        .route(&member::<TransferResource>(), get(retrieve::<TransferResource>))
}

async fn list<R: ListResource>(
    State(ctx): State<AppContext>,
    auth: WebAuth,
) -> BankResult<Json<Vec<R::Record>>> {
    tracing::debug!("{} listing {}", auth.user.username, R::NAME);
    let records = R::from_context(&ctx).list().await?;
    Ok(Json(records))
}

async fn create<R: CreateResource>(
    State(ctx): State<AppContext>,
    auth: WebAuth,
    Json(req): Json<R::Create>,
) -> BankResult<(StatusCode, Json<R::Record>)> {
    tracing::info!("{} creating {}", auth.user.username, R::NAME);
    let record = R::from_context(&ctx).create(req).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn retrieve<R: RetrieveResource>(
    State(ctx): State<AppContext>,
    _auth: WebAuth,
    Path(id): Path<R::Id>,
) -> BankResult<Json<R::Record>> {
    let record = R::from_context(&ctx).retrieve(id).await?;
    Ok(Json(record))
}

async fn replace<R: UpdateResource>(
    State(ctx): State<AppContext>,
    auth: WebAuth,
    Path(id): Path<R::Id>,
    Json(req): Json<R::Update>,
) -> BankResult<Json<R::Record>> {
    tracing::info!("{} replacing {} {}", auth.user.username, R::NAME, id);
    let record = R::from_context(&ctx).update(id, req, false).await?;
    Ok(Json(record))
}

async fn patch<R: UpdateResource>(
    State(ctx): State<AppContext>,
    auth: WebAuth,
    Path(id): Path<R::Id>,
    Json(req): Json<R::Update>,
) -> BankResult<Json<R::Record>> {
    tracing::info!("{} updating {} {}", auth.user.username, R::NAME, id);
    let record = R::from_context(&ctx).update(id, req, true).await?;
    Ok(Json(record))
}
