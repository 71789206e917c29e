/// Point-of-sale endpoints
use crate::{
    context::AppContext,
    db::models::PosCustomer,
    error::BankResult,
    pos::{PosLoginRequest, PosLoginResponse, RegisterPosCustomerRequest},
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

/// Build POS routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/pos/customer", post(register_customer))
        .route("/pos/login", post(login))
}

async fn register_customer(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterPosCustomerRequest>,
) -> BankResult<(StatusCode, Json<PosCustomer>)> {
    let customer = ctx.pos.register_customer(req).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<PosLoginRequest>,
) -> BankResult<Json<PosLoginResponse>> {
    let response = ctx.pos.login(req.account_number, &req.password).await?;
    Ok(Json(response))
}
