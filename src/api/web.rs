/// Back-office user endpoints
use crate::{
    auth::OptionalWebAuth,
    context::AppContext,
    db::models::WebUser,
    error::BankResult,
    web_auth::{AuthenticateRequest, AuthenticateResponse, RegisterUserRequest},
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};

/// Build web auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/register", post(register))
        .route("/auth/", post(authenticate))
}

/// Register a back-office user
async fn register(
    State(ctx): State<AppContext>,
    auth: OptionalWebAuth,
    Json(req): Json<RegisterUserRequest>,
) -> BankResult<(StatusCode, Json<WebUser>)> {
    let user = ctx.web_auth.register_user(req, auth.user.as_ref()).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Exchange username and password for a token
async fn authenticate(
    State(ctx): State<AppContext>,
    Json(req): Json<AuthenticateRequest>,
) -> BankResult<Json<AuthenticateResponse>> {
    let response = ctx
        .web_auth
        .authenticate(&req.username, &req.password)
        .await?;
    Ok(Json(response))
}
