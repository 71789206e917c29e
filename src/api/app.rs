/// Mobile app endpoints
use crate::{
    app_auth::{
        AppHomeResponse, AppLoginRequest, AppLoginResponse, RegisterAppUserRequest,
        RegisterAppUserResponse, VerifyOtpRequest, VerifyOtpResponse,
    },
    auth::AppAuth,
    context::AppContext,
    error::BankResult,
    rate_limit::auth_rate_limit,
};
use axum::{
    extract::State,
    http::StatusCode,
    middleware,
    routing::{get, post},
    Json, Router,
};

/// Build app routes
pub fn routes(ctx: &AppContext) -> Router<AppContext> {
    let limited = Router::new()
        .route("/app_auth/", post(verify_otp))
        .route("/app_user_auth/", post(login))
        .route_layer(middleware::from_fn_with_state(ctx.clone(), auth_rate_limit));

    Router::new()
        .route("/createAppUser", post(create_app_user))
        .route("/app_home/", get(home))
        .merge(limited)
}

/// Register an account for the mobile app and send its OTP
async fn create_app_user(
    State(ctx): State<AppContext>,
    Json(req): Json<RegisterAppUserRequest>,
) -> BankResult<(StatusCode, Json<RegisterAppUserResponse>)> {
    let registration = ctx.app_auth.register(req.account, &req.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterAppUserResponse {
            account: registration.app_user.account_id,
            verified: registration.app_user.verified,
        }),
    ))
}

/// Verify an account with its OTP
async fn verify_otp(
    State(ctx): State<AppContext>,
    Json(req): Json<VerifyOtpRequest>,
) -> BankResult<Json<VerifyOtpResponse>> {
    let app_user = ctx.app_auth.verify(req.token, req.account).await?;

    Ok(Json(VerifyOtpResponse {
        account: app_user.account_id,
        verified: app_user.verified,
        detail: "Account verified".to_string(),
    }))
}

async fn login(
    State(ctx): State<AppContext>,
    Json(req): Json<AppLoginRequest>,
) -> BankResult<Json<AppLoginResponse>> {
    let response = ctx.app_auth.login(req.account, &req.password).await?;
    Ok(Json(response))
}

/// Customer details and accounts for the bearer of an app token
async fn home(State(ctx): State<AppContext>, auth: AppAuth) -> BankResult<Json<AppHomeResponse>> {
    tracing::debug!("App home for account {}", auth.session.account.id);
    let response = ctx.app_auth.home(&auth.session.token).await?;
    Ok(Json(response))
}
