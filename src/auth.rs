/// Authentication extractors
use crate::{
    api::middleware::{extract_app_token, extract_web_token},
    app_auth::AppSession,
    context::AppContext,
    db::models::WebUser,
    error::BankError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated back-office user
#[derive(Debug, Clone)]
pub struct WebAuth {
    pub user: WebUser,
}

#[async_trait]
impl FromRequestParts<AppContext> for WebAuth {
    type Rejection = BankError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let key = extract_web_token(&parts.headers).ok_or_else(|| {
            BankError::Authentication("Authentication credentials were not provided".to_string())
        })?;

        let user = state.web_auth.validate_token(&key).await?;
        tracing::debug!("Web request by {}", user.username);

        Ok(WebAuth { user })
    }
}

/// Optional back-office user; a present but bad token still fails
#[derive(Debug, Clone)]
pub struct OptionalWebAuth {
    pub user: Option<WebUser>,
}

#[async_trait]
impl FromRequestParts<AppContext> for OptionalWebAuth {
    type Rejection = BankError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let user = match extract_web_token(&parts.headers) {
            Some(key) => Some(state.web_auth.validate_token(&key).await?),
            None => None,
        };

        Ok(OptionalWebAuth { user })
    }
}

/// Verified mobile app session from the raw `Authorization` header
#[derive(Debug, Clone)]
pub struct AppAuth {
    pub session: AppSession,
}

#[async_trait]
impl FromRequestParts<AppContext> for AppAuth {
    type Rejection = BankError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_app_token(&parts.headers)
            .ok_or_else(|| BankError::Authentication("Please provide token".to_string()))?;

        let session = state.app_auth.authorize(&token).await?;

        Ok(AppAuth { session })
    }
}
