/// Rate limiting for the mobile verification and login endpoints
///
/// A six-digit OTP is cheap to brute force, so these routes share one
/// per-minute budget.
use crate::{
    config::RateLimitConfig,
    context::AppContext,
    error::{BankError, BankResult},
};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorLimiter,
};
use std::{num::NonZeroU32, sync::Arc};

/// Rate limiter manager
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    per_minute: NonZeroU32,
    auth: Arc<GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        let per_minute =
            NonZeroU32::new(config.auth_requests_per_minute).unwrap_or(NonZeroU32::MIN);

        Self {
            enabled: config.enabled,
            per_minute,
            auth: Arc::new(GovernorLimiter::direct(Quota::per_minute(per_minute))),
        }
    }

    /// Check the shared budget of the auth endpoints
    pub fn check_auth(&self) -> BankResult<()> {
        if !self.enabled {
            return Ok(());
        }

        match self.auth.check() {
            Ok(_) => Ok(()),
            Err(_) => Err(BankError::RateLimitExceeded),
        }
    }

    pub fn limit(&self) -> u32 {
        self.per_minute.get()
    }
}

/// Rate limiting middleware for the auth routes
pub async fn auth_rate_limit(
    State(ctx): State<AppContext>,
    request: Request,
    next: Next,
) -> Result<Response, BankError> {
    if let Err(e) = ctx.rate_limiter.check_auth() {
        tracing::warn!("Rate limit exceeded on {}", request.uri().path());
        return Err(e);
    }

    let mut response = next.run(request).await;
    response
        .headers_mut()
        .insert("X-RateLimit-Limit", ctx.rate_limiter.limit().into());

    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_is_enforced() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: true,
            auth_requests_per_minute: 2,
        });

        assert!(limiter.check_auth().is_ok());
        assert!(limiter.check_auth().is_ok());
        assert!(matches!(
            limiter.check_auth(),
            Err(BankError::RateLimitExceeded)
        ));
    }

    #[test]
    fn test_disabled_limiter_always_passes() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: false,
            auth_requests_per_minute: 1,
        });

        for _ in 0..10 {
            assert!(limiter.check_auth().is_ok());
        }
    }

    #[test]
    fn test_zero_budget_falls_back_to_one() {
        let limiter = RateLimiter::new(&RateLimitConfig {
            enabled: true,
            auth_requests_per_minute: 0,
        });
        assert_eq!(limiter.limit(), 1);
    }
}
