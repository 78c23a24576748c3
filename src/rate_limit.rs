/// Request rate limiting
use crate::{
    api::middleware::extract_bearer_token,
    config::RateLimitSettings,
    error::{PointsError, PointsResult},
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
use std::{num::NonZeroU32, sync::Arc, time::Duration};

type DirectLimiter = GovernorLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Separate quotas for requests with and without a bearer token
#[derive(Clone)]
pub struct RateLimiter {
    enabled: bool,
    authenticated: Arc<DirectLimiter>,
    unauthenticated: Arc<DirectLimiter>,
}

impl RateLimiter {
    pub fn new(settings: &RateLimitSettings) -> Self {
        let burst = NonZeroU32::new(settings.burst_size).unwrap_or(NonZeroU32::MIN);

        let auth_quota = Quota::per_second(
            NonZeroU32::new(settings.authenticated_rps).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(burst);

        // Anonymous callers get a fifth of the burst
        let unauth_quota = Quota::per_second(
            NonZeroU32::new(settings.unauthenticated_rps).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(settings.burst_size / 5).unwrap_or(NonZeroU32::MIN));

        Self {
            enabled: settings.enabled,
            authenticated: Arc::new(GovernorLimiter::direct(auth_quota)),
            unauthenticated: Arc::new(GovernorLimiter::direct(unauth_quota)),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn check_authenticated(&self) -> PointsResult<()> {
        Self::check(&self.authenticated)
    }

    pub fn check_unauthenticated(&self) -> PointsResult<()> {
        Self::check(&self.unauthenticated)
    }

    fn check(limiter: &DirectLimiter) -> PointsResult<()> {
        limiter.check().map_err(|_| PointsError::RateLimitExceeded {
            retry_after: Duration::from_secs(1),
        })
    }
}

/// Rate limiting middleware
pub async fn rate_limit_middleware(
    State(limiter): State<RateLimiter>,
    request: Request,
    next: Next,
) -> Result<Response, PointsError> {
    if !limiter.is_enabled() {
        return Ok(next.run(request).await);
    }

    if extract_bearer_token(request.headers()).is_some() {
        limiter.check_authenticated()?;
    } else {
        limiter.check_unauthenticated()?;
    }

    Ok(next.run(request).await)
}
