/// Authentication extractor
use crate::{
    api::middleware::extract_bearer_token,
    context::AppContext,
    db::account::Account,
    error::PointsError,
};
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};

/// Authenticated caller, resolved from the bearer token to an active account
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub account: Account,
}

impl AuthContext {
    pub fn account_id(&self) -> i64 {
        self.account.id
    }
}

#[async_trait]
impl FromRequestParts<AppContext> for AuthContext {
    type Rejection = PointsError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppContext,
    ) -> Result<Self, Self::Rejection> {
        let token = extract_bearer_token(&parts.headers)
            .ok_or_else(|| PointsError::Authentication("Missing authorization header".to_string()))?;

        let account = state.account_manager.authenticate(&token).await?;

        Ok(AuthContext { account })
    }
}
