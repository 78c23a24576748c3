/// /api/auth/* endpoints
use crate::{
    account::{AuthResponse, LoginRequest, RegisterRequest, VerifyTokenRequest, VerifyTokenResponse},
    api::extract::ApiJson,
    auth::AuthContext,
    context::AppContext,
    error::{PointsError, PointsResult},
};
use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use serde_json::json;

/// Build auth routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/auth/register", post(register))
        .route("/api/auth/login", post(login))
        .route("/api/auth/verify-token", post(verify_token))
        .route("/api/auth/logout", post(logout))
}

async fn register(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> PointsResult<(StatusCode, Json<AuthResponse>)> {
    let (account, token) = ctx.account_manager.register(req).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            message: "Account registered".to_string(),
            token,
            account,
        }),
    ))
}

async fn login(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> PointsResult<Json<AuthResponse>> {
    let (account, token) = ctx.account_manager.login(&req.email, &req.password).await?;

    Ok(Json(AuthResponse {
        message: "Login successful".to_string(),
        token,
        account,
    }))
}

async fn verify_token(
    State(ctx): State<AppContext>,
    ApiJson(req): ApiJson<VerifyTokenRequest>,
) -> PointsResult<Json<VerifyTokenResponse>> {
    let token = req.token.trim();
    if token.is_empty() {
        return Err(PointsError::Validation("Token is required".to_string()));
    }

    let account = ctx.account_manager.authenticate(token).await?;

    Ok(Json(VerifyTokenResponse {
        valid: true,
        account,
    }))
}

/// Tokens are stateless; the client discards its copy
async fn logout(auth: AuthContext) -> Json<serde_json::Value> {
    tracing::debug!("Logout for account {}", auth.account_id());

    Json(json!({ "message": "Logged out" }))
}
