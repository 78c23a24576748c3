/// Points endpoints: balance, history, promo codes and rewards
use crate::{
    auth::AuthContext,
    api::extract::ApiJson,
    context::AppContext,
    db::{ledger::LedgerEntry, redemption::RewardRedemption},
    error::PointsResult,
    points::{BalanceView, CodeVerdict, RedeemCodeOutcome, RedeemRewardOutcome, RewardRequest},
};
use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

/// Build points routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/api/points", get(get_points))
        .route("/api/user/points", get(get_points))
        .route("/api/history", get(get_history))
        .route("/api/user/history", get(get_history))
        .route("/api/codes/validate", post(validate_code))
        .route("/api/codes/redeem", post(redeem_code))
        .route("/api/rewards/redeem", post(redeem_reward))
        .route("/api/rewards/history", get(reward_history))
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CodeRequest {
    pub code: String,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse<T> {
    pub count: usize,
    pub entries: Vec<T>,
}

impl<T> From<Vec<T>> for HistoryResponse<T> {
    fn from(entries: Vec<T>) -> Self {
        Self {
            count: entries.len(),
            entries,
        }
    }
}

async fn get_points(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> PointsResult<Json<BalanceView>> {
    let view = ctx.points_service.balance(auth.account_id()).await?;
    Ok(Json(view))
}

async fn get_history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> PointsResult<Json<HistoryResponse<LedgerEntry>>> {
    let entries = ctx.points_service.history(auth.account_id()).await?;
    Ok(Json(entries.into()))
}

/// Always 200; the verdict carries validity
async fn validate_code(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CodeRequest>,
) -> PointsResult<Json<CodeVerdict>> {
    let verdict = ctx
        .points_service
        .validate_code(auth.account_id(), &req.code)
        .await?;
    Ok(Json(verdict))
}

async fn redeem_code(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<CodeRequest>,
) -> PointsResult<Json<RedeemCodeOutcome>> {
    let outcome = ctx
        .points_service
        .redeem_promo_code(auth.account_id(), &req.code)
        .await?;
    Ok(Json(outcome))
}

async fn redeem_reward(
    State(ctx): State<AppContext>,
    auth: AuthContext,
    ApiJson(req): ApiJson<RewardRequest>,
) -> PointsResult<Json<RedeemRewardOutcome>> {
    let outcome = ctx
        .points_service
        .redeem_reward(auth.account_id(), req)
        .await?;
    Ok(Json(outcome))
}

async fn reward_history(
    State(ctx): State<AppContext>,
    auth: AuthContext,
) -> PointsResult<Json<HistoryResponse<RewardRedemption>>> {
    let entries = ctx.points_service.reward_history(auth.account_id()).await?;
    Ok(Json(entries.into()))
}
