/// Points service: promo code redemption, reward redemption and balance reads
///
/// Every balance-changing operation runs inside a single database
/// transaction covering the balance update, the promo usage counter or
/// redemption record, and the ledger append.

mod service;

pub use service::PointsService;

use crate::db::{account::Account, promo::PromoCode, redemption::RewardRedemption};
use crate::error::{PointsError, PointsResult};
use serde::{Deserialize, Serialize};

/// Result of a successful promo code redemption
#[derive(Debug, Clone, Serialize)]
pub struct RedeemCodeOutcome {
    pub points_awarded: i64,
    pub points_balance: i64,
    pub code: PromoCode,
}

/// Reward exchange request
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardRequest {
    pub reward_id: String,
    pub reward_name: String,
    pub points_required: i64,
    pub delivery_name: Option<String>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

impl RewardRequest {
    pub fn validate(&self) -> PointsResult<()> {
        if self.reward_id.trim().is_empty() {
            return Err(PointsError::Validation("reward_id is required".to_string()));
        }
        if self.reward_name.trim().is_empty() {
            return Err(PointsError::Validation("reward_name is required".to_string()));
        }
        if self.points_required <= 0 {
            return Err(PointsError::Validation(
                "points_required must be a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a successful reward redemption
#[derive(Debug, Clone, Serialize)]
pub struct RedeemRewardOutcome {
    pub points_remaining: i64,
    pub redemption: RewardRedemption,
}

/// Pre-flight verdict for a promo code
#[derive(Debug, Clone, Serialize)]
pub struct CodeVerdict {
    pub valid: bool,
    /// Error code when invalid
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<PromoCode>,
}

impl CodeVerdict {
    pub fn accepted(code: PromoCode) -> Self {
        Self {
            valid: true,
            reason: None,
            message: format!("Valid code. Awards {} points.", code.point_value),
            code: Some(code),
        }
    }

    pub fn rejected(err: &PointsError) -> Self {
        Self {
            valid: false,
            reason: Some(err.code()),
            message: err.to_string(),
            code: None,
        }
    }
}

/// Current balance and account snapshot
#[derive(Debug, Clone, Serialize)]
pub struct BalanceView {
    pub points_balance: i64,
    pub account: Account,
}
