/// Reward redemption tracker
use crate::error::PointsResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

/// Fulfillment status. Only `Pending` is written here; the other states are
/// set by the fulfillment process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum RedemptionStatus {
    Pending,
    Processed,
    Delivered,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct RewardRedemption {
    pub id: i64,
    pub account_id: i64,
    pub reward_id: String,
    pub reward_name: String,
    pub points_spent: i64,
    pub delivery_name: Option<String>,
    pub delivery_address: Option<String>,
    pub status: RedemptionStatus,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewRewardRedemption {
    pub account_id: i64,
    pub reward_id: String,
    pub reward_name: String,
    pub points_spent: i64,
    pub delivery_name: Option<String>,
    pub delivery_address: Option<String>,
    pub notes: Option<String>,
}

pub struct RedemptionTracker;

impl RedemptionTracker {
    /// Insert in `pending` state
    pub async fn create(
        conn: &mut SqliteConnection,
        new: NewRewardRedemption,
    ) -> PointsResult<RewardRedemption> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO reward_redemption (account_id, reward_id, reward_name, points_spent,
                delivery_name, delivery_address, status, created_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(new.account_id)
        .bind(&new.reward_id)
        .bind(&new.reward_name)
        .bind(new.points_spent)
        .bind(&new.delivery_name)
        .bind(&new.delivery_address)
        .bind(RedemptionStatus::Pending)
        .bind(now)
        .bind(&new.notes)
        .execute(conn)
        .await?;

        Ok(RewardRedemption {
            id: result.last_insert_rowid(),
            account_id: new.account_id,
            reward_id: new.reward_id,
            reward_name: new.reward_name,
            points_spent: new.points_spent,
            delivery_name: new.delivery_name,
            delivery_address: new.delivery_address,
            status: RedemptionStatus::Pending,
            created_at: now,
            delivered_at: None,
            notes: new.notes,
        })
    }

    /// Redemptions for an account, most recent first
    pub async fn list_for_account(
        conn: &mut SqliteConnection,
        account_id: i64,
    ) -> PointsResult<Vec<RewardRedemption>> {
        let redemptions = sqlx::query_as::<_, RewardRedemption>(
            "SELECT id, account_id, reward_id, reward_name, points_spent, delivery_name,
                    delivery_address, status, created_at, delivered_at, notes
             FROM reward_redemption
             WHERE account_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(account_id)
        .fetch_all(conn)
        .await?;

        Ok(redemptions)
    }
}
