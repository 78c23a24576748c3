/// Points service implementation
use crate::{
    db::{
        account::{Account, AccountStore},
        ledger::{LedgerEntry, NewLedgerEntry, OperationKind, PointsLedger},
        promo::{normalize_code, PromoCode, PromoCodeRegistry},
        redemption::{NewRewardRedemption, RedemptionTracker, RewardRedemption},
    },
    error::{PointsError, PointsResult},
    points::{BalanceView, CodeVerdict, RedeemCodeOutcome, RedeemRewardOutcome, RewardRequest},
};
use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

/// Orchestrates the account, promo code, ledger and redemption stores
#[derive(Clone)]
pub struct PointsService {
    db: SqlitePool,
}

impl PointsService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Credit a promo code's value to an account.
    ///
    /// All checks run inside the transaction after the account row is
    /// locked, so concurrent attempts on the same account are evaluated one
    /// after another against committed state.
    pub async fn redeem_promo_code(
        &self,
        account_id: i64,
        code_text: &str,
    ) -> PointsResult<RedeemCodeOutcome> {
        let code_text = normalize_code(code_text);
        if code_text.is_empty() {
            return Err(PointsError::Validation("Code is required".to_string()));
        }

        let mut tx = self.db.begin().await?;

        let account = Self::lock_active_account(&mut tx, account_id).await?;
        let promo = Self::check_code(&mut tx, account.id, &code_text, Utc::now()).await?;

        let new_balance = Self::apply_code_credit(&mut tx, &account, &promo).await?;

        tx.commit().await?;

        info!(
            "Account {} redeemed code {} for {} points (balance {})",
            account.id, promo.code, promo.point_value, new_balance
        );

        Ok(RedeemCodeOutcome {
            points_awarded: promo.point_value,
            points_balance: new_balance,
            code: PromoCode {
                uses_count: promo.uses_count + 1,
                ..promo
            },
        })
    }

    /// Read-only pre-flight check with the same rules as `redeem_promo_code`
    pub async fn validate_code(&self, account_id: i64, code_text: &str) -> PointsResult<CodeVerdict> {
        let code_text = normalize_code(code_text);
        if code_text.is_empty() {
            return Ok(CodeVerdict::rejected(&PointsError::Validation(
                "Code is required".to_string(),
            )));
        }

        let mut conn = self.db.acquire().await?;

        let checked = match Self::active_account(&mut conn, account_id).await {
            Ok(account) => Self::check_code(&mut conn, account.id, &code_text, Utc::now()).await,
            Err(e) => Err(e),
        };

        match checked {
            Ok(promo) => Ok(CodeVerdict::accepted(promo)),
            Err(e @ (PointsError::Storage(_) | PointsError::Internal(_))) => Err(e),
            Err(e) => {
                debug!("Code {} rejected for account {}: {}", code_text, account_id, e);
                Ok(CodeVerdict::rejected(&e))
            }
        }
    }

    /// Exchange points for a reward. Creates the redemption in `pending` state.
    pub async fn redeem_reward(
        &self,
        account_id: i64,
        request: RewardRequest,
    ) -> PointsResult<RedeemRewardOutcome> {
        request.validate()?;

        let mut tx = self.db.begin().await?;

        let account = Self::lock_active_account(&mut tx, account_id).await?;
        if account.points_balance < request.points_required {
            warn!(
                "Account {} cannot afford reward {} ({} < {})",
                account.id, request.reward_id, account.points_balance, request.points_required
            );
            return Err(PointsError::InsufficientPoints {
                balance: account.points_balance,
                required: request.points_required,
            });
        }

        let new_balance = account.points_balance - request.points_required;
        AccountStore::update_balance(&mut tx, account.id, new_balance).await?;

        let redemption = RedemptionTracker::create(
            &mut tx,
            NewRewardRedemption {
                account_id: account.id,
                reward_id: request.reward_id.trim().to_string(),
                reward_name: request.reward_name.trim().to_string(),
                points_spent: request.points_required,
                delivery_name: request.delivery_name,
                delivery_address: request.delivery_address,
                notes: request.notes,
            },
        )
        .await?;

        PointsLedger::append(
            &mut tx,
            NewLedgerEntry {
                account_id: account.id,
                operation_kind: OperationKind::Redemption,
                points_delta: -request.points_required,
                description: format!("Reward: {}", redemption.reward_name),
                promo_code_used: None,
                external_reference: Some(format!("redemption:{}", redemption.id)),
            },
        )
        .await?;

        tx.commit().await?;

        info!(
            "Account {} redeemed reward {} for {} points (balance {})",
            account.id, redemption.reward_id, redemption.points_spent, new_balance
        );

        Ok(RedeemRewardOutcome {
            points_remaining: new_balance,
            redemption,
        })
    }

    pub async fn balance(&self, account_id: i64) -> PointsResult<BalanceView> {
        let mut conn = self.db.acquire().await?;
        let account = Self::active_account(&mut conn, account_id).await?;

        Ok(BalanceView {
            points_balance: account.points_balance,
            account,
        })
    }

    /// Ledger entries, most recent first
    pub async fn history(&self, account_id: i64) -> PointsResult<Vec<LedgerEntry>> {
        let mut conn = self.db.acquire().await?;
        PointsLedger::list_for_account(&mut conn, account_id).await
    }

    /// Reward redemptions, most recent first
    pub async fn reward_history(&self, account_id: i64) -> PointsResult<Vec<RewardRedemption>> {
        let mut conn = self.db.acquire().await?;
        RedemptionTracker::list_for_account(&mut conn, account_id).await
    }

    /// Write side of a code redemption: usage counter, balance, ledger entry.
    /// Returns the new balance. The caller owns the transaction.
    async fn apply_code_credit(
        conn: &mut SqliteConnection,
        account: &Account,
        promo: &PromoCode,
    ) -> PointsResult<i64> {
        if !PromoCodeRegistry::increment_usage(conn, promo.id).await? {
            return Err(PointsError::CodeExhausted);
        }

        let new_balance = account
            .points_balance
            .checked_add(promo.point_value)
            .ok_or_else(|| PointsError::Validation("Points balance would overflow".to_string()))?;
        AccountStore::update_balance(conn, account.id, new_balance).await?;

        PointsLedger::append(
            conn,
            NewLedgerEntry {
                account_id: account.id,
                operation_kind: OperationKind::CreditLoad,
                points_delta: promo.point_value,
                description: format!("Promo code: {}", promo.label()),
                promo_code_used: Some(promo.code.clone()),
                external_reference: None,
            },
        )
        .await
        .map_err(|e| {
            if e.is_unique_violation() {
                PointsError::AlreadyRedeemed
            } else {
                e
            }
        })?;

        Ok(new_balance)
    }

    async fn active_account(conn: &mut SqliteConnection, account_id: i64) -> PointsResult<Account> {
        let account = AccountStore::find_by_id(conn, account_id)
            .await?
            .ok_or_else(|| PointsError::NotFound(format!("Account {} not found", account_id)))?;
        Self::ensure_active(account)
    }

    async fn lock_active_account(conn: &mut SqliteConnection, account_id: i64) -> PointsResult<Account> {
        let account = AccountStore::lock(conn, account_id)
            .await?
            .ok_or_else(|| PointsError::NotFound(format!("Account {} not found", account_id)))?;
        Self::ensure_active(account)
    }

    fn ensure_active(account: Account) -> PointsResult<Account> {
        if !account.active {
            return Err(PointsError::Forbidden(format!(
                "Account {} is deactivated",
                account.id
            )));
        }
        Ok(account)
    }

    /// Code rules in order: exists, active, not expired, not exhausted,
    /// not yet used by this account. `code` is already normalized.
    async fn check_code(
        conn: &mut SqliteConnection,
        account_id: i64,
        code: &str,
        now: DateTime<Utc>,
    ) -> PointsResult<PromoCode> {
        let promo = PromoCodeRegistry::find_by_code(conn, code)
            .await?
            .ok_or(PointsError::InvalidCode)?;

        if !promo.active {
            return Err(PointsError::CodeInactive);
        }
        if promo.is_expired(now) {
            return Err(PointsError::CodeExpired);
        }
        if promo.is_exhausted() {
            return Err(PointsError::CodeExhausted);
        }
        if PointsLedger::has_used_code(conn, account_id, &promo.code).await? {
            return Err(PointsError::AlreadyRedeemed);
        }

        Ok(promo)
    }
}
