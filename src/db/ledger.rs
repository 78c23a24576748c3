/// Points ledger: append-only history of balance changes
use crate::error::PointsResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

/// Kind of balance-changing operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum OperationKind {
    /// Points credited (welcome bonus, promo code)
    CreditLoad,
    /// Points spent on a reward
    Redemption,
    /// Manual correction
    Adjustment,
}

/// Immutable ledger record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub account_id: i64,
    pub operation_kind: OperationKind,
    pub points_delta: i64,
    pub description: String,
    #[sqlx(rename = "created_at")]
    pub timestamp: DateTime<Utc>,
    pub promo_code_used: Option<String>,
    pub external_reference: Option<String>,
}

/// Entry to append
#[derive(Debug, Clone)]
pub struct NewLedgerEntry {
    pub account_id: i64,
    pub operation_kind: OperationKind,
    pub points_delta: i64,
    pub description: String,
    pub promo_code_used: Option<String>,
    pub external_reference: Option<String>,
}

pub struct PointsLedger;

impl PointsLedger {
    /// Insert an entry. A second entry for the same (account, promo code)
    /// violates a unique index and surfaces as a storage error.
    pub async fn append(conn: &mut SqliteConnection, entry: NewLedgerEntry) -> PointsResult<LedgerEntry> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO ledger_entry (account_id, operation_kind, points_delta, description, created_at,
                promo_code_used, external_reference)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        )
        .bind(entry.account_id)
        .bind(entry.operation_kind)
        .bind(entry.points_delta)
        .bind(&entry.description)
        .bind(now)
        .bind(&entry.promo_code_used)
        .bind(&entry.external_reference)
        .execute(conn)
        .await?;

        Ok(LedgerEntry {
            id: result.last_insert_rowid(),
            account_id: entry.account_id,
            operation_kind: entry.operation_kind,
            points_delta: entry.points_delta,
            description: entry.description,
            timestamp: now,
            promo_code_used: entry.promo_code_used,
            external_reference: entry.external_reference,
        })
    }

    /// Entries for an account, most recent first
    pub async fn list_for_account(
        conn: &mut SqliteConnection,
        account_id: i64,
    ) -> PointsResult<Vec<LedgerEntry>> {
        let entries = sqlx::query_as::<_, LedgerEntry>(
            "SELECT id, account_id, operation_kind, points_delta, description, created_at,
                    promo_code_used, external_reference
             FROM ledger_entry
             WHERE account_id = ?1
             ORDER BY created_at DESC, id DESC",
        )
        .bind(account_id)
        .fetch_all(conn)
        .await?;

        Ok(entries)
    }

    pub async fn has_used_code(
        conn: &mut SqliteConnection,
        account_id: i64,
        code: &str,
    ) -> PointsResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ledger_entry WHERE account_id = ?1 AND promo_code_used = ?2",
        )
        .bind(account_id)
        .bind(code)
        .fetch_one(conn)
        .await?;

        Ok(count > 0)
    }

    /// Sum of all deltas; equals the account balance when the ledger is complete
    pub async fn total_for_account(conn: &mut SqliteConnection, account_id: i64) -> PointsResult<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(points_delta), 0) FROM ledger_entry WHERE account_id = ?1",
        )
        .bind(account_id)
        .fetch_one(conn)
        .await?;

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{
        account::{tests::sample_profile, AccountStore},
        test_pool,
    };

    fn credit(account_id: i64, delta: i64, code: Option<&str>) -> NewLedgerEntry {
        NewLedgerEntry {
            account_id,
            operation_kind: OperationKind::CreditLoad,
            points_delta: delta,
            description: "credit".to_string(),
            promo_code_used: code.map(str::to_string),
            external_reference: None,
        }
    }

    #[tokio::test]
    async fn test_list_is_most_recent_first() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let account = AccountStore::create(&mut conn, &sample_profile("a@example.com", "1"), "h")
            .await
            .unwrap();

        let first = PointsLedger::append(&mut conn, credit(account.id, 10, None)).await.unwrap();
        let second = PointsLedger::append(&mut conn, credit(account.id, 20, None)).await.unwrap();

        let entries = PointsLedger::list_for_account(&mut conn, account.id).await.unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].id, second.id);
        assert_eq!(entries[1].id, first.id);
        assert_eq!(entries[0].operation_kind, OperationKind::CreditLoad);
        assert_eq!(PointsLedger::total_for_account(&mut conn, account.id).await.unwrap(), 30);
    }

    #[tokio::test]
    async fn test_code_can_be_credited_once_per_account() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();
        let a = AccountStore::create(&mut conn, &sample_profile("a@example.com", "1"), "h")
            .await
            .unwrap();
        let b = AccountStore::create(&mut conn, &sample_profile("b@example.com", "2"), "h")
            .await
            .unwrap();

        assert!(!PointsLedger::has_used_code(&mut conn, a.id, "BONUS").await.unwrap());
        PointsLedger::append(&mut conn, credit(a.id, 75, Some("BONUS"))).await.unwrap();
        assert!(PointsLedger::has_used_code(&mut conn, a.id, "BONUS").await.unwrap());

        let err = PointsLedger::append(&mut conn, credit(a.id, 75, Some("BONUS")))
            .await
            .unwrap_err();
        assert!(err.is_unique_violation());

        // Other accounts and code-less entries are unaffected
        PointsLedger::append(&mut conn, credit(b.id, 75, Some("BONUS"))).await.unwrap();
        PointsLedger::append(&mut conn, credit(a.id, 5, None)).await.unwrap();
        PointsLedger::append(&mut conn, credit(a.id, 5, None)).await.unwrap();
    }
}
