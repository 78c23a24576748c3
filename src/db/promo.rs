/// Promo code registry
use crate::error::PointsResult;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

const PROMO_COLUMNS: &str =
    "id, code, point_value, description, active, created_at, expires_at, max_uses, uses_count";

/// Redeemable promotional code
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PromoCode {
    pub id: i64,
    /// Always stored uppercase
    pub code: String,
    pub point_value: i64,
    pub description: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
    /// `None` or 0 means unlimited
    pub max_uses: Option<i64>,
    pub uses_count: i64,
}

impl PromoCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map_or(false, |expires_at| expires_at < now)
    }

    pub fn is_exhausted(&self) -> bool {
        match self.max_uses {
            Some(max) if max > 0 => self.uses_count >= max,
            _ => false,
        }
    }

    /// Text used in ledger descriptions
    pub fn label(&self) -> &str {
        self.description.as_deref().unwrap_or(&self.code)
    }
}

/// Fields for a new promo code
#[derive(Debug, Clone)]
pub struct NewPromoCode {
    pub code: String,
    pub point_value: i64,
    pub description: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
    pub max_uses: Option<i64>,
}

/// Uppercase and trim user-supplied code text
pub fn normalize_code(code: &str) -> String {
    code.trim().to_uppercase()
}

pub struct PromoCodeRegistry;

impl PromoCodeRegistry {
    /// Case-insensitive lookup
    pub async fn find_by_code(
        conn: &mut SqliteConnection,
        code: &str,
    ) -> PointsResult<Option<PromoCode>> {
        let promo = sqlx::query_as::<_, PromoCode>(&format!(
            "SELECT {} FROM promo_code WHERE code = ?1",
            PROMO_COLUMNS
        ))
        .bind(normalize_code(code))
        .fetch_optional(conn)
        .await?;

        Ok(promo)
    }

    /// Increment `uses_count` by one unless the usage limit is already reached.
    /// Returns false when the guard rejected the increment.
    pub async fn increment_usage(conn: &mut SqliteConnection, id: i64) -> PointsResult<bool> {
        let result = sqlx::query(
            "UPDATE promo_code SET uses_count = uses_count + 1
             WHERE id = ?1 AND (max_uses IS NULL OR max_uses = 0 OR uses_count < max_uses)",
        )
        .bind(id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    pub async fn create(conn: &mut SqliteConnection, new: &NewPromoCode) -> PointsResult<PromoCode> {
        let now = Utc::now();
        let code = normalize_code(&new.code);
        let result = sqlx::query(
            "INSERT INTO promo_code (code, point_value, description, active, created_at, expires_at, max_uses, uses_count)
             VALUES (?1, ?2, ?3, 1, ?4, ?5, ?6, 0)",
        )
        .bind(&code)
        .bind(new.point_value)
        .bind(&new.description)
        .bind(now)
        .bind(new.expires_at)
        .bind(new.max_uses)
        .execute(conn)
        .await?;

        Ok(PromoCode {
            id: result.last_insert_rowid(),
            code,
            point_value: new.point_value,
            description: new.description.clone(),
            active: true,
            created_at: now,
            expires_at: new.expires_at,
            max_uses: new.max_uses,
            uses_count: 0,
        })
    }

    pub async fn set_active(conn: &mut SqliteConnection, id: i64, active: bool) -> PointsResult<()> {
        sqlx::query("UPDATE promo_code SET active = ?1 WHERE id = ?2")
            .bind(active)
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::Duration;

    fn new_code(code: &str, max_uses: Option<i64>) -> NewPromoCode {
        NewPromoCode {
            code: code.to_string(),
            point_value: 75,
            description: None,
            expires_at: None,
            max_uses,
        }
    }

    #[test]
    fn test_normalize_code() {
        assert_eq!(normalize_code("  bonus \n"), "BONUS");
        assert_eq!(normalize_code(""), "");
    }

    #[tokio::test]
    async fn test_lookup_is_case_insensitive() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        PromoCodeRegistry::create(&mut conn, &new_code("bonus", None)).await.unwrap();

        let found = PromoCodeRegistry::find_by_code(&mut conn, " Bonus ").await.unwrap().unwrap();
        assert_eq!(found.code, "BONUS");
        assert_eq!(found.point_value, 75);
        assert!(PromoCodeRegistry::find_by_code(&mut conn, "MISSING").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_increment_usage_respects_limit() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let code = PromoCodeRegistry::create(&mut conn, &new_code("ONCE", Some(1))).await.unwrap();
        assert!(PromoCodeRegistry::increment_usage(&mut conn, code.id).await.unwrap());
        assert!(!PromoCodeRegistry::increment_usage(&mut conn, code.id).await.unwrap());

        let code = PromoCodeRegistry::find_by_code(&mut conn, "ONCE").await.unwrap().unwrap();
        assert_eq!(code.uses_count, 1);
        assert!(code.is_exhausted());
    }

    #[tokio::test]
    async fn test_zero_max_uses_is_unlimited() {
        let (pool, _dir) = test_pool().await;
        let mut conn = pool.acquire().await.unwrap();

        let code = PromoCodeRegistry::create(&mut conn, &new_code("OPEN", Some(0))).await.unwrap();
        for _ in 0..3 {
            assert!(PromoCodeRegistry::increment_usage(&mut conn, code.id).await.unwrap());
        }
        let code = PromoCodeRegistry::find_by_code(&mut conn, "OPEN").await.unwrap().unwrap();
        assert!(!code.is_exhausted());
    }

    #[test]
    fn test_expiry() {
        let now = Utc::now();
        let mut code = PromoCode {
            id: 1,
            code: "X".to_string(),
            point_value: 10,
            description: None,
            active: true,
            created_at: now,
            expires_at: Some(now - Duration::hours(1)),
            max_uses: None,
            uses_count: 0,
        };
        assert!(code.is_expired(now));

        code.expires_at = Some(now + Duration::hours(1));
        assert!(!code.is_expired(now));

        code.expires_at = None;
        assert!(!code.is_expired(now));
    }
}
