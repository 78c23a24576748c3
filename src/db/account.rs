/// Account store: user and administrator identity records
use crate::error::{PointsError, PointsResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqliteConnection};

const ACCOUNT_COLUMNS: &str = "id, username, email, password_hash, first_name, last_name, full_name,
    national_id, address, birth_date, points_balance, email_verified, active,
    created_at, updated_at, last_login_at";

/// Account record in the database
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Account {
    pub id: i64,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub national_id: String,
    pub address: String,
    pub birth_date: NaiveDate,
    pub points_balance: i64,
    pub email_verified: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Profile fields for a new account
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub full_name: String,
    pub national_id: String,
    pub address: String,
    pub birth_date: NaiveDate,
    pub points_balance: i64,
}

/// Administrator record
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Administrator {
    pub id: i64,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub name: String,
    pub role: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

/// Persistence for accounts. No business rules live here.
pub struct AccountStore;

impl AccountStore {
    pub async fn find_by_id(conn: &mut SqliteConnection, id: i64) -> PointsResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE id = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        Ok(account)
    }

    pub async fn find_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> PointsResult<Option<Account>> {
        let account = sqlx::query_as::<_, Account>(&format!(
            "SELECT {} FROM account WHERE email = ?1",
            ACCOUNT_COLUMNS
        ))
        .bind(email)
        .fetch_optional(conn)
        .await?;

        Ok(account)
    }

    /// Name of the first identity key already taken by another account
    pub async fn find_conflict(
        conn: &mut SqliteConnection,
        email: &str,
        username: &str,
        national_id: &str,
    ) -> PointsResult<Option<&'static str>> {
        let checks: [(&'static str, &str, &str); 3] = [
            ("email", "SELECT COUNT(*) FROM account WHERE email = ?1", email),
            ("username", "SELECT COUNT(*) FROM account WHERE username = ?1", username),
            ("national_id", "SELECT COUNT(*) FROM account WHERE national_id = ?1", national_id),
        ];

        for (field, query, value) in checks {
            let count: i64 = sqlx::query_scalar(query)
                .bind(value)
                .fetch_one(&mut *conn)
                .await?;
            if count > 0 {
                return Ok(Some(field));
            }
        }

        Ok(None)
    }

    /// Insert a new account. Fails with `DuplicateKey` on email, username or national id.
    pub async fn create(
        conn: &mut SqliteConnection,
        profile: &NewAccount,
        password_hash: &str,
    ) -> PointsResult<Account> {
        if let Some(field) =
            Self::find_conflict(conn, &profile.email, &profile.username, &profile.national_id)
                .await?
        {
            return Err(PointsError::DuplicateKey(format!("{} is already registered", field)));
        }

        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO account (username, email, password_hash, first_name, last_name, full_name,
                national_id, address, birth_date, points_balance, email_verified, active, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
        )
        .bind(&profile.username)
        .bind(&profile.email)
        .bind(password_hash)
        .bind(&profile.first_name)
        .bind(&profile.last_name)
        .bind(&profile.full_name)
        .bind(&profile.national_id)
        .bind(&profile.address)
        .bind(profile.birth_date)
        .bind(profile.points_balance)
        .bind(true)
        .bind(true)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            let err = PointsError::Storage(e);
            if err.is_unique_violation() {
                PointsError::DuplicateKey("Account already registered".to_string())
            } else {
                err
            }
        })?;

        let id = result.last_insert_rowid();
        Self::find_by_id(conn, id)
            .await?
            .ok_or_else(|| PointsError::Internal(format!("Account {} missing after insert", id)))
    }

    /// Take the database write lock on behalf of the current transaction and
    /// return the account row. Returns `None` when the account does not exist.
    pub async fn lock(conn: &mut SqliteConnection, id: i64) -> PointsResult<Option<Account>> {
        let result = sqlx::query("UPDATE account SET updated_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        Self::find_by_id(conn, id).await
    }

    /// Overwrite the balance. Callers have already validated non-negativity.
    pub async fn update_balance(
        conn: &mut SqliteConnection,
        id: i64,
        new_balance: i64,
    ) -> PointsResult<()> {
        let result = sqlx::query("UPDATE account SET points_balance = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(new_balance)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PointsError::NotFound(format!("Account {} not found", id)));
        }

        Ok(())
    }

    pub async fn record_login(conn: &mut SqliteConnection, id: i64) -> PointsResult<()> {
        sqlx::query("UPDATE account SET last_login_at = ?1 WHERE id = ?2")
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await?;

        Ok(())
    }

    pub async fn set_active(conn: &mut SqliteConnection, id: i64, active: bool) -> PointsResult<()> {
        let result = sqlx::query("UPDATE account SET active = ?1, updated_at = ?2 WHERE id = ?3")
            .bind(active)
            .bind(Utc::now())
            .bind(id)
            .execute(conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(PointsError::NotFound(format!("Account {} not found", id)));
        }

        Ok(())
    }
}

/// Persistence for administrator records
pub struct AdministratorStore;

impl AdministratorStore {
    pub async fn find_by_email(
        conn: &mut SqliteConnection,
        email: &str,
    ) -> PointsResult<Option<Administrator>> {
        let admin = sqlx::query_as::<_, Administrator>(
            "SELECT id, email, password_hash, name, role, active, created_at
             FROM administrator WHERE email = ?1",
        )
        .bind(email)
        .fetch_optional(conn)
        .await?;

        Ok(admin)
    }

    pub async fn create(
        conn: &mut SqliteConnection,
        email: &str,
        name: &str,
        password_hash: &str,
    ) -> PointsResult<Administrator> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO administrator (email, password_hash, name, role, active, created_at)
             VALUES (?1, ?2, ?3, 'admin', 1, ?4)",
        )
        .bind(email)
        .bind(password_hash)
        .bind(name)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            let err = PointsError::Storage(e);
            if err.is_unique_violation() {
                PointsError::DuplicateKey(format!("Administrator {} already exists", email))
            } else {
                err
            }
        })?;

        Ok(Administrator {
            id: result.last_insert_rowid(),
            email: email.to_string(),
            password_hash: password_hash.to_string(),
            name: name.to_string(),
            role: "admin".to_string(),
            active: true,
            created_at: now,
        })
    }
}
