/// Account manager: registration, login and bearer tokens
use crate::{
    account::{RegisterRequest, TokenClaims, ValidatedSession},
    config::ServerConfig,
    db::{
        account::{Account, AccountStore, NewAccount},
        ledger::{NewLedgerEntry, OperationKind, PointsLedger},
    },
    error::{PointsError, PointsResult},
};
use chrono::{Duration, NaiveDate, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use sqlx::SqlitePool;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

/// Account manager service
pub struct AccountManager {
    db: SqlitePool,
    config: Arc<ServerConfig>,
}

impl AccountManager {
    pub fn new(db: SqlitePool, config: Arc<ServerConfig>) -> Self {
        Self { db, config }
    }

    /// Register a new account, crediting the welcome bonus and recording it
    /// in the ledger in the same transaction
    pub async fn register(&self, req: RegisterRequest) -> PointsResult<(Account, String)> {
        let profile = Self::profile_from_request(&req, self.config.points.welcome_bonus)?;
        let password_hash = self.hash_password(&req.password).await?;

        let mut tx = self.db.begin().await?;

        let account = AccountStore::create(&mut tx, &profile, &password_hash).await?;

        if account.points_balance > 0 {
            PointsLedger::append(
                &mut tx,
                NewLedgerEntry {
                    account_id: account.id,
                    operation_kind: OperationKind::CreditLoad,
                    points_delta: account.points_balance,
                    description: "Welcome bonus".to_string(),
                    promo_code_used: None,
                    external_reference: None,
                },
            )
            .await?;
        }

        tx.commit().await?;

        tracing::info!("Registered account {} ({})", account.id, account.email);

        let token = self.issue_token(account.id)?;
        Ok((account, token))
    }

    /// Check credentials and issue a token
    pub async fn login(&self, email: &str, password: &str) -> PointsResult<(Account, String)> {
        let email = email.trim().to_lowercase();
        if email.is_empty() || password.is_empty() {
            return Err(PointsError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let mut conn = self.db.acquire().await?;

        let account = AccountStore::find_by_email(&mut conn, &email)
            .await?
            .ok_or_else(|| PointsError::Authentication("Invalid credentials".to_string()))?;

        if !self.verify_password(password, &account.password_hash).await? {
            tracing::warn!("Failed login for {}", email);
            return Err(PointsError::Authentication("Invalid credentials".to_string()));
        }

        if !account.active {
            return Err(PointsError::Forbidden("Account is deactivated".to_string()));
        }

        AccountStore::record_login(&mut conn, account.id).await?;

        let token = self.issue_token(account.id)?;
        Ok((account, token))
    }

    /// Resolve a token to an active account
    pub async fn authenticate(&self, token: &str) -> PointsResult<Account> {
        let session = self.validate_access_token(token)?;
        let mut conn = self.db.acquire().await?;

        let account = AccountStore::find_by_id(&mut conn, session.account_id)
            .await?
            .ok_or_else(|| PointsError::Authentication("Account not found".to_string()))?;

        if !account.active {
            return Err(PointsError::Forbidden("Account is deactivated".to_string()));
        }

        Ok(account)
    }

    /// Sign a token for the account, valid for the configured number of days
    pub fn issue_token(&self, account_id: i64) -> PointsResult<String> {
        let now = Utc::now();
        let claims = TokenClaims {
            sub: account_id.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::days(self.config.authentication.token_ttl_days)).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes()),
        )
        .map_err(|e| PointsError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verify signature and expiry
    pub fn validate_access_token(&self, token: &str) -> PointsResult<ValidatedSession> {
        let decoding_key = DecodingKey::from_secret(self.config.authentication.jwt_secret.as_bytes());
        let validation = Validation::new(Algorithm::HS256);

        let data = decode::<TokenClaims>(token, &decoding_key, &validation).map_err(|e| {
            tracing::warn!("Token verification failed: {}", e);
            match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                    PointsError::Authentication("Token has expired".to_string())
                }
                _ => PointsError::Authentication("Invalid token".to_string()),
            }
        })?;

        let account_id = data
            .claims
            .sub
            .parse()
            .map_err(|_| PointsError::Authentication("Invalid token subject".to_string()))?;

        Ok(ValidatedSession { account_id })
    }

    /// bcrypt runs on the blocking pool
    pub async fn hash_password(&self, password: &str) -> PointsResult<String> {
        let password = password.to_string();
        let cost = self.config.authentication.password_hash_cost;

        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| PointsError::Internal(format!("Password hashing task failed: {}", e)))?
            .map_err(|e| PointsError::Internal(format!("Password hashing failed: {}", e)))
    }

    async fn verify_password(&self, password: &str, hash: &str) -> PointsResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();

        tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| PointsError::Internal(format!("Password verification task failed: {}", e)))?
            .map_err(|e| PointsError::Internal(format!("Password verification failed: {}", e)))
    }

    fn profile_from_request(req: &RegisterRequest, welcome_bonus: i64) -> PointsResult<NewAccount> {
        req.validate()
            .map_err(|e| PointsError::Validation(e.to_string()))?;

        let required = [
            ("full_name", &req.full_name),
            ("national_id", &req.national_id),
            ("address", &req.address),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(PointsError::Validation(format!("{} is required", field)));
            }
        }

        let birth_date = NaiveDate::parse_from_str(req.birth_date.trim(), "%Y-%m-%d").map_err(|_| {
            PointsError::Validation("birth_date must use the YYYY-MM-DD format".to_string())
        })?;

        let email = req.email.trim().to_lowercase();
        let username = req
            .username
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.clone());

        Ok(NewAccount {
            username,
            email,
            first_name: req.first_name.clone().unwrap_or_default(),
            last_name: req.last_name.clone().unwrap_or_default(),
            full_name: req.full_name.trim().to_string(),
            national_id: req.national_id.trim().to_string(),
            address: req.address.trim().to_string(),
            birth_date,
            points_balance: welcome_bonus,
        })
    }
}
