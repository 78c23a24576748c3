/// HTTP server setup and routing
use crate::{
    context::AppContext,
    error::{PointsError, PointsResult},
    rate_limit::rate_limit_middleware,
};
use axum::{
    http::{header, Method, StatusCode},
    middleware,
    response::Json,
    Router,
};
use serde_json::json;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

/// Build the main application router
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    let rate_limiter = ctx.rate_limiter.clone();

    Router::new()
        .merge(crate::api::routes())
        .fallback(not_found)
        .with_state(ctx)
        .layer(middleware::from_fn_with_state(rate_limiter, rate_limit_middleware))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
}

/// 404 handler
async fn not_found() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({
            "error": "NotFound",
            "message": "Endpoint not found"
        })),
    )
}

/// Start the HTTP server
pub async fn serve(ctx: AppContext) -> PointsResult<()> {
    let addr = format!("{}:{}", ctx.config.service.hostname, ctx.config.service.port);

    info!("Loyalty points backend listening on {}", addr);
    info!("   Database: {}", ctx.config.storage.database.display());
    info!("   Service URL: {}", ctx.service_url());

    let app = build_router(ctx);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| PointsError::Internal(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| PointsError::Internal(format!("Server error: {}", e)))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::ServerConfig,
        db::{
            promo::{NewPromoCode, PromoCodeRegistry},
            test_pool,
        },
    };
    use axum::{body::Body, http::Request};
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    struct TestApp {
        ctx: AppContext,
        _dir: TempDir,
    }

    impl TestApp {
        async fn new() -> Self {
            let (pool, dir) = test_pool().await;
            let config = ServerConfig::for_tests(dir.path().join("test.sqlite"));
            Self {
                ctx: AppContext::with_pool(config, pool),
                _dir: dir,
            }
        }

        async fn add_code(&self, code: &str, point_value: i64, max_uses: Option<i64>) {
            let mut conn = self.ctx.db.acquire().await.unwrap();
            PromoCodeRegistry::create(
                &mut conn,
                &NewPromoCode {
                    code: code.to_string(),
                    point_value,
                    description: None,
                    expires_at: None,
                    max_uses,
                },
            )
            .await
            .unwrap();
        }

        async fn send(
            &self,
            method: &str,
            uri: &str,
            token: Option<&str>,
            body: Option<Value>,
        ) -> (StatusCode, Value) {
            let mut builder = Request::builder().method(method).uri(uri);
            if let Some(token) = token {
                builder = builder.header("authorization", format!("Bearer {}", token));
            }
            let request = match body {
                Some(body) => builder
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
                None => builder.body(Body::empty()).unwrap(),
            };

            let response = build_router(self.ctx.clone()).oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let json = if bytes.is_empty() {
                Value::Null
            } else {
                serde_json::from_slice(&bytes).unwrap()
            };
            (status, json)
        }

        async fn send_raw(&self, uri: &str, token: &str, body: &str) -> (StatusCode, Value) {
            let request = Request::builder()
                .method("POST")
                .uri(uri)
                .header("authorization", format!("Bearer {}", token))
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();

            let response = build_router(self.ctx.clone()).oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }

        async fn register(&self, email: &str, national_id: &str) -> String {
            let (status, body) = self
                .send(
                    "POST",
                    "/api/auth/register",
                    None,
                    Some(json!({
                        "email": email,
                        "password": "secret123",
                        "full_name": "Ana Gomez",
                        "national_id": national_id,
                        "address": "Calle 1",
                        "birth_date": "1990-05-17"
                    })),
                )
                .await;
            assert_eq!(status, StatusCode::CREATED, "{}", body);
            body["token"].as_str().unwrap().to_string()
        }
    }

    #[tokio::test]
    async fn test_health_and_fallback() {
        let app = TestApp::new().await;

        let (status, body) = app.send("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");

        let (status, body) = app.send("GET", "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NotFound");
    }

    #[tokio::test]
    async fn test_register_login_and_verify() {
        let app = TestApp::new().await;
        let token = app.register("ana@example.com", "111").await;

        let (status, body) = app
            .send(
                "POST",
                "/api/auth/register",
                None,
                Some(json!({ "email": "ana@example.com", "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InvalidRequest");

        let (status, _) = app
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": "ana@example.com", "password": "wrong-pass" })),
            )
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send(
                "POST",
                "/api/auth/login",
                None,
                Some(json!({ "email": "ana@example.com", "password": "secret123" })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["account"]["points_balance"], 100);
        assert!(body["account"].get("password_hash").is_none());

        let (status, body) = app
            .send("POST", "/api/auth/verify-token", None, Some(json!({ "token": token })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);

        let (status, _) = app
            .send("POST", "/api/auth/verify-token", None, Some(json!({ "token": "" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = app
            .send("POST", "/api/auth/verify-token", None, Some(json!({ "token": "garbage" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app.send("POST", "/api/auth/logout", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_points_routes_require_token() {
        let app = TestApp::new().await;

        for (method, uri) in [
            ("GET", "/api/points"),
            ("GET", "/api/user/points"),
            ("GET", "/api/history"),
            ("GET", "/api/rewards/history"),
        ] {
            let (status, body) = app.send(method, uri, None, None).await;
            assert_eq!(status, StatusCode::UNAUTHORIZED, "{}", uri);
            assert_eq!(body["error"], "AuthenticationRequired");
        }

        let (status, _) = app
            .send("POST", "/api/codes/redeem", Some("bad.token.here"), Some(json!({ "code": "X" })))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_redeem_and_reward_flow() {
        let app = TestApp::new().await;
        app.add_code("BONUS", 75, None).await;
        let token = app.register("ana@example.com", "111").await;

        let (status, body) = app
            .send("POST", "/api/codes/validate", Some(&token), Some(json!({ "code": "bonus" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], true);

        let (status, body) = app
            .send("POST", "/api/codes/validate", Some(&token), Some(json!({ "code": "NOPE" })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], false);
        assert_eq!(body["reason"], "InvalidCode");

        let (status, body) = app
            .send("POST", "/api/codes/redeem", Some(&token), Some(json!({ "code": " bonus " })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points_awarded"], 75);
        assert_eq!(body["points_balance"], 175);

        let (status, body) = app
            .send("POST", "/api/codes/redeem", Some(&token), Some(json!({ "code": "BONUS" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "AlreadyRedeemed");

        let reward = |points: i64| {
            json!({
                "reward_id": "mug",
                "reward_name": "Coffee mug",
                "points_required": points,
                "delivery_address": "Calle 1"
            })
        };

        let (status, body) = app
            .send("POST", "/api/rewards/redeem", Some(&token), Some(reward(200)))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "InsufficientPoints");

        let (status, body) = app
            .send("POST", "/api/rewards/redeem", Some(&token), Some(reward(150)))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points_remaining"], 25);
        assert_eq!(body["redemption"]["status"], "pending");

        let (status, body) = app.send("GET", "/api/points", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points_balance"], 25);

        let (status, body) = app.send("GET", "/api/user/history", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 3);
        assert_eq!(body["entries"][0]["points_delta"], -150);
        assert_eq!(body["entries"][1]["points_delta"], 75);
        assert_eq!(body["entries"][2]["points_delta"], 100);

        let (status, body) = app.send("GET", "/api/rewards/history", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
        assert_eq!(body["entries"][0]["reward_name"], "Coffee mug");
    }

    #[tokio::test]
    async fn test_malformed_bodies_are_invalid_request() {
        let app = TestApp::new().await;
        let token = app.register("ana@example.com", "111").await;

        for body in [
            r#"{"reward_id":"mug","reward_name":"Coffee mug","points_required":"150"}"#,
            r#"{"reward_id":7,"reward_name":"Coffee mug","points_required":150}"#,
            "not json",
        ] {
            let (status, json) = app.send_raw("/api/rewards/redeem", &token, body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", body);
            assert_eq!(json["error"], "InvalidRequest");
            assert!(json["message"].is_string());
        }

        let (status, json) = app.send_raw("/api/codes/redeem", &token, r#"{"code":5}"#).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json["error"], "InvalidRequest");

        let (status, body) = app.send("GET", "/api/points", Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["points_balance"], 100);
    }

    #[tokio::test]
    async fn test_rate_limit_rejects_anonymous_flood() {
        let (pool, dir) = test_pool().await;
        let mut config = ServerConfig::for_tests(dir.path().join("test.sqlite"));
        config.rate_limit.enabled = true;
        config.rate_limit.burst_size = 5;
        config.rate_limit.unauthenticated_rps = 1;
        let app = TestApp {
            ctx: AppContext::with_pool(config, pool),
            _dir: dir,
        };

        let (status, _) = app.send("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = app.send("GET", "/api/health", None, None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "RateLimitExceeded");

        // Unknown paths go through the same layers
        let (status, _) = app.send("GET", "/api/nope", None, None).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
    }
}
