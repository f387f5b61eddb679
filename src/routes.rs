//! HTTP routing table.

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{
    db::DbPool,
    handlers,
    middleware::signature::{SignatureLayerState, signature_middleware},
};

/// Build the application router.
///
/// | Method | Path | Signed |
/// |---|---|---|
/// | GET | `/health` | no |
/// | GET | `/transactions` | no |
/// | POST | `/transactions` | yes |
/// | POST | `/transactions/seed` | yes |
pub fn build_router(pool: DbPool, signature: SignatureLayerState) -> Router {
    let body_limit = DefaultBodyLimit::max(signature.max_body_bytes);

    // Routes that mutate data require a valid X-Signature
    let signed_routes = Router::new()
        .route(
            "/transactions",
            post(handlers::transactions::create_transaction),
        )
        .route(
            "/transactions/seed",
            post(handlers::transactions::seed_transactions),
        )
        .route_layer(axum_middleware::from_fn_with_state(
            signature,
            signature_middleware,
        ))
        .route_layer(body_limit);

    Router::new()
        // Public routes
        .route("/health", get(handlers::health::health_check))
        .route(
            "/transactions",
            get(handlers::transactions::list_transactions),
        )
        .merge(signed_routes)
        .layer(TraceLayer::new_for_http())
        // Share database pool with all handlers via State extraction
        .with_state(pool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::signature_service::{SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER};
    use std::{
        pin::Pin,
        task::{Context, Poll},
    };

    use axum::{
        body::{Body, Bytes, HttpBody, to_bytes},
        http::{Request, StatusCode},
        response::Response,
    };
    use serde_json::{Value, json};
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;

    const SECRET: &str = "test-secret";
    const TIMESTAMP: &str = "1736935800";

    fn signature_state(tolerance_secs: Option<u64>) -> SignatureLayerState {
        SignatureLayerState {
            verifier: SignatureVerifier::new(SECRET),
            tolerance_secs,
            max_body_bytes: 4096,
        }
    }

    /// Router over a pool that never connects; only usable for requests that
    /// are answered before any query runs.
    fn offline_router(tolerance_secs: Option<u64>) -> Router {
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://loyalty@127.0.0.1:1/unused")
            .unwrap();
        build_router(pool, signature_state(tolerance_secs))
    }

    fn signed_post(uri: &str, timestamp: &str, body: &str) -> Request<Body> {
        let signature = SignatureVerifier::new(SECRET).sign(timestamp, body.as_bytes());
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .header(TIMESTAMP_HEADER, timestamp)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response: Response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, body)
    }

    fn invalid_signature_body() -> Value {
        json!({ "status": "error", "message": "Invalid signature" })
    }

    #[tokio::test]
    async fn unsigned_create_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/transactions")
            .header("Content-Type", "application/json")
            .body(Body::from(r#"{"user_id":1}"#))
            .unwrap();

        let (status, body) = send(offline_router(None), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, invalid_signature_body());
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let original = r#"{"user_id":1,"amount":1500,"description":"Coffee","transacted_at":"2025-01-15"}"#;
        let signature = SignatureVerifier::new(SECRET).sign(TIMESTAMP, original.as_bytes());
        let tampered = original.replace("1500", "150000");

        let request = Request::builder()
            .method("POST")
            .uri("/transactions")
            .header(TIMESTAMP_HEADER, TIMESTAMP)
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(tampered))
            .unwrap();

        let (status, body) = send(offline_router(None), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, invalid_signature_body());
    }

    #[tokio::test]
    async fn missing_timestamp_is_rejected() {
        let body = r#"{"user_id":1}"#;
        let signature = SignatureVerifier::new(SECRET).sign("", body.as_bytes());

        let request = Request::builder()
            .method("POST")
            .uri("/transactions")
            .header(SIGNATURE_HEADER, signature)
            .body(Body::from(body))
            .unwrap();

        let (status, _) = send(offline_router(None), request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn non_positive_amounts_fail_validation() {
        for amount in ["0", "-250"] {
            let body = format!(
                r#"{{"user_id":1,"amount":{amount},"description":"Refund","transacted_at":"2025-01-15 10:00:00"}}"#
            );

            let (status, body) =
                send(offline_router(None), signed_post("/transactions", TIMESTAMP, &body)).await;

            assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY, "amount {amount}");
            assert_eq!(
                body,
                json!({ "message": { "amount": ["The amount field must be at least 1."] } })
            );
        }
    }

    #[tokio::test]
    async fn malformed_json_reports_required_fields() {
        let (status, body) =
            send(offline_router(None), signed_post("/transactions", TIMESTAMP, "{not json")).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        let fields = body["message"].as_object().unwrap();
        let mut names: Vec<&str> = fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        assert_eq!(names, ["amount", "description", "transacted_at", "user_id"]);
    }

    #[tokio::test]
    async fn unsigned_seed_is_rejected() {
        let request = Request::builder()
            .method("POST")
            .uri("/transactions/seed")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(offline_router(None), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, invalid_signature_body());
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let body = "x".repeat(8192);

        let (status, _) =
            send(offline_router(None), signed_post("/transactions", TIMESTAMP, &body)).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    /// Body whose stream fails on first poll, like a client that disconnects.
    struct BrokenBody;

    impl HttpBody for BrokenBody {
        type Data = Bytes;
        type Error = std::io::Error;

        fn poll_frame(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
        ) -> Poll<Option<Result<http_body::Frame<Bytes>, Self::Error>>> {
            Poll::Ready(Some(Err(std::io::Error::new(
                std::io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))))
        }
    }

    #[tokio::test]
    async fn failed_body_stream_is_bad_request() {
        let request = Request::builder()
            .method("POST")
            .uri("/transactions")
            .header(TIMESTAMP_HEADER, TIMESTAMP)
            .header(SIGNATURE_HEADER, "0".repeat(64))
            .body(Body::new(BrokenBody))
            .unwrap();

        let (status, body) = send(offline_router(None), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["status"], "error");
        assert_ne!(body, invalid_signature_body());
    }

    #[tokio::test]
    async fn stale_timestamp_is_rejected_when_window_configured() {
        let body = r#"{"user_id":1}"#;

        let (status, body) =
            send(offline_router(Some(300)), signed_post("/transactions", "1000", body)).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, invalid_signature_body());
    }

    #[tokio::test]
    async fn fresh_timestamp_passes_window() {
        let now = chrono::Utc::now().timestamp().to_string();
        let body = r#"{"user_id":1,"amount":0}"#;

        let (status, _) =
            send(offline_router(Some(300)), signed_post("/transactions", &now, body)).await;

        // Past the signature check, stopped by validation
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn list_rejects_bad_paging() {
        let request = Request::builder()
            .uri("/transactions?per_page=0")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(offline_router(None), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"]["per_page"].is_array());
    }

    #[tokio::test]
    async fn list_rejects_repeated_query_keys_as_validation_error() {
        let request = Request::builder()
            .uri("/transactions?per_page=1&per_page=2")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(offline_router(None), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"]["query"].is_array());
    }

    #[tokio::test]
    async fn list_rejects_unparseable_dates_when_both_given() {
        let request = Request::builder()
            .uri("/transactions?start_date=yesterday&end_date=2025-01-31")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(offline_router(None), request).await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"]["start_date"].is_array());
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn create_then_list_round_trip(pool: DbPool) {
        let router = build_router(pool, signature_state(None));
        let body = r#"{"user_id":3,"amount":1999,"description":"Shoes","transacted_at":"2025-01-15 10:30:00"}"#;

        let (status, created) =
            send(router.clone(), signed_post("/transactions", TIMESTAMP, body)).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["code"], 201);
        assert_eq!(created["message"], "Transaction created successfully");
        assert_eq!(created["data"]["user_id"], 3);
        assert_eq!(created["data"]["amount"], "1999.00");

        let request = Request::builder()
            .uri("/transactions?start_date=2025-01-15&end_date=2025-01-15")
            .body(Body::empty())
            .unwrap();
        let (status, listed) = send(router, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            listed["data"],
            json!([{
                "user_id": 3,
                "amount": "1999.00",
                "points": 1,
                "description": "Shoes",
                "transacted_at": "2025-01-15T10:30:00"
            }])
        );
        assert_eq!(listed["pagination"]["current_page"], 1);
        assert_eq!(listed["pagination"]["total_pages"], 1);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn signed_seed_creates_thousand_rows(pool: DbPool) {
        let router = build_router(pool, signature_state(None));

        let (status, body) =
            send(router, signed_post("/transactions/seed", TIMESTAMP, "")).await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(
            body,
            json!({ "code": 201, "message": "Seed 1000 transactions successfully", "count": 1000 })
        );
    }
}
