//! Request signature middleware.
//!
//! This middleware intercepts every signed route to:
//! 1. Buffer the raw request body
//! 2. Recompute HMAC-SHA256 over `X-Timestamp || body` and compare with `X-Signature`
//! 3. Optionally reject timestamps outside the replay window
//! 4. Hand the untouched body on to the route handler
//!
//! Failures are reported as HTTP 400 with `{"status":"error","message":"Invalid signature"}`.

use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request, State},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use crate::{
    error::AppError,
    services::signature_service::{
        SIGNATURE_HEADER, SignatureVerifier, TIMESTAMP_HEADER, timestamp_is_fresh,
    },
};

/// Everything the middleware needs, shared across requests.
#[derive(Debug, Clone)]
pub struct SignatureLayerState {
    pub verifier: SignatureVerifier,

    /// Maximum distance between `X-Timestamp` and the server clock, in seconds
    ///
    /// `None` disables the check; the timestamp is then only part of the signed data.
    pub tolerance_secs: Option<u64>,

    /// Bodies larger than this are rejected with 413 before verification.
    /// Applied by the router as a `DefaultBodyLimit` on the signed routes.
    pub max_body_bytes: usize,
}

/// Signature verification middleware function.
///
/// # Flow
///
/// 1. Read `X-Timestamp` and `X-Signature` headers
/// 2. Buffer the body (up to `max_body_bytes`; 413 past it, 400 if the stream fails)
/// 3. Verify the signature over the exact bytes received
/// 4. If valid: rebuild the request with the same body, call next handler
/// 5. If not: return 400 Bad Request
///
/// # Headers
///
/// ```text
/// X-Timestamp: 1736935800
/// X-Signature: 5d1f...e9 (hex HMAC-SHA256 of timestamp + body)
/// ```
pub async fn signature_middleware(
    State(state): State<SignatureLayerState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let (parts, body) = request.into_parts();

    let Some(timestamp) = header_str(&parts.headers, TIMESTAMP_HEADER) else {
        tracing::warn!(path = %parts.uri.path(), "rejected request without timestamp header");
        return Err(AppError::InvalidSignature);
    };
    let timestamp = timestamp.to_owned();
    let signature = header_str(&parts.headers, SIGNATURE_HEADER).map(str::to_owned);

    // The limit itself comes from the DefaultBodyLimit layer on the signed routes
    let bytes = Bytes::from_request(Request::from_parts(parts.clone(), body), &())
        .await
        .map_err(|rejection| {
            if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge
            } else {
                tracing::warn!(path = %parts.uri.path(), error = %rejection, "failed to read request body");
                AppError::InvalidRequest(rejection.body_text())
            }
        })?;

    if !state
        .verifier
        .verify(&timestamp, signature.as_deref(), &bytes)
    {
        tracing::warn!(path = %parts.uri.path(), "rejected request with invalid signature");
        return Err(AppError::InvalidSignature);
    }

    if let Some(tolerance) = state.tolerance_secs {
        if !timestamp_is_fresh(&timestamp, Utc::now().timestamp(), tolerance) {
            tracing::warn!(path = %parts.uri.path(), %timestamp, "rejected stale request timestamp");
            return Err(AppError::InvalidSignature);
        }
    }

    let request = Request::from_parts(parts, Body::from(bytes));
    Ok(next.run(request).await)
}

fn header_str<'a>(headers: &'a axum::http::HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|h| h.to_str().ok())
}
