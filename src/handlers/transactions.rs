//! Transaction HTTP handlers.
//!
//! This module implements transaction-related API endpoints:
//! - POST /transactions - Record a transaction and its points (signed)
//! - GET /transactions - List transactions with points, paginated
//! - POST /transactions/seed - Insert 1000 synthetic transactions (signed)

use axum::{
    Json,
    body::Bytes,
    extract::{Query, State, rejection::QueryRejection},
    http::StatusCode,
};
use serde_json::Value;

use crate::{
    db::DbPool,
    error::{AppError, ValidationErrors},
    models::transaction::{
        CreatedTransactionResponse, ListTransactionsQuery, NewTransaction, SeedResponse,
        TransactionListResponse,
    },
    services::transaction_service,
};

/// Record a transaction.
///
/// The signature middleware has already checked the body, so it is parsed
/// here from the exact bytes that were signed.
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": 1,
///   "amount": 150000,
///   "description": "Groceries",
///   "transacted_at": "2025-01-15 10:30:00"
/// }
/// ```
///
/// # Response (201)
///
/// ```json
/// {
///   "code": 201,
///   "message": "Transaction created successfully",
///   "data": {
///     "id": "770e8400-...",
///     "user_id": 1,
///     "amount": "150000.00",
///     "description": "Groceries",
///     "transacted_at": "2025-01-15T10:30:00",
///     "created_at": "2025-01-15T10:30:01Z",
///     "updated_at": "2025-01-15T10:30:01Z"
///   }
/// }
/// ```
///
/// # Response (422)
///
/// ```json
/// { "message": { "amount": ["The amount field must be at least 1."] } }
/// ```
pub async fn create_transaction(
    State(pool): State<DbPool>,
    body: Bytes,
) -> Result<(StatusCode, Json<CreatedTransactionResponse>), AppError> {
    // Unparseable JSON is validated like an empty object
    let payload: Value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    let new = NewTransaction::from_json(&payload)?;

    let transaction = transaction_service::create_transaction(&pool, new).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreatedTransactionResponse {
            code: StatusCode::CREATED.as_u16(),
            message: "Transaction created successfully",
            data: transaction,
        }),
    ))
}

/// List transactions with their points.
///
/// # Query Parameters
///
/// - `per_page` (default 10, max 100)
/// - `page` (default 1)
/// - `start_date`, `end_date`: inclusive filter on `transacted_at`, applied
///   only when both are given
///
/// # Response (200)
///
/// ```json
/// {
///   "data": [
///     {
///       "user_id": 1,
///       "amount": "150000.00",
///       "points": 150,
///       "description": "Groceries",
///       "transacted_at": "2025-01-15T10:30:00"
///     }
///   ],
///   "pagination": { "current_page": 1, "total_pages": 3, "per_page": 10, "total": 25 }
/// }
/// ```
pub async fn list_transactions(
    State(pool): State<DbPool>,
    query: Result<Query<ListTransactionsQuery>, QueryRejection>,
) -> Result<Json<TransactionListResponse>, AppError> {
    // Repeated keys and similar decode failures still answer with a 422 body
    let Query(query) = query.map_err(|rejection| {
        let mut errors = ValidationErrors::new();
        errors.add("query", rejection.body_text());
        AppError::Validation(errors)
    })?;
    let filter = query.validate()?;

    let (data, pagination) = transaction_service::list_transactions(&pool, filter).await?;

    Ok(Json(TransactionListResponse { data, pagination }))
}

/// Seed 1000 synthetic transactions for user 1.
///
/// Signed like every other write; the body may be empty.
///
/// # Response (201)
///
/// ```json
/// { "code": 201, "message": "Seed 1000 transactions successfully", "count": 1000 }
/// ```
pub async fn seed_transactions(
    State(pool): State<DbPool>,
) -> Result<(StatusCode, Json<SeedResponse>), AppError> {
    let count = transaction_service::seed_transactions(&pool).await?;

    Ok((
        StatusCode::CREATED,
        Json(SeedResponse {
            code: StatusCode::CREATED.as_u16(),
            message: format!("Seed {count} transactions successfully"),
            count,
        }),
    ))
}
