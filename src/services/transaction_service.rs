//! Transaction service - Core business logic for loyalty transactions.
//!
//! This service handles:
//! - Recording a transaction together with its point row
//! - Listing transactions with their points, filtered and paginated
//! - Seeding synthetic transactions
//!
//! # Atomicity Guarantees
//!
//! A transaction and its point row are always written inside the same
//! PostgreSQL transaction. If the point insert fails, the transaction row is
//! rolled back with it.

use bigdecimal::BigDecimal;
use chrono::{Duration, NaiveDateTime, Utc};
use rand::Rng;
use sqlx::{Postgres, QueryBuilder};

use crate::{
    db::DbPool,
    error::AppError,
    models::{
        pagination::{PageRequest, Pagination},
        point::{Point, points_for_amount},
        transaction::{DateRange, ListFilter, NewTransaction, Transaction, TransactionListItem},
    },
};

/// Number of rows written by [`seed_transactions`].
pub const SEED_COUNT: usize = 1000;
/// User that owns seeded transactions.
pub const SEED_USER_ID: i64 = 1;
pub const SEED_MIN_AMOUNT: i64 = 10_000;
pub const SEED_MAX_AMOUNT: i64 = 500_000;
pub const SEED_MAX_DAYS_AGO: i64 = 365;

/// Record a transaction and its loyalty points.
///
/// # Process
///
/// 1. Derive points from the amount
/// 2. Start database transaction
/// 3. Insert the transaction row
/// 4. Insert the point row referencing it
/// 5. Commit (or rollback on error)
///
/// # Errors
///
/// - `InvalidRequest`: Amount cannot earn points (negative or out of range)
/// - `Database`: Database error occurred
pub async fn create_transaction(
    pool: &DbPool,
    new: NewTransaction,
) -> Result<Transaction, AppError> {
    let points = points_for_amount(&new.amount)
        .ok_or_else(|| AppError::InvalidRequest("Amount cannot be converted to points".to_string()))?;

    // Start db transaction
    let mut tx = pool.begin().await?;

    let transaction = sqlx::query_as::<_, Transaction>(
        r#"
        INSERT INTO transactions (user_id, amount, description, transacted_at)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(new.user_id)
    .bind(&new.amount)
    .bind(&new.description)
    .bind(new.transacted_at)
    .fetch_one(&mut *tx)
    .await?;

    let point = sqlx::query_as::<_, Point>(
        r#"
        INSERT INTO points (transaction_id, points)
        VALUES ($1, $2)
        RETURNING id, transaction_id, points
        "#,
    )
    .bind(transaction.id)
    .bind(points)
    .fetch_one(&mut *tx)
    .await?;

    // Both rows become visible together; dropping `tx` on an early return rolls back
    tx.commit().await?;

    tracing::info!(
        transaction_id = %point.transaction_id,
        point_id = %point.id,
        user_id = transaction.user_id,
        amount = %transaction.amount,
        points = point.points,
        "transaction recorded"
    );

    Ok(transaction)
}

/// List transactions with their points.
///
/// # Ordering
///
/// Newest `transacted_at` first, ties broken by id so pages are stable.
///
/// # Filtering
///
/// When `filter.range` is set only rows with `transacted_at` inside the
/// inclusive range are counted and returned.
pub async fn list_transactions(
    pool: &DbPool,
    filter: ListFilter,
) -> Result<(Vec<TransactionListItem>, Pagination), AppError> {
    let (start, end) = range_bounds(filter.range);
    let page: PageRequest = filter.page;

    let total: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*)
        FROM transactions t
        WHERE ($1::timestamp IS NULL OR t.transacted_at BETWEEN $1 AND $2)
        "#,
    )
    .bind(start)
    .bind(end)
    .fetch_one(pool)
    .await?;

    let items = sqlx::query_as::<_, TransactionListItem>(
        r#"
        SELECT t.user_id,
               t.amount,
               COALESCE(p.points, 0) AS points,
               t.description,
               t.transacted_at
        FROM transactions t
        LEFT JOIN points p ON p.transaction_id = t.id
        WHERE ($1::timestamp IS NULL OR t.transacted_at BETWEEN $1 AND $2)
        ORDER BY t.transacted_at DESC, t.id
        LIMIT $3 OFFSET $4
        "#,
    )
    .bind(start)
    .bind(end)
    .bind(page.per_page)
    .bind(page.offset())
    .fetch_all(pool)
    .await?;

    Ok((items, Pagination::new(page, total)))
}

fn range_bounds(range: Option<DateRange>) -> (Option<NaiveDateTime>, Option<NaiveDateTime>) {
    match range {
        Some(range) => (Some(range.start), Some(range.end)),
        None => (None, None),
    }
}

/// One synthetic transaction produced by [`generate_seed_rows`].
#[derive(Debug, Clone, PartialEq)]
pub struct SeedRow {
    pub amount: i64,
    pub description: String,
    pub transacted_at: NaiveDateTime,
}

/// Build `count` random transactions for the seed endpoint.
///
/// Amounts are whole numbers in `[10000, 500000]`; `transacted_at` is `now`
/// minus a whole number of days in `[0, 365]`.
pub fn generate_seed_rows<R: Rng>(
    rng: &mut R,
    now: NaiveDateTime,
    count: usize,
) -> Vec<SeedRow> {
    (0..count)
        .map(|i| SeedRow {
            amount: rng.random_range(SEED_MIN_AMOUNT..=SEED_MAX_AMOUNT),
            description: format!("Transaction {i}"),
            transacted_at: now - Duration::days(rng.random_range(0..=SEED_MAX_DAYS_AGO)),
        })
        .collect()
}

/// Insert [`SEED_COUNT`] synthetic transactions for [`SEED_USER_ID`], each
/// with its point row.
///
/// All rows are written in one database transaction with two bulk inserts.
///
/// # Returns
///
/// The number of transactions created.
pub async fn seed_transactions(pool: &DbPool) -> Result<usize, AppError> {
    // ThreadRng is not Send, so generate everything before the first await
    let rows = {
        let mut rng = rand::rng();
        generate_seed_rows(&mut rng, Utc::now().naive_utc(), SEED_COUNT)
    };

    let mut tx = pool.begin().await?;

    let mut insert_transactions = QueryBuilder::<Postgres>::new(
        "INSERT INTO transactions (user_id, amount, description, transacted_at) ",
    );
    insert_transactions.push_values(&rows, |mut b, row| {
        b.push_bind(SEED_USER_ID)
            .push_bind(BigDecimal::from(row.amount))
            .push_bind(row.description.clone())
            .push_bind(row.transacted_at);
    });
    insert_transactions.push(" RETURNING *");

    let transactions = insert_transactions
        .build_query_as::<Transaction>()
        .fetch_all(&mut *tx)
        .await?;

    let mut point_rows = Vec::with_capacity(transactions.len());
    for transaction in &transactions {
        let points = points_for_amount(&transaction.amount).ok_or_else(|| {
            AppError::InvalidRequest("Amount cannot be converted to points".to_string())
        })?;
        point_rows.push((transaction.id, points));
    }

    let mut insert_points = QueryBuilder::<Postgres>::new("INSERT INTO points (transaction_id, points) ");
    insert_points.push_values(&point_rows, |mut b, (transaction_id, points)| {
        b.push_bind(*transaction_id).push_bind(*points);
    });
    insert_points.build().execute(&mut *tx).await?;

    tx.commit().await?;

    tracing::info!(count = transactions.len(), user_id = SEED_USER_ID, "seeded transactions");

    Ok(transactions.len())
}
