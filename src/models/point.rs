//! Loyalty point model and the amount → points rule.

use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive};
use uuid::Uuid;

/// Amount that earns a single point.
pub const AMOUNT_PER_POINT: i64 = 1000;

/// Represents a point record from the database.
///
/// Exactly one row exists per transaction (`transaction_id` is UNIQUE) and it is
/// written in the same database transaction as its owner.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Point {
    pub id: Uuid,

    /// Owning transaction
    pub transaction_id: Uuid,

    /// `floor(amount / 1000)` of the owning transaction
    pub points: i64,
}

/// Points earned for `amount`: `floor(amount / 1000)`.
///
/// Amounts below 1000 earn nothing. Returns `None` for negative amounts or
/// amounts whose whole part does not fit in an `i64`.
pub fn points_for_amount(amount: &BigDecimal) -> Option<i64> {
    // floor(floor(x) / n) == floor(x / n) for positive integer n
    amount
        .with_scale_round(0, RoundingMode::Floor)
        .to_i64()
        .map(|whole| whole.div_euclid(AMOUNT_PER_POINT))
        .filter(|points| *points >= 0)
}
