//! Transaction data models and API request/response types.
//!
//! This module defines:
//! - `Transaction`: Database entity representing a transaction
//! - `NewTransaction`: A validated create request
//! - `TransactionListItem`: One row of the list endpoint, joined with its points
//! - `ListTransactionsQuery`: Query string of the list endpoint

use std::str::FromStr;

use bigdecimal::{BigDecimal, RoundingMode, Signed};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{AppError, ValidationErrors};
use crate::models::pagination::{MAX_PER_PAGE, PageRequest, Pagination};

/// Upper bound of the `NUMERIC(15, 2)` amount column.
const MAX_AMOUNT: &str = "9999999999999.99";

/// Digits left of the decimal point in `NUMERIC(15, 2)`.
const MAX_INTEGER_DIGITS: i64 = 13;

/// Represents a transaction record from the database.
///
/// # Database Table
///
/// Maps to the `transactions` table. Rows are created by the create and seed
/// operations and never updated.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Transaction {
    pub id: Uuid,

    pub user_id: i64,

    /// Stored as `NUMERIC(15, 2)`, serialized as a decimal string with two places
    #[serde(serialize_with = "serialize_amount")]
    pub amount: BigDecimal,

    pub description: String,

    /// When the purchase happened, in UTC without offset
    pub transacted_at: NaiveDateTime,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A create request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub user_id: i64,
    /// Rounded to the two decimal places the column stores
    pub amount: BigDecimal,
    pub description: String,
    pub transacted_at: NaiveDateTime,
}

impl NewTransaction {
    /// Validate a decoded JSON body.
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
    /// Integers and numbers may also be sent as strings. Anything other than a
    /// JSON object is validated as an empty object, so every field is reported
    /// as required.
    ///
    /// # Errors
    ///
    /// `AppError::Validation` listing every invalid field.
    pub fn from_json(body: &Value) -> Result<Self, AppError> {
        let empty = serde_json::Map::new();
        let fields = body.as_object().unwrap_or(&empty);
        let mut errors = ValidationErrors::new();

        let user_id = validate_user_id(present(fields, "user_id"), &mut errors);
        let amount = validate_amount(present(fields, "amount"), &mut errors);
        let description = validate_description(present(fields, "description"), &mut errors);
        let transacted_at = validate_transacted_at(present(fields, "transacted_at"), &mut errors);

        match (user_id, amount, description, transacted_at) {
            (Some(user_id), Some(amount), Some(description), Some(transacted_at))
                if errors.is_empty() =>
            {
                Ok(Self {
                    user_id,
                    amount,
                    description,
                    transacted_at,
                })
            }
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// A field counts as absent when it is missing or `null`.
fn present<'a>(fields: &'a serde_json::Map<String, Value>, key: &str) -> Option<&'a Value> {
    fields.get(key).filter(|v| !v.is_null())
}

fn validate_user_id(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<i64> {
    const FIELD: &str = "user_id";

    let Some(value) = value else {
        errors.add(FIELD, "The user id field is required.");
        return None;
    };

    let parsed = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };

    match parsed {
        None => {
            errors.add(FIELD, "The user id field must be an integer.");
            None
        }
        Some(id) if id < 1 => {
            errors.add(FIELD, "The user id field must be at least 1.");
            None
        }
        Some(id) => Some(id),
    }
}

fn validate_amount(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<BigDecimal> {
    const FIELD: &str = "amount";

    let Some(value) = value else {
        errors.add(FIELD, "The amount field is required.");
        return None;
    };

    let parsed = match value {
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        Value::String(s) if !s.trim().is_empty() => BigDecimal::from_str(s.trim()).ok(),
        _ => None,
    };

    let Some(amount) = parsed else {
        errors.add(FIELD, "The amount field must be a number.");
        return None;
    };

    // Bounds are checked on the decimal exponent first; "1e100000000" must
    // not be expanded into a hundred-million digit integer.
    if !amount.is_positive() || leading_exponent(&amount) < 0 {
        errors.add(FIELD, "The amount field must be at least 1.");
        return None;
    }

    let too_large = || format!("The amount field must not be greater than {MAX_AMOUNT}.");
    if leading_exponent(&amount) >= MAX_INTEGER_DIGITS {
        errors.add(FIELD, too_large());
        return None;
    }

    let amount = amount.with_scale_round(2, RoundingMode::HalfUp);
    let max = BigDecimal::from_str(MAX_AMOUNT).ok()?;
    if amount > max {
        errors.add(FIELD, too_large());
        return None;
    }

    Some(amount)
}

/// Power of ten of the most significant digit of a nonzero `amount`.
fn leading_exponent(amount: &BigDecimal) -> i64 {
    let (_, scale) = amount.as_bigint_and_exponent();
    i64::try_from(amount.digits())
        .unwrap_or(i64::MAX)
        .saturating_sub(scale)
        .saturating_sub(1)
}

fn serialize_amount<S: Serializer>(amount: &BigDecimal, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(&amount.with_scale(2))
}

fn validate_description(value: Option<&Value>, errors: &mut ValidationErrors) -> Option<String> {
    const FIELD: &str = "description";

    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::String(_)) | None => {
            errors.add(FIELD, "The description field is required.");
            None
        }
        Some(_) => {
            errors.add(FIELD, "The description field must be a string.");
            None
        }
    }
}

fn validate_transacted_at(
    value: Option<&Value>,
    errors: &mut ValidationErrors,
) -> Option<NaiveDateTime> {
    const FIELD: &str = "transacted_at";

    let Some(value) = value else {
        errors.add(FIELD, "The transacted at field is required.");
        return None;
    };

    let parsed = value
        .as_str()
        .and_then(parse_date_input)
        .map(DateInput::start);

    if parsed.is_none() {
        errors.add(FIELD, "The transacted at field must be a valid date.");
    }

    parsed
}

/// A parsed date/time string, remembering whether a time of day was given.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateInput {
    Day(NaiveDate),
    Moment(NaiveDateTime),
}

impl DateInput {
    /// Earliest instant covered: midnight for a bare date.
    pub fn start(self) -> NaiveDateTime {
        match self {
            DateInput::Day(day) => day.and_time(NaiveTime::MIN),
            DateInput::Moment(moment) => moment,
        }
    }

    /// Latest instant covered: the last microsecond of the day for a bare date.
    pub fn end(self) -> NaiveDateTime {
        match self {
            DateInput::Day(day) => day
                .succ_opt()
                .map(|next| next.and_time(NaiveTime::MIN) - TimeDelta::microseconds(1))
                .unwrap_or(NaiveDateTime::MAX),
            DateInput::Moment(moment) => moment,
        }
    }
}

/// Parse the date formats accepted by the API.
///
/// - RFC 3339 (`2025-01-15T10:30:00Z`, `2025-01-15T10:30:00+07:00`), converted to UTC
/// - `2025-01-15 10:30:00`, `2025-01-15T10:30:00`, optionally with fractional seconds
/// - `2025-01-15 10:30`
/// - `2025-01-15`
pub fn parse_date_input(input: &str) -> Option<DateInput> {
    let input = input.trim();

    if let Ok(moment) = DateTime::parse_from_rfc3339(input) {
        return Some(DateInput::Moment(moment.naive_utc()));
    }

    const FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    for format in FORMATS {
        if let Ok(moment) = NaiveDateTime::parse_from_str(input, format) {
            return Some(DateInput::Moment(moment));
        }
    }

    NaiveDate::parse_from_str(input, "%Y-%m-%d")
        .ok()
        .map(DateInput::Day)
}

/// One row of `GET /transactions`.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct TransactionListItem {
    pub user_id: i64,
    #[serde(serialize_with = "serialize_amount")]
    pub amount: BigDecimal,
    /// 0 when the transaction has no point row
    pub points: i64,
    pub description: String,
    pub transacted_at: NaiveDateTime,
}

/// Inclusive `transacted_at` window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

/// Raw query string of `GET /transactions`.
///
/// Every value is kept as a string so bad input surfaces as a 422 with a
/// field message instead of a framework rejection.
#[derive(Debug, Default, Deserialize)]
pub struct ListTransactionsQuery {
    pub per_page: Option<String>,
    pub page: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

/// A validated list request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListFilter {
    pub page: PageRequest,
    /// Only set when both bounds were supplied
    pub range: Option<DateRange>,
}

impl ListTransactionsQuery {
    /// Validate paging and the optional date range.
    ///
    /// The range filter applies only when both `start_date` and `end_date` are
    /// given and non-empty; a single bound is ignored.
    pub fn validate(self) -> Result<ListFilter, AppError> {
        let mut errors = ValidationErrors::new();
        let defaults = PageRequest::default();

        let per_page = parse_page_number(self.per_page.as_deref(), defaults.per_page)
            .filter(|n| *n <= MAX_PER_PAGE);
        if per_page.is_none() {
            errors.add(
                "per_page",
                format!("The per page field must be an integer between 1 and {MAX_PER_PAGE}."),
            );
        }

        let page = parse_page_number(self.page.as_deref(), defaults.page);
        if page.is_none() {
            errors.add("page", "The page field must be an integer of at least 1.");
        }

        let start = non_empty(self.start_date.as_deref());
        let end = non_empty(self.end_date.as_deref());
        let mut range = None;

        if let (Some(start), Some(end)) = (start, end) {
            let start = parse_date_input(start);
            let end = parse_date_input(end);

            if start.is_none() {
                errors.add("start_date", "The start date field must be a valid date.");
            }
            if end.is_none() {
                errors.add("end_date", "The end date field must be a valid date.");
            }

            if let (Some(start), Some(end)) = (start, end) {
                range = Some(DateRange {
                    start: start.start(),
                    end: end.end(),
                });
            }
        }

        match (page, per_page) {
            (Some(page), Some(per_page)) if errors.is_empty() => Ok(ListFilter {
                page: PageRequest { page, per_page },
                range,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// `None` means the value was present but not a positive integer.
fn parse_page_number(value: Option<&str>, default: i64) -> Option<i64> {
    match non_empty(value) {
        None => Some(default),
        Some(v) => v.parse::<i64>().ok().filter(|n| *n >= 1),
    }
}

/// Response body of a successful create.
///
/// ```json
/// {
///   "code": 201,
///   "message": "Transaction created successfully",
///   "data": { "id": "...", "user_id": 1, "amount": "150000.00", ... }
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct CreatedTransactionResponse {
    pub code: u16,
    pub message: &'static str,
    pub data: Transaction,
}

/// Response body of `GET /transactions`.
#[derive(Debug, Serialize)]
pub struct TransactionListResponse {
    pub data: Vec<TransactionListItem>,
    pub pagination: Pagination,
}

/// Response body of `POST /transactions/seed`.
#[derive(Debug, Serialize)]
pub struct SeedResponse {
    pub code: u16,
    pub message: String,
    pub count: usize,
}
