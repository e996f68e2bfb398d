use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One persisted aggregation row: how many quote line items matched a stock
/// code from an uploaded CSV and what they add up to.
///
/// `total_price` always has two decimal places and travels as a string
/// (`"35.50"`) so clients never see float rounding.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CsvResult {
    pub id: i64,
    pub stock_code: String,
    pub number_quotes_found: u32,
    pub total_price: Decimal,
    /// Relative path of the upload the row was produced from.
    pub file_uploaded: String,
    pub created_at: DateTime<Utc>,
}

/// A page of results in the shape the listing endpoint returns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Page<T> {
    pub count: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}
