use crate::error::Result;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};

/// Count and exact price sum of the line items matching one stock code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CodeTotals {
    pub count: u32,
    pub total_price: Decimal,
}

impl CodeTotals {
    pub fn zero() -> Self {
        Self {
            count: 0,
            total_price: Decimal::new(0, 2),
        }
    }
}

/// Read side: quote line items grouped by the stock code of their part.
pub trait LineItemStore {
    /// Answers for the whole set in one round trip. Codes without matches are
    /// simply absent from the map.
    fn totals_for_codes(&self, codes: &BTreeSet<String>) -> Result<HashMap<String, CodeTotals>>;
}

/// A result row before it has been assigned an id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewCsvResult {
    pub stock_code: String,
    pub number_quotes_found: u32,
    pub total_price: Decimal,
    pub file_uploaded: String,
    pub created_at: DateTime<Utc>,
}

/// Write side: append-only storage of aggregation rows.
pub trait ResultStore {
    /// Persists every row or none of them and returns how many were written.
    /// Implementations with a per-statement limit split the rows themselves.
    fn bulk_create(&self, rows: &[NewCsvResult]) -> Result<usize>;
}
