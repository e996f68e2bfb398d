//! Per-code aggregation of quote line items and persistence of the outcome.
//!
//! - `store`: the read (`LineItemStore`) and write (`ResultStore`) seams the
//!   aggregator talks to. `db::SqliteStore` implements both.
//! - `aggregator`: turns a set of stock codes into exactly one result row per
//!   code, zero-filled when nothing matched.

pub mod aggregator;
pub mod store;

pub use aggregator::Aggregator;
pub use store::{CodeTotals, LineItemStore, NewCsvResult, ResultStore};
