//! SQLite persistence for quotes, line items and aggregation results.

mod migrations;
mod sqlite_store;

pub use sqlite_store::SqliteStore;

#[cfg(test)]
pub use sqlite_store::QuoteItem;
