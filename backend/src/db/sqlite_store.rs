use super::migrations::run_migrations;
use crate::error::{JobError, Result};
use crate::services::aggregation::{CodeTotals, LineItemStore, NewCsvResult, ResultStore};
use common::model::csv_result::CsvResult;
use log::info;
use parking_lot::Mutex;
use rusqlite::types::ToSql;
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::Path;
use std::sync::Arc;

const TOTALS_FOR_CODES: &str = r#"
SELECT p.stock_code, COUNT(li.id), COALESCE(SUM(li.price_cents), 0)
FROM quote_line_items li
JOIN parts p ON p.id = li.part_id
WHERE p.stock_code IN (SELECT value FROM json_each(?1))
GROUP BY p.stock_code
"#;

/// Largest batch whose five bound values per row stay under SQLite's
/// 32766 variable limit.
const MAX_BATCH_ROWS: usize = 32766 / 5;

const SEARCH_FILTER: &str = "(?1 IS NULL OR instr(lower(stock_code), lower(?1)) > 0)";

/// One line of a quote, as accepted by [`SqliteStore::insert_quote`].
#[derive(Clone, Debug)]
pub struct QuoteItem {
    pub stock_code: String,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Debug, Serialize)]
pub struct SeedSummary {
    pub quote_id: i64,
    pub line_items: usize,
}

/// Shared handle on the SQLite database. Clones share one connection, so
/// statements from concurrent jobs are serialized.
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
    batch_size: usize,
}

impl SqliteStore {
    pub fn open(path: &Path, batch_size: usize) -> Result<Self> {
        let conn = Connection::open(path)?;
        info!("Opened database at {}", path.display());
        Self::from_connection(conn, batch_size)
    }

    #[cfg(test)]
    pub fn open_in_memory(batch_size: usize) -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?, batch_size)
    }

    fn from_connection(conn: Connection, batch_size: usize) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        run_migrations(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            batch_size: batch_size.clamp(1, MAX_BATCH_ROWS),
        })
    }

    /// Creates a quote with its line items, creating parts on first use.
    pub fn insert_quote(&self, name: &str, items: &[QuoteItem]) -> Result<i64> {
        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;

        tx.execute("INSERT INTO quotes (name) VALUES (?1)", params![name])?;
        let quote_id = tx.last_insert_rowid();

        for item in items {
            let part_id = find_or_create_part(&tx, &item.stock_code)?;
            tx.execute(
                "INSERT INTO quote_line_items (quote_id, part_id, quantity, price_cents)
                 VALUES (?1, ?2, ?3, ?4)",
                params![quote_id, part_id, item.quantity, to_cents(item.price)?],
            )?;
        }

        tx.commit()?;
        Ok(quote_id)
    }

    /// Inserts a small demo quote so a fresh database has something to match.
    pub fn seed_demo(&self) -> Result<SeedSummary> {
        let items = [
            ("AX123", 2, Decimal::new(1225, 2)),
            ("AX123", 1, Decimal::new(2325, 2)),
            ("CX789", 5, Decimal::new(410, 2)),
            ("DX321", 3, Decimal::new(9999, 2)),
        ]
        .into_iter()
        .map(|(stock_code, quantity, price)| QuoteItem {
            stock_code: stock_code.to_string(),
            quantity,
            price,
        })
        .collect::<Vec<_>>();

        let quote_id = self.insert_quote("Demo quote", &items)?;
        info!("Seeded demo quote {} with {} line items", quote_id, items.len());
        Ok(SeedSummary {
            quote_id,
            line_items: items.len(),
        })
    }

    /// Newest-first page of stored results. `page` starts at 1. `search` is a
    /// case-insensitive substring match on the stock code.
    pub fn list_results(
        &self,
        search: Option<&str>,
        page: u32,
        limit: u32,
    ) -> Result<(u64, Vec<CsvResult>)> {
        let conn = self.conn.lock();

        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM csv_results WHERE {SEARCH_FILTER}"),
            params![search],
            |row| row.get(0),
        )?;

        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);
        let mut stmt = conn.prepare(&format!(
            "SELECT id, stock_code, number_quotes_found, total_price_cents, file_uploaded, created_at
             FROM csv_results
             WHERE {SEARCH_FILTER}
             ORDER BY created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3"
        ))?;
        let results = stmt
            .query_map(params![search, limit, offset], |row| {
                Ok(CsvResult {
                    id: row.get(0)?,
                    stock_code: row.get(1)?,
                    number_quotes_found: row.get(2)?,
                    total_price: from_cents(row.get(3)?),
                    file_uploaded: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((count.max(0) as u64, results))
    }
}

impl LineItemStore for SqliteStore {
    fn totals_for_codes(&self, codes: &BTreeSet<String>) -> Result<HashMap<String, CodeTotals>> {
        let codes_json =
            serde_json::to_string(codes).map_err(|e| JobError::Validation(e.to_string()))?;

        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(TOTALS_FOR_CODES)?;
        let rows = stmt.query_map(params![codes_json], |row| {
            Ok((
                row.get::<_, String>(0)?,
                CodeTotals {
                    count: row.get(1)?,
                    total_price: from_cents(row.get(2)?),
                },
            ))
        })?;

        let mut totals = HashMap::new();
        for row in rows {
            let (code, found) = row?;
            totals.insert(code, found);
        }
        Ok(totals)
    }
}

impl ResultStore for SqliteStore {
    /// Writes in chunks of `batch_size` rows, all inside one transaction.
    fn bulk_create(&self, rows: &[NewCsvResult]) -> Result<usize> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn.lock();
        let tx = conn.transaction()?;
        let mut written = 0;

        for batch in rows.chunks(self.batch_size) {
            let cents = batch
                .iter()
                .map(|row| to_cents(row.total_price))
                .collect::<Result<Vec<_>>>()?;

            let mut values: Vec<&dyn ToSql> = Vec::with_capacity(batch.len() * 5);
            for (row, cents) in batch.iter().zip(&cents) {
                values.push(&row.stock_code);
                values.push(&row.number_quotes_found);
                values.push(cents);
                values.push(&row.file_uploaded);
                values.push(&row.created_at);
            }

            let placeholders = vec!["(?, ?, ?, ?, ?)"; batch.len()].join(", ");
            let sql = format!(
                "INSERT INTO csv_results
                 (stock_code, number_quotes_found, total_price_cents, file_uploaded, created_at)
                 VALUES {placeholders}"
            );
            written += tx.execute(&sql, values.as_slice())?;
        }

        tx.commit()?;
        Ok(written)
    }
}

fn find_or_create_part(conn: &Connection, stock_code: &str) -> rusqlite::Result<i64> {
    let existing = conn
        .query_row(
            "SELECT id FROM parts WHERE stock_code = ?1 ORDER BY id LIMIT 1",
            params![stock_code],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => Ok(id),
        None => {
            conn.execute(
                "INSERT INTO parts (stock_code) VALUES (?1)",
                params![stock_code],
            )?;
            Ok(conn.last_insert_rowid())
        }
    }
}

fn to_cents(price: Decimal) -> Result<i64> {
    let mut rounded = price.round_dp(2);
    rounded.rescale(2);
    i64::try_from(rounded.mantissa())
        .map_err(|_| JobError::Validation(format!("price out of range: {price}")))
}

fn from_cents(cents: i64) -> Decimal {
    Decimal::new(cents, 2)
}
