//! Schema migrations, applied once per database file.

use log::info;
use rusqlite::Connection;

pub fn run_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS migrations (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        [],
    )?;

    run_migration(conn, "001_quotes", CREATE_QUOTES_TABLE)?;
    run_migration(conn, "002_parts", CREATE_PARTS_TABLE)?;
    run_migration(conn, "003_quote_line_items", CREATE_QUOTE_LINE_ITEMS_TABLE)?;
    run_migration(conn, "004_csv_results", CREATE_CSV_RESULTS_TABLE)?;

    Ok(())
}

fn run_migration(conn: &Connection, name: &str, sql: &str) -> rusqlite::Result<()> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM migrations WHERE name = ?1)",
        [name],
        |row| row.get(0),
    )?;

    if !exists {
        info!("Running migration: {}", name);
        conn.execute_batch(sql)?;
        conn.execute("INSERT INTO migrations (name) VALUES (?1)", [name])?;
    }

    Ok(())
}

const CREATE_QUOTES_TABLE: &str = r#"
CREATE TABLE quotes (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending'
        CHECK (status IN ('pending', 'approved', 'rejected')),
    created_at TEXT NOT NULL DEFAULT (datetime('now'))
);
"#;

const CREATE_PARTS_TABLE: &str = r#"
CREATE TABLE parts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_code TEXT NOT NULL,
    description TEXT
);
CREATE INDEX IF NOT EXISTS idx_parts_stock_code ON parts(stock_code);
"#;

// Prices are stored in cents so that SUM() stays exact.
const CREATE_QUOTE_LINE_ITEMS_TABLE: &str = r#"
CREATE TABLE quote_line_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    quote_id INTEGER NOT NULL REFERENCES quotes(id) ON DELETE CASCADE,
    part_id INTEGER NOT NULL REFERENCES parts(id) ON DELETE CASCADE,
    quantity INTEGER NOT NULL CHECK (quantity >= 0),
    price_cents INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_quote_line_items_part ON quote_line_items(part_id);
"#;

const CREATE_CSV_RESULTS_TABLE: &str = r#"
CREATE TABLE csv_results (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    stock_code TEXT NOT NULL,
    number_quotes_found INTEGER NOT NULL DEFAULT 0 CHECK (number_quotes_found >= 0),
    total_price_cents INTEGER NOT NULL DEFAULT 0,
    file_uploaded TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_csv_results_code_created
    ON csv_results(stock_code, created_at DESC);
"#;
