//! SQLite implementation of the case store.

use chrono::{DateTime, Utc};
use color_eyre::{eyre::eyre, Result};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::debug;

use super::CaseStore;
use crate::api::types::CaseRecord;

/// SQLite-based case storage.
pub struct SqliteStore {
  conn: Mutex<Connection>,
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS cases (
    org_prefix TEXT NOT NULL,
    case_number TEXT NOT NULL,
    first_name TEXT,
    middle_name TEXT,
    last_name TEXT,
    age TEXT,
    missing_date TEXT,
    missing_city TEXT,
    missing_county TEXT,
    missing_state TEXT,
    missing_country TEXT,
    race TEXT,
    org_name TEXT,
    case_type TEXT,
    thumbnail_url TEXT,
    stored_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (org_prefix, case_number)
);
"#;

const COLUMNS: &str = "org_prefix, case_number, first_name, middle_name, last_name, age, \
  missing_date, missing_city, missing_county, missing_state, missing_country, race, org_name, \
  case_type, thumbnail_url";

impl SqliteStore {
  /// Open or create the database at `path`.
  pub fn open(path: &Path) -> Result<Self> {
    if let Some(parent) = path.parent() {
      if !parent.as_os_str().is_empty() {
        std::fs::create_dir_all(parent)
          .map_err(|e| eyre!("Failed to create database directory: {}", e))?;
      }
    }

    let conn = Connection::open(path)
      .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;

    Self::with_connection(conn)
  }

  /// Open the database at the default location.
  pub fn open_default() -> Result<Self> {
    Self::open(&Self::default_path()?)
  }

  /// Throwaway database, used by tests and `--db :memory:`.
  pub fn open_in_memory() -> Result<Self> {
    let conn = Connection::open_in_memory()
      .map_err(|e| eyre!("Failed to open in-memory database: {}", e))?;
    Self::with_connection(conn)
  }

  /// Get the default database path.
  pub fn default_path() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(data_dir.join("mk9s").join("cases.db"))
  }

  fn with_connection(conn: Connection) -> Result<Self> {
    conn
      .execute_batch(SCHEMA)
      .map_err(|e| eyre!("Failed to run migrations: {}", e))?;

    Ok(Self {
      conn: Mutex::new(conn),
    })
  }

  /// When the most recent record was written.
  pub fn last_stored_at(&self) -> Result<Option<DateTime<Utc>>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let latest: Option<String> = conn
      .query_row("SELECT MAX(stored_at) FROM cases", [], |row| row.get(0))
      .optional()
      .map_err(|e| eyre!("Failed to query stored_at: {}", e))?
      .flatten();

    latest.as_deref().map(parse_datetime).transpose()
  }
}

fn record_from_row(row: &Row<'_>) -> rusqlite::Result<CaseRecord> {
  Ok(CaseRecord {
    org_prefix: row.get(0)?,
    case_number: row.get(1)?,
    first_name: row.get(2)?,
    middle_name: row.get(3)?,
    last_name: row.get(4)?,
    age: row.get(5)?,
    missing_date: row.get(6)?,
    missing_city: row.get(7)?,
    missing_county: row.get(8)?,
    missing_state: row.get(9)?,
    missing_country: row.get(10)?,
    race: row.get(11)?,
    org_name: row.get(12)?,
    case_type: row.get(13)?,
    thumbnail_url: row.get(14)?,
  })
}

impl CaseStore for SqliteStore {
  fn insert_cases(&self, cases: &[CaseRecord]) -> Result<usize> {
    let mut conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let tx = conn
      .transaction()
      .map_err(|e| eyre!("Failed to begin transaction: {}", e))?;

    {
      let mut stmt = tx
        .prepare(&format!(
          "INSERT OR REPLACE INTO cases ({}, stored_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, datetime('now'))",
          COLUMNS
        ))
        .map_err(|e| eyre!("Failed to prepare insert: {}", e))?;

      for case in cases {
        stmt
          .execute(params![
            case.org_prefix,
            case.case_number,
            case.first_name,
            case.middle_name,
            case.last_name,
            case.age,
            case.missing_date,
            case.missing_city,
            case.missing_county,
            case.missing_state,
            case.missing_country,
            case.race,
            case.org_name,
            case.case_type,
            case.thumbnail_url,
          ])
          .map_err(|e| eyre!("Failed to store case {}: {}", case.key(), e))?;
      }
    }

    tx.commit()
      .map_err(|e| eyre!("Failed to commit transaction: {}", e))?;

    debug!(count = cases.len(), "stored cases");
    Ok(cases.len())
  }

  fn load_all_cases(&self) -> Result<Vec<CaseRecord>> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let mut stmt = conn
      .prepare(&format!(
        "SELECT {} FROM cases
         ORDER BY org_prefix, CAST(case_number AS INTEGER), case_number",
        COLUMNS
      ))
      .map_err(|e| eyre!("Failed to prepare query: {}", e))?;

    let cases = stmt
      .query_map([], record_from_row)
      .map_err(|e| eyre!("Failed to query cases: {}", e))?
      .collect::<rusqlite::Result<Vec<_>>>()
      .map_err(|e| eyre!("Failed to read case row: {}", e))?;

    Ok(cases)
  }

  fn count(&self) -> Result<usize> {
    let conn = self
      .conn
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;

    let count: i64 = conn
      .query_row("SELECT COUNT(*) FROM cases", [], |row| row.get(0))
      .map_err(|e| eyre!("Failed to count cases: {}", e))?;

    Ok(count as usize)
  }
}

/// Parse a datetime string from SQLite format.
fn parse_datetime(s: &str) -> Result<DateTime<Utc>> {
  // SQLite stores as "YYYY-MM-DD HH:MM:SS"
  chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
    .map(|dt| dt.and_utc())
    .map_err(|e| eyre!("Failed to parse datetime '{}': {}", s, e))
}
