//! Local persistence of case records for offline display.
//!
//! The store is filled wholesale by each sync: records are upserted by
//! `(org_prefix, case_number)` and nothing is ever deleted.

mod sqlite;

use color_eyre::Result;

use crate::api::types::CaseRecord;

pub use sqlite::SqliteStore;

/// Storage backend for case records.
pub trait CaseStore: Send + Sync {
  /// Insert or replace records, returning how many were written.
  fn insert_cases(&self, cases: &[CaseRecord]) -> Result<usize>;

  /// All stored records, ordered by organization prefix then case number.
  fn load_all_cases(&self) -> Result<Vec<CaseRecord>>;

  /// Number of stored records.
  fn count(&self) -> Result<usize>;
}
