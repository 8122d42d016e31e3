//! Network refresh: page walk, decode, store.

use color_eyre::{eyre::eyre, Result};
use tracing::{info, warn};

use crate::api::api_types::parse_person;
use crate::api::types::{CaseRecord, SyncReport};
use crate::api::CaseClient;
use crate::store::CaseStore;

/// Fetch every search page and write the decoded records to `store`.
///
/// Entries that do not decode are skipped. When the search yields nothing the
/// store is left untouched and an error is returned.
pub async fn refresh(client: &CaseClient, store: &dyn CaseStore) -> Result<SyncReport> {
  let results = client
    .fetch_search()
    .await
    .ok_or_else(|| eyre!("No search results from {}", client.base_url()))?;
  let persons = results.persons;

  let fetched = persons.len();
  let mut records: Vec<CaseRecord> = Vec::with_capacity(fetched);
  let mut skipped = 0;

  for (index, person) in persons.iter().enumerate() {
    match parse_person(person) {
      Ok(record) => records.push(record),
      Err(e) => {
        warn!(index, error = %e, "skipping malformed person entry");
        skipped += 1;
      }
    }
  }

  let stored = store.insert_cases(&records)?;
  info!(fetched, stored, skipped, "sync complete");

  Ok(SyncReport {
    fetched,
    total_records: results.total_records,
    total_pages: results.total_pages,
    stored,
    skipped,
    finished_at: chrono::Utc::now(),
  })
}
