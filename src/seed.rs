//! Fake case records for populating an empty database.

use color_eyre::Result;
use tracing::info;

use crate::api::types::CaseRecord;
use crate::store::CaseStore;

const FAKE_CASES: &[(&str, &str, &str, &str, &str, &str)] = &[
  // (case number, first, last, age, city, missing date)
  ("123456", "Emily", "Carter", "9", "Sacramento", "2018-03-14"),
  ("123457", "Daniel", "Nguyen", "15", "San Jose", "2018-02-02"),
  ("123458", "Sofia", "Ramirez", "13", "Los Angeles", "2017-11-23"),
  ("123459", "Marcus", "Lee", "16", "Oakland", "2018-01-08"),
  ("123460", "Ava", "Thompson", "6", "Fresno", "2018-03-30"),
  ("123461", "Noah", "Patel", "14", "San Diego", "2017-12-19"),
];

/// Deterministic set of plausible records, all in California.
pub fn fake_cases() -> Vec<CaseRecord> {
  FAKE_CASES
    .iter()
    .map(|&(number, first, last, age, city, date)| CaseRecord {
      case_number: number.to_string(),
      org_prefix: "NCMC".to_string(),
      first_name: Some(first.to_string()),
      last_name: Some(last.to_string()),
      age: Some(age.to_string()),
      missing_date: Some(date.to_string()),
      missing_city: Some(city.to_string()),
      missing_state: Some("CA".to_string()),
      missing_country: Some("US".to_string()),
      org_name: Some("National Center for Missing & Exploited Children".to_string()),
      case_type: Some("Endangered Runaway".to_string()),
      ..Default::default()
    })
    .collect()
}

/// Insert the fake records into `store`, returning how many were written.
pub fn populate(store: &dyn CaseStore) -> Result<usize> {
  let written = store.insert_cases(&fake_cases())?;
  info!(count = written, "seeded database with fake cases");
  Ok(written)
}
