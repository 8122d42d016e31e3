use serde::{Deserialize, Serialize};

/// One missing-child case, identified by case number and organization prefix
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CaseRecord {
  pub case_number: String,
  pub org_prefix: String, // e.g. "NCMC"
  pub first_name: Option<String>,
  pub middle_name: Option<String>,
  pub last_name: Option<String>,
  pub age: Option<String>,
  pub missing_date: Option<String>,
  pub missing_city: Option<String>,
  pub missing_county: Option<String>,
  pub missing_state: Option<String>,
  pub missing_country: Option<String>,
  pub race: Option<String>,
  pub org_name: Option<String>,
  pub case_type: Option<String>,
  pub thumbnail_url: Option<String>,
}

impl CaseRecord {
  /// Display key, e.g. "NCMC1234567". Not an identity; use
  /// `(org_prefix, case_number)` for that.
  pub fn key(&self) -> String {
    format!("{}{}", self.org_prefix, self.case_number)
  }

  pub fn full_name(&self) -> String {
    let parts: Vec<&str> = [&self.first_name, &self.middle_name, &self.last_name]
      .into_iter()
      .filter_map(|p| p.as_deref())
      .collect();
    if parts.is_empty() {
      "(unnamed)".to_string()
    } else {
      parts.join(" ")
    }
  }

  /// "City, ST" with whichever parts are known
  pub fn location(&self) -> String {
    let parts: Vec<&str> = [&self.missing_city, &self.missing_state]
      .into_iter()
      .filter_map(|p| p.as_deref())
      .collect();
    parts.join(", ")
  }

  /// Case-insensitive match against name, location and case key
  pub fn matches(&self, filter: &str) -> bool {
    let filter = filter.trim().to_lowercase();
    if filter.is_empty() {
      return true;
    }
    self.full_name().to_lowercase().contains(&filter)
      || self.location().to_lowercase().contains(&filter)
      || self.key().to_lowercase().contains(&filter)
  }
}

/// Outcome of one network sync
#[derive(Debug, Clone)]
pub struct SyncReport {
  /// Person entries returned by the page walk
  pub fetched: usize,
  /// Count the server claimed for the search
  pub total_records: u64,
  pub total_pages: u32,
  /// Records written to the store
  pub stored: usize,
  /// Entries that could not be decoded
  pub skipped: usize,
  pub finished_at: chrono::DateTime<chrono::Utc>,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn record() -> CaseRecord {
    CaseRecord {
      case_number: "1234567".to_string(),
      org_prefix: "NCMC".to_string(),
      first_name: Some("Maria".to_string()),
      last_name: Some("Lopez".to_string()),
      missing_city: Some("Fresno".to_string()),
      missing_state: Some("CA".to_string()),
      ..Default::default()
    }
  }

  #[test]
  fn test_key_and_name() {
    let r = record();
    assert_eq!(r.key(), "NCMC1234567");
    assert_eq!(r.full_name(), "Maria Lopez");
    assert_eq!(r.location(), "Fresno, CA");
  }

  #[test]
  fn test_unnamed() {
    let r = CaseRecord::default();
    assert_eq!(r.full_name(), "(unnamed)");
    assert_eq!(r.location(), "");
  }

  #[test]
  fn test_matches() {
    let r = record();
    assert!(r.matches(""));
    assert!(r.matches("lopez"));
    assert!(r.matches("FRESNO"));
    assert!(r.matches("ncmc123"));
    assert!(!r.matches("oakland"));
  }
}
