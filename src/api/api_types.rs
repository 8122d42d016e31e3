//! Serde-deserializable types matching the JSON servlet responses.
//!
//! These types are separate from domain types to allow lenient deserialization
//! while keeping domain types focused on application needs.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::types::CaseRecord;

/// Status value the servlet reports for a usable search
pub const STATUS_SUCCESS: &str = "success";

/// Envelope shared by the search and page responses.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiSearchResponse {
  pub status: Option<String>,
  #[serde(default, deserialize_with = "lenient_count")]
  pub total_records: u64,
  #[serde(default, deserialize_with = "lenient_count")]
  pub total_pages: u32,
  /// Raw person objects, kept as values so one bad entry cannot spoil a page
  pub persons: Option<Vec<Value>>,
}

impl ApiSearchResponse {
  pub fn is_success(&self) -> bool {
    self.status.as_deref() == Some(STATUS_SUCCESS)
  }
}

/// One person entry in a search page.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiPerson {
  #[serde(deserialize_with = "string_or_number")]
  pub case_number: String,
  pub org_prefix: String,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub first_name: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub middle_name: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub last_name: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub age: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub missing_date: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub missing_city: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub missing_county: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub missing_state: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub missing_country: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub race: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub org_name: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub case_type: Option<String>,
  #[serde(default, deserialize_with = "opt_string_or_number")]
  pub thumbnail_url: Option<String>,
}

impl ApiPerson {
  pub fn into_record(self) -> CaseRecord {
    CaseRecord {
      case_number: self.case_number,
      org_prefix: self.org_prefix,
      first_name: non_blank(self.first_name),
      middle_name: non_blank(self.middle_name),
      last_name: non_blank(self.last_name),
      age: non_blank(self.age),
      missing_date: non_blank(self.missing_date),
      missing_city: non_blank(self.missing_city),
      missing_county: non_blank(self.missing_county),
      missing_state: non_blank(self.missing_state),
      missing_country: non_blank(self.missing_country),
      race: non_blank(self.race),
      org_name: non_blank(self.org_name),
      case_type: non_blank(self.case_type),
      thumbnail_url: non_blank(self.thumbnail_url),
    }
  }
}

/// Decode a raw person value into a domain record.
pub fn parse_person(value: &Value) -> serde_json::Result<CaseRecord> {
  ApiPerson::deserialize(value).map(ApiPerson::into_record)
}

fn non_blank(value: Option<String>) -> Option<String> {
  value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

fn scalar_to_string(value: Value) -> Option<String> {
  match value {
    Value::String(s) => Some(s),
    Value::Number(n) => Some(n.to_string()),
    Value::Bool(b) => Some(b.to_string()),
    _ => None,
  }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  scalar_to_string(value).ok_or_else(|| serde::de::Error::custom("expected a string or number"))
}

fn opt_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
  D: Deserializer<'de>,
{
  let value = Value::deserialize(deserializer)?;
  Ok(scalar_to_string(value))
}

/// Counts sometimes arrive as strings or whole floats; anything unreadable
/// counts as zero.
fn lenient_count<'de, D, N>(deserializer: D) -> Result<N, D::Error>
where
  D: Deserializer<'de>,
  N: TryFrom<u64> + Default,
{
  let value = Value::deserialize(deserializer)?;
  let n = match value {
    Value::Number(n) => n.as_u64().or_else(|| n.as_f64().and_then(whole_count)),
    Value::String(s) => {
      let s = s.trim();
      s.parse::<u64>()
        .ok()
        .or_else(|| s.parse::<f64>().ok().and_then(whole_count))
    }
    _ => None,
  };
  Ok(n.and_then(|n| N::try_from(n).ok()).unwrap_or_default())
}

fn whole_count(f: f64) -> Option<u64> {
  (f.is_finite() && f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64).then(|| f as u64)
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn test_search_response_success() {
    let response: ApiSearchResponse = serde_json::from_value(json!({
      "status": "success",
      "totalRecords": 42,
      "totalPages": 3,
      "persons": [{"caseNumber": "1", "orgPrefix": "NCMC"}]
    }))
    .unwrap();
    assert!(response.is_success());
    assert_eq!(response.total_records, 42);
    assert_eq!(response.total_pages, 3);
    assert_eq!(response.persons.map(|p| p.len()), Some(1));
  }

  #[test]
  fn test_search_response_missing_fields() {
    let response: ApiSearchResponse = serde_json::from_value(json!({"status": "error"})).unwrap();
    assert!(!response.is_success());
    assert_eq!(response.total_records, 0);
    assert_eq!(response.total_pages, 0);
    assert!(response.persons.is_none());
  }

  #[test]
  fn test_counts_as_strings() {
    let response: ApiSearchResponse =
      serde_json::from_value(json!({"totalRecords": "17", "totalPages": "nope"})).unwrap();
    assert_eq!(response.total_records, 17);
    assert_eq!(response.total_pages, 0);
  }

  #[test]
  fn test_counts_as_whole_floats() {
    let response: ApiSearchResponse =
      serde_json::from_str(r#"{"totalRecords": 40.0, "totalPages": "3.0"}"#).unwrap();
    assert_eq!(response.total_records, 40);
    assert_eq!(response.total_pages, 3);

    let response: ApiSearchResponse =
      serde_json::from_str(r#"{"totalRecords": 2.5, "totalPages": -1.0}"#).unwrap();
    assert_eq!(response.total_records, 0);
    assert_eq!(response.total_pages, 0);
  }

  #[test]
  fn test_parse_person_numeric_fields() {
    let record = parse_person(&json!({
      "caseNumber": 1234567,
      "orgPrefix": "NCMC",
      "firstName": "Jane",
      "lastName": "Doe",
      "age": 12,
      "missingCity": "SACRAMENTO",
      "missingState": "CA",
      "middleName": "  ",
      "caseType": null,
      "hasThumbnail": true
    }))
    .unwrap();
    assert_eq!(record.case_number, "1234567");
    assert_eq!(record.org_prefix, "NCMC");
    assert_eq!(record.age.as_deref(), Some("12"));
    assert_eq!(record.middle_name, None);
    assert_eq!(record.case_type, None);
    assert_eq!(record.missing_city.as_deref(), Some("SACRAMENTO"));
  }

  #[test]
  fn test_parse_person_requires_identity() {
    assert!(parse_person(&json!({"orgPrefix": "NCMC"})).is_err());
    assert!(parse_person(&json!({"caseNumber": "1"})).is_err());
    assert!(parse_person(&json!("not an object")).is_err());
  }
}
