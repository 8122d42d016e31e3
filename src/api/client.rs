use crate::api::api_types::ApiSearchResponse;
use crate::api::urls;
use crate::config::Config;
use color_eyre::{eyre::eyre, Result};
use reqwest::cookie::Jar;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Combined result of a full page walk
#[derive(Debug, Clone)]
pub struct SearchResults {
  /// Person objects from every page, in page order
  pub persons: Vec<Value>,
  /// Count the server claims for the whole search
  pub total_records: u64,
  pub total_pages: u32,
}

/// What the search servlet made of a request
#[derive(Debug, Clone)]
pub enum SearchOutcome {
  /// The servlet answered without a `success` status
  Rejected { status: Option<String> },
  Found(SearchResults),
}

/// HTTP client for the case search servlets.
///
/// All clones share one cookie jar, so the session opened by the first search
/// request carries over to the page requests that follow it.
#[derive(Clone)]
pub struct CaseClient {
  http: reqwest::Client,
  base_url: String,
  state: String,
}

impl CaseClient {
  pub fn new(config: &Config) -> Result<Self> {
    let jar = Arc::new(Jar::default());

    let http = reqwest::Client::builder()
      .cookie_provider(jar)
      .user_agent(concat!("mk9s/", env!("CARGO_PKG_VERSION")))
      .build()
      .map_err(|e| eyre!("Failed to create HTTP client: {}", e))?;

    Ok(Self {
      http,
      base_url: config.api.base_url.clone(),
      state: config.api.state.clone(),
    })
  }

  pub fn base_url(&self) -> &str {
    &self.base_url
  }

  pub fn state(&self) -> &str {
    &self.state
  }

  /// GET `url` and return the whole body, `None` if the body is empty.
  pub async fn get_text(&self, url: &Url) -> Result<Option<String>> {
    let response = self
      .http
      .get(url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?
      .error_for_status()
      .map_err(|e| eyre!("Request to {} failed: {}", url, e))?;

    let body = response
      .text()
      .await
      .map_err(|e| eyre!("Failed to read response from {}: {}", url, e))?;

    Ok(if body.is_empty() { None } else { Some(body) })
  }

  async fn get_search_page(&self, url: &Url) -> Result<ApiSearchResponse> {
    let body = self
      .get_text(url)
      .await?
      .ok_or_else(|| eyre!("Empty response from {}", url))?;

    serde_json::from_str(&body).map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))
  }

  /// Walk every page of a new search and concatenate the person arrays.
  ///
  /// The first response carries page 1 and the page count; pages `2..=N` are
  /// then requested one after another on the same session.
  pub async fn search_all(&self) -> Result<SearchOutcome> {
    let begin_url = urls::begin_search_url(&self.base_url, &self.state)?;
    let first = self.get_search_page(&begin_url).await?;

    if !first.is_success() {
      return Ok(SearchOutcome::Rejected {
        status: first.status,
      });
    }

    let total_records = first.total_records;
    let total_pages = first.total_pages;
    let mut persons = first.persons.unwrap_or_default();

    for page in 2..=total_pages {
      let page_url = urls::search_page_url(&self.base_url, &self.state, page)?;
      let response = self.get_search_page(&page_url).await?;
      match response.persons {
        Some(page_persons) => {
          debug!(page, count = page_persons.len(), "fetched page");
          persons.extend(page_persons);
        }
        None => debug!(page, "page has no persons"),
      }
    }

    if persons.len() as u64 != total_records {
      warn!(
        total_records,
        combined = persons.len(),
        "combined record count does not match server total"
      );
    }

    info!(total_pages, records = persons.len(), "search complete");

    Ok(SearchOutcome::Found(SearchResults {
      persons,
      total_records,
      total_pages,
    }))
  }

  /// Full page walk with the server's counts, or `None` if anything went wrong.
  ///
  /// A rejected search and a failed request are both reported as `None`.
  pub async fn fetch_search(&self) -> Option<SearchResults> {
    match self.search_all().await {
      Ok(SearchOutcome::Found(results)) => Some(results),
      Ok(SearchOutcome::Rejected { status }) => {
        warn!(status = status.as_deref().unwrap_or("<missing>"), "search rejected");
        None
      }
      Err(e) => {
        warn!(error = %e, "case search failed");
        None
      }
    }
  }

  /// All person objects of a new search, or `None` if anything went wrong.
  pub async fn fetch_search_results(&self) -> Option<Vec<Value>> {
    self.fetch_search().await.map(|results| results.persons)
  }

  async fn get_case_detail(&self, case_number: &str, org_prefix: &str) -> Result<Option<Value>> {
    let url = urls::detail_url(&self.base_url, case_number, org_prefix)?;
    let body = match self.get_text(&url).await? {
      Some(body) => body,
      None => return Ok(None),
    };

    let value: Value = serde_json::from_str(&body)
      .map_err(|e| eyre!("Failed to parse response from {}: {}", url, e))?;

    let status = value.get("status").and_then(Value::as_str);
    if status != Some(crate::api::api_types::STATUS_SUCCESS) {
      debug!(?status, case_number, org_prefix, "detail rejected");
      return Ok(None);
    }

    Ok(Some(value))
  }

  /// Detail document for one case, or `None` if anything went wrong.
  pub async fn fetch_case_detail(&self, case_number: &str, org_prefix: &str) -> Option<Value> {
    match self.get_case_detail(case_number, org_prefix).await {
      Ok(detail) => detail,
      Err(e) => {
        warn!(error = %e, case_number, org_prefix, "case detail failed");
        None
      }
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use mockito::{Matcher, Server, ServerGuard};
  use serde_json::json;

  const PATH: &str = "/servlet/JSONDataServlet";

  fn client_for(server: &ServerGuard) -> CaseClient {
    let mut config = Config::default();
    config.api.base_url = format!("{}/servlet/", server.url());
    CaseClient::new(&config).unwrap()
  }

  fn person(n: u32) -> Value {
    json!({"caseNumber": n.to_string(), "orgPrefix": "NCMC", "firstName": format!("Kid{}", n)})
  }

  fn begin_query() -> Matcher {
    Matcher::AllOf(vec![
      Matcher::UrlEncoded("action".into(), "publicSearch".into()),
      Matcher::UrlEncoded("search".into(), "new".into()),
      Matcher::UrlEncoded("subjToSearch".into(), "child".into()),
      Matcher::UrlEncoded("missState".into(), "CA".into()),
    ])
  }

  fn page_query(page: u32) -> Matcher {
    Matcher::AllOf(vec![
      Matcher::UrlEncoded("action".into(), "publicSearch".into()),
      Matcher::UrlEncoded("goToPage".into(), page.to_string()),
      Matcher::UrlEncoded("missState".into(), "CA".into()),
    ])
  }

  #[tokio::test]
  async fn test_search_all_walks_pages_with_session_cookie() {
    let mut server = Server::new_async().await;

    let begin = server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_header("content-type", "application/json")
      .with_header("set-cookie", "JSESSIONID=abc123; Path=/")
      .with_body(
        json!({
          "status": "success",
          "totalRecords": 5,
          "totalPages": 3,
          "persons": [person(1), person(2)]
        })
        .to_string(),
      )
      .expect(1)
      .create_async()
      .await;

    let page2 = server
      .mock("GET", PATH)
      .match_query(page_query(2))
      .match_header("cookie", Matcher::Regex("JSESSIONID=abc123".into()))
      .with_body(json!({"status": "success", "persons": [person(3), person(4)]}).to_string())
      .expect(1)
      .create_async()
      .await;

    let page3 = server
      .mock("GET", PATH)
      .match_query(page_query(3))
      .match_header("cookie", Matcher::Regex("JSESSIONID=abc123".into()))
      .with_body(json!({"status": "success", "persons": [person(5)]}).to_string())
      .expect(1)
      .create_async()
      .await;

    let client = client_for(&server);
    let outcome = client.search_all().await.unwrap();

    begin.assert_async().await;
    page2.assert_async().await;
    page3.assert_async().await;

    let results = match outcome {
      SearchOutcome::Found(results) => results,
      other => panic!("unexpected outcome: {:?}", other),
    };
    assert_eq!(results.total_pages, 3);
    assert_eq!(results.total_records, 5);
    let numbers: Vec<&str> = results
      .persons
      .iter()
      .filter_map(|p| p["caseNumber"].as_str())
      .collect();
    assert_eq!(numbers, vec!["1", "2", "3", "4", "5"]);
  }

  #[tokio::test]
  async fn test_count_mismatch_is_not_fatal() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_body(
        json!({"status": "success", "totalRecords": 10, "totalPages": 2, "persons": [person(1)]})
          .to_string(),
      )
      .create_async()
      .await;

    // A page without a persons array contributes nothing
    server
      .mock("GET", PATH)
      .match_query(page_query(2))
      .with_body(json!({"status": "success"}).to_string())
      .create_async()
      .await;

    let client = client_for(&server);
    let persons = client.fetch_search_results().await.unwrap();
    assert_eq!(persons.len(), 1);
  }

  #[tokio::test]
  async fn test_single_page_makes_one_request() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_body(
        json!({"status": "success", "totalRecords": 1, "totalPages": 1, "persons": [person(9)]})
          .to_string(),
      )
      .expect(1)
      .create_async()
      .await;

    let pages = server
      .mock("GET", PATH)
      .match_query(Matcher::Regex("goToPage=".into()))
      .expect(0)
      .create_async()
      .await;

    let client = client_for(&server);
    let persons = client.fetch_search_results().await.unwrap();
    assert_eq!(persons.len(), 1);
    pages.assert_async().await;
  }

  #[tokio::test]
  async fn test_missing_page_count_uses_first_response() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_body(json!({"status": "success", "persons": [person(4), person(8)]}).to_string())
      .expect(1)
      .create_async()
      .await;

    let pages = server
      .mock("GET", PATH)
      .match_query(Matcher::Regex("goToPage=".into()))
      .expect(0)
      .create_async()
      .await;

    let client = client_for(&server);
    let results = client.fetch_search().await.unwrap();
    assert_eq!(results.total_pages, 0);
    assert_eq!(results.total_records, 0);
    assert_eq!(results.persons.len(), 2);
    pages.assert_async().await;
  }

  #[tokio::test]
  async fn test_float_page_count_still_walks() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_body(r#"{"status":"success","totalRecords":2.0,"totalPages":2.0,"persons":[{"caseNumber":"1","orgPrefix":"NCMC"}]}"#)
      .create_async()
      .await;

    let page2 = server
      .mock("GET", PATH)
      .match_query(page_query(2))
      .with_body(json!({"status": "success", "persons": [person(2)]}).to_string())
      .expect(1)
      .create_async()
      .await;

    let client = client_for(&server);
    let results = client.fetch_search().await.unwrap();
    assert_eq!(results.total_pages, 2);
    assert_eq!(results.persons.len(), 2);
    page2.assert_async().await;
  }

  #[tokio::test]
  async fn test_rejected_status_is_none() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_body(json!({"status": "noResults"}).to_string())
      .create_async()
      .await;

    let client = client_for(&server);
    assert!(matches!(
      client.search_all().await.unwrap(),
      SearchOutcome::Rejected { status: Some(ref s) } if s == "noResults"
    ));
    assert!(client.fetch_search_results().await.is_none());
  }

  #[tokio::test]
  async fn test_missing_status_is_none() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_body(json!({"totalRecords": 1, "persons": [person(1)]}).to_string())
      .create_async()
      .await;

    let client = client_for(&server);
    assert!(client.fetch_search_results().await.is_none());
  }

  #[tokio::test]
  async fn test_failed_page_discards_everything() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_body(
        json!({"status": "success", "totalRecords": 2, "totalPages": 2, "persons": [person(1)]})
          .to_string(),
      )
      .create_async()
      .await;

    server
      .mock("GET", PATH)
      .match_query(page_query(2))
      .with_status(500)
      .create_async()
      .await;

    let client = client_for(&server);
    assert!(client.search_all().await.is_err());
    assert!(client.fetch_search_results().await.is_none());
  }

  #[tokio::test]
  async fn test_malformed_json_is_none() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(begin_query())
      .with_body("<html>not json</html>")
      .create_async()
      .await;

    let client = client_for(&server);
    assert!(client.fetch_search_results().await.is_none());
  }

  #[tokio::test]
  async fn test_malformed_base_url_is_none() {
    let mut config = Config::default();
    config.api.base_url = "::not a url::".to_string();
    let client = CaseClient::new(&config).unwrap();
    assert!(client.fetch_search_results().await.is_none());
    assert!(client.fetch_case_detail("1", "NCMC").await.is_none());
  }

  #[tokio::test]
  async fn test_get_text_empty_body() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", "/empty")
      .with_body("")
      .create_async()
      .await;

    let client = client_for(&server);
    let url = Url::parse(&format!("{}/empty", server.url())).unwrap();
    assert_eq!(client.get_text(&url).await.unwrap(), None);
  }

  #[tokio::test]
  async fn test_fetch_case_detail() {
    let mut server = Server::new_async().await;

    server
      .mock("GET", PATH)
      .match_query(Matcher::AllOf(vec![
        Matcher::UrlEncoded("action".into(), "childSearch".into()),
        Matcher::UrlEncoded("caseNum".into(), "1234567".into()),
        Matcher::UrlEncoded("orgPrefix".into(), "NCMC".into()),
      ]))
      .with_body(json!({"status": "success", "childBean": {"firstName": "Jane"}}).to_string())
      .create_async()
      .await;

    let client = client_for(&server);
    let detail = client.fetch_case_detail("1234567", "NCMC").await.unwrap();
    assert_eq!(detail["childBean"]["firstName"], "Jane");

    // Unmatched request falls through to mockito's 501
    assert!(client.fetch_case_detail("1", "NCMC").await.is_none());
  }

  #[tokio::test]
  async fn test_case_detail_error_status_is_none() {
    let mut server = Server::new_async().await;

    let detail = server
      .mock("GET", PATH)
      .match_query(Matcher::UrlEncoded("action".into(), "childSearch".into()))
      .with_status(200)
      .with_body(json!({"status": "error", "childBean": {"firstName": "Jane"}}).to_string())
      .expect(1)
      .create_async()
      .await;

    let client = client_for(&server);
    assert!(client.fetch_case_detail("1234567", "NCMC").await.is_none());
    detail.assert_async().await;
  }
}
