//! URL builders for the case search servlets.
//!
//! The JSON servlet is paginated: a search is opened with `search=new`, and
//! later pages are addressed with `goToPage` inside the same session.

use color_eyre::{eyre::eyre, Result};
use tracing::debug;
use url::Url;

/// Servlet serving HTML search results
const HTML_PATH: &str = "PubCaseSearchServlet";
/// Servlet serving paginated JSON data
const JSON_PATH: &str = "JSONDataServlet";

const HTML_ACTION_PARAM: &str = "act";
const HTML_ACTION_VALUE: &str = "usMapSearch";

const JSON_ACTION_PARAM: &str = "action";
const JSON_ACTION_SEARCH_VALUE: &str = "publicSearch";
const JSON_ACTION_DETAIL_VALUE: &str = "childSearch";
const JSON_SEARCH_PARAM: &str = "search";
const JSON_SEARCH_VALUE: &str = "new";
const JSON_SUBJ_TO_SEARCH_PARAM: &str = "subjToSearch";
const JSON_SUBJ_TO_SEARCH_VALUE: &str = "child";
const JSON_PAGE_PARAM: &str = "goToPage";
const JSON_CASE_NUMBER_PARAM: &str = "caseNum";
const JSON_ORG_PREFIX_PARAM: &str = "orgPrefix";

const STATE_PARAM: &str = "missState";

/// URL that opens a new JSON search session for `state`.
pub fn begin_search_url(base: &str, state: &str) -> Result<Url> {
  build(
    base,
    JSON_PATH,
    &[
      (JSON_ACTION_PARAM, JSON_ACTION_SEARCH_VALUE),
      (JSON_SEARCH_PARAM, JSON_SEARCH_VALUE),
      (JSON_SUBJ_TO_SEARCH_PARAM, JSON_SUBJ_TO_SEARCH_VALUE),
      (STATE_PARAM, state),
    ],
  )
}

/// URL for one page of the search opened by [`begin_search_url`].
pub fn search_page_url(base: &str, state: &str, page: u32) -> Result<Url> {
  let page = page.to_string();
  build(
    base,
    JSON_PATH,
    &[
      (JSON_ACTION_PARAM, JSON_ACTION_SEARCH_VALUE),
      (JSON_PAGE_PARAM, &page),
      (STATE_PARAM, state),
    ],
  )
}

/// URL for the detail record of a single case.
pub fn detail_url(base: &str, case_number: &str, org_prefix: &str) -> Result<Url> {
  build(
    base,
    JSON_PATH,
    &[
      (JSON_ACTION_PARAM, JSON_ACTION_DETAIL_VALUE),
      (JSON_CASE_NUMBER_PARAM, case_number),
      (JSON_ORG_PREFIX_PARAM, org_prefix),
    ],
  )
}

/// URL for the HTML map search of `state`.
pub fn html_search_url(base: &str, state: &str) -> Result<Url> {
  build(
    base,
    HTML_PATH,
    &[(HTML_ACTION_PARAM, HTML_ACTION_VALUE), (STATE_PARAM, state)],
  )
}

fn build(base: &str, path: &str, params: &[(&str, &str)]) -> Result<Url> {
  let mut url = Url::parse(base).map_err(|e| eyre!("Invalid base URL '{}': {}", base, e))?;

  url
    .path_segments_mut()
    .map_err(|_| eyre!("Base URL '{}' cannot take a path", base))?
    .pop_if_empty()
    .push(path);

  {
    let mut query = url.query_pairs_mut();
    for (name, value) in params {
      query.append_pair(name, value);
    }
  }

  debug!(%url, "built url");
  Ok(url)
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::config::DEFAULT_BASE_URL;

  #[test]
  fn test_begin_search_url() {
    let url = begin_search_url(DEFAULT_BASE_URL, "CA").unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.missingkids.org/missingkids/servlet/JSONDataServlet\
       ?action=publicSearch&search=new&subjToSearch=child&missState=CA"
    );
  }

  #[test]
  fn test_search_page_url() {
    let url = search_page_url(DEFAULT_BASE_URL, "CA", 3).unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.missingkids.org/missingkids/servlet/JSONDataServlet\
       ?action=publicSearch&goToPage=3&missState=CA"
    );
  }

  #[test]
  fn test_detail_url() {
    let url = detail_url(DEFAULT_BASE_URL, "1234567", "NCMC").unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.missingkids.org/missingkids/servlet/JSONDataServlet\
       ?action=childSearch&caseNum=1234567&orgPrefix=NCMC"
    );
  }

  #[test]
  fn test_html_search_url() {
    let url = html_search_url(DEFAULT_BASE_URL, "NY").unwrap();
    assert_eq!(
      url.as_str(),
      "https://api.missingkids.org/missingkids/servlet/PubCaseSearchServlet\
       ?act=usMapSearch&missState=NY"
    );
  }

  #[test]
  fn test_base_without_trailing_slash() {
    let url = begin_search_url("http://localhost:8080/servlet", "CA").unwrap();
    assert_eq!(url.path(), "/servlet/JSONDataServlet");
  }

  #[test]
  fn test_query_values_are_encoded() {
    let url = detail_url(DEFAULT_BASE_URL, "1", "A&B").unwrap();
    assert!(url.as_str().ends_with("orgPrefix=A%26B"));
  }

  #[test]
  fn test_malformed_base_is_error() {
    assert!(begin_search_url("not a url", "CA").is_err());
    assert!(begin_search_url("mailto:someone@example.com", "CA").is_err());
  }
}
