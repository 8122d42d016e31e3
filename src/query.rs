//! Background operations whose results are picked up by the UI loop.
//!
//! A `Query<T>` runs its fetcher on a spawned tokio task and hands the result
//! back through a channel. The UI calls `poll()` on every tick, so state only
//! ever changes on the UI side.
//!
//! # Example
//!
//! ```ignore
//! let store = store.clone();
//! let mut query = Query::new(move || {
//!     let store = store.clone();
//!     async move { store.load_all_cases().map_err(|e| e.to_string()) }
//! });
//!
//! query.fetch();
//!
//! // In event loop tick
//! if query.poll() {
//!     // State changed, trigger re-render
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use tokio::sync::mpsc;

/// The state of a query
#[derive(Debug, Clone)]
pub enum QueryState<T> {
  /// Query has not been started
  Idle,
  /// Query is currently fetching data
  Loading,
  /// Query completed successfully
  Success(T),
  /// Query failed with an error
  Error(String),
}

impl<T> QueryState<T> {
  pub fn is_loading(&self) -> bool {
    matches!(self, QueryState::Loading)
  }

  pub fn data(&self) -> Option<&T> {
    match self {
      QueryState::Success(data) => Some(data),
      _ => None,
    }
  }

  pub fn error(&self) -> Option<&str> {
    match self {
      QueryState::Error(e) => Some(e),
      _ => None,
    }
  }
}

type BoxFuture<T> = Pin<Box<dyn Future<Output = Result<T, String>> + Send>>;

type FetcherFn<T> = Box<dyn Fn() -> BoxFuture<T> + Send + Sync>;

/// Async query with loading/success/error state.
pub struct Query<T> {
  state: QueryState<T>,
  fetcher: FetcherFn<T>,
  receiver: Option<mpsc::UnboundedReceiver<Result<T, String>>>,
}

impl<T: Send + 'static> Query<T> {
  /// Create a new query with the given fetcher function.
  ///
  /// The fetcher is called each time `fetch()` or `refetch()` is invoked.
  pub fn new<F, Fut>(fetcher: F) -> Self
  where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, String>> + Send + 'static,
  {
    Self {
      state: QueryState::Idle,
      fetcher: Box::new(move || Box::pin(fetcher())),
      receiver: None,
    }
  }

  pub fn state(&self) -> &QueryState<T> {
    &self.state
  }

  pub fn data(&self) -> Option<&T> {
    self.state.data()
  }

  pub fn is_loading(&self) -> bool {
    self.state.is_loading()
  }

  pub fn error(&self) -> Option<&str> {
    self.state.error()
  }

  /// Start fetching data if not already loading.
  pub fn fetch(&mut self) {
    if self.state.is_loading() {
      return;
    }
    self.start_fetch();
  }

  /// Force a refetch, even if already loading or data exists.
  pub fn refetch(&mut self) {
    // Dropping the receiver discards a pending result
    self.receiver = None;
    self.start_fetch();
  }

  /// Poll for results from a pending fetch.
  ///
  /// Returns `true` if the state changed (data arrived or error occurred).
  pub fn poll(&mut self) -> bool {
    let receiver = match &mut self.receiver {
      Some(rx) => rx,
      None => return false,
    };

    match receiver.try_recv() {
      Ok(Ok(data)) => {
        self.state = QueryState::Success(data);
        self.receiver = None;
        true
      }
      Ok(Err(error)) => {
        self.state = QueryState::Error(error);
        self.receiver = None;
        true
      }
      Err(mpsc::error::TryRecvError::Empty) => false,
      Err(mpsc::error::TryRecvError::Disconnected) => {
        // Task ended without sending, e.g. it panicked
        self.state = QueryState::Error("Query was cancelled".to_string());
        self.receiver = None;
        true
      }
    }
  }

  fn start_fetch(&mut self) {
    let (tx, rx) = mpsc::unbounded_channel();
    self.receiver = Some(rx);
    self.state = QueryState::Loading;

    let future = (self.fetcher)();
    tokio::spawn(async move {
      let result = future.await;
      // Receiver may have been dropped by a refetch
      let _ = tx.send(result);
    });
  }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Query<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Query")
      .field("state", &self.state)
      .finish_non_exhaustive()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::seed;
  use crate::store::{CaseStore, SqliteStore};
  use std::sync::Arc;
  use std::time::Duration;

  #[tokio::test]
  async fn test_query_loads_from_store() {
    let store = Arc::new(SqliteStore::open_in_memory().unwrap());
    seed::populate(&*store).unwrap();

    let mut query = Query::new(move || {
      let store = Arc::clone(&store);
      async move { store.load_all_cases().map_err(|e| e.to_string()) }
    });
    assert!(matches!(query.state(), QueryState::Idle));

    query.fetch();
    assert!(query.is_loading());

    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(query.poll());
    assert_eq!(query.data().map(Vec::len), Some(seed::fake_cases().len()));
  }

  #[tokio::test]
  async fn test_query_error() {
    let mut query: Query<usize> = Query::new(|| async { Err("No search results".to_string()) });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(10)).await;

    assert!(query.poll());
    assert_eq!(query.error(), Some("No search results"));
  }

  #[tokio::test]
  async fn test_poll_without_fetch_is_noop() {
    let mut query = Query::new(|| async { Ok::<_, String>(1) });
    assert!(!query.poll());
    assert!(matches!(query.state(), QueryState::Idle));
  }

  #[tokio::test]
  async fn test_fetch_while_loading_is_noop() {
    let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = Arc::clone(&counter);

    let mut query = Query::new(move || {
      let counter = Arc::clone(&counter_clone);
      async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok::<_, String>(counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst))
      }
    });

    query.fetch();
    query.fetch();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(query.poll());
    assert_eq!(counter.load(std::sync::atomic::Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn test_refetch_discards_pending() {
    let counter = Arc::new(std::sync::atomic::AtomicU32::new(0));
    let counter_clone = Arc::clone(&counter);

    let mut query = Query::new(move || {
      let counter = Arc::clone(&counter_clone);
      async move {
        let n = counter.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(30)).await;
        Ok::<_, String>(n)
      }
    });

    query.fetch();
    tokio::time::sleep(Duration::from_millis(5)).await;

    query.refetch();
    tokio::time::sleep(Duration::from_millis(80)).await;

    query.poll();
    assert_eq!(query.data(), Some(&1));
  }
}
