use crate::api::types::{CaseRecord, SyncReport};
use crate::api::CaseClient;
use crate::query::{Query, QueryState};
use crate::store::{CaseStore, SqliteStore};
use crate::sync;
use crate::ui::components::{KeyResult, SearchEvent, SearchInput};
use crate::ui::ensure_valid_selection;
use crate::ui::renderfns::{age_color, truncate};
use crate::ui::view::{Shortcut, View, ViewAction};
use crate::ui::views::CaseDetailView;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState, Paragraph};
use std::sync::Arc;

/// List of stored cases, refreshed from the network on demand
pub struct CaseListView {
  client: CaseClient,
  cases: Query<Vec<CaseRecord>>,
  sync: Query<SyncReport>,
  list_state: ListState,
  search: SearchInput,
  filter: String,
}

impl CaseListView {
  pub fn new(client: CaseClient, store: Arc<SqliteStore>, refresh_on_start: bool) -> Self {
    let load_store = Arc::clone(&store);
    let mut cases = Query::new(move || {
      let store = Arc::clone(&load_store);
      async move { store.load_all_cases().map_err(|e| e.to_string()) }
    });

    let sync_client = client.clone();
    let mut sync = Query::new(move || {
      let client = sync_client.clone();
      let store = Arc::clone(&store);
      async move {
        sync::refresh(&client, &*store)
          .await
          .map_err(|e| e.to_string())
      }
    });

    // Show whatever is stored first; a sync reloads the list when it lands
    cases.fetch();
    if refresh_on_start {
      sync.fetch();
    }

    Self {
      client,
      cases,
      sync,
      list_state: ListState::default(),
      search: SearchInput::new(),
      filter: String::new(),
    }
  }

  fn visible_cases(&self) -> Vec<&CaseRecord> {
    self
      .cases
      .data()
      .map(|cases| cases.iter().filter(|c| c.matches(&self.filter)).collect())
      .unwrap_or_default()
  }

  fn title(&self, shown: usize) -> String {
    let state = self.client.state();
    let total = self.cases.data().map(Vec::len).unwrap_or(0);

    let count = if self.filter.is_empty() {
      format!("{}", total)
    } else {
      format!("{}/{} matching '{}'", shown, total, self.filter)
    };

    match self.cases.state() {
      QueryState::Loading => format!(" Cases [{}] (loading...) ", state),
      QueryState::Error(e) => format!(" Cases [{}] (error: {}) ", state, e),
      _ if self.sync.is_loading() => format!(" Cases [{}] ({}, syncing...) ", state, count),
      _ => format!(" Cases [{}] ({}) ", state, count),
    }
  }

  fn render_list(&mut self, frame: &mut Frame, area: Rect) {
    let visible = self.visible_cases();
    let len = visible.len();

    let block = Block::default()
      .title(self.title(len))
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    if visible.is_empty() {
      let content = if self.cases.is_loading() {
        "Loading cases..."
      } else if self.cases.error().is_some() {
        "Failed to read the local database."
      } else if self.sync.is_loading() {
        "Fetching cases from the search service..."
      } else if !self.filter.is_empty() {
        "No cases match the filter."
      } else {
        "No cases stored. Press 'r' to fetch from the search service."
      };
      let paragraph = Paragraph::new(content)
        .block(block)
        .style(Style::default().fg(Color::DarkGray));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = visible
      .iter()
      .map(|case| {
        let line = Line::from(vec![
          Span::styled(
            format!("{:<14}", truncate(&case.key(), 14)),
            Style::default().fg(Color::Cyan),
          ),
          Span::raw(" "),
          Span::styled(
            format!("{:>3}", case.age.as_deref().unwrap_or("?")),
            Style::default().fg(age_color(case.age.as_deref())),
          ),
          Span::raw("  "),
          Span::raw(format!("{:<32}", truncate(&case.full_name(), 32))),
          Span::raw(" "),
          Span::styled(
            format!("{:<24}", truncate(&case.location(), 24)),
            Style::default().fg(Color::Gray),
          ),
          Span::raw(" "),
          Span::styled(
            case.missing_date.clone().unwrap_or_default(),
            Style::default().fg(Color::DarkGray),
          ),
        ]);
        ListItem::new(line)
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(
        Style::default()
          .bg(Color::DarkGray)
          .add_modifier(Modifier::BOLD),
      )
      .highlight_symbol("> ");

    ensure_valid_selection(&mut self.list_state, len);
    frame.render_stateful_widget(list, area, &mut self.list_state);
  }

  fn selected_case(&self) -> Option<CaseRecord> {
    let idx = self.list_state.selected()?;
    self.visible_cases().get(idx).map(|c| (*c).clone())
  }
}

impl View for CaseListView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match self.search.handle_key(key) {
      KeyResult::Event(SearchEvent::Changed(filter)) => {
        self.filter = filter;
        self.list_state.select(Some(0));
        return ViewAction::None;
      }
      KeyResult::Event(SearchEvent::Submitted) | KeyResult::Handled => return ViewAction::None,
      KeyResult::NotHandled => {}
    }

    match key.code {
      KeyCode::Char('j') | KeyCode::Down => {
        self.list_state.select_next();
      }
      KeyCode::Char('k') | KeyCode::Up => {
        self.list_state.select_previous();
      }
      KeyCode::Char('g') | KeyCode::Home => {
        self.list_state.select_first();
      }
      KeyCode::Char('G') | KeyCode::End => {
        self.list_state.select_last();
      }
      KeyCode::Char('r') => {
        // No-op while a sync is already running
        self.sync.fetch();
      }
      KeyCode::Enter => {
        if let Some(case) = self.selected_case() {
          return ViewAction::Push(Box::new(CaseDetailView::new(case, self.client.clone())));
        }
      }
      KeyCode::Esc if !self.filter.is_empty() => {
        self.filter.clear();
      }
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    self.render_list(frame, area);
    self.search.render_overlay(frame, area);
  }

  fn breadcrumb_label(&self) -> String {
    format!("Cases [{}]", self.client.state())
  }

  fn tick(&mut self) {
    self.cases.poll();
    if self.sync.poll() && self.sync.data().is_some() {
      self.cases.refetch();
    }
  }

  fn status(&self) -> Option<String> {
    match self.sync.state() {
      QueryState::Idle => None,
      QueryState::Loading => Some("syncing...".to_string()),
      QueryState::Success(report) => {
        let mut status = format!(
          "synced {} cases at {}",
          report.stored,
          report
            .finished_at
            .with_timezone(&chrono::Local)
            .format("%H:%M")
        );
        if report.skipped > 0 {
          status.push_str(&format!(" ({} skipped)", report.skipped));
        }
        if report.fetched as u64 != report.total_records {
          status.push_str(&format!(" (server reported {})", report.total_records));
        }
        Some(status)
      }
      QueryState::Error(e) => Some(format!("sync failed: {}", e)),
    }
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    if self.search.is_active() {
      return vec![Shortcut::new("enter", "apply"), Shortcut::new("esc", "clear")];
    }
    vec![
      Shortcut::new("/", "filter"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("enter", "details"),
      Shortcut::new("q", "quit"),
    ]
  }
}
