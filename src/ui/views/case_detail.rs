use crate::api::types::CaseRecord;
use crate::api::CaseClient;
use crate::query::{Query, QueryState};
use crate::ui::view::{Shortcut, View, ViewAction};
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use serde_json::Value;

/// Stored record plus the detail document fetched for it
pub struct CaseDetailView {
  case: CaseRecord,
  query: Query<Option<Value>>,
  scroll: u16,
}

impl CaseDetailView {
  pub fn new(case: CaseRecord, client: CaseClient) -> Self {
    let case_number = case.case_number.clone();
    let org_prefix = case.org_prefix.clone();
    let mut query = Query::new(move || {
      let client = client.clone();
      let case_number = case_number.clone();
      let org_prefix = org_prefix.clone();
      async move { Ok(client.fetch_case_detail(&case_number, &org_prefix).await) }
    });

    query.fetch();

    Self {
      case,
      query,
      scroll: 0,
    }
  }

  fn record_lines(&self) -> Vec<Line<'static>> {
    let case = &self.case;
    let fields = [
      ("Name", Some(case.full_name())),
      ("Case", Some(case.key())),
      ("Age", case.age.clone()),
      ("Missing since", case.missing_date.clone()),
      ("City", case.missing_city.clone()),
      ("County", case.missing_county.clone()),
      ("State", case.missing_state.clone()),
      ("Country", case.missing_country.clone()),
      ("Race", case.race.clone()),
      ("Case type", case.case_type.clone()),
      ("Organization", case.org_name.clone()),
    ];

    fields
      .into_iter()
      .filter_map(|(label, value)| value.map(|v| labelled(label, v)))
      .collect()
  }

  fn detail_lines(&self) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
      "Details",
      Style::default().fg(Color::Blue).bold(),
    ))];

    match self.query.state() {
      QueryState::Idle | QueryState::Loading => lines.push(Line::styled(
        "Loading case details...",
        Style::default().fg(Color::DarkGray),
      )),
      QueryState::Error(e) => {
        lines.push(Line::styled(format!("Error: {}", e), Style::default().fg(Color::Red)))
      }
      QueryState::Success(None) => lines.push(Line::styled(
        "No detail available. Press 'r' to retry.",
        Style::default().fg(Color::DarkGray),
      )),
      QueryState::Success(Some(detail)) => {
        for (key, value) in flatten_scalars(detail) {
          if key == "status" {
            continue;
          }
          lines.push(labelled(&key, value));
        }
      }
    }
    lines
  }
}

fn labelled(label: &str, value: String) -> Line<'static> {
  Line::from(vec![
    Span::styled(format!("{}: ", label), Style::default().fg(Color::DarkGray)),
    Span::raw(value),
  ])
}

/// Scalar leaves of a JSON document as `(dotted.key, value)` pairs.
///
/// Nulls and empty strings are dropped; array elements are keyed by index.
pub fn flatten_scalars(value: &Value) -> Vec<(String, String)> {
  fn walk(prefix: &str, value: &Value, out: &mut Vec<(String, String)>) {
    let join = |key: &str| {
      if prefix.is_empty() {
        key.to_string()
      } else {
        format!("{}.{}", prefix, key)
      }
    };
    match value {
      Value::Object(map) => {
        for (key, child) in map {
          walk(&join(key), child, out);
        }
      }
      Value::Array(items) => {
        for (i, child) in items.iter().enumerate() {
          walk(&join(&i.to_string()), child, out);
        }
      }
      Value::Null => {}
      Value::String(s) if s.trim().is_empty() => {}
      Value::String(s) => out.push((prefix.to_string(), s.trim().to_string())),
      Value::Number(n) => out.push((prefix.to_string(), n.to_string())),
      Value::Bool(b) => out.push((prefix.to_string(), b.to_string())),
    }
  }

  let mut out = Vec::new();
  walk("", value, &mut out);
  out
}

impl View for CaseDetailView {
  fn handle_key(&mut self, key: KeyEvent) -> ViewAction {
    match key.code {
      KeyCode::Char('r') => self.query.refetch(),
      KeyCode::Char('j') | KeyCode::Down => self.scroll = self.scroll.saturating_add(1),
      KeyCode::Char('k') | KeyCode::Up => self.scroll = self.scroll.saturating_sub(1),
      KeyCode::Char('q') | KeyCode::Esc => return ViewAction::Pop,
      _ => {}
    }
    ViewAction::None
  }

  fn render(&mut self, frame: &mut Frame, area: Rect) {
    let title = match self.query.state() {
      QueryState::Loading => format!(" {} (loading...) ", self.case.key()),
      _ => format!(" {} ", self.case.key()),
    };

    let block = Block::default()
      .title(title)
      .title_alignment(Alignment::Center)
      .borders(Borders::ALL)
      .border_style(Style::default().fg(Color::Blue));

    let mut lines = self.record_lines();
    lines.push(Line::raw(""));
    lines.extend(self.detail_lines());

    let paragraph = Paragraph::new(lines)
      .block(block)
      .wrap(Wrap { trim: true })
      .scroll((self.scroll, 0));
    frame.render_widget(paragraph, area);
  }

  fn breadcrumb_label(&self) -> String {
    self.case.key()
  }

  fn tick(&mut self) {
    self.query.poll();
  }

  fn shortcuts(&self) -> Vec<Shortcut> {
    vec![
      Shortcut::new("j/k", "scroll"),
      Shortcut::new("r", "refresh"),
      Shortcut::new("q", "back"),
    ]
  }
}
