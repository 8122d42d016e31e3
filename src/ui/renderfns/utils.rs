use ratatui::prelude::Color;

/// Truncate a string to a maximum number of characters, adding "..." if truncated
pub fn truncate(s: &str, max_len: usize) -> String {
  if s.chars().count() <= max_len {
    s.to_string()
  } else {
    let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", kept)
  }
}

/// Display color for a reported age: young children stand out
pub fn age_color(age: Option<&str>) -> Color {
  match age.and_then(|a| a.trim().parse::<u32>().ok()) {
    Some(a) if a < 10 => Color::Red,
    Some(a) if a < 14 => Color::Yellow,
    Some(_) => Color::White,
    None => Color::DarkGray,
  }
}
