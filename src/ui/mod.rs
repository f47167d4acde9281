pub mod components;
pub mod renderfns;
pub mod theme;

use crate::app::App;
use ratatui::prelude::*;
use ratatui::widgets::Block;
use renderfns::{draw_footer, draw_header};

/// Main draw function
pub fn draw(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let chunks = Layout::default()
    .direction(Direction::Vertical)
    .constraints([
      Constraint::Length(1), // Header
      Constraint::Min(1),    // Widgets
      Constraint::Length(1), // Footer
    ])
    .split(frame.area());

  draw_header(frame, chunks[0], app.title(), &theme, app.widget_count());

  let focused = app.focused();
  let areas = widget_areas(chunks[1], app.widget_count());
  for (idx, (widget, area)) in app.widgets_mut().iter_mut().zip(areas.iter()).enumerate() {
    widget.render(frame, *area, idx == focused);
  }

  draw_footer(frame, chunks[2], &app.shortcuts(), app.focused_id(), &theme);
}

/// Screen area left for widgets once header and footer are placed
pub fn body_area(screen: Rect) -> Rect {
  Rect {
    y: screen.y + 1.min(screen.height),
    height: screen.height.saturating_sub(2),
    ..screen
  }
}

/// Split the body into equal side-by-side panes, one per widget
pub fn widget_areas(body: Rect, count: usize) -> Vec<Rect> {
  if count == 0 {
    return Vec::new();
  }
  Layout::default()
    .direction(Direction::Horizontal)
    .constraints(vec![Constraint::Ratio(1, count as u32); count])
    .split(body)
    .to_vec()
}
