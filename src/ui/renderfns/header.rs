use crate::ui::theme::Theme;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the header bar with dashboard title, theme and widget count
pub fn draw_header(frame: &mut Frame, area: Rect, title: &str, theme: &Theme, widgets: usize) {
  let header = Line::from(vec![
    Span::styled(" dashfilter ", Style::default().fg(theme.accent).bold()),
    Span::styled("│", Style::default().fg(theme.muted)),
    Span::styled(format!(" {} ", title), Style::default().fg(theme.fg).bold()),
    Span::styled("│", Style::default().fg(theme.muted)),
    Span::styled(
      format!(" {} ", widget_count_label(widgets)),
      Style::default().fg(theme.muted),
    ),
    Span::styled("│", Style::default().fg(theme.muted)),
    Span::styled(
      format!(" theme: {} ", theme.name.label()),
      Style::default().fg(theme.muted),
    ),
  ]);

  let paragraph = Paragraph::new(header).style(Style::default().bg(theme.bg));
  frame.render_widget(paragraph, area);
}

fn widget_count_label(count: usize) -> String {
  match count {
    0 => "no widgets".to_string(),
    1 => "1 widget".to_string(),
    n => format!("{} widgets", n),
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_widget_count_label() {
    assert_eq!(widget_count_label(0), "no widgets");
    assert_eq!(widget_count_label(1), "1 widget");
    assert_eq!(widget_count_label(3), "3 widgets");
  }
}
