use crate::ui::theme::Theme;
use crate::widget::ShortcutInfo;
use ratatui::prelude::*;
use ratatui::widgets::Paragraph;

/// Draw the footer bar with shortcut hints and the focused widget id
pub fn draw_footer(
  frame: &mut Frame,
  area: Rect,
  shortcuts: &[ShortcutInfo],
  focused: Option<&str>,
  theme: &Theme,
) {
  let mut spans = vec![Span::raw(" ")];

  for (i, shortcut) in shortcuts.iter().enumerate() {
    if i > 0 {
      spans.push(Span::raw("   "));
    }
    // Keys and brackets highlighted, descriptions dimmed
    spans.push(Span::styled(
      format!("<{}>", shortcut.key),
      Style::default().fg(theme.accent),
    ));
    spans.push(Span::styled(
      format!(" {}", shortcut.label),
      Style::default().fg(theme.muted),
    ));
  }

  if let Some(id) = focused {
    spans.push(Span::styled("  │ ", Style::default().fg(theme.muted)));
    spans.push(Span::styled(id.to_string(), Style::default().fg(theme.fg).bold()));
  }

  let paragraph = Paragraph::new(Line::from(spans)).style(Style::default().bg(theme.bg));
  frame.render_widget(paragraph, area);
}
