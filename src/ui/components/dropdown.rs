use super::input::{InputResult, TextInput};
use super::KeyResult;
use crate::filter::{Chosen, FilterOption, Selection, SelectionFilter};
use crate::ui::renderfns::truncate;
use crate::ui::theme::Theme;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph};

const PLACEHOLDER: &str = "Select option";
const NO_OPTIONS: &str = "No options";
const CHIP_WIDTH: usize = 18;

/// Events emitted by the dropdown that the owning widget applies to its filter
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropdownEvent {
  Chosen(Chosen),
}

/// Select field with a searchable popup menu.
///
/// The dropdown owns only view state. Options and the current selection are
/// read from the [`SelectionFilter`] on every call.
#[derive(Debug, Clone, Default)]
pub struct Dropdown {
  menu_open: bool,
  /// Selection chip removed by the user; every option is offered until one is picked
  cleared: bool,
  search: TextInput,
  highlighted: usize,
  /// Inner width of the select field, 0 until the host reports a size
  field_width: u16,
}

impl Dropdown {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn is_open(&self) -> bool {
    self.menu_open
  }

  #[cfg(test)]
  pub fn is_cleared(&self) -> bool {
    self.cleared
  }

  #[cfg(test)]
  pub fn search_text(&self) -> &str {
    self.search.value()
  }

  pub fn set_field_width(&mut self, width: u16) {
    self.field_width = width;
  }

  /// Drop all view state, e.g. after the option set was replaced
  pub fn reset(&mut self) {
    *self = Self {
      field_width: self.field_width,
      ..Self::default()
    };
  }

  /// Chip text, shortened so a chip never outgrows the field
  fn chip_label(&self, label: &str) -> String {
    let max = match self.field_width {
      0 => CHIP_WIDTH,
      width => CHIP_WIDTH.min((width as usize).saturating_sub(4)).max(4),
    };
    format!(" {} ", truncate(label, max))
  }

  fn open(&mut self) {
    self.menu_open = true;
    self.highlighted = 0;
  }

  fn close(&mut self) {
    self.menu_open = false;
    self.cleared = false;
    self.search.clear();
    self.highlighted = 0;
  }

  /// Options listed in the menu for the current search text.
  ///
  /// Multi-select hides what is already selected. After a clear, options are
  /// offered enabled.
  pub fn visible_options(&self, filter: &SelectionFilter) -> Vec<FilterOption> {
    let needle = self.search.value().to_lowercase();
    let selection = filter.selection();
    let hide_selected = filter.is_multiple() && !self.cleared;

    filter
      .options()
      .iter()
      .filter(|o| !(hide_selected && selection.contains(&o.value)))
      .filter(|o| needle.is_empty() || o.label.to_lowercase().contains(&needle))
      .map(|o| {
        if self.cleared {
          o.clone().with_disabled(false)
        } else {
          o.clone()
        }
      })
      .collect()
  }

  pub fn handle_key(&mut self, key: KeyEvent, filter: &SelectionFilter) -> KeyResult<DropdownEvent> {
    if !self.menu_open {
      return match key.code {
        KeyCode::Enter | KeyCode::Down | KeyCode::Char(' ') => {
          self.open();
          KeyResult::Handled
        }
        KeyCode::Backspace | KeyCode::Delete => self.remove_last(filter),
        _ => KeyResult::NotHandled,
      };
    }

    match key.code {
      KeyCode::Esc => {
        self.close();
        KeyResult::Handled
      }
      KeyCode::Down => {
        self.move_highlight(1, filter);
        KeyResult::Handled
      }
      KeyCode::Up => {
        self.move_highlight(-1, filter);
        KeyResult::Handled
      }
      KeyCode::Enter => self.choose(filter),
      KeyCode::Backspace if self.search.is_empty() => self.remove_last(filter),
      _ => match self.search.handle_key(key) {
        InputResult::Consumed => {
          self.highlighted = 0;
          KeyResult::Handled
        }
        InputResult::NotHandled => KeyResult::NotHandled,
      },
    }
  }

  fn move_highlight(&mut self, delta: i32, filter: &SelectionFilter) {
    let len = self.visible_options(filter).len();
    if len > 0 {
      self.highlighted = (self.highlighted as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  /// Remove the last selected chip. Removing "All" (or a single-select value)
  /// clears the field and opens the menu instead.
  fn remove_last(&mut self, filter: &SelectionFilter) -> KeyResult<DropdownEvent> {
    match filter.selection() {
      Selection::Subset(options) if filter.is_multiple() => {
        let mut rest = options.clone();
        rest.pop();
        KeyResult::Event(DropdownEvent::Chosen(Chosen::Many(rest)))
      }
      _ => {
        self.cleared = true;
        self.open();
        KeyResult::Handled
      }
    }
  }

  fn choose(&mut self, filter: &SelectionFilter) -> KeyResult<DropdownEvent> {
    let visible = self.visible_options(filter);
    let Some(option) = visible.get(self.highlighted).cloned() else {
      return KeyResult::Handled;
    };
    if option.disabled {
      return KeyResult::Handled;
    }

    let chosen = if filter.is_multiple() {
      let mut current = match filter.selection() {
        Selection::Subset(options) if !self.cleared => options.clone(),
        _ => Vec::new(),
      };
      current.push(option);
      self.cleared = false;
      self.search.clear();
      self.highlighted = 0;
      Chosen::Many(current)
    } else {
      self.close();
      Chosen::One(option)
    };

    KeyResult::Event(DropdownEvent::Chosen(chosen))
  }

  /// Render the select field at the top of `area` and return its rect, which
  /// anchors the menu.
  pub fn render_control(
    &self,
    frame: &mut Frame,
    area: Rect,
    filter: &SelectionFilter,
    theme: &Theme,
    focused: bool,
  ) -> Rect {
    let control = Rect {
      height: area.height.min(3),
      ..area
    };

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(theme.border_style(focused));

    let mut spans = Vec::new();
    if self.cleared {
      if self.search.is_empty() {
        spans.push(Span::styled(PLACEHOLDER, Style::default().fg(theme.muted)));
      }
    } else if filter.is_multiple() {
      for option in filter.selection().options() {
        spans.push(Span::styled(
          self.chip_label(&option.label),
          Style::default().fg(theme.bg).bg(theme.accent),
        ));
        spans.push(Span::raw(" "));
      }
    } else {
      for option in filter.selection().options() {
        spans.push(Span::styled(option.label, Style::default().fg(theme.fg)));
      }
    }

    if self.menu_open && focused {
      spans.push(Span::raw(" "));
      spans.push(Span::raw(self.search.value().to_string()));
      spans.push(Span::styled("_", Style::default().fg(theme.border_focused)));
    }

    let paragraph = Paragraph::new(Line::from(spans)).block(block);
    frame.render_widget(paragraph, control);
    control
  }

  /// Render the popup menu below `anchor`, clipped to `bounds`
  pub fn render_menu(
    &self,
    frame: &mut Frame,
    anchor: Rect,
    bounds: Rect,
    filter: &SelectionFilter,
    theme: &Theme,
  ) {
    if !self.menu_open {
      return;
    }

    let visible = self.visible_options(filter);
    let top = anchor.y + anchor.height;
    let available = bounds.bottom().saturating_sub(top);
    let wanted = visible.len().max(1) as u16 + 2;
    let height = wanted.min(available);
    if height < 3 {
      return;
    }

    let menu_area = Rect::new(anchor.x, top, anchor.width, height);
    frame.render_widget(Clear, menu_area);

    let block = Block::default()
      .borders(Borders::ALL)
      .border_style(Style::default().fg(theme.border_focused));

    if visible.is_empty() {
      let paragraph = Paragraph::new(NO_OPTIONS)
        .block(block)
        .style(Style::default().fg(theme.muted));
      frame.render_widget(paragraph, menu_area);
      return;
    }

    let selection = filter.selection();
    let items: Vec<ListItem> = visible
      .iter()
      .map(|option| {
        let mut style = if option.disabled {
          Style::default().fg(theme.muted).add_modifier(Modifier::DIM)
        } else {
          Style::default().fg(theme.fg)
        };
        if selection.contains(&option.value) {
          style = style.add_modifier(Modifier::BOLD);
        }
        ListItem::new(Line::from(Span::styled(option.label.clone(), style)))
      })
      .collect();

    let list = List::new(items)
      .block(block)
      .highlight_style(Style::default().bg(theme.highlight))
      .highlight_symbol("> ");

    let mut state = ListState::default();
    state.select(Some(self.highlighted.min(visible.len() - 1)));
    frame.render_stateful_widget(list, menu_area, &mut state);
  }
}
