use super::{Appearance, HostContext, ShortcutInfo, Widget};
use crate::bus::BusMessage;
use crossterm::event::{KeyCode, KeyEvent};
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};
use std::collections::VecDeque;
use tokio::sync::broadcast::{self, error::TryRecvError};
use tracing::{info, warn};

/// Shows the selections another widget publishes, newest first
pub struct ViewerWidget {
  id: String,
  publisher: String,
  history: usize,
  receiver: Option<broadcast::Receiver<BusMessage>>,
  messages: VecDeque<BusMessage>,
  appearance: Appearance,
}

impl ViewerWidget {
  pub fn new(id: &str, publisher: &str, history: usize) -> Self {
    Self {
      id: id.to_string(),
      publisher: publisher.to_string(),
      history: history.max(1),
      receiver: None,
      messages: VecDeque::new(),
      appearance: Appearance::default(),
    }
  }

  #[cfg(test)]
  pub fn messages(&self) -> impl Iterator<Item = &BusMessage> {
    self.messages.iter()
  }

  fn push(&mut self, message: BusMessage) {
    if message.source != self.publisher {
      return;
    }
    self.messages.push_front(message);
    self.messages.truncate(self.history);
  }
}

impl Widget for ViewerWidget {
  fn id(&self) -> &str {
    &self.id
  }

  fn on_mount(&mut self, host: &mut HostContext) {
    self.receiver = Some(host.bus().subscribe());
    info!(widget = %self.id, publisher = %self.publisher, "Viewer mounted");
  }

  fn on_unmount(&mut self, _host: &mut HostContext) {
    self.receiver = None;
  }

  fn on_configure(&mut self, appearance: Appearance) {
    self.appearance = appearance;
  }

  fn handle_key(&mut self, key: KeyEvent) -> bool {
    match key.code {
      KeyCode::Char('c') => {
        self.messages.clear();
        true
      }
      _ => false,
    }
  }

  fn tick(&mut self) {
    let Some(mut receiver) = self.receiver.take() else {
      return;
    };

    loop {
      match receiver.try_recv() {
        Ok(message) => self.push(message),
        Err(TryRecvError::Lagged(skipped)) => {
          warn!(widget = %self.id, skipped, "Viewer lagged behind the bus");
        }
        Err(TryRecvError::Empty) => break,
        Err(TryRecvError::Closed) => {
          self.receiver = None;
          return;
        }
      }
    }

    self.receiver = Some(receiver);
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
    let theme = self.appearance.theme;
    let block = Block::default()
      .title(format!(" {} ({}) ", self.publisher, self.messages.len()))
      .borders(Borders::ALL)
      .border_style(theme.border_style(focused));

    if self.messages.is_empty() {
      let paragraph = Paragraph::new("No selections published yet.")
        .block(block)
        .style(Style::default().fg(theme.muted));
      frame.render_widget(paragraph, area);
      return;
    }

    let items: Vec<ListItem> = self
      .messages
      .iter()
      .map(|message| {
        let values: Vec<&str> = message
          .payload
          .selected_options
          .iter()
          .map(|o| o.label.as_str())
          .collect();
        ListItem::new(Line::from(vec![
          Span::styled(
            message.sent_at.format("%H:%M:%S ").to_string(),
            Style::default().fg(theme.muted),
          ),
          Span::styled(values.join(", "), Style::default().fg(theme.accent)),
        ]))
      })
      .collect();

    frame.render_widget(List::new(items).block(block), area);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    vec![ShortcutInfo::new("c", "clear")]
  }
}
