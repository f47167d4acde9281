use super::{Appearance, HostContext, ShortcutInfo, Widget};
use crate::bus::Publisher;
use crate::config::SearchOptions;
use crate::filter::{SelectionFilter, SelectionState};
use crate::provider::ProviderUpdate;
use crate::ui::components::{Dropdown, DropdownEvent, KeyResult};
use color_eyre::Result;
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use tracing::{debug, error, info, warn};

const FAULTY_MESSAGE: &str = "Unable to configure this widget. Check its provider configuration.";

/// Where the widget is in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WidgetStatus {
  /// Created, not mounted yet
  Idle,
  /// Subscribed, no data yet
  Waiting,
  /// At least one batch received
  Live,
  /// Configuration could not be retrieved or applied; terminal
  Faulty(String),
  Unmounted,
}

/// Dropdown filter widget that publishes its selection to the dashboard
pub struct SearchWidget {
  id: String,
  options: SearchOptions,
  filter: SelectionFilter,
  dropdown: Dropdown,
  status: WidgetStatus,
  /// Provider failure, cleared by recovery or the next batch
  provider_error: Option<String>,
  /// Last batch that could not be ingested, cleared by the next good batch
  data_error: Option<String>,
  appearance: Appearance,
}

impl SearchWidget {
  pub fn new(id: &str, options: SearchOptions, publisher: Publisher) -> Self {
    let filter = SelectionFilter::new(options.select_multiple_options, publisher);
    Self {
      id: id.to_string(),
      options,
      filter,
      dropdown: Dropdown::new(),
      status: WidgetStatus::Idle,
      provider_error: None,
      data_error: None,
      appearance: Appearance::default(),
    }
  }

  #[cfg(test)]
  pub fn status(&self) -> &WidgetStatus {
    &self.status
  }

  #[cfg(test)]
  pub fn filter(&self) -> &SelectionFilter {
    &self.filter
  }

  /// The error shown in the title, provider failures first
  pub fn last_error(&self) -> Option<&str> {
    self.provider_error.as_deref().or(self.data_error.as_deref())
  }

  fn subscribe(&self, host: &mut HostContext) -> Result<()> {
    let template = host.widget_configuration(&self.id)?;
    let config = template.resolve(&self.options);
    debug!(widget = %self.id, query = %config.query, "Resolved provider query");
    let callback = host.delivery_callback(&self.id);
    host.provider_mut().subscribe(&self.id, config, callback)
  }

  fn title(&self) -> String {
    let label = format!("{}.{}", self.options.table_name, self.options.column_name);
    match (&self.status, self.last_error()) {
      (WidgetStatus::Faulty(_), _) => format!(" {} (faulty) ", label),
      (_, Some(e)) => format!(" {} (error: {}) ", label, e),
      (WidgetStatus::Waiting, _) | (WidgetStatus::Idle, _) => format!(" {} (loading...) ", label),
      _ => format!(" {} ", label),
    }
  }
}

impl Widget for SearchWidget {
  fn id(&self) -> &str {
    &self.id
  }

  fn on_mount(&mut self, host: &mut HostContext) {
    match self.subscribe(host) {
      Ok(()) => {
        info!(widget = %self.id, "Search widget mounted");
        self.status = WidgetStatus::Waiting;
      }
      Err(e) => {
        warn!(widget = %self.id, "Faulty provider configuration: {}", e);
        self.status = WidgetStatus::Faulty(e.to_string());
      }
    }
  }

  fn on_unmount(&mut self, host: &mut HostContext) {
    if !matches!(self.status, WidgetStatus::Faulty(_)) {
      host.provider_mut().unsubscribe(&self.id);
    }
    self.status = WidgetStatus::Unmounted;
  }

  fn on_configure(&mut self, appearance: Appearance) {
    self.appearance = appearance;
    // Pane border, field margin and field border on both sides
    self.dropdown.set_field_width(appearance.width.saturating_sub(6));
  }

  fn on_provider_update(&mut self, update: ProviderUpdate) {
    if !matches!(self.status, WidgetStatus::Waiting | WidgetStatus::Live) {
      debug!(widget = %self.id, status = ?self.status, "Dropping provider update");
      return;
    }

    match update {
      ProviderUpdate::Data(batch) => match self.filter.on_data_received(&batch) {
        Ok(()) => {
          self.status = WidgetStatus::Live;
          self.provider_error = None;
          self.data_error = None;
          self.dropdown.reset();
        }
        Err(e) => {
          error!(widget = %self.id, "Malformed provider data: {}", e);
          self.provider_error = None;
          self.data_error = Some(e.to_string());
        }
      },
      ProviderUpdate::Error(msg) => {
        self.provider_error = Some(msg);
      }
      ProviderUpdate::Recovered => {
        debug!(widget = %self.id, "Provider recovered");
        self.provider_error = None;
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) -> bool {
    if self.status != WidgetStatus::Live {
      return false;
    }

    match self.dropdown.handle_key(key, &self.filter) {
      KeyResult::Event(DropdownEvent::Chosen(chosen)) => {
        self.filter.on_selection_changed(chosen);
        true
      }
      result => result.is_handled(),
    }
  }

  fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool) {
    let theme = self.appearance.theme;
    let block = Block::default()
      .title(self.title())
      .borders(Borders::ALL)
      .border_style(theme.border_style(focused));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    if let WidgetStatus::Faulty(_) = self.status {
      let paragraph = Paragraph::new(FAULTY_MESSAGE)
        .style(Style::default().fg(theme.error))
        .wrap(Wrap { trim: true });
      frame.render_widget(paragraph, inner);
      return;
    }

    // Horizontal padding around the field
    let field_area = inner.inner(Margin {
      horizontal: 1,
      vertical: 0,
    });
    let anchor = self
      .dropdown
      .render_control(frame, field_area, &self.filter, &theme, focused);
    self
      .dropdown
      .render_menu(frame, anchor, field_area, &self.filter, &theme);
  }

  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    if self.dropdown.is_open() {
      vec![
        ShortcutInfo::new("↑/↓", "move"),
        ShortcutInfo::new("Enter", "choose"),
        ShortcutInfo::new("Esc", "close"),
      ]
    } else {
      let backspace = match self.filter.state() {
        SelectionState::SubsetSelected if self.filter.is_multiple() => "remove",
        _ => "clear",
      };
      vec![
        ShortcutInfo::new("Enter", "open"),
        ShortcutInfo::new("Bksp", backspace),
      ]
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::event::Event;
  use crate::filter::{FilterOption, Selection};
  use crate::provider::{Batch, Record};
  use crate::widget::testing::{host, RecordingProvider};
  use crossterm::event::{KeyCode, KeyModifiers};
  use serde_json::json;
  use std::time::Duration;

  fn options() -> SearchOptions {
    SearchOptions {
      select_multiple_options: true,
      table_name: "orders".to_string(),
      column_name: "region".to_string(),
      datasource_name: "sales".to_string(),
    }
  }

  fn widget(host: &HostContext, id: &str) -> SearchWidget {
    SearchWidget::new(id, options(), host.bus().publisher(id))
  }

  fn batch(values: &[&str]) -> Batch {
    Batch {
      records: values.iter().map(|v| Record(vec![json!(v)])).collect(),
    }
  }

  fn key(code: KeyCode) -> KeyEvent {
    KeyEvent::new(code, KeyModifiers::NONE)
  }

  #[test]
  fn test_mount_subscribes_with_resolved_config() {
    let provider = RecordingProvider::default();
    let (mut host, _rx) = host(provider.clone());
    let mut w = widget(&host, "region-filter");

    w.on_mount(&mut host);

    assert_eq!(w.status(), &WidgetStatus::Waiting);
    let subscribed = provider.subscribed.lock().unwrap();
    let (id, config) = &subscribed[0];
    assert_eq!(id, "region-filter");
    assert_eq!(config.query, "SELECT DISTINCT region FROM orders");
    assert_eq!(config.datasource_name, "sales");
    assert_eq!(config.table_name, "orders");
    assert_eq!(config.incremental_column, "region");
    assert_eq!(config.publishing_interval, Duration::from_secs(2));
  }

  #[test]
  fn test_missing_provider_config_is_faulty() {
    let provider = RecordingProvider::default();
    let (mut host, _rx) = host(provider.clone());
    let mut w = widget(&host, "bare-filter");

    w.on_mount(&mut host);

    assert!(matches!(w.status(), WidgetStatus::Faulty(_)));
    assert!(provider.subscribed.lock().unwrap().is_empty());

    // Faulty is terminal: data is ignored, keys are not consumed
    w.on_provider_update(ProviderUpdate::Data(batch(&["x"])));
    assert!(matches!(w.status(), WidgetStatus::Faulty(_)));
    assert!(!w.handle_key(key(KeyCode::Enter)));
  }

  #[test]
  fn test_subscribe_failure_is_faulty() {
    let provider = RecordingProvider {
      fail: true,
      ..Default::default()
    };
    let (mut host, _rx) = host(provider);
    let mut w = widget(&host, "region-filter");

    w.on_mount(&mut host);

    match w.status() {
      WidgetStatus::Faulty(msg) => assert!(msg.contains("Unknown datasource")),
      other => panic!("unexpected status {:?}", other),
    }
  }

  #[test]
  fn test_delivery_through_callback_reaches_filter() {
    let provider = RecordingProvider::default();
    let (mut host, mut rx) = host(provider.clone());
    let mut w = widget(&host, "region-filter");
    let mut bus_rx = host.bus().subscribe();
    w.on_mount(&mut host);

    let callback = provider.callbacks.lock().unwrap()[0].clone();
    callback(ProviderUpdate::Data(batch(&["x", "y"])));

    match rx.try_recv().unwrap() {
      Event::Provider { update, .. } => w.on_provider_update(update),
      other => panic!("unexpected event {:?}", other),
    }

    assert_eq!(w.status(), &WidgetStatus::Live);
    assert_eq!(w.filter().state(), SelectionState::AllSelected);
    assert_eq!(w.filter().options().len(), 3);
    assert_eq!(bus_rx.try_recv().unwrap().source, "region-filter");
  }

  #[test]
  fn test_malformed_batch_sets_error_and_keeps_options() {
    let (mut host, _rx) = host(RecordingProvider::default());
    let mut w = widget(&host, "region-filter");
    w.on_mount(&mut host);
    w.on_provider_update(ProviderUpdate::Data(batch(&["x"])));

    w.on_provider_update(ProviderUpdate::Data(Batch {
      records: vec![Record(vec![json!(null)])],
    }));

    assert!(w.last_error().unwrap().contains("Record 0"));
    assert_eq!(w.filter().options().len(), 2);
    assert_eq!(w.status(), &WidgetStatus::Live);
  }

  #[test]
  fn test_keys_drive_selection() {
    let (mut host, _rx) = host(RecordingProvider::default());
    let mut w = widget(&host, "region-filter");
    w.on_mount(&mut host);
    w.on_provider_update(ProviderUpdate::Data(batch(&["x", "y"])));

    assert!(w.handle_key(key(KeyCode::Backspace)));
    assert!(w.handle_key(key(KeyCode::Enter)));

    assert_eq!(
      w.filter().selection(),
      &Selection::Subset(vec![FilterOption::new("y")])
    );
    assert!(!w.handle_key(key(KeyCode::Tab)));
  }

  #[test]
  fn test_recovery_clears_provider_error_and_keeps_selection() {
    let (mut host, _rx) = host(RecordingProvider::default());
    let mut w = widget(&host, "region-filter");
    w.on_mount(&mut host);
    w.on_provider_update(ProviderUpdate::Data(batch(&["x", "y"])));
    w.filter.on_selection_changed(vec![FilterOption::new("x")]);

    w.on_provider_update(ProviderUpdate::Error("Failed to read row: no such table".into()));
    assert!(w.title().contains("(error: Failed to read row"));

    w.on_provider_update(ProviderUpdate::Recovered);

    assert_eq!(w.last_error(), None);
    assert_eq!(w.title(), " orders.region ");
    assert_eq!(w.filter().selection(), &Selection::Subset(vec![FilterOption::new("x")]));
  }

  #[test]
  fn test_recovery_keeps_data_error() {
    let (mut host, _rx) = host(RecordingProvider::default());
    let mut w = widget(&host, "region-filter");
    w.on_mount(&mut host);
    w.on_provider_update(ProviderUpdate::Data(Batch {
      records: vec![Record(vec![json!(null)])],
    }));
    w.on_provider_update(ProviderUpdate::Error("Failed to run query".into()));

    w.on_provider_update(ProviderUpdate::Recovered);

    assert!(w.last_error().unwrap().contains("Record 0"));
  }

  #[test]
  fn test_backspace_shortcut_follows_selection() {
    let (mut host, _rx) = host(RecordingProvider::default());
    let mut w = widget(&host, "region-filter");
    w.on_mount(&mut host);
    w.on_provider_update(ProviderUpdate::Data(batch(&["x", "y"])));
    assert!(w.shortcuts().contains(&ShortcutInfo::new("Bksp", "clear")));

    w.filter.on_selection_changed(vec![FilterOption::new("x")]);
    assert!(w.shortcuts().contains(&ShortcutInfo::new("Bksp", "remove")));
  }

  #[test]
  fn test_unmount_unsubscribes_and_drops_late_data() {
    let provider = RecordingProvider::default();
    let (mut host, _rx) = host(provider.clone());
    let mut w = widget(&host, "region-filter");
    w.on_mount(&mut host);

    w.on_unmount(&mut host);
    w.on_provider_update(ProviderUpdate::Data(batch(&["x"])));

    assert_eq!(
      provider.unsubscribed.lock().unwrap().as_slice(),
      ["region-filter".to_string()]
    );
    assert_eq!(w.status(), &WidgetStatus::Unmounted);
    assert!(w.filter().options().is_empty());
  }
}
