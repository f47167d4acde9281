//! Widget lifecycle and the host services widgets are given.
//!
//! The host drives every widget through the same calls:
//! `on_mount` once, `on_configure` whenever theme or size changes,
//! `on_provider_update` / `handle_key` / `tick` while running and
//! `on_unmount` once at the end.

mod search;
mod viewer;

pub use search::SearchWidget;
pub use viewer::ViewerWidget;

use crate::bus::MessageBus;
use crate::config::{Config, WidgetConfig, WidgetKind};
use crate::event::Event;
use crate::provider::{DataProvider, DeliveryCallback, ProviderTemplate, ProviderUpdate};
use crate::ui::theme::Theme;
use color_eyre::{eyre::eyre, Result};
use crossterm::event::KeyEvent;
use ratatui::prelude::*;
use std::sync::Arc;
use tokio::sync::mpsc;

/// A keyboard shortcut hint for display in the footer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShortcutInfo {
  pub key: &'static str,
  pub label: &'static str,
}

impl ShortcutInfo {
  pub const fn new(key: &'static str, label: &'static str) -> Self {
    Self { key, label }
  }
}

/// Theme and pane width pushed to widgets by the host
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Appearance {
  pub theme: Theme,
  pub width: u16,
}

/// Services the dashboard host offers to widgets
pub struct HostContext {
  config: Config,
  bus: MessageBus,
  provider: Box<dyn DataProvider>,
  events: mpsc::UnboundedSender<Event>,
}

impl HostContext {
  pub fn new(
    config: Config,
    bus: MessageBus,
    provider: Box<dyn DataProvider>,
    events: mpsc::UnboundedSender<Event>,
  ) -> Self {
    Self {
      config,
      bus,
      provider,
      events,
    }
  }

  pub fn bus(&self) -> &MessageBus {
    &self.bus
  }

  pub fn provider_mut(&mut self) -> &mut dyn DataProvider {
    self.provider.as_mut()
  }

  /// Look up the provider definition of a widget
  pub fn widget_configuration(&self, widget_id: &str) -> Result<ProviderTemplate> {
    let widget = self
      .config
      .widget(widget_id)
      .ok_or_else(|| eyre!("No configuration for widget '{}'", widget_id))?;

    match &widget.kind {
      WidgetKind::Search {
        provider: Some(provider),
        ..
      } => Ok(provider.clone()),
      WidgetKind::Search { provider: None, .. } => {
        Err(eyre!("Widget '{}' has no provider configuration", widget_id))
      }
      WidgetKind::Viewer { .. } => Err(eyre!("Widget '{}' is not a data widget", widget_id)),
    }
  }

  /// Callback that routes provider updates for `widget_id` into the host event loop
  pub fn delivery_callback(&self, widget_id: &str) -> DeliveryCallback {
    let tx = self.events.clone();
    let widget_id = widget_id.to_string();
    Arc::new(move |update| {
      // The loop is gone once the app quits; late deliveries are dropped
      let _ = tx.send(Event::Provider {
        widget_id: widget_id.clone(),
        update,
      });
    })
  }
}

/// Lifecycle and behaviour every dashboard widget implements
pub trait Widget {
  fn id(&self) -> &str;

  /// Called once when the widget is placed on the dashboard
  fn on_mount(&mut self, host: &mut HostContext);

  /// Called once when the widget is removed; no host calls follow
  fn on_unmount(&mut self, host: &mut HostContext);

  /// Called on theme change and resize
  fn on_configure(&mut self, appearance: Appearance);

  /// Data or error from the provider this widget subscribed to
  fn on_provider_update(&mut self, _update: ProviderUpdate) {}

  /// Handle a key while focused. Returns false if the key was not used.
  fn handle_key(&mut self, key: KeyEvent) -> bool;

  /// Called on each tick of the host loop
  fn tick(&mut self) {}

  fn render(&mut self, frame: &mut Frame, area: Rect, focused: bool);

  /// Shortcuts shown in the footer while this widget has focus
  fn shortcuts(&self) -> Vec<ShortcutInfo> {
    Vec::new()
  }
}

/// Build a widget from its configuration entry
pub fn build(config: &WidgetConfig, bus: &MessageBus) -> Box<dyn Widget> {
  match &config.kind {
    WidgetKind::Search { options, .. } => Box::new(SearchWidget::new(
      &config.id,
      options.clone(),
      bus.publisher(&config.id),
    )),
    WidgetKind::Viewer { publisher, history } => {
      Box::new(ViewerWidget::new(&config.id, publisher, *history))
    }
  }
}


#[cfg(test)]
mod tests {
  use super::testing::{host, RecordingProvider};
  use super::*;
  use crate::provider::Batch;

  #[test]
  fn test_widget_configuration_lookup() {
    let (host, _rx) = host(RecordingProvider::default());

    let template = host.widget_configuration("region-filter").unwrap();
    assert_eq!(template.publishing_interval_secs, 2);

    let err = host.widget_configuration("bare-filter").unwrap_err();
    assert!(err.to_string().contains("no provider configuration"));

    let err = host.widget_configuration("missing").unwrap_err();
    assert!(err.to_string().contains("No configuration for widget 'missing'"));
  }

  #[test]
  fn test_delivery_callback_routes_to_event_loop() {
    let (host, mut rx) = host(RecordingProvider::default());
    let callback = host.delivery_callback("region-filter");

    callback(ProviderUpdate::Data(Batch::default()));

    match rx.try_recv().unwrap() {
      Event::Provider { widget_id, update } => {
        assert_eq!(widget_id, "region-filter");
        assert!(matches!(update, ProviderUpdate::Data(_)));
      }
      other => panic!("unexpected event {:?}", other),
    }
  }
}
