//! Cross-widget message bus.
//!
//! Widgets publish selection changes here and any widget on the dashboard can
//! subscribe. Sends are fire-and-forget: there is no acknowledgement and a send
//! with nobody listening is not an error.

use crate::filter::SelectionMessage;
use chrono::{DateTime, Local};
use tokio::sync::broadcast;
use tracing::debug;

/// A message as seen by subscribers
#[derive(Debug, Clone)]
pub struct BusMessage {
  /// Id of the widget that published the message
  pub source: String,
  pub sent_at: DateTime<Local>,
  pub payload: SelectionMessage,
}

/// Host-owned broadcast channel shared by all widgets
#[derive(Debug, Clone)]
pub struct MessageBus {
  tx: broadcast::Sender<BusMessage>,
}

impl MessageBus {
  pub fn new(capacity: usize) -> Self {
    let (tx, _rx) = broadcast::channel(capacity);
    Self { tx }
  }

  /// Get a publishing handle bound to a widget id
  pub fn publisher(&self, source: &str) -> Publisher {
    Publisher {
      source: source.to_string(),
      tx: self.tx.clone(),
    }
  }

  pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
    self.tx.subscribe()
  }
}

impl Default for MessageBus {
  fn default() -> Self {
    Self::new(64)
  }
}

/// Publishing side of the bus for a single widget
#[derive(Debug, Clone)]
pub struct Publisher {
  source: String,
  tx: broadcast::Sender<BusMessage>,
}

impl Publisher {
  pub fn source(&self) -> &str {
    &self.source
  }

  pub fn publish(&self, payload: SelectionMessage) {
    let message = BusMessage {
      source: self.source.clone(),
      sent_at: Local::now(),
      payload,
    };
    // Err only means there are no subscribers right now
    let receivers = self.tx.send(message).unwrap_or(0);
    debug!(source = %self.source, receivers, "Published selection");
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::filter::FilterOption;

  #[test]
  fn test_publish_without_subscribers_is_ok() {
    let bus = MessageBus::new(4);
    let publisher = bus.publisher("filter");
    publisher.publish(SelectionMessage {
      selected_options: vec![FilterOption::all()],
    });
  }

  #[test]
  fn test_subscriber_receives_source_and_payload() {
    let bus = MessageBus::new(4);
    let mut rx = bus.subscribe();
    let publisher = bus.publisher("region-filter");

    publisher.publish(SelectionMessage {
      selected_options: vec![FilterOption::new("eu")],
    });

    let msg = rx.try_recv().unwrap();
    assert_eq!(msg.source, "region-filter");
    assert_eq!(msg.payload.selected_options[0].value, "eu");
    assert!(rx.try_recv().is_err());
  }
}
