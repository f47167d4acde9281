use crate::provider::ProviderUpdate;
use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, KeyEventKind};
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything the dashboard loop reacts to, in arrival order
#[derive(Debug)]
pub enum Event {
  /// Terminal key press
  Key(KeyEvent),
  /// Terminal resized
  Resize(u16, u16),
  /// Periodic tick for UI refresh and bus polling
  Tick,
  /// Update from a data provider for one widget
  Provider {
    widget_id: String,
    update: ProviderUpdate,
  },
}

/// Event handler that merges terminal input, ticks and provider deliveries
pub struct EventHandler {
  tx: mpsc::UnboundedSender<Event>,
  rx: mpsc::UnboundedReceiver<Event>,
}

impl EventHandler {
  /// Create a new event handler with the given tick rate
  pub fn new(tick_rate: Duration) -> Self {
    let (tx, rx) = mpsc::unbounded_channel();

    let input_tx = tx.clone();
    tokio::spawn(async move {
      loop {
        if event::poll(tick_rate).unwrap_or(false) {
          let forwarded = match event::read() {
            Ok(CrosstermEvent::Key(key)) if key.kind == KeyEventKind::Press => {
              input_tx.send(Event::Key(key))
            }
            Ok(CrosstermEvent::Resize(w, h)) => input_tx.send(Event::Resize(w, h)),
            _ => Ok(()),
          };
          if forwarded.is_err() {
            break;
          }
        } else if input_tx.send(Event::Tick).is_err() {
          break;
        }
      }
    });

    Self { tx, rx }
  }

  /// Sender for tasks that feed events into the loop
  pub fn sender(&self) -> mpsc::UnboundedSender<Event> {
    self.tx.clone()
  }

  /// Receive the next event
  pub async fn next(&mut self) -> Option<Event> {
    self.rx.recv().await
  }
}
