use crate::bus::MessageBus;
use crate::config::{Config, ThemeName};
use crate::event::{Event, EventHandler};
use crate::provider::SqliteProvider;
use crate::ui::{self, theme::Theme};
use crate::widget::{self, Appearance, HostContext, ShortcutInfo, Widget};
use color_eyre::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
  disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::prelude::*;
use std::io::stdout;
use std::time::Duration;
use tracing::{debug, info};

/// Dashboard host: owns the widgets and the services they use
pub struct App {
  title: String,
  theme: ThemeName,
  host: HostContext,
  widgets: Vec<Box<dyn Widget>>,
  focused: usize,
  events: EventHandler,
  should_quit: bool,
}

impl App {
  pub fn new(config: Config) -> Result<Self> {
    let events = EventHandler::new(Duration::from_millis(250));
    let bus = MessageBus::default();
    let provider = SqliteProvider::open(&config.datasources);

    let widgets: Vec<Box<dyn Widget>> = config
      .widgets
      .iter()
      .map(|w| widget::build(w, &bus))
      .collect();
    info!(widgets = widgets.len(), "Dashboard created");

    Ok(Self {
      title: config.title.clone(),
      theme: config.theme,
      host: HostContext::new(config, bus, Box::new(provider), events.sender()),
      widgets,
      focused: 0,
      events,
      should_quit: false,
    })
  }

  pub async fn run(&mut self) -> Result<()> {
    // Setup terminal
    enable_raw_mode()?;
    stdout().execute(EnterAlternateScreen)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(stdout()))?;

    for widget in self.widgets.iter_mut() {
      widget.on_mount(&mut self.host);
    }
    let size = terminal.size()?;
    self.configure_widgets(Rect::new(0, 0, size.width, size.height));

    let result = self.event_loop(&mut terminal).await;

    for widget in self.widgets.iter_mut() {
      widget.on_unmount(&mut self.host);
    }

    // Cleanup terminal
    disable_raw_mode()?;
    stdout().execute(LeaveAlternateScreen)?;

    result
  }

  async fn event_loop(
    &mut self,
    terminal: &mut Terminal<CrosstermBackend<std::io::Stdout>>,
  ) -> Result<()> {
    while !self.should_quit {
      terminal.draw(|frame| ui::draw(frame, self))?;

      if let Some(event) = self.events.next().await {
        self.handle_event(event);
      }
    }
    Ok(())
  }

  fn handle_event(&mut self, event: Event) {
    match event {
      Event::Key(key) => self.handle_key(key),
      Event::Resize(width, height) => {
        self.configure_widgets(Rect::new(0, 0, width, height));
      }
      Event::Tick => {
        for widget in self.widgets.iter_mut() {
          widget.tick();
        }
      }
      Event::Provider { widget_id, update } => {
        match self.widgets.iter_mut().find(|w| w.id() == widget_id) {
          Some(widget) => widget.on_provider_update(update),
          None => debug!(widget = %widget_id, "Update for unknown widget"),
        }
      }
    }
  }

  fn handle_key(&mut self, key: KeyEvent) {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
      self.should_quit = true;
      return;
    }

    // The focused widget sees keys first
    if let Some(widget) = self.widgets.get_mut(self.focused) {
      if widget.handle_key(key) {
        return;
      }
    }

    match key.code {
      KeyCode::Char('q') => self.should_quit = true,
      KeyCode::Tab => self.cycle_focus(1),
      KeyCode::BackTab => self.cycle_focus(-1),
      KeyCode::Char('t') => {
        self.theme = self.theme.toggled();
        info!(theme = self.theme.label(), "Theme changed");
        self.reconfigure_theme();
      }
      _ => {}
    }
  }

  fn cycle_focus(&mut self, delta: i32) {
    let len = self.widgets.len();
    if len > 0 {
      self.focused = (self.focused as i32 + delta).rem_euclid(len as i32) as usize;
    }
  }

  /// Push theme and pane sizes for a terminal of the given size
  fn configure_widgets(&mut self, screen: Rect) {
    let theme = Theme::from(self.theme);
    let areas = ui::widget_areas(ui::body_area(screen), self.widgets.len());
    for (widget, area) in self.widgets.iter_mut().zip(areas.iter()) {
      widget.on_configure(Appearance {
        theme,
        width: area.width,
      });
    }
  }

  fn reconfigure_theme(&mut self) {
    if let Ok((width, height)) = crossterm::terminal::size() {
      self.configure_widgets(Rect::new(0, 0, width, height));
    }
  }

  // Accessors for UI rendering
  pub fn title(&self) -> &str {
    &self.title
  }

  pub fn theme(&self) -> Theme {
    Theme::from(self.theme)
  }

  pub fn focused(&self) -> usize {
    self.focused
  }

  pub fn widgets_mut(&mut self) -> &mut [Box<dyn Widget>] {
    &mut self.widgets
  }

  pub fn widget_count(&self) -> usize {
    self.widgets.len()
  }

  pub fn focused_id(&self) -> Option<&str> {
    self.widgets.get(self.focused).map(|w| w.id())
  }

  /// Global shortcuts followed by the focused widget's
  pub fn shortcuts(&self) -> Vec<ShortcutInfo> {
    let mut shortcuts = vec![
      ShortcutInfo::new("Tab", "focus"),
      ShortcutInfo::new("t", "theme"),
      ShortcutInfo::new("q", "quit"),
    ];
    if let Some(widget) = self.widgets.get(self.focused) {
      shortcuts.extend(widget.shortcuts());
    }
    shortcuts
  }
}
