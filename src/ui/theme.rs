use crate::config::ThemeName;
use ratatui::prelude::*;

/// Color palette handed to widgets by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
  pub name: ThemeName,
  pub fg: Color,
  pub bg: Color,
  pub accent: Color,
  pub muted: Color,
  pub highlight: Color,
  pub border: Color,
  pub border_focused: Color,
  pub error: Color,
}

impl Theme {
  pub fn dark() -> Self {
    Self {
      name: ThemeName::Dark,
      fg: Color::White,
      bg: Color::Black,
      accent: Color::Cyan,
      muted: Color::DarkGray,
      highlight: Color::DarkGray,
      border: Color::Blue,
      border_focused: Color::Yellow,
      error: Color::Red,
    }
  }

  pub fn light() -> Self {
    Self {
      name: ThemeName::Light,
      fg: Color::Black,
      bg: Color::White,
      accent: Color::Blue,
      muted: Color::Gray,
      highlight: Color::LightBlue,
      border: Color::DarkGray,
      border_focused: Color::Magenta,
      error: Color::Red,
    }
  }

  pub fn border_style(&self, focused: bool) -> Style {
    if focused {
      Style::default().fg(self.border_focused)
    } else {
      Style::default().fg(self.border)
    }
  }
}

impl From<ThemeName> for Theme {
  fn from(name: ThemeName) -> Self {
    match name {
      ThemeName::Dark => Theme::dark(),
      ThemeName::Light => Theme::light(),
    }
  }
}

impl Default for Theme {
  fn default() -> Self {
    Theme::dark()
  }
}
