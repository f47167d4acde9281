use crate::provider::ProviderTemplate;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
  /// Dashboard title shown in the header
  #[serde(default = "default_title")]
  pub title: String,
  #[serde(default)]
  pub theme: ThemeName,
  /// Named SQLite datasources widgets can query
  #[serde(default)]
  pub datasources: BTreeMap<String, DatasourceConfig>,
  #[serde(default)]
  pub widgets: Vec<WidgetConfig>,
}

fn default_title() -> String {
  "dashfilter".to_string()
}

#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ThemeName {
  #[default]
  Dark,
  Light,
}

impl ThemeName {
  pub fn toggled(self) -> Self {
    match self {
      ThemeName::Dark => ThemeName::Light,
      ThemeName::Light => ThemeName::Dark,
    }
  }

  pub fn label(self) -> &'static str {
    match self {
      ThemeName::Dark => "dark",
      ThemeName::Light => "light",
    }
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatasourceConfig {
  pub path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WidgetConfig {
  pub id: String,
  #[serde(flatten)]
  pub kind: WidgetKind,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WidgetKind {
  /// Dropdown filter that publishes its selection
  Search {
    options: SearchOptions,
    /// Provider definition; a search widget without one is faulty
    provider: Option<ProviderTemplate>,
  },
  /// Shows selections published by another widget
  Viewer {
    publisher: String,
    #[serde(default = "default_history")]
    history: usize,
  },
}

fn default_history() -> usize {
  20
}

/// Options of a search widget
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct SearchOptions {
  #[serde(default)]
  pub select_multiple_options: bool,
  pub table_name: String,
  pub column_name: String,
  pub datasource_name: String,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./dashfilter.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/dashfilter/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    match path {
      Some(p) => Self::load_from_path(&p),
      None => Err(eyre!(
        "No configuration file found. Create one at ~/.config/dashfilter/config.yaml\n\
                 See dashfilter.example.yaml for the format."
      )),
    }
  }

  fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("dashfilter.yaml");
    if local.exists() {
      return Some(local);
    }

    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("dashfilter").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let mut config = Self::parse(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    // Datasource paths are relative to the config file
    if let Some(base) = path.parent() {
      for ds in config.datasources.values_mut() {
        if ds.path.is_relative() {
          ds.path = base.join(&ds.path);
        }
      }
    }

    Ok(config)
  }

  pub fn parse(contents: &str) -> Result<Self> {
    let config: Config = serde_yaml::from_str(contents)?;
    config.validate()?;
    Ok(config)
  }

  fn validate(&self) -> Result<()> {
    let mut seen = std::collections::HashSet::new();
    for widget in &self.widgets {
      if !seen.insert(widget.id.as_str()) {
        return Err(eyre!("Duplicate widget id '{}'", widget.id));
      }
    }
    Ok(())
  }

  pub fn widget(&self, id: &str) -> Option<&WidgetConfig> {
    self.widgets.iter().find(|w| w.id == id)
  }
}
