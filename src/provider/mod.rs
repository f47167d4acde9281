//! Data providers deliver rows to widgets asynchronously.
//!
//! A widget subscribes with a resolved [`ProviderConfig`] and a callback. The
//! provider invokes the callback with a fresh [`Batch`] whenever the result of
//! the query changes, until the widget unsubscribes.

mod sqlite;

pub use sqlite::SqliteProvider;

use crate::config::SearchOptions;
use color_eyre::Result;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// One row from the provider. The first column carries the candidate value.
#[derive(Debug, Clone, PartialEq)]
pub struct Record(pub Vec<Value>);

impl Record {
  /// The first column as text. Strings, numbers and booleans are accepted.
  pub fn first_value(&self) -> Option<String> {
    match self.0.first()? {
      Value::String(s) => Some(s.clone()),
      Value::Number(n) => Some(n.to_string()),
      Value::Bool(b) => Some(b.to_string()),
      Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
  }
}

/// A full result set delivered in one update
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
  pub records: Vec<Record>,
}

/// What a provider hands to the subscriber callback
#[derive(Debug, Clone)]
pub enum ProviderUpdate {
  Data(Batch),
  Error(String),
  /// The query works again after an error and its result did not change
  Recovered,
}

pub type DeliveryCallback = Arc<dyn Fn(ProviderUpdate) + Send + Sync>;

/// Provider block of a widget definition, before widget options are applied
#[derive(Debug, Clone, Deserialize)]
pub struct ProviderTemplate {
  /// Query with `{{tableName}}` and `{{columnName}}` placeholders
  pub query: String,
  #[serde(default = "default_publishing_interval")]
  pub publishing_interval_secs: u64,
}

fn default_publishing_interval() -> u64 {
  5
}

/// Provider configuration with widget options applied
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderConfig {
  pub query: String,
  pub datasource_name: String,
  pub table_name: String,
  pub incremental_column: String,
  pub publishing_interval: Duration,
}

impl ProviderTemplate {
  /// Fill in the query placeholders and the datasource fields.
  ///
  /// Only the first occurrence of each placeholder is replaced.
  pub fn resolve(&self, options: &SearchOptions) -> ProviderConfig {
    let query = self
      .query
      .replacen("{{tableName}}", &options.table_name, 1)
      .replacen("{{columnName}}", &options.column_name, 1);

    ProviderConfig {
      query,
      datasource_name: options.datasource_name.clone(),
      table_name: options.table_name.clone(),
      incremental_column: options.column_name.clone(),
      publishing_interval: Duration::from_secs(self.publishing_interval_secs.max(1)),
    }
  }
}

/// Host-side data provider a widget subscribes to
pub trait DataProvider {
  /// Start delivering data for `widget_id`. Replaces any existing subscription
  /// for the same widget.
  fn subscribe(
    &mut self,
    widget_id: &str,
    config: ProviderConfig,
    callback: DeliveryCallback,
  ) -> Result<()>;

  /// Stop delivering data for `widget_id`
  fn unsubscribe(&mut self, widget_id: &str);
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  fn options() -> SearchOptions {
    SearchOptions {
      select_multiple_options: false,
      table_name: "orders".to_string(),
      column_name: "region".to_string(),
      datasource_name: "sales".to_string(),
    }
  }

  #[test]
  fn test_resolve_substitutes_placeholders() {
    let template = ProviderTemplate {
      query: "SELECT DISTINCT {{columnName}} FROM {{tableName}}".to_string(),
      publishing_interval_secs: 10,
    };
    let config = template.resolve(&options());

    assert_eq!(config.query, "SELECT DISTINCT region FROM orders");
    assert_eq!(config.datasource_name, "sales");
    assert_eq!(config.table_name, "orders");
    assert_eq!(config.incremental_column, "region");
    assert_eq!(config.publishing_interval, Duration::from_secs(10));
  }

  #[test]
  fn test_resolve_replaces_first_occurrence_only() {
    let template = ProviderTemplate {
      query: "SELECT {{columnName}} FROM {{tableName}} ORDER BY {{columnName}}".to_string(),
      publishing_interval_secs: 0,
    };
    let config = template.resolve(&options());

    assert_eq!(
      config.query,
      "SELECT region FROM orders ORDER BY {{columnName}}"
    );
    assert_eq!(config.publishing_interval, Duration::from_secs(1));
  }

  #[test]
  fn test_first_value() {
    assert_eq!(
      Record(vec![json!("eu"), json!(3)]).first_value(),
      Some("eu".to_string())
    );
    assert_eq!(Record(vec![json!(7)]).first_value(), Some("7".to_string()));
    assert_eq!(Record(vec![json!(null)]).first_value(), None);
    assert_eq!(Record(Vec::new()).first_value(), None);
  }
}
