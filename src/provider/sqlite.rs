//! SQLite-backed provider that polls a query on an interval.

use super::{Batch, DataProvider, DeliveryCallback, ProviderConfig, ProviderUpdate, Record};
use crate::config::DatasourceConfig;
use color_eyre::{eyre::eyre, Result};
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Provider that runs each subscription's query against a named SQLite datasource
#[derive(Default)]
pub struct SqliteProvider {
  datasources: HashMap<String, Arc<Mutex<Connection>>>,
  subscriptions: HashMap<String, JoinHandle<()>>,
}

impl SqliteProvider {
  pub fn new() -> Self {
    Self::default()
  }

  /// Open every configured datasource read-only.
  ///
  /// A datasource that fails to open is skipped; widgets using it fail to
  /// subscribe and end up faulty.
  pub fn open(datasources: &BTreeMap<String, DatasourceConfig>) -> Self {
    let mut provider = Self::new();
    for (name, ds) in datasources {
      match Connection::open_with_flags(&ds.path, OpenFlags::SQLITE_OPEN_READ_ONLY) {
        Ok(conn) => provider.add_connection(name, conn),
        Err(e) => warn!(
          "Failed to open datasource '{}' at {}: {}",
          name,
          ds.path.display(),
          e
        ),
      }
    }
    provider
  }

  /// Register an already open connection under a datasource name
  pub fn add_connection(&mut self, name: &str, conn: Connection) {
    self
      .datasources
      .insert(name.to_string(), Arc::new(Mutex::new(conn)));
  }

  #[cfg(test)]
  pub fn is_subscribed(&self, widget_id: &str) -> bool {
    self.subscriptions.contains_key(widget_id)
  }
}

impl DataProvider for SqliteProvider {
  fn subscribe(
    &mut self,
    widget_id: &str,
    config: ProviderConfig,
    callback: DeliveryCallback,
  ) -> Result<()> {
    let conn = self
      .datasources
      .get(&config.datasource_name)
      .cloned()
      .ok_or_else(|| eyre!("Unknown datasource '{}'", config.datasource_name))?;

    self.unsubscribe(widget_id);

    info!(
      widget = widget_id,
      datasource = %config.datasource_name,
      table = %config.table_name,
      incremental_column = %config.incremental_column,
      "Subscribing widget"
    );
    let handle = tokio::spawn(poll(conn, config, callback));
    self.subscriptions.insert(widget_id.to_string(), handle);
    Ok(())
  }

  fn unsubscribe(&mut self, widget_id: &str) {
    if let Some(handle) = self.subscriptions.remove(widget_id) {
      handle.abort();
      info!(widget = widget_id, "Unsubscribed widget");
    }
  }
}

impl Drop for SqliteProvider {
  fn drop(&mut self) {
    for (_, handle) in self.subscriptions.drain() {
      handle.abort();
    }
  }
}

/// Decides what a poll result means for the subscriber
#[derive(Debug, Default)]
struct PollState {
  last_batch: Option<Batch>,
  last_error: Option<String>,
}

impl PollState {
  /// Changed data is delivered, unchanged data only after an error, and a
  /// repeated error is not delivered again.
  fn update(&mut self, result: Result<Batch>) -> Option<ProviderUpdate> {
    match result {
      Ok(batch) => {
        let recovered = self.last_error.take().is_some();
        if self.last_batch.as_ref() == Some(&batch) {
          return recovered.then_some(ProviderUpdate::Recovered);
        }
        debug!(rows = batch.records.len(), "Delivering batch");
        self.last_batch = Some(batch.clone());
        Some(ProviderUpdate::Data(batch))
      }
      Err(e) => {
        let msg = e.to_string();
        if self.last_error.as_deref() == Some(msg.as_str()) {
          return None;
        }
        self.last_error = Some(msg.clone());
        Some(ProviderUpdate::Error(msg))
      }
    }
  }
}

/// Poll loop for one subscription
async fn poll(conn: Arc<Mutex<Connection>>, config: ProviderConfig, callback: DeliveryCallback) {
  let mut interval = tokio::time::interval(config.publishing_interval);
  let mut state = PollState::default();

  loop {
    interval.tick().await;

    let conn = Arc::clone(&conn);
    let query = config.query.clone();
    let result = match tokio::task::spawn_blocking(move || run_query(&conn, &query)).await {
      Ok(result) => result,
      Err(e) => {
        warn!("Provider query task failed: {}", e);
        break;
      }
    };

    match state.update(result) {
      Some(ProviderUpdate::Error(msg)) => {
        warn!(query = %config.query, "Provider query failed: {}", msg);
        callback(ProviderUpdate::Error(msg));
      }
      Some(ProviderUpdate::Recovered) => {
        info!(query = %config.query, "Provider query recovered");
        callback(ProviderUpdate::Recovered);
      }
      Some(update) => callback(update),
      None => {}
    }
  }
}

fn run_query(conn: &Mutex<Connection>, query: &str) -> Result<Batch> {
  let conn = conn.lock().map_err(|e| eyre!("Lock poisoned: {}", e))?;

  let mut stmt = conn
    .prepare(query)
    .map_err(|e| eyre!("Failed to prepare query: {}", e))?;
  let columns = stmt.column_count();

  let rows = stmt
    .query_map([], |row| {
      (0..columns)
        .map(|i| row.get_ref(i).map(to_json))
        .collect::<rusqlite::Result<Vec<Value>>>()
    })
    .map_err(|e| eyre!("Failed to run query: {}", e))?;

  let records = rows
    .map(|row| row.map(Record))
    .collect::<rusqlite::Result<Vec<Record>>>()
    .map_err(|e| eyre!("Failed to read row: {}", e))?;

  Ok(Batch { records })
}

fn to_json(value: ValueRef<'_>) -> Value {
  match value {
    ValueRef::Null => Value::Null,
    ValueRef::Integer(i) => Value::from(i),
    ValueRef::Real(f) => Value::from(f),
    ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
    // No text form; the record is rejected like a NULL one
    ValueRef::Blob(_) => Value::Null,
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;
  use std::time::Duration;
  use tokio::sync::mpsc;

  fn connection() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn
      .execute_batch(
        "CREATE TABLE orders (id INTEGER, region TEXT);
         INSERT INTO orders VALUES (1, 'eu'), (2, 'us'), (3, 'eu'), (4, NULL);",
      )
      .unwrap();
    conn
  }

  fn config(query: &str) -> ProviderConfig {
    ProviderConfig {
      query: query.to_string(),
      datasource_name: "sales".to_string(),
      table_name: "orders".to_string(),
      incremental_column: "region".to_string(),
      publishing_interval: Duration::from_secs(1),
    }
  }

  fn channel_callback() -> (DeliveryCallback, mpsc::UnboundedReceiver<ProviderUpdate>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let callback: DeliveryCallback = Arc::new(move |update| {
      let _ = tx.send(update);
    });
    (callback, rx)
  }

  #[test]
  fn test_run_query_maps_columns() {
    let conn = Mutex::new(connection());
    let batch = run_query(&conn, "SELECT region, id FROM orders ORDER BY id").unwrap();

    assert_eq!(batch.records.len(), 4);
    assert_eq!(batch.records[0], Record(vec![json!("eu"), json!(1)]));
    assert_eq!(batch.records[3].0[0], Value::Null);
  }

  #[test]
  fn test_blob_first_column_is_unusable() {
    let conn = Mutex::new(connection());
    let batch = run_query(&conn, "SELECT x'0102', 1 UNION ALL SELECT x'0304', 2").unwrap();

    assert_eq!(batch.records[0].0[0], Value::Null);
    assert_eq!(batch.records[1].first_value(), None);
  }

  fn batch(values: &[&str]) -> Batch {
    Batch {
      records: values.iter().map(|v| Record(vec![json!(v)])).collect(),
    }
  }

  #[test]
  fn test_poll_state_skips_unchanged_batches() {
    let mut state = PollState::default();

    assert!(matches!(state.update(Ok(batch(&["a"]))), Some(ProviderUpdate::Data(_))));
    assert!(state.update(Ok(batch(&["a"]))).is_none());
    assert!(matches!(state.update(Ok(batch(&["b"]))), Some(ProviderUpdate::Data(_))));
  }

  #[test]
  fn test_poll_state_reports_recovery_with_unchanged_data() {
    let mut state = PollState::default();
    state.update(Ok(batch(&["a"])));

    let failed = state.update(Err(eyre!("Failed to read row: no such table: t")));
    assert!(matches!(failed, Some(ProviderUpdate::Error(_))));
    assert!(state.update(Err(eyre!("Failed to read row: no such table: t"))).is_none());

    assert!(matches!(state.update(Ok(batch(&["a"]))), Some(ProviderUpdate::Recovered)));
    assert!(state.update(Ok(batch(&["a"]))).is_none());
  }

  #[test]
  fn test_poll_state_delivers_changed_data_after_error() {
    let mut state = PollState::default();
    state.update(Ok(batch(&["a"])));
    state.update(Err(eyre!("Failed to run query: locked")));

    match state.update(Ok(batch(&["b"]))) {
      Some(ProviderUpdate::Data(b)) => assert_eq!(b, batch(&["b"])),
      other => panic!("unexpected update {:?}", other),
    }
  }

  async fn next(rx: &mut mpsc::UnboundedReceiver<ProviderUpdate>) -> ProviderUpdate {
    tokio::time::timeout(Duration::from_secs(4), rx.recv())
      .await
      .unwrap()
      .unwrap()
  }

  #[tokio::test]
  async fn test_subscription_recovers_after_table_returns() {
    let path = std::env::temp_dir().join(format!("dashfilter-recover-{}.db", std::process::id()));
    let _ = std::fs::remove_file(&path);
    let writer = Connection::open(&path).unwrap();
    writer
      .execute_batch("CREATE TABLE t (v TEXT); INSERT INTO t VALUES ('a');")
      .unwrap();

    let mut provider = SqliteProvider::new();
    provider.add_connection("sales", Connection::open(&path).unwrap());
    let (callback, mut rx) = channel_callback();
    provider.subscribe("filter", config("SELECT v FROM t"), callback).unwrap();

    assert!(matches!(next(&mut rx).await, ProviderUpdate::Data(_)));
    writer.execute_batch("ALTER TABLE t RENAME TO t_old;").unwrap();
    assert!(matches!(next(&mut rx).await, ProviderUpdate::Error(_)));
    writer.execute_batch("ALTER TABLE t_old RENAME TO t;").unwrap();
    assert!(matches!(next(&mut rx).await, ProviderUpdate::Recovered));

    provider.unsubscribe("filter");
    let _ = std::fs::remove_file(&path);
  }

  #[test]
  fn test_run_query_reports_bad_sql() {
    let conn = Mutex::new(connection());
    let err = run_query(&conn, "SELECT nope FROM missing").unwrap_err();
    assert!(err.to_string().contains("Failed to prepare query"));
  }

  #[tokio::test]
  async fn test_subscribe_delivers_first_batch() {
    let mut provider = SqliteProvider::new();
    provider.add_connection("sales", connection());
    let (callback, mut rx) = channel_callback();

    provider
      .subscribe(
        "filter",
        config("SELECT DISTINCT region FROM orders WHERE region IS NOT NULL ORDER BY region"),
        callback,
      )
      .unwrap();
    assert!(provider.is_subscribed("filter"));

    let update = tokio::time::timeout(Duration::from_secs(2), rx.recv())
      .await
      .unwrap()
      .unwrap();
    match update {
      ProviderUpdate::Data(batch) => {
        let values: Vec<_> = batch.records.iter().filter_map(Record::first_value).collect();
        assert_eq!(values, vec!["eu", "us"]);
      }
      other => panic!("unexpected update {:?}", other),
    }

    provider.unsubscribe("filter");
    assert!(!provider.is_subscribed("filter"));
  }

  #[tokio::test]
  async fn test_subscribe_unknown_datasource_fails() {
    let mut provider = SqliteProvider::new();
    let (callback, _rx) = channel_callback();

    let err = provider
      .subscribe("filter", config("SELECT 1"), callback)
      .unwrap_err();
    assert!(err.to_string().contains("Unknown datasource 'sales'"));
    assert!(!provider.is_subscribed("filter"));
  }

  #[tokio::test]
  async fn test_query_error_is_delivered() {
    let mut provider = SqliteProvider::new();
    provider.add_connection("sales", connection());
    let (callback, mut rx) = channel_callback();

    provider
      .subscribe("filter", config("SELECT x FROM missing"), callback)
      .unwrap();

    let update = tokio::time::timeout(Duration::from_secs(2), rx.recv())
      .await
      .unwrap()
      .unwrap();
    assert!(matches!(update, ProviderUpdate::Error(_)));
  }
}
