//! Selection filter: maps provider rows to options and tracks what is selected.
//!
//! The filter is always in one of two states:
//! - `AllSelected`: selection is `[All]`, every concrete option is disabled
//! - `SubsetSelected`: selection is a non-empty set of concrete options and
//!   every option, "All" included, is enabled
//!
//! Every data delivery resets to `AllSelected`. Every state change publishes
//! the new selection on the bus exactly once.

mod option;

pub use option::{Chosen, FilterOption, Selection, SelectionMessage, SelectionState, ALL};

use crate::bus::Publisher;
use crate::provider::Batch;
use color_eyre::{eyre::eyre, Result};
use std::collections::HashSet;
use tracing::debug;

pub struct SelectionFilter {
  multiple: bool,
  /// Distinct values from the last delivery, "All" last
  raw_values: Vec<String>,
  options: Vec<FilterOption>,
  selection: Selection,
  publisher: Publisher,
}

impl SelectionFilter {
  pub fn new(multiple: bool, publisher: Publisher) -> Self {
    Self {
      multiple,
      raw_values: Vec::new(),
      options: Vec::new(),
      selection: Selection::All,
      publisher,
    }
  }

  pub fn is_multiple(&self) -> bool {
    self.multiple
  }

  pub fn options(&self) -> &[FilterOption] {
    &self.options
  }

  pub fn selection(&self) -> &Selection {
    &self.selection
  }

  pub fn state(&self) -> SelectionState {
    self.selection.state()
  }

  /// Replace the option set with values taken from a provider batch.
  ///
  /// Records are read in reverse order. A record without a usable first field
  /// fails the whole batch and leaves the current state untouched.
  pub fn on_data_received(&mut self, batch: &Batch) -> Result<()> {
    let mut seen = HashSet::new();
    let mut raw_values = Vec::with_capacity(batch.records.len() + 1);

    for (idx, record) in batch.records.iter().enumerate().rev() {
      let value = record
        .first_value()
        .ok_or_else(|| eyre!("Record {} has no usable first field", idx))?;
      if value == ALL || !seen.insert(value.clone()) {
        continue;
      }
      raw_values.push(value);
    }
    raw_values.push(ALL.to_string());

    debug!(
      publisher = %self.publisher.source(),
      values = raw_values.len() - 1,
      "Options replaced"
    );
    self.raw_values = raw_values;
    self.select_all();
    Ok(())
  }

  /// Apply a user choice.
  ///
  /// Options missing from the current option set are dropped. Any "All" in
  /// the choice wins, and an empty choice also reverts to "All".
  /// Single-select filters keep only the last chosen option.
  pub fn on_selection_changed(&mut self, chosen: impl Into<Chosen>) {
    let mut chosen = chosen.into().into_vec();
    chosen.retain(|o| {
      let known = self.raw_values.contains(&o.value);
      if !known {
        debug!(publisher = %self.publisher.source(), value = %o.value, "Ignoring unknown option");
      }
      known
    });
    if !self.multiple && chosen.len() > 1 {
      chosen = chosen.split_off(chosen.len() - 1);
    }

    if chosen.is_empty() || chosen.iter().any(FilterOption::is_all) {
      self.select_all();
      return;
    }

    let mut seen = HashSet::new();
    let subset: Vec<FilterOption> = chosen
      .into_iter()
      .filter(|o| seen.insert(o.value.clone()))
      .map(|o| o.with_disabled(false))
      .collect();

    self.options = self.build_options(false);
    self.selection = Selection::Subset(subset);
    self.publish();
  }

  /// Send the current selection to the dashboard bus
  pub fn publish(&self) {
    self.publisher.publish(SelectionMessage {
      selected_options: self.selection.options(),
    });
  }

  fn select_all(&mut self) {
    self.options = self.build_options(true);
    self.selection = Selection::All;
    self.publish();
  }

  fn build_options(&self, disable_values: bool) -> Vec<FilterOption> {
    self
      .raw_values
      .iter()
      .map(|value| {
        let option = FilterOption::new(value.as_str());
        let disabled = disable_values && !option.is_all();
        option.with_disabled(disabled)
      })
      .collect()
  }
}
