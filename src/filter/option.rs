use serde::{Deserialize, Serialize};

/// Value of the synthetic option that stands for "no filtering"
pub const ALL: &str = "All";

/// A single selectable entry. `value` and `label` always carry the same text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
  pub value: String,
  pub label: String,
  pub disabled: bool,
}

impl FilterOption {
  pub fn new(value: impl Into<String>) -> Self {
    let value = value.into();
    Self {
      label: value.clone(),
      value,
      disabled: false,
    }
  }

  /// The synthetic "All" option
  pub fn all() -> Self {
    Self::new(ALL)
  }

  pub fn is_all(&self) -> bool {
    self.value == ALL
  }

  pub fn with_disabled(mut self, disabled: bool) -> Self {
    self.disabled = disabled;
    self
  }
}

/// Which of the two selection states the filter is in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
  AllSelected,
  SubsetSelected,
}

/// Current selection: the "All" sentinel or a non-empty set of concrete options
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Selection {
  #[default]
  All,
  Subset(Vec<FilterOption>),
}

impl Selection {
  pub fn state(&self) -> SelectionState {
    match self {
      Selection::All => SelectionState::AllSelected,
      Selection::Subset(_) => SelectionState::SubsetSelected,
    }
  }

  /// The selection as the option list that gets published (`[All]` for All)
  pub fn options(&self) -> Vec<FilterOption> {
    match self {
      Selection::All => vec![FilterOption::all()],
      Selection::Subset(options) => options.clone(),
    }
  }

  pub fn contains(&self, value: &str) -> bool {
    match self {
      Selection::All => value == ALL,
      Selection::Subset(options) => options.iter().any(|o| o.value == value),
    }
  }
}

/// What the user picked in one interaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Chosen {
  One(FilterOption),
  Many(Vec<FilterOption>),
}

impl Chosen {
  pub fn into_vec(self) -> Vec<FilterOption> {
    match self {
      Chosen::One(option) => vec![option],
      Chosen::Many(options) => options,
    }
  }
}

impl From<FilterOption> for Chosen {
  fn from(option: FilterOption) -> Self {
    Chosen::One(option)
  }
}

impl From<Vec<FilterOption>> for Chosen {
  fn from(options: Vec<FilterOption>) -> Self {
    Chosen::Many(options)
  }
}

/// Payload published on the bus for every selection change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionMessage {
  pub selected_options: Vec<FilterOption>,
}
