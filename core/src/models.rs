use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum LoadDirection {
  Initial,
  Prepend,
  Append,
}

/// A single mutation of the logical list, in the coordinates of the list right before it is
/// applied.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum ListUpdate {
  Inserted { start: usize, count: usize },
  Removed { start: usize, count: usize },
  /// Rows kept their index but their content changed (placeholder <-> data).
  Changed { start: usize, count: usize },
}

impl ListUpdate {
  pub fn count(&self) -> usize {
    match *self {
      ListUpdate::Inserted { count, .. }
      | ListUpdate::Removed { count, .. }
      | ListUpdate::Changed { count, .. } => count,
    }
  }
}

/// Result of `DataSource::load_initial`.
///
/// When both `leading_count` and `trailing_count` are known the list is "counted" and the unloaded
/// rows can be presented as placeholders.
#[derive(Debug, Clone)]
pub struct InitialPage<V> {
  pub items: Vec<V>,
  pub leading_count: Option<usize>,
  pub trailing_count: Option<usize>,
  /// Absolute position of `items[0]` in the source.
  pub position_offset: usize,
}

impl<V> InitialPage<V> {
  pub fn counted(items: Vec<V>, leading_count: usize, trailing_count: usize) -> Self {
    Self {
      items,
      leading_count: Some(leading_count),
      trailing_count: Some(trailing_count),
      position_offset: leading_count,
    }
  }

  pub fn uncounted(items: Vec<V>, position_offset: usize) -> Self {
    Self {
      items,
      leading_count: None,
      trailing_count: None,
      position_offset,
    }
  }

  pub fn is_counted(&self) -> bool {
    self.leading_count.is_some() && self.trailing_count.is_some()
  }
}

/// Result of a directional load (`load_before` / `load_after`).
#[derive(Debug, Clone)]
pub struct Page<V> {
  pub items: Vec<V>,
  /// No further items exist in the direction this page was loaded in.
  pub end_of_data: bool,
}

impl<V> Page<V> {
  pub fn new(items: Vec<V>) -> Self {
    Self {
      items,
      end_of_data: false,
    }
  }

  /// A page that is known to be the last one in its direction.
  pub fn last(items: Vec<V>) -> Self {
    Self {
      items,
      end_of_data: true,
    }
  }

  pub fn empty() -> Self {
    Self::last(Vec::new())
  }

  pub(crate) fn is_terminal(&self) -> bool {
    self.end_of_data || self.items.is_empty()
  }
}

/// Error reported by a data source. Either variant permanently detaches the list that issued the
/// load.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LoadError {
  #[error("data source invalidated")]
  Invalidated,
  #[error("load failed: {0}")]
  Failed(String),
}
