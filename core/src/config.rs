use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::engine::PagingError;

/// Loading behavior shared by `PagedList` and `TiledPagedList`.
///
/// Construct one per list (or clone a shared one); nothing in the crate keeps a global default.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PagedListConfig {
  /// Items requested per directional load.
  pub page_size: usize,
  pub initial_load_size: usize,
  /// How many items past the last accessed position should stay loaded in each direction.
  pub prefetch_distance: usize,
  /// Upper bound on loaded items; pages far from the last access are dropped beyond it.
  pub max_size: Option<usize>,
  pub enable_placeholders: bool,
  /// Directional results whose edge lies further than this from the last accessed position are
  /// discarded on arrival. Defaults to `prefetch_distance`, past which the window no longer asks
  /// for that direction; `None` merges every result.
  pub stale_load_distance: Option<usize>,
}

impl Default for PagedListConfig {
  fn default() -> Self {
    Self::with_page_size(20)
  }
}

impl PagedListConfig {
  pub fn with_page_size(page_size: usize) -> Self {
    Self {
      page_size,
      initial_load_size: page_size.saturating_mul(3),
      prefetch_distance: page_size,
      max_size: None,
      enable_placeholders: true,
      stale_load_distance: Some(page_size),
    }
  }

  pub fn validate(&self) -> Result<(), PagingError> {
    if self.page_size == 0 {
      return Err(PagingError::InvalidConfig("page_size must be > 0".into()));
    }
    if self.initial_load_size == 0 {
      return Err(PagingError::InvalidConfig(
        "initial_load_size must be > 0".into(),
      ));
    }
    if let Some(max_size) = self.max_size {
      let min = self
        .page_size
        .saturating_add(self.prefetch_distance.saturating_mul(2));
      if max_size < min {
        return Err(PagingError::InvalidConfig(format!(
          "max_size {} must be at least page_size + 2 * prefetch_distance ({})",
          max_size, min
        )));
      }
    }
    Ok(())
  }

  /// Parse a JSON config; missing fields take their defaults.
  pub fn from_json_str(json: &str) -> Result<Self, PagingError> {
    let config: Self = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
  }

  pub fn load(path: impl AsRef<Path>) -> Result<Self, PagingError> {
    let text = std::fs::read_to_string(path.as_ref())?;
    Self::from_json_str(&text)
  }
}
