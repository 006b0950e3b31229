use crate::models::{InitialPage, LoadError, Page};

/// Keyed source of contiguous pages, supplied by the application.
///
/// All methods run on the background executor. A `PagedList` never has more than one
/// `load_before` and one `load_after` call outstanding at a time.
pub trait DataSource: Send + Sync + 'static {
  type Key: Clone + Send + 'static;
  type Item: Send + Sync + 'static;

  /// Load the first page around `key` (or from the start when `None`). When `count_enabled` is
  /// set the source should report leading/trailing counts if it can.
  fn load_initial(
    &self,
    key: Option<&Self::Key>,
    size: usize,
    count_enabled: bool,
  ) -> Result<InitialPage<Self::Item>, LoadError>;

  /// Load up to `size` items immediately before `anchor_item`, which sits at absolute
  /// `anchor_position`.
  fn load_before(
    &self,
    anchor_position: usize,
    anchor_item: &Self::Item,
    size: usize,
  ) -> Result<Page<Self::Item>, LoadError>;

  fn load_after(
    &self,
    anchor_position: usize,
    anchor_item: &Self::Item,
    size: usize,
  ) -> Result<Page<Self::Item>, LoadError>;

  /// Key that would reload the list around `item`. Must be stable and follow list order.
  fn key_for(&self, position: usize, item: &Self::Item) -> Self::Key;
}

/// Source addressed by absolute position, with a known total count.
pub trait PositionalDataSource: Send + Sync + 'static {
  type Item: Send + Sync + 'static;

  fn count(&self) -> Result<usize, LoadError>;

  /// Load `count` items starting at `start`. Fewer may be returned only at the end of the data.
  fn load_range(&self, start: usize, count: usize) -> Result<Vec<Self::Item>, LoadError>;
}
