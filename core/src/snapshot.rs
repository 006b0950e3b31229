use uuid::Uuid;

use crate::{
  engine::PagingError,
  models::ListUpdate,
  storage::{PagedStorage, StorageLayout},
};

/// Frozen copy of a `PagedList`'s contents.
///
/// Loaded pages are shared with the live list but never mutated, so later loads, evictions and
/// detaches of the list are not visible here.
#[derive(Debug)]
pub struct Snapshot<V> {
  list_id: Uuid,
  storage: PagedStorage<V>,
  last_load: usize,
}

impl<V> Clone for Snapshot<V> {
  fn clone(&self) -> Self {
    Self {
      list_id: self.list_id,
      storage: self.storage.clone(),
      last_load: self.last_load,
    }
  }
}

impl<V> Snapshot<V> {
  pub(crate) fn new(list_id: Uuid, storage: PagedStorage<V>, last_load: usize) -> Self {
    Self {
      list_id,
      storage,
      last_load,
    }
  }

  pub fn list_id(&self) -> Uuid {
    self.list_id
  }

  pub fn len(&self) -> usize {
    self.storage.len()
  }

  pub fn is_empty(&self) -> bool {
    self.storage.len() == 0
  }

  pub fn get(&self, index: usize) -> Option<&V> {
    self.storage.get(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = Option<&V>> + '_ {
    self.storage.iter()
  }

  pub fn leading_null_count(&self) -> usize {
    self.storage.leading_null_count()
  }

  pub fn trailing_null_count(&self) -> usize {
    self.storage.trailing_null_count()
  }

  pub fn loaded_count(&self) -> usize {
    self.storage.loaded_count()
  }

  pub fn position_offset(&self) -> usize {
    self.storage.position_offset()
  }

  /// Last position accessed on the list when the snapshot was taken.
  pub fn last_load(&self) -> usize {
    self.last_load
  }

  pub(crate) fn layout(&self) -> StorageLayout {
    self.storage.layout()
  }

  /// Check that this snapshot is an earlier state of the list `list_id` currently shaped like
  /// `current`.
  pub(crate) fn validate_against(
    &self,
    list_id: Uuid,
    current: &StorageLayout,
  ) -> Result<(), PagingError> {
    if self.list_id != list_id {
      return Err(PagingError::InvalidSnapshot(format!(
        "snapshot belongs to list {}, not {}",
        self.list_id, list_id
      )));
    }
    let baseline = self.layout();
    if baseline.version > current.version {
      return Err(PagingError::InvalidSnapshot(format!(
        "snapshot version {} is newer than list version {}",
        baseline.version, current.version
      )));
    }
    if baseline.version > 0 && baseline.counted != current.counted {
      return Err(PagingError::InvalidSnapshot(
        "snapshot and list disagree on placeholder counting".into(),
      ));
    }
    Ok(())
  }
}

/// Absolute coordinates of a layout: (list start, list end, data start, data end).
fn span(layout: &StorageLayout) -> (i64, i64, i64, i64) {
  let start = -layout.front_shift;
  let end = start + layout.len() as i64;
  let data_start = start + layout.leading as i64;
  let data_end = data_start + layout.loaded as i64;
  (start, end, data_start, data_end)
}

fn clip(range: (i64, i64), lo: i64, hi: i64) -> (i64, i64) {
  (range.0.max(lo), range.1.min(hi))
}

fn is_empty_range(range: (i64, i64)) -> bool {
  range.0 >= range.1
}

fn symmetric_difference(a: (i64, i64), b: (i64, i64)) -> Vec<(i64, i64)> {
  match (is_empty_range(a), is_empty_range(b)) {
    (true, true) => Vec::new(),
    (true, false) => vec![b],
    (false, true) => vec![a],
    (false, false) => {
      if a.1 <= b.0 || b.1 <= a.0 {
        let mut out = vec![a, b];
        out.sort();
        return out;
      }
      [
        (a.0.min(b.0), a.0.max(b.0)),
        (a.1.min(b.1), a.1.max(b.1)),
      ]
      .into_iter()
      .filter(|r| !is_empty_range(*r))
      .collect()
    }
  }
}

fn push(out: &mut Vec<ListUpdate>, update: ListUpdate) {
  if update.count() > 0 {
    out.push(update);
  }
}

/// Updates that turn a list shaped like `baseline` into one shaped like `current`.
///
/// Structural changes come first (front, then back); `Changed` ranges are reported last, in the
/// coordinates of `current`.
pub(crate) fn updates_since(baseline: &StorageLayout, current: &StorageLayout) -> Vec<ListUpdate> {
  let mut out = Vec::new();
  if baseline.version == current.version {
    return out;
  }

  let (old_start, old_end, old_data_start, old_data_end) = span(baseline);
  let (new_start, new_end, new_data_start, new_data_end) = span(current);
  let lo = old_start.max(new_start);
  let hi = old_end.min(new_end);

  if lo >= hi {
    push(
      &mut out,
      ListUpdate::Removed {
        start: 0,
        count: baseline.len(),
      },
    );
    push(
      &mut out,
      ListUpdate::Inserted {
        start: 0,
        count: current.len(),
      },
    );
    return out;
  }

  if old_start < lo {
    push(
      &mut out,
      ListUpdate::Removed {
        start: 0,
        count: (lo - old_start) as usize,
      },
    );
  }
  if new_start < lo {
    push(
      &mut out,
      ListUpdate::Inserted {
        start: 0,
        count: (lo - new_start) as usize,
      },
    );
  }

  // The listener now sees [new_start, old_end).
  let at = (hi - new_start) as usize;
  if old_end > hi {
    push(
      &mut out,
      ListUpdate::Removed {
        start: at,
        count: (old_end - hi) as usize,
      },
    );
  }
  if new_end > hi {
    push(
      &mut out,
      ListUpdate::Inserted {
        start: at,
        count: (new_end - hi) as usize,
      },
    );
  }

  let old_data = clip((old_data_start, old_data_end), lo, hi);
  let new_data = clip((new_data_start, new_data_end), lo, hi);
  for (s, e) in symmetric_difference(old_data, new_data) {
    push(
      &mut out,
      ListUpdate::Changed {
        start: (s - new_start) as usize,
        count: (e - s) as usize,
      },
    );
  }
  out
}
