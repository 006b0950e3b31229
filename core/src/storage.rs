use std::{collections::VecDeque, iter, sync::Arc};

/// Shape of a storage at one version, used to line a snapshot up with live storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct StorageLayout {
  /// Net rows inserted (+) or removed (-) at the front since `init`.
  pub front_shift: i64,
  pub leading: usize,
  pub loaded: usize,
  pub trailing: usize,
  pub counted: bool,
  pub version: u64,
}

impl StorageLayout {
  pub fn len(&self) -> usize {
    self.leading + self.loaded + self.trailing
  }
}

/// Where a merged page landed.
///
/// For a prepend, `position` is the first row that changed from placeholder to data and
/// `added` rows were inserted at 0. For an append, `position` is the previous end of loaded data
/// and `added` rows were inserted at `position + changed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct MergeOutcome {
  pub position: usize,
  pub changed: usize,
  pub added: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrimOutcome {
  pub start: usize,
  pub count: usize,
  /// Counted storage keeps the rows as placeholders instead of removing them.
  pub to_placeholders: bool,
}

/// Contiguous loaded pages padded by placeholder counts on both sides.
#[derive(Debug)]
pub(crate) struct PagedStorage<V> {
  pages: VecDeque<Arc<[V]>>,
  leading: usize,
  trailing: usize,
  loaded: usize,
  position_offset: usize,
  counted: bool,
  front_shift: i64,
  version: u64,
}

impl<V> Clone for PagedStorage<V> {
  fn clone(&self) -> Self {
    Self {
      pages: self.pages.clone(),
      leading: self.leading,
      trailing: self.trailing,
      loaded: self.loaded,
      position_offset: self.position_offset,
      counted: self.counted,
      front_shift: self.front_shift,
      version: self.version,
    }
  }
}

impl<V> PagedStorage<V> {
  pub fn new() -> Self {
    Self {
      pages: VecDeque::new(),
      leading: 0,
      trailing: 0,
      loaded: 0,
      position_offset: 0,
      counted: false,
      front_shift: 0,
      version: 0,
    }
  }

  /// Replace everything with the initial load, split into `page_size` chunks.
  pub fn init(
    &mut self,
    leading: usize,
    items: Vec<V>,
    trailing: usize,
    position_offset: usize,
    page_size: usize,
    counted: bool,
  ) {
    self.pages.clear();
    self.loaded = items.len();
    let page_size = page_size.max(1);
    let mut rest = items;
    while !rest.is_empty() {
      let tail = if rest.len() > page_size {
        rest.split_off(page_size)
      } else {
        Vec::new()
      };
      self.pages.push_back(Arc::from(rest));
      rest = tail;
    }
    self.counted = counted;
    self.leading = if counted { leading } else { 0 };
    self.trailing = if counted { trailing } else { 0 };
    self.position_offset = position_offset;
    self.front_shift = 0;
    self.version += 1;
  }

  pub fn len(&self) -> usize {
    self.leading + self.loaded + self.trailing
  }

  pub fn leading_null_count(&self) -> usize {
    self.leading
  }

  pub fn trailing_null_count(&self) -> usize {
    self.trailing
  }

  pub fn loaded_count(&self) -> usize {
    self.loaded
  }

  pub fn position_offset(&self) -> usize {
    self.position_offset
  }

  pub fn is_counted(&self) -> bool {
    self.counted
  }

  pub fn page_count(&self) -> usize {
    self.pages.len()
  }

  pub fn front_page_len(&self) -> usize {
    self.pages.front().map_or(0, |p| p.len())
  }

  pub fn back_page_len(&self) -> usize {
    self.pages.back().map_or(0, |p| p.len())
  }

  pub fn layout(&self) -> StorageLayout {
    StorageLayout {
      front_shift: self.front_shift,
      leading: self.leading,
      loaded: self.loaded,
      trailing: self.trailing,
      counted: self.counted,
      version: self.version,
    }
  }

  /// Item at a logical index; `None` for placeholders and out-of-range indices.
  pub fn get(&self, index: usize) -> Option<&V> {
    let mut local = index.checked_sub(self.leading)?;
    if local >= self.loaded {
      return None;
    }
    for page in &self.pages {
      if local < page.len() {
        return Some(&page[local]);
      }
      local -= page.len();
    }
    None
  }

  pub fn iter(&self) -> impl Iterator<Item = Option<&V>> + '_ {
    iter::repeat(None)
      .take(self.leading)
      .chain(self.pages.iter().flat_map(|p| p.iter().map(Some)))
      .chain(iter::repeat(None).take(self.trailing))
  }

  /// The page holding the first loaded item, and that item's index inside it.
  pub fn first_anchor(&self) -> Option<(Arc<[V]>, usize)> {
    self.pages.front().map(|p| (Arc::clone(p), 0))
  }

  pub fn last_anchor(&self) -> Option<(Arc<[V]>, usize)> {
    self
      .pages
      .back()
      .map(|p| (Arc::clone(p), p.len().saturating_sub(1)))
  }

  pub fn prepend_page(&mut self, items: Vec<V>) -> MergeOutcome {
    let count = items.len();
    let changed = count.min(self.leading);
    let added = count - changed;
    self.leading -= changed;
    self.loaded += count;
    self.position_offset = self.position_offset.saturating_sub(count);
    self.front_shift += added as i64;
    if count > 0 {
      self.pages.push_front(Arc::from(items));
    }
    self.version += 1;
    self.check_invariants();
    MergeOutcome {
      position: self.leading,
      changed,
      added,
    }
  }

  pub fn append_page(&mut self, items: Vec<V>) -> MergeOutcome {
    let count = items.len();
    let position = self.leading + self.loaded;
    let changed = count.min(self.trailing);
    let added = count - changed;
    self.trailing -= changed;
    self.loaded += count;
    if count > 0 {
      self.pages.push_back(Arc::from(items));
    }
    self.version += 1;
    self.check_invariants();
    MergeOutcome {
      position,
      changed,
      added,
    }
  }

  /// Drop the first loaded page. The last remaining page is never dropped.
  pub fn drop_front_page(&mut self) -> Option<TrimOutcome> {
    if self.pages.len() <= 1 {
      return None;
    }
    let page = self.pages.pop_front()?;
    let count = page.len();
    self.loaded -= count;
    self.position_offset += count;
    self.version += 1;
    let outcome = if self.counted {
      let start = self.leading;
      self.leading += count;
      TrimOutcome {
        start,
        count,
        to_placeholders: true,
      }
    } else {
      self.front_shift -= count as i64;
      TrimOutcome {
        start: 0,
        count,
        to_placeholders: false,
      }
    };
    self.check_invariants();
    Some(outcome)
  }

  pub fn drop_back_page(&mut self) -> Option<TrimOutcome> {
    if self.pages.len() <= 1 {
      return None;
    }
    let page = self.pages.pop_back()?;
    let count = page.len();
    self.loaded -= count;
    let start = self.leading + self.loaded;
    if self.counted {
      self.trailing += count;
    }
    self.version += 1;
    self.check_invariants();
    Some(TrimOutcome {
      start,
      count,
      to_placeholders: self.counted,
    })
  }

  fn check_invariants(&self) {
    debug_assert_eq!(
      self.loaded,
      self.pages.iter().map(|p| p.len()).sum::<usize>(),
      "loaded count out of sync with pages"
    );
    debug_assert!(
      self.counted || (self.leading == 0 && self.trailing == 0),
      "uncounted storage holds placeholders"
    );
  }
}
