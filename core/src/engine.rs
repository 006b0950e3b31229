use std::{
  fmt,
  sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
  },
  time::Duration,
};

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::{
  config::PagedListConfig,
  cursor::{encode_resume_token, ResumeToken},
  dispatcher::{deliver, CallbackDispatcher, ListCallback, ListenerId},
  models::{InitialPage, ListUpdate, LoadDirection, LoadError, Page},
  snapshot::{updates_since, Snapshot},
  source::DataSource,
  storage::PagedStorage,
  tasks::Executor,
};

#[derive(Debug, Error)]
pub enum PagingError {
  #[error("index {index} out of bounds for list of size {size}")]
  IndexOutOfBounds { index: usize, size: usize },
  #[error("invalid config: {0}")]
  InvalidConfig(String),
  #[error("invalid snapshot: {0}")]
  InvalidSnapshot(String),
  #[error("bad resume token: {0}")]
  BadResumeToken(String),
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),
  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),
}

#[derive(Debug, Default, Clone, Copy)]
struct DirectionState {
  worker_running: bool,
  /// Items still wanted in this direction; may outlive the load that is in flight.
  items_requested: usize,
  exhausted: bool,
  /// Bumped whenever the edge a load would extend is evicted.
  epoch: u64,
}

/// Message posted by a background load back to the owning list.
struct PageResult<V> {
  direction: LoadDirection,
  epoch: u64,
  result: Result<Page<V>, LoadError>,
}

/// A list backed by a keyed `DataSource`, loaded contiguously outward from an initial page.
///
/// All methods are meant to be called from one (main) context. Loads run on the executor and only
/// touch the list once the host calls `poll` or `wait_for_result`.
pub struct PagedList<D: DataSource> {
  id: Uuid,
  source: Arc<D>,
  config: PagedListConfig,
  executor: Arc<dyn Executor>,
  storage: PagedStorage<D::Item>,
  dispatcher: CallbackDispatcher,
  detached: Arc<AtomicBool>,
  results_tx: mpsc::Sender<PageResult<D::Item>>,
  results_rx: mpsc::Receiver<PageResult<D::Item>>,
  prepend: DirectionState,
  append: DirectionState,
  last_load: usize,
}

impl<D: DataSource> fmt::Debug for PagedList<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("PagedList")
      .field("id", &self.id)
      .field("len", &self.storage.len())
      .field("loaded", &self.storage.loaded_count())
      .field("detached", &self.is_detached())
      .field("prepend", &self.prepend)
      .field("append", &self.append)
      .field("last_load", &self.last_load)
      .finish()
  }
}

impl<D: DataSource> PagedList<D> {
  /// Build a list and run its initial load on the calling context.
  ///
  /// A failing initial load does not fail construction: the list comes back empty and detached.
  pub fn new(
    source: Arc<D>,
    config: PagedListConfig,
    executor: Arc<dyn Executor>,
    initial_key: Option<D::Key>,
  ) -> Result<Self, PagingError> {
    config.validate()?;
    let (results_tx, results_rx) = mpsc::channel();
    let mut list = Self {
      id: Uuid::new_v4(),
      source,
      config,
      executor,
      storage: PagedStorage::new(),
      dispatcher: CallbackDispatcher::default(),
      detached: Arc::new(AtomicBool::new(false)),
      results_tx,
      results_rx,
      prepend: DirectionState::default(),
      append: DirectionState::default(),
      last_load: 0,
    };

    let loaded = list.source.load_initial(
      initial_key.as_ref(),
      list.config.initial_load_size,
      list.config.enable_placeholders,
    );
    match loaded {
      Ok(page) => list.apply_initial(page),
      Err(e) => {
        tracing::warn!(list = %list.id, error = %e, "initial load failed; detaching");
        list.detach();
      }
    }
    Ok(list)
  }

  fn apply_initial(&mut self, page: InitialPage<D::Item>) {
    let counted = self.config.enable_placeholders && page.is_counted();
    let empty = page.items.is_empty();
    self.prepend.exhausted = empty || page.leading_count == Some(0);
    self.append.exhausted = empty || page.trailing_count == Some(0);
    self.storage.init(
      page.leading_count.unwrap_or(0),
      page.items,
      page.trailing_count.unwrap_or(0),
      page.position_offset,
      self.config.page_size,
      counted,
    );
    self.last_load = self.storage.leading_null_count() + self.storage.loaded_count() / 2;
    tracing::debug!(
      list = %self.id,
      counted,
      leading = self.storage.leading_null_count(),
      loaded = self.storage.loaded_count(),
      trailing = self.storage.trailing_null_count(),
      "initial page loaded"
    );
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn config(&self) -> &PagedListConfig {
    &self.config
  }

  /// Size of the logical list, placeholders included.
  pub fn len(&self) -> usize {
    self.storage.len()
  }

  pub fn is_empty(&self) -> bool {
    self.storage.len() == 0
  }

  /// Item at `index`, or `None` for a placeholder or an out-of-range index.
  pub fn get(&self, index: usize) -> Option<&D::Item> {
    self.storage.get(index)
  }

  pub fn iter(&self) -> impl Iterator<Item = Option<&D::Item>> + '_ {
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

  /// Absolute source position of the first loaded item.
  pub fn position_offset(&self) -> usize {
    self.storage.position_offset()
  }

  pub fn last_load(&self) -> usize {
    self.last_load
  }

  pub fn is_detached(&self) -> bool {
    self.detached.load(Ordering::SeqCst)
  }

  /// True when the list will never change again.
  pub fn is_immutable(&self) -> bool {
    self.is_detached() || (self.prepend.exhausted && self.append.exhausted)
  }

  pub fn is_loading(&self, direction: LoadDirection) -> bool {
    match direction {
      LoadDirection::Initial => false,
      LoadDirection::Prepend => self.prepend.worker_running,
      LoadDirection::Append => self.append.worker_running,
    }
  }

  pub fn is_exhausted(&self, direction: LoadDirection) -> bool {
    match direction {
      LoadDirection::Initial => self.prepend.exhausted && self.append.exhausted,
      LoadDirection::Prepend => self.prepend.exhausted,
      LoadDirection::Append => self.append.exhausted,
    }
  }

  /// Key that would reload a list around the last accessed position.
  pub fn last_key(&self) -> Option<D::Key> {
    let loaded = self.storage.loaded_count();
    if loaded == 0 {
      return None;
    }
    let leading = self.storage.leading_null_count();
    let index = self.last_load.clamp(leading, leading + loaded - 1);
    let item = self.storage.get(index)?;
    let position = self.storage.position_offset() + (index - leading);
    Some(self.source.key_for(position, item))
  }

  /// Record an access at `index` and start whatever loads the prefetch window now needs.
  pub fn load_around(&mut self, index: usize) -> Result<(), PagingError> {
    let size = self.len();
    if index >= size {
      return Err(PagingError::IndexOutOfBounds { index, size });
    }
    self.last_load = index;
    if self.is_detached() {
      return Ok(());
    }

    let prefetch = self.config.prefetch_distance as i64;
    let leading = self.storage.leading_null_count() as i64;
    let loaded_end = leading + self.storage.loaded_count() as i64;
    let index = index as i64;

    let prepend_items = prefetch - (index - leading);
    let append_items = index + prefetch - loaded_end;

    if prepend_items > 0 {
      self.prepend.items_requested = self.prepend.items_requested.max(prepend_items as usize);
    }
    if self.prepend.items_requested > 0 {
      self.schedule(LoadDirection::Prepend);
    }

    if append_items > 0 {
      self.append.items_requested = self.append.items_requested.max(append_items as usize);
    }
    if self.append.items_requested > 0 {
      self.schedule(LoadDirection::Append);
    }
    Ok(())
  }

  fn direction_mut(&mut self, direction: LoadDirection) -> &mut DirectionState {
    match direction {
      LoadDirection::Prepend => &mut self.prepend,
      LoadDirection::Append => &mut self.append,
      LoadDirection::Initial => unreachable!("the initial load has no direction state"),
    }
  }

  fn schedule(&mut self, direction: LoadDirection) {
    if self.is_detached() {
      return;
    }
    let (anchor, position) = match direction {
      LoadDirection::Initial => return,
      LoadDirection::Prepend => (self.storage.first_anchor(), self.storage.position_offset()),
      LoadDirection::Append => (
        self.storage.last_anchor(),
        (self.storage.position_offset() + self.storage.loaded_count()).saturating_sub(1),
      ),
    };
    let Some((page, index)) = anchor else {
      return;
    };
    let size = self.config.page_size;
    let id = self.id;

    let state = self.direction_mut(direction);
    if state.worker_running || state.exhausted {
      return;
    }
    state.worker_running = true;
    let epoch = state.epoch;
    let requested = state.items_requested;

    tracing::debug!(list = %id, ?direction, position, size, requested, "scheduling load");
    let source = Arc::clone(&self.source);
    let tx = self.results_tx.clone();
    let detached = Arc::clone(&self.detached);
    self.executor.execute(Box::new(move || {
      if detached.load(Ordering::SeqCst) {
        return;
      }
      let anchor_item = &page[index];
      let result = match direction {
        LoadDirection::Prepend => source.load_before(position, anchor_item, size),
        _ => source.load_after(position, anchor_item, size),
      };
      // The list may already be gone; nobody is left to tell.
      let _ = tx.send(PageResult {
        direction,
        epoch,
        result,
      });
    }));
  }

  /// Apply every load result that has arrived so far. Returns how many were processed.
  pub fn poll(&mut self) -> usize {
    let mut applied = 0;
    while let Ok(result) = self.results_rx.try_recv() {
      self.on_page_result(result);
      applied += 1;
    }
    applied
  }

  /// Block until one load result arrives (or `timeout` passes), then apply it and anything else
  /// already queued.
  pub fn wait_for_result(&mut self, timeout: Duration) -> bool {
    match self.results_rx.recv_timeout(timeout) {
      Ok(result) => {
        self.on_page_result(result);
        self.poll();
        true
      }
      Err(_) => false,
    }
  }

  fn on_page_result(&mut self, msg: PageResult<D::Item>) {
    let PageResult {
      direction,
      epoch,
      result,
    } = msg;
    let id = self.id;

    let page = match result {
      Ok(page) => page,
      Err(e) => {
        tracing::warn!(list = %id, ?direction, error = %e, "load failed; detaching");
        self.detach();
        return;
      }
    };
    if self.is_detached() {
      tracing::debug!(list = %id, ?direction, "list detached; dropping load result");
      return;
    }

    let last_load = self.last_load;
    let leading = self.storage.leading_null_count();
    let loaded_end = leading + self.storage.loaded_count();
    let stale_limit = self.config.stale_load_distance;

    let state = self.direction_mut(direction);
    state.worker_running = false;

    if epoch != state.epoch {
      let pending = state.items_requested > 0;
      tracing::debug!(list = %id, ?direction, "anchor page evicted; dropping load result");
      if pending {
        self.schedule(direction);
      }
      return;
    }

    if let Some(limit) = stale_limit {
      let distance = match direction {
        LoadDirection::Prepend => last_load.saturating_sub(leading),
        _ => loaded_end.saturating_sub(1).saturating_sub(last_load),
      };
      if distance > limit {
        state.items_requested = 0;
        tracing::debug!(list = %id, ?direction, distance, limit, "window moved away; dropping load result");
        return;
      }
    }

    if page.items.is_empty() {
      state.exhausted = true;
      state.items_requested = 0;
      tracing::debug!(list = %id, ?direction, "direction exhausted");
      return;
    }

    let terminal = page.is_terminal();
    let outcome = match direction {
      LoadDirection::Prepend => self.storage.prepend_page(page.items),
      _ => self.storage.append_page(page.items),
    };
    // A counted list knows where its data ends, whatever the page said.
    let reached_edge = self.storage.is_counted()
      && match direction {
        LoadDirection::Prepend => self.storage.leading_null_count() == 0,
        _ => self.storage.trailing_null_count() == 0,
      };
    let terminal = terminal || reached_edge;

    let state = self.direction_mut(direction);
    state.items_requested = state
      .items_requested
      .saturating_sub(outcome.changed + outcome.added);
    if terminal {
      state.exhausted = true;
      state.items_requested = 0;
    }
    let more = state.items_requested > 0;
    if direction == LoadDirection::Prepend {
      self.last_load += outcome.added;
    }
    tracing::debug!(
      list = %id,
      ?direction,
      changed = outcome.changed,
      added = outcome.added,
      terminal,
      "page merged"
    );

    if more {
      self.schedule(direction);
    }

    // Callbacks go out after the follow-up load is already scheduled.
    match direction {
      LoadDirection::Prepend => {
        self.dispatcher.dispatch(ListUpdate::Changed {
          start: outcome.position,
          count: outcome.changed,
        });
        self.dispatcher.dispatch(ListUpdate::Inserted {
          start: 0,
          count: outcome.added,
        });
      }
      _ => {
        self.dispatcher.dispatch(ListUpdate::Changed {
          start: outcome.position,
          count: outcome.changed,
        });
        self.dispatcher.dispatch(ListUpdate::Inserted {
          start: outcome.position + outcome.changed,
          count: outcome.added,
        });
      }
    }

    self.trim();
  }

  /// Drop pages far from the last access until the loaded count fits `max_size`.
  fn trim(&mut self) {
    let Some(max_size) = self.config.max_size else {
      return;
    };
    let prefetch = self.config.prefetch_distance;
    let id = self.id;

    while self.storage.loaded_count() > max_size && self.storage.page_count() > 1 {
      let leading = self.storage.leading_null_count();
      let loaded_end = leading + self.storage.loaded_count();
      let front_distance = self.last_load.saturating_sub(leading);
      let back_distance = loaded_end.saturating_sub(1).saturating_sub(self.last_load);
      let drop_front = front_distance >= back_distance;

      let trimmed = if drop_front {
        let page_end = leading + self.storage.front_page_len();
        if page_end + prefetch > self.last_load {
          break;
        }
        self.storage.drop_front_page()
      } else {
        let page_start = loaded_end - self.storage.back_page_len();
        if page_start <= self.last_load + prefetch {
          break;
        }
        self.storage.drop_back_page()
      };
      let Some(trimmed) = trimmed else {
        break;
      };

      let direction = if drop_front {
        LoadDirection::Prepend
      } else {
        LoadDirection::Append
      };
      let state = self.direction_mut(direction);
      state.exhausted = false;
      state.items_requested = 0;
      state.epoch += 1;
      if drop_front && !trimmed.to_placeholders {
        self.last_load = self.last_load.saturating_sub(trimmed.count);
      }

      tracing::debug!(
        list = %id,
        ?direction,
        start = trimmed.start,
        count = trimmed.count,
        placeholders = trimmed.to_placeholders,
        "page evicted"
      );
      let update = if trimmed.to_placeholders {
        ListUpdate::Changed {
          start: trimmed.start,
          count: trimmed.count,
        }
      } else {
        ListUpdate::Removed {
          start: trimmed.start,
          count: trimmed.count,
        }
      };
      self.dispatcher.dispatch(update);
    }
  }

  /// Freeze the current contents.
  pub fn snapshot(&self) -> Snapshot<D::Item> {
    Snapshot::new(self.id, self.storage.clone(), self.last_load)
  }

  /// Register `callback`. When `previous` is given, the callback first receives the updates that
  /// happened since that snapshot was taken.
  pub fn add_listener(
    &mut self,
    previous: Option<&Snapshot<D::Item>>,
    mut callback: Box<dyn ListCallback>,
  ) -> Result<ListenerId, PagingError> {
    if let Some(snapshot) = previous {
      let current = self.storage.layout();
      snapshot.validate_against(self.id, &current)?;
      for update in updates_since(&snapshot.layout(), &current) {
        deliver(callback.as_mut(), update);
      }
    }
    Ok(self.dispatcher.register(callback))
  }

  pub fn remove_listener(&mut self, id: ListenerId) -> bool {
    self.dispatcher.unregister(id)
  }

  pub fn listener_count(&self) -> usize {
    self.dispatcher.len()
  }

  /// Stop loading for good. Loaded data stays readable; results still in flight are dropped.
  pub fn detach(&mut self) {
    if !self.detached.swap(true, Ordering::SeqCst) {
      tracing::debug!(list = %self.id, "detached");
    }
  }

  /// Detach and release every listener.
  pub fn dispose(&mut self) {
    self.detach();
    self.dispatcher.clear();
  }
}

impl<D> PagedList<D>
where
  D: DataSource,
  D::Key: Serialize,
{
  /// Opaque token recording the last accessed position and its key.
  pub fn resume_token(&self) -> Result<String, PagingError> {
    encode_resume_token(&ResumeToken {
      position: self.last_load,
      key: self.last_key(),
    })
  }
}
