use std::{
  fmt,
  sync::{
    atomic::{AtomicBool, Ordering},
    mpsc, Arc,
  },
  time::Duration,
};

use uuid::Uuid;

use crate::{
  config::PagedListConfig,
  dispatcher::{deliver, CallbackDispatcher, ListCallback, ListenerId},
  engine::PagingError,
  models::{ListUpdate, LoadError},
  source::PositionalDataSource,
  tasks::Executor,
};

enum TileSlot<V> {
  Missing,
  Loading,
  Loaded(Arc<[V]>),
}

struct TileResult<V> {
  tile: usize,
  result: Result<Vec<V>, LoadError>,
}

/// A fixed-size list over a `PositionalDataSource`, loaded in `page_size` tiles around accessed
/// positions. Every unloaded row is a placeholder.
pub struct TiledPagedList<D: PositionalDataSource> {
  id: Uuid,
  source: Arc<D>,
  config: PagedListConfig,
  executor: Arc<dyn Executor>,
  detached: Arc<AtomicBool>,
  count: usize,
  tiles: Vec<TileSlot<D::Item>>,
  dispatcher: CallbackDispatcher,
  results_tx: mpsc::Sender<TileResult<D::Item>>,
  results_rx: mpsc::Receiver<TileResult<D::Item>>,
  last_load: usize,
  version: u64,
}

impl<D: PositionalDataSource> fmt::Debug for TiledPagedList<D> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("TiledPagedList")
      .field("id", &self.id)
      .field("count", &self.count)
      .field("tiles", &self.tiles.len())
      .field("loaded_tiles", &self.loaded_tile_count())
      .field("detached", &self.is_detached())
      .field("last_load", &self.last_load)
      .finish()
  }
}

impl<D: PositionalDataSource> TiledPagedList<D> {
  /// Build a list and synchronously load the tile holding `position` plus its nearer neighbour.
  pub fn new(
    source: Arc<D>,
    config: PagedListConfig,
    executor: Arc<dyn Executor>,
    position: usize,
  ) -> Result<Self, PagingError> {
    config.validate()?;
    let (results_tx, results_rx) = mpsc::channel();
    let mut list = Self {
      id: Uuid::new_v4(),
      source,
      config,
      executor,
      detached: Arc::new(AtomicBool::new(false)),
      count: 0,
      tiles: Vec::new(),
      dispatcher: CallbackDispatcher::default(),
      results_tx,
      results_rx,
      last_load: 0,
      version: 0,
    };

    let count = match list.source.count() {
      Ok(count) => count,
      Err(e) => {
        tracing::warn!(list = %list.id, error = %e, "count failed; detaching");
        list.detach();
        return Ok(list);
      }
    };
    let page_size = list.config.page_size;
    list.count = count;
    list.tiles = (0..count.div_ceil(page_size))
      .map(|_| TileSlot::Missing)
      .collect();
    if count == 0 {
      return Ok(list);
    }

    let position = position.min(count - 1);
    list.last_load = position;
    let first = position / page_size;
    if !list.load_tile_now(first) {
      return Ok(list);
    }
    let second = if position % page_size < page_size / 2 {
      first.checked_sub(1)
    } else {
      Some(first + 1)
    };
    if let Some(second) = second.filter(|t| *t < list.tiles.len()) {
      list.load_tile_now(second);
    }
    Ok(list)
  }

  fn tile_range(&self, tile: usize) -> (usize, usize) {
    let start = tile * self.config.page_size;
    let len = self.config.page_size.min(self.count - start);
    (start, len)
  }

  fn load_tile_now(&mut self, tile: usize) -> bool {
    let (start, len) = self.tile_range(tile);
    match self.source.load_range(start, len) {
      Ok(items) => {
        self.tiles[tile] = TileSlot::Loaded(Arc::from(items));
        self.version += 1;
        true
      }
      Err(e) => {
        tracing::warn!(list = %self.id, tile, error = %e, "initial tile load failed; detaching");
        self.detach();
        false
      }
    }
  }

  pub fn id(&self) -> Uuid {
    self.id
  }

  pub fn config(&self) -> &PagedListConfig {
    &self.config
  }

  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  pub fn get(&self, index: usize) -> Option<&D::Item> {
    match self.tiles.get(index / self.config.page_size)? {
      TileSlot::Loaded(items) => items.get(index % self.config.page_size),
      _ => None,
    }
  }

  pub fn iter(&self) -> impl Iterator<Item = Option<&D::Item>> + '_ {
    (0..self.count).map(move |i| self.get(i))
  }

  pub fn last_load(&self) -> usize {
    self.last_load
  }

  pub fn tile_count(&self) -> usize {
    self.tiles.len()
  }

  pub fn loaded_tile_count(&self) -> usize {
    self
      .tiles
      .iter()
      .filter(|t| matches!(t, TileSlot::Loaded(_)))
      .count()
  }

  pub fn is_tile_loaded(&self, tile: usize) -> bool {
    matches!(self.tiles.get(tile), Some(TileSlot::Loaded(_)))
  }

  pub fn is_detached(&self) -> bool {
    self.detached.load(Ordering::SeqCst)
  }

  /// Detached, or every tile is loaded.
  pub fn is_immutable(&self) -> bool {
    self.is_detached() || self.loaded_tile_count() == self.tiles.len()
  }

  pub fn load_around(&mut self, index: usize) -> Result<(), PagingError> {
    if index >= self.count {
      return Err(PagingError::IndexOutOfBounds {
        index,
        size: self.count,
      });
    }
    self.last_load = index;
    if self.is_detached() {
      return Ok(());
    }

    let page_size = self.config.page_size;
    let prefetch = self.config.prefetch_distance;
    let first = index.saturating_sub(prefetch) / page_size;
    let last = (index.saturating_add(prefetch) / page_size).min(self.tiles.len() - 1);
    for tile in first..=last {
      self.schedule_tile(tile);
    }
    Ok(())
  }

  fn schedule_tile(&mut self, tile: usize) {
    if !matches!(self.tiles[tile], TileSlot::Missing) {
      return;
    }
    self.tiles[tile] = TileSlot::Loading;
    let (start, len) = self.tile_range(tile);
    tracing::debug!(list = %self.id, tile, start, len, "scheduling tile load");

    let source = Arc::clone(&self.source);
    let tx = self.results_tx.clone();
    let detached = Arc::clone(&self.detached);
    self.executor.execute(Box::new(move || {
      if detached.load(Ordering::SeqCst) {
        return;
      }
      let result = source.load_range(start, len);
      let _ = tx.send(TileResult { tile, result });
    }));
  }

  pub fn poll(&mut self) -> usize {
    let mut applied = 0;
    while let Ok(result) = self.results_rx.try_recv() {
      self.on_tile_result(result);
      applied += 1;
    }
    applied
  }

  pub fn wait_for_result(&mut self, timeout: Duration) -> bool {
    match self.results_rx.recv_timeout(timeout) {
      Ok(result) => {
        self.on_tile_result(result);
        self.poll();
        true
      }
      Err(_) => false,
    }
  }

  fn on_tile_result(&mut self, msg: TileResult<D::Item>) {
    let TileResult { tile, result } = msg;
    let items = match result {
      Ok(items) => items,
      Err(e) => {
        tracing::warn!(list = %self.id, tile, error = %e, "tile load failed; detaching");
        self.detach();
        return;
      }
    };
    if self.is_detached() {
      return;
    }
    assert!(
      matches!(self.tiles[tile], TileSlot::Loading),
      "tile {} loaded without being requested",
      tile
    );
    let start = tile * self.config.page_size;
    let count = items.len();
    self.tiles[tile] = TileSlot::Loaded(Arc::from(items));
    self.version += 1;
    tracing::debug!(list = %self.id, tile, count, "tile merged");
    self.dispatcher.dispatch(ListUpdate::Changed { start, count });
  }

  pub fn snapshot(&self) -> TiledSnapshot<D::Item> {
    TiledSnapshot {
      list_id: self.id,
      count: self.count,
      page_size: self.config.page_size,
      version: self.version,
      tiles: self
        .tiles
        .iter()
        .map(|t| match t {
          TileSlot::Loaded(items) => Some(Arc::clone(items)),
          _ => None,
        })
        .collect(),
    }
  }

  /// Register `callback`, first reporting tiles that loaded since `previous` was taken.
  pub fn add_listener(
    &mut self,
    previous: Option<&TiledSnapshot<D::Item>>,
    mut callback: Box<dyn ListCallback>,
  ) -> Result<ListenerId, PagingError> {
    if let Some(snapshot) = previous {
      if snapshot.list_id != self.id {
        return Err(PagingError::InvalidSnapshot(format!(
          "snapshot belongs to list {}, not {}",
          snapshot.list_id, self.id
        )));
      }
      if snapshot.version > self.version || snapshot.count != self.count {
        return Err(PagingError::InvalidSnapshot(
          "snapshot is not an earlier state of this list".into(),
        ));
      }
      for update in self.updates_since(snapshot) {
        deliver(callback.as_mut(), update);
      }
    }
    Ok(self.dispatcher.register(callback))
  }

  fn updates_since(&self, snapshot: &TiledSnapshot<D::Item>) -> Vec<ListUpdate> {
    let page_size = self.config.page_size;
    let mut out = Vec::new();
    let mut tile = 0;
    while tile < self.tiles.len() {
      let mut run = 0;
      while tile + run < self.tiles.len()
        && self.is_tile_loaded(tile + run)
        && !snapshot.is_tile_loaded(tile + run)
      {
        run += 1;
      }
      if run > 0 {
        let start = tile * page_size;
        let end = ((tile + run) * page_size).min(self.count);
        out.push(ListUpdate::Changed {
          start,
          count: end - start,
        });
        tile += run;
      } else {
        tile += 1;
      }
    }
    out
  }

  pub fn remove_listener(&mut self, id: ListenerId) -> bool {
    self.dispatcher.unregister(id)
  }

  pub fn listener_count(&self) -> usize {
    self.dispatcher.len()
  }

  pub fn detach(&mut self) {
    if !self.detached.swap(true, Ordering::SeqCst) {
      tracing::debug!(list = %self.id, "detached");
    }
  }

  pub fn dispose(&mut self) {
    self.detach();
    self.dispatcher.clear();
  }
}

/// Frozen copy of a `TiledPagedList`.
#[derive(Debug)]
pub struct TiledSnapshot<V> {
  list_id: Uuid,
  count: usize,
  page_size: usize,
  version: u64,
  tiles: Vec<Option<Arc<[V]>>>,
}

impl<V> Clone for TiledSnapshot<V> {
  fn clone(&self) -> Self {
    Self {
      list_id: self.list_id,
      count: self.count,
      page_size: self.page_size,
      version: self.version,
      tiles: self.tiles.clone(),
    }
  }
}

impl<V> TiledSnapshot<V> {
  pub fn list_id(&self) -> Uuid {
    self.list_id
  }

  pub fn len(&self) -> usize {
    self.count
  }

  pub fn is_empty(&self) -> bool {
    self.count == 0
  }

  pub fn get(&self, index: usize) -> Option<&V> {
    self
      .tiles
      .get(index / self.page_size)?
      .as_ref()?
      .get(index % self.page_size)
  }

  pub fn is_tile_loaded(&self, tile: usize) -> bool {
    matches!(self.tiles.get(tile), Some(Some(_)))
  }
}
