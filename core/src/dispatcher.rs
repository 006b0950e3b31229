use std::{fmt, sync::Arc};

use parking_lot::Mutex;

use crate::models::ListUpdate;

/// Receives row-level mutations of a paged list.
pub trait ListCallback: Send {
  fn on_inserted(&mut self, start: usize, count: usize);
  fn on_removed(&mut self, start: usize, count: usize);
  fn on_changed(&mut self, start: usize, count: usize);
}

/// Opaque handle returned by `add_listener`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

pub(crate) fn deliver(callback: &mut dyn ListCallback, update: ListUpdate) {
  match update {
    ListUpdate::Inserted { start, count } => callback.on_inserted(start, count),
    ListUpdate::Removed { start, count } => callback.on_removed(start, count),
    ListUpdate::Changed { start, count } => callback.on_changed(start, count),
  }
}

/// Registry of listeners owned by one list.
///
/// Listeners are held until unregistered or the list is disposed; the list is the only owner.
#[derive(Default)]
pub(crate) struct CallbackDispatcher {
  next_id: u64,
  listeners: Vec<(ListenerId, Box<dyn ListCallback>)>,
}

impl fmt::Debug for CallbackDispatcher {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("CallbackDispatcher")
      .field("listeners", &self.listeners.len())
      .finish()
  }
}

impl CallbackDispatcher {
  pub fn register(&mut self, callback: Box<dyn ListCallback>) -> ListenerId {
    let id = ListenerId(self.next_id);
    self.next_id += 1;
    self.listeners.push((id, callback));
    id
  }

  pub fn unregister(&mut self, id: ListenerId) -> bool {
    let before = self.listeners.len();
    self.listeners.retain(|(lid, _)| *lid != id);
    self.listeners.len() != before
  }

  pub fn clear(&mut self) {
    self.listeners.clear();
  }

  pub fn len(&self) -> usize {
    self.listeners.len()
  }

  pub fn dispatch(&mut self, update: ListUpdate) {
    if update.count() == 0 {
      return;
    }
    for (_, callback) in self.listeners.iter_mut() {
      deliver(callback.as_mut(), update);
    }
  }
}

/// A callback that records every update it receives.
///
/// Clones share the same log, so one clone can be handed to a list while another is read.
#[derive(Debug, Clone, Default)]
pub struct UpdateLog {
  updates: Arc<Mutex<Vec<ListUpdate>>>,
}

impl UpdateLog {
  pub fn new() -> Self {
    Self::default()
  }

  /// Drain the recorded updates.
  pub fn take(&self) -> Vec<ListUpdate> {
    std::mem::take(&mut *self.updates.lock())
  }

  pub fn updates(&self) -> Vec<ListUpdate> {
    self.updates.lock().clone()
  }

  pub fn len(&self) -> usize {
    self.updates.lock().len()
  }

  pub fn is_empty(&self) -> bool {
    self.updates.lock().is_empty()
  }
}

impl ListCallback for UpdateLog {
  fn on_inserted(&mut self, start: usize, count: usize) {
    self
      .updates
      .lock()
      .push(ListUpdate::Inserted { start, count });
  }

  fn on_removed(&mut self, start: usize, count: usize) {
    self.updates.lock().push(ListUpdate::Removed { start, count });
  }

  fn on_changed(&mut self, start: usize, count: usize) {
    self.updates.lock().push(ListUpdate::Changed { start, count });
  }
}
