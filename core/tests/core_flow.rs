use std::{
  sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
  },
  time::Duration,
};

use paging_core::{
  decode_resume_token, DataSource, InitialPage, ListUpdate, LoadDirection, LoadError,
  ManualExecutor, Page, PagedList, PagedListConfig, PagingError, ResumeToken, Snapshot,
  ThreadPoolExecutor, ThreadPoolOptions, UpdateLog,
};
use parking_lot::Mutex;

/// Items are their own absolute positions: item `n` lives at source position `n`.
struct NumberSource {
  total: usize,
  counted: bool,
  /// Flag the first and last pages with `end_of_data`.
  marks_edges: bool,
  fail: AtomicBool,
  before_calls: Mutex<Vec<usize>>,
  after_calls: Mutex<Vec<usize>>,
}

impl NumberSource {
  fn counted(total: usize) -> Arc<Self> {
    Arc::new(Self::new(total, true))
  }

  fn uncounted(total: usize) -> Arc<Self> {
    Arc::new(Self::new(total, false))
  }

  /// Counted source whose pages never say they are the last one.
  fn counted_open_ended(total: usize) -> Arc<Self> {
    Arc::new(Self {
      marks_edges: false,
      ..Self::new(total, true)
    })
  }

  fn new(total: usize, counted: bool) -> Self {
    Self {
      total,
      counted,
      marks_edges: true,
      fail: AtomicBool::new(false),
      before_calls: Mutex::new(Vec::new()),
      after_calls: Mutex::new(Vec::new()),
    }
  }

  fn before_calls(&self) -> Vec<usize> {
    self.before_calls.lock().clone()
  }

  fn after_calls(&self) -> Vec<usize> {
    self.after_calls.lock().clone()
  }
}

impl DataSource for NumberSource {
  type Key = usize;
  type Item = usize;

  fn load_initial(
    &self,
    key: Option<&usize>,
    size: usize,
    count_enabled: bool,
  ) -> Result<InitialPage<usize>, LoadError> {
    if self.fail.load(Ordering::SeqCst) {
      return Err(LoadError::Failed("boom".into()));
    }
    let start = key.copied().unwrap_or(0).min(self.total);
    let end = (start + size).min(self.total);
    let items: Vec<usize> = (start..end).collect();
    if self.counted && count_enabled {
      Ok(InitialPage::counted(items, start, self.total - end))
    } else {
      Ok(InitialPage::uncounted(items, start))
    }
  }

  fn load_before(
    &self,
    _anchor_position: usize,
    anchor_item: &usize,
    size: usize,
  ) -> Result<Page<usize>, LoadError> {
    self.before_calls.lock().push(*anchor_item);
    if self.fail.load(Ordering::SeqCst) {
      return Err(LoadError::Invalidated);
    }
    let end = *anchor_item;
    let start = end.saturating_sub(size);
    let items: Vec<usize> = (start..end).collect();
    Ok(if start == 0 && self.marks_edges {
      Page::last(items)
    } else {
      Page::new(items)
    })
  }

  fn load_after(
    &self,
    _anchor_position: usize,
    anchor_item: &usize,
    size: usize,
  ) -> Result<Page<usize>, LoadError> {
    self.after_calls.lock().push(*anchor_item);
    if self.fail.load(Ordering::SeqCst) {
      return Err(LoadError::Invalidated);
    }
    let start = anchor_item + 1;
    let end = (start + size).min(self.total);
    let items: Vec<usize> = (start..end).collect();
    Ok(if end >= self.total && self.marks_edges {
      Page::last(items)
    } else {
      Page::new(items)
    })
  }

  fn key_for(&self, _position: usize, item: &usize) -> usize {
    *item
  }
}

fn config(initial_load_size: usize, enable_placeholders: bool) -> PagedListConfig {
  PagedListConfig {
    initial_load_size,
    enable_placeholders,
    ..PagedListConfig::with_page_size(20)
  }
}

fn build(
  source: &Arc<NumberSource>,
  config: PagedListConfig,
  key: Option<usize>,
) -> (PagedList<NumberSource>, ManualExecutor) {
  let exec = ManualExecutor::new();
  let list = PagedList::new(Arc::clone(source), config, Arc::new(exec.clone()), key).unwrap();
  (list, exec)
}

/// Run every queued load and apply every result until nothing moves.
fn settle(list: &mut PagedList<NumberSource>, exec: &ManualExecutor) {
  loop {
    let ran = exec.run_all();
    let applied = list.poll();
    if ran == 0 && applied == 0 {
      break;
    }
  }
}

fn listen(list: &mut PagedList<NumberSource>) -> UpdateLog {
  let log = UpdateLog::new();
  list.add_listener(None, Box::new(log.clone())).unwrap();
  log
}

fn contents(list: &PagedList<NumberSource>) -> Vec<Option<usize>> {
  list.iter().map(|v| v.copied()).collect()
}

/// Apply `updates` to the rows of `snapshot`, refreshing touched rows from `list`.
fn replay(
  snapshot: &Snapshot<usize>,
  updates: &[ListUpdate],
  list: &PagedList<NumberSource>,
) -> Vec<Option<usize>> {
  let mut rows: Vec<Option<Option<usize>>> = snapshot.iter().map(|v| Some(v.copied())).collect();
  for update in updates {
    match *update {
      ListUpdate::Inserted { start, count } => {
        let _ = rows.splice(start..start, std::iter::repeat(None).take(count));
      }
      ListUpdate::Removed { start, count } => {
        rows.drain(start..start + count);
      }
      ListUpdate::Changed { start, count } => {
        for row in &mut rows[start..start + count] {
          *row = None;
        }
      }
    }
  }
  rows
    .into_iter()
    .enumerate()
    .map(|(i, row)| row.unwrap_or_else(|| list.get(i).copied()))
    .collect()
}

#[test]
fn initial_load_fills_first_window() {
  let source = NumberSource::uncounted(100);
  let (list, exec) = build(&source, config(40, false), None);
  assert_eq!(list.len(), 40);
  assert_eq!(list.loaded_count(), 40);
  assert_eq!(list.get(0), Some(&0));
  assert_eq!(list.get(39), Some(&39));
  assert_eq!(list.get(40), None);
  assert_eq!(exec.pending(), 0);
  assert!(!list.is_detached());
}

#[test]
fn append_inside_prefetch_window_inserts_one_page() {
  let source = NumberSource::uncounted(100);
  let (mut list, exec) = build(&source, config(40, false), None);
  let log = listen(&mut list);

  list.load_around(35).unwrap();
  assert!(list.is_loading(LoadDirection::Append));
  assert!(!list.is_loading(LoadDirection::Prepend));
  settle(&mut list, &exec);

  assert_eq!(list.len(), 60);
  assert_eq!(list.get(59), Some(&59));
  assert_eq!(log.take(), vec![ListUpdate::Inserted { start: 40, count: 20 }]);
  assert_eq!(source.after_calls(), vec![39]);
  assert!(source.before_calls().is_empty());
}

#[test]
fn repeated_load_around_is_single_flight() {
  let source = NumberSource::uncounted(100);
  let (mut list, exec) = build(&source, config(40, false), None);

  list.load_around(35).unwrap();
  list.load_around(35).unwrap();
  list.load_around(36).unwrap();
  assert_eq!(exec.pending(), 1);

  settle(&mut list, &exec);
  assert_eq!(source.after_calls().len(), 1);
  assert!(!list.is_loading(LoadDirection::Append));
}

#[test]
fn load_around_zero_with_exhausted_prepend_loads_nothing() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);
  assert!(list.is_exhausted(LoadDirection::Prepend));

  list.load_around(0).unwrap();
  assert_eq!(exec.pending(), 0);
  assert!(source.before_calls().is_empty());
}

#[test]
fn max_size_evicts_page_far_from_access() {
  let source = NumberSource::uncounted(100);
  let mut cfg = config(40, false);
  cfg.max_size = Some(70);
  let (mut list, exec) = build(&source, cfg, None);

  list.load_around(35).unwrap();
  settle(&mut list, &exec);
  assert_eq!(list.loaded_count(), 60);

  let log = listen(&mut list);
  let before = list.snapshot();
  list.load_around(55).unwrap();
  settle(&mut list, &exec);

  let updates = log.take();
  assert_eq!(
    updates,
    vec![
      ListUpdate::Inserted { start: 60, count: 20 },
      ListUpdate::Removed { start: 0, count: 20 },
    ]
  );
  assert_eq!(list.loaded_count(), 60);
  assert_eq!(list.get(0), Some(&20));
  assert_eq!(list.get(59), Some(&79));
  assert_eq!(list.position_offset(), 20);
  assert_eq!(list.last_load(), 35);
  assert!(!list.is_exhausted(LoadDirection::Prepend));
  assert_eq!(replay(&before, &updates, &list), contents(&list));
}

#[test]
fn counted_eviction_turns_rows_back_into_placeholders() {
  let source = NumberSource::counted(100);
  let mut cfg = config(40, true);
  cfg.max_size = Some(70);
  let (mut list, exec) = build(&source, cfg, None);
  let log = listen(&mut list);

  list.load_around(35).unwrap();
  settle(&mut list, &exec);
  list.load_around(55).unwrap();
  settle(&mut list, &exec);

  assert_eq!(
    log.take(),
    vec![
      ListUpdate::Changed { start: 40, count: 20 },
      ListUpdate::Changed { start: 60, count: 20 },
      ListUpdate::Changed { start: 0, count: 20 },
    ]
  );
  assert_eq!(list.len(), 100);
  assert_eq!(list.leading_null_count(), 20);
  assert_eq!(list.get(10), None);
  assert_eq!(list.get(20), Some(&20));

  // The evicted page comes back when the window returns to it.
  list.load_around(25).unwrap();
  settle(&mut list, &exec);
  assert_eq!(list.get(10), Some(&10));
  assert_eq!(source.before_calls(), vec![20]);
}

#[test]
fn prepend_result_is_dropped_once_window_moves_away() {
  let source = NumberSource::counted(200);
  let cfg = PagedListConfig {
    initial_load_size: 40,
    ..PagedListConfig::default()
  };
  let (mut list, exec) = build(&source, cfg, Some(100));
  assert_eq!(list.leading_null_count(), 100);
  let log = listen(&mut list);

  list.load_around(105).unwrap();
  assert!(list.is_loading(LoadDirection::Prepend));
  list.load_around(139).unwrap();
  assert!(list.is_loading(LoadDirection::Append));
  assert_eq!(exec.pending(), 2);

  // Only the prepend finishes first.
  assert!(exec.run_next());
  assert_eq!(list.poll(), 1);
  assert!(log.is_empty());
  assert_eq!(list.leading_null_count(), 100);
  assert_eq!(list.loaded_count(), 40);
  assert!(!list.is_loading(LoadDirection::Prepend));
  assert_eq!(source.before_calls(), vec![100]);

  settle(&mut list, &exec);
  assert_eq!(log.take(), vec![ListUpdate::Changed { start: 140, count: 20 }]);
  assert_eq!(source.before_calls().len(), 1);
}

#[test]
fn late_prepend_merges_when_stale_check_is_off() {
  let source = NumberSource::counted(200);
  let mut cfg = config(40, true);
  cfg.stale_load_distance = None;
  let (mut list, exec) = build(&source, cfg, Some(100));
  let log = listen(&mut list);

  list.load_around(105).unwrap();
  list.load_around(139).unwrap();
  assert!(exec.run_next());
  assert_eq!(list.poll(), 1);

  assert_eq!(log.take(), vec![ListUpdate::Changed { start: 80, count: 20 }]);
  assert_eq!(list.leading_null_count(), 80);
}

#[test]
fn counted_edges_end_loading_without_end_of_data() {
  let source = NumberSource::counted_open_ended(60);
  let (mut list, exec) = build(&source, config(20, true), Some(20));
  assert_eq!(list.leading_null_count(), 20);
  assert_eq!(list.trailing_null_count(), 20);
  let log = listen(&mut list);

  list.load_around(20).unwrap();
  settle(&mut list, &exec);
  assert_eq!(log.take(), vec![ListUpdate::Changed { start: 0, count: 20 }]);
  assert_eq!(list.leading_null_count(), 0);
  assert!(list.is_exhausted(LoadDirection::Prepend));

  list.load_around(0).unwrap();
  assert_eq!(exec.pending(), 0);
  assert_eq!(source.before_calls(), vec![20]);

  list.load_around(39).unwrap();
  settle(&mut list, &exec);
  assert_eq!(list.trailing_null_count(), 0);
  assert!(list.is_exhausted(LoadDirection::Append));

  list.load_around(59).unwrap();
  assert_eq!(exec.pending(), 0);
  assert_eq!(source.after_calls(), vec![39]);
  assert!(list.is_immutable());
}

#[test]
fn append_exhaustion_stops_further_appends() {
  let source = NumberSource::uncounted(60);
  let (mut list, exec) = build(&source, config(40, false), None);

  list.load_around(35).unwrap();
  settle(&mut list, &exec);
  assert_eq!(list.loaded_count(), 60);
  assert!(list.is_exhausted(LoadDirection::Append));

  list.load_around(59).unwrap();
  assert_eq!(exec.pending(), 0);
  assert_eq!(source.after_calls().len(), 1);
}

#[test]
fn counted_prepend_fills_placeholders_without_inserting() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(20, true), Some(50));
  assert_eq!(list.leading_null_count(), 50);
  assert_eq!(list.trailing_null_count(), 30);
  let log = listen(&mut list);

  list.load_around(52).unwrap();
  settle(&mut list, &exec);

  assert_eq!(
    log.take(),
    vec![
      ListUpdate::Changed { start: 30, count: 20 },
      ListUpdate::Changed { start: 70, count: 20 },
    ]
  );
  assert_eq!(list.len(), 100);
  assert_eq!(list.leading_null_count(), 30);
  assert_eq!(list.trailing_null_count(), 10);
  assert_eq!(list.get(30), Some(&30));
  assert_eq!(list.get(89), Some(&89));
}

#[test]
fn uncounted_prepend_inserts_and_shifts_positions() {
  let source = NumberSource::uncounted(100);
  let (mut list, exec) = build(&source, config(20, false), Some(50));
  assert_eq!(list.len(), 20);
  assert_eq!(list.position_offset(), 50);
  let log = listen(&mut list);

  list.load_around(2).unwrap();
  settle(&mut list, &exec);

  assert_eq!(
    log.take(),
    vec![
      ListUpdate::Inserted { start: 0, count: 20 },
      ListUpdate::Inserted { start: 40, count: 20 },
    ]
  );
  assert_eq!(list.get(0), Some(&30));
  assert_eq!(list.position_offset(), 30);
  assert_eq!(list.last_load(), 22);
}

#[test]
fn eviction_discards_load_anchored_on_evicted_page() {
  let source = NumberSource::uncounted(1000);
  let mut cfg = config(60, false);
  cfg.max_size = Some(60);
  let (mut list, exec) = build(&source, cfg, Some(500));
  let log = listen(&mut list);

  list.load_around(2).unwrap();
  assert!(exec.run_next());
  list.load_around(55).unwrap();
  list.load_around(3).unwrap();
  assert_eq!(exec.pending(), 1);

  // Prepend lands: the back page is now far from the access and gets evicted.
  assert_eq!(list.poll(), 1);
  assert!(list.is_loading(LoadDirection::Append));

  // The append was anchored on the evicted page, so its result is dropped.
  assert!(exec.run_next());
  assert_eq!(list.poll(), 1);

  assert_eq!(
    log.take(),
    vec![
      ListUpdate::Inserted { start: 0, count: 20 },
      ListUpdate::Removed { start: 60, count: 20 },
    ]
  );
  assert_eq!(list.loaded_count(), 60);
  assert_eq!(list.get(0), Some(&480));
  assert_eq!(list.get(59), Some(&539));
  assert_eq!(source.after_calls(), vec![559]);
  assert!(!list.is_loading(LoadDirection::Append));
  assert_eq!(exec.pending(), 0);
}

#[test]
fn failed_load_detaches_list() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);
  let log = listen(&mut list);

  list.load_around(35).unwrap();
  source.fail.store(true, Ordering::SeqCst);
  settle(&mut list, &exec);

  assert!(list.is_detached());
  assert!(list.is_immutable());
  assert!(log.is_empty());
  assert_eq!(list.loaded_count(), 40);

  list.load_around(39).unwrap();
  assert_eq!(exec.pending(), 0);
}

#[test]
fn results_arriving_after_detach_are_dropped() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);
  let log = listen(&mut list);

  list.load_around(35).unwrap();
  exec.run_all();
  list.detach();
  assert_eq!(list.poll(), 1);
  assert_eq!(list.loaded_count(), 40);
  assert!(log.is_empty());
}

#[test]
fn loads_queued_before_detach_skip_the_source() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);

  list.load_around(35).unwrap();
  list.detach();
  exec.run_all();
  assert_eq!(list.poll(), 0);
  assert!(source.after_calls().is_empty());
}

#[test]
fn out_of_range_access_is_rejected() {
  let source = NumberSource::uncounted(100);
  let (mut list, _exec) = build(&source, config(40, false), None);
  let err = list.load_around(40).unwrap_err();
  assert!(matches!(
    err,
    PagingError::IndexOutOfBounds { index: 40, size: 40 }
  ));
}

#[test]
fn failed_initial_load_yields_detached_empty_list() {
  let source = NumberSource::counted(100);
  source.fail.store(true, Ordering::SeqCst);
  let (mut list, exec) = build(&source, config(40, true), None);
  assert!(list.is_detached());
  assert!(list.is_empty());
  assert!(list.load_around(0).is_err());
  assert_eq!(exec.pending(), 0);
}

#[test]
fn snapshot_does_not_follow_live_list() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);
  let snap = list.snapshot();

  list.load_around(35).unwrap();
  settle(&mut list, &exec);

  assert_eq!(snap.len(), 100);
  assert_eq!(snap.loaded_count(), 40);
  assert_eq!(snap.get(45), None);
  assert_eq!(list.get(45), Some(&45));
  assert_eq!(snap.list_id(), list.id());
}

#[test]
fn late_listener_catches_up_from_snapshot() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);
  let snap = list.snapshot();

  list.load_around(35).unwrap();
  settle(&mut list, &exec);

  let log = UpdateLog::new();
  list.add_listener(Some(&snap), Box::new(log.clone())).unwrap();
  let updates = log.take();
  assert_eq!(updates, vec![ListUpdate::Changed { start: 40, count: 20 }]);
  assert_eq!(replay(&snap, &updates, &list), contents(&list));

  // And then follows live updates.
  list.load_around(55).unwrap();
  settle(&mut list, &exec);
  assert_eq!(log.take(), vec![ListUpdate::Changed { start: 60, count: 20 }]);
}

#[test]
fn catch_up_after_eviction_reconciles_layout() {
  let source = NumberSource::uncounted(100);
  let mut cfg = config(40, false);
  cfg.max_size = Some(70);
  let (mut list, exec) = build(&source, cfg, None);
  list.load_around(35).unwrap();
  settle(&mut list, &exec);
  let snap = list.snapshot();

  list.load_around(55).unwrap();
  settle(&mut list, &exec);

  let log = UpdateLog::new();
  list.add_listener(Some(&snap), Box::new(log.clone())).unwrap();
  let updates = log.take();
  assert_eq!(
    updates,
    vec![
      ListUpdate::Removed { start: 0, count: 20 },
      ListUpdate::Inserted { start: 40, count: 20 },
    ]
  );
  assert_eq!(replay(&snap, &updates, &list), contents(&list));
}

#[test]
fn snapshot_from_another_list_is_rejected() {
  let source = NumberSource::counted(100);
  let (mut list, _exec) = build(&source, config(40, true), None);
  let (other, _other_exec) = build(&source, config(40, true), None);

  let err = list
    .add_listener(Some(&other.snapshot()), Box::new(UpdateLog::new()))
    .unwrap_err();
  assert!(matches!(err, PagingError::InvalidSnapshot(_)));
  assert_eq!(list.listener_count(), 0);
}

#[test]
fn removed_listener_stops_receiving() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);
  let log = UpdateLog::new();
  let id = list.add_listener(None, Box::new(log.clone())).unwrap();

  assert!(list.remove_listener(id));
  assert!(!list.remove_listener(id));

  list.load_around(35).unwrap();
  settle(&mut list, &exec);
  assert!(log.is_empty());
}

#[test]
fn dispose_detaches_and_drops_listeners() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);
  let _log = listen(&mut list);
  assert_eq!(list.listener_count(), 1);

  list.dispose();
  assert_eq!(list.listener_count(), 0);
  assert!(list.is_detached());
  list.load_around(35).unwrap();
  assert_eq!(exec.pending(), 0);
}

#[test]
fn counted_sweep_keeps_size_and_item_identity() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);

  for index in (0..100).step_by(7).chain((0..100).rev().step_by(11)) {
    list.load_around(index).unwrap();
    settle(&mut list, &exec);
    assert_eq!(list.len(), 100);
    for (i, item) in list.iter().enumerate() {
      if let Some(item) = item {
        assert_eq!(*item, i);
      }
    }
  }
  assert_eq!(list.loaded_count(), 100);
  assert!(list.is_immutable());
}

#[test]
fn last_key_and_resume_token_follow_access() {
  let source = NumberSource::counted(100);
  let (mut list, exec) = build(&source, config(40, true), None);
  list.load_around(35).unwrap();
  settle(&mut list, &exec);

  assert_eq!(list.last_key(), Some(35));
  let token = list.resume_token().unwrap();
  let decoded: ResumeToken<usize> = decode_resume_token(&token).unwrap();
  assert_eq!(
    decoded,
    ResumeToken {
      position: 35,
      key: Some(35),
    }
  );

  let err = decode_resume_token::<usize>("!!not-base64!!").unwrap_err();
  assert!(matches!(err, PagingError::BadResumeToken(_)));
}

#[test]
fn config_validation_and_loading() {
  let defaults = PagedListConfig::default();
  assert!(defaults.validate().is_ok());
  assert_eq!(defaults.stale_load_distance, Some(defaults.prefetch_distance));

  let mut too_small = PagedListConfig::with_page_size(20);
  too_small.max_size = Some(50);
  assert!(matches!(
    too_small.validate(),
    Err(PagingError::InvalidConfig(_))
  ));

  let zero = PagedListConfig::with_page_size(0);
  let source = NumberSource::counted(10);
  let err = PagedList::new(source, zero, Arc::new(ManualExecutor::new()), None).unwrap_err();
  assert!(matches!(err, PagingError::InvalidConfig(_)));

  let parsed = PagedListConfig::from_json_str(r#"{"page_size": 10, "max_size": 100}"#).unwrap();
  assert_eq!(parsed.page_size, 10);
  assert_eq!(parsed.max_size, Some(100));
  assert!(parsed.enable_placeholders);
  let unchecked = PagedListConfig::from_json_str(r#"{"stale_load_distance": null}"#).unwrap();
  assert_eq!(unchecked.stale_load_distance, None);

  let dir = tempfile::tempdir().unwrap();
  let file = dir.path().join("paging.json");
  std::fs::write(
    &file,
    r#"{"page_size": 25, "prefetch_distance": 5, "enable_placeholders": false}"#,
  )
  .unwrap();
  let loaded = PagedListConfig::load(&file).unwrap();
  assert_eq!(loaded.page_size, 25);
  assert_eq!(loaded.prefetch_distance, 5);
  assert!(!loaded.enable_placeholders);

  assert!(matches!(
    PagedListConfig::load(dir.path().join("missing.json")),
    Err(PagingError::Io(_))
  ));
  assert!(matches!(
    PagedListConfig::from_json_str("{not json"),
    Err(PagingError::Json(_))
  ));
}

#[test]
fn thread_pool_loads_reach_the_list() {
  let source = NumberSource::counted(100);
  let pool = Arc::new(ThreadPoolExecutor::new(ThreadPoolOptions::default()).unwrap());
  let mut list = PagedList::new(Arc::clone(&source), config(40, true), pool.clone(), None).unwrap();
  let log = listen(&mut list);

  list.load_around(35).unwrap();
  for _ in 0..50 {
    if list.loaded_count() == 60 {
      break;
    }
    list.wait_for_result(Duration::from_millis(100));
  }

  assert_eq!(list.loaded_count(), 60);
  assert_eq!(log.take(), vec![ListUpdate::Changed { start: 40, count: 20 }]);
  pool.shutdown();
}
