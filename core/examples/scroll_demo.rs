use std::{sync::Arc, time::Duration};

use paging_core::{
  DataSource, InitialPage, LoadError, Page, PagedList, PagedListConfig, ThreadPoolExecutor,
  ThreadPoolOptions, UpdateLog,
};

/// Rows of a fake feed, keyed by their index.
struct Feed {
  rows: Vec<String>,
}

impl DataSource for Feed {
  type Key = usize;
  type Item = String;

  fn load_initial(
    &self,
    key: Option<&usize>,
    size: usize,
    count_enabled: bool,
  ) -> Result<InitialPage<String>, LoadError> {
    let start = key.copied().unwrap_or(0).min(self.rows.len());
    let end = (start + size).min(self.rows.len());
    let items = self.rows[start..end].to_vec();
    Ok(if count_enabled {
      InitialPage::counted(items, start, self.rows.len() - end)
    } else {
      InitialPage::uncounted(items, start)
    })
  }

  fn load_before(
    &self,
    anchor_position: usize,
    _anchor_item: &String,
    size: usize,
  ) -> Result<Page<String>, LoadError> {
    std::thread::sleep(Duration::from_millis(20));
    let start = anchor_position.saturating_sub(size);
    let items = self.rows[start..anchor_position].to_vec();
    Ok(if start == 0 {
      Page::last(items)
    } else {
      Page::new(items)
    })
  }

  fn load_after(
    &self,
    anchor_position: usize,
    _anchor_item: &String,
    size: usize,
  ) -> Result<Page<String>, LoadError> {
    std::thread::sleep(Duration::from_millis(20));
    let start = (anchor_position + 1).min(self.rows.len());
    let end = (start + size).min(self.rows.len());
    let items = self.rows[start..end].to_vec();
    Ok(if end == self.rows.len() {
      Page::last(items)
    } else {
      Page::new(items)
    })
  }

  fn key_for(&self, position: usize, _item: &String) -> usize {
    position
  }
}

fn main() -> Result<(), String> {
  tracing_subscriber::fmt()
    .with_env_filter(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("paging_core=debug")),
    )
    .init();

  let config = match std::env::args().nth(1) {
    Some(path) => PagedListConfig::load(path).map_err(|e| e.to_string())?,
    None => PagedListConfig {
      max_size: Some(120),
      ..PagedListConfig::with_page_size(20)
    },
  };

  let feed = Arc::new(Feed {
    rows: (0..500).map(|i| format!("row {i}")).collect(),
  });
  let pool = Arc::new(ThreadPoolExecutor::new(ThreadPoolOptions::default()).map_err(|e| e.to_string())?);
  let mut list = PagedList::new(feed, config, pool.clone(), Some(200)).map_err(|e| e.to_string())?;

  let log = UpdateLog::new();
  list
    .add_listener(None, Box::new(log.clone()))
    .map_err(|e| e.to_string())?;
  println!(
    "size={} loaded={} leading={}",
    list.len(),
    list.loaded_count(),
    list.leading_null_count()
  );

  // Scroll down a row at a time, then jump back up.
  let stops = (list.leading_null_count()..list.leading_null_count() + 150).chain([150, 120, 100]);
  for index in stops {
    if index >= list.len() {
      break;
    }
    list.load_around(index).map_err(|e| e.to_string())?;
    list.poll();
    for update in log.take() {
      println!("at {index}: {update:?}");
    }
  }
  while list.wait_for_result(Duration::from_millis(200)) {}
  for update in log.take() {
    println!("settled: {update:?}");
  }

  println!(
    "loaded={} offset={} resume={}",
    list.loaded_count(),
    list.position_offset(),
    list.resume_token().map_err(|e| e.to_string())?
  );
  pool.shutdown();
  Ok(())
}
