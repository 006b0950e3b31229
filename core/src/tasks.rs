use std::{
  collections::VecDeque,
  fmt, io,
  sync::{
    atomic::{AtomicUsize, Ordering},
    mpsc, Arc,
  },
  thread::{self, JoinHandle},
};

use parking_lot::Mutex;

pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Background context that runs data source loads.
pub trait Executor: Send + Sync {
  fn execute(&self, job: Job);
}

impl<E: Executor + ?Sized> Executor for Arc<E> {
  fn execute(&self, job: Job) {
    (**self).execute(job)
  }
}

#[derive(Debug, Clone)]
pub struct ThreadPoolOptions {
  pub threads: usize,
  pub thread_name: String,
}

impl Default for ThreadPoolOptions {
  fn default() -> Self {
    Self {
      threads: 2,
      thread_name: "paging-loader".into(),
    }
  }
}

/// Fixed set of worker threads pulling jobs from one queue.
pub struct ThreadPoolExecutor {
  sender: Mutex<Option<mpsc::Sender<Job>>>,
  workers: Mutex<Vec<JoinHandle<()>>>,
  running: Arc<AtomicUsize>,
}

impl fmt::Debug for ThreadPoolExecutor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ThreadPoolExecutor")
      .field("workers", &self.workers.lock().len())
      .field("running", &self.running.load(Ordering::SeqCst))
      .finish()
  }
}

impl ThreadPoolExecutor {
  pub fn new(opts: ThreadPoolOptions) -> io::Result<Self> {
    let (tx, rx) = mpsc::channel::<Job>();
    let rx = Arc::new(Mutex::new(rx));
    let running = Arc::new(AtomicUsize::new(0));

    let mut workers = Vec::with_capacity(opts.threads.max(1));
    for i in 0..opts.threads.max(1) {
      let rx = Arc::clone(&rx);
      let running = Arc::clone(&running);
      let handle = thread::Builder::new()
        .name(format!("{}-{}", opts.thread_name, i))
        .spawn(move || loop {
          // Hold the lock only while waiting for the next job.
          let job = { rx.lock().recv() };
          let Ok(job) = job else {
            break;
          };
          running.fetch_add(1, Ordering::SeqCst);
          job();
          running.fetch_sub(1, Ordering::SeqCst);
        })?;
      workers.push(handle);
    }

    Ok(Self {
      sender: Mutex::new(Some(tx)),
      workers: Mutex::new(workers),
      running,
    })
  }

  /// Number of jobs currently executing.
  pub fn running(&self) -> usize {
    self.running.load(Ordering::SeqCst)
  }

  /// Stop accepting jobs, let queued ones finish, and join the workers.
  pub fn shutdown(&self) {
    self.sender.lock().take();
    let workers = std::mem::take(&mut *self.workers.lock());
    for w in workers {
      if w.join().is_err() {
        tracing::warn!("paging worker panicked");
      }
    }
  }
}

impl Executor for ThreadPoolExecutor {
  fn execute(&self, job: Job) {
    let sender = self.sender.lock();
    match sender.as_ref() {
      Some(tx) => {
        tracing::trace!("paging job queued");
        if tx.send(job).is_err() {
          tracing::warn!("paging workers gone; dropping job");
        }
      }
      None => tracing::warn!("executor shut down; dropping job"),
    }
  }
}

impl Drop for ThreadPoolExecutor {
  fn drop(&mut self) {
    self.shutdown();
  }
}

/// Queue of jobs run only when the host asks, for deterministic stepping.
#[derive(Clone, Default)]
pub struct ManualExecutor {
  queue: Arc<Mutex<VecDeque<Job>>>,
}

impl fmt::Debug for ManualExecutor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("ManualExecutor")
      .field("pending", &self.pending())
      .finish()
  }
}

impl ManualExecutor {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn pending(&self) -> usize {
    self.queue.lock().len()
  }

  /// Run the oldest queued job. Returns false when the queue was empty.
  pub fn run_next(&self) -> bool {
    let job = self.queue.lock().pop_front();
    match job {
      Some(job) => {
        job();
        true
      }
      None => false,
    }
  }

  /// Run jobs until the queue is empty, including jobs queued while running.
  pub fn run_all(&self) -> usize {
    let mut ran = 0;
    while self.run_next() {
      ran += 1;
    }
    ran
  }
}

impl Executor for ManualExecutor {
  fn execute(&self, job: Job) {
    self.queue.lock().push_back(job);
  }
}
