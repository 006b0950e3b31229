mod config;
mod cursor;
mod dispatcher;
mod engine;
mod models;
mod snapshot;
mod source;
mod storage;
mod tasks;
mod tiled;

pub use crate::config::PagedListConfig;
pub use crate::cursor::{decode_resume_token, encode_resume_token, ResumeToken};
pub use crate::dispatcher::{ListCallback, ListenerId, UpdateLog};
pub use crate::engine::{PagedList, PagingError};
pub use crate::models::{InitialPage, ListUpdate, LoadDirection, LoadError, Page};
pub use crate::snapshot::Snapshot;
pub use crate::source::{DataSource, PositionalDataSource};
pub use crate::tasks::{Executor, Job, ManualExecutor, ThreadPoolExecutor, ThreadPoolOptions};
pub use crate::tiled::{TiledPagedList, TiledSnapshot};
