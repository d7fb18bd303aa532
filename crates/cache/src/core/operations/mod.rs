//! Engine operations, implemented directly on [`CacheEngine`](super::CacheEngine)

mod clear;
mod collection;
mod get;
pub mod stats;
mod watch;
