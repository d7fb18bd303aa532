//! The cache engine façade
//!
//! Reads walk three tiers in order: memory, the persistent store, then the
//! remote database. Remote results are persisted before they are cached in
//! memory. Watched keys are kept fresh by the listener registry, which pushes
//! remote change events down through the same two tiers.

pub(crate) mod internal;

mod builder;
mod operations;
mod types;

pub use operations::stats::{ActiveWatchers, CacheStats, CachedEntryInfo};
pub use types::CacheEngine;

#[cfg(test)]
mod tests;
