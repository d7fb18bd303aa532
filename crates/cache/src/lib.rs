//! Read-through, write-behind cache in front of a remote document database
//!
//! This crate provides:
//! - A memory tier and a file-backed persistent tier consulted before the remote
//! - Live subscriptions that push remote changes into both tiers
//! - A byte ceiling enforced by evicting the least recently modified entries
//! - Inspection of usage, cached entries and active watches

pub mod config;
pub mod core;
pub mod entry;
pub mod errors;
pub mod eviction;
pub mod keys;
pub mod listeners;
pub mod memory;
pub mod serialization;
pub mod storage;

pub use config::{EngineConfig, EngineConfigBuilder};
pub use core::{ActiveWatchers, CacheEngine, CacheStats, CachedEntryInfo};
pub use entry::{CachedDocument, CachedQueryResult};
pub use errors::{CacheError, RecoveryHint, Result, SerializationOp};
pub use keys::{CacheKey, EntityKind};
