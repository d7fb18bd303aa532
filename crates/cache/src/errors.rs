//! Error handling for the cache engine
//!
//! Every error carries a [`RecoveryHint`] describing what a caller can do
//! about it. Most failures never reach callers: remote failures and corrupt
//! persisted entries are absorbed by the read path. What does surface is
//! filesystem trouble while persisting, bad configuration and bad keys.

mod conversions;
mod display;
mod recovery;
mod types;

pub use types::*;
