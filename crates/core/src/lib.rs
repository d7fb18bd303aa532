//! Core domain types, codec and remote boundary for `coldstore`.
//!
//! ## Key Components
//!
//! - **`types`**: the closed [`Value`] union, [`DocumentRef`] handles and
//!   [`Query`] descriptions.
//! - **`codec`**: conversion between values and their portable JSON encoding.
//! - **`remote`**: the [`RemoteSource`] trait the cache reads through.
//! - **`errors`**: the shared [`Error`] enum and [`Result`] alias.
//! - **`testing`**: a scriptable in-memory remote for tests, behind the
//!   `testing` feature.

pub mod codec;
pub mod constants;
pub mod errors;
pub mod remote;
#[cfg(feature = "testing")]
pub mod testing;
pub mod types;

pub use self::{
    codec::{PathResolver, ReferenceResolver},
    constants::*,
    errors::{Error, Result},
    remote::{DocumentChanges, QueryChanges, RemoteDocument, RemoteResolver, RemoteSource},
    types::*,
};
