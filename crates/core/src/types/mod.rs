//! Domain types shared between the cache and the remote boundary

pub mod query;
pub mod reference;
pub mod value;

pub use query::{Direction, Filter, FilterOp, Limit, OrderBy, Query};
pub use reference::DocumentRef;
pub use value::{Fields, GeoPoint, Timestamp, Value};
