//! Live group-message views.
//!
//! Two feeds are merged into one consistent timeline per group: a periodic
//! full refresh from the database and push notifications emitted when a
//! message is persisted. The merge is deduplicated by message id and kept in
//! ascending timestamp order, so subscribers see every message exactly once
//! regardless of which feed delivered it first.

mod manager;
mod timeline;
mod types;
mod watcher;

pub(crate) use manager::GroupStreams;
pub use types::{GroupMessageWatch, MessagePush};
