//! Persistent queue state (SQLite via sqlx).
//!
//! Stores the three job lists (queue, pending, done) as one row per job with
//! the list name and position, so every record field round-trips. The engine
//! talks to the store through [`StoreWriter`], which runs writes off the
//! engine's event loop.

mod db;
mod jobs;
mod writer;

pub use db::StateStore;
pub use writer::{PersistAck, StoreWriter};
