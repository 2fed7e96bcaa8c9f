//! SQLite backend for the mend metadata store.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread without blocking the async runtime. The schema mirrors the
//! repository platform's value table exactly: `metadatavalue` rows keyed by
//! an owner/object id, a `metadata_field_id`, `text_value`, `place`, and
//! `confidence`, with items tracked in a separate `item` table.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
