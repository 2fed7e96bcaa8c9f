//! Domain types and the store contract for the mend metadata toolkit.
//!
//! Nothing here touches a database or the filesystem; backends and the
//! engine build on these types without pulling their dependencies in.

// Backends implement `MetadataStore` with native `async fn`; keep the
// advisory lint about `Send` bounds quiet crate-wide.
#![allow(async_fn_in_trait)]

pub mod cancel;
pub mod correction;
pub mod field;
pub mod identifier;
pub mod outcome;
pub mod store;
pub mod value;

pub use cancel::CancelToken;
pub use correction::{Correction, SkipReason};
pub use field::{FieldId, FieldRef};
pub use outcome::{LinkAction, LinkEvent, Outcome};
pub use value::{AUTOMATED_CONFIDENCE, MetadataValue, NewValue};
