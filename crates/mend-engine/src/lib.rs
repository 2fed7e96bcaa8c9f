//! The reconciliation engine: applies correction records against any
//! [`MetadataStore`] backend.
//!
//! The engine owns no I/O of its own. Input parsing and result rendering
//! belong to the caller; the store adapter owns the SQL. What lives here is
//! the per-record state machine — match, validate, mutate (or preview),
//! report — and the batch loop with its cancellation and error-containment
//! policy.
//!
//! Two rules shape everything in this crate:
//!
//! - Data-shape problems (identical replace values, a `|` separator, an
//!   unparsable identifier) are outcomes, never errors. One bad record must
//!   not abort the batch.
//! - The dry-run preview and the committed mutation share a single match
//!   predicate and a single code path up to the point of mutation, so the
//!   preview can never drift from what a commit would do.

mod engine;
pub mod lookup;

pub use engine::{BatchSummary, Engine};
pub use lookup::{LookupFields, LookupOutcome};

#[cfg(test)]
mod tests;
