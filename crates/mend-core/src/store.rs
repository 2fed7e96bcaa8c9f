//! The `MetadataStore` trait — the adapter contract for the value table.
//!
//! The trait is implemented by storage backends (e.g. `mend-store-sqlite`).
//! The engine depends on this abstraction, not on any concrete backend.
//!
//! The value table holds rows for several entity types sharing one owner-id
//! column, so every read and mutation restricted by field and text must also
//! be restricted to item-owned rows via a sub-query — owner identifiers must
//! never be trusted as globally unique across entity types.

use std::future::Future;

use uuid::Uuid;

use crate::{
  field::{FieldId, FieldRef},
  value::{MetadataValue, NewValue},
};

/// Abstraction over the site's metadata-value store.
///
/// Mutating methods return affected-row counts; zero affected rows is a
/// legitimate result, never an error. The dry-run preview and the committed
/// mutation for one operation must share the same match predicate, so
/// implementations are expected to build both from one `WHERE` clause.
///
/// Per-record transaction scoping is explicit: the engine brackets each
/// mutating record with [`begin_record`](Self::begin_record) and
/// [`commit_record`](Self::commit_record) /
/// [`rollback_record`](Self::rollback_record). One record's failure must not
/// disturb already-committed prior records.
pub trait MetadataStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// All item-owned values of `field` exactly equal to `text`, in the
  /// store's natural row order (stable per run; not independently sorted).
  fn find_values<'a>(
    &'a self,
    field: FieldId,
    text: &'a str,
  ) -> impl Future<Output = Result<Vec<MetadataValue>, Self::Error>> + Send + 'a;

  /// All values of `field` owned by `owner`, including `place`.
  fn find_by_owner(
    &self,
    owner: Uuid,
    field: FieldId,
  ) -> impl Future<Output = Result<Vec<MetadataValue>, Self::Error>> + Send + '_;

  /// Item-owned values of `field` for `owner` that *contain* `token` and
  /// carry exactly `confidence`. Substring matching is used only here, to
  /// catch identifiers already embedded in larger text values.
  fn find_existing_assertion<'a>(
    &'a self,
    owner: Uuid,
    field: FieldId,
    token: &'a str,
    confidence: i32,
  ) -> impl Future<Output = Result<Vec<MetadataValue>, Self::Error>> + Send + 'a;

  /// Distinct owners of item rows whose `field` value contains `key`. One
  /// item holding the key several times (bare and URL-wrapped, say) is one
  /// owner; more than one entry means genuinely distinct items share the
  /// key.
  fn find_owners_containing<'a>(
    &'a self,
    field: FieldId,
    key: &'a str,
  ) -> impl Future<Output = Result<Vec<Uuid>, Self::Error>> + Send + 'a;

  /// Resolve a symbolic field reference against the site's field registry.
  fn resolve_field<'a>(
    &'a self,
    field: &'a FieldRef,
  ) -> impl Future<Output = Result<Option<FieldId>, Self::Error>> + Send + 'a;

  // ── Mutations ─────────────────────────────────────────────────────────

  /// Delete item-owned values of `field` equal to `text`.
  fn delete_values<'a>(
    &'a self,
    field: FieldId,
    text: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Rewrite item-owned values of `field` equal to `from` into `to`.
  fn replace_values<'a>(
    &'a self,
    field: FieldId,
    from: &'a str,
    to: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Re-home item-owned values equal to `text` from `from_field` to
  /// `to_field`, leaving `text_value` and `place` untouched.
  fn move_values<'a>(
    &'a self,
    from_field: FieldId,
    to_field: FieldId,
    text: &'a str,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + 'a;

  /// Insert a new value row and return its id. The id comes from
  /// [`next_identity`](Self::next_identity), requested immediately before
  /// the insert — never pre-fetched in batches, so ids stay collision-free
  /// under concurrent external writers (gaps are visible but harmless).
  fn insert(
    &self,
    value: NewValue,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  /// Allocate the next id from the store's monotonically increasing value
  /// sequence.
  fn next_identity(
    &self,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;

  // ── Per-record transaction scope ──────────────────────────────────────

  fn begin_record(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn commit_record(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn rollback_record(
    &self,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
