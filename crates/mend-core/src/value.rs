//! Metadata values — the mutable unit of work.
//!
//! A value is one stored text attribute attached to a repository item,
//! positioned by `place` among siblings of the same field. The value table
//! holds rows for several entity types; the store adapter is responsible for
//! restricting every read and write to rows owned by items.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::field::FieldId;

/// Confidence sentinel marking values inserted by automated processes,
/// as opposed to human-curated ones.
pub const AUTOMATED_CONFIDENCE: i32 = -1;

/// One stored metadata value row.
///
/// `place` preserves author/creator ordering among same-owner, same-field
/// siblings. Delete, replace, and move never reassign `place`; it is only
/// read and copied when the linking flow inserts a derived value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataValue {
  pub value_id:   i64,
  /// The owning repository item.
  pub owner_id:   Uuid,
  pub field_id:   FieldId,
  pub text_value: String,
  /// Zero-based position among sibling values of the same owner and field.
  pub place:      i32,
  pub confidence: i32,
}

/// Input to [`crate::store::MetadataStore::insert`].
/// The row id is always allocated by the store; it is not accepted from
/// callers.
#[derive(Debug, Clone)]
pub struct NewValue {
  pub owner_id:   Uuid,
  pub field_id:   FieldId,
  pub text_value: String,
  pub place:      i32,
  pub confidence: i32,
}
