//! Metadata field identifiers.
//!
//! Fields are registered per site; their numeric ids differ between
//! installations. The engine never validates that an id exists — an id
//! referring to no rows is a legal, silent no-op.

use serde::{Deserialize, Serialize};

/// A row id in the site's metadata field registry.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct FieldId(pub i32);

impl std::fmt::Display for FieldId {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A symbolic field reference, resolved against the registry once at batch
/// start rather than per record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
  pub schema_id: i32,
  pub element:   String,
  pub qualifier: Option<String>,
}

impl FieldRef {
  pub fn new(
    schema_id: i32,
    element: impl Into<String>,
    qualifier: Option<String>,
  ) -> Self {
    Self { schema_id, element: element.into(), qualifier }
  }
}
