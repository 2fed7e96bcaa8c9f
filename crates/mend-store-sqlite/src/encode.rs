//! Encoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Owner ids are stored as hyphenated lowercase UUID strings; everything
//! else on a value row is numeric or plain text.

use mend_core::{field::FieldId, value::MetadataValue};
use uuid::Uuid;

use crate::Result;

pub fn encode_uuid(id: Uuid) -> String {
  id.hyphenated().to_string()
}

pub fn decode_uuid(s: &str) -> Result<Uuid> {
  Ok(Uuid::parse_str(s)?)
}

/// Raw strings read directly from a `metadatavalue` row.
pub struct RawValue {
  pub value_id:   i64,
  pub object_id:  String,
  pub field_id:   i32,
  pub text_value: String,
  pub place:      i32,
  pub confidence: i32,
}

impl RawValue {
  pub fn into_value(self) -> Result<MetadataValue> {
    Ok(MetadataValue {
      value_id:   self.value_id,
      owner_id:   decode_uuid(&self.object_id)?,
      field_id:   FieldId(self.field_id),
      text_value: self.text_value,
      place:      self.place,
      confidence: self.confidence,
    })
  }
}
