//! Unique-key lookups: resolve an item by a supposedly-unique value (a DOI)
//! and read companion values (title, handle) off the resolved owner.
//!
//! The key is matched by substring, since stored values often wrap the key
//! in a resolver URL. Uniqueness is not trusted: zero matches and multiple
//! matches are explicit outcomes, and nothing is dereferenced unless the
//! match is unique.

use serde::Serialize;
use uuid::Uuid;

use mend_core::{field::FieldId, store::MetadataStore};

use crate::engine::Engine;

/// Field ids a lookup batch reads from, resolved once at batch start.
#[derive(Debug, Clone, Copy)]
pub struct LookupFields {
  /// Field holding the unique key (e.g. the DOI field).
  pub key_field:    FieldId,
  pub title_field:  FieldId,
  pub handle_field: FieldId,
}

/// The result of resolving one key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum LookupOutcome {
  Resolved {
    owner_id: Uuid,
    title:    Option<String>,
    handle:   Option<String>,
  },

  NotFound,

  /// The key matched more than one distinct item. Nothing is dereferenced;
  /// the operator sees the ambiguity instead of an arbitrary pick.
  Ambiguous { matches: usize },
}

impl<S: MetadataStore> Engine<S> {
  /// Resolve one key against the store. Reads only; the dry-run flag is
  /// irrelevant here.
  pub async fn resolve_key(
    &self,
    fields: &LookupFields,
    key: &str,
  ) -> Result<LookupOutcome, S::Error> {
    let owners = self
      .store()
      .find_owners_containing(fields.key_field, key)
      .await?;

    match owners.as_slice() {
      [] => Ok(LookupOutcome::NotFound),
      [owner] => {
        let title = self.first_text(*owner, fields.title_field).await?;
        let handle = self.first_text(*owner, fields.handle_field).await?;
        Ok(LookupOutcome::Resolved { owner_id: *owner, title, handle })
      }
      many => {
        tracing::debug!(key, matches = many.len(), "ambiguous key");
        Ok(LookupOutcome::Ambiguous { matches: many.len() })
      }
    }
  }

  async fn first_text(
    &self,
    owner: Uuid,
    field: FieldId,
  ) -> Result<Option<String>, S::Error> {
    Ok(
      self
        .store()
        .find_by_owner(owner, field)
        .await?
        .into_iter()
        .next()
        .map(|v| v.text_value),
    )
  }
}
