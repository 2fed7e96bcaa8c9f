//! Correction records — one operator-supplied instruction per input row.
//!
//! Records are constructed by the input parsers, consumed once by the
//! engine, and discarded. Validation failures are not errors: they become
//! per-record skip outcomes so that one bad row never aborts a batch.

use serde::Serialize;
use thiserror::Error;

use crate::field::FieldId;

/// The multi-value separator used by the repository platform's own encoding.
/// Replacement values containing it would need to be rewritten into multiple
/// rows, which this engine does not support.
pub const MULTI_VALUE_SEPARATOR: char = '|';

/// Why a record (or one owner within a link record) was skipped without
/// touching the store.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
  /// Identical search and replace value; applying it would be a no-op.
  #[error("identical search and replace value: {value:?}")]
  IdenticalValues { value: String },

  /// The replacement contains the `|` multi-value separator.
  #[error("replacement contains the multi-value separator: {value:?}")]
  MultiValueSeparator { value: String },

  /// No identifier token could be extracted from a link assertion.
  #[error("no identifier found in {value:?}")]
  MalformedIdentifier { value: String },
}

/// One requested change against the metadata store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Correction {
  /// Remove every item-owned value of `field` equal to `value`.
  Delete { field: FieldId, value: String },

  /// Rewrite every item-owned value of `field` equal to `from` into `to`.
  Replace {
    field: FieldId,
    from:  String,
    to:    String,
  },

  /// Re-home values equal to `value` from one field to another, leaving
  /// `text_value` and `place` untouched.
  Move {
    from_field: FieldId,
    to_field:   FieldId,
    value:      String,
  },

  /// Add an identifier assertion next to every item-owned name value equal
  /// to `name`, mirroring each name row's `place`.
  Link {
    /// Field holding the author/creator names used to find owners.
    name_field:      FieldId,
    /// Field the assertion is written to.
    assertion_field: FieldId,
    name:            String,
    /// Full assertion text, e.g. `"Orth, Alan: 0000-0002-1735-7458"`.
    /// The embedded identifier token is extracted from it.
    assertion:       String,
  },
}

impl Correction {
  /// Pre-validation applied before any store access. Only replace records
  /// carry shape constraints; link assertions are checked at apply time
  /// because their failure is reported per matching owner set.
  pub fn validate(&self) -> Result<(), SkipReason> {
    if let Self::Replace { from, to, .. } = self {
      if from == to {
        return Err(SkipReason::IdenticalValues { value: from.clone() });
      }
      if to.contains(MULTI_VALUE_SEPARATOR) {
        return Err(SkipReason::MultiValueSeparator { value: to.clone() });
      }
    }
    Ok(())
  }

  /// The literal value the record matches on, for progress reporting.
  pub fn match_value(&self) -> &str {
    match self {
      Self::Delete { value, .. } => value,
      Self::Replace { from, .. } => from,
      Self::Move { value, .. } => value,
      Self::Link { name, .. } => name,
    }
  }
}
