//! Terminal outcomes of processing one correction record.
//!
//! Outcomes are values, not errors: a skipped record or an empty match is a
//! legitimate result that the caller renders. Only store failures propagate
//! as errors.

use serde::Serialize;
use uuid::Uuid;

use crate::correction::SkipReason;

/// What happened (or would happen) to one correction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
  /// Rows were mutated and committed.
  Applied { affected: u64 },

  /// Dry-run: this many rows would be mutated.
  WouldApply { affected: u64 },

  /// The record matched no rows. Not an error.
  NoMatch,

  /// The record failed pre-validation and the store was never touched.
  Skipped { reason: SkipReason },

  /// A link record's per-owner results, in store row order.
  Link { events: Vec<LinkEvent> },
}

impl Outcome {
  /// Whether this outcome represents (or previews) at least one mutation.
  pub fn is_effective(&self) -> bool {
    match self {
      Self::Applied { affected } | Self::WouldApply { affected } => {
        *affected > 0
      }
      Self::NoMatch | Self::Skipped { .. } => false,
      Self::Link { events } => events.iter().any(|e| {
        matches!(e.action, LinkAction::Added { .. } | LinkAction::WouldAdd {
          ..
        })
      }),
    }
  }
}

/// The result of the linking flow for one matching name row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LinkEvent {
  pub owner_id: Uuid,
  pub action:   LinkAction,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LinkAction {
  /// A new assertion row was inserted, mirroring the name row's place.
  Added { value_id: i64, place: i32 },

  /// Dry-run: an assertion row would be inserted at this place.
  WouldAdd { place: i32 },

  /// The owner already has an assertion containing this token.
  AlreadyPresent,
}
