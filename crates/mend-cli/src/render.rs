//! Rendering of per-record outcomes.
//!
//! Progress lines go to stdout; skips and no-matches go to the tracing
//! subscriber on stderr so piped output stays clean. Silent failure is not
//! an option: every outcome surfaces somewhere.

use mend_core::{
  correction::Correction,
  outcome::{LinkAction, Outcome},
};

/// Past-tense and conditional verbs for each correction kind.
fn verbs(correction: &Correction) -> (&'static str, &'static str) {
  match correction {
    Correction::Delete { .. } => ("Deleted", "Would delete"),
    Correction::Replace { .. } => ("Fixed", "Would fix"),
    Correction::Move { .. } => ("Moved", "Would move"),
    // Link progress is rendered per owner event, not per record.
    Correction::Link { .. } => ("Linked", "Would link"),
  }
}

pub fn print_progress(
  correction: &Correction,
  outcome: &Outcome,
  quiet: bool,
) {
  match outcome {
    Outcome::Applied { affected } => {
      if !quiet {
        let (past, _) = verbs(correction);
        println!(
          "{past} {affected} occurrences of: {}",
          correction.match_value()
        );
      }
    }

    Outcome::WouldApply { affected } => {
      if !quiet {
        let (_, conditional) = verbs(correction);
        println!(
          "{conditional} {affected} occurrences of: {}",
          correction.match_value()
        );
      }
    }

    Outcome::NoMatch => {
      tracing::debug!(value = correction.match_value(), "no matching rows");
    }

    Outcome::Skipped { reason } => {
      tracing::warn!(%reason, "skipped correction");
    }

    Outcome::Link { events } => {
      let assertion = match correction {
        Correction::Link { assertion, .. } => assertion.trim(),
        _ => "",
      };
      for event in events {
        match &event.action {
          LinkAction::Added { .. } => {
            if !quiet {
              println!(
                "Added identifier assertion {assertion:?} to item {}.",
                event.owner_id
              );
            }
          }
          LinkAction::WouldAdd { .. } => {
            if !quiet {
              println!(
                "Would add identifier assertion {assertion:?} to item {}.",
                event.owner_id
              );
            }
          }
          LinkAction::AlreadyPresent => {
            tracing::debug!(
              owner = %event.owner_id,
              "identifier assertion already present"
            );
          }
        }
      }
    }
  }
}
