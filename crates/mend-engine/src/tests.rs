//! Engine tests against an in-memory SQLite store.

use mend_core::{
  cancel::CancelToken,
  correction::{Correction, SkipReason},
  field::FieldId,
  outcome::{LinkAction, Outcome},
  store::MetadataStore,
  value::{AUTOMATED_CONFIDENCE, NewValue},
};
use mend_store_sqlite::SqliteStore;
use uuid::Uuid;

use crate::{Engine, LookupFields, LookupOutcome};

const AUTHOR: FieldId = FieldId(3);
const SUBJECT: FieldId = FieldId(57);
const CREATOR_ID: FieldId = FieldId(240);
const DOI: FieldId = FieldId(220);
const TITLE: FieldId = FieldId(64);
const HANDLE: FieldId = FieldId(25);

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory().await.expect("in-memory store")
}

async fn item(s: &SqliteStore) -> Uuid {
  let id = Uuid::new_v4();
  s.create_item(id).await.unwrap();
  id
}

async fn seed(
  s: &SqliteStore,
  owner: Uuid,
  field: FieldId,
  text: &str,
  place: i32,
) {
  s.insert(NewValue {
    owner_id: owner,
    field_id: field,
    text_value: text.into(),
    place,
    confidence: 600,
  })
  .await
  .unwrap();
}

fn replace(from: &str, to: &str) -> Correction {
  Correction::Replace { field: AUTHOR, from: from.into(), to: to.into() }
}

fn link(name: &str, assertion: &str) -> Correction {
  Correction::Link {
    name_field:      AUTHOR,
    assertion_field: CREATOR_ID,
    name:            name.into(),
    assertion:       assertion.into(),
  }
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_is_idempotent() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, SUBJECT, "FISH", 0).await;
  seed(&s, owner, SUBJECT, "FISH", 1).await;

  let engine = Engine::new(s, false);
  let record =
    Correction::Delete { field: SUBJECT, value: "FISH".into() };

  let first = engine.apply(&record).await.unwrap();
  assert_eq!(first, Outcome::Applied { affected: 2 });

  let second = engine.apply(&record).await.unwrap();
  assert_eq!(second, Outcome::NoMatch);
}

#[tokio::test]
async fn delete_missing_value_is_a_clean_no_match() {
  let s = store().await;
  item(&s).await;

  let engine = Engine::new(s, false);
  let record =
    Correction::Delete { field: SUBJECT, value: "nothing here".into() };
  assert_eq!(engine.apply(&record).await.unwrap(), Outcome::NoMatch);
}

// ─── Replace ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn replace_updates_text_and_keeps_place() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Orth, Alan", 0).await;

  let engine = Engine::new(s, false);
  let record = replace("Orth, Alan", "Orth, A.");

  let outcome = engine.apply(&record).await.unwrap();
  assert_eq!(outcome, Outcome::Applied { affected: 1 });

  let rows = engine.store().find_values(AUTHOR, "Orth, A.").await.unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].place, 0);

  // Re-running the identical record affects nothing.
  assert_eq!(engine.apply(&record).await.unwrap(), Outcome::NoMatch);
}

#[tokio::test]
async fn replace_with_identical_values_is_skipped() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Orth, Alan", 0).await;

  let engine = Engine::new(s, false);
  let outcome = engine.apply(&replace("Orth, Alan", "Orth, Alan")).await.unwrap();
  assert!(matches!(
    outcome,
    Outcome::Skipped { reason: SkipReason::IdenticalValues { .. } }
  ));

  // The row is untouched.
  let rows = engine.store().find_values(AUTHOR, "Orth, Alan").await.unwrap();
  assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn replace_with_separator_never_mutates_in_any_mode() {
  for dry_run in [false, true] {
    let s = store().await;
    let owner = item(&s).await;
    seed(&s, owner, AUTHOR, "CGIAR", 0).await;

    let engine = Engine::new(s, dry_run);
    let outcome = engine.apply(&replace("CGIAR", "CGIAR|ILRI")).await.unwrap();
    assert!(matches!(
      outcome,
      Outcome::Skipped { reason: SkipReason::MultiValueSeparator { .. } }
    ));

    let rows = engine.store().find_values(AUTHOR, "CGIAR").await.unwrap();
    assert_eq!(rows.len(), 1, "dry_run={dry_run}");
  }
}

// ─── Dry-run symmetry ────────────────────────────────────────────────────────

#[tokio::test]
async fn dry_run_count_equals_commit_count() {
  let s = store().await;
  let a = item(&s).await;
  let b = item(&s).await;
  seed(&s, a, AUTHOR, "Orth, Alan", 0).await;
  seed(&s, b, AUTHOR, "Orth, Alan", 2).await;

  let record = replace("Orth, Alan", "Orth, A.");

  let preview = Engine::new(s.clone(), true);
  let Outcome::WouldApply { affected: previewed } =
    preview.apply(&record).await.unwrap()
  else {
    panic!("expected WouldApply");
  };

  let commit = Engine::new(s, false);
  let Outcome::Applied { affected } = commit.apply(&record).await.unwrap()
  else {
    panic!("expected Applied");
  };

  assert_eq!(previewed, affected);
}

#[tokio::test]
async fn dry_run_never_mutates() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, SUBJECT, "FISH", 0).await;

  let engine = Engine::new(s, true);

  let outcome = engine
    .apply(&Correction::Delete { field: SUBJECT, value: "FISH".into() })
    .await
    .unwrap();
  assert_eq!(outcome, Outcome::WouldApply { affected: 1 });

  let rows = engine.store().find_values(SUBJECT, "FISH").await.unwrap();
  assert_eq!(rows.len(), 1);
}

// ─── Move ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn move_rehomes_values_keeping_text_and_place() {
  let s = store().await;
  let a = item(&s).await;
  let b = item(&s).await;
  seed(&s, a, AUTHOR, "ILRI", 1).await;
  seed(&s, b, AUTHOR, "ILRI", 3).await;

  let engine = Engine::new(s, false);
  let record = Correction::Move {
    from_field: AUTHOR,
    to_field:   SUBJECT,
    value:      "ILRI".into(),
  };

  let outcome = engine.apply(&record).await.unwrap();
  assert_eq!(outcome, Outcome::Applied { affected: 2 });

  assert!(engine.store().find_values(AUTHOR, "ILRI").await.unwrap().is_empty());
  let moved = engine.store().find_values(SUBJECT, "ILRI").await.unwrap();
  assert_eq!(moved.len(), 2);
  let mut places: Vec<i32> = moved.iter().map(|v| v.place).collect();
  places.sort_unstable();
  assert_eq!(places, vec![1, 3]);

  // Idempotent: nothing left under the source field.
  assert_eq!(engine.apply(&record).await.unwrap(), Outcome::NoMatch);
}

#[tokio::test]
async fn move_matches_the_literal_value_without_trimming() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, " ILRI ", 0).await;

  let engine = Engine::new(s, false);

  // The trimmed form matches nothing.
  let trimmed = Correction::Move {
    from_field: AUTHOR,
    to_field:   SUBJECT,
    value:      "ILRI".into(),
  };
  assert_eq!(engine.apply(&trimmed).await.unwrap(), Outcome::NoMatch);

  // The literal form, whitespace included, matches the stored row.
  let literal = Correction::Move {
    from_field: AUTHOR,
    to_field:   SUBJECT,
    value:      " ILRI ".into(),
  };
  assert_eq!(
    engine.apply(&literal).await.unwrap(),
    Outcome::Applied { affected: 1 }
  );
}

// ─── Link ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn link_mirrors_the_name_row_place() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Smith, J.", 0).await;
  seed(&s, owner, AUTHOR, "Doe, A.", 1).await;

  let engine = Engine::new(s, false);
  let outcome = engine
    .apply(&link("Doe, A.", "Amy Doe: 0000-0002-1825-0097"))
    .await
    .unwrap();

  let Outcome::Link { events } = outcome else { panic!("expected Link") };
  assert_eq!(events.len(), 1);
  assert_eq!(events[0].owner_id, owner);
  assert!(
    matches!(events[0].action, LinkAction::Added { place: 1, .. }),
    "assertion must sit at the second author's place, got {:?}",
    events[0].action
  );

  let rows = engine
    .store()
    .find_by_owner(owner, CREATOR_ID)
    .await
    .unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].place, 1);
  assert_eq!(rows[0].text_value, "Amy Doe: 0000-0002-1825-0097");
  assert_eq!(rows[0].confidence, AUTOMATED_CONFIDENCE);
}

#[tokio::test]
async fn link_twice_adds_exactly_one_assertion() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Orth, Alan", 0).await;

  let engine = Engine::new(s, false);
  let record = link("Orth, Alan", "Alan S. Orth: 0000-0002-1735-7458");

  engine.apply(&record).await.unwrap();
  let outcome = engine.apply(&record).await.unwrap();

  let Outcome::Link { events } = outcome else { panic!("expected Link") };
  assert_eq!(events[0].action, LinkAction::AlreadyPresent);

  let rows = engine
    .store()
    .find_by_owner(owner, CREATOR_ID)
    .await
    .unwrap();
  assert_eq!(rows.len(), 1);
}

#[tokio::test]
async fn link_detects_token_embedded_in_larger_text() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Orth, Alan", 0).await;

  // An assertion from an earlier migration, differently phrased but
  // containing the same token.
  s.insert(NewValue {
    owner_id:   owner,
    field_id:   CREATOR_ID,
    text_value: "Orth, A.: 0000-0002-1735-7458".into(),
    place:      0,
    confidence: AUTOMATED_CONFIDENCE,
  })
  .await
  .unwrap();

  let engine = Engine::new(s, false);
  let outcome = engine
    .apply(&link("Orth, Alan", "Alan S. Orth: 0000-0002-1735-7458"))
    .await
    .unwrap();

  let Outcome::Link { events } = outcome else { panic!("expected Link") };
  assert_eq!(events[0].action, LinkAction::AlreadyPresent);
}

#[tokio::test]
async fn link_with_unparsable_identifier_is_skipped() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Orth, Alan", 0).await;

  let engine = Engine::new(s, false);
  let outcome = engine
    .apply(&link("Orth, Alan", "Alan S. Orth: not-an-identifier"))
    .await
    .unwrap();

  assert!(matches!(
    outcome,
    Outcome::Skipped { reason: SkipReason::MalformedIdentifier { .. } }
  ));
  assert!(
    engine
      .store()
      .find_by_owner(owner, CREATOR_ID)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn link_with_unknown_name_is_a_no_match() {
  let s = store().await;
  item(&s).await;

  let engine = Engine::new(s, false);
  let outcome = engine
    .apply(&link("Nobody, N.", "Nobody: 0000-0001-0000-0001"))
    .await
    .unwrap();
  assert_eq!(outcome, Outcome::NoMatch);
}

#[tokio::test]
async fn link_dry_run_previews_without_inserting() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Doe, A.", 2).await;

  let engine = Engine::new(s, true);
  let outcome = engine
    .apply(&link("Doe, A.", "Amy Doe: 0000-0002-1825-0097"))
    .await
    .unwrap();

  let Outcome::Link { events } = outcome else { panic!("expected Link") };
  assert_eq!(events[0].action, LinkAction::WouldAdd { place: 2 });
  assert!(
    engine
      .store()
      .find_by_owner(owner, CREATOR_ID)
      .await
      .unwrap()
      .is_empty()
  );
}

#[tokio::test]
async fn link_trims_surrounding_whitespace_from_assertion() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Orth, Alan", 0).await;

  let engine = Engine::new(s, false);
  engine
    .apply(&link("Orth, Alan", "  Alan S. Orth: 0000-0002-1735-7458 "))
    .await
    .unwrap();

  let rows = engine
    .store()
    .find_by_owner(owner, CREATOR_ID)
    .await
    .unwrap();
  assert_eq!(rows[0].text_value, "Alan S. Orth: 0000-0002-1735-7458");
}

// ─── Batch behavior ──────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_reports_every_record_in_input_order() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, AUTHOR, "Orth, Alan", 0).await;
  seed(&s, owner, SUBJECT, "FISH", 0).await;

  let records = vec![
    replace("Orth, Alan", "Orth, A."),
    replace("same", "same"), // skipped-invalid
    Correction::Delete { field: SUBJECT, value: "FISH".into() },
    Correction::Delete { field: SUBJECT, value: "absent".into() },
  ];

  let engine = Engine::new(s, false);
  let mut seen = Vec::new();
  let summary = engine
    .run(&records, &CancelToken::new(), |index, _, outcome| {
      seen.push((index, outcome.clone()));
    })
    .await
    .unwrap();

  assert_eq!(summary.processed, 4);
  assert!(!summary.cancelled);
  assert_eq!(seen.len(), 4);
  assert_eq!(seen[0].1, Outcome::Applied { affected: 1 });
  assert!(matches!(seen[1].1, Outcome::Skipped { .. }));
  assert_eq!(seen[2].1, Outcome::Applied { affected: 1 });
  assert_eq!(seen[3].1, Outcome::NoMatch);
}

#[tokio::test]
async fn cancellation_stops_before_the_next_record() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, SUBJECT, "FIRST", 0).await;
  seed(&s, owner, SUBJECT, "SECOND", 1).await;

  let records = vec![
    Correction::Delete { field: SUBJECT, value: "FIRST".into() },
    Correction::Delete { field: SUBJECT, value: "SECOND".into() },
  ];

  let engine = Engine::new(s, false);
  let cancel = CancelToken::new();

  let canceller = cancel.clone();
  let summary = engine
    .run(&records, &cancel, move |_, _, _| {
      // Simulate an interrupt arriving while the first record commits.
      canceller.cancel();
    })
    .await
    .unwrap();

  assert_eq!(summary.processed, 1);
  assert!(summary.cancelled);

  // The first record's work stays committed; the second never ran.
  assert!(engine.store().find_values(SUBJECT, "FIRST").await.unwrap().is_empty());
  assert_eq!(
    engine.store().find_values(SUBJECT, "SECOND").await.unwrap().len(),
    1
  );
}

#[tokio::test]
async fn pre_cancelled_batch_issues_no_operations() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, SUBJECT, "FISH", 0).await;

  let records =
    vec![Correction::Delete { field: SUBJECT, value: "FISH".into() }];

  let engine = Engine::new(s, false);
  let cancel = CancelToken::new();
  cancel.cancel();

  let summary = engine
    .run(&records, &cancel, |_, _, _| panic!("no record should report"))
    .await
    .unwrap();

  assert_eq!(summary.processed, 0);
  assert!(summary.cancelled);
  assert_eq!(engine.store().find_values(SUBJECT, "FISH").await.unwrap().len(), 1);
}

// ─── Unique-key lookup ───────────────────────────────────────────────────────

const LOOKUP: LookupFields = LookupFields {
  key_field:    DOI,
  title_field:  TITLE,
  handle_field: HANDLE,
};

#[tokio::test]
async fn lookup_resolves_a_unique_key() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, DOI, "https://doi.org/10.1186/s13059", 0).await;
  seed(&s, owner, TITLE, "A genome assembly", 0).await;
  seed(&s, owner, HANDLE, "10568/12345", 0).await;

  let engine = Engine::new(s, false);
  let outcome = engine.resolve_key(&LOOKUP, "10.1186/s13059").await.unwrap();

  assert_eq!(outcome, LookupOutcome::Resolved {
    owner_id: owner,
    title:    Some("A genome assembly".into()),
    handle:   Some("10568/12345".into()),
  });
}

#[tokio::test]
async fn lookup_resolves_an_item_holding_the_key_twice() {
  let s = store().await;
  let owner = item(&s).await;

  // One item, two renditions of the same DOI. Not ambiguous: ambiguity
  // means distinct items share the key.
  seed(&s, owner, DOI, "10.1186/s13059", 0).await;
  seed(&s, owner, DOI, "https://doi.org/10.1186/s13059", 1).await;
  seed(&s, owner, TITLE, "A genome assembly", 0).await;
  seed(&s, owner, HANDLE, "10568/12345", 0).await;

  let engine = Engine::new(s, false);
  let outcome = engine.resolve_key(&LOOKUP, "10.1186/s13059").await.unwrap();

  assert_eq!(outcome, LookupOutcome::Resolved {
    owner_id: owner,
    title:    Some("A genome assembly".into()),
    handle:   Some("10568/12345".into()),
  });
}

#[tokio::test]
async fn lookup_reports_missing_and_ambiguous_keys() {
  let s = store().await;
  let a = item(&s).await;
  let b = item(&s).await;
  seed(&s, a, DOI, "10.1186/s13059", 0).await;
  seed(&s, b, DOI, "https://doi.org/10.1186/s13059", 0).await;

  let engine = Engine::new(s, false);

  assert_eq!(
    engine.resolve_key(&LOOKUP, "10.9999/absent").await.unwrap(),
    LookupOutcome::NotFound
  );
  assert_eq!(
    engine.resolve_key(&LOOKUP, "10.1186/s13059").await.unwrap(),
    LookupOutcome::Ambiguous { matches: 2 }
  );
}

#[tokio::test]
async fn lookup_with_missing_companion_values_still_resolves() {
  let s = store().await;
  let owner = item(&s).await;
  seed(&s, owner, DOI, "10.5555/only-doi", 0).await;

  let engine = Engine::new(s, false);
  let outcome = engine.resolve_key(&LOOKUP, "10.5555/only-doi").await.unwrap();

  assert_eq!(outcome, LookupOutcome::Resolved {
    owner_id: owner,
    title:    None,
    handle:   None,
  });
}
