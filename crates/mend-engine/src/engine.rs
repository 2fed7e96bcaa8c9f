//! [`Engine`] — the per-record state machine and the batch loop.

use mend_core::{
  cancel::CancelToken,
  correction::{Correction, SkipReason},
  field::FieldId,
  identifier::extract_identifier,
  outcome::{LinkAction, LinkEvent, Outcome},
  store::MetadataStore,
  value::{AUTOMATED_CONFIDENCE, MetadataValue, NewValue},
};

/// How a finished (or cancelled) batch went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSummary {
  /// Records fully processed before the batch ended.
  pub processed: usize,
  /// Whether the batch stopped early on a cancellation request. Work
  /// already committed stays committed.
  pub cancelled: bool,
}

/// Applies correction records against a [`MetadataStore`].
///
/// The store is owned for the lifetime of the batch and handed back via
/// [`into_store`](Self::into_store) so the caller can release it on every
/// exit path.
pub struct Engine<S> {
  store:   S,
  dry_run: bool,
}

impl<S: MetadataStore> Engine<S> {
  pub fn new(store: S, dry_run: bool) -> Self {
    Self { store, dry_run }
  }

  pub fn dry_run(&self) -> bool {
    self.dry_run
  }

  pub fn store(&self) -> &S {
    &self.store
  }

  pub fn into_store(self) -> S {
    self.store
  }

  // ── Batch loop ────────────────────────────────────────────────────────────

  /// Process `corrections` strictly in input order, invoking `report` with
  /// each record's outcome as it completes.
  ///
  /// The cancellation token is checked between records: once triggered, no
  /// further operation is issued. Store errors end the batch immediately;
  /// everything recoverable is already folded into the per-record
  /// [`Outcome`].
  pub async fn run(
    &self,
    corrections: &[Correction],
    cancel: &CancelToken,
    mut report: impl FnMut(usize, &Correction, &Outcome),
  ) -> Result<BatchSummary, S::Error> {
    let mut processed = 0;

    for (index, correction) in corrections.iter().enumerate() {
      if cancel.is_cancelled() {
        tracing::info!(processed, "cancelled; stopping before next record");
        return Ok(BatchSummary { processed, cancelled: true });
      }

      let outcome = self.apply(correction).await?;
      report(index, correction, &outcome);
      processed += 1;
    }

    Ok(BatchSummary { processed, cancelled: false })
  }

  // ── Single records ────────────────────────────────────────────────────────

  /// Apply one correction record and return its terminal outcome.
  pub async fn apply(
    &self,
    correction: &Correction,
  ) -> Result<Outcome, S::Error> {
    if let Err(reason) = correction.validate() {
      tracing::debug!(%reason, "skipping invalid correction");
      return Ok(Outcome::Skipped { reason });
    }

    match correction {
      Correction::Delete { field, value } => {
        self.apply_delete(*field, value).await
      }
      Correction::Replace { field, from, to } => {
        self.apply_replace(*field, from, to).await
      }
      Correction::Move { from_field, to_field, value } => {
        self.apply_move(*from_field, *to_field, value).await
      }
      Correction::Link { name_field, assertion_field, name, assertion } => {
        self
          .apply_link(*name_field, *assertion_field, name, assertion)
          .await
      }
    }
  }

  /// Dry-run counterpart of every `(field, text_value)` mutation: the same
  /// match predicate, no mutating call.
  async fn preview(
    &self,
    field: FieldId,
    text: &str,
  ) -> Result<Outcome, S::Error> {
    let matches = self.store.find_values(field, text).await?;
    Ok(match matches.len() {
      0 => Outcome::NoMatch,
      n => Outcome::WouldApply { affected: n as u64 },
    })
  }

  async fn apply_delete(
    &self,
    field: FieldId,
    value: &str,
  ) -> Result<Outcome, S::Error> {
    if self.dry_run {
      return self.preview(field, value).await;
    }

    self.store.begin_record().await?;
    let affected = match self.store.delete_values(field, value).await {
      Ok(n) => n,
      Err(e) => {
        let _ = self.store.rollback_record().await;
        return Err(e);
      }
    };
    self.store.commit_record().await?;

    Ok(applied(affected))
  }

  async fn apply_replace(
    &self,
    field: FieldId,
    from: &str,
    to: &str,
  ) -> Result<Outcome, S::Error> {
    if self.dry_run {
      return self.preview(field, from).await;
    }

    self.store.begin_record().await?;
    let affected = match self.store.replace_values(field, from, to).await {
      Ok(n) => n,
      Err(e) => {
        let _ = self.store.rollback_record().await;
        return Err(e);
      }
    };
    self.store.commit_record().await?;

    Ok(applied(affected))
  }

  async fn apply_move(
    &self,
    from_field: FieldId,
    to_field: FieldId,
    value: &str,
  ) -> Result<Outcome, S::Error> {
    // Matching is on the literal input, untrimmed: the mutation must
    // mirror stored values exactly, not cleaned-up versions of them.
    if self.dry_run {
      return self.preview(from_field, value).await;
    }

    self.store.begin_record().await?;
    let affected = match self
      .store
      .move_values(from_field, to_field, value)
      .await
    {
      Ok(n) => n,
      Err(e) => {
        let _ = self.store.rollback_record().await;
        return Err(e);
      }
    };
    self.store.commit_record().await?;

    Ok(applied(affected))
  }

  // ── Identifier linking ────────────────────────────────────────────────────

  /// Two-phase linking. Phase 1 recovers `(owner, place)` pairs from the
  /// ordered name rows — the correction input carries no explicit place, so
  /// the already-ordered names are the only source of position. Phase 2
  /// inserts the assertion per owner unless an equivalent one exists.
  async fn apply_link(
    &self,
    name_field: FieldId,
    assertion_field: FieldId,
    name: &str,
    assertion: &str,
  ) -> Result<Outcome, S::Error> {
    let name_rows = self.store.find_values(name_field, name).await?;
    if name_rows.is_empty() {
      return Ok(Outcome::NoMatch);
    }

    // Stray whitespace around the assertion is an input artifact; inside it
    // is meaningful.
    let text = assertion.trim();
    let Some(token) = extract_identifier(text) else {
      tracing::debug!(assertion, "no identifier token; skipping record");
      return Ok(Outcome::Skipped {
        reason: SkipReason::MalformedIdentifier { value: assertion.into() },
      });
    };

    if self.dry_run {
      let events = self
        .link_owners(&name_rows, assertion_field, text, token)
        .await?;
      return Ok(Outcome::Link { events });
    }

    self.store.begin_record().await?;
    match self.link_owners(&name_rows, assertion_field, text, token).await {
      Ok(events) => {
        self.store.commit_record().await?;
        Ok(Outcome::Link { events })
      }
      Err(e) => {
        let _ = self.store.rollback_record().await;
        Err(e)
      }
    }
  }

  /// Phase 2, shared verbatim between dry-run and commit; only the final
  /// insert is gated on the mode.
  async fn link_owners(
    &self,
    name_rows: &[MetadataValue],
    assertion_field: FieldId,
    text: &str,
    token: &str,
  ) -> Result<Vec<LinkEvent>, S::Error> {
    let mut events = Vec::with_capacity(name_rows.len());

    // Owners are processed in the store's row order for the name query.
    for row in name_rows {
      let existing = self
        .store
        .find_existing_assertion(
          row.owner_id,
          assertion_field,
          token,
          AUTOMATED_CONFIDENCE,
        )
        .await?;

      let action = if !existing.is_empty() {
        LinkAction::AlreadyPresent
      } else if self.dry_run {
        LinkAction::WouldAdd { place: row.place }
      } else {
        let value_id = self
          .store
          .insert(NewValue {
            owner_id:   row.owner_id,
            field_id:   assertion_field,
            text_value: text.to_owned(),
            place:      row.place,
            confidence: AUTOMATED_CONFIDENCE,
          })
          .await?;
        tracing::debug!(
          owner = %row.owner_id,
          place = row.place,
          "added identifier assertion"
        );
        LinkAction::Added { value_id, place: row.place }
      };

      events.push(LinkEvent { owner_id: row.owner_id, action });
    }

    Ok(events)
  }
}

fn applied(affected: u64) -> Outcome {
  if affected == 0 {
    Outcome::NoMatch
  } else {
    Outcome::Applied { affected }
  }
}
