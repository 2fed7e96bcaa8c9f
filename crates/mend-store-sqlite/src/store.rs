//! [`SqliteStore`] — the SQLite implementation of [`MetadataStore`].

use std::path::Path;

use uuid::Uuid;

use mend_core::{
  field::{FieldId, FieldRef},
  store::MetadataStore,
  value::{MetadataValue, NewValue},
};

use crate::{
  Error, Result,
  encode::{RawValue, encode_uuid},
  schema::SCHEMA,
};

/// The match predicate shared by the dry-run preview SELECT and every
/// mutation over `(field, text_value)`. Sharing one fragment guarantees the
/// preview can never diverge from the committed change.
///
/// The `IN (SELECT uuid FROM item)` sub-query restricts work to item-owned
/// rows; the value table also hosts other entity types.
macro_rules! item_value_match {
  () => {
    "object_id IN (SELECT uuid FROM item) \
     AND metadata_field_id = ?1 AND text_value = ?2"
  };
}

const VALUE_COLUMNS: &str =
  "metadata_value_id, object_id, metadata_field_id, text_value, place, \
   confidence";

const FIND_VALUES_SQL: &str = concat!(
  "SELECT metadata_value_id, object_id, metadata_field_id, text_value, \
   place, confidence FROM metadatavalue WHERE ",
  item_value_match!(),
);

const DELETE_VALUES_SQL: &str =
  concat!("DELETE FROM metadatavalue WHERE ", item_value_match!());

const REPLACE_VALUES_SQL: &str = concat!(
  "UPDATE metadatavalue SET text_value = ?3 WHERE ",
  item_value_match!(),
);

const MOVE_VALUES_SQL: &str = concat!(
  "UPDATE metadatavalue SET metadata_field_id = ?3 WHERE ",
  item_value_match!(),
);

const NEXT_IDENTITY_SQL: &str =
  "UPDATE metadatavalue_seq SET last_value = last_value + 1 \
   RETURNING last_value";

fn raw_value(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawValue> {
  Ok(RawValue {
    value_id:   row.get(0)?,
    object_id:  row.get(1)?,
    field_id:   row.get(2)?,
    text_value: row.get(3)?,
    place:      row.get(4)?,
    confidence: row.get(5)?,
  })
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A metadata store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted. The
/// connection is only ever driven from one logical flow at a time, so the
/// explicit BEGIN/COMMIT record scope needs no further locking.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Release the underlying connection. Called on every exit path once the
  /// batch loop has returned.
  pub async fn close(self) -> Result<()> {
    self.conn.close().await?;
    Ok(())
  }

  // ── Provisioning ──────────────────────────────────────────────────────────

  /// Register a repository item. Items are normally created by the platform
  /// itself; this exists for standing up local and test stores.
  pub async fn create_item(&self, id: Uuid) -> Result<()> {
    let id_str = encode_uuid(id);
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO item (uuid) VALUES (?1)",
          rusqlite::params![id_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Register a field in the site registry under a fixed id.
  pub async fn create_field(&self, id: FieldId, field: &FieldRef) -> Result<()> {
    let schema_id = field.schema_id;
    let element   = field.element.clone();
    let qualifier = field.qualifier.clone();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR IGNORE INTO metadatafieldregistry
             (metadata_field_id, metadata_schema_id, element, qualifier)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id.0, schema_id, element, qualifier],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── MetadataStore impl ──────────────────────────────────────────────────────

impl MetadataStore for SqliteStore {
  type Error = Error;

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn find_values(
    &self,
    field: FieldId,
    text: &str,
  ) -> Result<Vec<MetadataValue>> {
    let text = text.to_owned();

    let raws: Vec<RawValue> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(FIND_VALUES_SQL)?;
        let rows = stmt
          .query_map(rusqlite::params![field.0, text], raw_value)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawValue::into_value).collect()
  }

  async fn find_by_owner(
    &self,
    owner: Uuid,
    field: FieldId,
  ) -> Result<Vec<MetadataValue>> {
    let owner_str = encode_uuid(owner);

    let raws: Vec<RawValue> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {VALUE_COLUMNS} FROM metadatavalue
           WHERE object_id = ?1 AND metadata_field_id = ?2"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![owner_str, field.0], raw_value)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawValue::into_value).collect()
  }

  async fn find_existing_assertion(
    &self,
    owner: Uuid,
    field: FieldId,
    token: &str,
    confidence: i32,
  ) -> Result<Vec<MetadataValue>> {
    let owner_str = encode_uuid(owner);
    let token     = token.to_owned();

    let raws: Vec<RawValue> = self
      .conn
      .call(move |conn| {
        let sql = format!(
          "SELECT {VALUE_COLUMNS} FROM metadatavalue
           WHERE object_id = ?1
             AND object_id IN (SELECT uuid FROM item)
             AND metadata_field_id = ?2
             AND text_value LIKE '%' || ?3 || '%'
             AND confidence = ?4"
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(
            rusqlite::params![owner_str, field.0, token, confidence],
            raw_value,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawValue::into_value).collect()
  }

  async fn find_owners_containing(
    &self,
    field: FieldId,
    key: &str,
  ) -> Result<Vec<Uuid>> {
    let key = key.to_owned();

    let owners: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT DISTINCT object_id FROM metadatavalue
           WHERE object_id IN (SELECT uuid FROM item)
             AND metadata_field_id = ?1
             AND text_value LIKE '%' || ?2 || '%'",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![field.0, key], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    owners
      .iter()
      .map(|s| crate::encode::decode_uuid(s))
      .collect()
  }

  async fn resolve_field(&self, field: &FieldRef) -> Result<Option<FieldId>> {
    use rusqlite::OptionalExtension as _;

    let schema_id = field.schema_id;
    let element   = field.element.clone();
    let qualifier = field.qualifier.clone();

    let id: Option<i32> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT metadata_field_id FROM metadatafieldregistry
               WHERE metadata_schema_id = ?1
                 AND element = ?2
                 AND qualifier IS ?3",
              rusqlite::params![schema_id, element, qualifier],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    Ok(id.map(FieldId))
  }

  // ── Mutations ─────────────────────────────────────────────────────────────

  async fn delete_values(&self, field: FieldId, text: &str) -> Result<u64> {
    let text = text.to_owned();
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(DELETE_VALUES_SQL, rusqlite::params![field.0, text])?)
      })
      .await?;
    Ok(affected as u64)
  }

  async fn replace_values(
    &self,
    field: FieldId,
    from: &str,
    to: &str,
  ) -> Result<u64> {
    let from = from.to_owned();
    let to   = to.to_owned();
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          REPLACE_VALUES_SQL,
          rusqlite::params![field.0, from, to],
        )?)
      })
      .await?;
    Ok(affected as u64)
  }

  async fn move_values(
    &self,
    from_field: FieldId,
    to_field: FieldId,
    text: &str,
  ) -> Result<u64> {
    let text = text.to_owned();
    let affected = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          MOVE_VALUES_SQL,
          rusqlite::params![from_field.0, text, to_field.0],
        )?)
      })
      .await?;
    Ok(affected as u64)
  }

  async fn insert(&self, value: NewValue) -> Result<i64> {
    let object_id = encode_uuid(value.owner_id);

    let id = self
      .conn
      .call(move |conn| {
        // Fresh identity immediately before the insert; never pre-fetched,
        // so concurrent external writers cannot collide with us.
        let id: i64 = conn.query_row(NEXT_IDENTITY_SQL, [], |r| r.get(0))?;
        conn.execute(
          "INSERT INTO metadatavalue
             (metadata_value_id, object_id, metadata_field_id, text_value,
              place, confidence)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![
            id,
            object_id,
            value.field_id.0,
            value.text_value,
            value.place,
            value.confidence,
          ],
        )?;
        Ok(id)
      })
      .await?;

    Ok(id)
  }

  async fn next_identity(&self) -> Result<i64> {
    let id = self
      .conn
      .call(|conn| Ok(conn.query_row(NEXT_IDENTITY_SQL, [], |r| r.get(0))?))
      .await?;
    Ok(id)
  }

  // ── Per-record transaction scope ──────────────────────────────────────────

  async fn begin_record(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch("BEGIN")?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn commit_record(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch("COMMIT")?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn rollback_record(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch("ROLLBACK")?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}
