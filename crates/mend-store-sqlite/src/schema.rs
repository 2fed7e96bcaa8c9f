//! SQL schema for the SQLite metadata store.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- Repository items. The value table's owner column also hosts other entity
-- types (collections, communities, bundles), so every query over values
-- joins against this table.
CREATE TABLE IF NOT EXISTS item (
    uuid TEXT PRIMARY KEY
);

CREATE TABLE IF NOT EXISTS metadatafieldregistry (
    metadata_field_id  INTEGER PRIMARY KEY,
    metadata_schema_id INTEGER NOT NULL,
    element            TEXT NOT NULL,
    qualifier          TEXT,
    UNIQUE (metadata_schema_id, element, qualifier)
);

CREATE TABLE IF NOT EXISTS metadatavalue (
    metadata_value_id INTEGER PRIMARY KEY,
    object_id         TEXT NOT NULL,
    metadata_field_id INTEGER NOT NULL,
    text_value        TEXT NOT NULL,
    place             INTEGER NOT NULL DEFAULT 0,
    confidence        INTEGER NOT NULL DEFAULT -1
);

-- Value ids come from a monotonically increasing sequence shared with
-- external writers; mirrored here as a single-row counter.
CREATE TABLE IF NOT EXISTS metadatavalue_seq (
    last_value INTEGER NOT NULL
);
INSERT INTO metadatavalue_seq (last_value)
SELECT 0 WHERE NOT EXISTS (SELECT 1 FROM metadatavalue_seq);

CREATE INDEX IF NOT EXISTS metadatavalue_field_idx
    ON metadatavalue(metadata_field_id);
CREATE INDEX IF NOT EXISTS metadatavalue_object_idx
    ON metadatavalue(object_id);

PRAGMA user_version = 1;
";
