//! SQL schema for the SQLite registry.
//!
//! Executed once at connection startup via `PRAGMA user_version`. Future
//! migrations will be gated on that version number.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

-- One row per registry resource. `body_json` holds the serialised resource;
-- `rev` and `lcstate` are authoritative over anything stored in the body.
CREATE TABLE IF NOT EXISTS resources (
    resource_id TEXT PRIMARY KEY,
    type_       TEXT NOT NULL,   -- ResourceType discriminant
    name        TEXT NOT NULL,
    lcstate     TEXT NOT NULL,   -- 'DRAFT' | ... | 'DELETED'
    rev         INTEGER NOT NULL,
    created_at  TEXT NOT NULL,   -- ISO 8601 UTC
    updated_at  TEXT NOT NULL,
    body_json   TEXT NOT NULL
);

-- Directed, typed edges. Deleting either end removes the edge.
CREATE TABLE IF NOT EXISTS associations (
    seq            INTEGER PRIMARY KEY AUTOINCREMENT,
    association_id TEXT NOT NULL UNIQUE,
    subject_id     TEXT NOT NULL REFERENCES resources(resource_id) ON DELETE CASCADE,
    predicate      TEXT NOT NULL,
    object_id      TEXT NOT NULL REFERENCES resources(resource_id) ON DELETE CASCADE,
    object_type    TEXT NOT NULL,
    created_at     TEXT NOT NULL
);

-- Named key-value datastores (e.g. the last-update cache).
CREATE TABLE IF NOT EXISTS datastore_entries (
    datastore  TEXT NOT NULL,
    key        TEXT NOT NULL,
    value_json TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    PRIMARY KEY (datastore, key)
);

CREATE INDEX IF NOT EXISTS resources_type_idx     ON resources(type_);
CREATE INDEX IF NOT EXISTS associations_subj_idx  ON associations(subject_id, predicate);
CREATE INDEX IF NOT EXISTS associations_obj_idx   ON associations(object_id);

PRAGMA user_version = 1;
";
