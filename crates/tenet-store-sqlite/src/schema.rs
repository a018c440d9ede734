//! SQL schema and migrations for the Tenet SQLite store.
//!
//! Migrations are gated on `PRAGMA user_version`: migration `n` (1-based)
//! runs only when the stored version is below `n`, inside its own
//! transaction, and bumps the version on success.

use rusqlite::Connection;

/// Per-connection settings. Must run outside a transaction.
pub const PRAGMAS: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;
";

const V1_ATTRIBUTES: &str = "
CREATE TABLE attribute_namespaces (
    id        TEXT PRIMARY KEY,
    name      TEXT NOT NULL COLLATE NOCASE UNIQUE,
    active    INTEGER NOT NULL DEFAULT 1,
    metadata  TEXT NOT NULL           -- JSON Metadata document
);

CREATE TABLE attribute_definitions (
    id            TEXT PRIMARY KEY,
    namespace_id  TEXT NOT NULL
                  REFERENCES attribute_namespaces(id) ON DELETE RESTRICT,
    name          TEXT NOT NULL,
    rule          TEXT NOT NULL
                  CHECK (rule IN ('UNSPECIFIED', 'ALL_OF', 'ANY_OF', 'HIERARCHY')),
    active        INTEGER NOT NULL DEFAULT 1,
    metadata      TEXT NOT NULL,
    UNIQUE (namespace_id, name)
);

-- rowid order is creation order; reads sort on it.
CREATE TABLE attribute_values (
    id                       TEXT PRIMARY KEY,
    attribute_definition_id  TEXT NOT NULL
                             REFERENCES attribute_definitions(id) ON DELETE RESTRICT,
    value                    TEXT NOT NULL,
    members                  TEXT NOT NULL DEFAULT '[]',   -- JSON array of value ids
    active                   INTEGER NOT NULL DEFAULT 1,
    metadata                 TEXT NOT NULL,
    UNIQUE (attribute_definition_id, value)
);

CREATE TABLE key_access_servers (
    id          TEXT PRIMARY KEY,
    uri         TEXT NOT NULL UNIQUE,
    public_key  TEXT NOT NULL,        -- JSON {\"local\": ...} | {\"remote\": ...}
    metadata    TEXT NOT NULL
);

-- Grants go away with either side, including on KAS delete.
CREATE TABLE attribute_definition_key_access_grants (
    attribute_definition_id  TEXT NOT NULL
                             REFERENCES attribute_definitions(id) ON DELETE CASCADE,
    key_access_server_id     TEXT NOT NULL
                             REFERENCES key_access_servers(id) ON DELETE CASCADE,
    PRIMARY KEY (attribute_definition_id, key_access_server_id)
);

CREATE TABLE attribute_value_key_access_grants (
    attribute_value_id    TEXT NOT NULL
                          REFERENCES attribute_values(id) ON DELETE CASCADE,
    key_access_server_id  TEXT NOT NULL
                          REFERENCES key_access_servers(id) ON DELETE CASCADE,
    PRIMARY KEY (attribute_value_id, key_access_server_id)
);

-- One row per namespace, attribute and value. The owner key is nullable,
-- so uniqueness goes through an expression index.
CREATE TABLE attribute_fqns (
    id            TEXT PRIMARY KEY,
    namespace_id  TEXT REFERENCES attribute_namespaces(id) ON DELETE CASCADE,
    attribute_id  TEXT REFERENCES attribute_definitions(id) ON DELETE CASCADE,
    value_id      TEXT REFERENCES attribute_values(id) ON DELETE CASCADE,
    fqn           TEXT NOT NULL
);

CREATE UNIQUE INDEX attribute_fqns_owner_idx ON attribute_fqns (
    namespace_id, IFNULL(attribute_id, ''), IFNULL(value_id, '')
);
CREATE UNIQUE INDEX attribute_fqns_fqn_idx ON attribute_fqns (fqn);
CREATE INDEX attribute_fqns_attribute_idx ON attribute_fqns (attribute_id);
CREATE INDEX attribute_fqns_value_idx ON attribute_fqns (value_id);

CREATE INDEX attribute_definitions_namespace_idx
    ON attribute_definitions (namespace_id);
CREATE INDEX attribute_values_definition_idx
    ON attribute_values (attribute_definition_id);
";

const V2_MAPPINGS: &str = "
CREATE TABLE resource_mappings (
    id                  TEXT PRIMARY KEY,
    attribute_value_id  TEXT NOT NULL
                        REFERENCES attribute_values(id) ON DELETE RESTRICT,
    terms               TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    metadata            TEXT NOT NULL
);

CREATE TABLE subject_condition_set (
    id         TEXT PRIMARY KEY,
    name       TEXT,
    condition  TEXT NOT NULL,         -- JSON array of SubjectSet
    metadata   TEXT NOT NULL
);

CREATE TABLE subject_mappings (
    id                        TEXT PRIMARY KEY,
    attribute_value_id        TEXT NOT NULL
                              REFERENCES attribute_values(id) ON DELETE RESTRICT,
    subject_condition_set_id  TEXT NOT NULL
                              REFERENCES subject_condition_set(id),
    actions                   TEXT NOT NULL DEFAULT '[]',
    metadata                  TEXT NOT NULL
);

CREATE TABLE subject_mapping_condition_set_pivot (
    subject_mapping_id        TEXT NOT NULL
                              REFERENCES subject_mappings(id) ON DELETE CASCADE,
    subject_condition_set_id  TEXT NOT NULL
                              REFERENCES subject_condition_set(id) ON DELETE CASCADE,
    PRIMARY KEY (subject_mapping_id, subject_condition_set_id)
);

CREATE INDEX resource_mappings_value_idx ON resource_mappings (attribute_value_id);
CREATE INDEX subject_mappings_value_idx ON subject_mappings (attribute_value_id);
CREATE INDEX subject_mappings_set_idx ON subject_mappings (subject_condition_set_id);

CREATE TRIGGER subject_condition_set_in_use
BEFORE DELETE ON subject_condition_set
WHEN EXISTS (
    SELECT 1 FROM subject_mappings WHERE subject_condition_set_id = OLD.id
)
BEGIN
    SELECT RAISE(ABORT, 'subject condition set is referenced by a subject mapping');
END;
";

// Deleting a group leaves its mappings ungrouped.
const V3_RESOURCE_MAPPING_GROUPS: &str = "
CREATE TABLE resource_mapping_groups (
    id            TEXT PRIMARY KEY,
    namespace_id  TEXT NOT NULL
                  REFERENCES attribute_namespaces(id) ON DELETE RESTRICT,
    name          TEXT NOT NULL,
    UNIQUE (namespace_id, name)
);

ALTER TABLE resource_mappings
    ADD COLUMN group_id TEXT
    REFERENCES resource_mapping_groups(id) ON DELETE SET NULL;

CREATE INDEX resource_mappings_group_idx ON resource_mappings (group_id);
";

/// Ordered migrations; index `i` takes the schema to version `i + 1`.
pub const MIGRATIONS: &[&str] =
  &[V1_ATTRIBUTES, V2_MAPPINGS, V3_RESOURCE_MAPPING_GROUPS];

/// The version a fully migrated database reports.
pub fn latest_version() -> i64 { MIGRATIONS.len() as i64 }

pub fn current_version(conn: &Connection) -> rusqlite::Result<i64> {
  conn.pragma_query_value(None, "user_version", |row| row.get(0))
}

/// Apply every pending migration and return how many ran.
pub fn migrate(conn: &mut Connection) -> rusqlite::Result<usize> {
  let found = current_version(conn)?;
  let mut applied = 0;
  for (index, sql) in MIGRATIONS.iter().enumerate() {
    let version = index as i64 + 1;
    if version <= found {
      continue;
    }
    let tx = conn.transaction()?;
    tx.execute_batch(sql)?;
    tx.pragma_update(None, "user_version", version)?;
    tx.commit()?;
    applied += 1;
  }
  Ok(applied)
}
