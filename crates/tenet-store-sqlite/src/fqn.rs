//! The FQN index: one materialised name per namespace, attribute and value.

use rusqlite::{Connection, types::Value as SqlValue};
use tenet_core::{
  fqn::{FqnTarget, IndexedFqn, ReindexReport, attribute_fqn, namespace_fqn, value_fqn},
  store::FqnIndex,
};
use tracing::{debug, warn};

use crate::{
  Result, SqliteStore,
  db::{Args, exec, query, query_row, text, uuid},
  encode::decode_uuid,
};

/// The entity an FQN row belongs to, by stored id.
enum Owner {
  Namespace(String),
  Attribute(String),
  Value(String),
}

impl Owner {
  fn of(target: FqnTarget) -> Option<Self> {
    let id = |id: uuid::Uuid| id.hyphenated().to_string();
    if let Some(value_id) = target.value_id {
      Some(Self::Value(id(value_id)))
    } else if let Some(attribute_id) = target.attribute_id {
      Some(Self::Attribute(id(attribute_id)))
    } else {
      target.namespace_id.map(|ns| Self::Namespace(id(ns)))
    }
  }
}

/// A computed row: `(namespace_id, attribute_id, value_id, fqn)`.
type FqnRow = (String, Option<String>, Option<String>, String);

fn compute(conn: &Connection, owner: &Owner) -> rusqlite::Result<FqnRow> {
  match owner {
    Owner::Value(id) => query_row(
      conn,
      "SELECT n.id, n.name, a.id, a.name, v.value
       FROM attribute_values v
       JOIN attribute_definitions a ON a.id = v.attribute_definition_id
       JOIN attribute_namespaces n  ON n.id = a.namespace_id
       WHERE v.id = ?1",
      vec![text(id.as_str())],
      |row| {
        let (ns, attr, val): (String, String, String) =
          (row.get(1)?, row.get(3)?, row.get(4)?);
        Ok((
          row.get(0)?,
          Some(row.get(2)?),
          Some(id.clone()),
          value_fqn(&ns, &attr, &val),
        ))
      },
    ),
    Owner::Attribute(id) => query_row(
      conn,
      "SELECT n.id, n.name, a.name
       FROM attribute_definitions a
       JOIN attribute_namespaces n ON n.id = a.namespace_id
       WHERE a.id = ?1",
      vec![text(id.as_str())],
      |row| {
        let (ns, attr): (String, String) = (row.get(1)?, row.get(2)?);
        Ok((row.get(0)?, Some(id.clone()), None, attribute_fqn(&ns, &attr)))
      },
    ),
    Owner::Namespace(id) => query_row(
      conn,
      "SELECT name FROM attribute_namespaces WHERE id = ?1",
      vec![text(id.as_str())],
      |row| {
        let ns: String = row.get(0)?;
        Ok((id.clone(), None, None, namespace_fqn(&ns)))
      },
    ),
  }
}

fn opt(id: Option<String>) -> SqlValue { id.map_or(SqlValue::Null, SqlValue::Text) }

/// Recompute and store the FQN of `owner`. The caller supplies the
/// transaction.
fn upsert(conn: &Connection, owner: &Owner) -> rusqlite::Result<String> {
  let (namespace_id, attribute_id, value_id, fqn) = compute(conn, owner)?;

  let key: Args =
    vec![text(namespace_id.as_str()), opt(attribute_id.clone()), opt(value_id.clone())];
  let mut args = key.clone();
  args.push(text(fqn.as_str()));
  let changed = exec(
    conn,
    "UPDATE attribute_fqns SET fqn = ?4
     WHERE namespace_id = ?1 AND attribute_id IS ?2 AND value_id IS ?3",
    args,
  )?;

  if changed == 0 {
    let mut args = vec![uuid(uuid::Uuid::new_v4())];
    args.extend(key);
    args.push(text(fqn.as_str()));
    exec(
      conn,
      "INSERT INTO attribute_fqns (id, namespace_id, attribute_id, value_id, fqn)
       VALUES (?1, ?2, ?3, ?4, ?5)",
      args,
    )?;
  }
  debug!(%fqn, "upserted fqn");
  Ok(fqn)
}

/// Which entity a stored FQN names: `(attribute_id, value_id)`.
pub(crate) fn lookup(
  conn: &Connection,
  fqn: &str,
) -> rusqlite::Result<(Option<String>, Option<String>)> {
  query_row(
    conn,
    "SELECT attribute_id, value_id FROM attribute_fqns WHERE fqn = ?1",
    vec![text(fqn)],
    |row| Ok((row.get(0)?, row.get(1)?)),
  )
}

fn reindex_table(
  conn: &Connection,
  table: &str,
  owner: fn(String) -> Owner,
) -> rusqlite::Result<Vec<(String, String)>> {
  let ids: Vec<String> = query(
    conn,
    &format!("SELECT id FROM {table} ORDER BY rowid"),
    Vec::new(),
    |row| row.get(0),
  )?;
  ids
    .into_iter()
    .map(|id| {
      let fqn = upsert(conn, &owner(id.clone()))?;
      Ok((id, fqn))
    })
    .collect()
}

fn indexed(rows: Vec<(String, String)>) -> Result<Vec<IndexedFqn>> {
  rows
    .into_iter()
    .map(|(id, fqn)| Ok(IndexedFqn { id: decode_uuid(&id)?, fqn }))
    .collect()
}

impl SqliteStore {
  /// Best-effort FQN refresh after a write. Failures are logged and left
  /// for a reindex to repair.
  pub(crate) async fn refresh_fqn(&self, target: FqnTarget) {
    if let Err(error) = self.upsert_fqn(target).await {
      warn!(?target, %error, "fqn upsert failed");
    }
  }
}

impl FqnIndex for SqliteStore {
  async fn upsert_fqn(&self, target: FqnTarget) -> Result<String> {
    let Some(owner) = Owner::of(target) else {
      return Err(
        tenet_core::Error::Unknown(
          "fqn upsert needs a namespace, attribute or value id".into(),
        )
        .into(),
      );
    };
    self.write(move |tx| Ok(upsert(tx, &owner)?)).await
  }

  async fn reindex_fqns(&self) -> Result<ReindexReport> {
    let (namespaces, attributes, values) = self
      .write(|tx| {
        let namespaces =
          reindex_table(tx, "attribute_namespaces", Owner::Namespace)?;
        let attributes =
          reindex_table(tx, "attribute_definitions", Owner::Attribute)?;
        let values = reindex_table(tx, "attribute_values", Owner::Value)?;
        Ok((namespaces, attributes, values))
      })
      .await?;

    Ok(ReindexReport {
      namespaces: indexed(namespaces)?,
      attributes: indexed(attributes)?,
      values:     indexed(values)?,
    })
  }
}
