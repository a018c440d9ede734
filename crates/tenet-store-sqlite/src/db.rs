//! Thin statement helpers shared by every repository.
//!
//! Each helper takes a borrowed connection (or transaction) and an owned
//! argument list, logs the statement at `debug`, and returns raw
//! `rusqlite` results. Classification into the policy taxonomy happens when
//! the error leaves the connection closure (see [`crate::error`]).

use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row, params_from_iter, types::Value};
use tenet_core::{
  enums::ActiveState,
  metadata::{Metadata, MetadataUpdate},
};
use tracing::debug;

pub type Args = Vec<Value>;

/// Run a single-row select (or `RETURNING` statement).
pub fn query_row<T>(
  conn: &Connection,
  sql: &str,
  args: Args,
  map: impl FnOnce(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<T> {
  debug!(sql, args = args.len(), "query_row");
  conn.query_row(sql, params_from_iter(args), map)
}

/// Run a select and collect every row.
pub fn query<T>(
  conn: &Connection,
  sql: &str,
  args: Args,
  map: impl FnMut(&Row<'_>) -> rusqlite::Result<T>,
) -> rusqlite::Result<Vec<T>> {
  debug!(sql, args = args.len(), "query");
  let mut stmt = conn.prepare(sql)?;
  let rows = stmt
    .query_map(params_from_iter(args), map)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(rows)
}

/// Run a state-changing statement and return the number of rows touched.
pub fn exec(conn: &Connection, sql: &str, args: Args) -> rusqlite::Result<usize> {
  debug!(sql, args = args.len(), "exec");
  conn.execute(sql, params_from_iter(args))
}

/// Like [`exec`], but zero affected rows is reported as "no rows".
pub fn exec_one(
  conn: &Connection,
  sql: &str,
  args: Args,
) -> rusqlite::Result<usize> {
  match exec(conn, sql, args)? {
    0 => Err(rusqlite::Error::QueryReturnedNoRows),
    n => Ok(n),
  }
}

/// Carry a policy error out of a connection closure.
pub fn reject(err: tenet_core::Error) -> tokio_rusqlite::Error {
  tokio_rusqlite::Error::Other(Box::new(err))
}

pub fn json_err(err: serde_json::Error) -> tokio_rusqlite::Error {
  reject(tenet_core::Error::Serialization(err))
}

pub fn to_json<T: serde::Serialize>(
  value: &T,
) -> Result<String, tokio_rusqlite::Error> {
  serde_json::to_string(value).map_err(json_err)
}

pub fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

pub fn uuid(id: uuid::Uuid) -> Value { Value::Text(id.hyphenated().to_string()) }

/// The `WHERE` fragment selecting rows for `state`, if it filters at all.
pub fn state_filter(state: ActiveState, column: &str) -> Option<String> {
  match state.effective() {
    ActiveState::Inactive => Some(format!("{column} = 0")),
    ActiveState::Any => None,
    ActiveState::Active | ActiveState::Unspecified => {
      Some(format!("{column} = 1"))
    }
  }
}

/// Join optional conditions into a `WHERE` clause.
pub fn where_clause(conditions: &[String]) -> String {
  if conditions.is_empty() {
    String::new()
  } else {
    format!("WHERE {}", conditions.join(" AND "))
  }
}

/// Read the stored metadata of `id` in `table` and return the document the
/// update should write.
pub fn next_metadata(
  conn: &Connection,
  table: &str,
  id: &str,
  update: Option<&MetadataUpdate>,
  now: DateTime<Utc>,
) -> Result<String, tokio_rusqlite::Error> {
  let stored: String = query_row(
    conn,
    &format!("SELECT metadata FROM {table} WHERE id = ?1"),
    vec![text(id)],
    |row| row.get(0),
  )?;
  let current: Metadata = serde_json::from_str(&stored).map_err(json_err)?;
  to_json(&current.apply(update, now))
}

// ─── Partial updates ─────────────────────────────────────────────────────────

/// An `UPDATE ... SET` built from the fields a caller actually supplied.
pub struct Update {
  table: &'static str,
  sets:  Vec<(&'static str, Value)>,
}

impl Update {
  pub fn new(table: &'static str) -> Self { Self { table, sets: Vec::new() } }

  pub fn set(mut self, column: &'static str, value: Value) -> Self {
    self.sets.push((column, value));
    self
  }

  pub fn set_opt(self, column: &'static str, value: Option<Value>) -> Self {
    match value {
      Some(value) => self.set(column, value),
      None => self,
    }
  }

  pub fn is_empty(&self) -> bool { self.sets.is_empty() }

  /// Apply to the row with primary key `id`. A missing row is reported as
  /// "no rows"; an empty update touches nothing.
  pub fn execute(self, conn: &Connection, id: &str) -> rusqlite::Result<usize> {
    if self.sets.is_empty() {
      return Ok(0);
    }
    let assignments = self
      .sets
      .iter()
      .enumerate()
      .map(|(i, (column, _))| format!("{column} = ?{}", i + 1))
      .collect::<Vec<_>>()
      .join(", ");
    let sql = format!(
      "UPDATE {} SET {assignments} WHERE id = ?{}",
      self.table,
      self.sets.len() + 1
    );
    let mut args: Args = self.sets.into_iter().map(|(_, v)| v).collect();
    args.push(text(id));
    exec_one(conn, &sql, args)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn conn() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    conn
      .execute_batch(
        "CREATE TABLE t (id TEXT PRIMARY KEY, a TEXT, b INTEGER);
         INSERT INTO t VALUES ('x', 'old', 1);",
      )
      .unwrap();
    conn
  }

  #[test]
  fn update_sets_only_supplied_columns() {
    let conn = conn();
    let n = Update::new("t")
      .set("a", text("new"))
      .set_opt("b", None)
      .execute(&conn, "x")
      .unwrap();
    assert_eq!(n, 1);
    let (a, b): (String, i64) = conn
      .query_row("SELECT a, b FROM t WHERE id = 'x'", [], |r| {
        Ok((r.get(0)?, r.get(1)?))
      })
      .unwrap();
    assert_eq!((a.as_str(), b), ("new", 1));
  }

  #[test]
  fn update_of_missing_row_is_no_rows() {
    let conn = conn();
    let err = Update::new("t")
      .set("b", Value::Integer(2))
      .execute(&conn, "missing")
      .unwrap_err();
    assert!(matches!(err, rusqlite::Error::QueryReturnedNoRows));
  }

  #[test]
  fn empty_update_is_a_no_op() {
    let conn = conn();
    let update = Update::new("t");
    assert!(update.is_empty());
    assert_eq!(update.execute(&conn, "missing").unwrap(), 0);
  }

  #[test]
  fn state_filter_treats_unspecified_as_active() {
    assert_eq!(
      state_filter(ActiveState::Unspecified, "a.active").as_deref(),
      Some("a.active = 1")
    );
    assert_eq!(state_filter(ActiveState::Any, "a.active"), None);
  }
}
