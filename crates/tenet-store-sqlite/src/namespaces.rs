use chrono::Utc;
use rusqlite::Connection;
use tenet_core::{
  enums::ActiveState,
  fqn::{FqnTarget, normalize_namespace_name},
  metadata::{Metadata, MetadataUpdate},
  namespace::{Namespace, NewNamespace},
  store::NamespaceStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  db::{
    exec, exec_one, next_metadata, query, query_row, state_filter, text, to_json,
    where_clause,
  },
  encode::{RawNamespace, encode_uuid},
};

const NAMESPACE_SELECT: &str = "
SELECT n.id, n.name, n.active, n.metadata, f.fqn
FROM attribute_namespaces n
LEFT JOIN attribute_fqns f
  ON f.namespace_id = n.id AND f.attribute_id IS NULL AND f.value_id IS NULL";

pub(crate) fn select_namespace(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<RawNamespace> {
  query_row(
    conn,
    &format!("{NAMESPACE_SELECT} WHERE n.id = ?1"),
    vec![text(id)],
    RawNamespace::from_row,
  )
}

impl NamespaceStore for SqliteStore {
  async fn create_namespace(&self, input: NewNamespace) -> Result<Namespace> {
    let name = normalize_namespace_name(&input.name)?;
    let id = Uuid::new_v4();
    let metadata = Metadata::new(input.metadata, Utc::now());

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        exec(
          tx,
          "INSERT INTO attribute_namespaces (id, name, active, metadata)
           VALUES (?1, ?2, 1, ?3)",
          vec![text(id_str), text(name), text(to_json(&metadata)?)],
        )?;
        Ok(())
      })
      .await?;

    self.refresh_fqn(FqnTarget::namespace(id)).await;
    self.get_namespace(id).await
  }

  async fn get_namespace(&self, id: Uuid) -> Result<Namespace> {
    let id_str = encode_uuid(id);
    let raw = self
      .read(move |conn| Ok(select_namespace(conn, &id_str)?))
      .await?;
    raw.into_namespace()
  }

  async fn list_namespaces(&self, state: ActiveState) -> Result<Vec<Namespace>> {
    let filter: Vec<String> =
      state_filter(state, "n.active").into_iter().collect();
    let sql = format!("{NAMESPACE_SELECT} {} ORDER BY n.rowid", where_clause(&filter));

    let raws = self
      .read(move |conn| Ok(query(conn, &sql, Vec::new(), RawNamespace::from_row)?))
      .await?;
    raws.into_iter().map(RawNamespace::into_namespace).collect()
  }

  async fn update_namespace(
    &self,
    id: Uuid,
    metadata: Option<MetadataUpdate>,
  ) -> Result<Namespace> {
    let Some(update) = metadata else {
      return self.get_namespace(id).await;
    };

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        let next =
          next_metadata(tx, "attribute_namespaces", &id_str, Some(&update), Utc::now())?;
        exec_one(
          tx,
          "UPDATE attribute_namespaces SET metadata = ?1 WHERE id = ?2",
          vec![text(next), text(id_str)],
        )?;
        Ok(())
      })
      .await?;

    self.refresh_fqn(FqnTarget::namespace(id)).await;
    self.get_namespace(id).await
  }

  async fn deactivate_namespace(&self, id: Uuid) -> Result<Namespace> {
    let id_str = encode_uuid(id);
    let (attributes, values) = self
      .write(move |tx| {
        exec_one(
          tx,
          "UPDATE attribute_namespaces SET active = 0 WHERE id = ?1",
          vec![text(id_str.as_str())],
        )?;
        let attributes = exec(
          tx,
          "UPDATE attribute_definitions SET active = 0 WHERE namespace_id = ?1",
          vec![text(id_str.as_str())],
        )?;
        let values = exec(
          tx,
          "UPDATE attribute_values SET active = 0
           WHERE attribute_definition_id IN (
             SELECT id FROM attribute_definitions WHERE namespace_id = ?1
           )",
          vec![text(id_str)],
        )?;
        Ok((attributes, values))
      })
      .await?;

    info!(%id, attributes, values, "deactivated namespace");
    self.get_namespace(id).await
  }

  async fn delete_namespace(&self, id: Uuid) -> Result<Namespace> {
    let id_str = encode_uuid(id);
    let raw = self
      .write(move |tx| {
        let raw = select_namespace(tx, &id_str)?;
        exec_one(
          tx,
          "DELETE FROM attribute_namespaces WHERE id = ?1",
          vec![text(id_str)],
        )?;
        Ok(raw)
      })
      .await?;
    raw.into_namespace()
  }
}
