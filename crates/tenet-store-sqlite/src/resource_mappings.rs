use chrono::Utc;
use rusqlite::Connection;
use tenet_core::{
  fqn::{GroupFqn, validate_segment},
  mapping::{
    NewResourceMapping, NewResourceMappingGroup, ResourceMapping,
    ResourceMappingGroup, ResourceMappingGroupUpdate, ResourceMappingUpdate,
  },
  metadata::Metadata,
  store::ResourceMappingStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  db::{
    Args, Update, exec, exec_one, next_metadata, query, query_row, text,
    to_json, uuid,
  },
  encode::{
    RawResourceMapping, RawResourceMappingGroup, VALUE_REF_JSON, encode_uuid,
  },
};

const GROUP_SELECT: &str = "SELECT g.id, g.namespace_id, g.name
     FROM resource_mapping_groups g";

fn mapping_select() -> String {
  format!(
    "SELECT m.id, m.terms, m.metadata, {VALUE_REF_JSON},
            g.id, g.namespace_id, g.name
     FROM resource_mappings m
     JOIN attribute_values v ON v.id = m.attribute_value_id
     LEFT JOIN attribute_fqns vf ON vf.value_id = v.id
     LEFT JOIN resource_mapping_groups g ON g.id = m.group_id"
  )
}

fn select_group(
  conn: &Connection,
  filter: &str,
  args: Args,
) -> rusqlite::Result<RawResourceMappingGroup> {
  query_row(
    conn,
    &format!("{GROUP_SELECT} {filter}"),
    args,
    RawResourceMappingGroup::from_row,
  )
}

fn select_mapping(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<RawResourceMapping> {
  query_row(
    conn,
    &format!("{} WHERE m.id = ?1", mapping_select()),
    vec![text(id)],
    RawResourceMapping::from_row,
  )
}

fn require_terms(terms: &[String]) -> Result<()> {
  if terms.is_empty() {
    return Err(
      tenet_core::Error::Validation("resource mapping terms are required".into())
        .into(),
    );
  }
  Ok(())
}

impl ResourceMappingStore for SqliteStore {
  async fn create_resource_mapping(
    &self,
    input: NewResourceMapping,
  ) -> Result<ResourceMapping> {
    require_terms(&input.terms)?;
    let id = Uuid::new_v4();
    let metadata = Metadata::new(input.metadata, Utc::now());

    self
      .write(move |tx| {
        exec(
          tx,
          "INSERT INTO resource_mappings
             (id, attribute_value_id, terms, group_id, metadata)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          vec![
            uuid(id),
            uuid(input.attribute_value_id),
            text(to_json(&input.terms)?),
            input.group_id.map(uuid).into(),
            text(to_json(&metadata)?),
          ],
        )?;
        Ok(())
      })
      .await?;

    self.get_resource_mapping(id).await
  }

  async fn get_resource_mapping(&self, id: Uuid) -> Result<ResourceMapping> {
    let id_str = encode_uuid(id);
    let raw = self
      .read(move |conn| Ok(select_mapping(conn, &id_str)?))
      .await?;
    raw.into_mapping()
  }

  async fn list_resource_mappings(&self) -> Result<Vec<ResourceMapping>> {
    let sql = format!("{} ORDER BY m.rowid", mapping_select());
    let raws = self
      .read(move |conn| {
        Ok(query(conn, &sql, Vec::new(), RawResourceMapping::from_row)?)
      })
      .await?;
    raws.into_iter().map(RawResourceMapping::into_mapping).collect()
  }

  async fn update_resource_mapping(
    &self,
    id: Uuid,
    update: ResourceMappingUpdate,
  ) -> Result<ResourceMapping> {
    if update.is_empty() {
      return self.get_resource_mapping(id).await;
    }
    if let Some(terms) = &update.terms {
      require_terms(terms)?;
    }

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        let metadata = next_metadata(
          tx,
          "resource_mappings",
          &id_str,
          update.metadata.as_ref(),
          Utc::now(),
        )?;
        let terms = update.terms.as_ref().map(to_json).transpose()?;
        Update::new("resource_mappings")
          .set("metadata", text(metadata))
          .set_opt("attribute_value_id", update.attribute_value_id.map(uuid))
          .set_opt("terms", terms.map(text))
          .set_opt("group_id", update.group_id.map(uuid))
          .execute(tx, &id_str)?;
        Ok(())
      })
      .await?;

    self.get_resource_mapping(id).await
  }

  async fn delete_resource_mapping(&self, id: Uuid) -> Result<ResourceMapping> {
    let id_str = encode_uuid(id);
    let raw = self
      .write(move |tx| {
        let raw = select_mapping(tx, &id_str)?;
        exec_one(
          tx,
          "DELETE FROM resource_mappings WHERE id = ?1",
          vec![text(id_str)],
        )?;
        Ok(raw)
      })
      .await?;
    raw.into_mapping()
  }

  async fn create_resource_mapping_group(
    &self,
    input: NewResourceMappingGroup,
  ) -> Result<ResourceMappingGroup> {
    validate_segment("resource mapping group name", &input.name)?;
    let id = Uuid::new_v4();

    self
      .write(move |tx| {
        exec(
          tx,
          "INSERT INTO resource_mapping_groups (id, namespace_id, name)
           VALUES (?1, ?2, ?3)",
          vec![uuid(id), uuid(input.namespace_id), text(input.name)],
        )?;
        Ok(())
      })
      .await?;

    self.get_resource_mapping_group(id).await
  }

  async fn get_resource_mapping_group(
    &self,
    id: Uuid,
  ) -> Result<ResourceMappingGroup> {
    let raw = self
      .read(move |conn| {
        Ok(select_group(conn, "WHERE g.id = ?1", vec![uuid(id)])?)
      })
      .await?;
    raw.into_group()
  }

  async fn get_resource_mapping_group_by_fqn(
    &self,
    fqn: String,
  ) -> Result<ResourceMappingGroup> {
    let GroupFqn { namespace, name } = fqn.parse()?;
    let raw = self
      .read(move |conn| {
        Ok(select_group(
          conn,
          "JOIN attribute_namespaces n ON n.id = g.namespace_id
           WHERE n.name = ?1 AND g.name = ?2",
          vec![text(namespace), text(name)],
        )?)
      })
      .await?;
    raw.into_group()
  }

  async fn list_resource_mapping_groups(
    &self,
    namespace_id: Option<Uuid>,
  ) -> Result<Vec<ResourceMappingGroup>> {
    let (filter, args) = match namespace_id {
      Some(id) => ("WHERE g.namespace_id = ?1", vec![uuid(id)]),
      None => ("", Vec::new()),
    };
    let sql = format!("{GROUP_SELECT} {filter} ORDER BY g.rowid");
    let raws = self
      .read(move |conn| {
        Ok(query(conn, &sql, args, RawResourceMappingGroup::from_row)?)
      })
      .await?;
    raws.into_iter().map(RawResourceMappingGroup::into_group).collect()
  }

  async fn update_resource_mapping_group(
    &self,
    id: Uuid,
    update: ResourceMappingGroupUpdate,
  ) -> Result<ResourceMappingGroup> {
    if update.is_empty() {
      return self.get_resource_mapping_group(id).await;
    }
    if let Some(name) = &update.name {
      validate_segment("resource mapping group name", name)?;
    }

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        Update::new("resource_mapping_groups")
          .set_opt("namespace_id", update.namespace_id.map(uuid))
          .set_opt("name", update.name.map(text))
          .execute(tx, &id_str)?;
        Ok(())
      })
      .await?;

    self.get_resource_mapping_group(id).await
  }

  async fn delete_resource_mapping_group(
    &self,
    id: Uuid,
  ) -> Result<ResourceMappingGroup> {
    let id_str = encode_uuid(id);
    let (raw, ungrouped) = self
      .write(move |tx| {
        let raw =
          select_group(tx, "WHERE g.id = ?1", vec![text(id_str.as_str())])?;
        let ungrouped: i64 = query_row(
          tx,
          "SELECT COUNT(*) FROM resource_mappings WHERE group_id = ?1",
          vec![text(id_str.as_str())],
          |row| row.get(0),
        )?;
        exec_one(
          tx,
          "DELETE FROM resource_mapping_groups WHERE id = ?1",
          vec![text(id_str)],
        )?;
        Ok((raw, ungrouped))
      })
      .await?;

    info!(%id, ungrouped, "deleted resource mapping group");
    raw.into_group()
  }
}
