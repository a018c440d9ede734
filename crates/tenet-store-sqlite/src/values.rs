use chrono::Utc;
use rusqlite::Connection;
use tenet_core::{
  attribute::{NewValue, Value, ValueUpdate},
  enums::ActiveState,
  fqn::{FqnTarget, validate_segment},
  kas::KasGrant,
  metadata::Metadata,
  store::AttributeValueStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  db::{
    Args, Update, exec, exec_one, next_metadata, query, query_row, reject,
    state_filter, text, to_json, uuid, where_clause,
  },
  encode::{KAS_JSON, RawValue, encode_uuid},
};

fn value_select() -> String {
  format!(
    "SELECT v.id, v.attribute_definition_id, v.value, v.members, v.active,
            v.metadata, vf.fqn,
            (SELECT json_group_array({KAS_JSON})
             FROM attribute_value_key_access_grants g
             JOIN key_access_servers k ON k.id = g.key_access_server_id
             WHERE g.attribute_value_id = v.id)
     FROM attribute_values v
     LEFT JOIN attribute_fqns vf ON vf.value_id = v.id"
  )
}

pub(crate) fn select_value(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<RawValue> {
  query_row(
    conn,
    &format!("{} WHERE v.id = ?1", value_select()),
    vec![text(id)],
    RawValue::from_row,
  )
}

/// A value ready to insert, with its id and metadata already assigned.
pub(crate) struct NewValueRow {
  pub id:           Uuid,
  pub attribute_id: Uuid,
  pub value:        String,
  pub members:      Vec<Uuid>,
  pub metadata:     Metadata,
}

/// Every member must name another value of the same attribute.
fn check_members(
  conn: &Connection,
  attribute_id: &str,
  value_id: &str,
  members: &[Uuid],
) -> Result<(), tokio_rusqlite::Error> {
  if members.is_empty() {
    return Ok(());
  }
  let mut distinct = members.to_vec();
  distinct.sort();
  distinct.dedup();
  if distinct.iter().any(|m| encode_uuid(*m) == value_id) {
    return Err(reject(tenet_core::Error::Validation(
      "a value cannot be a member of itself".into(),
    )));
  }

  let found: i64 = query_row(
    conn,
    "SELECT COUNT(*) FROM attribute_values
     WHERE id IN (SELECT value FROM json_each(?1))
       AND attribute_definition_id = ?2",
    vec![text(to_json(&distinct)?), text(attribute_id)],
    |row| row.get(0),
  )?;
  if found as usize != distinct.len() {
    return Err(reject(tenet_core::Error::ForeignKey(
      "value members must be existing values of the same attribute".into(),
    )));
  }
  Ok(())
}

/// Insert one value row. Shared by value create and attribute create.
pub(crate) fn insert_value(
  conn: &Connection,
  row: &NewValueRow,
) -> Result<(), tokio_rusqlite::Error> {
  check_members(
    conn,
    &encode_uuid(row.attribute_id),
    &encode_uuid(row.id),
    &row.members,
  )?;
  exec(
    conn,
    "INSERT INTO attribute_values
       (id, attribute_definition_id, value, members, active, metadata)
     VALUES (?1, ?2, ?3, ?4, 1, ?5)",
    vec![
      uuid(row.id),
      uuid(row.attribute_id),
      text(row.value.as_str()),
      text(to_json(&row.members)?),
      text(to_json(&row.metadata)?),
    ],
  )?;
  Ok(())
}

impl SqliteStore {
  async fn list_values_where(
    &self,
    filters: Vec<String>,
    args: Args,
  ) -> Result<Vec<Value>> {
    let sql = format!(
      "{} {} ORDER BY v.rowid",
      value_select(),
      where_clause(&filters)
    );
    let raws = self
      .read(move |conn| Ok(query(conn, &sql, args, RawValue::from_row)?))
      .await?;
    raws.into_iter().map(RawValue::into_value).collect()
  }
}

impl AttributeValueStore for SqliteStore {
  async fn create_value(&self, input: NewValue) -> Result<Value> {
    validate_segment("attribute value", &input.value)?;

    let row = NewValueRow {
      id:           Uuid::new_v4(),
      attribute_id: input.attribute_id,
      value:        input.value,
      members:      input.members,
      metadata:     Metadata::new(input.metadata, Utc::now()),
    };
    let id = row.id;
    self.write(move |tx| insert_value(tx, &row)).await?;

    self.refresh_fqn(FqnTarget::value(id)).await;
    self.get_value(id).await
  }

  async fn get_value(&self, id: Uuid) -> Result<Value> {
    let id_str = encode_uuid(id);
    let raw = self
      .read(move |conn| Ok(select_value(conn, &id_str)?))
      .await?;
    raw.into_value()
  }

  async fn list_values(
    &self,
    attribute_id: Uuid,
    state: ActiveState,
  ) -> Result<Vec<Value>> {
    let mut filters = vec!["v.attribute_definition_id = ?1".to_string()];
    filters.extend(state_filter(state, "v.active"));
    self.list_values_where(filters, vec![uuid(attribute_id)]).await
  }

  async fn list_all_values(&self, state: ActiveState) -> Result<Vec<Value>> {
    let filters = state_filter(state, "v.active").into_iter().collect();
    self.list_values_where(filters, Vec::new()).await
  }

  async fn update_value(&self, id: Uuid, update: ValueUpdate) -> Result<Value> {
    if update.is_empty() {
      return self.get_value(id).await;
    }

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        let metadata = next_metadata(
          tx,
          "attribute_values",
          &id_str,
          update.metadata.as_ref(),
          Utc::now(),
        )?;
        let members = match &update.members {
          Some(members) => {
            let attribute_id: String = query_row(
              tx,
              "SELECT attribute_definition_id FROM attribute_values
               WHERE id = ?1",
              vec![text(id_str.as_str())],
              |row| row.get(0),
            )?;
            check_members(tx, &attribute_id, &id_str, members)?;
            Some(text(to_json(members)?))
          }
          None => None,
        };
        Update::new("attribute_values")
          .set("metadata", text(metadata))
          .set_opt("members", members)
          .execute(tx, &id_str)?;
        Ok(())
      })
      .await?;

    self.refresh_fqn(FqnTarget::value(id)).await;
    self.get_value(id).await
  }

  async fn deactivate_value(&self, id: Uuid) -> Result<Value> {
    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        exec_one(
          tx,
          "UPDATE attribute_values SET active = 0 WHERE id = ?1",
          vec![text(id_str)],
        )?;
        Ok(())
      })
      .await?;

    info!(%id, "deactivated attribute value");
    self.get_value(id).await
  }

  async fn delete_value(&self, id: Uuid) -> Result<Value> {
    let id_str = encode_uuid(id);
    let raw = self
      .write(move |tx| {
        let raw = select_value(tx, &id_str)?;
        exec_one(
          tx,
          "DELETE FROM attribute_values WHERE id = ?1",
          vec![text(id_str)],
        )?;
        Ok(raw)
      })
      .await?;
    raw.into_value()
  }

  async fn assign_value_kas(&self, value_id: Uuid, kas_id: Uuid) -> Result<KasGrant> {
    self
      .write(move |tx| {
        exec(
          tx,
          "INSERT INTO attribute_value_key_access_grants
             (attribute_value_id, key_access_server_id)
           VALUES (?1, ?2)",
          vec![uuid(value_id), uuid(kas_id)],
        )?;
        Ok(())
      })
      .await?;
    Ok(KasGrant { target_id: value_id, kas_id })
  }

  async fn remove_value_kas(&self, value_id: Uuid, kas_id: Uuid) -> Result<KasGrant> {
    self
      .write(move |tx| {
        match exec(
          tx,
          "DELETE FROM attribute_value_key_access_grants
           WHERE attribute_value_id = ?1 AND key_access_server_id = ?2",
          vec![uuid(value_id), uuid(kas_id)],
        )? {
          0 => Err(reject(tenet_core::Error::NotFound(format!(
            "grant of kas {kas_id} to value {value_id}"
          )))),
          _ => Ok(()),
        }
      })
      .await?;
    Ok(KasGrant { target_id: value_id, kas_id })
  }
}
