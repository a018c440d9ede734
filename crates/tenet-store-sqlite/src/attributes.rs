//! Attribute definitions and the composite attribute projection.

use std::collections::BTreeMap;

use chrono::Utc;
use rusqlite::Connection;
use tenet_core::{
  attribute::{
    Attribute, AttributeAndValue, AttributeQuery, FqnMatch, NamespaceSelector,
    NewAttribute,
  },
  enums::{ActiveState, WireEnum},
  fqn::{Fqn, FqnTarget, validate_segment},
  kas::KasGrant,
  metadata::{Metadata, MetadataUpdate},
  store::AttributeStore,
};
use tracing::info;
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  db::{
    Args, exec, exec_one, next_metadata, query, query_row, reject, state_filter,
    text, to_json, uuid, where_clause,
  },
  encode::{KAS_JSON, RawAttribute, RawSubjectMapping, decode_uuid, encode_uuid},
  fqn::lookup,
  subject_mappings::select_mappings_for_value,
  values::{NewValueRow, insert_value},
};

/// One row per attribute with its namespace, FQN, values (each with its
/// grants) and definition-level grants folded into JSON columns.
fn attribute_select() -> String {
  format!(
    "SELECT a.id, a.name, a.rule, a.active, a.metadata,
            n.id, n.name, nf.fqn,
            af.fqn,
            (SELECT json_group_array(json_object(
                      'seq', v.rowid,
                      'id', v.id,
                      'attribute_id', v.attribute_definition_id,
                      'value', v.value,
                      'members', json(v.members),
                      'active', json(iif(v.active, 'true', 'false')),
                      'metadata', json(v.metadata),
                      'fqn', vf.fqn,
                      'grants', json((
                        SELECT json_group_array({KAS_JSON})
                        FROM attribute_value_key_access_grants g
                        JOIN key_access_servers k ON k.id = g.key_access_server_id
                        WHERE g.attribute_value_id = v.id))))
             FROM attribute_values v
             LEFT JOIN attribute_fqns vf ON vf.value_id = v.id
             WHERE v.attribute_definition_id = a.id),
            (SELECT json_group_array({KAS_JSON})
             FROM attribute_definition_key_access_grants g
             JOIN key_access_servers k ON k.id = g.key_access_server_id
             WHERE g.attribute_definition_id = a.id)
     FROM attribute_definitions a
     JOIN attribute_namespaces n ON n.id = a.namespace_id
     LEFT JOIN attribute_fqns nf
       ON nf.namespace_id = n.id AND nf.attribute_id IS NULL AND nf.value_id IS NULL
     LEFT JOIN attribute_fqns af
       ON af.attribute_id = a.id AND af.value_id IS NULL"
  )
}

pub(crate) fn select_attribute(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<RawAttribute> {
  query_row(
    conn,
    &format!("{} WHERE a.id = ?1", attribute_select()),
    vec![text(id)],
    RawAttribute::from_row,
  )
}

/// Resolve an FQN row to its attribute, and the value id when the row is
/// value-shaped.
fn select_by_fqn(
  conn: &Connection,
  fqn: &str,
) -> rusqlite::Result<(RawAttribute, Option<String>)> {
  let (attribute_id, value_id) = lookup(conn, fqn)?;
  let attribute_id = attribute_id.ok_or(rusqlite::Error::QueryReturnedNoRows)?;
  Ok((select_attribute(conn, &attribute_id)?, value_id))
}

fn not_found(what: String) -> crate::Error {
  tenet_core::Error::NotFound(what).into()
}

impl AttributeStore for SqliteStore {
  async fn create_attribute(&self, input: NewAttribute) -> Result<Attribute> {
    validate_segment("attribute name", &input.name)?;
    for value in &input.values {
      validate_segment("attribute value", value)?;
    }

    let id = Uuid::new_v4();
    let now = Utc::now();
    let metadata = Metadata::new(input.metadata, now);
    let values: Vec<NewValueRow> = input
      .values
      .into_iter()
      .map(|value| NewValueRow {
        id: Uuid::new_v4(),
        attribute_id: id,
        value,
        members: Vec::new(),
        metadata: Metadata::new(None, now),
      })
      .collect();
    let value_ids: Vec<Uuid> = values.iter().map(|v| v.id).collect();

    let args: Args = vec![
      uuid(id),
      uuid(input.namespace_id),
      text(input.name),
      text(input.rule.stored_name()),
    ];
    self
      .write(move |tx| {
        let mut args = args;
        args.push(text(to_json(&metadata)?));
        exec(
          tx,
          "INSERT INTO attribute_definitions (id, namespace_id, name, rule, active, metadata)
           VALUES (?1, ?2, ?3, ?4, 1, ?5)",
          args,
        )?;
        for value in &values {
          insert_value(tx, value)?;
        }
        Ok(())
      })
      .await?;

    self.refresh_fqn(FqnTarget::attribute(id)).await;
    for value_id in value_ids {
      self.refresh_fqn(FqnTarget::value(value_id)).await;
    }
    self.get_attribute(id).await
  }

  async fn get_attribute(&self, id: Uuid) -> Result<Attribute> {
    let id_str = encode_uuid(id);
    let raw = self
      .read(move |conn| Ok(select_attribute(conn, &id_str)?))
      .await?;
    raw.into_attribute()
  }

  async fn get_attribute_by_fqn(&self, fqn: String) -> Result<FqnMatch> {
    let parsed: Fqn = fqn.parse()?;
    if parsed.attribute().is_none() {
      return Err(
        tenet_core::Error::Validation(format!(
          "{fqn:?} names a namespace, not an attribute or value"
        ))
        .into(),
      );
    }

    let lookup_fqn = fqn.clone();
    let (raw, value_id, raw_mappings) = self
      .read(move |conn| {
        let (raw, value_id) = select_by_fqn(conn, &lookup_fqn)?;
        let mappings: Vec<RawSubjectMapping> = match &value_id {
          Some(value_id) => select_mappings_for_value(conn, value_id)?,
          None => Vec::new(),
        };
        Ok((raw, value_id, mappings))
      })
      .await?;

    let attribute = raw.into_attribute()?;
    let Some(value_id) = value_id else {
      return Ok(FqnMatch { attribute, selected_value: None });
    };

    let value_id = decode_uuid(&value_id)?;
    let mut selected = attribute
      .values
      .iter()
      .find(|v| v.id == value_id)
      .cloned()
      .ok_or_else(|| not_found(fqn))?;
    selected.subject_mappings = raw_mappings
      .into_iter()
      .map(RawSubjectMapping::into_mapping)
      .collect::<Result<_>>()?;

    Ok(FqnMatch { attribute, selected_value: Some(selected) })
  }

  async fn get_attributes_by_value_fqns(
    &self,
    fqns: Vec<String>,
  ) -> Result<BTreeMap<String, AttributeAndValue>> {
    for fqn in &fqns {
      let parsed: Fqn = fqn.parse()?;
      if parsed.value().is_none() {
        return Err(tenet_core::Error::FqnMissingValue(fqn.clone()).into());
      }
    }

    let rows = self
      .read(move |conn| {
        fqns
          .into_iter()
          .map(|fqn| {
            let (raw, value_id) = select_by_fqn(conn, &fqn)?;
            Ok((fqn, raw, value_id))
          })
          .collect::<tokio_rusqlite::Result<Vec<_>>>()
      })
      .await?;

    let mut out = BTreeMap::new();
    for (fqn, raw, value_id) in rows {
      let attribute = raw.into_attribute()?;
      let value_id = value_id
        .map(|id| decode_uuid(&id))
        .transpose()?
        .ok_or_else(|| not_found(fqn.clone()))?;
      let value = attribute
        .values
        .iter()
        .find(|v| v.id == value_id)
        .cloned()
        .ok_or_else(|| not_found(fqn.clone()))?;
      out.insert(fqn, AttributeAndValue { attribute, value });
    }
    Ok(out)
  }

  async fn list_attributes(&self, query_: AttributeQuery) -> Result<Vec<Attribute>> {
    let mut filters: Vec<String> =
      state_filter(query_.state, "a.active").into_iter().collect();
    let mut args: Args = Vec::new();
    match query_.namespace {
      Some(NamespaceSelector::Id(id)) => {
        filters.push("a.namespace_id = ?1".into());
        args.push(uuid(id));
      }
      Some(NamespaceSelector::Name(name)) => {
        filters.push("n.name = ?1".into());
        args.push(text(name));
      }
      None => {}
    }
    let sql = format!(
      "{} {} ORDER BY a.rowid",
      attribute_select(),
      where_clause(&filters)
    );

    let raws = self
      .read(move |conn| Ok(query(conn, &sql, args, RawAttribute::from_row)?))
      .await?;
    raws
      .into_iter()
      .map(|raw| raw.into_filtered(query_.state))
      .collect()
  }

  async fn list_attributes_by_namespace(
    &self,
    namespace_id: Uuid,
    state: ActiveState,
  ) -> Result<Vec<Attribute>> {
    self
      .list_attributes(AttributeQuery {
        state,
        namespace: Some(NamespaceSelector::Id(namespace_id)),
      })
      .await
  }

  async fn update_attribute(
    &self,
    id: Uuid,
    metadata: Option<MetadataUpdate>,
  ) -> Result<Attribute> {
    let Some(update) = metadata else {
      return self.get_attribute(id).await;
    };

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        let next = next_metadata(
          tx,
          "attribute_definitions",
          &id_str,
          Some(&update),
          Utc::now(),
        )?;
        exec_one(
          tx,
          "UPDATE attribute_definitions SET metadata = ?1 WHERE id = ?2",
          vec![text(next), text(id_str)],
        )?;
        Ok(())
      })
      .await?;

    self.refresh_fqn(FqnTarget::attribute(id)).await;
    self.get_attribute(id).await
  }

  async fn deactivate_attribute(&self, id: Uuid) -> Result<Attribute> {
    let id_str = encode_uuid(id);
    let values = self
      .write(move |tx| {
        exec_one(
          tx,
          "UPDATE attribute_definitions SET active = 0 WHERE id = ?1",
          vec![text(id_str.as_str())],
        )?;
        Ok(exec(
          tx,
          "UPDATE attribute_values SET active = 0 WHERE attribute_definition_id = ?1",
          vec![text(id_str)],
        )?)
      })
      .await?;

    info!(%id, values, "deactivated attribute");
    self.get_attribute(id).await
  }

  async fn delete_attribute(&self, id: Uuid) -> Result<Attribute> {
    let id_str = encode_uuid(id);
    let raw = self
      .write(move |tx| {
        let raw = select_attribute(tx, &id_str)?;
        exec_one(
          tx,
          "DELETE FROM attribute_definitions WHERE id = ?1",
          vec![text(id_str)],
        )?;
        Ok(raw)
      })
      .await?;
    raw.into_attribute()
  }

  async fn assign_attribute_kas(
    &self,
    attribute_id: Uuid,
    kas_id: Uuid,
  ) -> Result<KasGrant> {
    self
      .write(move |tx| {
        exec(
          tx,
          "INSERT INTO attribute_definition_key_access_grants
             (attribute_definition_id, key_access_server_id)
           VALUES (?1, ?2)",
          vec![uuid(attribute_id), uuid(kas_id)],
        )?;
        Ok(())
      })
      .await?;
    Ok(KasGrant { target_id: attribute_id, kas_id })
  }

  async fn remove_attribute_kas(
    &self,
    attribute_id: Uuid,
    kas_id: Uuid,
  ) -> Result<KasGrant> {
    self
      .write(move |tx| {
        match exec(
          tx,
          "DELETE FROM attribute_definition_key_access_grants
           WHERE attribute_definition_id = ?1 AND key_access_server_id = ?2",
          vec![uuid(attribute_id), uuid(kas_id)],
        )? {
          0 => Err(reject(tenet_core::Error::NotFound(format!(
            "grant of kas {kas_id} to attribute {attribute_id}"
          )))),
          _ => Ok(()),
        }
      })
      .await?;
    Ok(KasGrant { target_id: attribute_id, kas_id })
  }
}
