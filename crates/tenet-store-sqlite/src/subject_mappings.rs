//! Subject mappings and the condition sets they reference.
//!
//! A mapping always points at exactly one condition set through
//! `subject_mappings.subject_condition_set_id`; the pivot table mirrors that
//! link so a set can be asked which mappings use it. Both are written in the
//! same transaction.

use std::collections::BTreeSet;

use chrono::Utc;
use rusqlite::Connection;
use tenet_core::{
  mapping::{
    Action, NewSubjectConditionSet, NewSubjectMapping, SubjectConditionSet,
    SubjectConditionSetUpdate, SubjectMapping, SubjectMappingUpdate,
    SubjectProperty, SubjectSet,
  },
  metadata::Metadata,
  store::SubjectMappingStore,
};
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
  Result, SqliteStore,
  db::{Update, exec, exec_one, next_metadata, query, query_row, text, to_json, uuid},
  encode::{RawConditionSet, RawSubjectMapping, VALUE_REF_JSON, encode_uuid},
};

const CONDITION_SET_SELECT: &str =
  "SELECT s.id, s.name, s.condition, s.metadata FROM subject_condition_set s";

fn mapping_select() -> String {
  format!(
    "SELECT m.id, m.actions, m.metadata, {VALUE_REF_JSON},
            s.id, s.name, s.condition, s.metadata
     FROM subject_mappings m
     JOIN attribute_values v ON v.id = m.attribute_value_id
     LEFT JOIN attribute_fqns vf ON vf.value_id = v.id
     JOIN subject_condition_set s ON s.id = m.subject_condition_set_id"
  )
}

fn select_mapping(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<RawSubjectMapping> {
  query_row(
    conn,
    &format!("{} WHERE m.id = ?1", mapping_select()),
    vec![text(id)],
    RawSubjectMapping::from_row,
  )
}

/// Every mapping on one value, in creation order.
pub(crate) fn select_mappings_for_value(
  conn: &Connection,
  value_id: &str,
) -> rusqlite::Result<Vec<RawSubjectMapping>> {
  query(
    conn,
    &format!("{} WHERE m.attribute_value_id = ?1 ORDER BY m.rowid", mapping_select()),
    vec![text(value_id)],
    RawSubjectMapping::from_row,
  )
}

fn select_condition_set(
  conn: &Connection,
  id: &str,
) -> rusqlite::Result<RawConditionSet> {
  query_row(
    conn,
    &format!("{CONDITION_SET_SELECT} WHERE s.id = ?1"),
    vec![text(id)],
    RawConditionSet::from_row,
  )
}

fn insert_condition_set(
  conn: &Connection,
  id: Uuid,
  input: NewSubjectConditionSet,
) -> Result<(), tokio_rusqlite::Error> {
  let metadata = Metadata::new(input.metadata, Utc::now());
  exec(
    conn,
    "INSERT INTO subject_condition_set (id, name, condition, metadata)
     VALUES (?1, ?2, ?3, ?4)",
    vec![
      uuid(id),
      input.name.map_or(rusqlite::types::Value::Null, text),
      text(to_json(&input.subject_sets)?),
      text(to_json(&metadata)?),
    ],
  )?;
  Ok(())
}

fn link(
  conn: &Connection,
  mapping_id: &str,
  set_id: &str,
) -> rusqlite::Result<()> {
  exec(
    conn,
    "DELETE FROM subject_mapping_condition_set_pivot WHERE subject_mapping_id = ?1",
    vec![text(mapping_id)],
  )?;
  exec(
    conn,
    "INSERT INTO subject_mapping_condition_set_pivot
       (subject_mapping_id, subject_condition_set_id)
     VALUES (?1, ?2)",
    vec![text(mapping_id), text(set_id)],
  )?;
  Ok(())
}

fn require_actions(actions: &[Action]) -> Result<()> {
  if actions.is_empty() {
    return Err(
      tenet_core::Error::Validation("subject mapping actions are required".into())
        .into(),
    );
  }
  Ok(())
}

fn require_subject_sets(sets: &[SubjectSet]) -> Result<()> {
  if sets.is_empty() {
    return Err(
      tenet_core::Error::Validation(
        "a subject condition set needs at least one subject set".into(),
      )
      .into(),
    );
  }
  Ok(())
}

/// Where a new mapping's condition set comes from.
enum ConditionSetSource {
  Existing(Uuid),
  New(NewSubjectConditionSet),
}

fn decode_mappings(raws: Vec<RawSubjectMapping>) -> Result<Vec<SubjectMapping>> {
  raws.into_iter().map(RawSubjectMapping::into_mapping).collect()
}

impl SubjectMappingStore for SqliteStore {
  async fn create_subject_mapping(
    &self,
    input: NewSubjectMapping,
  ) -> Result<SubjectMapping> {
    require_actions(&input.actions)?;
    let source = match (
      input.existing_subject_condition_set_id,
      input.new_subject_condition_set,
    ) {
      (Some(existing), _) => ConditionSetSource::Existing(existing),
      (None, Some(new)) => {
        require_subject_sets(&new.subject_sets)?;
        ConditionSetSource::New(new)
      }
      (None, None) => {
        return Err(
          tenet_core::Error::Validation(
            "either an existing or a new subject condition set is required".into(),
          )
          .into(),
        );
      }
    };

    let id = Uuid::new_v4();
    let metadata = Metadata::new(input.metadata, Utc::now());
    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        let set_id = match source {
          ConditionSetSource::Existing(existing) => existing,
          ConditionSetSource::New(new) => {
            let set_id = Uuid::new_v4();
            insert_condition_set(tx, set_id, new)?;
            set_id
          }
        };
        let set_id = encode_uuid(set_id);
        exec(
          tx,
          "INSERT INTO subject_mappings
             (id, attribute_value_id, subject_condition_set_id, actions, metadata)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          vec![
            text(id_str.as_str()),
            uuid(input.attribute_value_id),
            text(set_id.as_str()),
            text(to_json(&input.actions)?),
            text(to_json(&metadata)?),
          ],
        )?;
        link(tx, &id_str, &set_id)?;
        Ok(())
      })
      .await?;

    self.get_subject_mapping(id).await
  }

  async fn get_subject_mapping(&self, id: Uuid) -> Result<SubjectMapping> {
    let id_str = encode_uuid(id);
    let raw = self
      .read(move |conn| Ok(select_mapping(conn, &id_str)?))
      .await?;
    raw.into_mapping()
  }

  async fn list_subject_mappings(&self) -> Result<Vec<SubjectMapping>> {
    let sql = format!("{} ORDER BY m.rowid", mapping_select());
    let raws = self
      .read(move |conn| {
        Ok(query(conn, &sql, Vec::new(), RawSubjectMapping::from_row)?)
      })
      .await?;
    decode_mappings(raws)
  }

  async fn update_subject_mapping(
    &self,
    id: Uuid,
    update: SubjectMappingUpdate,
  ) -> Result<SubjectMapping> {
    if update.is_empty() {
      return self.get_subject_mapping(id).await;
    }
    if let Some(actions) = &update.actions {
      require_actions(actions)?;
    }

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        let metadata = next_metadata(
          tx,
          "subject_mappings",
          &id_str,
          update.metadata.as_ref(),
          Utc::now(),
        )?;
        let actions = update.actions.as_ref().map(to_json).transpose()?;
        Update::new("subject_mappings")
          .set("metadata", text(metadata))
          .set_opt("subject_condition_set_id", update.subject_condition_set_id.map(uuid))
          .set_opt("actions", actions.map(text))
          .execute(tx, &id_str)?;
        if let Some(set_id) = update.subject_condition_set_id {
          link(tx, &id_str, &encode_uuid(set_id))?;
        }
        Ok(())
      })
      .await?;

    self.get_subject_mapping(id).await
  }

  async fn delete_subject_mapping(&self, id: Uuid) -> Result<SubjectMapping> {
    let id_str = encode_uuid(id);
    let raw = self
      .write(move |tx| {
        let raw = select_mapping(tx, &id_str)?;
        exec_one(
          tx,
          "DELETE FROM subject_mappings WHERE id = ?1",
          vec![text(id_str)],
        )?;
        Ok(raw)
      })
      .await?;
    raw.into_mapping()
  }

  async fn match_subject_mappings(
    &self,
    properties: Vec<SubjectProperty>,
  ) -> Result<Vec<SubjectMapping>> {
    let fields: BTreeSet<&str> =
      properties.iter().map(|p| p.external_field.as_str()).collect();
    if fields.is_empty() {
      return Ok(Vec::new());
    }

    // Coarse cut in SQL: the whole value chain is active and the condition
    // document names one of the fields. Operators are checked afterwards.
    let sql = format!(
      "{} WHERE v.active = 1
          AND EXISTS (
            SELECT 1 FROM attribute_definitions a
            JOIN attribute_namespaces n ON n.id = a.namespace_id
            WHERE a.id = v.attribute_definition_id AND a.active = 1 AND n.active = 1)
          AND EXISTS (
            SELECT 1 FROM json_tree(s.condition) t
            WHERE t.key = 'subject_external_field'
              AND t.value IN (SELECT value FROM json_each(?1)))
        ORDER BY m.rowid",
      mapping_select()
    );
    let fields = serde_json::to_string(&fields)?;
    let raws = self
      .read(move |conn| {
        Ok(query(conn, &sql, vec![text(fields)], RawSubjectMapping::from_row)?)
      })
      .await?;

    let candidates = raws.len();
    let mut matched = decode_mappings(raws)?;
    matched.retain(|m| m.subject_condition_set.admits_any(&properties));
    debug!(candidates, matched = matched.len(), "matched subject mappings");
    Ok(matched)
  }

  // ── Condition sets ──────────────────────────────────────────────────────

  async fn create_subject_condition_set(
    &self,
    input: NewSubjectConditionSet,
  ) -> Result<SubjectConditionSet> {
    require_subject_sets(&input.subject_sets)?;
    let id = Uuid::new_v4();
    self
      .write(move |tx| insert_condition_set(tx, id, input))
      .await?;
    self.get_subject_condition_set(id).await
  }

  async fn get_subject_condition_set(&self, id: Uuid) -> Result<SubjectConditionSet> {
    let id_str = encode_uuid(id);
    let raw = self
      .read(move |conn| Ok(select_condition_set(conn, &id_str)?))
      .await?;
    raw.into_condition_set()
  }

  async fn list_subject_condition_sets(&self) -> Result<Vec<SubjectConditionSet>> {
    let raws = self
      .read(|conn| {
        Ok(query(
          conn,
          &format!("{CONDITION_SET_SELECT} ORDER BY s.rowid"),
          Vec::new(),
          RawConditionSet::from_row,
        )?)
      })
      .await?;
    raws.into_iter().map(RawConditionSet::into_condition_set).collect()
  }

  async fn update_subject_condition_set(
    &self,
    id: Uuid,
    update: SubjectConditionSetUpdate,
  ) -> Result<SubjectConditionSet> {
    if update.is_empty() {
      return self.get_subject_condition_set(id).await;
    }
    if let Some(sets) = &update.subject_sets {
      require_subject_sets(sets)?;
    }

    let id_str = encode_uuid(id);
    self
      .write(move |tx| {
        let metadata = next_metadata(
          tx,
          "subject_condition_set",
          &id_str,
          update.metadata.as_ref(),
          Utc::now(),
        )?;
        let condition = update.subject_sets.as_ref().map(to_json).transpose()?;
        Update::new("subject_condition_set")
          .set("metadata", text(metadata))
          .set_opt("name", update.name.map(text))
          .set_opt("condition", condition.map(text))
          .execute(tx, &id_str)?;
        Ok(())
      })
      .await?;

    self.get_subject_condition_set(id).await
  }

  async fn delete_subject_condition_set(&self, id: Uuid) -> Result<SubjectConditionSet> {
    let id_str = encode_uuid(id);
    let raw = self
      .write(move |tx| {
        let raw = select_condition_set(tx, &id_str)?;
        exec_one(
          tx,
          "DELETE FROM subject_condition_set WHERE id = ?1",
          vec![text(id_str)],
        )?;
        Ok(raw)
      })
      .await?;
    raw.into_condition_set()
  }

  async fn delete_unmapped_subject_condition_sets(
    &self,
  ) -> Result<Vec<SubjectConditionSet>> {
    let raws = self
      .write(|tx| {
        let unmapped = query(
          tx,
          &format!(
            "{CONDITION_SET_SELECT}
             WHERE NOT EXISTS (
               SELECT 1 FROM subject_mappings m WHERE m.subject_condition_set_id = s.id)
             ORDER BY s.rowid"
          ),
          Vec::new(),
          RawConditionSet::from_row,
        )?;
        for set in &unmapped {
          exec(
            tx,
            "DELETE FROM subject_condition_set WHERE id = ?1",
            vec![text(set.id.as_str())],
          )?;
        }
        Ok(unmapped)
      })
      .await?;

    info!(deleted = raws.len(), "deleted unmapped subject condition sets");
    raws.into_iter().map(RawConditionSet::into_condition_set).collect()
  }
}
