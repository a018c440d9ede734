//! Raw row types and their decoding into domain records.
//!
//! Connection closures only copy columns out into these structs; decoding
//! (UUIDs, JSON documents, enum names) happens afterwards so failures are
//! reported through the crate's own [`Error`]. UUIDs are stored as
//! hyphenated lowercase strings, `active` as `0`/`1`, and structured fields
//! as compact JSON.

use rusqlite::Row;
use serde::Deserialize;
use tenet_core::{
  attribute::{Attribute, AttributeRule, Value},
  enums::{ActiveState, WireEnum},
  fqn::IndexedFqn,
  kas::{KasGrants, KasRef, KeyAccessServer},
  mapping::{
    Action, ResourceMapping, ResourceMappingGroup, SubjectConditionSet,
    SubjectMapping, SubjectSet, ValueRef,
  },
  metadata::Metadata,
  namespace::{Namespace, NamespaceRef},
};
use uuid::Uuid;

use crate::Result;

// ─── Primitives ──────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_json<'a, T: Deserialize<'a>>(s: &'a str) -> Result<T> {
  Ok(serde_json::from_str(s)?)
}

// ─── JSON projections ────────────────────────────────────────────────────────

/// A KAS row as projected by `json_object(...)`.
pub const KAS_JSON: &str = "json_object(
  'id', k.id,
  'uri', k.uri,
  'public_key', json(k.public_key),
  'metadata', json(k.metadata))";

/// The value snapshot embedded in mapping rows; expects `v` and `vf`.
pub const VALUE_REF_JSON: &str = "json_object(
  'id', v.id,
  'value', v.value,
  'members', json(v.members),
  'fqn', vf.fqn,
  'active', json(iif(v.active, 'true', 'false')))";

/// A value as embedded in an attribute row.
#[derive(Deserialize)]
struct ValueDoc {
  seq:          i64,
  id:           Uuid,
  attribute_id: Uuid,
  value:        String,
  #[serde(default)]
  members:      Vec<Uuid>,
  active:       bool,
  metadata:     Metadata,
  fqn:          Option<String>,
  #[serde(default)]
  grants:       Vec<KeyAccessServer>,
}

impl ValueDoc {
  fn into_value(self) -> Value {
    Value {
      id:               self.id,
      attribute_id:     self.attribute_id,
      value:            self.value,
      members:          self.members,
      grants:           self.grants,
      fqn:              self.fqn,
      active:           self.active,
      metadata:         self.metadata,
      subject_mappings: Vec::new(),
    }
  }
}

// ─── Namespace ───────────────────────────────────────────────────────────────

pub struct RawNamespace {
  pub id:       String,
  pub name:     String,
  pub active:   bool,
  pub metadata: String,
  pub fqn:      Option<String>,
}

impl RawNamespace {
  /// Columns: `id, name, active, metadata, fqn`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:       row.get(0)?,
      name:     row.get(1)?,
      active:   row.get(2)?,
      metadata: row.get(3)?,
      fqn:      row.get(4)?,
    })
  }

  pub fn into_namespace(self) -> Result<Namespace> {
    Ok(Namespace {
      id:       decode_uuid(&self.id)?,
      name:     self.name,
      fqn:      self.fqn,
      active:   self.active,
      metadata: decode_json(&self.metadata)?,
    })
  }
}

// ─── Attribute ───────────────────────────────────────────────────────────────

pub struct RawAttribute {
  pub id:             String,
  pub name:           String,
  pub rule:           String,
  pub active:         bool,
  pub metadata:       String,
  pub namespace_id:   String,
  pub namespace_name: String,
  pub namespace_fqn:  Option<String>,
  pub fqn:            Option<String>,
  pub values:         String,
  pub grants:         String,
}

impl RawAttribute {
  /// Columns: `id, name, rule, active, metadata, namespace id, namespace
  /// name, namespace fqn, fqn, values json, grants json`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:             row.get(0)?,
      name:           row.get(1)?,
      rule:           row.get(2)?,
      active:         row.get(3)?,
      metadata:       row.get(4)?,
      namespace_id:   row.get(5)?,
      namespace_name: row.get(6)?,
      namespace_fqn:  row.get(7)?,
      fqn:            row.get(8)?,
      values:         row.get(9)?,
      grants:         row.get(10)?,
    })
  }

  pub fn into_attribute(self) -> Result<Attribute> {
    let mut docs: Vec<ValueDoc> = decode_json(&self.values)?;
    docs.sort_by_key(|d| d.seq);

    Ok(Attribute {
      id:        decode_uuid(&self.id)?,
      namespace: NamespaceRef {
        id:   decode_uuid(&self.namespace_id)?,
        name: self.namespace_name,
        fqn:  self.namespace_fqn,
      },
      name:      self.name,
      rule:      AttributeRule::from_stored(&self.rule)?,
      values:    docs.into_iter().map(ValueDoc::into_value).collect(),
      grants:    decode_json(&self.grants)?,
      fqn:       self.fqn,
      active:    self.active,
      metadata:  decode_json(&self.metadata)?,
    })
  }

  /// Decode, keeping only the embedded values admitted by `state`.
  pub fn into_filtered(self, state: ActiveState) -> Result<Attribute> {
    let mut attribute = self.into_attribute()?;
    attribute.values.retain(|v| state.admits(v.active));
    Ok(attribute)
  }
}

// ─── Value ───────────────────────────────────────────────────────────────────

pub struct RawValue {
  pub id:           String,
  pub attribute_id: String,
  pub value:        String,
  pub members:      String,
  pub active:       bool,
  pub metadata:     String,
  pub fqn:          Option<String>,
  pub grants:       String,
}

impl RawValue {
  /// Columns: `id, attribute id, value, members, active, metadata, fqn,
  /// grants json`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      attribute_id: row.get(1)?,
      value:        row.get(2)?,
      members:      row.get(3)?,
      active:       row.get(4)?,
      metadata:     row.get(5)?,
      fqn:          row.get(6)?,
      grants:       row.get(7)?,
    })
  }

  pub fn into_value(self) -> Result<Value> {
    Ok(Value {
      id:               decode_uuid(&self.id)?,
      attribute_id:     decode_uuid(&self.attribute_id)?,
      value:            self.value,
      members:          decode_json(&self.members)?,
      grants:           decode_json(&self.grants)?,
      fqn:              self.fqn,
      active:           self.active,
      metadata:         decode_json(&self.metadata)?,
      subject_mappings: Vec::new(),
    })
  }
}

// ─── KAS ─────────────────────────────────────────────────────────────────────

pub struct RawKas {
  pub id:         String,
  pub uri:        String,
  pub public_key: String,
  pub metadata:   String,
}

impl RawKas {
  /// Columns: `id, uri, public_key, metadata`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      uri:        row.get(1)?,
      public_key: row.get(2)?,
      metadata:   row.get(3)?,
    })
  }

  pub fn into_kas(self) -> Result<KeyAccessServer> {
    Ok(KeyAccessServer {
      id:         decode_uuid(&self.id)?,
      uri:        self.uri,
      public_key: decode_json(&self.public_key)?,
      metadata:   decode_json(&self.metadata)?,
    })
  }
}

pub struct RawKasGrants {
  pub id:         String,
  pub uri:        String,
  pub attributes: String,
  pub values:     String,
}

impl RawKasGrants {
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:         row.get(0)?,
      uri:        row.get(1)?,
      attributes: row.get(2)?,
      values:     row.get(3)?,
    })
  }

  pub fn into_grants(self) -> Result<KasGrants> {
    let attribute_grants: Vec<IndexedFqn> = decode_json(&self.attributes)?;
    let value_grants: Vec<IndexedFqn> = decode_json(&self.values)?;
    Ok(KasGrants {
      key_access_server: KasRef { id: decode_uuid(&self.id)?, uri: self.uri },
      attribute_grants,
      value_grants,
    })
  }
}

// ─── Mappings ────────────────────────────────────────────────────────────────

pub struct RawResourceMappingGroup {
  pub id:           String,
  pub namespace_id: String,
  pub name:         String,
}

impl RawResourceMappingGroup {
  /// Columns: `id, namespace_id, name`.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:           row.get(0)?,
      namespace_id: row.get(1)?,
      name:         row.get(2)?,
    })
  }

  pub fn into_group(self) -> Result<ResourceMappingGroup> {
    Ok(ResourceMappingGroup {
      id:           decode_uuid(&self.id)?,
      namespace_id: decode_uuid(&self.namespace_id)?,
      name:         self.name,
    })
  }
}

pub struct RawResourceMapping {
  pub id:       String,
  pub terms:    String,
  pub metadata: String,
  pub value:    String,
  pub group:    Option<RawResourceMappingGroup>,
}

impl RawResourceMapping {
  /// Columns: `id, terms, metadata, value ref json`, then the group's
  /// `id, namespace_id, name`, all null for an ungrouped mapping.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    let group_id: Option<String> = row.get(4)?;
    let group = match group_id {
      Some(id) => Some(RawResourceMappingGroup {
        id,
        namespace_id: row.get(5)?,
        name: row.get(6)?,
      }),
      None => None,
    };
    Ok(Self {
      id: row.get(0)?,
      terms: row.get(1)?,
      metadata: row.get(2)?,
      value: row.get(3)?,
      group,
    })
  }

  pub fn into_mapping(self) -> Result<ResourceMapping> {
    Ok(ResourceMapping {
      id:              decode_uuid(&self.id)?,
      attribute_value: decode_json::<ValueRef>(&self.value)?,
      terms:           decode_json(&self.terms)?,
      group:           self
        .group
        .map(RawResourceMappingGroup::into_group)
        .transpose()?,
      metadata:        decode_json(&self.metadata)?,
    })
  }
}

pub struct RawConditionSet {
  pub id:        String,
  pub name:      Option<String>,
  pub condition: String,
  pub metadata:  String,
}

impl RawConditionSet {
  /// Columns starting at `offset`: `id, name, condition, metadata`.
  pub fn from_row_at(row: &Row<'_>, offset: usize) -> rusqlite::Result<Self> {
    Ok(Self {
      id:        row.get(offset)?,
      name:      row.get(offset + 1)?,
      condition: row.get(offset + 2)?,
      metadata:  row.get(offset + 3)?,
    })
  }

  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Self::from_row_at(row, 0)
  }

  pub fn into_condition_set(self) -> Result<SubjectConditionSet> {
    let subject_sets: Vec<SubjectSet> = decode_json(&self.condition)?;
    Ok(SubjectConditionSet {
      id: decode_uuid(&self.id)?,
      name: self.name,
      subject_sets,
      metadata: decode_json(&self.metadata)?,
    })
  }
}

pub struct RawSubjectMapping {
  pub id:            String,
  pub actions:       String,
  pub metadata:      String,
  pub value:         String,
  pub condition_set: RawConditionSet,
}

impl RawSubjectMapping {
  /// Columns: `id, actions, metadata, value ref json`, then the condition
  /// set columns.
  pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id:            row.get(0)?,
      actions:       row.get(1)?,
      metadata:      row.get(2)?,
      value:         row.get(3)?,
      condition_set: RawConditionSet::from_row_at(row, 4)?,
    })
  }

  pub fn into_mapping(self) -> Result<SubjectMapping> {
    let actions: Vec<Action> = decode_json(&self.actions)?;
    Ok(SubjectMapping {
      id: decode_uuid(&self.id)?,
      attribute_value: decode_json(&self.value)?,
      subject_condition_set: self.condition_set.into_condition_set()?,
      actions,
      metadata: decode_json(&self.metadata)?,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const METADATA: &str = r#"{"created_at":"2024-01-01T00:00:00Z","updated_at":"2024-01-01T00:00:00Z","labels":{},"description":""}"#;

  #[test]
  fn embedded_values_are_sorted_by_sequence() {
    let attribute_id = Uuid::new_v4();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    let values = format!(
      r#"[
        {{"seq":7,"id":"{second}","attribute_id":"{attribute_id}","value":"SECOND","members":[],"active":false,"metadata":{METADATA},"fqn":null,"grants":[]}},
        {{"seq":3,"id":"{first}","attribute_id":"{attribute_id}","value":"FIRST","members":[],"active":true,"metadata":{METADATA},"fqn":null,"grants":[]}}
      ]"#
    );
    let raw = RawAttribute {
      id: encode_uuid(attribute_id),
      name: "level".into(),
      rule: "HIERARCHY".into(),
      active: true,
      metadata: METADATA.into(),
      namespace_id: encode_uuid(Uuid::new_v4()),
      namespace_name: "a.io".into(),
      namespace_fqn: Some("https://a.io".into()),
      fqn: Some("https://a.io/attr/level".into()),
      values,
      grants: "[]".into(),
    };

    let attribute = raw.into_attribute().unwrap();
    let names: Vec<_> =
      attribute.values.iter().map(|v| v.value.as_str()).collect();
    assert_eq!(names, ["FIRST", "SECOND"]);
    assert_eq!(attribute.rule, AttributeRule::Hierarchy);
    assert!(!attribute.values[1].active);
  }

  #[test]
  fn unknown_stored_rule_is_rejected() {
    let raw = RawAttribute {
      id: encode_uuid(Uuid::new_v4()),
      name: "level".into(),
      rule: "SOMETIMES".into(),
      active: true,
      metadata: METADATA.into(),
      namespace_id: encode_uuid(Uuid::new_v4()),
      namespace_name: "a.io".into(),
      namespace_fqn: None,
      fqn: None,
      values: "[]".into(),
      grants: "[]".into(),
    };
    assert!(raw.into_attribute().is_err());
  }
}
