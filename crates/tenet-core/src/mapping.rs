//! Resource mappings, subject mappings and subject condition sets.
//!
//! A resource mapping ties free-form terms to an attribute value, optionally
//! filed under a namespace-scoped resource mapping group. A subject
//! mapping ties a subject condition set (a nested predicate over external
//! subject properties) to an attribute value, together with the actions an
//! entitled subject may perform.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString, FromRepr, IntoStaticStr};
use uuid::Uuid;

use crate::{
  enums::WireEnum,
  metadata::{Metadata, MetadataMutable, MetadataUpdate},
};

/// The attribute-value snapshot embedded in a mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRef {
  pub id:      Uuid,
  pub value:   String,
  #[serde(default)]
  pub members: Vec<Uuid>,
  pub fqn:     Option<String>,
  pub active:  bool,
}

// ─── Resource mappings ───────────────────────────────────────────────────────

/// A named bucket of resource mappings inside one namespace, addressed as
/// `https://<namespace>/resm/<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMappingGroup {
  pub id:           Uuid,
  pub namespace_id: Uuid,
  pub name:         String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResourceMappingGroup {
  pub namespace_id: Uuid,
  pub name:         String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMappingGroupUpdate {
  pub namespace_id: Option<Uuid>,
  pub name:         Option<String>,
}

impl ResourceMappingGroupUpdate {
  pub fn is_empty(&self) -> bool {
    self.namespace_id.is_none() && self.name.is_none()
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceMapping {
  pub id:              Uuid,
  pub attribute_value: ValueRef,
  pub terms:           Vec<String>,
  pub group:           Option<ResourceMappingGroup>,
  pub metadata:        Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewResourceMapping {
  pub attribute_value_id: Uuid,
  pub terms:              Vec<String>,
  pub group_id:           Option<Uuid>,
  pub metadata:           Option<MetadataMutable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceMappingUpdate {
  pub attribute_value_id: Option<Uuid>,
  pub terms:              Option<Vec<String>>,
  pub group_id:           Option<Uuid>,
  pub metadata:           Option<MetadataUpdate>,
}

impl ResourceMappingUpdate {
  pub fn is_empty(&self) -> bool {
    self.attribute_value_id.is_none()
      && self.terms.is_none()
      && self.group_id.is_none()
      && self.metadata.is_none()
  }
}

// ─── Condition sets ──────────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  IntoStaticStr,
  EnumString,
  FromRepr,
)]
#[repr(i32)]
pub enum SubjectMappingOperator {
  #[default]
  #[serde(rename = "SUBJECT_MAPPING_OPERATOR_ENUM_UNSPECIFIED")]
  #[strum(serialize = "UNSPECIFIED")]
  Unspecified = 0,
  #[serde(rename = "SUBJECT_MAPPING_OPERATOR_ENUM_IN")]
  #[strum(serialize = "IN")]
  In = 1,
  #[serde(rename = "SUBJECT_MAPPING_OPERATOR_ENUM_NOT_IN")]
  #[strum(serialize = "NOT_IN")]
  NotIn = 2,
  #[serde(rename = "SUBJECT_MAPPING_OPERATOR_ENUM_IN_CONTAINS")]
  #[strum(serialize = "IN_CONTAINS")]
  InContains = 3,
}

impl WireEnum for SubjectMappingOperator {
  const KIND: &'static str = "subject mapping operator";
  const PREFIX: &'static str = "SUBJECT_MAPPING_OPERATOR_ENUM_";

  fn from_number(n: i32) -> Option<Self> { Self::from_repr(n) }
}

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  IntoStaticStr,
  EnumString,
  FromRepr,
)]
#[repr(i32)]
pub enum ConditionBooleanType {
  #[default]
  #[serde(rename = "CONDITION_BOOLEAN_TYPE_ENUM_UNSPECIFIED")]
  #[strum(serialize = "UNSPECIFIED")]
  Unspecified = 0,
  #[serde(rename = "CONDITION_BOOLEAN_TYPE_ENUM_AND")]
  #[strum(serialize = "AND")]
  And = 1,
  #[serde(rename = "CONDITION_BOOLEAN_TYPE_ENUM_OR")]
  #[strum(serialize = "OR")]
  Or = 2,
}

impl WireEnum for ConditionBooleanType {
  const KIND: &'static str = "condition boolean type";
  const PREFIX: &'static str = "CONDITION_BOOLEAN_TYPE_ENUM_";

  fn from_number(n: i32) -> Option<Self> { Self::from_repr(n) }
}

/// A single predicate over one external subject field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Condition {
  pub subject_external_field:  String,
  pub operator:                SubjectMappingOperator,
  #[serde(default)]
  pub subject_external_values: Vec<String>,
}

impl Condition {
  /// Whether this condition alone would admit `property`.
  ///
  /// This is a coarse single-condition check used to pre-select mappings;
  /// it does not evaluate boolean groups.
  pub fn admits(&self, property: &SubjectProperty) -> bool {
    if self.subject_external_field != property.external_field {
      return false;
    }
    let value = property.external_value.as_str();
    match self.operator {
      SubjectMappingOperator::In => {
        self.subject_external_values.iter().any(|v| v == value)
      }
      SubjectMappingOperator::NotIn => {
        !self.subject_external_values.iter().any(|v| v == value)
      }
      SubjectMappingOperator::InContains => self
        .subject_external_values
        .iter()
        .any(|v| value.contains(v.as_str())),
      SubjectMappingOperator::Unspecified => false,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionGroup {
  pub boolean_operator: ConditionBooleanType,
  pub conditions:       Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectSet {
  pub condition_groups: Vec<ConditionGroup>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectConditionSet {
  pub id:           Uuid,
  pub name:         Option<String>,
  pub subject_sets: Vec<SubjectSet>,
  pub metadata:     Metadata,
}

impl SubjectConditionSet {
  pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
    self
      .subject_sets
      .iter()
      .flat_map(|s| &s.condition_groups)
      .flat_map(|g| &g.conditions)
  }

  /// Whether any single condition admits any of `properties`.
  pub fn admits_any(&self, properties: &[SubjectProperty]) -> bool {
    self
      .conditions()
      .any(|c| properties.iter().any(|p| c.admits(p)))
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubjectConditionSet {
  pub name:         Option<String>,
  pub subject_sets: Vec<SubjectSet>,
  pub metadata:     Option<MetadataMutable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectConditionSetUpdate {
  pub name:         Option<String>,
  pub subject_sets: Option<Vec<SubjectSet>>,
  pub metadata:     Option<MetadataUpdate>,
}

impl SubjectConditionSetUpdate {
  pub fn is_empty(&self) -> bool {
    self.name.is_none() && self.subject_sets.is_none() && self.metadata.is_none()
  }
}

// ─── Subject mappings ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StandardAction {
  #[serde(rename = "STANDARD_ACTION_DECRYPT")]
  Decrypt,
  #[serde(rename = "STANDARD_ACTION_TRANSMIT")]
  Transmit,
}

/// Something an entitled subject may do with data carrying the mapped value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
  Standard(StandardAction),
  Custom(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectMapping {
  pub id:                    Uuid,
  pub attribute_value:       ValueRef,
  pub subject_condition_set: SubjectConditionSet,
  pub actions:               Vec<Action>,
  pub metadata:              Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubjectMapping {
  pub attribute_value_id:                Uuid,
  pub actions:                           Vec<Action>,
  /// Takes precedence over `new_subject_condition_set` when both are set.
  pub existing_subject_condition_set_id: Option<Uuid>,
  pub new_subject_condition_set:         Option<NewSubjectConditionSet>,
  pub metadata:                          Option<MetadataMutable>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubjectMappingUpdate {
  pub subject_condition_set_id: Option<Uuid>,
  pub actions:                  Option<Vec<Action>>,
  pub metadata:                 Option<MetadataUpdate>,
}

impl SubjectMappingUpdate {
  pub fn is_empty(&self) -> bool {
    self.subject_condition_set_id.is_none()
      && self.actions.is_none()
      && self.metadata.is_none()
  }
}

/// A property of a subject as asserted by an external identity source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubjectProperty {
  pub external_field: String,
  #[serde(default)]
  pub external_value: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  fn condition(
    field: &str,
    operator: SubjectMappingOperator,
    values: &[&str],
  ) -> Condition {
    Condition {
      subject_external_field:  field.into(),
      operator,
      subject_external_values: values.iter().map(|v| (*v).to_owned()).collect(),
    }
  }

  fn property(field: &str, value: &str) -> SubjectProperty {
    SubjectProperty {
      external_field: field.into(),
      external_value: value.into(),
    }
  }

  #[test]
  fn in_operator_requires_listed_value() {
    let c = condition(".role", SubjectMappingOperator::In, &["admin", "ops"]);
    assert!(c.admits(&property(".role", "ops")));
    assert!(!c.admits(&property(".role", "guest")));
    assert!(!c.admits(&property(".team", "ops")));
  }

  #[test]
  fn not_in_operator_admits_unlisted_value() {
    let c = condition(".role", SubjectMappingOperator::NotIn, &["guest"]);
    assert!(c.admits(&property(".role", "admin")));
    assert!(!c.admits(&property(".role", "guest")));
  }

  #[test]
  fn in_contains_matches_substrings() {
    let c =
      condition(".email", SubjectMappingOperator::InContains, &["@corp.io"]);
    assert!(c.admits(&property(".email", "ada@corp.io")));
    assert!(!c.admits(&property(".email", "ada@home.io")));
  }

  #[test]
  fn condition_document_uses_prefixed_names() {
    let group = ConditionGroup {
      boolean_operator: ConditionBooleanType::And,
      conditions:       vec![condition(
        ".role",
        SubjectMappingOperator::In,
        &["admin"],
      )],
    };
    let json = serde_json::to_value(&group).unwrap();
    assert_eq!(json["boolean_operator"], "CONDITION_BOOLEAN_TYPE_ENUM_AND");
    assert_eq!(
      json["conditions"][0]["operator"],
      "SUBJECT_MAPPING_OPERATOR_ENUM_IN"
    );
  }

  #[test]
  fn actions_are_externally_tagged() {
    let actions = vec![
      Action::Standard(StandardAction::Decrypt),
      Action::Custom("download".into()),
    ];
    assert_eq!(
      serde_json::to_string(&actions).unwrap(),
      r#"[{"standard":"STANDARD_ACTION_DECRYPT"},{"custom":"download"}]"#
    );
  }
}
