//! Attribute definitions and their values.

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString, FromRepr, IntoStaticStr};
use uuid::Uuid;

use crate::{
  enums::{ActiveState, WireEnum},
  kas::KeyAccessServer,
  mapping::SubjectMapping,
  metadata::{Metadata, MetadataMutable, MetadataUpdate},
  namespace::NamespaceRef,
};

// ─── Rule ────────────────────────────────────────────────────────────────────

/// How the values of an attribute combine when evaluated.
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
pub enum AttributeRule {
  #[default]
  #[serde(rename = "ATTRIBUTE_RULE_TYPE_ENUM_UNSPECIFIED")]
  #[strum(serialize = "UNSPECIFIED")]
  Unspecified = 0,
  #[serde(rename = "ATTRIBUTE_RULE_TYPE_ENUM_ALL_OF")]
  #[strum(serialize = "ALL_OF")]
  AllOf = 1,
  #[serde(rename = "ATTRIBUTE_RULE_TYPE_ENUM_ANY_OF")]
  #[strum(serialize = "ANY_OF")]
  AnyOf = 2,
  #[serde(rename = "ATTRIBUTE_RULE_TYPE_ENUM_HIERARCHY")]
  #[strum(serialize = "HIERARCHY")]
  Hierarchy = 3,
}

impl WireEnum for AttributeRule {
  const KIND: &'static str = "attribute rule";
  const PREFIX: &'static str = "ATTRIBUTE_RULE_TYPE_ENUM_";

  fn from_number(n: i32) -> Option<Self> { Self::from_repr(n) }
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// An attribute definition hydrated with its namespace, values and grants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
  pub id:        Uuid,
  pub namespace: NamespaceRef,
  pub name:      String,
  pub rule:      AttributeRule,
  /// In creation order.
  pub values:    Vec<Value>,
  pub grants:    Vec<KeyAccessServer>,
  pub fqn:       Option<String>,
  pub active:    bool,
  pub metadata:  Metadata,
}

impl Attribute {
  pub fn value_named(&self, value: &str) -> Option<&Value> {
    self.values.iter().find(|v| v.value == value)
  }
}

/// One admissible value of an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
  pub id:               Uuid,
  pub attribute_id:     Uuid,
  pub value:            String,
  /// Ids of other values of the same attribute, not dereferenced.
  #[serde(default)]
  pub members:          Vec<Uuid>,
  #[serde(default)]
  pub grants:           Vec<KeyAccessServer>,
  pub fqn:              Option<String>,
  pub active:           bool,
  pub metadata:         Metadata,
  /// Populated only by value-shaped FQN lookups.
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub subject_mappings: Vec<SubjectMapping>,
}

// ─── Inputs ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAttribute {
  pub namespace_id: Uuid,
  pub name:         String,
  pub rule:         AttributeRule,
  /// Initial values, created in the order given.
  pub values:       Vec<String>,
  pub metadata:     Option<MetadataMutable>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewValue {
  pub attribute_id: Uuid,
  pub value:        String,
  pub members:      Vec<Uuid>,
  pub metadata:     Option<MetadataMutable>,
}

impl NewValue {
  pub fn new(attribute_id: Uuid, value: impl Into<String>) -> Self {
    Self {
      attribute_id,
      value: value.into(),
      members: Vec::new(),
      metadata: None,
    }
  }
}

/// A partial value update. `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValueUpdate {
  pub members:  Option<Vec<Uuid>>,
  pub metadata: Option<MetadataUpdate>,
}

impl ValueUpdate {
  pub fn is_empty(&self) -> bool {
    self.members.is_none() && self.metadata.is_none()
  }
}

/// Selects a namespace either by id or by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceSelector {
  Id(Uuid),
  Name(String),
}

impl NamespaceSelector {
  /// Interpret a caller-supplied string: a UUID selects by id, anything else
  /// by name.
  pub fn parse(raw: &str) -> Self {
    match Uuid::try_parse(raw) {
      Ok(id) => Self::Id(id),
      Err(_) => Self::Name(raw.to_ascii_lowercase()),
    }
  }
}

/// Filters for listing attributes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttributeQuery {
  pub state:     ActiveState,
  pub namespace: Option<NamespaceSelector>,
}

// ─── Lookup results ──────────────────────────────────────────────────────────

/// An attribute found by FQN, with the value the FQN named if it was
/// value-shaped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FqnMatch {
  pub attribute:      Attribute,
  pub selected_value: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributeAndValue {
  pub attribute: Attribute,
  pub value:     Value,
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{enums::EnumInput, Classify as _, ErrorKind};

  #[test]
  fn rule_strips_and_restores_prefix() {
    assert_eq!(AttributeRule::AnyOf.stored_name(), "ANY_OF");
    assert_eq!(
      AttributeRule::AnyOf.wire_name(),
      "ATTRIBUTE_RULE_TYPE_ENUM_ANY_OF"
    );
    assert_eq!(
      AttributeRule::from_stored("HIERARCHY").unwrap(),
      AttributeRule::Hierarchy
    );
    assert_eq!(
      serde_json::to_string(&AttributeRule::AllOf).unwrap(),
      r#""ATTRIBUTE_RULE_TYPE_ENUM_ALL_OF""#
    );
  }

  #[test]
  fn unknown_rule_number_is_enum_invalid() {
    let err = EnumInput::from(100).resolve::<AttributeRule>().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::EnumInvalid);
  }

  #[test]
  fn namespace_selector_prefers_uuid() {
    let id = Uuid::new_v4();
    assert_eq!(
      NamespaceSelector::parse(&id.to_string()),
      NamespaceSelector::Id(id)
    );
    assert_eq!(
      NamespaceSelector::parse("Example.com"),
      NamespaceSelector::Name("example.com".into())
    );
  }
}
