use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::metadata::{Metadata, MetadataMutable};

/// The top of the attribute hierarchy; its name is a DNS-style hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
  pub id:       Uuid,
  pub name:     String,
  pub fqn:      Option<String>,
  pub active:   bool,
  pub metadata: Metadata,
}

/// Input for creating a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewNamespace {
  pub name:     String,
  #[serde(default)]
  pub metadata: Option<MetadataMutable>,
}

impl NewNamespace {
  pub fn named(name: impl Into<String>) -> Self {
    Self { name: name.into(), metadata: None }
  }
}

/// The namespace summary embedded in an attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamespaceRef {
  pub id:   Uuid,
  pub name: String,
  pub fqn:  Option<String>,
}
