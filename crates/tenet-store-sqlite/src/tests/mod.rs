//! Integration tests for `SqliteStore` against an in-memory database.

use std::fmt::Debug;

use tenet_core::{
  Classify as _, ErrorKind,
  attribute::{Attribute, AttributeRule, NewAttribute},
  kas::{KeyAccessServer, NewKeyAccessServer, PublicKey},
  metadata::MetadataMutable,
  namespace::{Namespace, NewNamespace},
  store::{AttributeStore, KasRegistryStore, NamespaceStore},
};
use uuid::Uuid;

use crate::{Result, SqliteStore};

mod kas;
mod namespaces;
mod resource_mappings;
mod subject_mappings;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn namespace(s: &SqliteStore, name: &str) -> Namespace {
  s.create_namespace(NewNamespace::named(name)).await.unwrap()
}

fn new_attribute(namespace_id: Uuid, name: &str, values: &[&str]) -> NewAttribute {
  NewAttribute {
    namespace_id,
    name: name.into(),
    rule: AttributeRule::AnyOf,
    values: values.iter().map(|v| v.to_string()).collect(),
    metadata: None,
  }
}

async fn attribute(
  s: &SqliteStore,
  namespace_id: Uuid,
  name: &str,
  values: &[&str],
) -> Attribute {
  s.create_attribute(new_attribute(namespace_id, name, values))
    .await
    .unwrap()
}

async fn kas(s: &SqliteStore, uri: &str) -> KeyAccessServer {
  s.create_kas(NewKeyAccessServer {
    uri:        uri.into(),
    public_key: PublicKey::Remote(format!("{uri}/kas_public_key")),
    metadata:   None,
  })
  .await
  .unwrap()
}

fn labels(pairs: &[(&str, &str)]) -> MetadataMutable {
  MetadataMutable::with_labels(pairs.iter().copied())
}

/// The policy kind of a failed call.
fn kind<T: Debug>(result: Result<T>) -> ErrorKind {
  result.unwrap_err().kind()
}
