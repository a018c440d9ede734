//! Key-access server registrations and the grants that point at them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  fqn::IndexedFqn,
  metadata::{Metadata, MetadataMutable, MetadataUpdate},
};

/// The public key of a KAS: inline key material or a URL to fetch it from.
///
/// Serialised externally tagged (`{"local": "..."}` or `{"remote": "..."}`),
/// so a document with neither or both keys fails to decode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublicKey {
  Local(String),
  Remote(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyAccessServer {
  pub id:         Uuid,
  pub uri:        String,
  pub public_key: PublicKey,
  pub metadata:   Metadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKeyAccessServer {
  pub uri:        String,
  pub public_key: PublicKey,
  #[serde(default)]
  pub metadata:   Option<MetadataMutable>,
}

/// A partial update; `None` fields keep their stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KasUpdate {
  pub uri:        Option<String>,
  pub public_key: Option<PublicKey>,
  pub metadata:   Option<MetadataUpdate>,
}

impl KasUpdate {
  pub fn is_empty(&self) -> bool {
    self.uri.is_none() && self.public_key.is_none() && self.metadata.is_none()
  }
}

/// A link between an attribute or value and a KAS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KasGrant {
  /// The attribute or value id.
  pub target_id: Uuid,
  pub kas_id:    Uuid,
}

/// Everything one KAS has been granted to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KasGrants {
  pub key_access_server: KasRef,
  pub attribute_grants:  Vec<IndexedFqn>,
  pub value_grants:      Vec<IndexedFqn>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KasRef {
  pub id:  Uuid,
  pub uri: String,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn public_key_is_externally_tagged() {
    let local = PublicKey::Local("-----BEGIN PUBLIC KEY-----".into());
    assert_eq!(
      serde_json::to_string(&local).unwrap(),
      r#"{"local":"-----BEGIN PUBLIC KEY-----"}"#
    );
    let remote: PublicKey =
      serde_json::from_str(r#"{"remote":"https://kas.example.com/key"}"#)
        .unwrap();
    assert_eq!(remote, PublicKey::Remote("https://kas.example.com/key".into()));
  }

  #[test]
  fn public_key_requires_exactly_one_variant() {
    assert!(serde_json::from_str::<PublicKey>("{}").is_err());
    assert!(
      serde_json::from_str::<PublicKey>(r#"{"local":"a","remote":"b"}"#)
        .is_err()
    );
  }
}
