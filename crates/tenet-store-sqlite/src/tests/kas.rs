use tenet_core::{
  ErrorKind,
  kas::{KasUpdate, NewKeyAccessServer, PublicKey},
  metadata::MetadataUpdate,
  store::{AttributeStore, AttributeValueStore, KasRegistryStore},
};
use uuid::Uuid;

use super::{attribute, kas, kind, labels, namespace, store};

#[tokio::test]
async fn create_and_get_kas() {
  let s = store().await;
  let created = s
    .create_kas(NewKeyAccessServer {
      uri:        "https://kas.example.com".into(),
      public_key: PublicKey::Local("-----BEGIN PUBLIC KEY-----".into()),
      metadata:   Some(labels(&[("region", "eu")])),
    })
    .await
    .unwrap();

  assert_eq!(created.uri, "https://kas.example.com");
  assert_eq!(
    created.public_key,
    PublicKey::Local("-----BEGIN PUBLIC KEY-----".into())
  );
  assert_eq!(created.metadata.labels["region"], "eu");
  assert_eq!(s.get_kas(created.id).await.unwrap(), created);
}

#[tokio::test]
async fn kas_uri_is_required_and_unique() {
  let s = store().await;
  let result = s
    .create_kas(NewKeyAccessServer {
      uri:        " ".into(),
      public_key: PublicKey::Remote("https://kas/key".into()),
      metadata:   None,
    })
    .await;
  assert_eq!(kind(result), ErrorKind::Validation);

  kas(&s, "https://kas.example.com").await;
  let result = s
    .create_kas(NewKeyAccessServer {
      uri:        "https://kas.example.com".into(),
      public_key: PublicKey::Remote("https://kas/key".into()),
      metadata:   None,
    })
    .await;
  assert_eq!(kind(result), ErrorKind::UniqueConstraint);
}

#[tokio::test]
async fn list_kas_in_creation_order() {
  let s = store().await;
  let a = kas(&s, "https://a.kas").await;
  let b = kas(&s, "https://b.kas").await;
  assert_eq!(s.list_kas().await.unwrap(), [a, b]);
}

#[tokio::test]
async fn update_kas_changes_only_supplied_fields() {
  let s = store().await;
  let created = kas(&s, "https://kas.example.com").await;

  let updated = s
    .update_kas(created.id, KasUpdate {
      public_key: Some(PublicKey::Local("pem".into())),
      ..KasUpdate::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.uri, created.uri);
  assert_eq!(updated.public_key, PublicKey::Local("pem".into()));

  let updated = s
    .update_kas(created.id, KasUpdate {
      uri: Some("https://kas2.example.com".into()),
      metadata: Some(MetadataUpdate::extend(labels(&[("moved", "yes")]))),
      ..KasUpdate::default()
    })
    .await
    .unwrap();
  assert_eq!(updated.uri, "https://kas2.example.com");
  assert_eq!(updated.public_key, PublicKey::Local("pem".into()));
  assert_eq!(updated.metadata.labels["moved"], "yes");

  let unchanged = s
    .update_kas(created.id, KasUpdate::default())
    .await
    .unwrap();
  assert_eq!(unchanged, updated);

  let missing = s
    .update_kas(Uuid::new_v4(), KasUpdate {
      uri: Some("https://nowhere".into()),
      ..KasUpdate::default()
    })
    .await;
  assert_eq!(kind(missing), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_kas_drops_its_grants() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  let k = kas(&s, "https://kas.a.io").await;
  s.assign_attribute_kas(attr.id, k.id).await.unwrap();
  s.assign_value_kas(attr.values[0].id, k.id).await.unwrap();

  let deleted = s.delete_kas(k.id).await.unwrap();
  assert_eq!(deleted, k);
  assert_eq!(kind(s.get_kas(k.id).await), ErrorKind::NotFound);

  let attr = s.get_attribute(attr.id).await.unwrap();
  assert!(attr.grants.is_empty());
  assert!(attr.values[0].grants.is_empty());
  assert!(s.list_kas_grants(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn list_kas_grants() {
  let s = store().await;
  let ns = namespace(&s, "example.com").await;
  let attr = attribute(&s, ns.id, "clearance", &["secret"]).await;
  let granted = kas(&s, "https://granted.kas").await;
  let idle = kas(&s, "https://idle.kas").await;
  s.assign_attribute_kas(attr.id, granted.id).await.unwrap();
  s.assign_value_kas(attr.values[0].id, granted.id).await.unwrap();

  let all = s.list_kas_grants(None).await.unwrap();
  assert_eq!(all.len(), 1);
  let grants = &all[0];
  assert_eq!(grants.key_access_server.id, granted.id);
  assert_eq!(grants.key_access_server.uri, "https://granted.kas");
  assert_eq!(grants.attribute_grants.len(), 1);
  assert_eq!(grants.attribute_grants[0].id, attr.id);
  assert_eq!(
    grants.attribute_grants[0].fqn,
    "https://example.com/attr/clearance"
  );
  assert_eq!(
    grants.value_grants[0].fqn,
    "https://example.com/attr/clearance/value/secret"
  );

  let one = s.list_kas_grants(Some(idle.id)).await.unwrap();
  assert_eq!(one.len(), 1);
  assert!(one[0].attribute_grants.is_empty());
  assert!(one[0].value_grants.is_empty());

  let missing = s.list_kas_grants(Some(Uuid::new_v4())).await;
  assert_eq!(kind(missing), ErrorKind::NotFound);
}
