use tenet_core::{
  ErrorKind,
  enums::ActiveState,
  metadata::{MetadataMutable, MetadataUpdate},
  namespace::NewNamespace,
  store::{AttributeStore, NamespaceStore},
};
use uuid::Uuid;

use super::{attribute, kind, labels, namespace, store};

#[tokio::test]
async fn create_and_get_namespace() {
  let s = store().await;
  let created = s
    .create_namespace(NewNamespace {
      name:     "Example.COM".into(),
      metadata: Some(labels(&[("owner", "ops")])),
    })
    .await
    .unwrap();

  assert_eq!(created.name, "example.com");
  assert_eq!(created.fqn.as_deref(), Some("https://example.com"));
  assert!(created.active);
  assert_eq!(created.metadata.labels["owner"], "ops");
  assert_eq!(created.metadata.created_at, created.metadata.updated_at);

  let fetched = s.get_namespace(created.id).await.unwrap();
  assert_eq!(fetched, created);
}

#[tokio::test]
async fn invalid_namespace_name_is_rejected() {
  let s = store().await;
  for name in ["", "localhost", "-bad.io", "bad/name.io"] {
    let result = s.create_namespace(NewNamespace::named(name)).await;
    assert_eq!(kind(result), ErrorKind::Validation, "{name:?}");
  }
}

#[tokio::test]
async fn duplicate_namespace_name_conflicts() {
  let s = store().await;
  namespace(&s, "example.com").await;
  let result = s.create_namespace(NewNamespace::named("EXAMPLE.com")).await;
  assert_eq!(kind(result), ErrorKind::UniqueConstraint);
}

#[tokio::test]
async fn get_missing_namespace_is_not_found() {
  let s = store().await;
  assert_eq!(kind(s.get_namespace(Uuid::new_v4()).await), ErrorKind::NotFound);
}

#[tokio::test]
async fn list_namespaces_by_state() {
  let s = store().await;
  let a = namespace(&s, "a.io").await;
  let b = namespace(&s, "b.io").await;
  s.deactivate_namespace(b.id).await.unwrap();

  let active = s.list_namespaces(ActiveState::Active).await.unwrap();
  assert_eq!(active.iter().map(|n| n.id).collect::<Vec<_>>(), [a.id]);

  let unspecified = s.list_namespaces(ActiveState::Unspecified).await.unwrap();
  assert_eq!(unspecified, active);

  let inactive = s.list_namespaces(ActiveState::Inactive).await.unwrap();
  assert_eq!(inactive.iter().map(|n| n.id).collect::<Vec<_>>(), [b.id]);

  let any = s.list_namespaces(ActiveState::Any).await.unwrap();
  assert_eq!(any.iter().map(|n| n.id).collect::<Vec<_>>(), [a.id, b.id]);
}

#[tokio::test]
async fn update_without_metadata_is_a_no_op() {
  let s = store().await;
  let created = namespace(&s, "a.io").await;
  let updated = s.update_namespace(created.id, None).await.unwrap();
  assert_eq!(updated, created);
}

#[tokio::test]
async fn update_replace_overwrites_labels() {
  let s = store().await;
  let created = s
    .create_namespace(NewNamespace {
      name:     "a.io".into(),
      metadata: Some(labels(&[("keep", "no")])),
    })
    .await
    .unwrap();

  let updated = s
    .update_namespace(
      created.id,
      Some(MetadataUpdate::replace(MetadataMutable {
        labels:      labels(&[("only", "this")]).labels,
        description: "replaced".into(),
      })),
    )
    .await
    .unwrap();

  assert_eq!(updated.metadata.labels, labels(&[("only", "this")]).labels);
  assert_eq!(updated.metadata.description, "replaced");
  assert_eq!(updated.metadata.created_at, created.metadata.created_at);
  assert!(updated.metadata.updated_at >= created.metadata.updated_at);
}

#[tokio::test]
async fn update_missing_namespace_is_not_found() {
  let s = store().await;
  let result = s
    .update_namespace(Uuid::new_v4(), Some(MetadataUpdate::extend(labels(&[]))))
    .await;
  assert_eq!(kind(result), ErrorKind::NotFound);
}

#[tokio::test]
async fn deactivate_namespace_cascades_to_attributes_and_values() {
  let s = store().await;
  let ns = namespace(&s, "x.io").await;
  let attr = attribute(&s, ns.id, "a", &["v1", "v2"]).await;

  let deactivated = s.deactivate_namespace(ns.id).await.unwrap();
  assert!(!deactivated.active);

  let attr = s.get_attribute(attr.id).await.unwrap();
  assert!(!attr.active);
  assert!(attr.values.iter().all(|v| !v.active));
}

#[tokio::test]
async fn deactivate_missing_namespace_is_not_found() {
  let s = store().await;
  let result = s.deactivate_namespace(Uuid::new_v4()).await;
  assert_eq!(kind(result), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_namespace_returns_snapshot() {
  let s = store().await;
  let ns = namespace(&s, "gone.io").await;
  let deleted = s.delete_namespace(ns.id).await.unwrap();
  assert_eq!(deleted, ns);
  assert_eq!(kind(s.get_namespace(ns.id).await), ErrorKind::NotFound);
  assert_eq!(kind(s.delete_namespace(ns.id).await), ErrorKind::NotFound);
}

#[tokio::test]
async fn delete_namespace_with_attributes_is_restricted() {
  let s = store().await;
  let ns = namespace(&s, "busy.io").await;
  attribute(&s, ns.id, "a", &[]).await;
  assert_eq!(kind(s.delete_namespace(ns.id).await), ErrorKind::ForeignKey);
  assert!(s.get_namespace(ns.id).await.is_ok());
}
