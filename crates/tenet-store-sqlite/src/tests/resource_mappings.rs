use tenet_core::{
  ErrorKind,
  mapping::{
    NewResourceMapping, NewResourceMappingGroup, ResourceMappingGroup,
    ResourceMappingGroupUpdate, ResourceMappingUpdate,
  },
  metadata::MetadataUpdate,
  store::{AttributeValueStore, NamespaceStore, ResourceMappingStore},
};
use uuid::Uuid;

use super::{attribute, kind, labels, namespace, store};

fn terms(items: &[&str]) -> Vec<String> {
  items.iter().map(|t| t.to_string()).collect()
}

#[tokio::test]
async fn resource_mapping_crud() {
  let s = store().await;
  let ns = namespace(&s, "example.com").await;
  let attr = attribute(&s, ns.id, "clearance", &["secret", "public"]).await;
  let (secret, public) = (&attr.values[0], &attr.values[1]);

  let created = s
    .create_resource_mapping(NewResourceMapping {
      attribute_value_id: secret.id,
      terms:              terms(&["TOP SECRET", "TS"]),
      group_id:           None,
      metadata:           None,
    })
    .await
    .unwrap();
  assert_eq!(created.attribute_value.id, secret.id);
  assert_eq!(created.attribute_value.value, "secret");
  assert_eq!(created.attribute_value.fqn, secret.fqn);
  assert!(created.attribute_value.active);
  assert_eq!(created.terms, ["TOP SECRET", "TS"]);
  assert_eq!(created.group, None);
  assert_eq!(s.get_resource_mapping(created.id).await.unwrap(), created);

  let updated = s
    .update_resource_mapping(created.id, ResourceMappingUpdate {
      attribute_value_id: Some(public.id),
      terms:              None,
      group_id:           None,
      metadata:           Some(MetadataUpdate::extend(labels(&[("k", "v")]))),
    })
    .await
    .unwrap();
  assert_eq!(updated.attribute_value.id, public.id);
  assert_eq!(updated.terms, created.terms);
  assert_eq!(updated.metadata.labels["k"], "v");

  let unchanged = s
    .update_resource_mapping(created.id, ResourceMappingUpdate::default())
    .await
    .unwrap();
  assert_eq!(unchanged, updated);

  assert_eq!(s.list_resource_mappings().await.unwrap(), [updated.clone()]);

  let deleted = s.delete_resource_mapping(created.id).await.unwrap();
  assert_eq!(deleted, updated);
  assert!(s.list_resource_mappings().await.unwrap().is_empty());
  assert_eq!(
    kind(s.get_resource_mapping(created.id).await),
    ErrorKind::NotFound
  );
}

#[tokio::test]
async fn resource_mapping_needs_existing_value_and_terms() {
  let s = store().await;
  let result = s
    .create_resource_mapping(NewResourceMapping {
      attribute_value_id: Uuid::new_v4(),
      terms:              terms(&["x"]),
      group_id:           None,
      metadata:           None,
    })
    .await;
  assert_eq!(kind(result), ErrorKind::ForeignKey);

  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  let result = s
    .create_resource_mapping(NewResourceMapping {
      attribute_value_id: attr.values[0].id,
      terms:              Vec::new(),
      group_id:           None,
      metadata:           None,
    })
    .await;
  assert_eq!(kind(result), ErrorKind::Validation);
}

#[tokio::test]
async fn mapped_value_cannot_be_deleted() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  s.create_resource_mapping(NewResourceMapping {
    attribute_value_id: attr.values[0].id,
    terms:              terms(&["x"]),
    group_id:           None,
    metadata:           None,
  })
  .await
  .unwrap();

  let result = s.delete_value(attr.values[0].id).await;
  assert_eq!(kind(result), ErrorKind::ForeignKey);
}

async fn group(
  s: &crate::SqliteStore,
  namespace_id: Uuid,
  name: &str,
) -> ResourceMappingGroup {
  s.create_resource_mapping_group(NewResourceMappingGroup {
    namespace_id,
    name: name.into(),
  })
  .await
  .unwrap()
}

#[tokio::test]
async fn group_crud_and_fqn_lookup() {
  let s = store().await;
  let a = namespace(&s, "a.io").await;
  let b = namespace(&s, "b.io").await;

  let nato = group(&s, a.id, "nato").await;
  assert_eq!(nato.namespace_id, a.id);
  assert_eq!(nato.name, "nato");
  assert_eq!(s.get_resource_mapping_group(nato.id).await.unwrap(), nato);

  let other = group(&s, b.id, "nato").await;
  let dup = s
    .create_resource_mapping_group(NewResourceMappingGroup {
      namespace_id: a.id,
      name:         "nato".into(),
    })
    .await;
  assert_eq!(kind(dup), ErrorKind::UniqueConstraint);

  let found = s
    .get_resource_mapping_group_by_fqn("https://B.io/resm/nato".into())
    .await
    .unwrap();
  assert_eq!(found, other);
  assert_eq!(
    kind(
      s.get_resource_mapping_group_by_fqn("https://a.io/resm/five-eyes".into())
        .await
    ),
    ErrorKind::NotFound
  );
  assert_eq!(
    kind(s.get_resource_mapping_group_by_fqn("https://a.io".into()).await),
    ErrorKind::Validation
  );

  assert_eq!(
    s.list_resource_mapping_groups(None).await.unwrap(),
    [nato.clone(), other.clone()]
  );
  assert_eq!(
    s.list_resource_mapping_groups(Some(b.id)).await.unwrap(),
    [other.clone()]
  );

  let renamed = s
    .update_resource_mapping_group(nato.id, ResourceMappingGroupUpdate {
      namespace_id: None,
      name:         Some("five-eyes".into()),
    })
    .await
    .unwrap();
  assert_eq!(renamed.name, "five-eyes");
  assert_eq!(renamed.namespace_id, a.id);
  assert_eq!(
    s.update_resource_mapping_group(nato.id, ResourceMappingGroupUpdate::default())
      .await
      .unwrap(),
    renamed
  );
  assert_eq!(
    kind(
      s.update_resource_mapping_group(Uuid::new_v4(), ResourceMappingGroupUpdate {
        namespace_id: None,
        name:         Some("x".into()),
      })
      .await
    ),
    ErrorKind::NotFound
  );

  assert_eq!(s.delete_resource_mapping_group(other.id).await.unwrap(), other);
  assert_eq!(
    kind(s.get_resource_mapping_group(other.id).await),
    ErrorKind::NotFound
  );
  assert_eq!(
    kind(s.delete_resource_mapping_group(other.id).await),
    ErrorKind::NotFound
  );
}

#[tokio::test]
async fn group_needs_existing_namespace() {
  let s = store().await;
  let result = s
    .create_resource_mapping_group(NewResourceMappingGroup {
      namespace_id: Uuid::new_v4(),
      name:         "nato".into(),
    })
    .await;
  assert_eq!(kind(result), ErrorKind::ForeignKey);

  let ns = namespace(&s, "a.io").await;
  let result = s
    .create_resource_mapping_group(NewResourceMappingGroup {
      namespace_id: ns.id,
      name:         "a/b".into(),
    })
    .await;
  assert_eq!(kind(result), ErrorKind::Validation);

  group(&s, ns.id, "nato").await;
  assert_eq!(kind(s.delete_namespace(ns.id).await), ErrorKind::ForeignKey);
}

#[tokio::test]
async fn mappings_carry_their_group() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  let nato = group(&s, ns.id, "nato").await;
  let eyes = group(&s, ns.id, "five-eyes").await;

  let mapping = s
    .create_resource_mapping(NewResourceMapping {
      attribute_value_id: attr.values[0].id,
      terms:              terms(&["NATO SECRET"]),
      group_id:           Some(nato.id),
      metadata:           None,
    })
    .await
    .unwrap();
  assert_eq!(mapping.group.as_ref(), Some(&nato));
  assert_eq!(s.list_resource_mappings().await.unwrap(), [mapping.clone()]);

  let moved = s
    .update_resource_mapping(mapping.id, ResourceMappingUpdate {
      group_id: Some(eyes.id),
      ..ResourceMappingUpdate::default()
    })
    .await
    .unwrap();
  assert_eq!(moved.group.as_ref(), Some(&eyes));

  let result = s
    .update_resource_mapping(mapping.id, ResourceMappingUpdate {
      group_id: Some(Uuid::new_v4()),
      ..ResourceMappingUpdate::default()
    })
    .await;
  assert_eq!(kind(result), ErrorKind::ForeignKey);

  // Deleting the group leaves the mapping in place, ungrouped.
  s.delete_resource_mapping_group(eyes.id).await.unwrap();
  let ungrouped = s.get_resource_mapping(mapping.id).await.unwrap();
  assert_eq!(ungrouped.group, None);
  assert_eq!(ungrouped.terms, mapping.terms);
}
