use tenet_core::{
  ErrorKind,
  mapping::{
    Action, Condition, ConditionBooleanType, ConditionGroup,
    NewSubjectConditionSet, NewSubjectMapping, StandardAction,
    SubjectConditionSetUpdate, SubjectMappingOperator, SubjectMappingUpdate,
    SubjectProperty, SubjectSet,
  },
  metadata::MetadataUpdate,
  store::{AttributeStore, AttributeValueStore, SubjectMappingStore},
};
use uuid::Uuid;

use super::{attribute, kind, labels, namespace, store};

fn subject_sets(
  field: &str,
  operator: SubjectMappingOperator,
  values: &[&str],
) -> Vec<SubjectSet> {
  vec![SubjectSet {
    condition_groups: vec![ConditionGroup {
      boolean_operator: ConditionBooleanType::And,
      conditions:       vec![Condition {
        subject_external_field:  field.into(),
        operator,
        subject_external_values: values.iter().map(|v| v.to_string()).collect(),
      }],
    }],
  }]
}

fn new_set(
  field: &str,
  operator: SubjectMappingOperator,
  values: &[&str],
) -> NewSubjectConditionSet {
  NewSubjectConditionSet {
    name:         None,
    subject_sets: subject_sets(field, operator, values),
    metadata:     None,
  }
}

fn decrypt() -> Vec<Action> { vec![Action::Standard(StandardAction::Decrypt)] }

fn mapping_with_new_set(
  value_id: Uuid,
  set: NewSubjectConditionSet,
) -> NewSubjectMapping {
  NewSubjectMapping {
    attribute_value_id:                value_id,
    actions:                           decrypt(),
    existing_subject_condition_set_id: None,
    new_subject_condition_set:         Some(set),
    metadata:                          None,
  }
}

fn property(field: &str, value: &str) -> SubjectProperty {
  SubjectProperty { external_field: field.into(), external_value: value.into() }
}

#[tokio::test]
async fn create_mapping_with_inline_condition_set() {
  let s = store().await;
  let ns = namespace(&s, "example.com").await;
  let attr = attribute(&s, ns.id, "clearance", &["secret"]).await;
  let value = &attr.values[0];

  let created = s
    .create_subject_mapping(mapping_with_new_set(
      value.id,
      new_set(".department", SubjectMappingOperator::In, &["ops"]),
    ))
    .await
    .unwrap();

  assert_eq!(created.attribute_value.id, value.id);
  assert_eq!(created.attribute_value.fqn, value.fqn);
  assert_eq!(created.actions, decrypt());
  assert_eq!(
    created.subject_condition_set.subject_sets,
    subject_sets(".department", SubjectMappingOperator::In, &["ops"])
  );
  assert_eq!(s.get_subject_mapping(created.id).await.unwrap(), created);

  let set = s
    .get_subject_condition_set(created.subject_condition_set.id)
    .await
    .unwrap();
  assert_eq!(set, created.subject_condition_set);
}

#[tokio::test]
async fn existing_condition_set_takes_precedence() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  let existing = s
    .create_subject_condition_set(new_set("role", SubjectMappingOperator::In, &["admin"]))
    .await
    .unwrap();

  let created = s
    .create_subject_mapping(NewSubjectMapping {
      existing_subject_condition_set_id: Some(existing.id),
      ..mapping_with_new_set(
        attr.values[0].id,
        new_set("ignored", SubjectMappingOperator::NotIn, &[]),
      )
    })
    .await
    .unwrap();

  assert_eq!(created.subject_condition_set, existing);
  assert_eq!(s.list_subject_condition_sets().await.unwrap(), [existing]);
}

#[tokio::test]
async fn create_mapping_validates_input() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  let value_id = attr.values[0].id;

  let no_set = NewSubjectMapping {
    new_subject_condition_set: None,
    ..mapping_with_new_set(value_id, new_set("f", SubjectMappingOperator::In, &["x"]))
  };
  assert_eq!(
    kind(s.create_subject_mapping(no_set).await),
    ErrorKind::Validation
  );

  let no_actions = NewSubjectMapping {
    actions: Vec::new(),
    ..mapping_with_new_set(value_id, new_set("f", SubjectMappingOperator::In, &["x"]))
  };
  assert_eq!(
    kind(s.create_subject_mapping(no_actions).await),
    ErrorKind::Validation
  );

  let missing_value = mapping_with_new_set(
    Uuid::new_v4(),
    new_set("f", SubjectMappingOperator::In, &["x"]),
  );
  assert_eq!(
    kind(s.create_subject_mapping(missing_value).await),
    ErrorKind::ForeignKey
  );
  // The inline set was rolled back with the mapping.
  assert!(s.list_subject_condition_sets().await.unwrap().is_empty());

  let missing_set = NewSubjectMapping {
    existing_subject_condition_set_id: Some(Uuid::new_v4()),
    ..mapping_with_new_set(value_id, new_set("f", SubjectMappingOperator::In, &["x"]))
  };
  assert_eq!(
    kind(s.create_subject_mapping(missing_set).await),
    ErrorKind::ForeignKey
  );
}

#[tokio::test]
async fn update_mapping_swaps_condition_set_and_actions() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  let created = s
    .create_subject_mapping(mapping_with_new_set(
      attr.values[0].id,
      new_set("f", SubjectMappingOperator::In, &["x"]),
    ))
    .await
    .unwrap();
  let replacement = s
    .create_subject_condition_set(new_set("g", SubjectMappingOperator::NotIn, &["y"]))
    .await
    .unwrap();

  let actions = vec![
    Action::Standard(StandardAction::Transmit),
    Action::Custom("audit".into()),
  ];
  let updated = s
    .update_subject_mapping(created.id, SubjectMappingUpdate {
      subject_condition_set_id: Some(replacement.id),
      actions:                  Some(actions.clone()),
      metadata:                 Some(MetadataUpdate::extend(labels(&[("v", "2")]))),
    })
    .await
    .unwrap();
  assert_eq!(updated.subject_condition_set, replacement);
  assert_eq!(updated.actions, actions);
  assert_eq!(updated.metadata.labels["v"], "2");

  // The original set is no longer referenced and may now go.
  let removed = s
    .delete_subject_condition_set(created.subject_condition_set.id)
    .await
    .unwrap();
  assert_eq!(removed.id, created.subject_condition_set.id);

  let unchanged = s
    .update_subject_mapping(created.id, SubjectMappingUpdate::default())
    .await
    .unwrap();
  assert_eq!(unchanged, updated);
}

#[tokio::test]
async fn referenced_condition_set_cannot_be_deleted() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  let mapping = s
    .create_subject_mapping(mapping_with_new_set(
      attr.values[0].id,
      new_set("f", SubjectMappingOperator::In, &["x"]),
    ))
    .await
    .unwrap();

  let result = s
    .delete_subject_condition_set(mapping.subject_condition_set.id)
    .await;
  assert_eq!(kind(result), ErrorKind::Restrict);

  let deleted = s.delete_subject_mapping(mapping.id).await.unwrap();
  assert_eq!(deleted, mapping);
  assert_eq!(
    kind(s.get_subject_mapping(mapping.id).await),
    ErrorKind::NotFound
  );
  s.delete_subject_condition_set(mapping.subject_condition_set.id)
    .await
    .unwrap();
}

#[tokio::test]
async fn condition_set_crud() {
  let s = store().await;
  let created = s
    .create_subject_condition_set(NewSubjectConditionSet {
      name: Some("admins".into()),
      ..new_set("role", SubjectMappingOperator::In, &["admin"])
    })
    .await
    .unwrap();
  assert_eq!(created.name.as_deref(), Some("admins"));

  let updated = s
    .update_subject_condition_set(created.id, SubjectConditionSetUpdate {
      name:         None,
      subject_sets: Some(subject_sets("role", SubjectMappingOperator::In, &["root"])),
      metadata:     None,
    })
    .await
    .unwrap();
  assert_eq!(updated.name.as_deref(), Some("admins"));
  assert_eq!(
    updated.subject_sets,
    subject_sets("role", SubjectMappingOperator::In, &["root"])
  );
  assert_eq!(updated.metadata.created_at, created.metadata.created_at);

  let empty = s
    .create_subject_condition_set(NewSubjectConditionSet {
      name:         None,
      subject_sets: Vec::new(),
      metadata:     None,
    })
    .await;
  assert_eq!(kind(empty), ErrorKind::Validation);

  let deleted = s.delete_subject_condition_set(created.id).await.unwrap();
  assert_eq!(deleted, updated);
  assert_eq!(
    kind(s.get_subject_condition_set(created.id).await),
    ErrorKind::NotFound
  );
}

#[tokio::test]
async fn delete_unmapped_condition_sets() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v"]).await;
  let mapping = s
    .create_subject_mapping(mapping_with_new_set(
      attr.values[0].id,
      new_set("f", SubjectMappingOperator::In, &["x"]),
    ))
    .await
    .unwrap();
  let orphan = s
    .create_subject_condition_set(new_set("g", SubjectMappingOperator::In, &["y"]))
    .await
    .unwrap();

  let deleted = s.delete_unmapped_subject_condition_sets().await.unwrap();
  assert_eq!(deleted, [orphan]);
  assert_eq!(
    s.list_subject_condition_sets().await.unwrap(),
    [mapping.subject_condition_set]
  );
  assert!(s.delete_unmapped_subject_condition_sets().await.unwrap().is_empty());
}

#[tokio::test]
async fn value_fqn_lookup_includes_subject_mappings() {
  let s = store().await;
  let ns = namespace(&s, "example.com").await;
  let attr = attribute(&s, ns.id, "clearance", &["secret", "public"]).await;
  let mapping = s
    .create_subject_mapping(mapping_with_new_set(
      attr.values[0].id,
      new_set(".clearance", SubjectMappingOperator::In, &["ts"]),
    ))
    .await
    .unwrap();

  let found = s
    .get_attribute_by_fqn("https://example.com/attr/clearance/value/secret".into())
    .await
    .unwrap();
  let selected = found.selected_value.unwrap();
  assert_eq!(selected.subject_mappings, [mapping]);

  // Attribute-shaped lookups do not hydrate mappings.
  let found = s
    .get_attribute_by_fqn("https://example.com/attr/clearance".into())
    .await
    .unwrap();
  assert!(found.attribute.values.iter().all(|v| v.subject_mappings.is_empty()));
}

#[tokio::test]
async fn match_subject_mappings_by_field_and_operator() {
  let s = store().await;
  let ns = namespace(&s, "example.com").await;
  let attr = attribute(&s, ns.id, "department", &["ops", "eng", "other"]).await;

  let ops = s
    .create_subject_mapping(mapping_with_new_set(
      attr.values[0].id,
      new_set(".dept", SubjectMappingOperator::In, &["ops"]),
    ))
    .await
    .unwrap();
  let not_eng = s
    .create_subject_mapping(mapping_with_new_set(
      attr.values[1].id,
      new_set(".dept", SubjectMappingOperator::NotIn, &["eng"]),
    ))
    .await
    .unwrap();
  s.create_subject_mapping(mapping_with_new_set(
    attr.values[2].id,
    new_set(".email", SubjectMappingOperator::InContains, &["@example.com"]),
  ))
  .await
  .unwrap();

  let matched = s
    .match_subject_mappings(vec![property(".dept", "ops")])
    .await
    .unwrap();
  let ids: Vec<Uuid> = matched.iter().map(|m| m.id).collect();
  assert_eq!(ids, [ops.id, not_eng.id]);

  let matched = s
    .match_subject_mappings(vec![property(".dept", "eng")])
    .await
    .unwrap();
  assert!(matched.is_empty());

  let matched = s
    .match_subject_mappings(vec![property(".email", "me@example.com")])
    .await
    .unwrap();
  assert_eq!(matched.len(), 1);
  assert_eq!(matched[0].attribute_value.id, attr.values[2].id);

  assert!(s.match_subject_mappings(Vec::new()).await.unwrap().is_empty());
}

#[tokio::test]
async fn match_skips_inactive_values() {
  let s = store().await;
  let ns = namespace(&s, "a.io").await;
  let attr = attribute(&s, ns.id, "a", &["v", "w"]).await;
  for value in &attr.values {
    s.create_subject_mapping(mapping_with_new_set(
      value.id,
      new_set("f", SubjectMappingOperator::In, &["x"]),
    ))
    .await
    .unwrap();
  }

  s.deactivate_value(attr.values[0].id).await.unwrap();
  let matched = s
    .match_subject_mappings(vec![property("f", "x")])
    .await
    .unwrap();
  assert_eq!(matched.len(), 1);
  assert_eq!(matched[0].attribute_value.id, attr.values[1].id);

  s.deactivate_attribute(attr.id).await.unwrap();
  let matched = s
    .match_subject_mappings(vec![property("f", "x")])
    .await
    .unwrap();
  assert!(matched.is_empty());
}
