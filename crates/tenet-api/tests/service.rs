use tenet_api::{
  Code, PolicyService,
  attributes::CreateAttributeRequest,
  error,
  request::UpdateMetadataRequest,
  values::UpdateValueRequest,
};
use tenet_core::{enums::ActiveState, namespace::NewNamespace};
use tenet_store_sqlite::SqliteStore;

async fn service() -> PolicyService<SqliteStore> {
  PolicyService::new(SqliteStore::open_in_memory().await.unwrap())
}

fn attribute_request(namespace_id: &str, name: &str) -> CreateAttributeRequest {
  CreateAttributeRequest {
    namespace_id: namespace_id.to_owned(),
    name:         name.to_owned(),
    rule:         Some(3.into()),
    values:       vec!["high".into(), "low".into()],
    metadata:     None,
  }
}

#[tokio::test]
async fn list_attributes_by_namespace_filters_state() {
  let svc = service().await;
  let ns = svc
    .create_namespace(NewNamespace::named("example.com"))
    .await
    .unwrap();
  let ns_id = ns.id.to_string();
  let kept = svc.create_attribute(attribute_request(&ns_id, "a")).await.unwrap();
  let gone = svc.create_attribute(attribute_request(&ns_id, "b")).await.unwrap();
  svc
    .deactivate_attribute(&gone.id.to_string())
    .await
    .unwrap();

  let active = svc
    .list_attributes_by_namespace(&ns_id, ActiveState::Active)
    .await
    .unwrap();
  assert_eq!(active, [kept]);

  let any = svc
    .list_attributes_by_namespace(&ns_id, ActiveState::Any)
    .await
    .unwrap();
  assert_eq!(any.len(), 2);
  assert!(any[1].values.iter().all(|v| !v.active));
}

#[tokio::test]
async fn malformed_ids_are_invalid_arguments() {
  let svc = service().await;

  let err = svc.get_attribute("1234").await.unwrap_err();
  assert_eq!(err.code, Code::InvalidArgument);
  assert_eq!(err.message, error::UUID_INVALID);

  // The simple form parses as a UUID elsewhere but is not canonical.
  let simple = uuid::Uuid::new_v4().simple().to_string();
  let err = svc.delete_value(&simple).await.unwrap_err();
  assert_eq!(err.message, error::UUID_INVALID);

  let err = svc
    .update_value(&uuid::Uuid::new_v4().to_string(), UpdateValueRequest {
      members: Some(vec!["nope".into()]),
      ..UpdateValueRequest::default()
    })
    .await
    .unwrap_err();
  assert_eq!(err.message, error::UUID_INVALID);
}

#[tokio::test]
async fn empty_update_returns_current_state() {
  let svc = service().await;
  let ns = svc
    .create_namespace(NewNamespace::named("example.com"))
    .await
    .unwrap();
  let same = svc
    .update_namespace(&ns.id.to_string(), UpdateMetadataRequest::default())
    .await
    .unwrap();
  assert_eq!(same, ns);
}
