//! Attribute definition operations and their `/attributes` handlers.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/attributes` | Optional `?state=` and `?namespace=<id or name>` |
//! | `POST`   | `/attributes` | Body: `{"namespace_id":..,"name":..,"rule":"ANY_OF","values":[..]}` |
//! | `GET`    | `/attributes/by-fqn` | `?fqn=https://<ns>/attr/<name>[/value/<value>]` |
//! | `POST`   | `/attributes/by-value-fqns` | Body: `{"fqns":[..]}` |
//! | `GET`    | `/attributes/{id}` | 404 if not found |
//! | `PATCH`  | `/attributes/{id}` | Metadata only |
//! | `DELETE` | `/attributes/{id}` | Returns the deleted attribute |
//! | `POST`   | `/attributes/{id}/deactivate` | Cascades to values |
//! | `POST`   | `/attributes/{id}/kas-grants/{kas_id}` | Assign a KAS |
//! | `DELETE` | `/attributes/{id}/kas-grants/{kas_id}` | Remove a KAS |
//! | `GET`    | `/namespaces/{id}/attributes` | Optional `?state=` |

use std::collections::BTreeMap;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tenet_core::{
  Result,
  attribute::{
    Attribute, AttributeAndValue, AttributeQuery, AttributeRule, FqnMatch,
    NamespaceSelector, NewAttribute,
  },
  enums::{ActiveState, EnumInput, resolve_or_default},
  kas::KasGrant,
  metadata::MetadataMutable,
  store::{AttributeStore as _, PolicyStore},
};

use crate::{
  PolicyService,
  error::{
    ApiError, CREATION_FAILED, DEACTIVATION_FAILED, DELETION_FAILED,
    LIST_RETRIEVAL_FAILED, OrStatus as _, RETRIEVAL_FAILED, UPDATE_FAILED,
  },
  request::{StateParams, UpdateMetadataRequest, parse_id, parse_state},
};

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateAttributeRequest {
  pub namespace_id: String,
  pub name:         String,
  #[serde(default)]
  pub rule:         Option<EnumInput>,
  #[serde(default)]
  pub values:       Vec<String>,
  #[serde(default)]
  pub metadata:     Option<MetadataMutable>,
}

impl CreateAttributeRequest {
  pub fn resolve(self) -> Result<NewAttribute> {
    Ok(NewAttribute {
      namespace_id: parse_id(&self.namespace_id)?,
      name:         self.name,
      rule:         resolve_or_default::<AttributeRule>(self.rule.as_ref())?,
      values:       self.values,
      metadata:     self.metadata,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListAttributesParams {
  pub state:     Option<String>,
  /// A namespace id or name.
  pub namespace: Option<String>,
}

impl ListAttributesParams {
  pub fn resolve(&self) -> Result<AttributeQuery> {
    Ok(AttributeQuery {
      state:     parse_state(self.state.as_deref())?,
      namespace: self.namespace.as_deref().map(NamespaceSelector::parse),
    })
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct FqnParams {
  pub fqn: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ValueFqnsRequest {
  pub fqns: Vec<String>,
}

// ─── Facade ──────────────────────────────────────────────────────────────────

impl<S: PolicyStore> PolicyService<S> {
  pub async fn create_attribute(
    &self,
    request: CreateAttributeRequest,
  ) -> Result<Attribute, ApiError> {
    let input = request.resolve().or_status(CREATION_FAILED)?;
    self
      .store
      .create_attribute(input)
      .await
      .or_status(CREATION_FAILED)
  }

  pub async fn get_attribute(&self, id: &str) -> Result<Attribute, ApiError> {
    let id = parse_id(id).or_status(RETRIEVAL_FAILED)?;
    self.store.get_attribute(id).await.or_status(RETRIEVAL_FAILED)
  }

  pub async fn get_attribute_by_fqn(
    &self,
    fqn: String,
  ) -> Result<FqnMatch, ApiError> {
    self
      .store
      .get_attribute_by_fqn(fqn)
      .await
      .or_status(RETRIEVAL_FAILED)
  }

  pub async fn get_attributes_by_value_fqns(
    &self,
    request: ValueFqnsRequest,
  ) -> Result<BTreeMap<String, AttributeAndValue>, ApiError> {
    self
      .store
      .get_attributes_by_value_fqns(request.fqns)
      .await
      .or_status(RETRIEVAL_FAILED)
  }

  pub async fn list_attributes(
    &self,
    query: AttributeQuery,
  ) -> Result<Vec<Attribute>, ApiError> {
    self
      .store
      .list_attributes(query)
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn list_attributes_by_namespace(
    &self,
    namespace_id: &str,
    state: ActiveState,
  ) -> Result<Vec<Attribute>, ApiError> {
    let namespace_id = parse_id(namespace_id).or_status(LIST_RETRIEVAL_FAILED)?;
    self
      .store
      .list_attributes_by_namespace(namespace_id, state)
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn update_attribute(
    &self,
    id: &str,
    request: UpdateMetadataRequest,
  ) -> Result<Attribute, ApiError> {
    let id = parse_id(id).or_status(UPDATE_FAILED)?;
    let metadata = request.resolve().or_status(UPDATE_FAILED)?;
    self
      .store
      .update_attribute(id, metadata)
      .await
      .or_status(UPDATE_FAILED)
  }

  pub async fn deactivate_attribute(
    &self,
    id: &str,
  ) -> Result<Attribute, ApiError> {
    let id = parse_id(id).or_status(DEACTIVATION_FAILED)?;
    self
      .store
      .deactivate_attribute(id)
      .await
      .or_status(DEACTIVATION_FAILED)
  }

  pub async fn delete_attribute(&self, id: &str) -> Result<Attribute, ApiError> {
    let id = parse_id(id).or_status(DELETION_FAILED)?;
    self.store.delete_attribute(id).await.or_status(DELETION_FAILED)
  }

  pub async fn assign_attribute_kas(
    &self,
    attribute_id: &str,
    kas_id: &str,
  ) -> Result<KasGrant, ApiError> {
    let attribute_id = parse_id(attribute_id).or_status(CREATION_FAILED)?;
    let kas_id = parse_id(kas_id).or_status(CREATION_FAILED)?;
    self
      .store
      .assign_attribute_kas(attribute_id, kas_id)
      .await
      .or_status(CREATION_FAILED)
  }

  pub async fn remove_attribute_kas(
    &self,
    attribute_id: &str,
    kas_id: &str,
  ) -> Result<KasGrant, ApiError> {
    let attribute_id = parse_id(attribute_id).or_status(DELETION_FAILED)?;
    let kas_id = parse_id(kas_id).or_status(DELETION_FAILED)?;
    self
      .store
      .remove_attribute_kas(attribute_id, kas_id)
      .await
      .or_status(DELETION_FAILED)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /attributes[?state=<state>&namespace=<id or name>]`
pub async fn list<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Query(params): Query<ListAttributesParams>,
) -> Result<Json<Vec<Attribute>>, ApiError> {
  let query = params.resolve().or_status(LIST_RETRIEVAL_FAILED)?;
  Ok(Json(service.list_attributes(query).await?))
}

/// `GET /namespaces/{id}/attributes[?state=<state>]`
pub async fn list_by_namespace<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(namespace_id): Path<String>,
  Query(params): Query<StateParams>,
) -> Result<Json<Vec<Attribute>>, ApiError> {
  let state = params.state().or_status(LIST_RETRIEVAL_FAILED)?;
  let attributes = service
    .list_attributes_by_namespace(&namespace_id, state)
    .await?;
  Ok(Json(attributes))
}

/// `POST /attributes`
pub async fn create<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<CreateAttributeRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let attribute = service.create_attribute(body).await?;
  Ok((StatusCode::CREATED, Json(attribute)))
}

/// `GET /attributes/by-fqn?fqn=<fqn>`
pub async fn by_fqn<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Query(params): Query<FqnParams>,
) -> Result<Json<FqnMatch>, ApiError> {
  Ok(Json(service.get_attribute_by_fqn(params.fqn).await?))
}

/// `POST /attributes/by-value-fqns`
pub async fn by_value_fqns<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<ValueFqnsRequest>,
) -> Result<Json<BTreeMap<String, AttributeAndValue>>, ApiError> {
  Ok(Json(service.get_attributes_by_value_fqns(body).await?))
}

/// `GET /attributes/{id}`
pub async fn get_one<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Attribute>, ApiError> {
  Ok(Json(service.get_attribute(&id).await?))
}

/// `PATCH /attributes/{id}`
pub async fn update<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateMetadataRequest>,
) -> Result<Json<Attribute>, ApiError> {
  Ok(Json(service.update_attribute(&id, body).await?))
}

/// `POST /attributes/{id}/deactivate`
pub async fn deactivate<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Attribute>, ApiError> {
  Ok(Json(service.deactivate_attribute(&id).await?))
}

/// `DELETE /attributes/{id}`
pub async fn delete<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Attribute>, ApiError> {
  Ok(Json(service.delete_attribute(&id).await?))
}

/// `POST /attributes/{id}/kas-grants/{kas_id}`
pub async fn assign_kas<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path((id, kas_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
  let grant = service.assign_attribute_kas(&id, &kas_id).await?;
  Ok((StatusCode::CREATED, Json(grant)))
}

/// `DELETE /attributes/{id}/kas-grants/{kas_id}`
pub async fn remove_kas<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path((id, kas_id)): Path<(String, String)>,
) -> Result<Json<KasGrant>, ApiError> {
  Ok(Json(service.remove_attribute_kas(&id, &kas_id).await?))
}
