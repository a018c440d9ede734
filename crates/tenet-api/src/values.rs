//! Attribute value operations.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/attributes/{id}/values` | Optional `?state=` |
//! | `POST`   | `/attributes/{id}/values` | Body: `{"value":"secret","members":[..]}` |
//! | `GET`    | `/values` | Every value, optional `?state=` |
//! | `GET`    | `/values/{id}` | 404 if not found |
//! | `PATCH`  | `/values/{id}` | Members and metadata |
//! | `DELETE` | `/values/{id}` | Returns the deleted value |
//! | `POST`   | `/values/{id}/deactivate` | Siblings are untouched |
//! | `POST`   | `/values/{id}/kas-grants/{kas_id}` | Assign a KAS |
//! | `DELETE` | `/values/{id}/kas-grants/{kas_id}` | Remove a KAS |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tenet_core::{
  Result,
  attribute::{NewValue, Value, ValueUpdate},
  enums::{ActiveState, EnumInput},
  kas::KasGrant,
  metadata::MetadataMutable,
  store::{AttributeValueStore as _, PolicyStore},
};

use crate::{
  PolicyService,
  error::{
    ApiError, CREATION_FAILED, DEACTIVATION_FAILED, DELETION_FAILED,
    LIST_RETRIEVAL_FAILED, OrStatus as _, RETRIEVAL_FAILED, UPDATE_FAILED,
  },
  request::{StateParams, metadata_update, parse_id, parse_ids},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateValueRequest {
  pub value:    String,
  #[serde(default)]
  pub members:  Vec<String>,
  #[serde(default)]
  pub metadata: Option<MetadataMutable>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateValueRequest {
  #[serde(default)]
  pub members:                  Option<Vec<String>>,
  #[serde(default)]
  pub metadata:                 Option<MetadataMutable>,
  #[serde(default)]
  pub metadata_update_behavior: Option<EnumInput>,
}

impl UpdateValueRequest {
  pub fn resolve(self) -> Result<ValueUpdate> {
    Ok(ValueUpdate {
      members:  self.members.as_deref().map(parse_ids).transpose()?,
      metadata: metadata_update(
        self.metadata,
        self.metadata_update_behavior.as_ref(),
      )?,
    })
  }
}

impl<S: PolicyStore> PolicyService<S> {
  pub async fn create_value(
    &self,
    attribute_id: &str,
    request: CreateValueRequest,
  ) -> Result<Value, ApiError> {
    let input = NewValue {
      attribute_id: parse_id(attribute_id).or_status(CREATION_FAILED)?,
      value:        request.value,
      members:      parse_ids(&request.members).or_status(CREATION_FAILED)?,
      metadata:     request.metadata,
    };
    self.store.create_value(input).await.or_status(CREATION_FAILED)
  }

  pub async fn get_value(&self, id: &str) -> Result<Value, ApiError> {
    let id = parse_id(id).or_status(RETRIEVAL_FAILED)?;
    self.store.get_value(id).await.or_status(RETRIEVAL_FAILED)
  }

  pub async fn list_values(
    &self,
    attribute_id: &str,
    state: ActiveState,
  ) -> Result<Vec<Value>, ApiError> {
    let attribute_id = parse_id(attribute_id).or_status(LIST_RETRIEVAL_FAILED)?;
    self
      .store
      .list_values(attribute_id, state)
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn list_all_values(
    &self,
    state: ActiveState,
  ) -> Result<Vec<Value>, ApiError> {
    self
      .store
      .list_all_values(state)
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn update_value(
    &self,
    id: &str,
    request: UpdateValueRequest,
  ) -> Result<Value, ApiError> {
    let id = parse_id(id).or_status(UPDATE_FAILED)?;
    let update = request.resolve().or_status(UPDATE_FAILED)?;
    self.store.update_value(id, update).await.or_status(UPDATE_FAILED)
  }

  pub async fn deactivate_value(&self, id: &str) -> Result<Value, ApiError> {
    let id = parse_id(id).or_status(DEACTIVATION_FAILED)?;
    self
      .store
      .deactivate_value(id)
      .await
      .or_status(DEACTIVATION_FAILED)
  }

  pub async fn delete_value(&self, id: &str) -> Result<Value, ApiError> {
    let id = parse_id(id).or_status(DELETION_FAILED)?;
    self.store.delete_value(id).await.or_status(DELETION_FAILED)
  }

  pub async fn assign_value_kas(
    &self,
    value_id: &str,
    kas_id: &str,
  ) -> Result<KasGrant, ApiError> {
    let value_id = parse_id(value_id).or_status(CREATION_FAILED)?;
    let kas_id = parse_id(kas_id).or_status(CREATION_FAILED)?;
    self
      .store
      .assign_value_kas(value_id, kas_id)
      .await
      .or_status(CREATION_FAILED)
  }

  pub async fn remove_value_kas(
    &self,
    value_id: &str,
    kas_id: &str,
  ) -> Result<KasGrant, ApiError> {
    let value_id = parse_id(value_id).or_status(DELETION_FAILED)?;
    let kas_id = parse_id(kas_id).or_status(DELETION_FAILED)?;
    self
      .store
      .remove_value_kas(value_id, kas_id)
      .await
      .or_status(DELETION_FAILED)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /attributes/{id}/values[?state=<state>]`
pub async fn list<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(attribute_id): Path<String>,
  Query(params): Query<StateParams>,
) -> Result<Json<Vec<Value>>, ApiError> {
  let state = params.state().or_status(LIST_RETRIEVAL_FAILED)?;
  Ok(Json(service.list_values(&attribute_id, state).await?))
}

/// `POST /attributes/{id}/values`
pub async fn create<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(attribute_id): Path<String>,
  Json(body): Json<CreateValueRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let value = service.create_value(&attribute_id, body).await?;
  Ok((StatusCode::CREATED, Json(value)))
}

/// `GET /values[?state=<state>]`
pub async fn list_all<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Query(params): Query<StateParams>,
) -> Result<Json<Vec<Value>>, ApiError> {
  let state = params.state().or_status(LIST_RETRIEVAL_FAILED)?;
  Ok(Json(service.list_all_values(state).await?))
}

/// `GET /values/{id}`
pub async fn get_one<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
  Ok(Json(service.get_value(&id).await?))
}

/// `PATCH /values/{id}`
pub async fn update<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateValueRequest>,
) -> Result<Json<Value>, ApiError> {
  Ok(Json(service.update_value(&id, body).await?))
}

/// `POST /values/{id}/deactivate`
pub async fn deactivate<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
  Ok(Json(service.deactivate_value(&id).await?))
}

/// `DELETE /values/{id}`
pub async fn delete<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
  Ok(Json(service.delete_value(&id).await?))
}

/// `POST /values/{id}/kas-grants/{kas_id}`
pub async fn assign_kas<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path((id, kas_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ApiError> {
  let grant = service.assign_value_kas(&id, &kas_id).await?;
  Ok((StatusCode::CREATED, Json(grant)))
}

/// `DELETE /values/{id}/kas-grants/{kas_id}`
pub async fn remove_kas<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path((id, kas_id)): Path<(String, String)>,
) -> Result<Json<KasGrant>, ApiError> {
  Ok(Json(service.remove_value_kas(&id, &kas_id).await?))
}
