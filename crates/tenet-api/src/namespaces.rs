//! Namespace operations and their `/namespaces` handlers.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/namespaces` | Optional `?state=active\|inactive\|any` |
//! | `POST`   | `/namespaces` | Body: `{"name":"example.com"}` |
//! | `GET`    | `/namespaces/{id}` | 404 if not found |
//! | `PATCH`  | `/namespaces/{id}` | Body: `{"metadata":{..},"metadata_update_behavior":"REPLACE"}` |
//! | `DELETE` | `/namespaces/{id}` | Returns the deleted namespace |
//! | `POST`   | `/namespaces/{id}/deactivate` | Cascades to attributes and values |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use tenet_core::{
  enums::ActiveState,
  namespace::{Namespace, NewNamespace},
  store::{NamespaceStore as _, PolicyStore},
};

use crate::{
  PolicyService,
  error::{
    ApiError, CREATION_FAILED, DEACTIVATION_FAILED, DELETION_FAILED,
    LIST_RETRIEVAL_FAILED, OrStatus as _, RETRIEVAL_FAILED, UPDATE_FAILED,
  },
  request::{StateParams, UpdateMetadataRequest, parse_id},
};

impl<S: PolicyStore> PolicyService<S> {
  pub async fn create_namespace(
    &self,
    request: NewNamespace,
  ) -> Result<Namespace, ApiError> {
    self
      .store
      .create_namespace(request)
      .await
      .or_status(CREATION_FAILED)
  }

  pub async fn get_namespace(&self, id: &str) -> Result<Namespace, ApiError> {
    let id = parse_id(id).or_status(RETRIEVAL_FAILED)?;
    self.store.get_namespace(id).await.or_status(RETRIEVAL_FAILED)
  }

  pub async fn list_namespaces(
    &self,
    state: ActiveState,
  ) -> Result<Vec<Namespace>, ApiError> {
    self
      .store
      .list_namespaces(state)
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn update_namespace(
    &self,
    id: &str,
    request: UpdateMetadataRequest,
  ) -> Result<Namespace, ApiError> {
    let id = parse_id(id).or_status(UPDATE_FAILED)?;
    let metadata = request.resolve().or_status(UPDATE_FAILED)?;
    self
      .store
      .update_namespace(id, metadata)
      .await
      .or_status(UPDATE_FAILED)
  }

  pub async fn deactivate_namespace(
    &self,
    id: &str,
  ) -> Result<Namespace, ApiError> {
    let id = parse_id(id).or_status(DEACTIVATION_FAILED)?;
    self
      .store
      .deactivate_namespace(id)
      .await
      .or_status(DEACTIVATION_FAILED)
  }

  pub async fn delete_namespace(&self, id: &str) -> Result<Namespace, ApiError> {
    let id = parse_id(id).or_status(DELETION_FAILED)?;
    self.store.delete_namespace(id).await.or_status(DELETION_FAILED)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /namespaces[?state=<state>]`
pub async fn list<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Query(params): Query<StateParams>,
) -> Result<Json<Vec<Namespace>>, ApiError> {
  let state = params.state().or_status(LIST_RETRIEVAL_FAILED)?;
  Ok(Json(service.list_namespaces(state).await?))
}

/// `POST /namespaces`
pub async fn create<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<NewNamespace>,
) -> Result<impl IntoResponse, ApiError> {
  let namespace = service.create_namespace(body).await?;
  Ok((StatusCode::CREATED, Json(namespace)))
}

/// `GET /namespaces/{id}`
pub async fn get_one<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Namespace>, ApiError> {
  Ok(Json(service.get_namespace(&id).await?))
}

/// `PATCH /namespaces/{id}`
pub async fn update<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateMetadataRequest>,
) -> Result<Json<Namespace>, ApiError> {
  Ok(Json(service.update_namespace(&id, body).await?))
}

/// `POST /namespaces/{id}/deactivate`
pub async fn deactivate<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Namespace>, ApiError> {
  Ok(Json(service.deactivate_namespace(&id).await?))
}

/// `DELETE /namespaces/{id}`
pub async fn delete<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<Namespace>, ApiError> {
  Ok(Json(service.delete_namespace(&id).await?))
}
