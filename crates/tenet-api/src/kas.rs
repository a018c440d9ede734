//! Key-access server registry operations.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/kas` | Creation order |
//! | `POST`   | `/kas` | Body: `{"uri":..,"public_key":{"remote":..}}` |
//! | `GET`    | `/kas/grants` | Optional `?kas_id=` |
//! | `GET`    | `/kas/{id}` | 404 if not found |
//! | `PATCH`  | `/kas/{id}` | Only the supplied fields change |
//! | `DELETE` | `/kas/{id}` | Drops its grants |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tenet_core::{
  Result,
  enums::EnumInput,
  kas::{KasGrants, KasUpdate, KeyAccessServer, NewKeyAccessServer, PublicKey},
  metadata::MetadataMutable,
  store::{KasRegistryStore as _, PolicyStore},
};

use crate::{
  PolicyService,
  error::{
    ApiError, CREATION_FAILED, DELETION_FAILED, LIST_RETRIEVAL_FAILED,
    OrStatus as _, RETRIEVAL_FAILED, UPDATE_FAILED,
  },
  request::{metadata_update, parse_id},
};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateKasRequest {
  #[serde(default)]
  pub uri:                      Option<String>,
  #[serde(default)]
  pub public_key:               Option<PublicKey>,
  #[serde(default)]
  pub metadata:                 Option<MetadataMutable>,
  #[serde(default)]
  pub metadata_update_behavior: Option<EnumInput>,
}

impl UpdateKasRequest {
  pub fn resolve(self) -> Result<KasUpdate> {
    Ok(KasUpdate {
      uri:        self.uri,
      public_key: self.public_key,
      metadata:   metadata_update(
        self.metadata,
        self.metadata_update_behavior.as_ref(),
      )?,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct KasGrantsParams {
  pub kas_id: Option<String>,
}

impl<S: PolicyStore> PolicyService<S> {
  pub async fn create_kas(
    &self,
    request: NewKeyAccessServer,
  ) -> Result<KeyAccessServer, ApiError> {
    self.store.create_kas(request).await.or_status(CREATION_FAILED)
  }

  pub async fn get_kas(&self, id: &str) -> Result<KeyAccessServer, ApiError> {
    let id = parse_id(id).or_status(RETRIEVAL_FAILED)?;
    self.store.get_kas(id).await.or_status(RETRIEVAL_FAILED)
  }

  pub async fn list_kas(&self) -> Result<Vec<KeyAccessServer>, ApiError> {
    self.store.list_kas().await.or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn update_kas(
    &self,
    id: &str,
    request: UpdateKasRequest,
  ) -> Result<KeyAccessServer, ApiError> {
    let id = parse_id(id).or_status(UPDATE_FAILED)?;
    let update = request.resolve().or_status(UPDATE_FAILED)?;
    self.store.update_kas(id, update).await.or_status(UPDATE_FAILED)
  }

  pub async fn delete_kas(&self, id: &str) -> Result<KeyAccessServer, ApiError> {
    let id = parse_id(id).or_status(DELETION_FAILED)?;
    self.store.delete_kas(id).await.or_status(DELETION_FAILED)
  }

  pub async fn list_kas_grants(
    &self,
    kas_id: Option<&str>,
  ) -> Result<Vec<KasGrants>, ApiError> {
    let kas_id = kas_id
      .map(parse_id)
      .transpose()
      .or_status(LIST_RETRIEVAL_FAILED)?;
    self
      .store
      .list_kas_grants(kas_id)
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /kas`
pub async fn list<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
) -> Result<Json<Vec<KeyAccessServer>>, ApiError> {
  Ok(Json(service.list_kas().await?))
}

/// `POST /kas`
pub async fn create<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<NewKeyAccessServer>,
) -> Result<impl IntoResponse, ApiError> {
  let kas = service.create_kas(body).await?;
  Ok((StatusCode::CREATED, Json(kas)))
}

/// `GET /kas/grants[?kas_id=<id>]`
pub async fn grants<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Query(params): Query<KasGrantsParams>,
) -> Result<Json<Vec<KasGrants>>, ApiError> {
  Ok(Json(service.list_kas_grants(params.kas_id.as_deref()).await?))
}

/// `GET /kas/{id}`
pub async fn get_one<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<KeyAccessServer>, ApiError> {
  Ok(Json(service.get_kas(&id).await?))
}

/// `PATCH /kas/{id}`
pub async fn update<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateKasRequest>,
) -> Result<Json<KeyAccessServer>, ApiError> {
  Ok(Json(service.update_kas(&id, body).await?))
}

/// `DELETE /kas/{id}`
pub async fn delete<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<KeyAccessServer>, ApiError> {
  Ok(Json(service.delete_kas(&id).await?))
}
