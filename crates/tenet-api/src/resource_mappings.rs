//! Resource mapping and resource mapping group operations.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/resource-mappings` | |
//! | `POST`   | `/resource-mappings` | Body: `{"attribute_value_id":..,"terms":[..],"group_id":..}` |
//! | `GET`    | `/resource-mappings/{id}` | 404 if not found |
//! | `PATCH`  | `/resource-mappings/{id}` | Value, terms, group and metadata |
//! | `DELETE` | `/resource-mappings/{id}` | Returns the deleted mapping |
//! | `GET`    | `/resource-mapping-groups` | Optional `?namespace_id=` |
//! | `POST`   | `/resource-mapping-groups` | Body: `{"namespace_id":..,"name":"nato"}` |
//! | `GET`    | `/resource-mapping-groups/by-fqn` | `?fqn=https://<ns>/resm/<name>` |
//! | `GET`    | `/resource-mapping-groups/{id}` | 404 if not found |
//! | `PATCH`  | `/resource-mapping-groups/{id}` | Namespace and name |
//! | `DELETE` | `/resource-mapping-groups/{id}` | Mappings in the group are kept, ungrouped |

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
  mapping::{
    NewResourceMapping, NewResourceMappingGroup, ResourceMapping,
    ResourceMappingGroup, ResourceMappingGroupUpdate, ResourceMappingUpdate,
  },
  metadata::MetadataMutable,
  store::{PolicyStore, ResourceMappingStore as _},
};

use crate::{
  PolicyService,
  attributes::FqnParams,
  error::{
    ApiError, CREATION_FAILED, DELETION_FAILED, LIST_RETRIEVAL_FAILED,
    OrStatus as _, RETRIEVAL_FAILED, UPDATE_FAILED,
  },
  request::{metadata_update, parse_id},
};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateResourceMappingRequest {
  pub attribute_value_id: String,
  #[serde(default)]
  pub terms:              Vec<String>,
  #[serde(default)]
  pub group_id:           Option<String>,
  #[serde(default)]
  pub metadata:           Option<MetadataMutable>,
}

impl CreateResourceMappingRequest {
  pub fn resolve(self) -> Result<NewResourceMapping> {
    Ok(NewResourceMapping {
      attribute_value_id: parse_id(&self.attribute_value_id)?,
      terms:              self.terms,
      group_id:           self.group_id.as_deref().map(parse_id).transpose()?,
      metadata:           self.metadata,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateResourceMappingRequest {
  #[serde(default)]
  pub attribute_value_id:       Option<String>,
  #[serde(default)]
  pub terms:                    Option<Vec<String>>,
  #[serde(default)]
  pub group_id:                 Option<String>,
  #[serde(default)]
  pub metadata:                 Option<MetadataMutable>,
  #[serde(default)]
  pub metadata_update_behavior: Option<EnumInput>,
}

impl UpdateResourceMappingRequest {
  pub fn resolve(self) -> Result<ResourceMappingUpdate> {
    Ok(ResourceMappingUpdate {
      attribute_value_id: self
        .attribute_value_id
        .as_deref()
        .map(parse_id)
        .transpose()?,
      terms:              self.terms,
      group_id:           self.group_id.as_deref().map(parse_id).transpose()?,
      metadata:           metadata_update(
        self.metadata,
        self.metadata_update_behavior.as_ref(),
      )?,
    })
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateResourceMappingGroupRequest {
  pub namespace_id: String,
  pub name:         String,
}

impl CreateResourceMappingGroupRequest {
  pub fn resolve(self) -> Result<NewResourceMappingGroup> {
    Ok(NewResourceMappingGroup {
      namespace_id: parse_id(&self.namespace_id)?,
      name:         self.name,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateResourceMappingGroupRequest {
  #[serde(default)]
  pub namespace_id: Option<String>,
  #[serde(default)]
  pub name:         Option<String>,
}

impl UpdateResourceMappingGroupRequest {
  pub fn resolve(self) -> Result<ResourceMappingGroupUpdate> {
    Ok(ResourceMappingGroupUpdate {
      namespace_id: self.namespace_id.as_deref().map(parse_id).transpose()?,
      name:         self.name,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListGroupsParams {
  pub namespace_id: Option<String>,
}

impl<S: PolicyStore> PolicyService<S> {
  pub async fn create_resource_mapping(
    &self,
    request: CreateResourceMappingRequest,
  ) -> Result<ResourceMapping, ApiError> {
    let input = request.resolve().or_status(CREATION_FAILED)?;
    self
      .store
      .create_resource_mapping(input)
      .await
      .or_status(CREATION_FAILED)
  }

  pub async fn get_resource_mapping(
    &self,
    id: &str,
  ) -> Result<ResourceMapping, ApiError> {
    let id = parse_id(id).or_status(RETRIEVAL_FAILED)?;
    self
      .store
      .get_resource_mapping(id)
      .await
      .or_status(RETRIEVAL_FAILED)
  }

  pub async fn list_resource_mappings(
    &self,
  ) -> Result<Vec<ResourceMapping>, ApiError> {
    self
      .store
      .list_resource_mappings()
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn update_resource_mapping(
    &self,
    id: &str,
    request: UpdateResourceMappingRequest,
  ) -> Result<ResourceMapping, ApiError> {
    let id = parse_id(id).or_status(UPDATE_FAILED)?;
    let update = request.resolve().or_status(UPDATE_FAILED)?;
    self
      .store
      .update_resource_mapping(id, update)
      .await
      .or_status(UPDATE_FAILED)
  }

  pub async fn delete_resource_mapping(
    &self,
    id: &str,
  ) -> Result<ResourceMapping, ApiError> {
    let id = parse_id(id).or_status(DELETION_FAILED)?;
    self
      .store
      .delete_resource_mapping(id)
      .await
      .or_status(DELETION_FAILED)
  }

  pub async fn create_resource_mapping_group(
    &self,
    request: CreateResourceMappingGroupRequest,
  ) -> Result<ResourceMappingGroup, ApiError> {
    let input = request.resolve().or_status(CREATION_FAILED)?;
    self
      .store
      .create_resource_mapping_group(input)
      .await
      .or_status(CREATION_FAILED)
  }

  pub async fn get_resource_mapping_group(
    &self,
    id: &str,
  ) -> Result<ResourceMappingGroup, ApiError> {
    let id = parse_id(id).or_status(RETRIEVAL_FAILED)?;
    self
      .store
      .get_resource_mapping_group(id)
      .await
      .or_status(RETRIEVAL_FAILED)
  }

  pub async fn get_resource_mapping_group_by_fqn(
    &self,
    fqn: String,
  ) -> Result<ResourceMappingGroup, ApiError> {
    self
      .store
      .get_resource_mapping_group_by_fqn(fqn)
      .await
      .or_status(RETRIEVAL_FAILED)
  }

  pub async fn list_resource_mapping_groups(
    &self,
    namespace_id: Option<&str>,
  ) -> Result<Vec<ResourceMappingGroup>, ApiError> {
    let namespace_id = namespace_id
      .map(parse_id)
      .transpose()
      .or_status(LIST_RETRIEVAL_FAILED)?;
    self
      .store
      .list_resource_mapping_groups(namespace_id)
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn update_resource_mapping_group(
    &self,
    id: &str,
    request: UpdateResourceMappingGroupRequest,
  ) -> Result<ResourceMappingGroup, ApiError> {
    let id = parse_id(id).or_status(UPDATE_FAILED)?;
    let update = request.resolve().or_status(UPDATE_FAILED)?;
    self
      .store
      .update_resource_mapping_group(id, update)
      .await
      .or_status(UPDATE_FAILED)
  }

  pub async fn delete_resource_mapping_group(
    &self,
    id: &str,
  ) -> Result<ResourceMappingGroup, ApiError> {
    let id = parse_id(id).or_status(DELETION_FAILED)?;
    self
      .store
      .delete_resource_mapping_group(id)
      .await
      .or_status(DELETION_FAILED)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /resource-mappings`
pub async fn list<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
) -> Result<Json<Vec<ResourceMapping>>, ApiError> {
  Ok(Json(service.list_resource_mappings().await?))
}

/// `POST /resource-mappings`
pub async fn create<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<CreateResourceMappingRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let mapping = service.create_resource_mapping(body).await?;
  Ok((StatusCode::CREATED, Json(mapping)))
}

/// `GET /resource-mappings/{id}`
pub async fn get_one<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<ResourceMapping>, ApiError> {
  Ok(Json(service.get_resource_mapping(&id).await?))
}

/// `PATCH /resource-mappings/{id}`
pub async fn update<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateResourceMappingRequest>,
) -> Result<Json<ResourceMapping>, ApiError> {
  Ok(Json(service.update_resource_mapping(&id, body).await?))
}

/// `DELETE /resource-mappings/{id}`
pub async fn delete<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<ResourceMapping>, ApiError> {
  Ok(Json(service.delete_resource_mapping(&id).await?))
}

/// `GET /resource-mapping-groups[?namespace_id=<id>]`
pub async fn list_groups<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Query(params): Query<ListGroupsParams>,
) -> Result<Json<Vec<ResourceMappingGroup>>, ApiError> {
  let groups = service
    .list_resource_mapping_groups(params.namespace_id.as_deref())
    .await?;
  Ok(Json(groups))
}

/// `POST /resource-mapping-groups`
pub async fn create_group<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<CreateResourceMappingGroupRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let group = service.create_resource_mapping_group(body).await?;
  Ok((StatusCode::CREATED, Json(group)))
}

/// `GET /resource-mapping-groups/by-fqn?fqn=<fqn>`
pub async fn group_by_fqn<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Query(params): Query<FqnParams>,
) -> Result<Json<ResourceMappingGroup>, ApiError> {
  Ok(Json(service.get_resource_mapping_group_by_fqn(params.fqn).await?))
}

/// `GET /resource-mapping-groups/{id}`
pub async fn get_group<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<ResourceMappingGroup>, ApiError> {
  Ok(Json(service.get_resource_mapping_group(&id).await?))
}

/// `PATCH /resource-mapping-groups/{id}`
pub async fn update_group<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateResourceMappingGroupRequest>,
) -> Result<Json<ResourceMappingGroup>, ApiError> {
  Ok(Json(service.update_resource_mapping_group(&id, body).await?))
}

/// `DELETE /resource-mapping-groups/{id}`
pub async fn delete_group<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<ResourceMappingGroup>, ApiError> {
  Ok(Json(service.delete_resource_mapping_group(&id).await?))
}
