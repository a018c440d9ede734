//! Subject mapping and subject condition set operations.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/subject-mappings` | |
//! | `POST`   | `/subject-mappings` | Existing or inline condition set |
//! | `POST`   | `/subject-mappings/match` | Body: `{"subject_properties":[..]}` |
//! | `GET`    | `/subject-mappings/{id}` | 404 if not found |
//! | `PATCH`  | `/subject-mappings/{id}` | Condition set, actions, metadata |
//! | `DELETE` | `/subject-mappings/{id}` | Returns the deleted mapping |
//! | `GET`    | `/subject-condition-sets` | |
//! | `POST`   | `/subject-condition-sets` | |
//! | `DELETE` | `/subject-condition-sets` | Deletes every unmapped set |
//! | `GET`    | `/subject-condition-sets/{id}` | 404 if not found |
//! | `PATCH`  | `/subject-condition-sets/{id}` | Name, subject sets, metadata |
//! | `DELETE` | `/subject-condition-sets/{id}` | 400 while still mapped |
//!
//! Condition operators in request bodies may be given as a numeric tag, a
//! bare name (`IN`) or the prefixed wire name
//! (`SUBJECT_MAPPING_OPERATOR_ENUM_IN`). Responses always use the wire name.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;
use tenet_core::{
  Result,
  enums::EnumInput,
  mapping::{
    Action, Condition, ConditionGroup, NewSubjectConditionSet,
    NewSubjectMapping, SubjectConditionSet, SubjectConditionSetUpdate,
    SubjectMapping, SubjectMappingUpdate, SubjectProperty, SubjectSet,
  },
  metadata::MetadataMutable,
  store::{PolicyStore, SubjectMappingStore as _},
};

use crate::{
  PolicyService,
  error::{
    ApiError, CREATION_FAILED, DELETION_FAILED, LIST_RETRIEVAL_FAILED,
    OrStatus as _, RETRIEVAL_FAILED, UPDATE_FAILED,
  },
  request::{metadata_update, parse_id},
};

// ─── Condition documents ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionInput {
  pub subject_external_field:  String,
  pub operator:                EnumInput,
  #[serde(default)]
  pub subject_external_values: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConditionGroupInput {
  pub boolean_operator: EnumInput,
  #[serde(default)]
  pub conditions:       Vec<ConditionInput>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectSetInput {
  #[serde(default)]
  pub condition_groups: Vec<ConditionGroupInput>,
}

impl SubjectSetInput {
  pub fn resolve(self) -> Result<SubjectSet> {
    let condition_groups = self
      .condition_groups
      .into_iter()
      .map(|group| {
        let conditions = group
          .conditions
          .into_iter()
          .map(|c| {
            Ok(Condition {
              subject_external_field:  c.subject_external_field,
              operator:                c.operator.resolve()?,
              subject_external_values: c.subject_external_values,
            })
          })
          .collect::<Result<_>>()?;
        Ok(ConditionGroup {
          boolean_operator: group.boolean_operator.resolve()?,
          conditions,
        })
      })
      .collect::<Result<_>>()?;
    Ok(SubjectSet { condition_groups })
  }
}

fn resolve_sets(sets: Vec<SubjectSetInput>) -> Result<Vec<SubjectSet>> {
  sets.into_iter().map(SubjectSetInput::resolve).collect()
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConditionSetRequest {
  #[serde(default)]
  pub name:         Option<String>,
  #[serde(default)]
  pub subject_sets: Vec<SubjectSetInput>,
  #[serde(default)]
  pub metadata:     Option<MetadataMutable>,
}

impl CreateConditionSetRequest {
  pub fn resolve(self) -> Result<NewSubjectConditionSet> {
    Ok(NewSubjectConditionSet {
      name:         self.name,
      subject_sets: resolve_sets(self.subject_sets)?,
      metadata:     self.metadata,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateConditionSetRequest {
  #[serde(default)]
  pub name:                     Option<String>,
  #[serde(default)]
  pub subject_sets:             Option<Vec<SubjectSetInput>>,
  #[serde(default)]
  pub metadata:                 Option<MetadataMutable>,
  #[serde(default)]
  pub metadata_update_behavior: Option<EnumInput>,
}

impl UpdateConditionSetRequest {
  pub fn resolve(self) -> Result<SubjectConditionSetUpdate> {
    Ok(SubjectConditionSetUpdate {
      name:         self.name,
      subject_sets: self.subject_sets.map(resolve_sets).transpose()?,
      metadata:     metadata_update(
        self.metadata,
        self.metadata_update_behavior.as_ref(),
      )?,
    })
  }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateSubjectMappingRequest {
  pub attribute_value_id:                String,
  #[serde(default)]
  pub actions:                           Vec<Action>,
  #[serde(default)]
  pub existing_subject_condition_set_id: Option<String>,
  #[serde(default)]
  pub new_subject_condition_set:         Option<CreateConditionSetRequest>,
  #[serde(default)]
  pub metadata:                          Option<MetadataMutable>,
}

impl CreateSubjectMappingRequest {
  pub fn resolve(self) -> Result<NewSubjectMapping> {
    Ok(NewSubjectMapping {
      attribute_value_id:                parse_id(&self.attribute_value_id)?,
      actions:                           self.actions,
      existing_subject_condition_set_id: self
        .existing_subject_condition_set_id
        .as_deref()
        .map(parse_id)
        .transpose()?,
      new_subject_condition_set:         self
        .new_subject_condition_set
        .map(CreateConditionSetRequest::resolve)
        .transpose()?,
      metadata:                          self.metadata,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateSubjectMappingRequest {
  #[serde(default)]
  pub subject_condition_set_id: Option<String>,
  #[serde(default)]
  pub actions:                  Option<Vec<Action>>,
  #[serde(default)]
  pub metadata:                 Option<MetadataMutable>,
  #[serde(default)]
  pub metadata_update_behavior: Option<EnumInput>,
}

impl UpdateSubjectMappingRequest {
  pub fn resolve(self) -> Result<SubjectMappingUpdate> {
    Ok(SubjectMappingUpdate {
      subject_condition_set_id: self
        .subject_condition_set_id
        .as_deref()
        .map(parse_id)
        .transpose()?,
      actions:                  self.actions,
      metadata:                 metadata_update(
        self.metadata,
        self.metadata_update_behavior.as_ref(),
      )?,
    })
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchRequest {
  #[serde(default)]
  pub subject_properties: Vec<SubjectProperty>,
}

// ─── Facade ──────────────────────────────────────────────────────────────────

impl<S: PolicyStore> PolicyService<S> {
  pub async fn create_subject_mapping(
    &self,
    request: CreateSubjectMappingRequest,
  ) -> Result<SubjectMapping, ApiError> {
    let input = request.resolve().or_status(CREATION_FAILED)?;
    self
      .store
      .create_subject_mapping(input)
      .await
      .or_status(CREATION_FAILED)
  }

  pub async fn get_subject_mapping(
    &self,
    id: &str,
  ) -> Result<SubjectMapping, ApiError> {
    let id = parse_id(id).or_status(RETRIEVAL_FAILED)?;
    self
      .store
      .get_subject_mapping(id)
      .await
      .or_status(RETRIEVAL_FAILED)
  }

  pub async fn list_subject_mappings(
    &self,
  ) -> Result<Vec<SubjectMapping>, ApiError> {
    self
      .store
      .list_subject_mappings()
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn update_subject_mapping(
    &self,
    id: &str,
    request: UpdateSubjectMappingRequest,
  ) -> Result<SubjectMapping, ApiError> {
    let id = parse_id(id).or_status(UPDATE_FAILED)?;
    let update = request.resolve().or_status(UPDATE_FAILED)?;
    self
      .store
      .update_subject_mapping(id, update)
      .await
      .or_status(UPDATE_FAILED)
  }

  pub async fn delete_subject_mapping(
    &self,
    id: &str,
  ) -> Result<SubjectMapping, ApiError> {
    let id = parse_id(id).or_status(DELETION_FAILED)?;
    self
      .store
      .delete_subject_mapping(id)
      .await
      .or_status(DELETION_FAILED)
  }

  pub async fn match_subject_mappings(
    &self,
    request: MatchRequest,
  ) -> Result<Vec<SubjectMapping>, ApiError> {
    self
      .store
      .match_subject_mappings(request.subject_properties)
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn create_subject_condition_set(
    &self,
    request: CreateConditionSetRequest,
  ) -> Result<SubjectConditionSet, ApiError> {
    let input = request.resolve().or_status(CREATION_FAILED)?;
    self
      .store
      .create_subject_condition_set(input)
      .await
      .or_status(CREATION_FAILED)
  }

  pub async fn get_subject_condition_set(
    &self,
    id: &str,
  ) -> Result<SubjectConditionSet, ApiError> {
    let id = parse_id(id).or_status(RETRIEVAL_FAILED)?;
    self
      .store
      .get_subject_condition_set(id)
      .await
      .or_status(RETRIEVAL_FAILED)
  }

  pub async fn list_subject_condition_sets(
    &self,
  ) -> Result<Vec<SubjectConditionSet>, ApiError> {
    self
      .store
      .list_subject_condition_sets()
      .await
      .or_status(LIST_RETRIEVAL_FAILED)
  }

  pub async fn update_subject_condition_set(
    &self,
    id: &str,
    request: UpdateConditionSetRequest,
  ) -> Result<SubjectConditionSet, ApiError> {
    let id = parse_id(id).or_status(UPDATE_FAILED)?;
    let update = request.resolve().or_status(UPDATE_FAILED)?;
    self
      .store
      .update_subject_condition_set(id, update)
      .await
      .or_status(UPDATE_FAILED)
  }

  pub async fn delete_subject_condition_set(
    &self,
    id: &str,
  ) -> Result<SubjectConditionSet, ApiError> {
    let id = parse_id(id).or_status(DELETION_FAILED)?;
    self
      .store
      .delete_subject_condition_set(id)
      .await
      .or_status(DELETION_FAILED)
  }

  pub async fn delete_unmapped_subject_condition_sets(
    &self,
  ) -> Result<Vec<SubjectConditionSet>, ApiError> {
    self
      .store
      .delete_unmapped_subject_condition_sets()
      .await
      .or_status(DELETION_FAILED)
  }
}

// ─── Handlers ────────────────────────────────────────────────────────────────

/// `GET /subject-mappings`
pub async fn list<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
) -> Result<Json<Vec<SubjectMapping>>, ApiError> {
  Ok(Json(service.list_subject_mappings().await?))
}

/// `POST /subject-mappings`
pub async fn create<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<CreateSubjectMappingRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let mapping = service.create_subject_mapping(body).await?;
  Ok((StatusCode::CREATED, Json(mapping)))
}

/// `POST /subject-mappings/match`
pub async fn matching<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<MatchRequest>,
) -> Result<Json<Vec<SubjectMapping>>, ApiError> {
  Ok(Json(service.match_subject_mappings(body).await?))
}

/// `GET /subject-mappings/{id}`
pub async fn get_one<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<SubjectMapping>, ApiError> {
  Ok(Json(service.get_subject_mapping(&id).await?))
}

/// `PATCH /subject-mappings/{id}`
pub async fn update<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateSubjectMappingRequest>,
) -> Result<Json<SubjectMapping>, ApiError> {
  Ok(Json(service.update_subject_mapping(&id, body).await?))
}

/// `DELETE /subject-mappings/{id}`
pub async fn delete<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<SubjectMapping>, ApiError> {
  Ok(Json(service.delete_subject_mapping(&id).await?))
}

/// `GET /subject-condition-sets`
pub async fn list_condition_sets<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
) -> Result<Json<Vec<SubjectConditionSet>>, ApiError> {
  Ok(Json(service.list_subject_condition_sets().await?))
}

/// `POST /subject-condition-sets`
pub async fn create_condition_set<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Json(body): Json<CreateConditionSetRequest>,
) -> Result<impl IntoResponse, ApiError> {
  let set = service.create_subject_condition_set(body).await?;
  Ok((StatusCode::CREATED, Json(set)))
}

/// `DELETE /subject-condition-sets`
pub async fn delete_unmapped_condition_sets<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
) -> Result<Json<Vec<SubjectConditionSet>>, ApiError> {
  Ok(Json(service.delete_unmapped_subject_condition_sets().await?))
}

/// `GET /subject-condition-sets/{id}`
pub async fn get_condition_set<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<SubjectConditionSet>, ApiError> {
  Ok(Json(service.get_subject_condition_set(&id).await?))
}

/// `PATCH /subject-condition-sets/{id}`
pub async fn update_condition_set<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
  Json(body): Json<UpdateConditionSetRequest>,
) -> Result<Json<SubjectConditionSet>, ApiError> {
  Ok(Json(service.update_subject_condition_set(&id, body).await?))
}

/// `DELETE /subject-condition-sets/{id}`
pub async fn delete_condition_set<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
  Path(id): Path<String>,
) -> Result<Json<SubjectConditionSet>, ApiError> {
  Ok(Json(service.delete_subject_condition_set(&id).await?))
}
