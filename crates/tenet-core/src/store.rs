//! Repository traits for the policy store.
//!
//! The traits are implemented by storage backends (e.g.
//! `tenet-store-sqlite`). The service facade depends on this abstraction, not
//! on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`). Dropping a
//! returned future abandons the call; any write it had started is bounded
//! by the backend's transaction.

use std::{collections::BTreeMap, future::Future};

use uuid::Uuid;

use crate::{
  Classify,
  attribute::{
    Attribute, AttributeAndValue, AttributeQuery, FqnMatch, NewAttribute,
    NewValue, Value, ValueUpdate,
  },
  enums::ActiveState,
  fqn::{FqnTarget, ReindexReport},
  kas::{KasGrant, KasGrants, KasUpdate, KeyAccessServer, NewKeyAccessServer},
  mapping::{
    NewResourceMapping, NewResourceMappingGroup, NewSubjectConditionSet,
    NewSubjectMapping, ResourceMapping, ResourceMappingGroup,
    ResourceMappingGroupUpdate, ResourceMappingUpdate, SubjectConditionSet,
    SubjectConditionSetUpdate, SubjectMapping, SubjectMappingUpdate,
    SubjectProperty,
  },
  metadata::MetadataUpdate,
  namespace::{Namespace, NewNamespace},
};

/// The error type shared by every repository of one backend.
pub trait StoreBackend: Send + Sync {
  type Error: std::error::Error + Classify + Send + Sync + 'static;
}

// ─── Namespaces ──────────────────────────────────────────────────────────────

pub trait NamespaceStore: StoreBackend {
  /// Persist a new namespace. The name is validated and lowercased.
  fn create_namespace(
    &self,
    input: NewNamespace,
  ) -> impl Future<Output = Result<Namespace, Self::Error>> + Send + '_;

  /// Fetch a namespace in any state.
  fn get_namespace(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Namespace, Self::Error>> + Send + '_;

  fn list_namespaces(
    &self,
    state: ActiveState,
  ) -> impl Future<Output = Result<Vec<Namespace>, Self::Error>> + Send + '_;

  /// Apply a metadata update. `None` returns the stored record untouched.
  fn update_namespace(
    &self,
    id: Uuid,
    metadata: Option<MetadataUpdate>,
  ) -> impl Future<Output = Result<Namespace, Self::Error>> + Send + '_;

  /// Deactivate the namespace and every attribute and value beneath it.
  fn deactivate_namespace(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Namespace, Self::Error>> + Send + '_;

  /// Delete an unreferenced namespace, returning its last state.
  fn delete_namespace(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Namespace, Self::Error>> + Send + '_;
}

// ─── Attributes ──────────────────────────────────────────────────────────────

pub trait AttributeStore: StoreBackend {
  /// Persist a new attribute and its initial values, in order.
  fn create_attribute(
    &self,
    input: NewAttribute,
  ) -> impl Future<Output = Result<Attribute, Self::Error>> + Send + '_;

  fn get_attribute(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Attribute, Self::Error>> + Send + '_;

  /// Resolve an attribute- or value-shaped FQN.
  ///
  /// For a value-shaped FQN the selected value carries its subject
  /// mappings.
  fn get_attribute_by_fqn(
    &self,
    fqn: String,
  ) -> impl Future<Output = Result<FqnMatch, Self::Error>> + Send + '_;

  /// Resolve a batch of value-shaped FQNs, keyed by the input string.
  fn get_attributes_by_value_fqns(
    &self,
    fqns: Vec<String>,
  ) -> impl Future<
    Output = Result<BTreeMap<String, AttributeAndValue>, Self::Error>,
  > + Send
  + '_;

  fn list_attributes(
    &self,
    query: AttributeQuery,
  ) -> impl Future<Output = Result<Vec<Attribute>, Self::Error>> + Send + '_;

  fn list_attributes_by_namespace(
    &self,
    namespace_id: Uuid,
    state: ActiveState,
  ) -> impl Future<Output = Result<Vec<Attribute>, Self::Error>> + Send + '_;

  fn update_attribute(
    &self,
    id: Uuid,
    metadata: Option<MetadataUpdate>,
  ) -> impl Future<Output = Result<Attribute, Self::Error>> + Send + '_;

  /// Deactivate the attribute and all of its values atomically.
  fn deactivate_attribute(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Attribute, Self::Error>> + Send + '_;

  fn delete_attribute(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Attribute, Self::Error>> + Send + '_;

  fn assign_attribute_kas(
    &self,
    attribute_id: Uuid,
    kas_id: Uuid,
  ) -> impl Future<Output = Result<KasGrant, Self::Error>> + Send + '_;

  fn remove_attribute_kas(
    &self,
    attribute_id: Uuid,
    kas_id: Uuid,
  ) -> impl Future<Output = Result<KasGrant, Self::Error>> + Send + '_;
}

// ─── Attribute values ────────────────────────────────────────────────────────

pub trait AttributeValueStore: StoreBackend {
  fn create_value(
    &self,
    input: NewValue,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + '_;

  fn get_value(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + '_;

  /// Values of one attribute, in creation order.
  fn list_values(
    &self,
    attribute_id: Uuid,
    state: ActiveState,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;

  fn list_all_values(
    &self,
    state: ActiveState,
  ) -> impl Future<Output = Result<Vec<Value>, Self::Error>> + Send + '_;

  fn update_value(
    &self,
    id: Uuid,
    update: ValueUpdate,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + '_;

  fn deactivate_value(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + '_;

  fn delete_value(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Value, Self::Error>> + Send + '_;

  fn assign_value_kas(
    &self,
    value_id: Uuid,
    kas_id: Uuid,
  ) -> impl Future<Output = Result<KasGrant, Self::Error>> + Send + '_;

  fn remove_value_kas(
    &self,
    value_id: Uuid,
    kas_id: Uuid,
  ) -> impl Future<Output = Result<KasGrant, Self::Error>> + Send + '_;
}

// ─── KAS registry ────────────────────────────────────────────────────────────

pub trait KasRegistryStore: StoreBackend {
  fn create_kas(
    &self,
    input: NewKeyAccessServer,
  ) -> impl Future<Output = Result<KeyAccessServer, Self::Error>> + Send + '_;

  fn get_kas(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<KeyAccessServer, Self::Error>> + Send + '_;

  fn list_kas(
    &self,
  ) -> impl Future<Output = Result<Vec<KeyAccessServer>, Self::Error>> + Send + '_;

  fn update_kas(
    &self,
    id: Uuid,
    update: KasUpdate,
  ) -> impl Future<Output = Result<KeyAccessServer, Self::Error>> + Send + '_;

  /// Delete a KAS. Every attribute and value grant naming it is removed
  /// with it; deletion is never refused because grants exist.
  fn delete_kas(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<KeyAccessServer, Self::Error>> + Send + '_;

  /// What each KAS (or only `kas_id`) has been granted to.
  fn list_kas_grants(
    &self,
    kas_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<KasGrants>, Self::Error>> + Send + '_;
}

// ─── Resource mappings ───────────────────────────────────────────────────────

pub trait ResourceMappingStore: StoreBackend {
  fn create_resource_mapping(
    &self,
    input: NewResourceMapping,
  ) -> impl Future<Output = Result<ResourceMapping, Self::Error>> + Send + '_;

  fn get_resource_mapping(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<ResourceMapping, Self::Error>> + Send + '_;

  fn list_resource_mappings(
    &self,
  ) -> impl Future<Output = Result<Vec<ResourceMapping>, Self::Error>> + Send + '_;

  fn update_resource_mapping(
    &self,
    id: Uuid,
    update: ResourceMappingUpdate,
  ) -> impl Future<Output = Result<ResourceMapping, Self::Error>> + Send + '_;

  fn delete_resource_mapping(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<ResourceMapping, Self::Error>> + Send + '_;

  /// Persist a group. Names are unique within a namespace.
  fn create_resource_mapping_group(
    &self,
    input: NewResourceMappingGroup,
  ) -> impl Future<Output = Result<ResourceMappingGroup, Self::Error>> + Send + '_;

  fn get_resource_mapping_group(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<ResourceMappingGroup, Self::Error>> + Send + '_;

  /// Resolve `https://<namespace>/resm/<name>`.
  fn get_resource_mapping_group_by_fqn(
    &self,
    fqn: String,
  ) -> impl Future<Output = Result<ResourceMappingGroup, Self::Error>> + Send + '_;

  /// Every group, or only those of `namespace_id`.
  fn list_resource_mapping_groups(
    &self,
    namespace_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<ResourceMappingGroup>, Self::Error>>
  + Send
  + '_;

  fn update_resource_mapping_group(
    &self,
    id: Uuid,
    update: ResourceMappingGroupUpdate,
  ) -> impl Future<Output = Result<ResourceMappingGroup, Self::Error>> + Send + '_;

  /// Delete a group. Its mappings survive without a group.
  fn delete_resource_mapping_group(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<ResourceMappingGroup, Self::Error>> + Send + '_;
}

// ─── Subject mappings ────────────────────────────────────────────────────────

pub trait SubjectMappingStore: StoreBackend {
  fn create_subject_mapping(
    &self,
    input: NewSubjectMapping,
  ) -> impl Future<Output = Result<SubjectMapping, Self::Error>> + Send + '_;

  fn get_subject_mapping(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<SubjectMapping, Self::Error>> + Send + '_;

  fn list_subject_mappings(
    &self,
  ) -> impl Future<Output = Result<Vec<SubjectMapping>, Self::Error>> + Send + '_;

  fn update_subject_mapping(
    &self,
    id: Uuid,
    update: SubjectMappingUpdate,
  ) -> impl Future<Output = Result<SubjectMapping, Self::Error>> + Send + '_;

  fn delete_subject_mapping(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<SubjectMapping, Self::Error>> + Send + '_;

  /// Mappings on fully active values whose condition set has at least one
  /// condition admitting one of `properties`.
  fn match_subject_mappings(
    &self,
    properties: Vec<SubjectProperty>,
  ) -> impl Future<Output = Result<Vec<SubjectMapping>, Self::Error>> + Send + '_;

  // ── Condition sets ────────────────────────────────────────────────────

  fn create_subject_condition_set(
    &self,
    input: NewSubjectConditionSet,
  ) -> impl Future<Output = Result<SubjectConditionSet, Self::Error>> + Send + '_;

  fn get_subject_condition_set(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<SubjectConditionSet, Self::Error>> + Send + '_;

  fn list_subject_condition_sets(
    &self,
  ) -> impl Future<Output = Result<Vec<SubjectConditionSet>, Self::Error>>
  + Send
  + '_;

  fn update_subject_condition_set(
    &self,
    id: Uuid,
    update: SubjectConditionSetUpdate,
  ) -> impl Future<Output = Result<SubjectConditionSet, Self::Error>> + Send + '_;

  /// Fails while any subject mapping still references the set.
  fn delete_subject_condition_set(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<SubjectConditionSet, Self::Error>> + Send + '_;

  /// Delete every condition set no mapping references, returning them.
  fn delete_unmapped_subject_condition_sets(
    &self,
  ) -> impl Future<Output = Result<Vec<SubjectConditionSet>, Self::Error>>
  + Send
  + '_;
}

// ─── FQN index ───────────────────────────────────────────────────────────────

pub trait FqnIndex: StoreBackend {
  /// Recompute and store the FQN of one entity, returning it.
  fn upsert_fqn(
    &self,
    target: FqnTarget,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Rebuild the FQN of every namespace, attribute and value.
  fn reindex_fqns(
    &self,
  ) -> impl Future<Output = Result<ReindexReport, Self::Error>> + Send + '_;
}

// ─── Umbrella ────────────────────────────────────────────────────────────────

/// Every repository of the policy store, served by one backend.
pub trait PolicyStore:
  NamespaceStore
  + AttributeStore
  + AttributeValueStore
  + KasRegistryStore
  + ResourceMappingStore
  + SubjectMappingStore
  + FqnIndex
{
}

impl<T> PolicyStore for T where
  T: NamespaceStore
    + AttributeStore
    + AttributeValueStore
    + KasRegistryStore
    + ResourceMappingStore
    + SubjectMappingStore
    + FqnIndex
{
}
