//! Service facade and JSON REST API for the Tenet policy store.
//!
//! [`PolicyService`] wraps any [`tenet_core::store::PolicyStore`]: it parses
//! ids and wire enums out of request records, calls the repository, and runs
//! failures through [`error::handle_error`]. [`router`] exposes the facade
//! over axum. Authorization, TLS and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let service = PolicyService::new(store);
//! let app = Router::new().nest("/api", tenet_api::router(service));
//! ```

pub mod attributes;
pub mod error;
pub mod fqns;
pub mod kas;
pub mod namespaces;
pub mod request;
pub mod resource_mappings;
pub mod subject_mappings;
pub mod values;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tenet_core::store::PolicyStore;

pub use error::{ApiError, Code};

/// The policy service facade.
///
/// Cheap to clone; every clone shares the same store.
pub struct PolicyService<S> {
  store: Arc<S>,
}

impl<S> Clone for PolicyService<S> {
  fn clone(&self) -> Self { Self { store: Arc::clone(&self.store) } }
}

impl<S: PolicyStore> PolicyService<S> {
  pub fn new(store: S) -> Self { Self { store: Arc::new(store) } }

  pub fn from_arc(store: Arc<S>) -> Self { Self { store } }

  pub fn store(&self) -> &S { &self.store }
}

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn router<S>(service: PolicyService<S>) -> Router<()>
where
  S: PolicyStore + 'static,
{
  Router::new()
    // Namespaces
    .route(
      "/namespaces",
      get(namespaces::list::<S>).post(namespaces::create::<S>),
    )
    .route(
      "/namespaces/{id}",
      get(namespaces::get_one::<S>)
        .patch(namespaces::update::<S>)
        .delete(namespaces::delete::<S>),
    )
    .route("/namespaces/{id}/deactivate", post(namespaces::deactivate::<S>))
    .route(
      "/namespaces/{id}/attributes",
      get(attributes::list_by_namespace::<S>),
    )
    // Attributes
    .route(
      "/attributes",
      get(attributes::list::<S>).post(attributes::create::<S>),
    )
    .route("/attributes/by-fqn", get(attributes::by_fqn::<S>))
    .route(
      "/attributes/by-value-fqns",
      post(attributes::by_value_fqns::<S>),
    )
    .route(
      "/attributes/{id}",
      get(attributes::get_one::<S>)
        .patch(attributes::update::<S>)
        .delete(attributes::delete::<S>),
    )
    .route("/attributes/{id}/deactivate", post(attributes::deactivate::<S>))
    .route(
      "/attributes/{id}/values",
      get(values::list::<S>).post(values::create::<S>),
    )
    .route(
      "/attributes/{id}/kas-grants/{kas_id}",
      post(attributes::assign_kas::<S>).delete(attributes::remove_kas::<S>),
    )
    // Values
    .route("/values", get(values::list_all::<S>))
    .route(
      "/values/{id}",
      get(values::get_one::<S>)
        .patch(values::update::<S>)
        .delete(values::delete::<S>),
    )
    .route("/values/{id}/deactivate", post(values::deactivate::<S>))
    .route(
      "/values/{id}/kas-grants/{kas_id}",
      post(values::assign_kas::<S>).delete(values::remove_kas::<S>),
    )
    // KAS registry
    .route("/kas", get(kas::list::<S>).post(kas::create::<S>))
    .route("/kas/grants", get(kas::grants::<S>))
    .route(
      "/kas/{id}",
      get(kas::get_one::<S>)
        .patch(kas::update::<S>)
        .delete(kas::delete::<S>),
    )
    // Resource mappings
    .route(
      "/resource-mappings",
      get(resource_mappings::list::<S>).post(resource_mappings::create::<S>),
    )
    .route(
      "/resource-mappings/{id}",
      get(resource_mappings::get_one::<S>)
        .patch(resource_mappings::update::<S>)
        .delete(resource_mappings::delete::<S>),
    )
    .route(
      "/resource-mapping-groups",
      get(resource_mappings::list_groups::<S>)
        .post(resource_mappings::create_group::<S>),
    )
    .route(
      "/resource-mapping-groups/by-fqn",
      get(resource_mappings::group_by_fqn::<S>),
    )
    .route(
      "/resource-mapping-groups/{id}",
      get(resource_mappings::get_group::<S>)
        .patch(resource_mappings::update_group::<S>)
        .delete(resource_mappings::delete_group::<S>),
    )
    // Subject mappings
    .route(
      "/subject-mappings",
      get(subject_mappings::list::<S>).post(subject_mappings::create::<S>),
    )
    .route("/subject-mappings/match", post(subject_mappings::matching::<S>))
    .route(
      "/subject-mappings/{id}",
      get(subject_mappings::get_one::<S>)
        .patch(subject_mappings::update::<S>)
        .delete(subject_mappings::delete::<S>),
    )
    .route(
      "/subject-condition-sets",
      get(subject_mappings::list_condition_sets::<S>)
        .post(subject_mappings::create_condition_set::<S>)
        .delete(subject_mappings::delete_unmapped_condition_sets::<S>),
    )
    .route(
      "/subject-condition-sets/{id}",
      get(subject_mappings::get_condition_set::<S>)
        .patch(subject_mappings::update_condition_set::<S>)
        .delete(subject_mappings::delete_condition_set::<S>),
    )
    // FQN index
    .route("/fqns/reindex", post(fqns::reindex::<S>))
    .with_state(service)
}
