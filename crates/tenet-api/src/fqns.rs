//! `POST /fqns/reindex`: rebuild the FQN of every namespace, attribute and
//! value.

use axum::{Json, extract::State};
use tenet_core::{
  fqn::ReindexReport,
  store::{FqnIndex as _, PolicyStore},
};
use tracing::info;

use crate::{
  PolicyService,
  error::{ApiError, OrStatus as _, UPDATE_FAILED},
};

impl<S: PolicyStore> PolicyService<S> {
  pub async fn reindex_fqns(&self) -> Result<ReindexReport, ApiError> {
    let report = self.store.reindex_fqns().await.or_status(UPDATE_FAILED)?;
    info!(
      namespaces = report.namespaces.len(),
      attributes = report.attributes.len(),
      values = report.values.len(),
      "reindexed FQNs"
    );
    Ok(report)
  }
}

/// `POST /fqns/reindex`
pub async fn reindex<S: PolicyStore>(
  State(service): State<PolicyService<S>>,
) -> Result<Json<ReindexReport>, ApiError> {
  Ok(Json(service.reindex_fqns().await?))
}
