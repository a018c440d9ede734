//! Pieces shared by the request records of every group.

use serde::Deserialize;
use tenet_core::{
  Result,
  enums::{ActiveState, EnumInput, resolve_or_default},
  error::parse_uuid,
  metadata::{MetadataMutable, MetadataUpdate, MetadataUpdateBehavior},
};
use uuid::Uuid;

/// Parse a caller-supplied id.
pub fn parse_id(raw: &str) -> Result<Uuid> { parse_uuid(raw) }

pub fn parse_ids(raw: &[String]) -> Result<Vec<Uuid>> {
  raw.iter().map(|id| parse_uuid(id)).collect()
}

/// Build a metadata update from the two loose request fields.
///
/// No metadata means no update; the behavior is still validated.
pub fn metadata_update(
  metadata: Option<MetadataMutable>,
  behavior: Option<&EnumInput>,
) -> Result<Option<MetadataUpdate>> {
  let behavior = resolve_or_default::<MetadataUpdateBehavior>(behavior)?;
  Ok(metadata.map(|metadata| MetadataUpdate { metadata, behavior }))
}

/// `?state=` as accepted by every list endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StateParams {
  pub state: Option<String>,
}

impl StateParams {
  pub fn state(&self) -> Result<ActiveState> { parse_state(self.state.as_deref()) }
}

pub fn parse_state(raw: Option<&str>) -> Result<ActiveState> {
  resolve_or_default(raw.map(EnumInput::parse).as_ref())
}

/// A metadata-only update body.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateMetadataRequest {
  #[serde(default)]
  pub metadata:                 Option<MetadataMutable>,
  #[serde(default)]
  pub metadata_update_behavior: Option<EnumInput>,
}

impl UpdateMetadataRequest {
  pub fn resolve(self) -> Result<Option<MetadataUpdate>> {
    metadata_update(self.metadata, self.metadata_update_behavior.as_ref())
  }
}
