//! The metadata record carried by every policy entity, and its merge rules.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString, FromRepr, IntoStaticStr};

use crate::enums::WireEnum;

/// Server-managed timestamps plus caller-supplied labels and description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
  pub created_at:  DateTime<Utc>,
  pub updated_at:  DateTime<Utc>,
  #[serde(default)]
  pub labels:      BTreeMap<String, String>,
  #[serde(default)]
  pub description: String,
}

/// The caller-editable part of [`Metadata`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataMutable {
  #[serde(default)]
  pub labels:      BTreeMap<String, String>,
  #[serde(default)]
  pub description: String,
}

impl MetadataMutable {
  pub fn with_labels<I, K, V>(labels: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
  {
    Self {
      labels:      labels
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect(),
      description: String::new(),
    }
  }
}

/// How a metadata update combines with the stored record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  IntoStaticStr,
  EnumString,
  FromRepr,
)]
#[repr(i32)]
pub enum MetadataUpdateBehavior {
  #[serde(rename = "METADATA_UPDATE_ENUM_UNSPECIFIED")]
  #[strum(serialize = "UNSPECIFIED")]
  Unspecified = 0,
  #[default]
  #[serde(rename = "METADATA_UPDATE_ENUM_EXTEND")]
  #[strum(serialize = "EXTEND")]
  Extend = 1,
  #[serde(rename = "METADATA_UPDATE_ENUM_REPLACE")]
  #[strum(serialize = "REPLACE")]
  Replace = 2,
}

impl WireEnum for MetadataUpdateBehavior {
  const KIND: &'static str = "metadata update behavior";
  const PREFIX: &'static str = "METADATA_UPDATE_ENUM_";

  fn from_number(n: i32) -> Option<Self> { Self::from_repr(n) }
}

/// A requested change to an entity's metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataUpdate {
  pub metadata: MetadataMutable,
  pub behavior: MetadataUpdateBehavior,
}

impl MetadataUpdate {
  pub fn extend(metadata: MetadataMutable) -> Self {
    Self { metadata, behavior: MetadataUpdateBehavior::Extend }
  }

  pub fn replace(metadata: MetadataMutable) -> Self {
    Self { metadata, behavior: MetadataUpdateBehavior::Replace }
  }
}

impl Metadata {
  /// Metadata for a newly created entity: both timestamps are `now`.
  pub fn new(input: Option<MetadataMutable>, now: DateTime<Utc>) -> Self {
    let input = input.unwrap_or_default();
    Self {
      created_at:  now,
      updated_at:  now,
      labels:      input.labels,
      description: input.description,
    }
  }

  /// Apply `update` to a copy of `self`.
  ///
  /// `Unspecified` behaves as `Extend`. `created_at` is always preserved.
  pub fn merged(&self, update: &MetadataUpdate, now: DateTime<Utc>) -> Self {
    let mut next = self.clone();
    match update.behavior {
      MetadataUpdateBehavior::Replace => {
        next.labels = update.metadata.labels.clone();
        next.description = update.metadata.description.clone();
      }
      MetadataUpdateBehavior::Extend | MetadataUpdateBehavior::Unspecified => {
        next.labels.extend(
          update
            .metadata
            .labels
            .iter()
            .map(|(k, v)| (k.clone(), v.clone())),
        );
        if !update.metadata.description.is_empty() {
          next.description = update.metadata.description.clone();
        }
      }
    }
    next.updated_at = now;
    next
  }

  /// Bump only `updated_at`, for updates that change other fields.
  pub fn touched(&self, now: DateTime<Utc>) -> Self {
    Self { updated_at: now, ..self.clone() }
  }

  /// Resolve the metadata an update should write, if any.
  pub fn apply(
    &self,
    update: Option<&MetadataUpdate>,
    now: DateTime<Utc>,
  ) -> Self {
    match update {
      Some(update) => self.merged(update, now),
      None => self.touched(now),
    }
  }
}
