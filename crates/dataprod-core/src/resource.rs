//! Resource types managed through the resource registry.
//!
//! Every resource is identified by an opaque, immutable [`ResourceId`]
//! assigned by the registry on creation. Relationships between resources are
//! never embedded: they are typed, directed [`Association`] edges kept by the
//! registry. The single exception is
//! [`DataProduct::dataset_configuration_id`].

use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::lifecycle::LifecycleState;

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Opaque registry-assigned identifier of a resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(String);

impl ResourceId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for ResourceId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl From<&str> for ResourceId {
  fn from(s: &str) -> Self { Self(s.to_owned()) }
}

impl From<String> for ResourceId {
  fn from(s: String) -> Self { Self(s) }
}

/// Identifier of a single association edge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssociationId(String);

impl AssociationId {
  pub fn new(id: impl Into<String>) -> Self { Self(id.into()) }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for AssociationId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// Optimistic-concurrency token. The registry bumps it on every write and
/// rejects updates that carry a stale value.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Revision(pub u64);

impl fmt::Display for Revision {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

// ─── Resource types ──────────────────────────────────────────────────────────

/// The kind of a resource; doubles as the serde tag of [`Resource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
  DataProduct,
  DataProductVersion,
  Stream,
  StreamDefinition,
  Dataset,
  DataProducer,
  IngestionConfiguration,
}

impl fmt::Display for ResourceType {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::DataProduct => "DataProduct",
      Self::DataProductVersion => "DataProductVersion",
      Self::Stream => "Stream",
      Self::StreamDefinition => "StreamDefinition",
      Self::Dataset => "Dataset",
      Self::DataProducer => "DataProducer",
      Self::IngestionConfiguration => "IngestionConfiguration",
    };
    f.write_str(s)
  }
}

/// A named, versioned metadata resource describing a science data output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProduct {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:                       Option<ResourceId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rev:                      Option<Revision>,
  pub name:                     String,
  #[serde(default)]
  pub description:              String,
  #[serde(default)]
  pub lcstate:                  LifecycleState,
  /// Ingestion configuration in use; set once persistence is activated.
  #[serde(default)]
  pub dataset_configuration_id: Option<ResourceId>,
}

impl DataProduct {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      id:                       None,
      rev:                      None,
      name:                     name.into(),
      description:              description.into(),
      lcstate:                  LifecycleState::default(),
      dataset_configuration_id: None,
    }
  }
}

/// One version of a [`DataProduct`]. Every product has an implicit
/// `"default"` version created alongside it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProductVersion {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:          Option<ResourceId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rev:         Option<Revision>,
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub lcstate:     LifecycleState,
}

impl DataProductVersion {
  pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
    Self {
      id:          None,
      rev:         None,
      name:        name.into(),
      description: description.into(),
      lcstate:     LifecycleState::default(),
    }
  }
}

/// An addressable pub/sub channel. Owned by the stream registry; the
/// management service only ever handles its id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stream {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:          Option<ResourceId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rev:         Option<Revision>,
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub lcstate:     LifecycleState,
}

/// Describes the shape of the data a stream carries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDefinition {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:          Option<ResourceId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rev:         Option<Revision>,
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub lcstate:     LifecycleState,
}

/// Persisted data produced by ingesting a stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:          Option<ResourceId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rev:         Option<Revision>,
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub lcstate:     LifecycleState,
}

/// A source of data (instrument, process) feeding one or more products.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataProducer {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:          Option<ResourceId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rev:         Option<Revision>,
  pub name:        String,
  #[serde(default)]
  pub description: String,
  #[serde(default)]
  pub lcstate:     LifecycleState,
}

/// Definition of how a stream gets persisted into a dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionConfiguration {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub id:             Option<ResourceId>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub rev:            Option<Revision>,
  pub name:           String,
  #[serde(default)]
  pub description:    String,
  #[serde(default)]
  pub lcstate:        LifecycleState,
  /// Exchange point the ingestion workers consume from.
  #[serde(default)]
  pub exchange_point: String,
}

// ─── Resource ────────────────────────────────────────────────────────────────

/// Any resource the registry can hold. The variant name is the
/// [`ResourceType`] discriminant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type_", rename_all = "snake_case")]
pub enum Resource {
  DataProduct(DataProduct),
  DataProductVersion(DataProductVersion),
  Stream(Stream),
  StreamDefinition(StreamDefinition),
  Dataset(Dataset),
  DataProducer(DataProducer),
  IngestionConfiguration(IngestionConfiguration),
}

/// Evaluate `$body` with `$r` bound to the inner struct of any variant.
macro_rules! each_variant {
  ($value:expr, $r:ident => $body:expr) => {
    match $value {
      Resource::DataProduct($r) => $body,
      Resource::DataProductVersion($r) => $body,
      Resource::Stream($r) => $body,
      Resource::StreamDefinition($r) => $body,
      Resource::Dataset($r) => $body,
      Resource::DataProducer($r) => $body,
      Resource::IngestionConfiguration($r) => $body,
    }
  };
}

impl Resource {
  pub fn resource_type(&self) -> ResourceType {
    match self {
      Self::DataProduct(_) => ResourceType::DataProduct,
      Self::DataProductVersion(_) => ResourceType::DataProductVersion,
      Self::Stream(_) => ResourceType::Stream,
      Self::StreamDefinition(_) => ResourceType::StreamDefinition,
      Self::Dataset(_) => ResourceType::Dataset,
      Self::DataProducer(_) => ResourceType::DataProducer,
      Self::IngestionConfiguration(_) => ResourceType::IngestionConfiguration,
    }
  }

  pub fn id(&self) -> Option<&ResourceId> { each_variant!(self, r => r.id.as_ref()) }

  pub fn rev(&self) -> Option<Revision> { each_variant!(self, r => r.rev) }

  pub fn name(&self) -> &str { each_variant!(self, r => r.name.as_str()) }

  pub fn lcstate(&self) -> LifecycleState { each_variant!(self, r => r.lcstate) }

  /// Stamp the registry-assigned id and revision onto the resource.
  pub fn set_identity(&mut self, id: ResourceId, rev: Revision) {
    each_variant!(self, r => {
      r.id = Some(id);
      r.rev = Some(rev);
    })
  }

  pub fn set_rev(&mut self, rev: Revision) { each_variant!(self, r => r.rev = Some(rev)) }

  pub fn set_lcstate(&mut self, state: LifecycleState) {
    each_variant!(self, r => r.lcstate = state)
  }

  pub fn into_data_product(self) -> Option<DataProduct> {
    match self {
      Self::DataProduct(dp) => Some(dp),
      _ => None,
    }
  }

  pub fn into_data_product_version(self) -> Option<DataProductVersion> {
    match self {
      Self::DataProductVersion(v) => Some(v),
      _ => None,
    }
  }
}

impl From<DataProduct> for Resource {
  fn from(v: DataProduct) -> Self { Self::DataProduct(v) }
}

impl From<DataProductVersion> for Resource {
  fn from(v: DataProductVersion) -> Self { Self::DataProductVersion(v) }
}

impl From<Stream> for Resource {
  fn from(v: Stream) -> Self { Self::Stream(v) }
}

impl From<StreamDefinition> for Resource {
  fn from(v: StreamDefinition) -> Self { Self::StreamDefinition(v) }
}

impl From<Dataset> for Resource {
  fn from(v: Dataset) -> Self { Self::Dataset(v) }
}

impl From<DataProducer> for Resource {
  fn from(v: DataProducer) -> Self { Self::DataProducer(v) }
}

impl From<IngestionConfiguration> for Resource {
  fn from(v: IngestionConfiguration) -> Self { Self::IngestionConfiguration(v) }
}

// ─── Associations ────────────────────────────────────────────────────────────

/// The type of a directed association edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
  /// DataProduct → DataProductVersion
  HasVersion,
  /// DataProduct / DataProductVersion → Stream
  HasStream,
  /// Stream → StreamDefinition
  HasStreamDefinition,
  HasOutputProduct,
  HasInputProduct,
  /// DataProduct / Stream → Dataset
  HasDataset,
  /// DataProduct → DataProducer
  HasDataProducer,
  /// IngestionConfiguration → Stream
  PersistsStream,
}

/// A typed directed edge `subject --predicate--> object`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Association {
  pub id:          AssociationId,
  pub subject:     ResourceId,
  pub predicate:   Predicate,
  pub object:      ResourceId,
  pub object_type: ResourceType,
}

// ─── Queries ─────────────────────────────────────────────────────────────────

/// Attribute filter for [`crate::registry::ResourceRegistry::find_resources`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResourceFilter {
  /// Exact name match.
  pub name:    Option<String>,
  pub lcstate: Option<LifecycleState>,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
}

// ─── Last update ─────────────────────────────────────────────────────────────

/// The most recent values observed on a stream, as kept by the last-update
/// cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastUpdate {
  pub updated_at: DateTime<Utc>,
  #[serde(default)]
  pub values:     BTreeMap<String, serde_json::Value>,
}
