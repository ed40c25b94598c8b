//! Collaborator interfaces and the context that injects them.
//!
//! The management service talks to four sibling subsystems plus a
//! key-value datastore. Each gets a narrow trait here; a [`Clients`]
//! implementation bundles concrete instances and is handed to the service on
//! construction.

use std::future::Future;

use crate::{
  error::CollaboratorError,
  lifecycle::LifecycleEvaluator,
  registry::ResourceRegistry,
  resource::ResourceId,
};

/// Name of the datastore holding the last-update cache.
pub const LAST_UPDATE_CACHE: &str = "last_update_cache";

// ─── Stream registry ─────────────────────────────────────────────────────────

/// Creates and removes pub/sub streams.
pub trait StreamRegistry: Send + Sync {
  type Error: CollaboratorError;

  /// Create a stream carrying data shaped by `stream_definition_id`.
  fn create_stream<'a>(
    &'a self,
    name: &'a str,
    description: &'a str,
    stream_definition_id: &'a ResourceId,
  ) -> impl Future<Output = Result<ResourceId, Self::Error>> + Send + 'a;

  fn delete_stream<'a>(
    &'a self,
    stream_id: &'a ResourceId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

/// Controls persistence of streams into datasets.
pub trait IngestionController: Send + Sync {
  type Error: CollaboratorError;

  /// Ids of all known ingestion configurations.
  fn list_ingestion_configurations(
    &self,
  ) -> impl Future<Output = Result<Vec<ResourceId>, Self::Error>> + Send + '_;

  /// Start persisting `stream_id`; returns the id of the dataset receiving
  /// the data.
  fn persist_data_stream<'a>(
    &'a self,
    stream_id: &'a ResourceId,
    ingestion_configuration_id: &'a ResourceId,
  ) -> impl Future<Output = Result<ResourceId, Self::Error>> + Send + 'a;

  /// Stop persisting `stream_id`. Returns the controller's status flag.
  fn unpersist_data_stream<'a>(
    &'a self,
    stream_id: &'a ResourceId,
    ingestion_configuration_id: &'a ResourceId,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + 'a;
}

// ─── Data acquisition ────────────────────────────────────────────────────────

pub trait DataAcquisitionController: Send + Sync {
  type Error: CollaboratorError;

  /// Detach `producer_id` from the data product it feeds.
  fn unassign_data_product<'a>(
    &'a self,
    producer_id: &'a ResourceId,
    data_product_id: &'a ResourceId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

// ─── Datastores ──────────────────────────────────────────────────────────────

/// A named key-value document store.
pub trait Datastore: Send + Sync {
  type Error: CollaboratorError;

  /// Read the document stored under `key`. Returns `None` on a miss.
  fn read<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<serde_json::Value>, Self::Error>> + Send + 'a;

  /// Insert or replace the document stored under `key`.
  fn write<'a>(
    &'a self,
    key: &'a str,
    value: serde_json::Value,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}

/// Hands out datastores by well-known name.
pub trait Datastores: Send + Sync {
  type Store: Datastore;

  fn get_datastore<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Self::Store, <Self::Store as Datastore>::Error>> + Send + 'a;
}

// ─── Context ─────────────────────────────────────────────────────────────────

/// Everything the management service calls out to.
pub trait Clients: Send + Sync {
  type Registry: ResourceRegistry;
  type Streams: StreamRegistry;
  type Ingestion: IngestionController;
  type Acquisition: DataAcquisitionController;
  type Datastores: Datastores;
  type Lifecycle: LifecycleEvaluator;

  fn resource_registry(&self) -> &Self::Registry;
  fn stream_registry(&self) -> &Self::Streams;
  fn ingestion(&self) -> &Self::Ingestion;
  fn data_acquisition(&self) -> &Self::Acquisition;
  fn datastores(&self) -> &Self::Datastores;
  fn lifecycle(&self) -> &Self::Lifecycle;
}

/// Plain-struct [`Clients`] implementation.
#[derive(Debug, Clone)]
pub struct ServiceContext<R, S, I, A, D, L> {
  pub resource_registry: R,
  pub stream_registry:   S,
  pub ingestion:         I,
  pub data_acquisition:  A,
  pub datastores:        D,
  pub lifecycle:         L,
}

impl<R, S, I, A, D, L> Clients for ServiceContext<R, S, I, A, D, L>
where
  R: ResourceRegistry,
  S: StreamRegistry,
  I: IngestionController,
  A: DataAcquisitionController,
  D: Datastores,
  L: LifecycleEvaluator,
{
  type Registry = R;
  type Streams = S;
  type Ingestion = I;
  type Acquisition = A;
  type Datastores = D;
  type Lifecycle = L;

  fn resource_registry(&self) -> &R { &self.resource_registry }

  fn stream_registry(&self) -> &S { &self.stream_registry }

  fn ingestion(&self) -> &I { &self.ingestion }

  fn data_acquisition(&self) -> &A { &self.data_acquisition }

  fn datastores(&self) -> &D { &self.datastores }

  fn lifecycle(&self) -> &L { &self.lifecycle }
}
