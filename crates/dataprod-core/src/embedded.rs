//! Registry-backed stand-ins for the sibling subsystems.
//!
//! These let a single process run the whole service: streams, ingestion
//! subscriptions and producer links are kept as ordinary resources and
//! associations in the same [`ResourceRegistry`].

use tracing::debug;

use crate::{
  Error, Result,
  clients::{DataAcquisitionController, IngestionController, StreamRegistry},
  lifecycle::LifecycleState,
  registry::ResourceRegistry,
  resource::{
    Dataset, Predicate, Resource, ResourceFilter, ResourceId, ResourceType, Stream,
  },
};

/// Read `id` and require it to be a resource of `expected` type.
async fn require<R: ResourceRegistry>(
  registry: &R,
  id: &ResourceId,
  expected: ResourceType,
) -> Result<Resource> {
  registry
    .read(id)
    .await
    .map_err(Error::registry)?
    .filter(|r| r.resource_type() == expected)
    .ok_or_else(|| Error::not_found(format!("{expected} {id} does not exist")))
}

// ─── Streams ─────────────────────────────────────────────────────────────────

/// Streams as `Stream` resources linked to their definition via
/// `hasStreamDefinition`.
#[derive(Debug, Clone)]
pub struct EmbeddedStreams<R> {
  registry: R,
}

impl<R> EmbeddedStreams<R> {
  pub fn new(registry: R) -> Self { Self { registry } }
}

impl<R: ResourceRegistry> StreamRegistry for EmbeddedStreams<R> {
  type Error = Error;

  async fn create_stream(
    &self,
    name: &str,
    description: &str,
    stream_definition_id: &ResourceId,
  ) -> Result<ResourceId> {
    require(&self.registry, stream_definition_id, ResourceType::StreamDefinition).await?;

    let stream = Stream {
      id:          None,
      rev:         None,
      name:        name.to_owned(),
      description: description.to_owned(),
      lcstate:     LifecycleState::Draft,
    };
    let (stream_id, _) = self.registry.create(stream.into()).await.map_err(Error::registry)?;
    self
      .registry
      .create_association(&stream_id, Predicate::HasStreamDefinition, stream_definition_id)
      .await
      .map_err(Error::registry)?;

    debug!(%stream_id, %stream_definition_id, "stream created");
    Ok(stream_id)
  }

  async fn delete_stream(&self, stream_id: &ResourceId) -> Result<()> {
    require(&self.registry, stream_id, ResourceType::Stream).await?;
    self.registry.delete(stream_id).await.map_err(Error::registry)?;
    debug!(%stream_id, "stream deleted");
    Ok(())
  }
}

// ─── Ingestion ───────────────────────────────────────────────────────────────

/// Ingestion configurations as resources; a persisted stream is recorded as
/// a `persistsStream` edge from the configuration.
#[derive(Debug, Clone)]
pub struct EmbeddedIngestion<R> {
  registry: R,
}

impl<R> EmbeddedIngestion<R> {
  pub fn new(registry: R) -> Self { Self { registry } }
}

impl<R: ResourceRegistry> IngestionController for EmbeddedIngestion<R> {
  type Error = Error;

  async fn list_ingestion_configurations(&self) -> Result<Vec<ResourceId>> {
    let configurations = self
      .registry
      .find_resources(ResourceType::IngestionConfiguration, &ResourceFilter::default())
      .await
      .map_err(Error::registry)?;
    Ok(configurations.iter().filter_map(|r| r.id().cloned()).collect())
  }

  async fn persist_data_stream(
    &self,
    stream_id: &ResourceId,
    ingestion_configuration_id: &ResourceId,
  ) -> Result<ResourceId> {
    require(&self.registry, ingestion_configuration_id, ResourceType::IngestionConfiguration)
      .await?;
    let stream = require(&self.registry, stream_id, ResourceType::Stream).await?;

    let persisted = self
      .registry
      .find_objects(ingestion_configuration_id, Predicate::PersistsStream, None)
      .await
      .map_err(Error::registry)?;
    if persisted.contains(stream_id) {
      return Err(Error::bad_request(format!(
        "Stream {stream_id} is already persisted by {ingestion_configuration_id}"
      )));
    }

    let dataset = Dataset {
      id:          None,
      rev:         None,
      name:        format!("{} dataset", stream.name()),
      description: String::new(),
      lcstate:     LifecycleState::Draft,
    };
    let (dataset_id, _) = self.registry.create(dataset.into()).await.map_err(Error::registry)?;
    self
      .registry
      .create_association(stream_id, Predicate::HasDataset, &dataset_id)
      .await
      .map_err(Error::registry)?;
    self
      .registry
      .create_association(ingestion_configuration_id, Predicate::PersistsStream, stream_id)
      .await
      .map_err(Error::registry)?;

    debug!(%stream_id, %dataset_id, "stream persisted");
    Ok(dataset_id)
  }

  async fn unpersist_data_stream(
    &self,
    stream_id: &ResourceId,
    ingestion_configuration_id: &ResourceId,
  ) -> Result<bool> {
    let subscriptions: Vec<_> = self
      .registry
      .find_associations(ingestion_configuration_id, Predicate::PersistsStream)
      .await
      .map_err(Error::registry)?
      .into_iter()
      .filter(|a| &a.object == stream_id)
      .collect();
    if subscriptions.is_empty() {
      return Err(Error::not_found(format!(
        "Stream {stream_id} is not persisted by {ingestion_configuration_id}"
      )));
    }

    for subscription in &subscriptions {
      self
        .registry
        .delete_association(&subscription.id)
        .await
        .map_err(Error::registry)?;
    }
    debug!(%stream_id, "stream unpersisted");
    Ok(true)
  }
}

// ─── Data acquisition ────────────────────────────────────────────────────────

/// Producer links are the `hasDataProducer` edge from the product and the
/// `hasOutputProduct` edge back from the producer.
#[derive(Debug, Clone)]
pub struct EmbeddedAcquisition<R> {
  registry: R,
}

impl<R> EmbeddedAcquisition<R> {
  pub fn new(registry: R) -> Self { Self { registry } }
}

impl<R: ResourceRegistry> DataAcquisitionController for EmbeddedAcquisition<R> {
  type Error = Error;

  async fn unassign_data_product(
    &self,
    producer_id: &ResourceId,
    data_product_id: &ResourceId,
  ) -> Result<()> {
    let mut links = Vec::new();
    for (subject, predicate, object) in [
      (data_product_id, Predicate::HasDataProducer, producer_id),
      (producer_id, Predicate::HasOutputProduct, data_product_id),
    ] {
      let found = self
        .registry
        .find_associations(subject, predicate)
        .await
        .map_err(Error::registry)?;
      links.extend(found.into_iter().filter(|a| &a.object == object));
    }
    if links.is_empty() {
      return Err(Error::not_found(format!(
        "Data Producer {producer_id} is not assigned to {data_product_id}"
      )));
    }

    for link in &links {
      self.registry.delete_association(&link.id).await.map_err(Error::registry)?;
    }
    debug!(%producer_id, %data_product_id, "producer unassigned");
    Ok(())
  }
}
