//! [`DataProductManagementService`]: CRUD and orchestration for data
//! products and their versions.
//!
//! Every operation is a short sequence of awaited collaborator calls, one
//! call per external action. Nothing runs concurrently inside an operation,
//! nothing is retried, and revision conflicts are left to the registry.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
  Error, Result,
  clients::{
    Clients, DataAcquisitionController, Datastore, Datastores, IngestionController,
    LAST_UPDATE_CACHE, StreamRegistry,
  },
  config::ServiceConfig,
  lifecycle::{LifecycleEvaluator, LifecycleEvent, LifecycleState},
  registry::ResourceRegistry,
  resource::{
    DataProduct, DataProductVersion, LastUpdate, Predicate, ResourceFilter, ResourceId,
    ResourceType, Revision,
  },
};

/// Flags accepted by [`DataProductManagementService::activate_data_product_persistence`].
///
/// The ingestion controller has no per-call switches, so these are recorded
/// in the operation trail only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceOptions {
  pub persist_data:     bool,
  pub persist_metadata: bool,
}

impl Default for PersistenceOptions {
  fn default() -> Self { Self { persist_data: true, persist_metadata: true } }
}

/// Last-update cache entries keyed by stream id.
pub type LastUpdates = BTreeMap<ResourceId, LastUpdate>;

pub struct DataProductManagementService<C> {
  clients: C,
  config:  ServiceConfig,
}

impl<C: Clients> DataProductManagementService<C> {
  pub fn new(clients: C, config: ServiceConfig) -> Self { Self { clients, config } }

  pub fn clients(&self) -> &C { &self.clients }

  pub fn config(&self) -> &ServiceConfig { &self.config }

  // ── Data products ─────────────────────────────────────────────────────

  /// Register `data_product` together with its default version and, when a
  /// stream definition is given, a stream linked to both.
  ///
  /// The product and its default version are registered first, so they
  /// remain if the stream cannot be created.
  pub async fn create_data_product(
    &self,
    data_product: DataProduct,
    stream_definition_id: Option<&ResourceId>,
  ) -> Result<ResourceId> {
    debug!(name = %data_product.name, ?stream_definition_id, "create_data_product");
    let registry = self.clients.resource_registry();

    let name = data_product.name.clone();
    let description = data_product.description.clone();
    let (data_product_id, _) =
      registry.create(data_product.into()).await.map_err(Error::registry)?;

    let version = DataProductVersion::new("default", "initial version");
    let (version_id, _) = registry.create(version.into()).await.map_err(Error::registry)?;
    registry
      .create_association(&data_product_id, Predicate::HasVersion, &version_id)
      .await
      .map_err(Error::registry)?;

    if let Some(stream_definition_id) = stream_definition_id {
      let stream_id = self
        .clients
        .stream_registry()
        .create_stream(&name, &description, stream_definition_id)
        .await
        .map_err(Error::streams)?;
      debug!(%data_product_id, %stream_id, "created stream for data product");

      registry
        .create_association(&data_product_id, Predicate::HasStream, &stream_id)
        .await
        .map_err(Error::registry)?;
      registry
        .create_association(&version_id, Predicate::HasStream, &stream_id)
        .await
        .map_err(Error::registry)?;
    }

    Ok(data_product_id)
  }

  pub async fn read_data_product(&self, data_product_id: &ResourceId) -> Result<DataProduct> {
    debug!(%data_product_id, "read_data_product");
    self
      .clients
      .resource_registry()
      .read(data_product_id)
      .await
      .map_err(Error::registry)?
      .and_then(|r| r.into_data_product())
      .ok_or_else(|| Error::not_found(format!("Data Product {data_product_id} does not exist")))
  }

  /// Forward `data_product` to the registry. It must carry its id and
  /// current revision. Returns the new revision.
  pub async fn update_data_product(&self, data_product: DataProduct) -> Result<Revision> {
    debug!(id = ?data_product.id, rev = ?data_product.rev, "update_data_product");
    self
      .clients
      .resource_registry()
      .update(data_product.into())
      .await
      .map_err(Error::registry)
  }

  /// Unassign every producer feeding the product, then delete it unless it
  /// is already retired.
  pub async fn delete_data_product(&self, data_product_id: &ResourceId) -> Result<()> {
    debug!(%data_product_id, "delete_data_product");
    let registry = self.clients.resource_registry();

    let producer_ids = registry
      .find_objects(data_product_id, Predicate::HasDataProducer, Some(ResourceType::DataProducer))
      .await
      .map_err(Error::registry)?;
    for producer_id in &producer_ids {
      debug!(%data_product_id, %producer_id, "unassigning data producer");
      self
        .clients
        .data_acquisition()
        .unassign_data_product(producer_id, data_product_id)
        .await
        .map_err(Error::acquisition)?;
    }

    if self.config.cascade_delete {
      self.delete_dependents(data_product_id).await?;
    }

    let data_product = self.read_data_product(data_product_id).await?;
    if data_product.lcstate != LifecycleState::Retired {
      registry.delete(data_product_id).await.map_err(Error::registry)?;
      info!(%data_product_id, "data product deleted");
    } else {
      debug!(%data_product_id, "data product already retired; not deleting");
    }
    Ok(())
  }

  /// Remove the product's streams and its input/output product edges.
  async fn delete_dependents(&self, data_product_id: &ResourceId) -> Result<()> {
    let registry = self.clients.resource_registry();

    let stream_ids = registry
      .find_objects(data_product_id, Predicate::HasStream, Some(ResourceType::Stream))
      .await
      .map_err(Error::registry)?;

    // Edges first, then the streams they point at.
    for predicate in [Predicate::HasStream, Predicate::HasOutputProduct, Predicate::HasInputProduct] {
      let associations = registry
        .find_associations(data_product_id, predicate)
        .await
        .map_err(Error::registry)?;
      for association in &associations {
        registry.delete_association(&association.id).await.map_err(Error::registry)?;
      }
    }

    for stream_id in &stream_ids {
      debug!(%data_product_id, %stream_id, "deleting stream");
      self
        .clients
        .stream_registry()
        .delete_stream(stream_id)
        .await
        .map_err(Error::streams)?;
    }
    Ok(())
  }

  /// Placeholder: hard deletion is not supported and does nothing.
  pub async fn hard_delete_data_product(&self, data_product_id: &ResourceId) -> Result<()> {
    debug!(%data_product_id, "hard_delete_data_product is a no-op");
    Ok(())
  }

  /// Data products matching `filter`. Filter semantics belong to the
  /// registry.
  pub async fn find_data_products(&self, filter: &ResourceFilter) -> Result<Vec<DataProduct>> {
    debug!(?filter, "find_data_products");
    let resources = self
      .clients
      .resource_registry()
      .find_resources(ResourceType::DataProduct, filter)
      .await
      .map_err(Error::registry)?;
    Ok(resources.into_iter().filter_map(|r| r.into_data_product()).collect())
  }

  // ── Persistence ───────────────────────────────────────────────────────

  /// Start persisting the product's stream into a dataset and record the
  /// ingestion configuration on the product. Returns the dataset id.
  pub async fn activate_data_product_persistence(
    &self,
    data_product_id: &ResourceId,
    options: PersistenceOptions,
  ) -> Result<ResourceId> {
    debug!(%data_product_id, ?options, "activate_data_product_persistence");
    let registry = self.clients.resource_registry();
    let ingestion = self.clients.ingestion();

    let mut data_product = self.read_data_product(data_product_id).await?;

    let stream_ids = registry
      .find_objects(data_product_id, Predicate::HasStream, Some(ResourceType::Stream))
      .await
      .map_err(Error::registry)?;
    if stream_ids.is_empty() {
      return Err(Error::bad_request(format!(
        "Data Product {data_product_id} must have one stream associated"
      )));
    }
    let stream_id = self.config.stream_selection.select(&stream_ids, "streams")?;
    debug!(%data_product_id, %stream_id, "persisting stream");

    let configuration_ids = ingestion
      .list_ingestion_configurations()
      .await
      .map_err(Error::ingestion)?;
    let configuration_id = self
      .config
      .ingestion_selection
      .select(&configuration_ids, "ingestion configurations")?;

    let dataset_id = ingestion
      .persist_data_stream(&stream_id, &configuration_id)
      .await
      .map_err(Error::ingestion)?;
    registry
      .create_association(data_product_id, Predicate::HasDataset, &dataset_id)
      .await
      .map_err(Error::registry)?;

    data_product.dataset_configuration_id = Some(configuration_id.clone());
    self.update_data_product(data_product).await?;

    info!(%data_product_id, %dataset_id, %configuration_id, "persistence activated");
    Ok(dataset_id)
  }

  /// Stop persisting the product's stream. The dataset link and the
  /// recorded configuration id are left in place.
  pub async fn suspend_data_product_persistence(&self, data_product_id: &ResourceId) -> Result<()> {
    debug!(%data_product_id, "suspend_data_product_persistence");
    let registry = self.clients.resource_registry();

    let data_product = registry
      .read(data_product_id)
      .await
      .map_err(Error::registry)?
      .and_then(|r| r.into_data_product())
      .ok_or_else(|| Error::not_found(format!("Data Product {data_product_id} does not exist")))?;
    let configuration_id = data_product.dataset_configuration_id.ok_or_else(|| {
      Error::not_found(format!(
        "Data Product {data_product_id} dataset configuration does not exist"
      ))
    })?;

    let stream_ids = registry
      .find_objects(data_product_id, Predicate::HasStream, Some(ResourceType::Stream))
      .await
      .map_err(Error::registry)?;
    if stream_ids.is_empty() {
      return Err(Error::bad_request(format!(
        "Data Product {data_product_id} must have one stream associated"
      )));
    }
    let stream_id = self.config.stream_selection.select(&stream_ids, "streams")?;

    let status = self
      .clients
      .ingestion()
      .unpersist_data_stream(&stream_id, &configuration_id)
      .await
      .map_err(Error::ingestion)?;

    info!(%data_product_id, %stream_id, status, "persistence suspended");
    Ok(())
  }

  // ── Versions ──────────────────────────────────────────────────────────

  /// Add a version to an existing product. The version gets a new stream
  /// built from the stream definition of the product's stream.
  ///
  /// The version and its `hasVersion` edge are registered before the
  /// product's stream is looked up, so they remain if that lookup fails.
  pub async fn create_data_product_version(
    &self,
    data_product_id: &ResourceId,
    version: DataProductVersion,
  ) -> Result<ResourceId> {
    debug!(%data_product_id, name = %version.name, "create_data_product_version");
    let registry = self.clients.resource_registry();

    let data_product = self.read_data_product(data_product_id).await?;

    let (version_id, _) = registry.create(version.into()).await.map_err(Error::registry)?;
    registry
      .create_association(data_product_id, Predicate::HasVersion, &version_id)
      .await
      .map_err(Error::registry)?;

    let stream_ids = registry
      .find_objects(data_product_id, Predicate::HasStream, None)
      .await
      .map_err(Error::registry)?;
    if stream_ids.is_empty() {
      return Err(Error::not_found(format!(
        "Data Product {data_product_id} does not have a connected StreamDefinition"
      )));
    }
    let source_stream_id = self.config.stream_selection.select(&stream_ids, "streams")?;

    let stream_definition_id = registry
      .find_objects(&source_stream_id, Predicate::HasStreamDefinition, None)
      .await
      .map_err(Error::registry)?
      .into_iter()
      .next()
      .ok_or_else(|| {
        Error::not_found(format!("Stream {source_stream_id} has no StreamDefinition"))
      })?;

    let stream_id = self
      .clients
      .stream_registry()
      .create_stream(&data_product.name, &data_product.description, &stream_definition_id)
      .await
      .map_err(Error::streams)?;
    debug!(%version_id, %stream_id, "created stream for data product version");
    registry
      .create_association(&version_id, Predicate::HasStream, &stream_id)
      .await
      .map_err(Error::registry)?;

    Ok(version_id)
  }

  pub async fn update_data_product_version(&self, version: DataProductVersion) -> Result<Revision> {
    debug!(id = ?version.id, rev = ?version.rev, "update_data_product_version");
    self
      .clients
      .resource_registry()
      .update(version.into())
      .await
      .map_err(Error::registry)
  }

  pub async fn read_data_product_version(&self, version_id: &ResourceId) -> Result<DataProductVersion> {
    debug!(%version_id, "read_data_product_version");
    self
      .clients
      .resource_registry()
      .read(version_id)
      .await
      .map_err(Error::registry)?
      .and_then(|r| r.into_data_product_version())
      .ok_or_else(|| Error::not_found(format!("Data Product Version {version_id} does not exist")))
  }

  /// Placeholder: version deletion is not supported and does nothing.
  pub async fn delete_data_product_version(&self, version_id: &ResourceId) -> Result<()> {
    debug!(%version_id, "delete_data_product_version is a no-op");
    Ok(())
  }

  // ── Lifecycle ─────────────────────────────────────────────────────────

  /// Apply `event` to the product and return the state it ends up in.
  pub async fn execute_data_product_lifecycle(
    &self,
    data_product_id: &ResourceId,
    event: LifecycleEvent,
  ) -> Result<LifecycleState> {
    debug!(%data_product_id, %event, "execute_data_product_lifecycle");
    let data_product = self.read_data_product(data_product_id).await?;

    let current = data_product.lcstate;
    let next = self.clients.lifecycle().next_state(current, event).ok_or_else(|| {
      Error::bad_request(format!(
        "cannot apply {event} to Data Product {data_product_id} in state {current}"
      ))
    })?;

    self
      .clients
      .resource_registry()
      .set_lifecycle_state(data_product_id, next)
      .await
      .map_err(Error::registry)?;
    info!(%data_product_id, from = %current, to = %next, "lifecycle transition");
    Ok(next)
  }

  // ── Last update ───────────────────────────────────────────────────────

  /// Cached last updates for each of the product's streams. Streams with no
  /// cache entry are left out of the result.
  pub async fn get_last_update(&self, data_product_id: &ResourceId) -> Result<LastUpdates> {
    debug!(%data_product_id, "get_last_update");
    let cache = self
      .clients
      .datastores()
      .get_datastore(LAST_UPDATE_CACHE)
      .await
      .map_err(Error::datastore)?;

    let stream_ids = self
      .clients
      .resource_registry()
      .find_objects(data_product_id, Predicate::HasStream, None)
      .await
      .map_err(Error::registry)?;

    let mut last_updates = LastUpdates::new();
    for stream_id in stream_ids {
      let Some(doc) = cache.read(stream_id.as_str()).await.map_err(Error::datastore)? else {
        continue;
      };
      last_updates.insert(stream_id, serde_json::from_value(doc)?);
    }
    Ok(last_updates)
  }
}
