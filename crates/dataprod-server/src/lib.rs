//! Standalone HTTP server for the data product management service.
//!
//! Loads a [`ServerConfig`], opens a SQLite store, seeds the reference
//! resources the service depends on and serves the JSON API.

use std::{path::PathBuf, sync::Arc};

use axum::Router;
use dataprod_core::{
  DataProductManagementService,
  clients::Clients,
  config::ServiceConfig,
  lifecycle::LifecycleState,
  registry::ResourceRegistry,
  resource::{
    IngestionConfiguration, Resource, ResourceFilter, StreamDefinition,
  },
};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` with
/// `DATAPROD_` environment overrides.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default)]
  pub service:    ServiceConfig,
  #[serde(default)]
  pub seed:       SeedConfig,
}

fn default_host() -> String { "127.0.0.1".to_string() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("dataprod.db") }

/// Reference resources created at startup when no resource of the same
/// type and name exists yet.
#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct SeedConfig {
  pub stream_definitions:       Vec<StreamDefinitionSeed>,
  pub ingestion_configurations: Vec<IngestionConfigurationSeed>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StreamDefinitionSeed {
  pub name:        String,
  #[serde(default)]
  pub description: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IngestionConfigurationSeed {
  pub name:           String,
  #[serde(default)]
  pub description:    String,
  pub exchange_point: String,
}

// ─── Seeding ──────────────────────────────────────────────────────────────────

/// Create every seed resource missing from `registry`. Returns how many were
/// created.
pub async fn seed<R: ResourceRegistry>(
  registry: &R,
  seed: &SeedConfig,
) -> Result<usize, R::Error> {
  let definitions = seed.stream_definitions.iter().map(|s| {
    Resource::from(StreamDefinition {
      id:          None,
      rev:         None,
      name:        s.name.clone(),
      description: s.description.clone(),
      lcstate:     LifecycleState::Draft,
    })
  });
  let configurations = seed.ingestion_configurations.iter().map(|s| {
    Resource::from(IngestionConfiguration {
      id:             None,
      rev:            None,
      name:           s.name.clone(),
      description:    s.description.clone(),
      lcstate:        LifecycleState::Draft,
      exchange_point: s.exchange_point.clone(),
    })
  });

  let mut created = 0;
  for resource in definitions.chain(configurations) {
    if seed_one(registry, resource).await? {
      created += 1;
    }
  }
  Ok(created)
}

async fn seed_one<R: ResourceRegistry>(registry: &R, resource: Resource) -> Result<bool, R::Error> {
  let resource_type = resource.resource_type();
  let filter = ResourceFilter {
    name: Some(resource.name().to_owned()),
    limit: Some(1),
    ..Default::default()
  };
  if !registry.find_resources(resource_type, &filter).await?.is_empty() {
    tracing::debug!(%resource_type, name = resource.name(), "seed resource already present");
    return Ok(false);
  }

  let name = resource.name().to_owned();
  let (id, _) = registry.create(resource).await?;
  tracing::info!(%resource_type, %name, %id, "seeded resource");
  Ok(true)
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application router: the JSON API with request tracing.
pub fn router<C>(service: Arc<DataProductManagementService<C>>) -> Router
where
  C: Clients + 'static,
{
  dataprod_api::api_router(service).layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
  use config::{Config, File, FileFormat};
  use dataprod_core::{config::SelectionPolicy, resource::ResourceType};
  use dataprod_store_sqlite::SqliteStore;

  use super::*;

  async fn count(store: &SqliteStore, resource_type: ResourceType) -> usize {
    store
      .find_resources(resource_type, &ResourceFilter::default())
      .await
      .unwrap()
      .len()
  }

  const SAMPLE: &str = r#"
    port = 9000
    store_path = "/tmp/dataprod.db"

    [service]
    stream_selection = "exactly_one"
    cascade_delete = true

    [[seed.stream_definitions]]
    name = "ctd_parsed"
    description = "Parsed CTD samples"

    [[seed.ingestion_configurations]]
    name = "standard_ingest"
    exchange_point = "science_data"
  "#;

  fn sample() -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(SAMPLE, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn config_fills_defaults() {
    let cfg = sample();
    assert_eq!(cfg.host, "127.0.0.1");
    assert_eq!(cfg.port, 9000);
    assert_eq!(cfg.store_path, PathBuf::from("/tmp/dataprod.db"));
    assert_eq!(cfg.service.stream_selection, SelectionPolicy::ExactlyOne);
    assert_eq!(cfg.service.ingestion_selection, SelectionPolicy::First);
    assert!(cfg.service.cascade_delete);
    assert_eq!(cfg.seed.stream_definitions.len(), 1);
    assert_eq!(cfg.seed.ingestion_configurations[0].exchange_point, "science_data");
  }

  #[test]
  fn empty_config_is_valid() {
    let cfg: ServerConfig = Config::builder().build().unwrap().try_deserialize().unwrap();
    assert_eq!(cfg.port, 8080);
    assert!(cfg.seed.stream_definitions.is_empty());
    assert!(!cfg.service.cascade_delete);
  }

  #[tokio::test]
  async fn seeding_is_idempotent_by_name() {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let cfg = sample();

    assert_eq!(seed(&store, &cfg.seed).await.unwrap(), 2);
    assert_eq!(seed(&store, &cfg.seed).await.unwrap(), 0);

    assert_eq!(count(&store, ResourceType::StreamDefinition).await, 1);
    assert_eq!(count(&store, ResourceType::IngestionConfiguration).await, 1);
  }
}
