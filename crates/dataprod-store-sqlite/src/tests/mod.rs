//! Tests against an in-memory database.

mod service;

use dataprod_core::{
  lifecycle::LifecycleState,
  registry::ResourceRegistry,
  resource::{IngestionConfiguration, ResourceId, StreamDefinition},
};

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn stream_definition(store: &SqliteStore, name: &str) -> ResourceId {
  let def = StreamDefinition {
    id:          None,
    rev:         None,
    name:        name.into(),
    description: "test definition".into(),
    lcstate:     LifecycleState::Draft,
  };
  store.create(def.into()).await.unwrap().0
}

async fn ingestion_configuration(store: &SqliteStore, name: &str) -> ResourceId {
  let cfg = IngestionConfiguration {
    id:             None,
    rev:            None,
    name:           name.into(),
    description:    String::new(),
    lcstate:        LifecycleState::Draft,
    exchange_point: "science_data".into(),
  };
  store.create(cfg.into()).await.unwrap().0
}
