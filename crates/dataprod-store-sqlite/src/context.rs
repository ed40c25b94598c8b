//! A self-contained [`ServiceContext`] where every collaborator is backed by
//! one [`SqliteStore`].

use dataprod_core::{
  clients::ServiceContext,
  embedded::{EmbeddedAcquisition, EmbeddedIngestion, EmbeddedStreams},
  lifecycle::StandardLifecycle,
};

use crate::SqliteStore;

pub type EmbeddedContext = ServiceContext<
  SqliteStore,
  EmbeddedStreams<SqliteStore>,
  EmbeddedIngestion<SqliteStore>,
  EmbeddedAcquisition<SqliteStore>,
  SqliteStore,
  StandardLifecycle,
>;

/// Wire every collaborator to `store`.
pub fn embedded_context(store: SqliteStore) -> EmbeddedContext {
  ServiceContext {
    resource_registry: store.clone(),
    stream_registry:   EmbeddedStreams::new(store.clone()),
    ingestion:         EmbeddedIngestion::new(store.clone()),
    data_acquisition:  EmbeddedAcquisition::new(store.clone()),
    datastores:        store,
    lifecycle:         StandardLifecycle,
  }
}
