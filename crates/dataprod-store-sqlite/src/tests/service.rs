//! End-to-end orchestration tests: the management service wired to
//! collaborators that all share one in-memory store.

use chrono::{TimeZone, Utc};
use dataprod_core::{
  DataProductManagementService,
  clients::{Datastore, Datastores, LAST_UPDATE_CACHE, StreamRegistry},
  config::{SelectionPolicy, ServiceConfig},
  lifecycle::{LifecycleEvent, LifecycleState},
  registry::ResourceRegistry,
  resource::{
    DataProducer, DataProduct, DataProductVersion, Predicate, ResourceFilter, ResourceId,
    ResourceType, Revision,
  },
  service::PersistenceOptions,
};
use serde_json::json;

use super::{ingestion_configuration, store, stream_definition};
use crate::{EmbeddedContext, SqliteStore, embedded_context};

type Service = DataProductManagementService<EmbeddedContext>;

async fn service_with(config: ServiceConfig) -> (SqliteStore, Service) {
  let s = store().await;
  let service = DataProductManagementService::new(embedded_context(s.clone()), config);
  (s, service)
}

async fn service() -> (SqliteStore, Service) { service_with(ServiceConfig::default()).await }

/// A product created with a stream; returns `(product, stream, definition)`.
async fn product_with_stream(s: &SqliteStore, svc: &Service) -> (ResourceId, ResourceId, ResourceId) {
  let def = stream_definition(s, "ctd_parsed").await;
  let dp = svc
    .create_data_product(DataProduct::new("ctd", "CTD parsed"), Some(&def))
    .await
    .unwrap();
  let streams = s.find_objects(&dp, Predicate::HasStream, None).await.unwrap();
  assert_eq!(streams.len(), 1);
  (dp, streams[0].clone(), def)
}

/// Attach an extra stream built from `def` directly to `dp`.
async fn attach_stream(s: &SqliteStore, svc: &Service, dp: &ResourceId, def: &ResourceId) -> ResourceId {
  let stream = svc
    .clients()
    .stream_registry
    .create_stream("extra", "", def)
    .await
    .unwrap();
  s.create_association(dp, Predicate::HasStream, &stream).await.unwrap();
  stream
}

// ─── Create ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_without_definition_has_default_version_and_no_stream() {
  let (s, svc) = service().await;

  let dp = svc
    .create_data_product(DataProduct::new("ctd", "CTD parsed"), None)
    .await
    .unwrap();

  let versions = s.find_objects(&dp, Predicate::HasVersion, None).await.unwrap();
  assert_eq!(versions.len(), 1);
  let version = svc.read_data_product_version(&versions[0]).await.unwrap();
  assert_eq!(version.name, "default");
  assert_eq!(version.description, "initial version");

  assert!(s.find_objects(&dp, Predicate::HasStream, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn create_with_definition_links_stream_to_product_and_default_version() {
  let (s, svc) = service().await;
  let (dp, stream, def) = product_with_stream(&s, &svc).await;

  let versions = s.find_objects(&dp, Predicate::HasVersion, None).await.unwrap();
  assert_eq!(versions.len(), 1);
  let version_streams = s.find_objects(&versions[0], Predicate::HasStream, None).await.unwrap();
  assert_eq!(version_streams, vec![stream.clone()]);

  let stream_res = s.read(&stream).await.unwrap().unwrap();
  assert_eq!(stream_res.resource_type(), ResourceType::Stream);
  assert_eq!(stream_res.name(), "ctd");

  let defs = s.find_objects(&stream, Predicate::HasStreamDefinition, None).await.unwrap();
  assert_eq!(defs, vec![def]);
}

#[tokio::test]
async fn create_with_unknown_definition_is_not_found_and_keeps_product() {
  let (s, svc) = service().await;
  let err = svc
    .create_data_product(DataProduct::new("ctd", ""), Some(&ResourceId::from("missing")))
    .await
    .unwrap_err();
  assert!(err.is_not_found());

  // Product and default version were registered before the stream failed.
  let products = svc.find_data_products(&ResourceFilter::default()).await.unwrap();
  assert_eq!(products.len(), 1);
  let dp = products[0].id.clone().unwrap();
  assert_eq!(s.find_objects(&dp, Predicate::HasVersion, None).await.unwrap().len(), 1);
  assert!(s.find_objects(&dp, Predicate::HasStream, None).await.unwrap().is_empty());
}

// ─── Read / update / find ────────────────────────────────────────────────────

#[tokio::test]
async fn read_missing_product_is_not_found() {
  let (_s, svc) = service().await;
  let err = svc.read_data_product(&ResourceId::from("nope")).await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn read_of_another_resource_type_is_not_found() {
  let (s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();
  let version = s.find_objects(&dp, Predicate::HasVersion, None).await.unwrap()[0].clone();

  assert!(svc.read_data_product(&version).await.unwrap_err().is_not_found());
  assert!(svc.read_data_product_version(&dp).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn update_passes_through_and_stale_revision_fails() {
  let (_s, svc) = service().await;
  let dp_id = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();

  let mut dp = svc.read_data_product(&dp_id).await.unwrap();
  let stale = dp.clone();
  dp.description = "updated".into();
  svc.update_data_product(dp).await.unwrap();
  assert_eq!(svc.read_data_product(&dp_id).await.unwrap().description, "updated");

  let err = svc.update_data_product(stale).await.unwrap_err();
  assert!(err.is_conflict(), "{err:?}");
}

#[tokio::test]
async fn update_of_missing_product_is_not_found() {
  let (_s, svc) = service().await;
  let mut dp = DataProduct::new("ghost", "");
  dp.id = Some(ResourceId::from("nope"));
  dp.rev = Some(Revision(1));

  let err = svc.update_data_product(dp).await.unwrap_err();
  assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn update_of_missing_version_is_not_found() {
  let (_s, svc) = service().await;
  let mut version = DataProductVersion::new("ghost", "");
  version.id = Some(ResourceId::from("nope"));
  version.rev = Some(Revision(1));

  let err = svc.update_data_product_version(version).await.unwrap_err();
  assert!(err.is_not_found(), "{err:?}");
}

#[tokio::test]
async fn update_without_identity_is_bad_request() {
  let (_s, svc) = service().await;
  let err = svc
    .update_data_product(DataProduct::new("ctd", ""))
    .await
    .unwrap_err();
  assert!(err.is_bad_request(), "{err:?}");
}

#[tokio::test]
async fn update_and_read_version() {
  let (s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();
  let version_id = s.find_objects(&dp, Predicate::HasVersion, None).await.unwrap()[0].clone();

  let mut version = svc.read_data_product_version(&version_id).await.unwrap();
  version.description = "first light".into();
  svc.update_data_product_version(version).await.unwrap();

  let version = svc.read_data_product_version(&version_id).await.unwrap();
  assert_eq!(version.description, "first light");
}

#[tokio::test]
async fn find_data_products_by_name() {
  let (_s, svc) = service().await;
  svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();
  svc.create_data_product(DataProduct::new("adcp", ""), None).await.unwrap();

  let all = svc.find_data_products(&ResourceFilter::default()).await.unwrap();
  assert_eq!(all.len(), 2);

  let filter = ResourceFilter { name: Some("adcp".into()), ..Default::default() };
  let found = svc.find_data_products(&filter).await.unwrap();
  assert_eq!(found.len(), 1);
  assert_eq!(found[0].name, "adcp");
}

// ─── Persistence ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn activate_without_stream_is_bad_request() {
  let (s, svc) = service().await;
  ingestion_configuration(&s, "standard_ingest").await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();

  let err = svc
    .activate_data_product_persistence(&dp, PersistenceOptions::default())
    .await
    .unwrap_err();
  assert!(err.is_bad_request());
}

#[tokio::test]
async fn activate_with_one_stream_sets_dataset_configuration() {
  let (s, svc) = service().await;
  let cfg = ingestion_configuration(&s, "standard_ingest").await;
  let (dp, stream, _) = product_with_stream(&s, &svc).await;

  let dataset = svc
    .activate_data_product_persistence(&dp, PersistenceOptions::default())
    .await
    .unwrap();

  let product = svc.read_data_product(&dp).await.unwrap();
  assert_eq!(product.dataset_configuration_id, Some(cfg.clone()));

  let datasets = s.find_objects(&dp, Predicate::HasDataset, None).await.unwrap();
  assert_eq!(datasets, vec![dataset]);
  let persisted = s.find_objects(&cfg, Predicate::PersistsStream, None).await.unwrap();
  assert_eq!(persisted, vec![stream]);
}

#[tokio::test]
async fn activate_without_ingestion_configuration_is_bad_request() {
  let (s, svc) = service().await;
  let (dp, _, _) = product_with_stream(&s, &svc).await;

  let err = svc
    .activate_data_product_persistence(&dp, PersistenceOptions::default())
    .await
    .unwrap_err();
  assert!(err.is_bad_request());
  assert!(svc.read_data_product(&dp).await.unwrap().dataset_configuration_id.is_none());
}

#[tokio::test]
async fn activate_uses_first_stream_and_first_configuration_by_default() {
  let (s, svc) = service().await;
  let first_cfg = ingestion_configuration(&s, "first").await;
  ingestion_configuration(&s, "second").await;
  let (dp, first_stream, def) = product_with_stream(&s, &svc).await;
  let second_stream = attach_stream(&s, &svc, &dp, &def).await;

  svc
    .activate_data_product_persistence(&dp, PersistenceOptions::default())
    .await
    .unwrap();

  let persisted = s.find_objects(&first_cfg, Predicate::PersistsStream, None).await.unwrap();
  assert_eq!(persisted, vec![first_stream]);
  assert!(s.find_objects(&second_stream, Predicate::HasDataset, None).await.unwrap().is_empty());
}

#[tokio::test]
async fn exactly_one_policy_rejects_multiple_streams() {
  let config = ServiceConfig { stream_selection: SelectionPolicy::ExactlyOne, ..Default::default() };
  let (s, svc) = service_with(config).await;
  ingestion_configuration(&s, "standard_ingest").await;
  let (dp, _, def) = product_with_stream(&s, &svc).await;
  attach_stream(&s, &svc, &dp, &def).await;

  let err = svc
    .activate_data_product_persistence(&dp, PersistenceOptions::default())
    .await
    .unwrap_err();
  assert!(err.is_bad_request());
}

#[tokio::test]
async fn exactly_one_policy_rejects_multiple_ingestion_configurations() {
  let config = ServiceConfig { ingestion_selection: SelectionPolicy::ExactlyOne, ..Default::default() };
  let (s, svc) = service_with(config).await;
  ingestion_configuration(&s, "a").await;
  ingestion_configuration(&s, "b").await;
  let (dp, _, _) = product_with_stream(&s, &svc).await;

  let err = svc
    .activate_data_product_persistence(&dp, PersistenceOptions::default())
    .await
    .unwrap_err();
  assert!(err.is_bad_request());
}

#[tokio::test]
async fn suspend_without_dataset_configuration_is_not_found() {
  let (s, svc) = service().await;
  let (dp, _, _) = product_with_stream(&s, &svc).await;

  let err = svc.suspend_data_product_persistence(&dp).await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn suspend_missing_product_is_not_found() {
  let (_s, svc) = service().await;
  let err = svc
    .suspend_data_product_persistence(&ResourceId::from("nope"))
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn suspend_without_stream_is_bad_request() {
  let (s, svc) = service().await;
  let cfg = ingestion_configuration(&s, "standard_ingest").await;
  let dp_id = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();

  let mut dp = svc.read_data_product(&dp_id).await.unwrap();
  dp.dataset_configuration_id = Some(cfg);
  svc.update_data_product(dp).await.unwrap();

  let err = svc.suspend_data_product_persistence(&dp_id).await.unwrap_err();
  assert!(err.is_bad_request());
}

#[tokio::test]
async fn suspend_after_activate_stops_persisting_but_keeps_links() {
  let (s, svc) = service().await;
  let cfg = ingestion_configuration(&s, "standard_ingest").await;
  let (dp, _, _) = product_with_stream(&s, &svc).await;
  svc
    .activate_data_product_persistence(&dp, PersistenceOptions::default())
    .await
    .unwrap();

  svc.suspend_data_product_persistence(&dp).await.unwrap();

  assert!(s.find_objects(&cfg, Predicate::PersistsStream, None).await.unwrap().is_empty());
  let product = svc.read_data_product(&dp).await.unwrap();
  assert_eq!(product.dataset_configuration_id, Some(cfg));
  assert_eq!(s.find_objects(&dp, Predicate::HasDataset, None).await.unwrap().len(), 1);

  // A second suspend has nothing to unpersist.
  let err = svc.suspend_data_product_persistence(&dp).await.unwrap_err();
  assert!(err.is_not_found());
}

// ─── Versions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_version_without_stream_is_not_found() {
  let (_s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();

  let err = svc
    .create_data_product_version(&dp, DataProductVersion::new("v2", ""))
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn create_version_for_missing_product_is_not_found() {
  let (_s, svc) = service().await;
  let err = svc
    .create_data_product_version(&ResourceId::from("nope"), DataProductVersion::new("v2", ""))
    .await
    .unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn create_version_gets_stream_with_same_definition() {
  let (s, svc) = service().await;
  let (dp, original_stream, def) = product_with_stream(&s, &svc).await;

  let version = svc
    .create_data_product_version(&dp, DataProductVersion::new("v2", "reprocessed"))
    .await
    .unwrap();

  let versions = s.find_objects(&dp, Predicate::HasVersion, None).await.unwrap();
  assert_eq!(versions.len(), 2);
  assert_eq!(versions[1], version);

  let streams = s.find_objects(&version, Predicate::HasStream, None).await.unwrap();
  assert_eq!(streams.len(), 1);
  assert_ne!(streams[0], original_stream);

  let defs = s.find_objects(&streams[0], Predicate::HasStreamDefinition, None).await.unwrap();
  assert_eq!(defs, vec![def]);
  assert_eq!(s.read(&streams[0]).await.unwrap().unwrap().name(), "ctd");
}

#[tokio::test]
async fn delete_version_is_a_no_op() {
  let (s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();
  let version = s.find_objects(&dp, Predicate::HasVersion, None).await.unwrap()[0].clone();

  svc.delete_data_product_version(&version).await.unwrap();
  assert!(svc.read_data_product_version(&version).await.is_ok());
}

// ─── Delete ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn delete_removes_product_and_unassigns_producers() {
  let (s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();
  let producer = DataProducer {
    id:          None,
    rev:         None,
    name:        "ctd producer".into(),
    description: String::new(),
    lcstate:     LifecycleState::Draft,
  };
  let (producer, _) = s.create(producer.into()).await.unwrap();
  s.create_association(&dp, Predicate::HasDataProducer, &producer).await.unwrap();
  s.create_association(&producer, Predicate::HasOutputProduct, &dp).await.unwrap();

  svc.delete_data_product(&dp).await.unwrap();

  assert!(s.read(&dp).await.unwrap().is_none());
  assert!(s.read(&producer).await.unwrap().is_some());
  assert!(s.find_associations(&producer, Predicate::HasOutputProduct).await.unwrap().is_empty());
}

#[tokio::test]
async fn delete_of_retired_product_is_a_no_op() {
  let (s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();
  svc.execute_data_product_lifecycle(&dp, LifecycleEvent::Retire).await.unwrap();

  svc.delete_data_product(&dp).await.unwrap();

  let product = svc.read_data_product(&dp).await.unwrap();
  assert_eq!(product.lcstate, LifecycleState::Retired);
  assert_eq!(s.find_objects(&dp, Predicate::HasVersion, None).await.unwrap().len(), 1);
}

#[tokio::test]
async fn delete_missing_product_is_not_found() {
  let (_s, svc) = service().await;
  let err = svc.delete_data_product(&ResourceId::from("nope")).await.unwrap_err();
  assert!(err.is_not_found());
}

#[tokio::test]
async fn delete_without_cascade_leaves_streams() {
  let (s, svc) = service().await;
  let (dp, stream, _) = product_with_stream(&s, &svc).await;

  svc.delete_data_product(&dp).await.unwrap();

  assert!(s.read(&dp).await.unwrap().is_none());
  assert!(s.read(&stream).await.unwrap().is_some());
}

#[tokio::test]
async fn cascade_delete_removes_streams_and_product_edges() {
  let config = ServiceConfig { cascade_delete: true, ..Default::default() };
  let (s, svc) = service_with(config).await;
  let (dp, stream, _) = product_with_stream(&s, &svc).await;
  let upstream = svc.create_data_product(DataProduct::new("raw", ""), None).await.unwrap();
  s.create_association(&dp, Predicate::HasInputProduct, &upstream).await.unwrap();

  svc.delete_data_product(&dp).await.unwrap();

  assert!(s.read(&dp).await.unwrap().is_none());
  assert!(s.read(&stream).await.unwrap().is_none());
  assert!(s.read(&upstream).await.unwrap().is_some());
}

#[tokio::test]
async fn hard_delete_is_a_no_op() {
  let (_s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();

  svc.hard_delete_data_product(&dp).await.unwrap();
  assert!(svc.read_data_product(&dp).await.is_ok());
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn lifecycle_event_moves_product_state() {
  let (_s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();

  let state = svc.execute_data_product_lifecycle(&dp, LifecycleEvent::Plan).await.unwrap();
  assert_eq!(state, LifecycleState::Planned);
  assert_eq!(svc.read_data_product(&dp).await.unwrap().lcstate, LifecycleState::Planned);
}

#[tokio::test]
async fn illegal_lifecycle_event_is_bad_request() {
  let (_s, svc) = service().await;
  let dp = svc.create_data_product(DataProduct::new("ctd", ""), None).await.unwrap();

  let err = svc
    .execute_data_product_lifecycle(&dp, LifecycleEvent::Activate)
    .await
    .unwrap_err();
  assert!(err.is_bad_request());
  assert_eq!(svc.read_data_product(&dp).await.unwrap().lcstate, LifecycleState::Draft);
}

// ─── Last update ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn last_update_returns_only_cached_streams() {
  let (s, svc) = service().await;
  let (dp, cached, def) = product_with_stream(&s, &svc).await;
  let uncached = attach_stream(&s, &svc, &dp, &def).await;

  let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
  let cache = s.get_datastore(LAST_UPDATE_CACHE).await.unwrap();
  cache
    .write(
      cached.as_str(),
      json!({ "updated_at": at, "values": { "temperature": 11.5 } }),
    )
    .await
    .unwrap();

  let updates = svc.get_last_update(&dp).await.unwrap();
  assert_eq!(updates.len(), 1);
  let lu = &updates[&cached];
  assert_eq!(lu.updated_at, at);
  assert_eq!(lu.values["temperature"], json!(11.5));
  assert!(!updates.contains_key(&uncached));
}

#[tokio::test]
async fn last_update_with_malformed_entry_errors() {
  let (s, svc) = service().await;
  let (dp, stream, _) = product_with_stream(&s, &svc).await;

  let cache = s.get_datastore(LAST_UPDATE_CACHE).await.unwrap();
  cache.write(stream.as_str(), json!("not an update")).await.unwrap();

  let err = svc.get_last_update(&dp).await.unwrap_err();
  assert!(matches!(err, dataprod_core::Error::Serialization(_)));
}
