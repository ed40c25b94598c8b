//! The `ResourceRegistry` trait.
//!
//! The registry owns resource storage, the association graph and revision
//! tokens. It is implemented by storage backends (e.g.
//! `dataprod-store-sqlite`); the management service depends only on this
//! abstraction.

use std::future::Future;

use crate::{
  error::CollaboratorError,
  lifecycle::LifecycleState,
  resource::{
    Association, AssociationId, Predicate, Resource, ResourceFilter, ResourceId,
    ResourceType, Revision,
  },
};

/// Abstraction over the generic resource registry.
///
/// All methods return `Send` futures so implementations can be driven from a
/// multi-threaded runtime.
pub trait ResourceRegistry: Send + Sync {
  type Error: CollaboratorError;

  // ── Resources ─────────────────────────────────────────────────────────

  /// Register a new resource. Any id or revision carried by `resource` is
  /// ignored; the registry assigns both.
  fn create(
    &self,
    resource: Resource,
  ) -> impl Future<Output = Result<(ResourceId, Revision), Self::Error>> + Send + '_;

  /// Retrieve a resource by id. Returns `None` if not found.
  fn read<'a>(
    &'a self,
    id: &'a ResourceId,
  ) -> impl Future<Output = Result<Option<Resource>, Self::Error>> + Send + 'a;

  /// Overwrite a resource. `resource` must carry its id and current
  /// revision; a stale revision is rejected. Returns the new revision.
  fn update(
    &self,
    resource: Resource,
  ) -> impl Future<Output = Result<Revision, Self::Error>> + Send + '_;

  /// Physically remove a resource together with every association touching
  /// it.
  fn delete<'a>(
    &'a self,
    id: &'a ResourceId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Record a lifecycle state that has already been validated by the
  /// caller. Returns the new revision.
  fn set_lifecycle_state<'a>(
    &'a self,
    id: &'a ResourceId,
    state: LifecycleState,
  ) -> impl Future<Output = Result<Revision, Self::Error>> + Send + 'a;

  /// Resources of `resource_type` matching `filter`.
  fn find_resources<'a>(
    &'a self,
    resource_type: ResourceType,
    filter: &'a ResourceFilter,
  ) -> impl Future<Output = Result<Vec<Resource>, Self::Error>> + Send + 'a;

  // ── Associations ──────────────────────────────────────────────────────

  /// Create the edge `subject --predicate--> object`. Both ends must exist.
  fn create_association<'a>(
    &'a self,
    subject: &'a ResourceId,
    predicate: Predicate,
    object: &'a ResourceId,
  ) -> impl Future<Output = Result<AssociationId, Self::Error>> + Send + 'a;

  /// Ids of the objects reachable from `subject` over `predicate`, in
  /// association creation order, optionally restricted to one object type.
  fn find_objects<'a>(
    &'a self,
    subject: &'a ResourceId,
    predicate: Predicate,
    object_type: Option<ResourceType>,
  ) -> impl Future<Output = Result<Vec<ResourceId>, Self::Error>> + Send + 'a;

  /// All edges leaving `subject` over `predicate`, in creation order.
  fn find_associations<'a>(
    &'a self,
    subject: &'a ResourceId,
    predicate: Predicate,
  ) -> impl Future<Output = Result<Vec<Association>, Self::Error>> + Send + 'a;

  fn delete_association<'a>(
    &'a self,
    id: &'a AssociationId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;
}
