//! JSON REST API for the data product management service.
//!
//! Exposes an axum [`Router`] backed by any
//! [`DataProductManagementService`]. Auth, TLS, and transport concerns are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", dataprod_api::api_router(service.clone()))
//! ```

pub mod data_products;
pub mod error;
pub mod extract;
pub mod versions;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use dataprod_core::{DataProductManagementService, clients::Clients};

pub use error::ApiError;

/// Build a fully-materialised API router for `service`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<C>(service: Arc<DataProductManagementService<C>>) -> Router<()>
where
  C: Clients + 'static,
{
  Router::new()
    // Data products
    .route(
      "/data_products",
      get(data_products::list::<C>).post(data_products::create::<C>),
    )
    .route(
      "/data_products/{id}",
      get(data_products::get_one::<C>)
        .put(data_products::update::<C>)
        .delete(data_products::delete_one::<C>),
    )
    .route("/data_products/{id}/hard", delete(data_products::hard_delete::<C>))
    .route(
      "/data_products/{id}/persistence",
      post(data_products::activate_persistence::<C>)
        .delete(data_products::suspend_persistence::<C>),
    )
    .route("/data_products/{id}/versions", post(versions::create::<C>))
    .route("/data_products/{id}/lifecycle", post(data_products::lifecycle::<C>))
    .route("/data_products/{id}/last_update", get(data_products::last_update::<C>))
    // Versions
    .route(
      "/data_product_versions/{id}",
      get(versions::get_one::<C>)
        .put(versions::update::<C>)
        .delete(versions::delete_one::<C>),
    )
    .with_state(service)
}
