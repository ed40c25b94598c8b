//! Handlers for `/data_products` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/data_products` | Optional `name`, `lcstate`, `limit`, `offset` |
//! | `POST`   | `/data_products` | Body: [`CreateBody`]; returns 201 + `{"id":...}` |
//! | `GET`    | `/data_products/:id` | 404 if not found |
//! | `PUT`    | `/data_products/:id` | Body: the product with its current `rev` |
//! | `DELETE` | `/data_products/:id` | Unassigns producers, then deletes |
//! | `DELETE` | `/data_products/:id/hard` | Accepted, does nothing |
//! | `POST`   | `/data_products/:id/persistence` | Body: [`PersistenceOptions`] |
//! | `DELETE` | `/data_products/:id/persistence` | Suspends persistence |
//! | `POST`   | `/data_products/:id/lifecycle` | Body: `{"event":"plan"}` |
//! | `GET`    | `/data_products/:id/last_update` | Map of stream id to last update |

use std::sync::Arc;

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use dataprod_core::{
  DataProductManagementService,
  clients::Clients,
  lifecycle::{LifecycleEvent, LifecycleState},
  resource::{DataProduct, ResourceFilter, ResourceId, Revision},
  service::{LastUpdates, PersistenceOptions},
};
use serde::{Deserialize, Serialize};

use crate::{
  error::ApiError,
  extract::{self, Path, Query},
};

type Service<C> = Arc<DataProductManagementService<C>>;

/// `{"id": ...}` returned by the create endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct Created {
  pub id: ResourceId,
}

/// `{"rev": ...}` returned by the update endpoints.
#[derive(Debug, Serialize, Deserialize)]
pub struct Updated {
  pub rev: Revision,
}

/// Put the path id into `body_id`, rejecting a body that names another.
pub(crate) fn bind_id(
  path_id: ResourceId,
  body_id: &mut Option<ResourceId>,
) -> Result<(), ApiError> {
  match body_id {
    Some(id) if *id != path_id => Err(ApiError::BadRequest(format!(
      "body id {id} does not match path id {path_id}"
    ))),
    _ => {
      *body_id = Some(path_id);
      Ok(())
    }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize, Default)]
pub struct ListParams {
  pub name:    Option<String>,
  pub lcstate: Option<LifecycleState>,
  pub limit:   Option<usize>,
  pub offset:  Option<usize>,
}

/// `GET /data_products[?name=...][&lcstate=...][&limit=...][&offset=...]`
pub async fn list<C: Clients>(
  State(service): State<Service<C>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<DataProduct>>, ApiError> {
  let filter = ResourceFilter {
    name:    params.name,
    lcstate: params.lcstate,
    limit:   params.limit,
    offset:  params.offset,
  };
  Ok(Json(service.find_data_products(&filter).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /data_products`.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub data_product:         DataProduct,
  pub stream_definition_id: Option<ResourceId>,
}

/// `POST /data_products` — returns 201 + the new product id.
pub async fn create<C: Clients>(
  State(service): State<Service<C>>,
  extract::Json(body): extract::Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let id = service
    .create_data_product(body.data_product, body.stream_definition_id.as_ref())
    .await?;
  Ok((StatusCode::CREATED, Json(Created { id })))
}

// ─── Read / update / delete ───────────────────────────────────────────────────

/// `GET /data_products/:id`
pub async fn get_one<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
) -> Result<Json<DataProduct>, ApiError> {
  Ok(Json(service.read_data_product(&id).await?))
}

/// `PUT /data_products/:id` — the body must carry the current `rev`.
pub async fn update<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
  extract::Json(mut data_product): extract::Json<DataProduct>,
) -> Result<Json<Updated>, ApiError> {
  bind_id(id, &mut data_product.id)?;
  let rev = service.update_data_product(data_product).await?;
  Ok(Json(Updated { rev }))
}

/// `DELETE /data_products/:id`
pub async fn delete_one<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
) -> Result<StatusCode, ApiError> {
  service.delete_data_product(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /data_products/:id/hard`
pub async fn hard_delete<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
) -> Result<StatusCode, ApiError> {
  service.hard_delete_data_product(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Persistence ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct Persisted {
  pub dataset_id: ResourceId,
}

/// `POST /data_products/:id/persistence` — body: `{}` or
/// `{"persist_data":true,"persist_metadata":false}`.
pub async fn activate_persistence<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
  extract::Json(options): extract::Json<PersistenceOptions>,
) -> Result<Json<Persisted>, ApiError> {
  let dataset_id = service.activate_data_product_persistence(&id, options).await?;
  Ok(Json(Persisted { dataset_id }))
}

/// `DELETE /data_products/:id/persistence`
pub async fn suspend_persistence<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
) -> Result<StatusCode, ApiError> {
  service.suspend_data_product_persistence(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Lifecycle ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LifecycleBody {
  pub event: LifecycleEvent,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LifecycleOutcome {
  pub lcstate: LifecycleState,
}

/// `POST /data_products/:id/lifecycle` — body: `{"event":"plan"}`.
pub async fn lifecycle<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
  extract::Json(body): extract::Json<LifecycleBody>,
) -> Result<Json<LifecycleOutcome>, ApiError> {
  let lcstate = service.execute_data_product_lifecycle(&id, body.event).await?;
  Ok(Json(LifecycleOutcome { lcstate }))
}

// ─── Last update ──────────────────────────────────────────────────────────────

/// `GET /data_products/:id/last_update`
pub async fn last_update<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
) -> Result<Json<LastUpdates>, ApiError> {
  Ok(Json(service.get_last_update(&id).await?))
}
