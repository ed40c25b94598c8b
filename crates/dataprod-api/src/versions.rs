//! Handlers for data product versions.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/data_products/:id/versions` | Body: the version; returns 201 + `{"id":...}` |
//! | `GET`    | `/data_product_versions/:id` | 404 if not found |
//! | `PUT`    | `/data_product_versions/:id` | Body: the version with its current `rev` |
//! | `DELETE` | `/data_product_versions/:id` | Accepted, does nothing |

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
  resource::{DataProductVersion, ResourceId},
};

use crate::{
  data_products::{Created, Updated, bind_id},
  error::ApiError,
  extract::{self, Path},
};

type Service<C> = Arc<DataProductManagementService<C>>;

/// `POST /data_products/:id/versions` — returns 201 + the new version id.
pub async fn create<C: Clients>(
  State(service): State<Service<C>>,
  Path(data_product_id): Path<ResourceId>,
  extract::Json(version): extract::Json<DataProductVersion>,
) -> Result<impl IntoResponse, ApiError> {
  let id = service.create_data_product_version(&data_product_id, version).await?;
  Ok((StatusCode::CREATED, Json(Created { id })))
}

/// `GET /data_product_versions/:id`
pub async fn get_one<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
) -> Result<Json<DataProductVersion>, ApiError> {
  Ok(Json(service.read_data_product_version(&id).await?))
}

/// `PUT /data_product_versions/:id`
pub async fn update<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
  extract::Json(mut version): extract::Json<DataProductVersion>,
) -> Result<Json<Updated>, ApiError> {
  bind_id(id, &mut version.id)?;
  let rev = service.update_data_product_version(version).await?;
  Ok(Json(Updated { rev }))
}

/// `DELETE /data_product_versions/:id`
pub async fn delete_one<C: Clients>(
  State(service): State<Service<C>>,
  Path(id): Path<ResourceId>,
) -> Result<StatusCode, ApiError> {
  service.delete_data_product_version(&id).await?;
  Ok(StatusCode::NO_CONTENT)
}
