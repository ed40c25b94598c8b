//! Error type for `dataprod-store-sqlite`.

use dataprod_core::{
  error::{CollaboratorError, ErrorKind},
  resource::{AssociationId, ResourceId, ResourceType, Revision},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A stored column holds a value no domain type maps to.
  #[error("cannot decode {column}: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("resource not found: {0}")]
  ResourceNotFound(ResourceId),

  #[error("association not found: {0}")]
  AssociationNotFound(AssociationId),

  /// Update or create was handed a resource without the id/revision it
  /// needs.
  #[error("resource is missing its {0}")]
  MissingIdentity(&'static str),

  /// The caller's revision token is not the stored one.
  #[error("revision conflict on {id}: expected {expected}, stored {actual}")]
  RevisionConflict {
    id:       ResourceId,
    expected: Revision,
    actual:   Revision,
  },

  #[error("resource {id} is a {stored}, not a {given}")]
  TypeMismatch {
    id:     ResourceId,
    stored: ResourceType,
    given:  ResourceType,
  },
}

impl CollaboratorError for Error {
  fn kind(&self) -> Option<ErrorKind> {
    match self {
      Self::ResourceNotFound(_) | Self::AssociationNotFound(_) => Some(ErrorKind::NotFound),
      Self::MissingIdentity(_) | Self::TypeMismatch { .. } => Some(ErrorKind::BadRequest),
      Self::RevisionConflict { .. } => Some(ErrorKind::Conflict),
      Self::Database(_) | Self::Json(_) | Self::Decode { .. } => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
