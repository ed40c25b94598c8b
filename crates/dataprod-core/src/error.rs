//! Error types for `dataprod-core`.

use thiserror::Error;

/// Boxed error raised by an external collaborator.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Caller-facing kinds a collaborator failure can map onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  NotFound,
  BadRequest,
  Conflict,
}

/// Error type of a collaborator. Errors that report a [`ErrorKind`] surface
/// as that kind; everything else becomes [`Error::Collaborator`].
pub trait CollaboratorError: std::error::Error + Send + Sync + 'static {
  fn kind(&self) -> Option<ErrorKind> { None }
}

#[derive(Debug, Error)]
pub enum Error {
  /// An entity or a required association is absent.
  #[error("not found: {0}")]
  NotFound(String),

  /// The request is structurally invalid for the current resource graph.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// The caller's revision token is stale.
  #[error("conflict: {0}")]
  Conflict(String),

  /// A collaborator call failed; the collaborator's error is kept as-is.
  #[error("{collaborator} error: {source}")]
  Collaborator {
    collaborator: &'static str,
    #[source]
    source:       BoxError,
  },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub fn not_found(msg: impl Into<String>) -> Self { Self::NotFound(msg.into()) }

  pub fn bad_request(msg: impl Into<String>) -> Self { Self::BadRequest(msg.into()) }

  /// Wrap a collaborator failure. Errors that already are this crate's
  /// [`Error`] pass through untouched; classified errors keep their kind.
  pub(crate) fn collaborator<E: CollaboratorError>(collaborator: &'static str, e: E) -> Self {
    let kind = e.kind();
    let boxed: BoxError = Box::new(e);
    let source = match boxed.downcast::<Error>() {
      Ok(inner) => return *inner,
      Err(source) => source,
    };
    match kind {
      Some(ErrorKind::NotFound) => Self::NotFound(source.to_string()),
      Some(ErrorKind::BadRequest) => Self::BadRequest(source.to_string()),
      Some(ErrorKind::Conflict) => Self::Conflict(source.to_string()),
      None => Self::Collaborator { collaborator, source },
    }
  }

  pub(crate) fn registry<E: CollaboratorError>(e: E) -> Self {
    Self::collaborator("resource registry", e)
  }

  pub(crate) fn streams<E: CollaboratorError>(e: E) -> Self {
    Self::collaborator("stream registry", e)
  }

  pub(crate) fn ingestion<E: CollaboratorError>(e: E) -> Self {
    Self::collaborator("ingestion controller", e)
  }

  pub(crate) fn acquisition<E: CollaboratorError>(e: E) -> Self {
    Self::collaborator("data acquisition controller", e)
  }

  pub(crate) fn datastore<E: CollaboratorError>(e: E) -> Self {
    Self::collaborator("datastore", e)
  }

  pub fn is_not_found(&self) -> bool { matches!(self, Self::NotFound(_)) }

  pub fn is_bad_request(&self) -> bool { matches!(self, Self::BadRequest(_)) }

  pub fn is_conflict(&self) -> bool { matches!(self, Self::Conflict(_)) }
}

impl CollaboratorError for Error {
  fn kind(&self) -> Option<ErrorKind> {
    match self {
      Self::NotFound(_) => Some(ErrorKind::NotFound),
      Self::BadRequest(_) => Some(ErrorKind::BadRequest),
      Self::Conflict(_) => Some(ErrorKind::Conflict),
      Self::Collaborator { .. } | Self::Serialization(_) => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
  use super::*;

  #[derive(Debug, thiserror::Error)]
  enum BackendError {
    #[error("row {0} missing")]
    Missing(u32),
    #[error("disk on fire")]
    Io,
  }

  impl CollaboratorError for BackendError {
    fn kind(&self) -> Option<ErrorKind> {
      match self {
        Self::Missing(_) => Some(ErrorKind::NotFound),
        Self::Io => None,
      }
    }
  }

  #[test]
  fn classified_error_keeps_its_kind() {
    let err = Error::registry(BackendError::Missing(7));
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "not found: row 7 missing");
  }

  #[test]
  fn unclassified_error_is_wrapped() {
    let err = Error::registry(BackendError::Io);
    assert!(matches!(err, Error::Collaborator { collaborator: "resource registry", .. }));
  }

  #[test]
  fn own_errors_pass_through_unchanged() {
    let err = Error::streams(Error::bad_request("nope"));
    assert_eq!(err.to_string(), "bad request: nope");
  }
}
