//! Service behaviour knobs.

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// How to pick one item when a lookup may return several candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
  /// Take the first candidate and ignore the rest.
  #[default]
  First,
  /// More than one candidate is a bad request.
  ExactlyOne,
}

impl SelectionPolicy {
  /// Pick one item out of `candidates`. An empty list is always a bad
  /// request; `what` names the candidates in error messages.
  pub fn select<T: Clone>(&self, candidates: &[T], what: &str) -> Result<T> {
    match (self, candidates) {
      (_, []) => Err(Error::bad_request(format!("no {what} available"))),
      (Self::ExactlyOne, [_, _, ..]) => Err(Error::bad_request(format!(
        "expected exactly one {what}, found {}",
        candidates.len()
      ))),
      (Self::First, [first, rest @ ..]) => {
        if !rest.is_empty() {
          tracing::warn!(
            ignored = rest.len(),
            "multiple {what} found, using the first"
          );
        }
        Ok(first.clone())
      }
      (Self::ExactlyOne, [only]) => Ok(only.clone()),
    }
  }
}

/// Runtime configuration of [`crate::service::DataProductManagementService`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
  /// Which of a product's streams to use when several are attached.
  pub stream_selection:    SelectionPolicy,
  /// Which ingestion configuration to persist with when several exist.
  pub ingestion_selection: SelectionPolicy,
  /// Also remove a product's streams and input/output product edges when it
  /// is deleted. Off by default: deletion is metadata-only.
  pub cascade_delete:      bool,
}
