//! Lifecycle states and the evaluator that decides transitions.
//!
//! The management service never encodes transition rules itself: it asks an
//! injected [`LifecycleEvaluator`] for the state that follows `(current,
//! event)` and records the answer through the registry.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── State ───────────────────────────────────────────────────────────────────

/// Lifecycle state of a registry resource.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
  #[default]
  Draft,
  Planned,
  Developed,
  Integrated,
  Deployed,
  Active,
  Retired,
  Deleted,
}

impl LifecycleState {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Draft => "DRAFT",
      Self::Planned => "PLANNED",
      Self::Developed => "DEVELOPED",
      Self::Integrated => "INTEGRATED",
      Self::Deployed => "DEPLOYED",
      Self::Active => "ACTIVE",
      Self::Retired => "RETIRED",
      Self::Deleted => "DELETED",
    }
  }
}

impl fmt::Display for LifecycleState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

// ─── Event ───────────────────────────────────────────────────────────────────

/// An event requesting a lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleEvent {
  Plan,
  Develop,
  Integrate,
  Deploy,
  Activate,
  Deactivate,
  Retire,
  Delete,
}

impl fmt::Display for LifecycleEvent {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let s = match self {
      Self::Plan => "plan",
      Self::Develop => "develop",
      Self::Integrate => "integrate",
      Self::Deploy => "deploy",
      Self::Activate => "activate",
      Self::Deactivate => "deactivate",
      Self::Retire => "retire",
      Self::Delete => "delete",
    };
    f.write_str(s)
  }
}

// ─── Evaluator ───────────────────────────────────────────────────────────────

/// Decides which state follows `current` when `event` is applied.
///
/// Returns `None` when the event is not permitted from `current`.
pub trait LifecycleEvaluator: Send + Sync {
  fn next_state(
    &self,
    current: LifecycleState,
    event: LifecycleEvent,
  ) -> Option<LifecycleState>;
}

/// The default development lifecycle:
///
/// ```text
/// DRAFT -plan-> PLANNED -develop-> DEVELOPED -integrate-> INTEGRATED
///   -deploy-> DEPLOYED -activate-> ACTIVE -deactivate-> DEPLOYED
/// ```
///
/// `retire` is accepted from any state that is neither retired nor deleted;
/// `delete` from any state but deleted.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLifecycle;

impl LifecycleEvaluator for StandardLifecycle {
  fn next_state(
    &self,
    current: LifecycleState,
    event: LifecycleEvent,
  ) -> Option<LifecycleState> {
    use LifecycleEvent as E;
    use LifecycleState as S;

    match (current, event) {
      (S::Deleted, _) => None,
      (_, E::Delete) => Some(S::Deleted),
      (S::Retired, _) => None,
      (_, E::Retire) => Some(S::Retired),
      (S::Draft, E::Plan) => Some(S::Planned),
      (S::Planned, E::Develop) => Some(S::Developed),
      (S::Developed, E::Integrate) => Some(S::Integrated),
      (S::Integrated, E::Deploy) => Some(S::Deployed),
      (S::Deployed, E::Activate) => Some(S::Active),
      (S::Active, E::Deactivate) => Some(S::Deployed),
      _ => None,
    }
  }
}
