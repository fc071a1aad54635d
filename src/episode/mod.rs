//! Episode control: actions, observation callbacks and the [`BenchBot`]
//! client that runs the connect / reset / step loop.

pub mod action;
pub mod callbacks;
pub mod client;
pub mod task;

pub use action::{validate, ActionArgs, ActionResult, VALID_ACTIONS};
pub use callbacks::{CallbackTable, ObservationCallbacks, ObservationTransform};
pub use client::{BenchBot, EpisodePhase, EpisodeSummary};
pub use task::TaskDetails;

/// Post-processed observations keyed by observation name, in the order the
/// supervisor lists them.
pub type Observations = serde_json::Map<String, serde_json::Value>;
