//! The decision-policy interface the episode loop drives.

use std::path::Path;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::episode::action::{ActionArgs, ActionResult};
use crate::episode::Observations;

/// An action chosen by an agent, with its keyword arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickedAction {
    pub action: String,
    #[serde(default)]
    pub args: ActionArgs,
}

impl PickedAction {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            args: ActionArgs::new(),
        }
    }

    pub fn with_arg(mut self, name: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.args.insert(name.into(), value.into());
        self
    }
}

/// The capabilities an agent must provide to be driven by
/// [`crate::episode::BenchBot::run`].
#[allow(async_fn_in_trait)]
pub trait Agent: Send {
    /// Whether `result` ends the episode. Defaults to any terminal result.
    fn is_done(&self, result: ActionResult) -> bool {
        result.is_terminal()
    }

    /// Choose the next action given the latest observations and the actions
    /// currently available.
    async fn pick_action(
        &mut self,
        observations: &Observations,
        actions: &[String],
    ) -> Result<PickedAction>;

    /// Persist the agent's result to `path` once the episode is over.
    fn save_result(&mut self, path: &Path) -> Result<()>;
}
