//! Agent module: the decision policy that chooses actions.
//!
//! The episode loop only relies on the [`Agent`] trait. [`AnyAgent`] selects
//! one of the bundled reference agents by name.

pub mod scripted;
pub mod traits;

use std::path::Path;

pub use scripted::{ForwardAgent, RandomAgent, RunRecord};
pub use traits::{Agent, PickedAction};

use crate::episode::action::ActionResult;
use crate::episode::Observations;
use crate::error::BenchBotError;

/// Names accepted by [`AnyAgent::from_name`].
pub const KNOWN_AGENTS: &[&str] = &[ForwardAgent::NAME, RandomAgent::NAME];

/// Enum dispatch over the bundled agents.
#[derive(Debug, Clone)]
pub enum AnyAgent {
    Forward(ForwardAgent),
    Random(RandomAgent),
}

impl AnyAgent {
    /// Build the agent registered under `name`.
    pub fn from_name(name: &str) -> Result<Self, BenchBotError> {
        match name {
            ForwardAgent::NAME => Ok(Self::Forward(ForwardAgent::new())),
            RandomAgent::NAME => Ok(Self::Random(RandomAgent::new())),
            _ => Err(BenchBotError::Construction {
                name: name.to_string(),
                known: KNOWN_AGENTS.iter().map(|a| a.to_string()).collect(),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Forward(_) => ForwardAgent::NAME,
            Self::Random(_) => RandomAgent::NAME,
        }
    }
}

impl Agent for AnyAgent {
    fn is_done(&self, result: ActionResult) -> bool {
        match self {
            Self::Forward(a) => a.is_done(result),
            Self::Random(a) => a.is_done(result),
        }
    }

    async fn pick_action(
        &mut self,
        observations: &Observations,
        actions: &[String],
    ) -> anyhow::Result<PickedAction> {
        match self {
            Self::Forward(a) => a.pick_action(observations, actions).await,
            Self::Random(a) => a.pick_action(observations, actions).await,
        }
    }

    fn save_result(&mut self, path: &Path) -> anyhow::Result<()> {
        match self {
            Self::Forward(a) => a.save_result(path),
            Self::Random(a) => a.save_result(path),
        }
    }
}
