//! Small reference agents for exercising a deployment from the command line.
//!
//! Neither agent tries to solve a task: [`ForwardAgent`] follows the robot's
//! pre-planned trajectory with `move_next`, and [`RandomAgent`] wanders. Both
//! write a JSON [`RunRecord`] as their result.

use std::f64::consts::PI;
use std::path::Path;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use super::traits::{Agent, PickedAction};
use crate::episode::Observations;

// ---------------------------------------------------------------------------
// Run record
// ---------------------------------------------------------------------------

/// The artifact written by the reference agents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    /// Unique identifier (UUID v4).
    pub run_id: String,
    pub agent: String,
    pub started_at: DateTime<Utc>,
    pub saved_at: Option<DateTime<Utc>>,
    /// Every action the agent picked, in order.
    pub actions: Vec<PickedAction>,
    /// Observation keys present in the last snapshot the agent saw.
    pub observed: Vec<String>,
}

impl RunRecord {
    fn new(agent: &str) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            agent: agent.to_string(),
            started_at: Utc::now(),
            saved_at: None,
            actions: Vec::new(),
            observed: Vec::new(),
        }
    }

    fn note(&mut self, observations: &Observations, picked: &PickedAction) {
        self.observed = observations.keys().cloned().collect();
        self.actions.push(picked.clone());
    }

    fn save(&mut self, path: &Path) -> Result<()> {
        self.saved_at = Some(Utc::now());
        let json = serde_json::to_string_pretty(self).context("Failed to serialize run record")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write result to {}", path.display()))?;
        info!(
            path = %path.display(),
            agent = %self.agent,
            actions = self.actions.len(),
            "Saved run record"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Forward agent
// ---------------------------------------------------------------------------

/// Always takes `move_next`.
#[derive(Debug, Clone)]
pub struct ForwardAgent {
    record: RunRecord,
}

impl ForwardAgent {
    pub const NAME: &'static str = "forward";

    pub fn new() -> Self {
        Self {
            record: RunRecord::new(Self::NAME),
        }
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }
}

impl Default for ForwardAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for ForwardAgent {
    async fn pick_action(
        &mut self,
        observations: &Observations,
        actions: &[String],
    ) -> Result<PickedAction> {
        if !actions.iter().any(|a| a == "move_next") {
            bail!("move_next is not available (available: {actions:?})");
        }
        let picked = PickedAction::new("move_next");
        self.record.note(observations, &picked);
        Ok(picked)
    }

    fn save_result(&mut self, path: &Path) -> Result<()> {
        self.record.save(path)
    }
}

// ---------------------------------------------------------------------------
// Random agent
// ---------------------------------------------------------------------------

/// Picks uniformly among the available actions, with a random distance in
/// `[min_distance, max_distance]` metres or a random angle in `[-pi, pi)`.
#[derive(Debug, Clone)]
pub struct RandomAgent {
    rng: StdRng,
    min_distance: f64,
    max_distance: f64,
    record: RunRecord,
}

impl RandomAgent {
    pub const NAME: &'static str = "random";

    pub fn new() -> Self {
        Self::with_rng(StdRng::from_entropy())
    }

    /// A reproducible agent.
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        Self {
            rng,
            min_distance: 0.2,
            max_distance: 1.0,
            record: RunRecord::new(Self::NAME),
        }
    }

    pub fn record(&self) -> &RunRecord {
        &self.record
    }
}

impl Default for RandomAgent {
    fn default() -> Self {
        Self::new()
    }
}

impl Agent for RandomAgent {
    async fn pick_action(
        &mut self,
        observations: &Observations,
        actions: &[String],
    ) -> Result<PickedAction> {
        let Some(action) = actions.choose(&mut self.rng) else {
            bail!("no actions are available");
        };

        let picked = match action.as_str() {
            "move_distance" => PickedAction::new(action.as_str()).with_arg(
                "distance",
                self.rng.gen_range(self.min_distance..=self.max_distance),
            ),
            "move_angle" => {
                PickedAction::new(action.as_str()).with_arg("angle", self.rng.gen_range(-PI..PI))
            }
            other => PickedAction::new(other),
        };
        debug!(action = %picked.action, "random agent picked action");

        self.record.note(observations, &picked);
        Ok(picked)
    }

    fn save_result(&mut self, path: &Path) -> Result<()> {
        self.record.save(path)
    }
}
