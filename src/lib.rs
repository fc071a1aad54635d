//! BenchBot API: client-side episode control for robots behind a BenchBot
//! supervisor.
//!
//! The [`episode::BenchBot`] client abstracts away whether the robot is real
//! or simulated: it connects to the supervisor, waits for the robot to be
//! ready, and then alternates agent-chosen actions with observation snapshots
//! until the episode ends.

pub mod agent;
pub mod config;
pub mod episode;
pub mod error;
pub mod notice;
pub mod supervisor;

pub use agent::{Agent, PickedAction};
pub use config::BenchBotConfig;
pub use episode::{ActionResult, BenchBot, Observations};
pub use error::{BenchBotError, Result};
