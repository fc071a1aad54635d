//! Startup handshake with the supervisor.
//!
//! 1. Probe the supervisor root once. An unreachable supervisor is fatal.
//! 2. Poll `simulator/is_running` until the simulated (or real) robot is up.
//! 3. Resolve the observation callbacks declared by `config/robot`.

use tokio::time::Instant;
use tracing::{debug, info};

use super::client::Supervisor;
use super::route::RouteType;
use super::transport::Transport;
use crate::config::ConnectionConfig;
use crate::episode::callbacks::{CallbackTable, ObservationCallbacks};
use crate::error::{BenchBotError, Result};
use crate::notice::{Notice, NoticeSink};

/// Run the startup handshake and return the resolved observation callbacks.
///
/// Without a `readiness_timeout` the readiness poll blocks until the simulator
/// reports it is running.
pub async fn establish<T: Transport>(
    supervisor: &Supervisor<T>,
    table: &CallbackTable,
    config: &ConnectionConfig,
    notices: &mut dyn NoticeSink,
) -> Result<ObservationCallbacks> {
    notices.notify(Notice::AwaitingSupervisor);
    match supervisor.receive("", RouteType::Explicit).await {
        Ok(_) => {}
        Err(BenchBotError::ConnectionFailure { reason, .. }) => {
            return Err(BenchBotError::connection(
                supervisor.address(),
                format!("could not find a BenchBot supervisor, are you sure it is available? ({reason})"),
            ));
        }
        Err(e) => return Err(e),
    }
    notices.notify(Notice::SupervisorConnected);
    info!(address = supervisor.address(), "connected to supervisor");

    notices.notify(Notice::AwaitingSimulator);
    wait_until_running(supervisor, config).await?;
    notices.notify(Notice::SimulatorRunning);

    let robot = supervisor.receive("robot", RouteType::Config).await?;
    let callbacks = ObservationCallbacks::from_robot_config(&robot, table)?;
    info!(connections = callbacks.len(), "resolved robot connection callbacks");
    Ok(callbacks)
}

async fn wait_until_running<T: Transport>(
    supervisor: &Supervisor<T>,
    config: &ConnectionConfig,
) -> Result<()> {
    let started = Instant::now();
    let limit = config.readiness_timeout();
    let mut polls: u64 = 0;

    while !supervisor.flag("is_running", RouteType::Simulator).await? {
        polls += 1;
        if let Some(limit) = limit {
            let waited = started.elapsed();
            if waited >= limit {
                return Err(BenchBotError::ReadinessTimeout { waited });
            }
        }
        tokio::time::sleep(config.poll_interval()).await;
    }

    debug!(polls, waited_ms = started.elapsed().as_millis() as u64, "simulator is running");
    Ok(())
}
