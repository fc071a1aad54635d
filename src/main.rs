//! BenchBot: drive a robot through a BenchBot supervisor from the command line.
//!
//! - `run`      -- connect and run one episode with a bundled agent
//! - `inspect`  -- connect and print the task, actions and observations

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use benchbot_api::agent::{AnyAgent, KNOWN_AGENTS};
use benchbot_api::config::BenchBotConfig;
use benchbot_api::episode::BenchBot;
use benchbot_api::supervisor::{AnyTransport, HttpTransport, MockSupervisor};

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

/// BenchBot: client-side episode control for a BenchBot supervisor
#[derive(Parser)]
#[command(name = "benchbot", version, about)]
struct Cli {
    /// Path to a JSON configuration file (uses defaults if not provided).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Supervisor address, overriding the configuration file.
    #[arg(long, global = true)]
    supervisor_address: Option<String>,

    /// Use an in-process mock supervisor instead of a live one.
    #[arg(long, global = true, default_value_t = false)]
    mock: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the supervisor and run one episode.
    Run {
        /// Which bundled agent drives the robot.
        #[arg(long, default_value = "forward")]
        agent: String,

        /// Where the agent writes its result (overrides the configuration).
        #[arg(long)]
        result_location: Option<PathBuf>,
    },

    /// Connect to the supervisor and describe the running task.
    Inspect,
}

// ---------------------------------------------------------------------------
// Entrypoint
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing (reads RUST_LOG env var, defaults to info).
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => BenchBotConfig::load(path)?,
        None => BenchBotConfig::default(),
    };
    config.apply_env_overrides();
    if let Some(address) = &cli.supervisor_address {
        config.supervisor.address = address.clone();
    }

    let transport = create_transport(&config, cli.mock)?;

    match cli.command {
        Commands::Run {
            agent,
            result_location,
        } => {
            if let Some(location) = result_location {
                config.result_location = location;
            }
            cmd_run(config, transport, &agent).await
        }
        Commands::Inspect => cmd_inspect(config, transport).await,
    }
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_run(config: BenchBotConfig, transport: AnyTransport, agent_name: &str) -> Result<()> {
    let agent = AnyAgent::from_name(agent_name)?;
    tracing::info!(
        agent = agent.name(),
        supervisor = %config.supervisor.address,
        "Starting episode"
    );

    let mut bot = BenchBot::connect(agent, transport, config)
        .await
        .context("Failed to start BenchBot session")?;
    let summary = bot.run().await.context("Episode failed")?;

    println!(
        "Episode finished with {} after {} step(s); result saved to {}",
        summary.result,
        summary.steps,
        summary.result_path.display()
    );
    Ok(())
}

async fn cmd_inspect(config: BenchBotConfig, transport: AnyTransport) -> Result<()> {
    // The agent is never asked to act while inspecting.
    let agent = AnyAgent::from_name(KNOWN_AGENTS[0])?;
    let bot = BenchBot::connect(agent, transport, config)
        .await
        .context("Failed to start BenchBot session")?;

    let task = bot.task_details().await?;
    println!("Supervisor: {}", bot.supervisor().address());
    println!("Task:");
    println!("  type: {}", task.task_type);
    println!(
        "  control_mode: {}",
        task.control_mode.as_deref().unwrap_or("-")
    );
    println!(
        "  localisation_mode: {}",
        task.localisation_mode.as_deref().unwrap_or("-")
    );
    println!();

    let actions = bot.actions().await?;
    if actions.is_empty() {
        println!("Actions: none (collided or finished)");
    } else {
        println!("Actions: {}", actions.join(", "));
    }

    println!("Observations:");
    for key in bot.observations().await? {
        let marker = if bot.callbacks().has_callback(&key) {
            " (post-processed)"
        } else {
            ""
        };
        println!("  {key}{marker}");
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Transport construction
// ---------------------------------------------------------------------------

fn create_transport(config: &BenchBotConfig, mock: bool) -> Result<AnyTransport> {
    if mock {
        tracing::info!("Using mock supervisor");
        return Ok(AnyTransport::Mock(MockSupervisor::demo()));
    }
    tracing::info!(address = %config.supervisor.address, "Using live supervisor");
    let http = HttpTransport::new(config.supervisor.request_timeout())?;
    Ok(AnyTransport::Http(http))
}
