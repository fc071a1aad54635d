//! The BenchBot client: drives a robot through the supervisor.
//!
//! [`BenchBot`] drives episodes by repeatedly:
//!   1. asking the agent for an action given the latest observations,
//!   2. validating and sending the action,
//!   3. deriving the [`ActionResult`] from the collision and finished flags,
//!   4. fetching a fresh observation snapshot.
//!
//! The loop stops once the agent considers the result terminal, and the agent
//! then saves its result artifact.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info};

use super::action::{self, ActionArgs, ActionResult};
use super::callbacks::{CallbackTable, ObservationCallbacks};
use super::task::TaskDetails;
use super::Observations;
use crate::agent::Agent;
use crate::config::BenchBotConfig;
use crate::error::{BenchBotError, Result};
use crate::notice::{Notice, NoticeSink, StdoutNotices};
use crate::supervisor::connection;
use crate::supervisor::{RouteType, Supervisor, Transport};

/// Where the run loop is within an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EpisodePhase {
    /// No initial snapshot has been taken yet.
    AwaitingReset,
    /// The robot has been reset and actions are being taken.
    Stepping,
    /// A terminal result was reached and the result has been saved.
    Done,
}

/// What [`BenchBot::run`] reports once an episode is over.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    /// Number of actions sent after the reset.
    pub steps: usize,
    /// The result that ended the episode.
    pub result: ActionResult,
    /// Where the agent saved its result.
    pub result_path: PathBuf,
}

/// Client-side controller for one supervisor session.
pub struct BenchBot<A, T> {
    agent: A,
    supervisor: Supervisor<T>,
    config: BenchBotConfig,
    table: CallbackTable,
    callbacks: ObservationCallbacks,
    notices: Box<dyn NoticeSink>,
    phase: EpisodePhase,
}

impl<A: Agent, T: Transport> BenchBot<A, T> {
    /// Create an unconnected client. Call [`BenchBot::start`] before running
    /// episodes, or use [`BenchBot::connect`].
    pub fn new(agent: A, transport: T, config: BenchBotConfig) -> Self {
        let supervisor = Supervisor::new(config.supervisor.address.clone(), transport);
        Self {
            agent,
            supervisor,
            config,
            table: CallbackTable::builtin(),
            callbacks: ObservationCallbacks::default(),
            notices: Box::new(StdoutNotices),
            phase: EpisodePhase::AwaitingReset,
        }
    }

    /// Create a client and run the startup handshake.
    pub async fn connect(agent: A, transport: T, config: BenchBotConfig) -> Result<Self> {
        let mut bot = Self::new(agent, transport, config);
        bot.start().await?;
        Ok(bot)
    }

    /// Route progress notices to `sink` instead of stdout.
    pub fn with_notices(mut self, sink: impl NoticeSink + 'static) -> Self {
        self.notices = Box::new(sink);
        self
    }

    /// Resolve `callback_api` names against `table` instead of the built-ins.
    pub fn with_callback_table(mut self, table: CallbackTable) -> Self {
        self.table = table;
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn agent(&self) -> &A {
        &self.agent
    }

    pub fn supervisor(&self) -> &Supervisor<T> {
        &self.supervisor
    }

    pub fn config(&self) -> &BenchBotConfig {
        &self.config
    }

    pub fn callbacks(&self) -> &ObservationCallbacks {
        &self.callbacks
    }

    pub fn phase(&self) -> EpisodePhase {
        self.phase
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Connect to the supervisor, wait for the simulator and resolve the
    /// observation callbacks declared by the robot configuration.
    pub async fn start(&mut self) -> Result<()> {
        self.callbacks = connection::establish(
            &self.supervisor,
            &self.table,
            &self.config.connection,
            self.notices.as_mut(),
        )
        .await?;
        Ok(())
    }

    /// The actions the robot can take right now: empty once it has collided
    /// or finished, otherwise the supervisor's declared list. Queried live on
    /// every call.
    pub async fn actions(&self) -> Result<Vec<String>> {
        if self.current_result().await?.is_terminal() {
            return Ok(Vec::new());
        }
        self.supervisor.string_list("actions", RouteType::Config).await
    }

    /// The observation keys the robot reports.
    pub async fn observations(&self) -> Result<Vec<String>> {
        self.supervisor
            .string_list("observations", RouteType::Config)
            .await
    }

    pub async fn task_details(&self) -> Result<TaskDetails> {
        let name = self.supervisor.string("task_name", RouteType::Config).await?;
        Ok(TaskDetails::parse(&name))
    }

    /// The path the agent saves its result to. Its directory is created if
    /// missing.
    pub fn result_filename(&self) -> Result<PathBuf> {
        let path = &self.config.result_location;
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| BenchBotError::ResultLocation {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        Ok(path.clone())
    }

    // ------------------------------------------------------------------
    // Episode
    // ------------------------------------------------------------------

    /// Restart the simulator if it is dirty, then take the initial snapshot.
    pub async fn reset(&mut self) -> Result<(Observations, ActionResult)> {
        if self.supervisor.flag("is_dirty", RouteType::Simulator).await? {
            self.notices.notify(Notice::ResetStarted);
            self.supervisor
                .command("restart", RouteType::Simulator)
                .await?;
            self.notices.notify(Notice::ResetComplete);
            info!("restarted dirty simulator");
        }

        let snapshot = self.step(None, &ActionArgs::new()).await?;
        self.phase = EpisodePhase::Stepping;
        Ok(snapshot)
    }

    /// Perform `action` with `args` and return the observations and result
    /// afterwards, whatever the result. `None` only takes a snapshot.
    ///
    /// Malformed actions are rejected before anything is sent.
    pub async fn step(
        &mut self,
        action: Option<&str>,
        args: &ActionArgs,
    ) -> Result<(Observations, ActionResult)> {
        if let Some(action) = action {
            action::validate(action, args)?;

            self.notices.notify(Notice::SendingAction {
                action: action.to_string(),
                args: args.clone(),
            });
            let body = Value::Object(args.clone());
            info!(action, args = %body, "sending action");
            self.supervisor
                .send(action, &body, RouteType::Connection)
                .await?;
        }

        let result = self.current_result().await?;
        let observations = self.fetch_observations().await?;

        debug!(
            result = %result,
            observations = observations.len(),
            "step complete"
        );
        Ok((observations, result))
    }

    /// Run one episode with the agent: reset, step until the agent considers
    /// the result terminal, then have the agent save its result.
    pub async fn run(&mut self) -> Result<EpisodeSummary> {
        self.phase = EpisodePhase::AwaitingReset;
        let (mut observations, mut result) = self.reset().await?;

        let mut steps = 0usize;
        while !self.agent.is_done(result) {
            let actions = self.actions().await?;
            let picked = self
                .agent
                .pick_action(&observations, &actions)
                .await
                .map_err(BenchBotError::Agent)?;
            (observations, result) = self.step(Some(&picked.action), &picked.args).await?;
            steps += 1;
        }
        self.phase = EpisodePhase::Done;

        let result_path = self.result_filename()?;
        self.agent
            .save_result(&result_path)
            .map_err(BenchBotError::Agent)?;

        info!(
            steps,
            result = %result,
            path = %result_path.display(),
            "episode finished"
        );
        Ok(EpisodeSummary {
            steps,
            result,
            result_path,
        })
    }

    // -- internal helpers ---------------------------------------------------

    /// Collision is checked first; the finished flag is only read when the
    /// robot has not collided.
    async fn current_result(&self) -> Result<ActionResult> {
        if self.supervisor.flag("is_collided", RouteType::Simulator).await? {
            return Ok(ActionResult::Collision);
        }
        let finished = self.supervisor.flag("is_finished", RouteType::Status).await?;
        Ok(ActionResult::from_flags(false, finished))
    }

    /// One request per observation key, in the order the supervisor lists
    /// them.
    async fn fetch_observations(&self) -> Result<Observations> {
        let keys = self.observations().await?;
        let mut observations = Observations::new();
        for key in keys {
            let raw = self.supervisor.receive(&key, RouteType::Connection).await?;
            let value = self.callbacks.apply(&key, raw);
            observations.insert(key, value);
        }
        Ok(observations)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::PickedAction;
    use crate::notice::RecordedNotices;
    use crate::supervisor::mock::{MockSupervisor, RecordedRequest, RequestKind};
    use serde_json::json;
    use std::path::Path;

    /// An agent that always moves next and counts what it is asked to do.
    #[derive(Default)]
    struct CountingAgent {
        picks: usize,
        saves: Vec<PathBuf>,
        offered: Vec<Vec<String>>,
        fail_pick: bool,
    }

    impl Agent for CountingAgent {
        async fn pick_action(
            &mut self,
            _observations: &Observations,
            actions: &[String],
        ) -> anyhow::Result<PickedAction> {
            if self.fail_pick {
                anyhow::bail!("no idea what to do");
            }
            self.picks += 1;
            self.offered.push(actions.to_vec());
            Ok(PickedAction::new("move_next"))
        }

        fn save_result(&mut self, path: &Path) -> anyhow::Result<()> {
            self.saves.push(path.to_path_buf());
            Ok(())
        }
    }

    struct Harness {
        bot: BenchBot<CountingAgent, MockSupervisor>,
        mock: MockSupervisor,
        notices: RecordedNotices,
        _dir: tempfile::TempDir,
    }

    fn harness(mock: MockSupervisor) -> Harness {
        harness_with(mock, CountingAgent::default())
    }

    fn harness_with(mock: MockSupervisor, agent: CountingAgent) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let mut config = BenchBotConfig::default();
        config.supervisor.address = "http://benchbot_supervisor:10000".into();
        config.connection.poll_interval_ms = 1;
        config.result_location = dir.path().join("results").join("benchbot_result");
        let notices = RecordedNotices::new();
        let bot = BenchBot::new(agent, mock.clone(), config).with_notices(notices.clone());
        Harness {
            bot,
            mock,
            notices,
            _dir: dir,
        }
    }

    fn observed_mock() -> MockSupervisor {
        MockSupervisor::new()
            .with_observation("image_rgb", json!("raw-pixels"))
            .with_observation(
                "laser",
                json!({ "ranges": [1.0, 2.0], "angle_min": 0.0, "angle_increment": 0.5 }),
            )
            .with_callback("laser", "api_callbacks.convert_to_laserscan")
    }

    fn paths(requests: &[RecordedRequest]) -> Vec<(RequestKind, &str)> {
        requests.iter().map(|r| (r.kind, r.path.as_str())).collect()
    }

    #[tokio::test]
    async fn step_exchanges_requests_in_order() {
        let mut h = harness(observed_mock());

        let (observations, result) = h
            .bot
            .step(Some("move_next"), &ActionArgs::new())
            .await
            .unwrap();

        assert_eq!(result, ActionResult::Success);
        assert_eq!(observations.len(), 2);
        let requests = h.mock.requests();
        assert_eq!(
            paths(&requests),
            vec![
                (RequestKind::Send, "/connections/move_next"),
                (RequestKind::Fetch, "/simulator/is_collided"),
                (RequestKind::Fetch, "/status/is_finished"),
                (RequestKind::Fetch, "/config/observations"),
                (RequestKind::Fetch, "/connections/image_rgb"),
                (RequestKind::Fetch, "/connections/laser"),
            ]
        );
        assert_eq!(requests[0].payload, Some(json!({})));
        assert_eq!(
            h.notices.notices(),
            vec![Notice::SendingAction {
                action: "move_next".into(),
                args: ActionArgs::new(),
            }]
        );
    }

    #[tokio::test]
    async fn step_sends_arguments_as_body() {
        let mut h = harness(MockSupervisor::new());
        let mut args = ActionArgs::new();
        args.insert("distance".into(), json!(1.5));

        h.bot.step(Some("move_distance"), &args).await.unwrap();

        let requests = h.mock.requests();
        assert!(requests[0].is(RequestKind::Send, "/connections/move_distance"));
        assert_eq!(requests[0].payload, Some(json!({ "distance": 1.5 })));
    }

    #[tokio::test]
    async fn invalid_actions_are_never_sent() {
        let mut h = harness(MockSupervisor::new());
        let mut wrong = ActionArgs::new();
        wrong.insert("angle".into(), json!(1.0));

        let err = h.bot.step(Some("teleport"), &ActionArgs::new()).await.unwrap_err();
        assert!(matches!(err, BenchBotError::InvalidAction { .. }));
        let err = h.bot.step(Some("move_distance"), &ActionArgs::new()).await.unwrap_err();
        assert!(matches!(err, BenchBotError::ArgumentCountMismatch { .. }));
        let err = h.bot.step(Some("move_distance"), &wrong).await.unwrap_err();
        assert!(matches!(err, BenchBotError::InvalidArgumentName { .. }));

        assert!(h.mock.requests().is_empty());
        assert!(h.notices.notices().is_empty());
    }

    #[tokio::test]
    async fn collision_takes_precedence_over_finished() {
        let mock = MockSupervisor::new();
        mock.set_collided(true);
        mock.set_finished(true);
        let mut h = harness(mock);

        let (_, result) = h.bot.step(None, &ActionArgs::new()).await.unwrap();

        assert_eq!(result, ActionResult::Collision);
        assert!(!h
            .mock
            .requests()
            .iter()
            .any(|r| r.is(RequestKind::Fetch, "/status/is_finished")));
    }

    #[tokio::test]
    async fn observations_are_fetched_even_when_terminal() {
        let mock = observed_mock();
        mock.set_finished(true);
        let mut h = harness(mock);

        let (observations, result) = h.bot.step(None, &ActionArgs::new()).await.unwrap();

        assert_eq!(result, ActionResult::Finished);
        assert_eq!(observations["image_rgb"], json!("raw-pixels"));
    }

    #[tokio::test]
    async fn callbacks_apply_after_start() {
        let mut h = harness(observed_mock());
        h.bot.start().await.unwrap();

        let (observations, _) = h.bot.step(None, &ActionArgs::new()).await.unwrap();

        assert_eq!(observations["image_rgb"], json!("raw-pixels"));
        assert_eq!(
            observations["laser"],
            crate::episode::callbacks::convert_to_laserscan(json!({
                "ranges": [1.0, 2.0], "angle_min": 0.0, "angle_increment": 0.5
            }))
        );
    }

    #[tokio::test]
    async fn actions_track_live_flags() {
        let h = harness(MockSupervisor::new());

        assert_eq!(
            h.bot.actions().await.unwrap(),
            vec!["move_next", "move_distance", "move_angle"]
        );
        h.mock.set_finished(true);
        assert!(h.bot.actions().await.unwrap().is_empty());
        h.mock.set_finished(false);
        h.mock.set_collided(true);
        assert!(h.bot.actions().await.unwrap().is_empty());
        h.mock.set_collided(false);
        assert_eq!(h.bot.actions().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn dirty_reset_restarts_before_snapshot() {
        let mock = observed_mock();
        mock.set_dirty(true);
        let mut h = harness(mock);

        let (observations, result) = h.bot.reset().await.unwrap();

        assert_eq!(result, ActionResult::Success);
        assert_eq!(observations.len(), 2);
        assert_eq!(h.mock.restarts(), 1);
        assert_eq!(h.bot.phase(), EpisodePhase::Stepping);
        assert_eq!(
            h.notices.notices(),
            vec![Notice::ResetStarted, Notice::ResetComplete]
        );
        let requests = h.mock.requests();
        assert!(requests[0].is(RequestKind::Fetch, "/simulator/is_dirty"));
        assert!(requests[1].is(RequestKind::Fetch, "/simulator/restart"));
        assert!(!requests.iter().any(|r| r.kind == RequestKind::Send));
    }

    #[tokio::test]
    async fn clean_reset_skips_restart() {
        let mut h = harness(MockSupervisor::new());
        h.bot.reset().await.unwrap();
        assert_eq!(h.mock.restarts(), 0);
        assert!(h.notices.notices().is_empty());
    }

    #[tokio::test]
    async fn run_stops_and_saves_once_finished() {
        let mut h = harness(observed_mock().finish_after(1));

        let summary = h.bot.run().await.unwrap();

        assert_eq!(summary.steps, 1);
        assert_eq!(summary.result, ActionResult::Finished);
        assert_eq!(h.mock.actions_taken(), 1);
        assert_eq!(h.bot.agent().picks, 1);
        assert_eq!(h.bot.agent().saves, vec![summary.result_path.clone()]);
        assert!(summary.result_path.parent().unwrap().is_dir());
        assert_eq!(h.bot.phase(), EpisodePhase::Done);

        let sends = h
            .mock
            .requests()
            .iter()
            .filter(|r| r.kind == RequestKind::Send)
            .count();
        assert_eq!(sends, 1);
    }

    #[tokio::test]
    async fn run_ends_on_collision() {
        let mut h = harness(MockSupervisor::new().collide_after(3));

        let summary = h.bot.run().await.unwrap();

        assert_eq!(summary.steps, 3);
        assert_eq!(summary.result, ActionResult::Collision);
        assert_eq!(h.bot.agent().saves.len(), 1);
        assert!(h.bot.agent().offered.iter().all(|a| a.len() == 3));
    }

    #[tokio::test]
    async fn run_on_already_finished_episode_takes_no_steps() {
        let mock = MockSupervisor::new();
        mock.set_finished(true);
        let mut h = harness(mock);

        let summary = h.bot.run().await.unwrap();

        assert_eq!(summary.steps, 0);
        assert_eq!(h.bot.agent().picks, 0);
        assert_eq!(h.bot.agent().saves.len(), 1);
    }

    #[tokio::test]
    async fn agent_failure_propagates() {
        let agent = CountingAgent {
            fail_pick: true,
            ..CountingAgent::default()
        };
        let mut h = harness_with(MockSupervisor::new(), agent);

        let err = h.bot.run().await.unwrap_err();

        assert!(matches!(err, BenchBotError::Agent(_)));
        assert!(h.bot.agent().saves.is_empty());
        assert_eq!(h.bot.phase(), EpisodePhase::Stepping);
    }

    #[tokio::test]
    async fn transport_failure_mid_step_is_surfaced() {
        let mut h = harness(MockSupervisor::new().fail_route("/status/is_finished", 500));

        let err = h.bot.step(Some("move_next"), &ActionArgs::new()).await.unwrap_err();

        assert!(matches!(err, BenchBotError::UnexpectedResponse { status: 500, .. }));
    }

    #[tokio::test]
    async fn task_details_and_observation_keys() {
        let h = harness(observed_mock().with_task_name("scd:active:dead_reckoning"));

        let details = h.bot.task_details().await.unwrap();
        assert_eq!(details.task_type, "scd");
        assert_eq!(details.localisation_mode.as_deref(), Some("dead_reckoning"));
        assert_eq!(h.bot.observations().await.unwrap(), vec!["image_rgb", "laser"]);
    }

    #[tokio::test]
    async fn connect_fails_with_configured_address() {
        let mut config = BenchBotConfig::default();
        config.supervisor.address = "http://nowhere:10000/".into();

        let result = BenchBot::connect(
            CountingAgent::default(),
            MockSupervisor::new().unreachable(),
            config,
        )
        .await;

        match result {
            Err(BenchBotError::ConnectionFailure { address, .. }) => {
                assert_eq!(address, "http://nowhere:10000/")
            }
            Err(other) => panic!("expected ConnectionFailure, got {other:?}"),
            Ok(_) => panic!("expected ConnectionFailure, got a connected client"),
        }
    }

    #[tokio::test]
    async fn custom_callback_table_drives_step() {
        fn double(raw: Value) -> Value {
            json!(raw.as_f64().unwrap_or_default() * 2.0)
        }
        let mut table = CallbackTable::empty();
        table.register("custom.double", double);
        let mock = MockSupervisor::new()
            .with_observation("speed", json!(1.25))
            .with_observation("image_rgb", json!("raw-pixels"))
            .with_callback("speed", "custom.double");
        let h = harness(mock);
        let mut bot = h.bot.with_callback_table(table);

        bot.start().await.unwrap();
        assert!(bot.callbacks().has_callback("speed"));
        assert!(!bot.callbacks().has_callback("image_rgb"));
        h.mock.clear_requests();

        let (observations, _) = bot.step(Some("move_next"), &ActionArgs::new()).await.unwrap();

        assert_eq!(observations["speed"], json!(2.5));
        assert_eq!(observations["image_rgb"], json!("raw-pixels"));
        let requests = h.mock.requests();
        assert!(requests[0].is(RequestKind::Send, "/connections/move_next"));
        assert!(!requests.iter().any(|r| r.path.starts_with("/config/robot")));
    }

    #[tokio::test]
    async fn builtin_table_rejects_custom_callback_names() {
        let mock = MockSupervisor::new()
            .with_observation("speed", json!(1.25))
            .with_callback("speed", "custom.double");
        let mut h = harness(mock);

        let err = h.bot.start().await.unwrap_err();

        assert!(matches!(err, BenchBotError::UnknownCallback { .. }));
    }

    #[tokio::test]
    async fn observations_keep_supervisor_order() {
        let mock = MockSupervisor::new()
            .with_observation("zeta", json!(1))
            .with_observation("alpha", json!(2))
            .with_observation("mid", json!(3));
        let mut h = harness(mock);

        let (observations, _) = h.bot.step(None, &ActionArgs::new()).await.unwrap();

        let keys: Vec<&str> = observations.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);
    }

    #[test]
    fn result_filename_creates_directory() {
        let h = harness(MockSupervisor::new());
        let path = h.bot.result_filename().unwrap();
        assert_eq!(path, h.bot.config().result_location);
        assert!(path.parent().unwrap().is_dir());
        // Idempotent.
        assert_eq!(h.bot.result_filename().unwrap(), path);
    }
}
