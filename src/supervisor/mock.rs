//! An in-process supervisor for tests and dry runs.
//!
//! [`MockSupervisor`] implements [`Transport`] by answering the supervisor's
//! routes from scripted state instead of the network. Every request is
//! recorded in order, so tests can assert on the exact exchange sequence.
//! Clones share state: keep one handle for assertions and hand another to the
//! client.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};

use super::transport::Transport;
use crate::error::{BenchBotError, Result};

/// Whether a recorded request read or wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Fetch,
    Send,
}

/// A single request as seen by the mock.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub kind: RequestKind,
    /// Path relative to the supervisor root, e.g. `/simulator/is_collided`.
    pub path: String,
    pub payload: Option<Value>,
}

impl RecordedRequest {
    pub fn is(&self, kind: RequestKind, path: &str) -> bool {
        self.kind == kind && self.path == path
    }
}

#[derive(Debug)]
struct MockState {
    reachable: bool,
    polls_until_running: usize,
    collided: bool,
    finished: bool,
    dirty: bool,
    finish_after_actions: Option<usize>,
    collide_after_actions: Option<usize>,
    actions_taken: usize,
    restarts: usize,
    actions: Vec<String>,
    observations: Vec<(String, Value)>,
    robot: serde_json::Map<String, Value>,
    task_name: String,
    failing: HashMap<String, u16>,
    log: Vec<RecordedRequest>,
}

/// A scripted supervisor. See the module docs.
#[derive(Debug, Clone)]
pub struct MockSupervisor {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockSupervisor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSupervisor {
    /// A supervisor whose simulator is already running, clean, and never
    /// finishes on its own. It declares the three standard actions and no
    /// observations.
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                reachable: true,
                polls_until_running: 0,
                collided: false,
                finished: false,
                dirty: false,
                finish_after_actions: None,
                collide_after_actions: None,
                actions_taken: 0,
                restarts: 0,
                actions: vec![
                    "move_next".into(),
                    "move_distance".into(),
                    "move_angle".into(),
                ],
                observations: Vec::new(),
                robot: serde_json::Map::new(),
                task_name: "semantic_slam:passive:ground_truth".into(),
                failing: HashMap::new(),
                log: Vec::new(),
            })),
        }
    }

    /// A small simulated deployment used by `benchbot --mock`: a laser
    /// scanner, odometry, and camera intrinsics wired to the built-in
    /// callbacks, finishing after five actions.
    pub fn demo() -> Self {
        Self::new()
            .running_after(3)
            .finish_after(5)
            .with_observation(
                "laser",
                json!({
                    "ranges": [1.0, 1.5, 2.0, 2.5],
                    "angle_min": -0.5,
                    "angle_increment": 0.25,
                    "range_min": 0.1,
                    "range_max": 10.0
                }),
            )
            .with_callback("laser", "api_callbacks.convert_to_laserscan")
            .with_observation(
                "poses",
                json!({
                    "pose": {
                        "position": { "x": 0.0, "y": 0.0, "z": 0.0 },
                        "orientation": { "x": 0.0, "y": 0.0, "z": 0.0, "w": 1.0 }
                    }
                }),
            )
            .with_callback("poses", "api_callbacks.convert_to_pose")
            .with_observation(
                "image_rgb_info",
                json!({
                    "frame_id": "left_camera",
                    "K": [480.0, 0.0, 320.0, 0.0, 480.0, 240.0, 0.0, 0.0, 1.0]
                }),
            )
            .with_callback("image_rgb_info", "api_callbacks.convert_to_camera_intrinsics")
            .with_task_name("semantic_slam:active:ground_truth")
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -- scripting ----------------------------------------------------------

    /// `is_running` reports false for the first `polls` queries.
    pub fn running_after(self, polls: usize) -> Self {
        self.lock().polls_until_running = polls;
        self
    }

    /// `is_finished` turns true once `actions` actions have been received.
    pub fn finish_after(self, actions: usize) -> Self {
        self.lock().finish_after_actions = Some(actions);
        self
    }

    /// `is_collided` turns true once `actions` actions have been received.
    pub fn collide_after(self, actions: usize) -> Self {
        self.lock().collide_after_actions = Some(actions);
        self
    }

    /// Declare an observation and its raw value. Declaration order is the
    /// order reported by `config/observations`.
    pub fn with_observation(self, key: &str, value: Value) -> Self {
        {
            let mut state = self.lock();
            state.observations.retain(|(k, _)| k != key);
            state.observations.push((key.to_string(), value));
            state
                .robot
                .entry(key.to_string())
                .or_insert_with(|| json!({}));
        }
        self
    }

    /// Declare `callback` as the `callback_api` of robot connection `key`.
    pub fn with_callback(self, key: &str, callback: &str) -> Self {
        self.lock()
            .robot
            .insert(key.to_string(), json!({ "callback_api": callback }));
        self
    }

    pub fn with_actions(self, actions: &[&str]) -> Self {
        self.lock().actions = actions.iter().map(|a| a.to_string()).collect();
        self
    }

    pub fn with_task_name(self, task_name: &str) -> Self {
        self.lock().task_name = task_name.to_string();
        self
    }

    /// Answer `path` with `status` instead of its normal response.
    pub fn fail_route(self, path: &str, status: u16) -> Self {
        self.lock().failing.insert(path.to_string(), status);
        self
    }

    /// Refuse every request as if nothing were listening.
    pub fn unreachable(self) -> Self {
        self.lock().reachable = false;
        self
    }

    pub fn set_collided(&self, collided: bool) {
        self.lock().collided = collided;
    }

    pub fn set_finished(&self, finished: bool) {
        self.lock().finished = finished;
    }

    pub fn set_dirty(&self, dirty: bool) {
        self.lock().dirty = dirty;
    }

    // -- inspection ---------------------------------------------------------

    /// Every request received so far, in order.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.lock().log.clone()
    }

    pub fn clear_requests(&self) {
        self.lock().log.clear();
    }

    pub fn actions_taken(&self) -> usize {
        self.lock().actions_taken
    }

    pub fn restarts(&self) -> usize {
        self.lock().restarts
    }

    // -- routing ------------------------------------------------------------

    fn route_path(address: &str) -> Result<String> {
        let url = reqwest::Url::parse(address)
            .map_err(|e| BenchBotError::connection(address, e.to_string()))?;
        Ok(url.path().to_string())
    }

    fn answer_fetch(state: &mut MockState, address: &str, path: &str) -> Result<Value> {
        let value = match path {
            "/" => json!({ "name": "mock_supervisor" }),
            "/simulator/is_running" => {
                let running = state.polls_until_running == 0;
                state.polls_until_running = state.polls_until_running.saturating_sub(1);
                json!({ "is_running": running })
            }
            "/simulator/is_collided" => json!({ "is_collided": state.collided }),
            "/simulator/is_dirty" => json!({ "is_dirty": state.dirty }),
            "/simulator/restart" => {
                state.collided = false;
                state.finished = false;
                state.dirty = false;
                state.actions_taken = 0;
                state.restarts += 1;
                json!({ "restart_success": true })
            }
            "/status/is_finished" => json!({ "is_finished": state.finished }),
            "/config/actions" => json!(state.actions),
            "/config/observations" => {
                let keys: Vec<&str> = state.observations.iter().map(|(k, _)| k.as_str()).collect();
                json!(keys)
            }
            "/config/task_name" => json!(state.task_name),
            "/config/robot" => Value::Object(state.robot.clone()),
            other => {
                let observation = other
                    .strip_prefix("/connections/")
                    .and_then(|key| state.observations.iter().find(|(k, _)| k == key));
                match observation {
                    Some((_, value)) => value.clone(),
                    None => {
                        return Err(BenchBotError::UnexpectedResponse {
                            address: address.to_string(),
                            status: 404,
                        })
                    }
                }
            }
        };
        Ok(value)
    }

    fn answer_send(state: &mut MockState, address: &str, path: &str) -> Result<()> {
        let known = path
            .strip_prefix("/connections/")
            .is_some_and(|action| state.actions.iter().any(|a| a == action));
        if !known {
            return Err(BenchBotError::UnexpectedResponse {
                address: address.to_string(),
                status: 404,
            });
        }

        state.actions_taken += 1;
        state.dirty = true;
        if state
            .collide_after_actions
            .is_some_and(|n| state.actions_taken >= n)
        {
            state.collided = true;
        }
        if state
            .finish_after_actions
            .is_some_and(|n| state.actions_taken >= n)
        {
            state.finished = true;
        }
        Ok(())
    }

    fn record(
        &self,
        kind: RequestKind,
        address: &str,
        payload: Option<&Value>,
    ) -> Result<(MutexGuard<'_, MockState>, String)> {
        let mut state = self.lock();
        if !state.reachable {
            return Err(BenchBotError::connection(address, "connection refused"));
        }
        let path = Self::route_path(address)?;
        state.log.push(RecordedRequest {
            kind,
            path: path.clone(),
            payload: payload.cloned(),
        });
        if let Some(status) = state.failing.get(&path) {
            return Err(BenchBotError::UnexpectedResponse {
                address: address.to_string(),
                status: *status,
            });
        }
        Ok((state, path))
    }
}

impl Transport for MockSupervisor {
    async fn fetch(&self, address: &str) -> Result<Value> {
        let (mut state, path) = self.record(RequestKind::Fetch, address, None)?;
        Self::answer_fetch(&mut state, address, &path)
    }

    async fn send(&self, address: &str, payload: &Value) -> Result<()> {
        let (mut state, path) = self.record(RequestKind::Send, address, Some(payload))?;
        Self::answer_send(&mut state, address, &path)
    }
}
