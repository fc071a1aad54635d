//! Observation post-processing callbacks.
//!
//! The supervisor's robot configuration may name a `callback_api` for each
//! connection, e.g. `"api_callbacks.convert_to_laserscan"`. Names are looked
//! up in a [`CallbackTable`] of known transforms when the session starts, and
//! the result is frozen into an [`ObservationCallbacks`] registry that the
//! step executor applies to every raw observation.

use std::collections::{BTreeMap, HashMap};

use serde_json::{json, Value};
use tracing::debug;

use crate::error::{BenchBotError, Result};

/// A transform from a raw observation to its post-processed form.
pub type ObservationTransform = fn(Value) -> Value;

/// Named transforms a robot configuration may refer to.
#[derive(Debug, Clone)]
pub struct CallbackTable {
    entries: BTreeMap<String, ObservationTransform>,
}

impl Default for CallbackTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl CallbackTable {
    /// A table with no entries.
    pub fn empty() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// The built-in `api_callbacks.*` transforms.
    pub fn builtin() -> Self {
        let mut table = Self::empty();
        table.register("api_callbacks.convert_to_laserscan", convert_to_laserscan);
        table.register("api_callbacks.convert_to_pose", convert_to_pose);
        table.register(
            "api_callbacks.convert_to_camera_intrinsics",
            convert_to_camera_intrinsics,
        );
        table
    }

    /// Add or replace the transform registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, transform: ObservationTransform) {
        self.entries.insert(name.into(), transform);
    }

    pub fn resolve(&self, name: &str) -> Option<ObservationTransform> {
        self.entries.get(name).copied()
    }
}

/// Per-observation callbacks resolved at startup. Read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ObservationCallbacks {
    callbacks: HashMap<String, Option<ObservationTransform>>,
}

impl ObservationCallbacks {
    /// Resolve every entry of the supervisor's `config/robot` mapping.
    ///
    /// Entries without a `callback_api` pass their observation through
    /// unchanged. A `callback_api` missing from `table` is an error, as is an
    /// entry that is not a mapping or a `callback_api` that is not a string.
    pub fn from_robot_config(robot: &Value, table: &CallbackTable) -> Result<Self> {
        let entries = robot.as_object().ok_or_else(|| {
            BenchBotError::malformed("config/robot", "robot configuration is not a mapping")
        })?;

        let mut callbacks = HashMap::with_capacity(entries.len());
        for (key, entry) in entries {
            let entry = entry.as_object().ok_or_else(|| {
                BenchBotError::malformed(
                    "config/robot",
                    format!("connection '{key}' is not a mapping"),
                )
            })?;
            let transform = match entry.get("callback_api") {
                None => None,
                Some(Value::String(name)) => {
                    let Some(transform) = table.resolve(name) else {
                        return Err(BenchBotError::UnknownCallback {
                            observation: key.clone(),
                            callback: name.clone(),
                        });
                    };
                    debug!(observation = %key, callback = %name, "resolved observation callback");
                    Some(transform)
                }
                Some(other) => {
                    return Err(BenchBotError::malformed(
                        "config/robot",
                        format!("callback_api of '{key}' is not a string: {other}"),
                    ));
                }
            };
            callbacks.insert(key.clone(), transform);
        }

        Ok(Self { callbacks })
    }

    /// Post-process `raw` for observation `key`. Observations without a
    /// callback are returned unchanged.
    pub fn apply(&self, key: &str, raw: Value) -> Value {
        match self.callbacks.get(key).copied().flatten() {
            Some(transform) => transform(raw),
            None => raw,
        }
    }

    pub fn has_callback(&self, key: &str) -> bool {
        matches!(self.callbacks.get(key), Some(Some(_)))
    }

    pub fn len(&self) -> usize {
        self.callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.callbacks.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Built-in transforms
// ---------------------------------------------------------------------------

fn number(value: &Value, key: &str) -> Option<f64> {
    value.get(key).and_then(Value::as_f64)
}

/// Pairs each range with its beam angle: `{scans: [[range, angle], ...]}`.
pub fn convert_to_laserscan(raw: Value) -> Value {
    let (Some(ranges), Some(angle_min), Some(increment)) = (
        raw.get("ranges").and_then(Value::as_array),
        number(&raw, "angle_min"),
        number(&raw, "angle_increment"),
    ) else {
        return raw;
    };

    let scans: Vec<Value> = ranges
        .iter()
        .enumerate()
        .map(|(i, range)| json!([range, angle_min + i as f64 * increment]))
        .collect();

    json!({
        "scans": scans,
        "range_min": raw.get("range_min").cloned().unwrap_or(Value::Null),
        "range_max": raw.get("range_max").cloned().unwrap_or(Value::Null),
    })
}

/// Flattens an odometry message into `{position: [x, y, z], quaternion: [x, y, z, w]}`.
pub fn convert_to_pose(raw: Value) -> Value {
    let pose = raw.get("pose").unwrap_or(&raw);
    let (Some(position), Some(orientation)) = (pose.get("position"), pose.get("orientation"))
    else {
        return raw;
    };

    let components = |v: &Value, keys: &[&str]| -> Option<Vec<f64>> {
        keys.iter().map(|k| number(v, k)).collect()
    };
    match (
        components(position, &["x", "y", "z"]),
        components(orientation, &["x", "y", "z", "w"]),
    ) {
        (Some(position), Some(quaternion)) => json!({
            "position": position,
            "quaternion": quaternion,
        }),
        _ => raw,
    }
}

/// Reshapes the row-major `K` array of a camera info message into a 3x3 matrix.
pub fn convert_to_camera_intrinsics(raw: Value) -> Value {
    let Some(k) = raw
        .get("K")
        .and_then(Value::as_array)
        .filter(|k| k.len() == 9)
    else {
        return raw;
    };

    let rows: Vec<Value> = k.chunks(3).map(|row| Value::Array(row.to_vec())).collect();
    let mut out = json!({ "intrinsics": rows });
    if let Some(frame_id) = raw.get("frame_id") {
        out["frame_id"] = frame_id.clone();
    }
    out
}
