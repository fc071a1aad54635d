//! Task details encoded in the supervisor's `task_name`.

use serde::{Deserialize, Serialize};

/// Details of the task the supervisor is running, decoded from its
/// `type:control_mode:localisation_mode` task name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDetails {
    #[serde(rename = "type")]
    pub task_type: String,
    pub control_mode: Option<String>,
    pub localisation_mode: Option<String>,
}

impl TaskDetails {
    /// Split a task name on `:`. Missing trailing parts are `None`; parts
    /// beyond the third are ignored.
    pub fn parse(task_name: &str) -> Self {
        let mut parts = task_name.split(':').map(str::to_string);
        Self {
            task_type: parts.next().unwrap_or_default(),
            control_mode: parts.next(),
            localisation_mode: parts.next(),
        }
    }
}
