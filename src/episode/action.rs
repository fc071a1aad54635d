//! Actions the robot accepts and the result of performing one.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{BenchBotError, Result};

/// Keyword arguments of an action, sent verbatim as the action's JSON body.
pub type ActionArgs = serde_json::Map<String, serde_json::Value>;

/// Outcome of a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActionResult {
    /// The action completed and the robot is ready for another.
    Success,
    /// The action completed and the robot has met all of its goals.
    Finished,
    /// The robot collided with an obstacle.
    Collision,
}

impl ActionResult {
    /// Derive the result from the supervisor's flags. Collision takes
    /// precedence over finished.
    pub fn from_flags(collided: bool, finished: bool) -> Self {
        if collided {
            Self::Collision
        } else if finished {
            Self::Finished
        } else {
            Self::Success
        }
    }

    /// No further actions may be taken after a terminal result.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Finished | Self::Collision)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "SUCCESS",
            Self::Finished => "FINISHED",
            Self::Collision => "COLLISION",
        }
    }
}

impl fmt::Display for ActionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry of the action schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec {
    pub name: &'static str,
    /// Required argument names, in order.
    pub args: &'static [&'static str],
}

/// The fixed set of actions and their required arguments.
///
/// `distance` is in metres, `angle` in radians.
pub const VALID_ACTIONS: &[ActionSpec] = &[
    ActionSpec {
        name: "move_next",
        args: &[],
    },
    ActionSpec {
        name: "move_distance",
        args: &["distance"],
    },
    ActionSpec {
        name: "move_angle",
        args: &["angle"],
    },
];

/// Look up the schema entry for `action`.
pub fn lookup(action: &str) -> Option<&'static ActionSpec> {
    VALID_ACTIONS.iter().find(|spec| spec.name == action)
}

/// Check `action` and `args` against [`VALID_ACTIONS`].
///
/// Rules are applied in order: the name must be known, the argument count
/// must match, and every argument name must be one the action accepts.
pub fn validate(action: &str, args: &ActionArgs) -> Result<()> {
    let spec = lookup(action).ok_or_else(|| BenchBotError::InvalidAction {
        action: action.to_string(),
        valid: VALID_ACTIONS.iter().map(|s| s.name.to_string()).collect(),
    })?;

    if args.len() != spec.args.len() {
        return Err(BenchBotError::ArgumentCountMismatch {
            action: action.to_string(),
            expected: spec.args.len(),
            supplied: args.len(),
        });
    }

    let invalid: Vec<String> = args
        .keys()
        .filter(|name| !spec.args.contains(&name.as_str()))
        .cloned()
        .collect();
    if !invalid.is_empty() {
        return Err(BenchBotError::InvalidArgumentName {
            action: action.to_string(),
            valid: spec.args.iter().map(|a| a.to_string()).collect(),
            invalid,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args(pairs: &[(&str, serde_json::Value)]) -> ActionArgs {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn well_formed_actions_validate() {
        validate("move_next", &ActionArgs::new()).unwrap();
        validate("move_distance", &args(&[("distance", json!(1.5))])).unwrap();
        validate("move_angle", &args(&[("angle", json!(0))])).unwrap();
    }

    #[test]
    fn unknown_action_is_invalid() {
        for name in ["", "move", "MOVE_NEXT", "fly", "move_next "] {
            let err = validate(name, &ActionArgs::new()).unwrap_err();
            match err {
                BenchBotError::InvalidAction { action, valid } => {
                    assert_eq!(action, name);
                    assert_eq!(valid, vec!["move_next", "move_distance", "move_angle"]);
                }
                other => panic!("expected InvalidAction for {name:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn wrong_argument_count_is_rejected() {
        let cases = [
            ("move_next", args(&[("distance", json!(1.0))])),
            ("move_distance", ActionArgs::new()),
            (
                "move_angle",
                args(&[("angle", json!(1.0)), ("distance", json!(1.0))]),
            ),
        ];
        for (name, supplied) in cases {
            let err = validate(name, &supplied).unwrap_err();
            assert!(
                matches!(err, BenchBotError::ArgumentCountMismatch { .. }),
                "{name}: {err:?}"
            );
        }
    }

    #[test]
    fn wrong_argument_name_is_rejected() {
        let err = validate("move_distance", &args(&[("angle", json!(1.0))])).unwrap_err();
        match err {
            BenchBotError::InvalidArgumentName { valid, invalid, .. } => {
                assert_eq!(valid, vec!["distance"]);
                assert_eq!(invalid, vec!["angle"]);
            }
            other => panic!("expected InvalidArgumentName, got {other:?}"),
        }

        let err = validate("move_angle", &args(&[("distance", json!(1.0))])).unwrap_err();
        assert!(matches!(err, BenchBotError::InvalidArgumentName { .. }));
    }

    #[test]
    fn collision_precedes_finished() {
        assert_eq!(ActionResult::from_flags(true, true), ActionResult::Collision);
        assert_eq!(ActionResult::from_flags(true, false), ActionResult::Collision);
        assert_eq!(ActionResult::from_flags(false, true), ActionResult::Finished);
        assert_eq!(ActionResult::from_flags(false, false), ActionResult::Success);
    }

    #[test]
    fn only_success_is_non_terminal() {
        assert!(!ActionResult::Success.is_terminal());
        assert!(ActionResult::Finished.is_terminal());
        assert!(ActionResult::Collision.is_terminal());
        assert_eq!(
            serde_json::to_value(ActionResult::Collision).unwrap(),
            json!("COLLISION")
        );
    }
}
