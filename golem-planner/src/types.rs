//! Core data model shared across the planning pipeline.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Closed set of actions a golem can execute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskAction {
    Pathfind,
    Mine,
    Place,
    Craft,
    Attack,
    Follow,
    Gather,
    Build,
}

impl TaskAction {
    pub const ALL: [TaskAction; 8] = [
        TaskAction::Pathfind,
        TaskAction::Mine,
        TaskAction::Place,
        TaskAction::Craft,
        TaskAction::Attack,
        TaskAction::Follow,
        TaskAction::Gather,
        TaskAction::Build,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskAction::Pathfind => "pathfind",
            TaskAction::Mine => "mine",
            TaskAction::Place => "place",
            TaskAction::Craft => "craft",
            TaskAction::Attack => "attack",
            TaskAction::Follow => "follow",
            TaskAction::Gather => "gather",
            TaskAction::Build => "build",
        }
    }

    /// Parse an action identifier as emitted by the model. Returns `None`
    /// for anything outside the enumeration; the validator rejects those.
    pub fn parse(value: &str) -> Option<TaskAction> {
        match value {
            "pathfind" => Some(TaskAction::Pathfind),
            "mine" => Some(TaskAction::Mine),
            "place" => Some(TaskAction::Place),
            "craft" => Some(TaskAction::Craft),
            "attack" => Some(TaskAction::Attack),
            "follow" => Some(TaskAction::Follow),
            "gather" => Some(TaskAction::Gather),
            "build" => Some(TaskAction::Build),
            _ => None,
        }
    }
}

impl fmt::Display for TaskAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed variant type for task parameter values.
///
/// Models emit loosely typed JSON; anything outside these shapes (nested
/// objects, null) fails deserialization of the surrounding task list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Number(f64),
    String(String),
    List(Vec<ParamValue>),
}

impl ParamValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ParamValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParamValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ParamValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ParamValue]> {
        match self {
            ParamValue::List(items) => Some(items),
            _ => None,
        }
    }
}

/// One proposed action instruction. Created by the response parser and never
/// mutated afterwards; the validator only reads it.
///
/// `action` stays a raw string so that unknown actions survive parsing and
/// are rejected (with logging) at validation time rather than silently
/// dropped during deserialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub action: String,
    /// Keyed by parameter name; a `BTreeMap` keeps Debug and log output in a
    /// stable order.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
}

impl Task {
    pub fn parameter(&self, name: &str) -> Option<&ParamValue> {
        self.parameters.get(name)
    }

    pub fn has_parameters(&self, names: &[&str]) -> bool {
        names.iter().all(|n| self.parameters.contains_key(*n))
    }
}

/// The structured plan extracted from one model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedResponse {
    pub reasoning: String,
    pub plan: String,
    pub tasks: Vec<Task>,
}

/// Read-only situational snapshot gathered by the world integration and
/// consumed verbatim in prompt text. The planner never inspects the summary
/// strings; they are opaque prompt material.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub position: (i32, i32, i32),
    pub nearby_players: String,
    pub nearby_entities: String,
    pub nearby_blocks: String,
    pub biome: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn action_round_trips_through_str() {
        for action in TaskAction::ALL {
            assert_eq!(TaskAction::parse(action.as_str()), Some(action));
        }
        assert_eq!(TaskAction::parse("dance"), None);
    }

    #[test]
    fn param_value_deserializes_untagged() {
        let value: ParamValue = serde_json::from_str("5").unwrap();
        assert_eq!(value, ParamValue::Number(5.0));

        let value: ParamValue = serde_json::from_str("\"diamond_ore\"").unwrap();
        assert_eq!(value.as_str(), Some("diamond_ore"));

        let value: ParamValue = serde_json::from_str("[9, 6, 9]").unwrap();
        assert_eq!(value.as_list().map(|l| l.len()), Some(3));

        let value: ParamValue = serde_json::from_str("true").unwrap();
        assert_eq!(value.as_bool(), Some(true));
    }

    #[test]
    fn parameters_iterate_in_key_order() {
        let task: Task = serde_json::from_str(
            r#"{"action": "pathfind", "parameters": {"z": 3, "x": 1, "y": 2}}"#,
        )
        .unwrap();
        let keys: Vec<&str> = task.parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["x", "y", "z"]);
    }

    #[test]
    fn task_keeps_unknown_actions() {
        let task: Task =
            serde_json::from_str(r#"{"action": "teleport", "parameters": {"x": 1}}"#).unwrap();
        assert_eq!(task.action, "teleport");
        assert!(task.has_parameters(&["x"]));
        assert!(!task.has_parameters(&["x", "y"]));
    }
}
