//! Semantic validation of parsed tasks.
//!
//! Parsing only guarantees shape; this layer guarantees meaning. Every task
//! must name a known action, carry that action's required parameters with
//! acceptable types, and reference only catalog-valid targets and
//! structures. Invalid tasks are dropped with a logged reason while the
//! rest of the plan proceeds in order.

use std::sync::Arc;

use crate::catalog::{self, TemplateStore};
use crate::types::{ParamValue, Task, TaskAction};

/// Expected type of one required parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// A JSON number, or a string that parses cleanly as one.
    Number,
    String,
    List,
}

/// Name and type of one required parameter.
#[derive(Debug, Clone, Copy)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

/// Required parameters per action. Catalog checks (attack targets, structure
/// names) happen after these, in [`TaskValidator::validate_task`].
pub fn required_params(action: TaskAction) -> &'static [ParamSpec] {
    match action {
        TaskAction::Pathfind => &[
            ParamSpec { name: "x", kind: ParamKind::Number },
            ParamSpec { name: "y", kind: ParamKind::Number },
            ParamSpec { name: "z", kind: ParamKind::Number },
        ],
        TaskAction::Mine => &[
            ParamSpec { name: "block", kind: ParamKind::String },
            ParamSpec { name: "quantity", kind: ParamKind::Number },
        ],
        TaskAction::Place => &[
            ParamSpec { name: "block", kind: ParamKind::String },
            ParamSpec { name: "x", kind: ParamKind::Number },
            ParamSpec { name: "y", kind: ParamKind::Number },
            ParamSpec { name: "z", kind: ParamKind::Number },
        ],
        TaskAction::Craft => &[
            ParamSpec { name: "item", kind: ParamKind::String },
            ParamSpec { name: "quantity", kind: ParamKind::Number },
        ],
        TaskAction::Attack => &[ParamSpec { name: "target", kind: ParamKind::String }],
        TaskAction::Follow => &[ParamSpec { name: "player", kind: ParamKind::String }],
        TaskAction::Gather => &[
            ParamSpec { name: "resource", kind: ParamKind::String },
            ParamSpec { name: "quantity", kind: ParamKind::Number },
        ],
        TaskAction::Build => &[
            ParamSpec { name: "structure", kind: ParamKind::String },
            ParamSpec { name: "blocks", kind: ParamKind::List },
            ParamSpec { name: "dimensions", kind: ParamKind::List },
        ],
    }
}

fn matches_kind(value: &ParamValue, kind: ParamKind) -> bool {
    match kind {
        ParamKind::Number => match value {
            ParamValue::Number(_) => true,
            // models often quote counts; accept strings that are clean numbers
            ParamValue::String(s) => s.trim().parse::<f64>().is_ok(),
            _ => false,
        },
        ParamKind::String => matches!(value, ParamValue::String(_)),
        ParamKind::List => matches!(value, ParamValue::List(_)),
    }
}

/// Validates tasks against the action schemas and the reference catalog.
pub struct TaskValidator {
    templates: Arc<dyn TemplateStore>,
}

impl TaskValidator {
    pub fn new(templates: Arc<dyn TemplateStore>) -> Self {
        Self { templates }
    }

    /// True when the task is executable as-is. Every rejection logs why.
    pub fn validate_task(&self, task: &Task) -> bool {
        let action = match TaskAction::parse(&task.action) {
            Some(action) => action,
            None => {
                log::warn!("unknown action type: {}", task.action);
                return false;
            }
        };

        for spec in required_params(action) {
            match task.parameter(spec.name) {
                None => {
                    log::warn!("{} task missing required parameter '{}'", action, spec.name);
                    return false;
                }
                Some(value) if !matches_kind(value, spec.kind) => {
                    log::warn!(
                        "{} task parameter '{}' has wrong type (expected {:?})",
                        action,
                        spec.name,
                        spec.kind
                    );
                    return false;
                }
                Some(_) => {}
            }
        }

        match action {
            TaskAction::Attack => self.check_attack(task),
            TaskAction::Build => self.check_build(task),
            _ => true,
        }
    }

    /// Drop invalid tasks, preserving the order of the survivors.
    pub fn validate_and_filter(&self, tasks: Vec<Task>) -> Vec<Task> {
        tasks
            .into_iter()
            .filter(|task| self.validate_task(task))
            .collect()
    }

    fn check_attack(&self, task: &Task) -> bool {
        // required_params already guarantees a string target
        let target = match task.parameter("target").and_then(ParamValue::as_str) {
            Some(target) => target,
            None => return false,
        };
        if catalog::is_valid_attack_target(target) {
            return true;
        }
        log::warn!(
            "unknown attack target '{}' (allowed: {:?})",
            target,
            catalog::valid_attack_targets()
        );
        false
    }

    fn check_build(&self, task: &Task) -> bool {
        let structure = match task.parameter("structure").and_then(ParamValue::as_str) {
            Some(structure) => structure,
            None => return false,
        };
        if catalog::is_valid_structure_name(self.templates.as_ref(), structure) {
            return true;
        }
        log::warn!(
            "unknown structure '{}' (available: {:?})",
            structure,
            catalog::all_structure_options(self.templates.as_ref())
        );
        false
    }
}
