//! Command-to-task planning for autonomous golem agents.
//!
//! Turns a free-text player command plus a world snapshot into a validated,
//! ordered task list by way of an LLM provider. The pipeline:
//!
//! 1. [`prompt`] assembles a system prompt (output contract, reference
//!    catalog, few-shot examples) and a user prompt (snapshot + command).
//! 2. [`provider`] sends the prompts to the configured backend with retry,
//!    backoff and timeouts; [`planner`] adds one-level fallback to the
//!    default provider.
//! 3. [`response`] extracts the first balanced JSON object from the raw
//!    model text and decodes it.
//! 4. [`validator`] drops tasks with unknown actions, missing or mistyped
//!    parameters, or targets outside the [`catalog`].
//!
//! ```no_run
//! use std::sync::Arc;
//! use golem_planner::{FsTemplateStore, PlannerConfig, TaskPlanner, WorldSnapshot};
//!
//! # async fn demo() -> Result<(), golem_planner::PlannerError> {
//! let config = PlannerConfig::from_file("planner.toml")?;
//! let templates = Arc::new(FsTemplateStore::new("structures"));
//! let planner = TaskPlanner::new(&config, templates)?;
//!
//! let snapshot = WorldSnapshot {
//!     position: (12, 64, -7),
//!     nearby_players: "Alex (8 blocks)".into(),
//!     nearby_entities: "2 sheep".into(),
//!     nearby_blocks: "oak_log, stone".into(),
//!     biome: "plains".into(),
//! };
//! let plan = planner.plan_tasks("mine 5 iron ore", &snapshot).await?;
//! for task in &plan.tasks {
//!     println!("{}: {:?}", task.action, task.parameters);
//! }
//! # Ok(())
//! # }
//! ```

pub mod catalog;
pub mod config;
pub mod error;
pub mod planner;
pub mod prompt;
pub mod provider;
pub mod response;
pub mod types;
pub mod validator;

pub use catalog::{FsTemplateStore, TemplateStore};
pub use config::{PlannerConfig, ProviderConfig};
pub use error::{PlannerError, PlannerResult};
pub use planner::{TaskPlan, TaskPlanner};
pub use provider::{ProviderClient, ProviderKind, StubClient};
pub use types::{ParamValue, ParsedResponse, Task, TaskAction, WorldSnapshot};
pub use validator::TaskValidator;
