//! Command-to-plan orchestration.
//!
//! Ties the pipeline together: prompts are built from the catalog and the
//! world snapshot, sent to the configured provider (with one-level fallback
//! to the default provider), and the reply is parsed and semantically
//! validated before anything reaches task execution.

use std::collections::HashMap;
use std::sync::Arc;

use crate::catalog::TemplateStore;
use crate::config::PlannerConfig;
use crate::error::{PlannerError, PlannerResult};
use crate::prompt;
use crate::provider::{ProviderClient, ProviderFactory, ProviderKind};
use crate::response;
use crate::types::{Task, WorldSnapshot};
use crate::validator::TaskValidator;

/// A validated, execution-ready plan.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskPlan {
    pub reasoning: String,
    pub summary: String,
    pub tasks: Vec<Task>,
}

/// Orchestrates one planning call end to end.
pub struct TaskPlanner {
    selected: ProviderKind,
    clients: HashMap<ProviderKind, Box<dyn ProviderClient>>,
    validator: TaskValidator,
    templates: Arc<dyn TemplateStore>,
}

impl std::fmt::Debug for TaskPlanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskPlanner")
            .field("selected", &self.selected)
            .finish_non_exhaustive()
    }
}

impl TaskPlanner {
    /// Build a planner from configuration.
    ///
    /// Fails fast when the selected provider has no resolvable credential.
    /// The fallback client (default provider) is built on a best-effort
    /// basis; if it cannot be built the planner still works, just without
    /// fallback.
    pub fn new(config: &PlannerConfig, templates: Arc<dyn TemplateStore>) -> PlannerResult<Self> {
        let selected = config.provider;
        let mut clients: HashMap<ProviderKind, Box<dyn ProviderClient>> = HashMap::new();
        clients.insert(selected, ProviderFactory::create(selected, config)?);

        if selected != ProviderKind::DEFAULT {
            match ProviderFactory::create(ProviderKind::DEFAULT, config) {
                Ok(client) => {
                    clients.insert(ProviderKind::DEFAULT, client);
                }
                Err(err) => {
                    log::warn!(
                        "fallback provider {} unavailable: {}",
                        ProviderKind::DEFAULT,
                        err
                    );
                }
            }
        }

        Ok(Self {
            selected,
            clients,
            validator: TaskValidator::new(Arc::clone(&templates)),
            templates,
        })
    }

    #[cfg(test)]
    fn with_clients(
        selected: ProviderKind,
        clients: HashMap<ProviderKind, Box<dyn ProviderClient>>,
        templates: Arc<dyn TemplateStore>,
    ) -> Self {
        Self {
            selected,
            clients,
            validator: TaskValidator::new(Arc::clone(&templates)),
            templates,
        }
    }

    /// Turn a free-text command plus world snapshot into a validated plan.
    ///
    /// Invalid tasks are filtered out rather than failing the call; an empty
    /// task list in a well-formed reply is a valid (empty) plan. Parse
    /// failures after a successful request do not re-trigger fallback.
    pub async fn plan_tasks(
        &self,
        command: &str,
        snapshot: &WorldSnapshot,
    ) -> PlannerResult<TaskPlan> {
        let system_prompt = prompt::build_system_prompt(self.templates.as_ref());
        let user_prompt = prompt::build_user_prompt(command, snapshot);

        log::info!("requesting plan from {} for: {}", self.selected, command);
        let raw = self
            .request_with_fallback(command, &system_prompt, &user_prompt)
            .await?;

        let parsed = response::parse_response(&raw)?;
        let proposed = parsed.tasks.len();
        let tasks = self.validator.validate_and_filter(parsed.tasks);
        if tasks.len() != proposed {
            log::warn!("filtered invalid tasks ({} -> {})", proposed, tasks.len());
        }

        log::info!("plan: {} ({} tasks)", parsed.plan, tasks.len());
        Ok(TaskPlan {
            reasoning: parsed.reasoning,
            summary: parsed.plan,
            tasks,
        })
    }

    /// One-level fallback: if the selected provider fails and is not itself
    /// the default, retry the identical prompts against the default provider.
    async fn request_with_fallback(
        &self,
        command: &str,
        system_prompt: &str,
        user_prompt: &str,
    ) -> PlannerResult<String> {
        let selected = match self.clients.get(&self.selected) {
            Some(client) => client,
            None => {
                return Err(PlannerError::Config(format!(
                    "no client for provider '{}'",
                    self.selected
                )))
            }
        };

        let first_error = match selected.send_request(system_prompt, user_prompt).await {
            Ok(raw) => return Ok(raw),
            Err(err) => err,
        };

        if self.selected != ProviderKind::DEFAULT {
            if let Some(fallback) = self.clients.get(&ProviderKind::DEFAULT) {
                log::warn!(
                    "{} failed ({}), trying {} as fallback",
                    self.selected,
                    first_error,
                    ProviderKind::DEFAULT
                );
                if let Ok(raw) = fallback.send_request(system_prompt, user_prompt).await {
                    return Ok(raw);
                }
            }
        }

        log::error!("failed to get a model response for command: {}", command);
        Err(PlannerError::AllProvidersFailed {
            command: command.to_string(),
        })
    }
}
