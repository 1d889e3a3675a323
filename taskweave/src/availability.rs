//! Pre-flight health check of the APIs a task tree depends on.
//!
//! The check is advisory: it never blocks execution and never mutates
//! the registry.

use crate::api::{ApiName, ApiRegistry, ApiStatus};
use crate::resolver::TaskResolver;
use crate::task::{PromptAgentTask, Task};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

/// Health of one API as seen by the check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiCheckMessage {
    pub api: ApiName,
    pub status: ApiStatus,
    pub message: String,
}

/// Aggregate result of [`check_availability`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityReport {
    /// Worst status over all messages; `Ok` when there are none
    pub status: ApiStatus,
    pub messages: Vec<ApiCheckMessage>,
}

impl AvailabilityReport {
    fn from_messages(messages: Vec<ApiCheckMessage>) -> Self {
        let status = messages
            .iter()
            .map(|m| m.status)
            .max()
            .unwrap_or(ApiStatus::Ok);
        Self { status, messages }
    }

    pub fn warnings(&self) -> impl Iterator<Item = &ApiCheckMessage> {
        self.messages.iter().filter(|m| m.status == ApiStatus::Warning)
    }

    pub fn errors(&self) -> impl Iterator<Item = &ApiCheckMessage> {
        self.messages.iter().filter(|m| m.status == ApiStatus::Error)
    }

    pub fn is_ok(&self) -> bool {
        self.status == ApiStatus::Ok
    }
}

/// Checks every API required anywhere in `task`'s tree.
///
/// Workflows are walked through their own sub-tasks and through routing
/// targets the resolver can find. Prompt and check tasks whose agent has
/// `has_functions` are walked through their tools. Each workflow key is visited once, so
/// cyclic references terminate. Each distinct API is queried once.
pub fn check_availability(
    task: &Task,
    registry: &dyn ApiRegistry,
    resolver: &dyn TaskResolver,
) -> AvailabilityReport {
    let mut walker = ApiCollector {
        resolver,
        apis: BTreeSet::new(),
        visited: HashSet::new(),
    };
    walker.walk(task);

    let messages = walker
        .apis
        .into_iter()
        .map(|api| {
            let health = registry.health(&api);
            ApiCheckMessage {
                api,
                status: health.status,
                message: health.message,
            }
        })
        .collect();
    AvailabilityReport::from_messages(messages)
}

struct ApiCollector<'a> {
    resolver: &'a dyn TaskResolver,
    apis: BTreeSet<ApiName>,
    visited: HashSet<String>,
}

impl ApiCollector<'_> {
    fn walk(&mut self, task: &Task) {
        self.apis
            .extend(task.identity().required_apis.iter().cloned());

        let workflow = match task {
            Task::Prompt(prompt) => return self.walk_tools(prompt),
            Task::Check(check) => return self.walk_tools(&check.prompt),
            Task::Workflow(workflow) => workflow,
        };
        if !self.visited.insert(workflow.key().to_string()) {
            return;
        }

        for sub_task in workflow.tasks().values() {
            self.walk(sub_task);
        }
        for name in workflow.external_references() {
            match self.resolver.resolve(name) {
                Ok(Some(target)) => self.walk(&target),
                Ok(None) => {
                    tracing::debug!(workflow = %workflow.key(), target = name, "routing target not resolvable");
                }
                Err(e) => {
                    tracing::warn!(workflow = %workflow.key(), target = name, error = %e, "resolver failed during availability check");
                }
            }
        }
    }
    /// Tools count only for agents that may call them.
    fn walk_tools(&mut self, prompt: &PromptAgentTask) {
        for tool in prompt.callable_tools() {
            self.walk(tool);
        }
    }
}
