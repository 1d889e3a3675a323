//! Fluent builder API for workflow construction.
//!
//! `build` checks the structural invariants:
//! - the workflow owns at least one sub-task
//! - the start task is one of its own sub-tasks
//! - every routing source is one of its own sub-tasks or a routing target
//! - the attempt budget is at least 1
//!
//! Routing *targets* are not checked: a target that is not a local sub-task
//! is an external reference, resolved at run time. External references may
//! carry routing entries of their own.

use crate::error::WorkflowBuildError;
use crate::task::{Task, TaskIdentity};
use crate::workflow::{Route, RoutingTable, Workflow};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

/// Default attempt budget.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Fluent builder for constructing workflows.
pub struct WorkflowBuilder {
    identity: TaskIdentity,
    tasks: BTreeMap<String, Arc<Task>>,
    start_task: Option<String>,
    routing: RoutingTable,
    max_attempts: u32,
    recursive: bool,
}

impl WorkflowBuilder {
    /// Creates a builder for a workflow with the given identity.
    pub fn new(identity: TaskIdentity) -> Self {
        Self {
            identity,
            tasks: BTreeMap::new(),
            start_task: None,
            routing: RoutingTable::new(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            recursive: false,
        }
    }

    /// Adds a sub-task under a local name.
    pub fn task(mut self, name: impl Into<String>, task: impl Into<Arc<Task>>) -> Self {
        self.tasks.insert(name.into(), task.into());
        self
    }

    /// Sets the start node.
    pub fn start(mut self, name: impl Into<String>) -> Self {
        self.start_task = Some(name.into());
        self
    }

    /// Adds (or replaces) the route for `(from, code)`.
    pub fn route(mut self, from: impl Into<String>, code: u32, route: Route) -> Self {
        self.routing.entry(from.into()).or_default().insert(code, route);
        self
    }

    /// Replaces the whole routing table.
    pub fn routing(mut self, routing: RoutingTable) -> Self {
        self.routing = routing;
        self
    }

    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Builds the workflow after checking its structure.
    pub fn build(self) -> Result<Workflow, WorkflowBuildError> {
        let key = self.identity.key.clone();

        if self.tasks.is_empty() {
            return Err(WorkflowBuildError::EmptyWorkflow(key));
        }

        let start_task = self.start_task.unwrap_or_default();
        if !self.tasks.contains_key(&start_task) {
            return Err(WorkflowBuildError::UnknownStartTask {
                workflow: key,
                start: start_task,
            });
        }

        let targets: BTreeSet<&str> = self
            .routing
            .values()
            .flat_map(|codes| codes.values())
            .filter_map(|route| route.next.as_deref())
            .collect();
        if let Some(source) = self
            .routing
            .keys()
            .find(|name| !self.tasks.contains_key(*name) && !targets.contains(name.as_str()))
        {
            return Err(WorkflowBuildError::UnknownRoutingSource {
                workflow: key,
                task: source.clone(),
            });
        }

        if self.max_attempts == 0 {
            return Err(WorkflowBuildError::InvalidMaxAttempts(key));
        }

        Ok(Workflow {
            identity: self.identity,
            tasks: self.tasks,
            start_task,
            routing: self.routing,
            max_attempts: self.max_attempts,
            recursive: self.recursive,
        })
    }
}
