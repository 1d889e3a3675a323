//! Table-driven workflow tasks.
//!
//! A workflow owns a set of named sub-tasks, a start node and a routing
//! table keyed by `(sub-task name, result code)`. Each table entry names the
//! next node (or `None` to finish) and whether the hop counts against the
//! attempt budget.
//!
//! # Execution Model
//!
//! The engine runs strictly one sub-task at a time:
//! 1. Stop if cancelled, finished (`None`), or out of attempts
//! 2. Resolve the node locally, then through the injected resolver
//! 3. Refuse to re-enter a non-recursive workflow already on the call chain
//! 4. Execute the node and append its response to the history
//! 5. Route on the result code; bump the attempt counter on retry hops
//!
//! The attempt counter is the only termination guarantee against cycles,
//! so any graph shape (self-loops, forward skips) is safe to configure.
//!
//! # Example
//!
//! ```ignore
//! use taskweave::workflow::{Route, WorkflowBuilder};
//!
//! let workflow = WorkflowBuilder::new(TaskIdentity::new("research_workflow", "Research"))
//!     .task("research_brief_task", brief)
//!     .task("data_retrieval_task", retrieval)
//!     .start("research_brief_task")
//!     .route("research_brief_task", 0, Route::to("data_retrieval_task"))
//!     .route("research_brief_task", 1, Route::retry("plan_workflow"))
//!     .route("data_retrieval_task", 0, Route::end())
//!     .max_attempts(3)
//!     .build()?;
//! ```

pub mod builder;
pub mod engine;

pub use builder::WorkflowBuilder;
pub use engine::{StepOutcome, WorkflowRun, MAX_CALL_DEPTH};

use crate::task::{Task, TaskIdentity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Transition taken after a sub-task finishes with a given code.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "(Option<String>, bool)", into = "(Option<String>, bool)")]
pub struct Route {
    /// Next node; `None` finishes the workflow successfully
    pub next: Option<String>,
    /// Whether taking this hop consumes one attempt
    pub is_retry: bool,
}

impl Route {
    /// Plain transition to `next`.
    pub fn to(next: impl Into<String>) -> Self {
        Self {
            next: Some(next.into()),
            is_retry: false,
        }
    }

    /// Transition to `next` that counts against the attempt budget.
    pub fn retry(next: impl Into<String>) -> Self {
        Self {
            next: Some(next.into()),
            is_retry: true,
        }
    }

    /// Successful termination.
    pub fn end() -> Self {
        Self {
            next: None,
            is_retry: false,
        }
    }
}

impl From<(Option<String>, bool)> for Route {
    fn from((next, is_retry): (Option<String>, bool)) -> Self {
        Self { next, is_retry }
    }
}

impl From<Route> for (Option<String>, bool) {
    fn from(route: Route) -> Self {
        (route.next, route.is_retry)
    }
}

/// Routing table: sub-task name → result code → route.
pub type RoutingTable = BTreeMap<String, BTreeMap<u32, Route>>;

/// Workflow definition. Immutable once built; see [`WorkflowBuilder`].
pub struct Workflow {
    pub(crate) identity: TaskIdentity,
    tasks: BTreeMap<String, Arc<Task>>,
    start_task: String,
    routing: RoutingTable,
    max_attempts: u32,
    recursive: bool,
}

impl Workflow {
    pub fn identity(&self) -> &TaskIdentity {
        &self.identity
    }

    pub fn key(&self) -> &str {
        &self.identity.key
    }

    /// Sub-tasks owned by this workflow, by local name.
    pub fn tasks(&self) -> &BTreeMap<String, Arc<Task>> {
        &self.tasks
    }

    pub fn start_task(&self) -> &str {
        &self.start_task
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Whether this workflow may appear as its own descendant in one run.
    pub fn is_recursive(&self) -> bool {
        self.recursive
    }

    /// Route for `(task, code)`, if configured.
    pub fn route(&self, task: &str, code: u32) -> Option<&Route> {
        self.routing.get(task).and_then(|codes| codes.get(&code))
    }

    /// Routing targets that are not local sub-tasks, sorted and deduplicated.
    ///
    /// These are resolved through the injected resolver at run time.
    pub fn external_references(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .routing
            .values()
            .flat_map(|codes| codes.values())
            .filter_map(|route| route.next.as_deref())
            .filter(|name| !self.tasks.contains_key(*name))
            .collect();
        names.sort_unstable();
        names.dedup();
        names
    }
}

impl std::fmt::Debug for Workflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workflow")
            .field("key", &self.identity.key)
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .field("start_task", &self.start_task)
            .field("max_attempts", &self.max_attempts)
            .field("recursive", &self.recursive)
            .finish()
    }
}
