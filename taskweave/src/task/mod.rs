//! Task abstraction and execution contract.
//!
//! Every task is one of a fixed set of variants:
//! - [`PromptAgentTask`]: hands its inputs to an agent and returns the messages
//! - [`CheckTask`]: like a prompt task, but classifies the agent's answer into
//!   a routing code
//! - [`Workflow`]: interprets a routing table over named sub-tasks
//!
//! Dispatch is an explicit `match` in [`Task::execute`]. Definitions are
//! immutable after construction and hold no per-run state, so one definition
//! can serve any number of concurrent executions.

pub mod check;
pub mod prompt;
pub mod schema;

pub use check::CheckTask;
pub use prompt::PromptAgentTask;
pub use schema::{InputSchema, ParameterDefinition};

use crate::api::{ApiName, ApiRegistry};
use crate::cancellation::CancellationToken;
use crate::error::TaskFault;
use crate::resolver::TaskResolver;
use crate::response::{ResponseIdentity, TaskResponse, CODE_FAILURE, CODE_SUCCESS};
use crate::workflow::Workflow;
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Named input values of a task invocation.
pub type TaskInputs = serde_json::Map<String, serde_json::Value>;

/// Identity and static configuration shared by every task variant.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskIdentity {
    /// Catalog key; also reported as `task_id` on responses
    pub key: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required_apis: Vec<ApiName>,
    #[serde(default)]
    pub input_schema: InputSchema,
    /// Human-readable meaning of each result code
    #[serde(default = "default_exit_codes")]
    pub exit_codes: BTreeMap<u32, String>,
}

fn default_exit_codes() -> BTreeMap<u32, String> {
    BTreeMap::from([
        (CODE_SUCCESS, "Success".to_string()),
        (CODE_FAILURE, "Failed".to_string()),
    ])
}

impl TaskIdentity {
    /// Creates an identity with default exit codes and no inputs.
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            description: String::new(),
            required_apis: Vec::new(),
            input_schema: InputSchema::default(),
            exit_codes: default_exit_codes(),
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn required_api(mut self, api: impl Into<ApiName>) -> Self {
        self.required_apis.push(api.into());
        self
    }

    pub fn input_schema(mut self, schema: InputSchema) -> Self {
        self.input_schema = schema;
        self
    }

    /// Adds or overrides the description of a result code.
    pub fn exit_code(mut self, code: u32, meaning: impl Into<String>) -> Self {
        self.exit_codes.insert(code, meaning.into());
        self
    }

    /// Describes a result code, falling back to the bare number.
    pub fn describe_code(&self, code: u32) -> String {
        self.exit_codes
            .get(&code)
            .cloned()
            .unwrap_or_else(|| format!("exit code {}", code))
    }

    /// Identity fields copied onto responses.
    pub fn response_identity(&self) -> ResponseIdentity {
        ResponseIdentity {
            task_id: self.key.clone(),
            task_name: self.name.clone(),
            task_description: self.description.clone(),
        }
    }
}

/// Collaborators and call-chain state handed down through one execution.
#[derive(Clone)]
pub struct ExecutionContext {
    registry: Arc<dyn ApiRegistry>,
    resolver: Arc<dyn TaskResolver>,
    cancellation: Option<CancellationToken>,
    /// Keys of the workflows currently being executed, outermost first
    call_stack: Vec<String>,
}

impl ExecutionContext {
    /// Creates a context for a top-level execution.
    pub fn new(registry: Arc<dyn ApiRegistry>, resolver: Arc<dyn TaskResolver>) -> Self {
        Self {
            registry,
            resolver,
            cancellation: None,
            call_stack: Vec::new(),
        }
    }

    /// Sets the cancellation token checked between workflow steps.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    pub fn registry(&self) -> &dyn ApiRegistry {
        self.registry.as_ref()
    }

    pub fn resolver(&self) -> &dyn TaskResolver {
        self.resolver.as_ref()
    }

    /// Returns true if the run was asked to stop.
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Returns true if the workflow with `key` is on the active call chain.
    pub fn is_active(&self, key: &str) -> bool {
        self.call_stack.iter().any(|k| k == key)
    }

    /// Depth of nested workflow calls.
    pub fn depth(&self) -> usize {
        self.call_stack.len()
    }

    /// Context for executing inside the workflow `key`.
    pub(crate) fn enter(&self, key: &str) -> Self {
        let mut child = self.clone();
        child.call_stack.push(key.to_string());
        child
    }
}

/// A unit of work producing a [`TaskResponse`].
pub enum Task {
    Prompt(PromptAgentTask),
    Check(CheckTask),
    Workflow(Workflow),
}

impl Task {
    /// Shared identity of the task.
    pub fn identity(&self) -> &TaskIdentity {
        match self {
            Task::Prompt(task) => &task.identity,
            Task::Check(task) => &task.prompt.identity,
            Task::Workflow(workflow) => &workflow.identity,
        }
    }

    pub fn key(&self) -> &str {
        &self.identity().key
    }

    pub fn name(&self) -> &str {
        &self.identity().name
    }

    /// Short variant name, used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Task::Prompt(_) => "prompt",
            Task::Check(_) => "check",
            Task::Workflow(_) => "workflow",
        }
    }

    /// Returns the workflow definition if this task is one.
    pub fn as_workflow(&self) -> Option<&Workflow> {
        match self {
            Task::Workflow(workflow) => Some(workflow),
            _ => None,
        }
    }

    /// Executes the task.
    ///
    /// Ordinary failures (missing inputs, empty agent output, routing dead
    /// ends) come back as `Ok` with a non-zero result code. `Err` is reserved
    /// for unmodeled faults.
    pub fn execute<'a>(
        &'a self,
        context: &'a ExecutionContext,
        inputs: &'a TaskInputs,
    ) -> BoxFuture<'a, Result<TaskResponse, TaskFault>> {
        async move {
            let identity = self.identity();
            let prepared = match identity.input_schema.prepare(inputs) {
                Ok(prepared) => prepared,
                Err(missing) => {
                    tracing::warn!(task = %identity.key, missing = ?missing, "missing required inputs");
                    return Ok(TaskResponse::failure(
                        identity.response_identity(),
                        inputs.clone(),
                        CODE_FAILURE,
                        format!("Missing required inputs: {}", missing.join(", ")),
                    ));
                }
            };

            tracing::debug!(task = %identity.key, kind = self.kind(), "executing task");
            let response = match self {
                Task::Prompt(task) => task.run(context, &prepared, inputs).await?,
                Task::Check(task) => task.run(context, &prepared, inputs).await?,
                Task::Workflow(workflow) => workflow.run(context, &prepared, inputs).await?,
            };
            tracing::debug!(
                task = %identity.key,
                code = response.result_code,
                status = %response.status,
                "task finished"
            );
            Ok(response)
        }
        .boxed()
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("kind", &self.kind())
            .field("key", &self.key())
            .finish()
    }
}

impl From<PromptAgentTask> for Task {
    fn from(task: PromptAgentTask) -> Self {
        Task::Prompt(task)
    }
}

impl From<CheckTask> for Task {
    fn from(task: CheckTask) -> Self {
        Task::Check(task)
    }
}

impl From<Workflow> for Task {
    fn from(workflow: Workflow) -> Self {
        Task::Workflow(workflow)
    }
}
