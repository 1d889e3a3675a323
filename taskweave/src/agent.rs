//! Agent capability consumed by leaf tasks.
//!
//! An agent turns an input mapping into zero or more output messages.
//! How it does so (prompt formatting, model calls, tool use) is entirely
//! its own business; tasks only see the [`Agent`] trait.

use crate::api::{ApiConfig, ApiName};
use crate::error::{AgentError, TaskFault};
use crate::response::{TaskResponse, UsageMetrics};
use crate::task::{ExecutionContext, Task, TaskInputs};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Configuration of every API a task declared, resolved before the agent runs.
pub type ResolvedApis = BTreeMap<ApiName, ApiConfig>;

/// Author role of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

/// One output message produced by an agent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    /// Free-form producer tag (e.g. "llm", "tool")
    #[serde(default)]
    pub generated_by: Option<String>,
    #[serde(default)]
    pub usage: Option<UsageMetrics>,
    #[serde(default)]
    pub creation_metadata: Option<serde_json::Value>,
}

impl Message {
    /// Creates a message with the given role and content.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            generated_by: None,
            usage: None,
            creation_metadata: None,
        }
    }

    /// Creates an assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Sets the producer tag.
    pub fn generated_by(mut self, producer: impl Into<String>) -> Self {
        self.generated_by = Some(producer.into());
        self
    }

    /// Attaches usage accounting.
    pub fn with_usage(mut self, usage: UsageMetrics) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// Capability flags of a leaf task's agent.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    /// Agent may call the task's tool sub-tasks
    #[serde(default)]
    pub has_functions: bool,
}

/// Tool sub-tasks handed to an agent whose task has `has_functions` set.
///
/// Calls run under the execution context of the calling task, so tools
/// see the same registry, resolver, call stack and cancellation token.
#[derive(Clone, Copy)]
pub struct Toolbox<'a> {
    tools: &'a BTreeMap<String, Arc<Task>>,
    context: &'a ExecutionContext,
}

impl<'a> Toolbox<'a> {
    pub(crate) fn new(tools: &'a BTreeMap<String, Arc<Task>>, context: &'a ExecutionContext) -> Self {
        Self { tools, context }
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Tool names, in order.
    pub fn names(&self) -> impl Iterator<Item = &'a str> {
        self.tools.keys().map(String::as_str)
    }

    pub fn get(&self, name: &str) -> Option<&'a Task> {
        self.tools.get(name).map(Arc::as_ref)
    }

    /// Runs the tool `name` with `inputs`.
    ///
    /// Returns `Ok(None)` when the task has no such tool. A failing tool is
    /// an ordinary failed response; only faults come back as `Err`.
    pub async fn call(&self, name: &str, inputs: &TaskInputs) -> Result<Option<TaskResponse>, TaskFault> {
        let Some(tool) = self.tools.get(name) else {
            tracing::warn!(tool = name, "agent called an unknown tool");
            return Ok(None);
        };
        tracing::debug!(tool = name, "calling tool");
        tool.execute(self.context, inputs).await.map(Some)
    }
}

impl std::fmt::Debug for Toolbox<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.tools.keys()).finish()
    }
}

/// Trait for agent capabilities.
///
/// Implementations may fail or return an empty vector; leaf tasks translate
/// both into a failed response rather than a fault.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Produces output messages from the task inputs.
    ///
    /// `apis` holds the resolved configuration of the task's required APIs.
    async fn generate(
        &self,
        inputs: &TaskInputs,
        apis: &ResolvedApis,
    ) -> Result<Vec<Message>, AgentError>;

    /// Produces output messages with the task's tools at hand.
    ///
    /// Called instead of [`Agent::generate`] for tasks with `has_functions`.
    /// The default ignores the tools.
    async fn generate_with_tools(
        &self,
        inputs: &TaskInputs,
        apis: &ResolvedApis,
        tools: Toolbox<'_>,
    ) -> Result<Vec<Message>, AgentError> {
        let _ = tools;
        self.generate(inputs, apis).await
    }

    /// Human-readable agent name, used in logs.
    fn name(&self) -> &str;
}

/// Source of agents for the catalog loader, keyed by agent key.
pub trait AgentProvider {
    /// Looks up an agent by its catalog key.
    fn agent(&self, key: &str) -> Option<Arc<dyn Agent>>;
}

impl AgentProvider for HashMap<String, Arc<dyn Agent>> {
    fn agent(&self, key: &str) -> Option<Arc<dyn Agent>> {
        self.get(key).cloned()
    }
}
