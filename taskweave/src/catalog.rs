//! YAML task catalog.
//!
//! A catalog declares shared parameters and a flat list of tasks. Workflow
//! entries name their sub-tasks by catalog key, and prompt or check entries
//! name their tools the same way. The loader materializes entries in
//! containment order (contained tasks before their owners) and shares each
//! built task behind an `Arc`.
//!
//! ```yaml
//! parameters:
//!   - key: prompt_parameter
//!     type: string
//!     description: The input prompt
//! tasks:
//!   - key: research_brief_task
//!     task_type: PromptAgentTask
//!     task_name: research_brief_task
//!     agent: brief_specialist
//!     required_apis: [llm_api]
//!     input_variables:
//!       properties:
//!         prompt: prompt_parameter
//!       required: [prompt]
//!   - key: data_retrieval_task
//!     task_type: PromptAgentTask
//!     task_name: data_retrieval_task
//!     agent: data_retrieval_expert
//!     capabilities:
//!       has_functions: true
//!     tasks:
//!       wikipedia_search: wikipedia_search
//!   - key: research_workflow
//!     task_type: Workflow
//!     task_name: research_workflow
//!     tasks:
//!       research_brief_task: research_brief_task
//!     start_task: research_brief_task
//!     tasks_end_code_routing:
//!       research_brief_task:
//!         0: [null, false]
//!         1: [plan_workflow, true]
//!     max_attempts: 3
//! ```

use crate::agent::{Agent, AgentProvider, Capabilities};
use crate::api::ApiName;
use crate::error::CatalogError;
use crate::resolver::TaskCatalog;
use crate::task::{
    CheckTask, InputSchema, ParameterDefinition, PromptAgentTask, Task, TaskIdentity,
};
use crate::workflow::builder::DEFAULT_MAX_ATTEMPTS;
use crate::workflow::{RoutingTable, WorkflowBuilder};
use petgraph::algo::{tarjan_scc, toposort};
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;

/// Catalog document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YamlCatalog {
    /// Named parameter definitions that input properties may reference
    #[serde(default)]
    pub parameters: Vec<YamlParameter>,
    pub tasks: Vec<YamlTask>,
}

/// Shared parameter definition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YamlParameter {
    pub key: String,
    #[serde(flatten)]
    pub definition: ParameterDefinition,
}

/// Task variant of a catalog entry.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum YamlTaskType {
    PromptAgentTask,
    CheckTask,
    Workflow,
}

/// One catalog entry. Which fields apply depends on `task_type`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct YamlTask {
    pub key: String,
    pub task_type: YamlTaskType,
    pub task_name: String,
    #[serde(default)]
    pub task_description: String,
    /// Agent key (prompt and check tasks)
    #[serde(default)]
    pub agent: Option<String>,
    #[serde(default)]
    pub required_apis: Vec<ApiName>,
    #[serde(default)]
    pub input_variables: Option<YamlInputVariables>,
    /// Overrides/extends the default `{0: Success, 1: Failed}` descriptions
    #[serde(default)]
    pub exit_codes: BTreeMap<u32, String>,
    /// Answer label → result code (check tasks)
    #[serde(default)]
    pub exit_code_response_map: BTreeMap<String, u32>,
    /// Agent capability flags (prompt and check tasks)
    #[serde(default)]
    pub capabilities: Capabilities,
    /// Local name → catalog key: sub-tasks of a workflow, tools of a
    /// prompt or check task
    #[serde(default)]
    pub tasks: BTreeMap<String, String>,
    #[serde(default)]
    pub start_task: Option<String>,
    #[serde(default)]
    pub tasks_end_code_routing: RoutingTable,
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default)]
    pub recursive: bool,
}

fn default_max_attempts() -> u32 {
    DEFAULT_MAX_ATTEMPTS
}

/// Input variables of a catalog entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct YamlInputVariables {
    #[serde(default)]
    pub properties: BTreeMap<String, YamlProperty>,
    #[serde(default)]
    pub required: Vec<String>,
}

/// An input property, given inline or as a reference to a shared parameter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum YamlProperty {
    Reference(String),
    Inline(ParameterDefinition),
}

impl YamlCatalog {
    /// Materializes every entry, binding agents through `agents`.
    pub fn build(self, agents: &dyn AgentProvider) -> Result<TaskCatalog, CatalogError> {
        let parameters: HashMap<&str, &ParameterDefinition> = self
            .parameters
            .iter()
            .map(|p| (p.key.as_str(), &p.definition))
            .collect();

        let order = self.containment_order()?;
        let mut built: HashMap<String, Arc<Task>> = HashMap::with_capacity(self.tasks.len());
        for index in order {
            let entry = &self.tasks[index];
            let task = entry.materialize(&parameters, agents, &built)?;
            tracing::debug!(key = %entry.key, kind = task.kind(), "catalog task built");
            built.insert(entry.key.clone(), Arc::new(task));
        }

        let mut catalog = TaskCatalog::new();
        for task in built.into_values() {
            catalog.insert(task);
        }
        tracing::info!(tasks = catalog.len(), "task catalog loaded");
        Ok(catalog)
    }

    /// Entry indices ordered so that every task follows the tasks it contains.
    fn containment_order(&self) -> Result<Vec<usize>, CatalogError> {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let mut nodes: HashMap<&str, NodeIndex> = HashMap::with_capacity(self.tasks.len());
        for (index, entry) in self.tasks.iter().enumerate() {
            if nodes.insert(entry.key.as_str(), graph.add_node(index)).is_some() {
                return Err(CatalogError::DuplicateKey(entry.key.clone()));
            }
        }

        for entry in &self.tasks {
            let owner = nodes[entry.key.as_str()];
            for key in entry.tasks.values() {
                let Some(&contained) = nodes.get(key.as_str()) else {
                    return Err(CatalogError::UnknownTask {
                        owner: entry.key.clone(),
                        task: key.clone(),
                    });
                };
                graph.add_edge(contained, owner, ());
            }
        }

        match toposort(&graph, None) {
            Ok(sorted) => Ok(sorted.into_iter().map(|node| graph[node]).collect()),
            Err(cycle) => {
                let mut members: Vec<String> = tarjan_scc(&graph)
                    .into_iter()
                    .find(|scc| scc.contains(&cycle.node_id()))
                    .unwrap_or_default()
                    .into_iter()
                    .map(|node| self.tasks[graph[node]].key.clone())
                    .collect();
                members.sort();
                Err(CatalogError::ContainmentCycle(members))
            }
        }
    }
}

impl YamlTask {
    fn materialize(
        &self,
        parameters: &HashMap<&str, &ParameterDefinition>,
        agents: &dyn AgentProvider,
        built: &HashMap<String, Arc<Task>>,
    ) -> Result<Task, CatalogError> {
        let identity = self.identity(parameters)?;

        match self.task_type {
            YamlTaskType::PromptAgentTask => Ok(Task::Prompt(self.prompt(identity, agents, built)?)),
            YamlTaskType::CheckTask => {
                if self.exit_code_response_map.is_empty() {
                    return Err(self.missing("exit_code_response_map"));
                }
                let prompt = self.prompt(identity, agents, built)?;
                Ok(Task::Check(CheckTask::new(
                    prompt,
                    self.exit_code_response_map.clone(),
                )))
            }
            YamlTaskType::Workflow => {
                let start = self
                    .start_task
                    .clone()
                    .ok_or_else(|| self.missing("start_task"))?;

                let mut builder = WorkflowBuilder::new(identity)
                    .start(start)
                    .routing(self.tasks_end_code_routing.clone())
                    .max_attempts(self.max_attempts)
                    .recursive(self.recursive);
                for (name, key) in &self.tasks {
                    builder = builder.task(name.clone(), self.contained(key, built)?);
                }
                Ok(Task::Workflow(builder.build()?))
            }
        }
    }

    /// Leaf part of prompt and check entries: agent, capabilities, tools.
    fn prompt(
        &self,
        identity: TaskIdentity,
        agents: &dyn AgentProvider,
        built: &HashMap<String, Arc<Task>>,
    ) -> Result<PromptAgentTask, CatalogError> {
        let mut prompt = PromptAgentTask::new(identity, self.bind_agent(agents)?)
            .with_capabilities(self.capabilities);
        for (name, key) in &self.tasks {
            prompt = prompt.with_tool(name.clone(), self.contained(key, built)?);
        }
        if !self.tasks.is_empty() && !self.capabilities.has_functions {
            tracing::warn!(task = %self.key, "tools declared for an agent without has_functions");
        }
        Ok(prompt)
    }

    fn contained(
        &self,
        key: &str,
        built: &HashMap<String, Arc<Task>>,
    ) -> Result<Arc<Task>, CatalogError> {
        built
            .get(key)
            .map(Arc::clone)
            .ok_or_else(|| CatalogError::UnknownTask {
                owner: self.key.clone(),
                task: key.to_string(),
            })
    }

    fn identity(
        &self,
        parameters: &HashMap<&str, &ParameterDefinition>,
    ) -> Result<TaskIdentity, CatalogError> {
        let mut identity = TaskIdentity::new(self.key.clone(), self.task_name.clone())
            .description(self.task_description.clone());
        identity.required_apis = self.required_apis.clone();
        identity.exit_codes.extend(self.exit_codes.clone());

        if let Some(variables) = &self.input_variables {
            let mut schema = InputSchema::new();
            for (name, property) in &variables.properties {
                let definition = match property {
                    YamlProperty::Inline(definition) => definition.clone(),
                    YamlProperty::Reference(reference) => parameters
                        .get(reference.as_str())
                        .map(|definition| (*definition).clone())
                        .ok_or_else(|| CatalogError::UnknownParameter {
                            task: self.key.clone(),
                            parameter: reference.clone(),
                        })?,
                };
                schema = schema.property(name.clone(), definition);
            }
            schema.required = variables.required.clone();
            identity = identity.input_schema(schema);
        }

        Ok(identity)
    }

    fn bind_agent(&self, agents: &dyn AgentProvider) -> Result<Arc<dyn Agent>, CatalogError> {
        let key = self.agent.as_deref().ok_or_else(|| self.missing("agent"))?;
        agents.agent(key).ok_or_else(|| CatalogError::UnknownAgent {
            task: self.key.clone(),
            agent: key.to_string(),
        })
    }

    fn missing(&self, field: &str) -> CatalogError {
        CatalogError::MissingField {
            task: self.key.clone(),
            field: field.to_string(),
        }
    }
}

/// Loads a catalog from a YAML file.
///
/// # Example
///
/// ```ignore
/// use taskweave::catalog::load_catalog_from_file;
///
/// let catalog = load_catalog_from_file(Path::new("tasks.yaml"), &agents).await?;
/// ```
pub async fn load_catalog_from_file(
    path: &Path,
    agents: &dyn AgentProvider,
) -> Result<TaskCatalog, CatalogError> {
    let content = tokio::fs::read_to_string(path).await?;
    load_catalog_from_string(&content, agents)
}

/// Loads a catalog from a YAML string.
pub fn load_catalog_from_string(
    yaml: &str,
    agents: &dyn AgentProvider,
) -> Result<TaskCatalog, CatalogError> {
    let catalog: YamlCatalog = serde_yaml::from_str(yaml)?;
    catalog.build(agents)
}
