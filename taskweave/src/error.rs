//! Error types shared across the crate.
//!
//! Task-level failures (missing inputs, empty agent output, routing dead ends,
//! budget exhaustion) are *not* errors: they are carried as a non-zero
//! `result_code` on a [`TaskResponse`](crate::response::TaskResponse).
//! The enums here cover collaborator failures and the unmodeled faults
//! that only the executor boundary is allowed to swallow.

use thiserror::Error;

/// Failure reported by an agent capability.
#[derive(Error, Debug)]
pub enum AgentError {
    /// The underlying model or API call failed
    #[error("Generation failed: {0}")]
    GenerationFailed(String),

    /// The agent cannot serve the request with the inputs it was given
    #[error("Invalid agent input: {0}")]
    InvalidInput(String),

    /// Generic error wrapper
    #[error("Agent error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Errors from the API registry.
#[derive(Error, Debug)]
pub enum ApiError {
    /// API has no registry entry
    #[error("API not configured: {0}")]
    NotConfigured(String),

    /// API is registered but switched off
    #[error("API inactive: {0}")]
    Inactive(String),
}

/// Errors raised while resolving a task reference outside a workflow.
#[derive(Error, Debug)]
pub enum ResolveError {
    /// The lookup backend itself failed (not the same as "not found")
    #[error("Task lookup failed for '{name}': {reason}")]
    LookupFailed { name: String, reason: String },
}

/// Errors from a response store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Failed to serialize the response
    #[error("Serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    /// Failed to write the response
    #[error("Write failed: {0}")]
    WriteFailed(#[from] std::io::Error),

    /// Failed to create the storage directory
    #[error("Directory creation failed: {0}")]
    DirectoryFailed(String),

    /// Backend rejected the response
    #[error("Store rejected response: {0}")]
    Rejected(String),
}

/// Structural errors detected while building a workflow definition.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum WorkflowBuildError {
    /// Workflow has no sub-tasks
    #[error("Workflow '{0}' cannot be empty")]
    EmptyWorkflow(String),

    /// Start task is not one of the workflow's own tasks
    #[error("Start task '{start}' is not defined in workflow '{workflow}'")]
    UnknownStartTask { workflow: String, start: String },

    /// Routing table has an entry for a node the workflow does not own
    #[error("Routing entry for unknown task '{task}' in workflow '{workflow}'")]
    UnknownRoutingSource { workflow: String, task: String },

    /// Attempt budget must allow at least one retry-flagged hop
    #[error("max_attempts must be at least 1 (workflow '{0}')")]
    InvalidMaxAttempts(String),
}

/// Errors that can occur while loading a YAML task catalog.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Two catalog entries share a key
    #[error("Duplicate task key: {0}")]
    DuplicateKey(String),

    /// Missing required field for the task type
    #[error("Task '{task}' is missing required field '{field}'")]
    MissingField { task: String, field: String },

    /// Task references an agent the provider does not know
    #[error("Task '{task}' references unknown agent '{agent}'")]
    UnknownAgent { task: String, agent: String },

    /// Input property refers to an undeclared catalog parameter
    #[error("Task '{task}' references unknown parameter '{parameter}'")]
    UnknownParameter { task: String, parameter: String },

    /// Sub-task or tool map names a catalog key that does not exist
    #[error("Task '{owner}' references unknown task '{task}'")]
    UnknownTask { owner: String, task: String },

    /// Tasks contain each other through sub-task or tool maps
    #[error("Task containment cycle involving: {0:?}")]
    ContainmentCycle(Vec<String>),

    /// Workflow definition is structurally invalid
    #[error(transparent)]
    InvalidWorkflow(#[from] WorkflowBuildError),
}

/// Unmodeled fault raised during task execution.
///
/// Ordinary task failures never use this type. A `TaskFault` propagates
/// up through nested workflows untouched and is converted into a failed
/// response only by [`TaskExecutor`](crate::executor::TaskExecutor).
#[derive(Error, Debug)]
pub enum TaskFault {
    /// External task lookup failed
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// API registry failed while a task was resolving credentials
    #[error(transparent)]
    Api(#[from] ApiError),

    /// Generic error wrapper
    #[error("Task fault: {0}")]
    Other(#[from] anyhow::Error),
}
