//! taskweave - table-driven task and workflow interpreter.
//!
//! Tasks are prompt tasks (one agent call), check tasks (an agent call whose
//! answer is classified into a result code) and workflows (a routing table
//! over named sub-tasks). Workflows route on result codes, count retries
//! against an attempt budget, and can hand off to tasks they do not own
//! through an injected resolver.
//!
//! - [`task`]: task variants and the execution contract
//! - [`workflow`]: the routing/retry engine
//! - [`availability`]: advisory health check of required APIs
//! - [`executor`]: failure-safe boundary that always yields one stored response
//! - [`catalog`]: YAML catalog loader
//!
//! # Example
//!
//! ```ignore
//! use taskweave::{load_catalog_from_file, InMemoryApiRegistry, JsonFileResponseStore, TaskExecutor};
//!
//! let catalog = Arc::new(load_catalog_from_file(Path::new("tasks.yaml"), &agents).await?);
//! let executor = TaskExecutor::new(
//!     Arc::new(registry),
//!     catalog,
//!     Arc::new(JsonFileResponseStore::new(".taskweave/responses")),
//! );
//! let stored = executor.execute_by_key("research_workflow", inputs).await;
//! ```

pub mod agent;
pub mod api;
pub mod availability;
pub mod cancellation;
pub mod catalog;
pub mod error;
pub mod executor;
pub mod resolver;
pub mod response;
pub mod store;
pub mod task;
pub mod workflow;

pub use agent::{Agent, AgentProvider, Capabilities, Message, ResolvedApis, Role, Toolbox};
pub use api::{ApiConfig, ApiEntry, ApiHealth, ApiName, ApiRegistry, ApiStatus, InMemoryApiRegistry};
pub use availability::{check_availability, ApiCheckMessage, AvailabilityReport};
pub use cancellation::{CancellationToken, CancellationTokenSource};
pub use catalog::{load_catalog_from_file, load_catalog_from_string, YamlCatalog};
pub use error::{
    AgentError, ApiError, CatalogError, ResolveError, StoreError, TaskFault, WorkflowBuildError,
};
pub use executor::TaskExecutor;
pub use resolver::{NoResolver, TaskCatalog, TaskResolver};
pub use response::{TaskResponse, TaskStatus, UsageMetrics, CODE_FAILURE, CODE_SUCCESS};
pub use store::{InMemoryResponseStore, JsonFileResponseStore, ResponseStore, StoredTaskResponse};
pub use task::{
    CheckTask, ExecutionContext, InputSchema, ParameterDefinition, PromptAgentTask, Task,
    TaskIdentity, TaskInputs,
};
pub use workflow::{Route, StepOutcome, Workflow, WorkflowBuilder, WorkflowRun};
