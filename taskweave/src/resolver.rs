//! Lookup of tasks by name outside a workflow's own sub-tasks.
//!
//! Workflows may route to a task they do not own (e.g. a failure path that
//! hands off to a differently scoped fallback workflow). Such names are
//! resolved through an injected [`TaskResolver`] at run time.

use crate::error::ResolveError;
use crate::task::Task;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Resolves task names that a workflow does not define locally.
pub trait TaskResolver: Send + Sync {
    /// Looks up a task by name.
    ///
    /// `Ok(None)` means the name is unknown; `Err` means the lookup itself
    /// broke and is treated as a fault.
    fn resolve(&self, name: &str) -> Result<Option<Arc<Task>>, ResolveError>;
}

/// Resolver that knows no tasks.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoResolver;

impl TaskResolver for NoResolver {
    fn resolve(&self, _name: &str) -> Result<Option<Arc<Task>>, ResolveError> {
        Ok(None)
    }
}

/// Immutable set of materialized tasks, keyed by task key.
#[derive(Clone, Default)]
pub struct TaskCatalog {
    tasks: BTreeMap<String, Arc<Task>>,
}

impl TaskCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a task under its own key, replacing any previous entry.
    pub fn insert(&mut self, task: Arc<Task>) -> Option<Arc<Task>> {
        self.tasks.insert(task.key().to_string(), task)
    }

    /// Builder-style insertion.
    pub fn with(mut self, task: Task) -> Self {
        self.insert(Arc::new(task));
        self
    }

    /// Returns the task registered under `key`.
    pub fn get(&self, key: &str) -> Option<&Arc<Task>> {
        self.tasks.get(key)
    }

    /// Iterates over task keys in sorted order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tasks.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl std::fmt::Debug for TaskCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskCatalog")
            .field("tasks", &self.tasks.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl TaskResolver for TaskCatalog {
    fn resolve(&self, name: &str) -> Result<Option<Arc<Task>>, ResolveError> {
        Ok(self.tasks.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::{Agent, Message, ResolvedApis};
    use crate::error::AgentError;
    use crate::task::{PromptAgentTask, TaskIdentity, TaskInputs};
    use async_trait::async_trait;

    struct Silent;

    #[async_trait]
    impl Agent for Silent {
        async fn generate(
            &self,
            _inputs: &TaskInputs,
            _apis: &ResolvedApis,
        ) -> Result<Vec<Message>, AgentError> {
            Ok(Vec::new())
        }

        fn name(&self) -> &str {
            "silent"
        }
    }

    fn prompt_task(key: &str) -> Task {
        Task::Prompt(PromptAgentTask::new(TaskIdentity::new(key, key), Arc::new(Silent)))
    }

    #[test]
    fn test_no_resolver_knows_nothing() {
        assert!(NoResolver.resolve("anything").unwrap().is_none());
    }

    #[test]
    fn test_catalog_resolves_by_key() {
        let catalog = TaskCatalog::new()
            .with(prompt_task("research_brief_task"))
            .with(prompt_task("plan_workflow"));

        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.keys().collect::<Vec<_>>(),
            vec!["plan_workflow", "research_brief_task"]
        );
        let found = catalog.resolve("plan_workflow").unwrap().unwrap();
        assert_eq!(found.key(), "plan_workflow");
        assert!(catalog.resolve("missing").unwrap().is_none());
    }

    #[test]
    fn test_insert_replaces() {
        let mut catalog = TaskCatalog::new();
        assert!(catalog.insert(Arc::new(prompt_task("a"))).is_none());
        assert!(catalog.insert(Arc::new(prompt_task("a"))).is_some());
        assert_eq!(catalog.len(), 1);
    }
}
