//! Failure-safe entry point for running tasks.
//!
//! [`TaskExecutor`] is the only place where unmodeled faults are caught.
//! Whatever happens while looking up, checking or running a task (a
//! [`TaskFault`], a panic in an agent or resolver), the caller gets exactly
//! one response back, and that response has been offered to the store.

use crate::api::{ApiRegistry, ApiStatus};
use crate::availability::{check_availability, AvailabilityReport};
use crate::cancellation::CancellationToken;
use crate::error::TaskFault;
use crate::resolver::TaskResolver;
use crate::response::{ResponseIdentity, TaskResponse, CODE_FAILURE};
use crate::store::{ResponseStore, StoredTaskResponse};
use crate::task::{ExecutionContext, Task, TaskInputs};
use futures::FutureExt;
use std::any::Any;
use std::backtrace::Backtrace;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

/// Task name reported when `execute_by_key` cannot find the task.
pub const UNKNOWN_TASK_NAME: &str = "Unknown";

/// Runs tasks with availability logging, fault capture and persistence.
#[derive(Clone)]
pub struct TaskExecutor {
    registry: Arc<dyn ApiRegistry>,
    resolver: Arc<dyn TaskResolver>,
    store: Arc<dyn ResponseStore>,
    cancellation: Option<CancellationToken>,
}

impl TaskExecutor {
    pub fn new(
        registry: Arc<dyn ApiRegistry>,
        resolver: Arc<dyn TaskResolver>,
        store: Arc<dyn ResponseStore>,
    ) -> Self {
        Self {
            registry,
            resolver,
            store,
            cancellation: None,
        }
    }

    /// Makes every run started by this executor observe `token`.
    pub fn with_cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation = Some(token);
        self
    }

    /// Context for a fresh top-level execution.
    pub fn context(&self) -> ExecutionContext {
        let context = ExecutionContext::new(Arc::clone(&self.registry), Arc::clone(&self.resolver));
        match &self.cancellation {
            Some(token) => context.with_cancellation_token(token.clone()),
            None => context,
        }
    }

    /// Checks the APIs `task` depends on without running it.
    pub fn check(&self, task: &Task) -> AvailabilityReport {
        check_availability(task, self.registry.as_ref(), self.resolver.as_ref())
    }

    /// Runs `task` and stores its response.
    ///
    /// Never fails: faults and panics, including those raised by the
    /// availability check, become a failed response with result code 1.
    /// Store failures yield an unpersisted record.
    pub async fn execute(&self, task: &Task, inputs: TaskInputs) -> StoredTaskResponse {
        let context = self.context();
        let run = async {
            self.log_availability(task);
            task.execute(&context, &inputs).await
        };
        let response = guarded(run, task.identity().response_identity(), &inputs).await;
        self.persist(response).await
    }

    /// Resolves `key` through the resolver and runs the task.
    ///
    /// Unknown keys and lookup failures, panics included, produce a stored
    /// failure named [`UNKNOWN_TASK_NAME`].
    pub async fn execute_by_key(&self, key: &str, inputs: TaskInputs) -> StoredTaskResponse {
        let lookup = panic::catch_unwind(AssertUnwindSafe(|| self.resolver.resolve(key)));
        let diagnostic = match lookup {
            Ok(Ok(Some(task))) => return self.execute(&task, inputs).await,
            Ok(Ok(None)) => format!("Unknown task '{}'", key),
            Ok(Err(e)) => format!("Task lookup for '{}' failed: {}", key, e),
            Err(payload) => with_backtrace(&format!(
                "Task lookup for '{}' panicked: {}",
                key,
                panic_message(payload.as_ref())
            )),
        };

        tracing::error!(key, diagnostic = %diagnostic, "cannot execute task");
        let identity = ResponseIdentity {
            task_id: key.to_string(),
            task_name: UNKNOWN_TASK_NAME.to_string(),
            task_description: String::new(),
        };
        self.persist(TaskResponse::failure(identity, inputs, CODE_FAILURE, diagnostic))
            .await
    }

    fn log_availability(&self, task: &Task) {
        let report = self.check(task);
        match report.status {
            ApiStatus::Ok => {
                tracing::info!(task = %task.key(), apis = report.messages.len(), "all required APIs available");
            }
            ApiStatus::Warning => {
                for message in report.warnings() {
                    tracing::warn!(task = %task.key(), api = %message.api, message = %message.message, "API degraded");
                }
            }
            ApiStatus::Error => {
                for message in report.errors() {
                    tracing::error!(task = %task.key(), api = %message.api, message = %message.message, "API unavailable");
                }
                for message in report.warnings() {
                    tracing::warn!(task = %task.key(), api = %message.api, message = %message.message, "API degraded");
                }
            }
        }
    }

    async fn persist(&self, response: TaskResponse) -> StoredTaskResponse {
        let task_id = response.task_id.clone();
        match self.store.store(response.clone()).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::error!(task = %task_id, error = %e, "failed to store task response");
                StoredTaskResponse::unpersisted(response)
            }
        }
    }
}

impl std::fmt::Debug for TaskExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskExecutor")
            .field("cancellable", &self.cancellation.is_some())
            .finish_non_exhaustive()
    }
}

/// Awaits `run`, turning a fault or panic into a failed response for `identity`.
async fn guarded<F>(run: F, identity: ResponseIdentity, inputs: &TaskInputs) -> TaskResponse
where
    F: Future<Output = Result<TaskResponse, TaskFault>>,
{
    let diagnostic = match AssertUnwindSafe(run).catch_unwind().await {
        Ok(Ok(response)) => return response,
        Ok(Err(fault)) => {
            tracing::error!(task = %identity.task_id, error = %fault, "task raised a fault");
            fault_text(&fault)
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(task = %identity.task_id, panic = %message, "task panicked");
            format!("panic: {}", message)
        }
    };
    TaskResponse::failure(identity, inputs.clone(), CODE_FAILURE, with_backtrace(&diagnostic))
}

fn with_backtrace(fault: &str) -> String {
    format!("{}\n\nBacktrace:\n{}", fault, Backtrace::force_capture())
}

fn fault_text(fault: &TaskFault) -> String {
    match fault {
        TaskFault::Other(e) => format!("{:#}", e),
        other => other.to_string(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
