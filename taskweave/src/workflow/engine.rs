//! Routing/retry interpreter for [`Workflow`].

use crate::error::TaskFault;
use crate::response::{TaskResponse, CODE_FAILURE, CODE_SUCCESS};
use crate::task::{ExecutionContext, Task, TaskInputs};
use crate::workflow::Workflow;
use serde_json::Value;
use std::sync::Arc;

/// Deepest nesting of workflow calls allowed for recursive workflows.
pub const MAX_CALL_DEPTH: usize = 32;

/// Prefix of the environment keys that carry sub-task outputs.
const OUTPUTS_PREFIX: &str = "outputs_";

/// Result of a single engine step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepOutcome {
    /// A sub-task ran and the run moved on to its route target
    Continue,
    /// The run reached a `None` route
    Completed,
    /// The run stopped; the string is the diagnostic
    Failed(String),
}

/// Per-execution state of one workflow run.
pub struct WorkflowRun {
    context: ExecutionContext,
    current: Option<String>,
    attempt_count: u32,
    history: Vec<TaskResponse>,
    environment: TaskInputs,
}

impl WorkflowRun {
    /// Name of the node that will run next, if any.
    pub fn current_task(&self) -> Option<&str> {
        self.current.as_deref()
    }

    /// Retry hops taken so far.
    pub fn attempt_count(&self) -> u32 {
        self.attempt_count
    }

    /// Responses of the sub-tasks executed so far, in order.
    pub fn history(&self) -> &[TaskResponse] {
        &self.history
    }

    /// Workflow inputs plus `outputs_<name>` for each node run so far.
    pub fn environment(&self) -> &TaskInputs {
        &self.environment
    }

    fn record(&mut self, name: &str, response: TaskResponse) {
        let outputs = response.output_text().map_or(Value::Null, Value::String);
        self.environment
            .insert(format!("{}{}", OUTPUTS_PREFIX, name), outputs);
        self.history.push(response);
    }
}

impl Workflow {
    /// Starts a run of this workflow under `context`.
    ///
    /// `inputs` seed the value environment that sub-task inputs are drawn
    /// from.
    pub fn start(&self, context: &ExecutionContext, inputs: &TaskInputs) -> WorkflowRun {
        WorkflowRun {
            context: context.enter(self.key()),
            current: Some(self.start_task().to_string()),
            attempt_count: 0,
            history: Vec::new(),
            environment: inputs.clone(),
        }
    }

    /// Executes at most one sub-task and advances the run.
    pub async fn step(&self, run: &mut WorkflowRun) -> Result<StepOutcome, TaskFault> {
        let Some(current) = run.current.clone() else {
            return Ok(StepOutcome::Completed);
        };

        if run.context.is_cancelled() {
            return Ok(StepOutcome::Failed("workflow cancelled".to_string()));
        }

        if run.attempt_count >= self.max_attempts() {
            return Ok(StepOutcome::Failed(format!(
                "max attempts exceeded ({} of {})",
                run.attempt_count,
                self.max_attempts()
            )));
        }

        let Some(task) = self.lookup(&run.context, &current)? else {
            return Ok(StepOutcome::Failed(format!(
                "unresolvable task reference '{}'",
                current
            )));
        };

        if let Some(nested) = task.as_workflow() {
            if run.context.is_active(nested.key()) && !nested.is_recursive() {
                return Ok(StepOutcome::Failed(format!(
                    "recursive workflow execution is not allowed: '{}'",
                    nested.key()
                )));
            }
            if run.context.depth() >= MAX_CALL_DEPTH {
                return Ok(StepOutcome::Failed(format!(
                    "maximum workflow call depth {} exceeded at '{}'",
                    MAX_CALL_DEPTH,
                    nested.key()
                )));
            }
        }

        let inputs = task.identity().input_schema.select_from(&run.environment);
        let response = task.execute(&run.context, &inputs).await?;
        let code = response.result_code;
        run.record(&current, response);

        let Some(route) = self.route(&current, code) else {
            return Ok(StepOutcome::Failed(format!(
                "no routing entry for exit code {} of task '{}'",
                code, current
            )));
        };

        if route.is_retry {
            run.attempt_count += 1;
        }
        tracing::debug!(
            workflow = %self.key(),
            task = %current,
            code,
            next = ?route.next,
            retry = route.is_retry,
            attempts = run.attempt_count,
            "routed"
        );
        run.current = route.next.clone();
        Ok(StepOutcome::Continue)
    }

    /// Builds the workflow response for a finished run.
    ///
    /// A run handed over on `Continue` has not reached an end route and is
    /// reported as failed.
    pub fn finish(&self, run: WorkflowRun, outcome: StepOutcome, inputs: &TaskInputs) -> TaskResponse {
        let identity = self.identity.response_identity();
        let diagnostic = match outcome {
            StepOutcome::Completed => {
                let outputs = run.history.last().and_then(|last| last.task_outputs.clone());
                return TaskResponse::completed(identity, inputs.clone(), CODE_SUCCESS, outputs, None)
                    .with_history(run.history);
            }
            StepOutcome::Continue => format!(
                "workflow run stopped before completion at '{}'",
                run.current.as_deref().unwrap_or_default()
            ),
            StepOutcome::Failed(diagnostic) => diagnostic,
        };
        tracing::warn!(workflow = %self.key(), diagnostic = %diagnostic, "workflow failed");
        TaskResponse::failure(identity, inputs.clone(), CODE_FAILURE, diagnostic)
            .with_history(run.history)
    }

    /// Drives a run to completion.
    pub(crate) async fn run(
        &self,
        context: &ExecutionContext,
        prepared: &TaskInputs,
        recorded: &TaskInputs,
    ) -> Result<TaskResponse, TaskFault> {
        tracing::info!(
            workflow = %self.key(),
            start = %self.start_task(),
            max_attempts = self.max_attempts(),
            depth = context.depth(),
            "workflow started"
        );

        let mut run = self.start(context, prepared);
        let outcome = loop {
            match self.step(&mut run).await? {
                StepOutcome::Continue => continue,
                finished => break finished,
            }
        };

        let response = self.finish(run, outcome, recorded);
        tracing::info!(
            workflow = %self.key(),
            code = response.result_code,
            steps = response.history_len(),
            "workflow finished"
        );
        Ok(response)
    }

    /// Local sub-task first, then the injected resolver.
    fn lookup(&self, context: &ExecutionContext, name: &str) -> Result<Option<Arc<Task>>, TaskFault> {
        if let Some(task) = self.tasks().get(name) {
            return Ok(Some(Arc::clone(task)));
        }
        Ok(context.resolver().resolve(name)?)
    }
}
