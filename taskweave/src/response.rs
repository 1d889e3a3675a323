//! Task execution outcome records.
//!
//! A [`TaskResponse`] is only ever produced once a task has either completed
//! or been forced to fail. The constructors here are the only way to build
//! one, so a response is never observed half-populated.

use crate::agent::Message;
use crate::task::TaskInputs;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::AddAssign;

/// Result code conventionally meaning success.
pub const CODE_SUCCESS: u32 = 0;

/// Generic failure code shared by every task variant.
pub const CODE_FAILURE: u32 = 1;

/// Lifecycle status of a task response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Recorded but not yet finished
    Pending,
    /// Finished with result code 0
    Success,
    /// Finished with a non-zero result code, or forced to fail
    Failed,
}

impl TaskStatus {
    /// Status implied by a result code.
    pub fn from_code(result_code: u32) -> Self {
        if result_code == CODE_SUCCESS {
            TaskStatus::Success
        } else {
            TaskStatus::Failed
        }
    }

    /// Returns true for success and failed.
    pub fn is_terminal(self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Token and cost accounting for one or more generations.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct UsageMetrics {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    #[serde(default)]
    pub cost: f64,
}

impl AddAssign<&UsageMetrics> for UsageMetrics {
    fn add_assign(&mut self, other: &UsageMetrics) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
        self.cost += other.cost;
    }
}

impl UsageMetrics {
    /// Sums every present entry, returning `None` when nothing was reported.
    pub fn sum<'a>(items: impl IntoIterator<Item = Option<&'a UsageMetrics>>) -> Option<Self> {
        let mut total: Option<UsageMetrics> = None;
        for usage in items.into_iter().flatten() {
            *total.get_or_insert_with(UsageMetrics::default) += usage;
        }
        total
    }
}

/// Immutable record of one task execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskResponse {
    pub task_id: String,
    pub task_name: String,
    pub task_description: String,
    pub status: TaskStatus,
    pub result_code: u32,
    pub task_outputs: Option<Vec<Message>>,
    pub task_inputs: TaskInputs,
    pub result_diagnostic: Option<String>,
    pub usage_metrics: Option<UsageMetrics>,
    /// Child responses in execution order (workflows only)
    pub execution_history: Option<Vec<TaskResponse>>,
    pub created_at: DateTime<Utc>,
}

/// Identity fields copied onto every response a task produces.
#[derive(Clone, Debug)]
pub struct ResponseIdentity {
    pub task_id: String,
    pub task_name: String,
    pub task_description: String,
}

impl TaskResponse {
    /// Builds a completed response with result code 0.
    pub fn success(
        identity: ResponseIdentity,
        inputs: TaskInputs,
        outputs: Vec<Message>,
    ) -> Self {
        Self::completed(identity, inputs, CODE_SUCCESS, Some(outputs), None)
    }

    /// Builds a failed response with no outputs.
    pub fn failure(
        identity: ResponseIdentity,
        inputs: TaskInputs,
        result_code: u32,
        diagnostic: impl Into<String>,
    ) -> Self {
        // Code 0 on a failure would read as success downstream.
        let code = if result_code == CODE_SUCCESS {
            CODE_FAILURE
        } else {
            result_code
        };
        Self::completed(identity, inputs, code, None, Some(diagnostic.into()))
    }

    /// Builds a response whose status is derived from `result_code`.
    ///
    /// Used by variants whose non-zero codes are routing signals that still
    /// carry outputs (check tasks).
    pub fn completed(
        identity: ResponseIdentity,
        inputs: TaskInputs,
        result_code: u32,
        outputs: Option<Vec<Message>>,
        diagnostic: Option<String>,
    ) -> Self {
        let usage_metrics = outputs
            .as_ref()
            .and_then(|messages| UsageMetrics::sum(messages.iter().map(|m| m.usage.as_ref())));

        Self {
            task_id: identity.task_id,
            task_name: identity.task_name,
            task_description: identity.task_description,
            status: TaskStatus::from_code(result_code),
            result_code,
            task_outputs: outputs,
            task_inputs: inputs,
            result_diagnostic: diagnostic,
            usage_metrics,
            execution_history: None,
            created_at: Utc::now(),
        }
    }

    /// Attaches a workflow run history, replacing usage with the run total.
    pub fn with_history(mut self, history: Vec<TaskResponse>) -> Self {
        self.usage_metrics = UsageMetrics::sum(history.iter().map(|r| r.usage_metrics.as_ref()));
        self.execution_history = Some(history);
        self
    }

    /// Returns true if the task finished with result code 0.
    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }

    /// Concatenated text content of the outputs, one message per line.
    pub fn output_text(&self) -> Option<String> {
        self.task_outputs.as_ref().map(|messages| {
            messages
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n")
        })
    }

    /// Number of entries in the execution history.
    pub fn history_len(&self) -> usize {
        self.execution_history.as_ref().map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn identity() -> ResponseIdentity {
        ResponseIdentity {
            task_id: "t".to_string(),
            task_name: "Task".to_string(),
            task_description: "A task".to_string(),
        }
    }

    #[test]
    fn test_failure_never_reports_code_zero() {
        let response = TaskResponse::failure(identity(), TaskInputs::new(), 0, "boom");
        assert_eq!(response.result_code, CODE_FAILURE);
        assert_eq!(response.status, TaskStatus::Failed);
        assert!(response.task_outputs.is_none());
        assert_eq!(response.result_diagnostic.as_deref(), Some("boom"));
    }

    #[test]
    fn test_completed_derives_status_from_code() {
        let ok = TaskResponse::completed(identity(), TaskInputs::new(), 0, Some(vec![]), None);
        let alt = TaskResponse::completed(identity(), TaskInputs::new(), 2, Some(vec![]), None);

        assert_eq!(ok.status, TaskStatus::Success);
        assert_eq!(alt.status, TaskStatus::Failed);
        assert!(alt.task_outputs.is_some());
    }

    #[test]
    fn test_usage_summed_from_messages() {
        let usage = UsageMetrics {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
            cost: 0.5,
        };
        let messages = vec![
            Message::assistant("a").with_usage(usage.clone()),
            Message::assistant("b").with_usage(usage),
            Message::assistant("c"),
        ];

        let response = TaskResponse::success(identity(), TaskInputs::new(), messages);
        let total = response.usage_metrics.unwrap();
        assert_eq!(total.total_tokens, 30);
        assert_eq!(total.prompt_tokens, 20);
        assert!((total.cost - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_usage_absent_when_not_reported() {
        let response = TaskResponse::success(identity(), TaskInputs::new(), vec![Message::assistant("x")]);
        assert!(response.usage_metrics.is_none());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&TaskStatus::Success).unwrap();
        assert_eq!(json, "\"success\"");
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Pending.is_terminal());
    }

    #[test]
    fn test_output_text_joins_messages() {
        let response = TaskResponse::success(
            identity(),
            TaskInputs::new(),
            vec![Message::assistant("line one"), Message::assistant("line two")],
        );
        assert_eq!(response.output_text().unwrap(), "line one\nline two");
    }
}
