//! Task that classifies an agent's answer into a routing code.

use crate::error::TaskFault;
use crate::response::{TaskResponse, CODE_FAILURE, CODE_SUCCESS};
use crate::task::prompt::{Generation, PromptAgentTask};
use crate::task::{ExecutionContext, TaskIdentity, TaskInputs};
use std::collections::BTreeMap;

/// Prompt task whose textual answer is mapped to a result code.
///
/// The last generated message is matched against the configured labels:
/// an exact (trimmed, case-insensitive) match wins, otherwise the label
/// that occurs earliest in the text. Text matching no label yields
/// `default_code`.
#[derive(Debug)]
pub struct CheckTask {
    pub(crate) prompt: PromptAgentTask,
    exit_code_response_map: BTreeMap<String, u32>,
    default_code: u32,
}

impl CheckTask {
    /// Creates a check task over a prompt task and a label → code map.
    pub fn new(prompt: PromptAgentTask, exit_code_response_map: BTreeMap<String, u32>) -> Self {
        Self {
            prompt,
            exit_code_response_map,
            default_code: CODE_FAILURE,
        }
    }

    /// Sets the code used when the answer matches no label.
    pub fn with_default_code(mut self, code: u32) -> Self {
        self.default_code = code;
        self
    }

    pub fn identity(&self) -> &TaskIdentity {
        &self.prompt.identity
    }

    pub fn exit_code_response_map(&self) -> &BTreeMap<String, u32> {
        &self.exit_code_response_map
    }

    /// Maps an answer to a result code, if any label matches.
    pub fn classify(&self, answer: &str) -> Option<u32> {
        let normalized = answer.trim().to_uppercase();

        if let Some(code) = self
            .exit_code_response_map
            .iter()
            .find(|(label, _)| label.to_uppercase() == normalized)
            .map(|(_, code)| *code)
        {
            return Some(code);
        }

        self.exit_code_response_map
            .iter()
            .filter_map(|(label, code)| {
                normalized
                    .find(&label.to_uppercase())
                    .map(|position| (position, *code))
            })
            .min_by_key(|(position, _)| *position)
            .map(|(_, code)| code)
    }

    pub(crate) async fn run(
        &self,
        context: &ExecutionContext,
        prepared: &TaskInputs,
        recorded: &TaskInputs,
    ) -> Result<TaskResponse, TaskFault> {
        let messages = match self.prompt.generate(context, prepared, recorded).await? {
            Generation::Messages(messages) => messages,
            Generation::Failed(response) => return Ok(response),
        };

        let answer = messages.last().map(|m| m.content.as_str()).unwrap_or_default();
        let identity = self.identity();
        let (code, diagnostic) = match self.classify(answer) {
            Some(CODE_SUCCESS) => (CODE_SUCCESS, None),
            Some(code) => (code, Some(identity.describe_code(code))),
            None => {
                let labels: Vec<&str> = self.exit_code_response_map.keys().map(String::as_str).collect();
                (
                    self.default_code,
                    Some(format!(
                        "Unrecognized check answer; expected one of {:?}",
                        labels
                    )),
                )
            }
        };

        tracing::info!(task = %identity.key, code, "check classified");
        Ok(TaskResponse::completed(
            identity.response_identity(),
            recorded.clone(),
            code,
            Some(messages),
            diagnostic,
        ))
    }
}
