//! Common test utilities for taskweave integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use taskweave::{
    Agent, AgentError, Message, ResolveError, ResolvedApis, ResponseStore, StoreError,
    StoredTaskResponse, Task, TaskInputs, TaskResolver, TaskResponse, UsageMetrics,
};

/// One scripted agent turn.
#[derive(Clone, Debug)]
pub enum Reply {
    Text(&'static str),
    Empty,
    Error(&'static str),
    Panic(&'static str),
}

/// Agent that plays back a script of replies, then repeats the last one.
pub struct ScriptedAgent {
    name: String,
    script: Mutex<VecDeque<Reply>>,
    last: Mutex<Reply>,
    usage: Option<UsageMetrics>,
    /// Inputs of every call, in order
    pub calls: Mutex<Vec<TaskInputs>>,
}

impl ScriptedAgent {
    pub fn new(name: &str, script: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(script.into()),
            last: Mutex::new(Reply::Empty),
            usage: None,
            calls: Mutex::new(Vec::new()),
        })
    }

    /// Agent that answers with the given texts, in order.
    pub fn texts(name: &str, texts: &[&'static str]) -> Arc<Self> {
        Self::new(name, texts.iter().map(|t| Reply::Text(*t)).collect())
    }

    /// Agent whose messages report `tokens` total tokens each.
    pub fn metered(name: &str, texts: &[&'static str], tokens: u64) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            script: Mutex::new(texts.iter().map(|t| Reply::Text(*t)).collect()),
            last: Mutex::new(Reply::Empty),
            usage: Some(UsageMetrics {
                total_tokens: tokens,
                ..UsageMetrics::default()
            }),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Agent for ScriptedAgent {
    async fn generate(
        &self,
        inputs: &TaskInputs,
        _apis: &ResolvedApis,
    ) -> Result<Vec<Message>, AgentError> {
        self.calls.lock().unwrap().push(inputs.clone());
        let reply = {
            let next = self.script.lock().unwrap().pop_front();
            let mut last = self.last.lock().unwrap();
            if let Some(next) = next {
                *last = next;
            }
            last.clone()
        };

        match reply {
            Reply::Text(text) => {
                let mut message = Message::assistant(text).generated_by(self.name.clone());
                if let Some(usage) = &self.usage {
                    message = message.with_usage(usage.clone());
                }
                Ok(vec![message])
            }
            Reply::Empty => Ok(Vec::new()),
            Reply::Error(e) => Err(AgentError::GenerationFailed(e.to_string())),
            Reply::Panic(msg) => panic!("{}", msg),
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Builds an agent provider from named agents.
///
/// A `search_tool` agent backing the research catalog's tools is added
/// unless the list provides one.
pub fn agents(list: Vec<(&str, Arc<ScriptedAgent>)>) -> HashMap<String, Arc<dyn Agent>> {
    let mut provider: HashMap<String, Arc<dyn Agent>> = list
        .into_iter()
        .map(|(key, agent)| (key.to_string(), agent as Arc<dyn Agent>))
        .collect();
    provider
        .entry("search_tool".to_string())
        .or_insert_with(|| ScriptedAgent::texts("search_tool", &["search results"]) as Arc<dyn Agent>);
    provider
}

/// Resolver over a fixed set of tasks that counts lookups per name.
pub struct RecordingResolver {
    tasks: HashMap<String, Arc<Task>>,
    pub lookups: Mutex<Vec<String>>,
}

impl RecordingResolver {
    pub fn new(tasks: Vec<Task>) -> Arc<Self> {
        Arc::new(Self {
            tasks: tasks
                .into_iter()
                .map(|t| (t.key().to_string(), Arc::new(t)))
                .collect(),
            lookups: Mutex::new(Vec::new()),
        })
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }
}

impl TaskResolver for RecordingResolver {
    fn resolve(&self, name: &str) -> Result<Option<Arc<Task>>, ResolveError> {
        self.lookups.lock().unwrap().push(name.to_string());
        Ok(self.tasks.get(name).cloned())
    }
}

/// Resolver whose backend is always down.
pub struct BrokenResolver;

impl TaskResolver for BrokenResolver {
    fn resolve(&self, name: &str) -> Result<Option<Arc<Task>>, ResolveError> {
        Err(ResolveError::LookupFailed {
            name: name.to_string(),
            reason: "catalog backend unreachable".to_string(),
        })
    }
}

/// Resolver that panics on every lookup.
pub struct PanickingResolver;

impl TaskResolver for PanickingResolver {
    fn resolve(&self, name: &str) -> Result<Option<Arc<Task>>, ResolveError> {
        panic!("resolver crashed looking up '{}'", name)
    }
}

/// Store that rejects everything and counts attempts.
#[derive(Default)]
pub struct FailingStore {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl ResponseStore for FailingStore {
    async fn store(&self, _response: TaskResponse) -> Result<StoredTaskResponse, StoreError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Rejected("disk full".to_string()))
    }
}

/// Builds task inputs from a JSON object literal.
pub fn inputs(value: serde_json::Value) -> TaskInputs {
    value.as_object().cloned().unwrap_or_default()
}

/// Research catalog used across the integration tests.
///
/// `plan_workflow` is deliberately not a sub-task of `research_workflow`.
pub const RESEARCH_CATALOG: &str = r#"
parameters:
  - key: prompt_parameter
    type: string
    description: The input prompt for the task
  - key: outputs_research_brief_task
    type: string
    description: The research brief created based on the user prompt
  - key: outputs_research_check_task
    type: string
    description: The conclusion of the data retrieval check
  - key: outputs_data_retrieval_task
    type: string
    description: The research data retrieval task output

tasks:
  - key: research_brief_task
    task_type: PromptAgentTask
    task_name: research_brief_task
    task_description: Takes a simple prompt and generates a research brief
    agent: brief_specialist
    required_apis: [llm_api]
    input_variables:
      type: object
      properties:
        prompt: prompt_parameter
      required: [prompt]

  - key: wikipedia_search
    task_type: PromptAgentTask
    task_name: wikipedia_search
    task_description: Searches Wikipedia
    agent: search_tool
    required_apis: [search_api]

  - key: arxiv_search
    task_type: PromptAgentTask
    task_name: arxiv_search
    task_description: Searches arXiv
    agent: search_tool
    required_apis: [search_api]

  - key: data_retrieval_task
    task_type: PromptAgentTask
    task_name: data_retrieval_task
    task_description: Generates tool calls for data retrieval based on the brief
    agent: data_retrieval_expert
    required_apis: [llm_api]
    capabilities:
      has_functions: true
    tasks:
      wikipedia_search: wikipedia_search
      arxiv_search: arxiv_search
    input_variables:
      type: object
      properties:
        outputs_research_brief_task: outputs_research_brief_task
        outputs_research_check_task: outputs_research_check_task
      required: [outputs_research_brief_task]

  - key: research_check_task
    task_type: CheckTask
    task_name: research_check_task
    task_description: Checks the data retrieval results
    agent: research_check
    exit_code_response_map: {APPROVED: 0, REJECTED: 2}
    exit_codes:
      0: Data retrieval approved
      1: Response generation failed
      2: Data retrieval rejected
    input_variables:
      type: object
      properties:
        outputs_research_brief_task: outputs_research_brief_task
        outputs_data_retrieval_task: outputs_data_retrieval_task
      required: [outputs_data_retrieval_task, outputs_research_brief_task]

  - key: research_summary_task
    task_type: PromptAgentTask
    task_name: research_summary_task
    task_description: Summarizes the retrieved data
    agent: research_summarizer_agent
    input_variables:
      type: object
      properties:
        prompt: prompt_parameter
        outputs_data_retrieval_task: outputs_data_retrieval_task
      required: [prompt, outputs_data_retrieval_task]

  - key: plan_workflow
    task_type: PromptAgentTask
    task_name: plan_workflow
    task_description: Fallback planner
    agent: planner

  - key: research_workflow
    task_type: Workflow
    task_name: research_workflow
    task_description: Executes the research workflow based on a string prompt
    tasks:
      research_brief_task: research_brief_task
      data_retrieval_task: data_retrieval_task
      research_check_task: research_check_task
      research_summary_task: research_summary_task
    start_task: research_brief_task
    tasks_end_code_routing:
      research_brief_task:
        0: [data_retrieval_task, false]
        1: [plan_workflow, true]
      data_retrieval_task:
        0: [research_check_task, false]
        1: [data_retrieval_task, true]
      research_check_task:
        0: [research_summary_task, false]
        1: [research_check_task, true]
        2: [research_summary_task, true]
      research_summary_task:
        0: [null, false]
        1: [research_summary_task, true]
    max_attempts: 3
    recursive: false
    input_variables:
      type: object
      properties:
        prompt: prompt_parameter
      required: [prompt]
"#;
