//! Loading the research catalog from YAML.

mod common;

use common::{agents, ScriptedAgent, RESEARCH_CATALOG};
use std::collections::HashMap;
use std::sync::Arc;
use taskweave::catalog::{load_catalog_from_file, YamlCatalog, YamlTaskType};
use taskweave::{
    check_availability, Agent, ApiConfig, ApiEntry, ApiStatus, InMemoryApiRegistry, Route, Task,
};

fn provider() -> HashMap<String, Arc<dyn Agent>> {
    agents(
        [
            "brief_specialist",
            "data_retrieval_expert",
            "research_check",
            "research_summarizer_agent",
            "planner",
        ]
        .into_iter()
        .map(|key| (key, ScriptedAgent::texts(key, &["ok"])))
        .collect(),
    )
}

#[tokio::test]
async fn test_research_catalog_from_file() {
    let temp_dir = tempfile::TempDir::new().unwrap();
    let path = temp_dir.path().join("research.yaml");
    tokio::fs::write(&path, RESEARCH_CATALOG).await.unwrap();

    let catalog = load_catalog_from_file(&path, &provider()).await.unwrap();

    assert_eq!(
        catalog.keys().collect::<Vec<_>>(),
        vec![
            "arxiv_search",
            "data_retrieval_task",
            "plan_workflow",
            "research_brief_task",
            "research_check_task",
            "research_summary_task",
            "research_workflow",
            "wikipedia_search"
        ]
    );

    let workflow = catalog.get("research_workflow").unwrap().as_workflow().unwrap();
    assert_eq!(workflow.start_task(), "research_brief_task");
    assert_eq!(workflow.max_attempts(), 3);
    assert!(!workflow.is_recursive());
    assert_eq!(workflow.tasks().len(), 4);
    assert_eq!(
        workflow.route("research_brief_task", 1),
        Some(&Route::retry("plan_workflow"))
    );
    assert_eq!(
        workflow.route("research_check_task", 2),
        Some(&Route::retry("research_summary_task"))
    );
    assert_eq!(workflow.route("research_summary_task", 0), Some(&Route::end()));
    assert_eq!(workflow.external_references(), vec!["plan_workflow"]);
}

#[test]
fn test_research_catalog_document_round_trip() {
    let document: YamlCatalog = serde_yaml::from_str(RESEARCH_CATALOG).unwrap();
    let reparsed: YamlCatalog =
        serde_yaml::from_str(&serde_yaml::to_string(&document).unwrap()).unwrap();

    assert_eq!(reparsed.tasks.len(), document.tasks.len());
    assert_eq!(reparsed.parameters.len(), 4);
    let workflow = reparsed
        .tasks
        .iter()
        .find(|t| t.task_type == YamlTaskType::Workflow)
        .unwrap();
    assert_eq!(
        workflow.tasks_end_code_routing,
        document
            .tasks
            .iter()
            .find(|t| t.key == "research_workflow")
            .unwrap()
            .tasks_end_code_routing
    );

    let catalog = reparsed.build(&provider()).unwrap();
    assert_eq!(catalog.len(), 8);
}

#[test]
fn test_check_task_configuration() {
    let document: YamlCatalog = serde_yaml::from_str(RESEARCH_CATALOG).unwrap();
    let catalog = document.build(&provider()).unwrap();
    let check = catalog.get("research_check_task").unwrap();

    assert_eq!(check.kind(), "check");
    assert_eq!(check.identity().describe_code(2), "Data retrieval rejected");
    assert_eq!(
        check.identity().input_schema.required,
        vec![
            "outputs_data_retrieval_task".to_string(),
            "outputs_research_brief_task".to_string()
        ]
    );
}

#[test]
fn test_catalog_availability_walks_resolver_targets() {
    let catalog = serde_yaml::from_str::<YamlCatalog>(
        &RESEARCH_CATALOG.replace(
            "    task_description: Fallback planner\n",
            "    task_description: Fallback planner\n    required_apis: [planner_api]\n",
        ),
    )
    .unwrap()
    .build(&provider())
    .unwrap();
    let registry = InMemoryApiRegistry::new()
        .with("llm_api", ApiEntry::new(ApiConfig::default()).degraded("slow"));

    let workflow = catalog.get("research_workflow").unwrap();
    let report = check_availability(workflow, &registry, &catalog);

    assert_eq!(report.status, ApiStatus::Error);
    assert_eq!(report.warnings().count(), 1);
    // planner_api through the resolver, search_api through the retrieval tools.
    let errors: Vec<&str> = report.errors().map(|m| m.api.as_str()).collect();
    assert_eq!(errors, vec!["planner_api", "search_api"]);
}

#[test]
fn test_research_retrieval_tools() {
    let document: YamlCatalog = serde_yaml::from_str(RESEARCH_CATALOG).unwrap();
    let catalog = document.build(&provider()).unwrap();
    let Task::Prompt(retrieval) = &**catalog.get("data_retrieval_task").unwrap() else {
        panic!("data_retrieval_task should be a prompt task");
    };

    assert!(retrieval.capabilities().has_functions);
    assert_eq!(
        retrieval.tools().keys().collect::<Vec<_>>(),
        vec!["arxiv_search", "wikipedia_search"]
    );
    assert!(Arc::ptr_eq(
        &retrieval.tools()["arxiv_search"],
        catalog.get("arxiv_search").unwrap()
    ));
}
