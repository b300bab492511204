//! Workflow Engine (component C7) — a linear directed graph with a single
//! entry and exit, dispatched by a `match` over [`NodeId`] rather than a
//! graph-orchestration crate (§4.7 design note).

use std::path::PathBuf;
use std::time::Duration;

use codepulse_core::model::AnalysisState;
use codepulse_llm::LlmClient;

use crate::checkpoint::CheckpointStore;
use crate::node::NodeId;
use crate::{EngineError, Result};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2 * 60 * 60);

pub struct WorkflowEngine {
    llm: LlmClient,
    store: CheckpointStore,
    timeout: Duration,
}

impl WorkflowEngine {
    pub fn new(llm: LlmClient, store: CheckpointStore, timeout: Duration) -> Self {
        Self { llm, store, timeout }
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.store
    }

    /// Start a fresh analysis thread from `repo_url`.
    pub async fn run(&self, thread_id: &str, repo_url: &str) -> Result<AnalysisState> {
        let state = AnalysisState::new(repo_url);
        self.run_from(thread_id, state, NodeId::AcquireRepo).await
    }

    /// Resume an existing thread from its latest committed checkpoint.
    pub async fn resume(&self, thread_id: &str) -> Result<AnalysisState> {
        let checkpoint = self
            .store
            .latest(thread_id)?
            .ok_or_else(|| EngineError::UnknownThread(thread_id.to_string()))?;
        let next = NodeId::from_state(&checkpoint.state);
        self.run_from(thread_id, checkpoint.state, next).await
    }

    /// Drive `state` through the node sequence starting at `start`,
    /// committing a checkpoint after every node. Stops (without error) at
    /// the configured total timeout, leaving the latest commit intact
    /// (§4.7, §5 cancellation semantics).
    async fn run_from(&self, thread_id: &str, mut state: AnalysisState, start: NodeId) -> Result<AnalysisState> {
        let deadline = tokio::time::Instant::now() + self.timeout;
        let mut node = start;
        let mut root: Option<PathBuf> = None;

        while node != NodeId::End {
            if tokio::time::Instant::now() >= deadline {
                tracing::warn!(thread_id, step = node.step_name(), "workflow timeout reached; stopping");
                break;
            }

            state = self.run_node(node, state, &mut root).await?;
            self.store.put(thread_id, node.step_name(), &state)?;
            node = node.next();
        }

        Ok(state)
    }

    async fn run_node(
        &self,
        node: NodeId,
        mut state: AnalysisState,
        root: &mut Option<PathBuf>,
    ) -> Result<AnalysisState> {
        match node {
            NodeId::AcquireRepo => {
                let acquired = codepulse_core::acquirer::RepositoryAcquirer::acquire(&state.repo_url).await?;
                state.file_structure = acquired.file_structure;
                state.languages_used = acquired.languages_used.into_iter().collect();
                *root = Some(acquired.root);
            }
            NodeId::ExtractAndChunk => {
                if root.is_none() {
                    // Resuming in a fresh process: the prior process's temp
                    // working directory is gone, so re-acquire it. AcquireRepo
                    // is idempotent and `file_structure`/`languages_used` are
                    // already committed, so they are not overwritten here.
                    tracing::info!("working root unavailable on resume; re-acquiring repository");
                    let acquired = codepulse_core::acquirer::RepositoryAcquirer::acquire(&state.repo_url).await?;
                    *root = Some(acquired.root);
                }
                let root_path = root.as_deref().ok_or(EngineError::MissingWorkingRoot)?;
                let files = codepulse_core::exclusion::walk_included_files(root_path);
                let records = codepulse_core::extractor::extract_all(root_path, &files);
                let chunks = codepulse_llm::chunker::plan_and_realize_chunks(
                    &self.llm,
                    root_path,
                    &state.file_structure,
                    &records,
                )
                .await?;
                state.ingested_repo_chunks = chunks;
            }
            NodeId::AnalyzeChunks => {
                let analyzed =
                    codepulse_llm::analyzer::analyze_chunks(&self.llm, &state.ingested_repo_chunks).await?;
                state.merge_analyzed_chunks(analyzed);
            }
            NodeId::ReportDataModel
            | NodeId::ReportInterfaces
            | NodeId::ReportBusinessLogic
            | NodeId::ReportDependencies
            | NodeId::ReportConfiguration
            | NodeId::ReportInfrastructure
            | NodeId::ReportNonFunctional => {
                let topic = node.topic().expect("report node always has a topic");
                let report = codepulse_llm::aggregator::aggregate_topic(
                    &self.llm,
                    &state.analyzed_code_chunks,
                    topic,
                )
                .await?;
                write_section(&mut state, topic, report);
            }
            NodeId::Consolidate => {
                state.consolidated_report = codepulse_llm::consolidator::consolidate_report(
                    &state.repo_url,
                    &state.languages_used,
                    &state.report_sections,
                );
            }
            NodeId::ProductRequirements => {
                state.product_requirements =
                    codepulse_llm::consolidator::derive_product_requirements(&self.llm, &state.consolidated_report)
                        .await?;
            }
            NodeId::End => {}
        }
        Ok(state)
    }
}

fn write_section(state: &mut AnalysisState, topic: &str, value: String) {
    let sections = &mut state.report_sections;
    match topic {
        "data_model" => sections.data_model = Some(value),
        "interfaces" => sections.interfaces = Some(value),
        "business_logic" => sections.business_logic = Some(value),
        "dependencies" => sections.dependencies = Some(value),
        "configuration" => sections.configuration = Some(value),
        "infrastructure" => sections.infrastructure = Some(value),
        "non_functional" => sections.non_functional = Some(value),
        other => unreachable!("unknown report topic: {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codepulse_core::model::AnalysisState;
    use codepulse_llm::{LlmClient, LlmConfig};
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chat_body(content: serde_json::Value) -> serde_json::Value {
        serde_json::json!({ "choices": [{ "message": { "content": content.to_string() } }] })
    }

    fn markdown_body(markdown: &str) -> serde_json::Value {
        serde_json::json!({ "choices": [{ "message": { "content": markdown } }] })
    }

    /// A process restart between `AnalyzeChunks` committing and
    /// `ReportDataModel` committing must resume straight into the report
    /// stages without re-invoking the per-chunk analyzer (§5, testable
    /// property P5).
    #[tokio::test]
    async fn resume_does_not_redo_analyze_chunks() {
        let repo_dir = tempfile::tempdir().unwrap();
        std::fs::write(repo_dir.path().join("a.py"), "def foo():\n    pass\n").unwrap();

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("partitioning a"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(serde_json::json!({
                "chunks": [{"chunk_id": "c1", "description": "d", "files": ["a.py"]}]
            }))))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("analyzing one chunk"))
            .respond_with(ResponseTemplate::new(200).set_body_json(chat_body(serde_json::json!({
                "chunk_id": "c1", "summary": "s", "data_model": "dm"
            }))))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("technical writer producing"))
            .respond_with(ResponseTemplate::new(200).set_body_json(markdown_body("# Report\nbody")))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(body_string_contains("product manager deriving"))
            .respond_with(ResponseTemplate::new(200).set_body_json(markdown_body("# PRD")))
            .mount(&server)
            .await;

        let store_dir = tempfile::tempdir().unwrap();
        let llm_config = || LlmConfig {
            model: "test".to_string(),
            region: None,
            api_key: None,
            endpoint: Some(server.uri()),
        };
        let thread_id = "thread-1";

        {
            let store = CheckpointStore::open(store_dir.path().to_str().unwrap(), "codepulse").unwrap();
            let llm = LlmClient::new(llm_config());
            let engine = WorkflowEngine::new(llm, store, Duration::from_secs(60));

            // Drive the first three nodes directly, then drop the engine —
            // simulating a process kill right after AnalyzeChunks commits.
            let mut state = AnalysisState::new(repo_dir.path().to_str().unwrap());
            let mut root: Option<PathBuf> = None;
            for node in [NodeId::AcquireRepo, NodeId::ExtractAndChunk, NodeId::AnalyzeChunks] {
                state = engine.run_node(node, state, &mut root).await.unwrap();
                engine.checkpoints().put(thread_id, node.step_name(), &state).unwrap();
            }
            assert_eq!(state.analyzed_code_chunks.len(), 1);
        }

        let store = CheckpointStore::open(store_dir.path().to_str().unwrap(), "codepulse").unwrap();
        let llm = LlmClient::new(llm_config());
        let engine = WorkflowEngine::new(llm, store, Duration::from_secs(60));
        let resumed = engine.resume(thread_id).await.unwrap();

        assert_eq!(resumed.analyzed_code_chunks.len(), 1);
        assert!(resumed.report_sections.data_model.is_some());
        assert!(!resumed.product_requirements.is_empty());
    }
}
