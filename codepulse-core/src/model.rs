//! Shared data model for the analysis pipeline.
//!
//! These types mirror the pydantic models the original implementation
//! carried in `app/code_analysis/agents/states/code_analysis.py` and
//! `app/code_analysis/models/code_analysis.py`, translated into plain
//! serde structs.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

/// A feature-oriented grouping of repository files, as produced by the chunker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeChunk {
    pub chunk_id: String,
    pub description: String,
    /// Repo-relative paths, in the order they were realized.
    pub files: Vec<String>,
    /// Concatenated file contents, each preceded by a `--- <path> ---` header.
    pub content: String,
}

/// The LLM's structured analysis of a single `CodeChunk`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CodeAnalysisChunk {
    pub chunk_id: String,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_logic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_functional: Option<String>,
}

impl CodeAnalysisChunk {
    /// Fingerprint used by the state reducer to drop duplicate re-appends
    /// across a resumed `analyze_chunks` node. Matches the original's
    /// `unique_code_chunks_reducer`, which keys on `(business_logic, data_model)`.
    pub fn dedup_fingerprint(&self) -> (String, String) {
        (
            self.business_logic.clone().unwrap_or_default(),
            self.data_model.clone().unwrap_or_default(),
        )
    }
}

/// One aggregated markdown report per topic. Field order is the canonical
/// section order used by the consolidator.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReportSections {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interfaces: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub business_logic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub configuration: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infrastructure: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_functional: Option<String>,
}

impl ReportSections {
    /// Iterate the populated sections in canonical order, 1-based section index.
    pub fn populated(&self) -> Vec<(usize, &str)> {
        let slots: [(&str, &Option<String>); 7] = [
            ("data_model", &self.data_model),
            ("interfaces", &self.interfaces),
            ("business_logic", &self.business_logic),
            ("dependencies", &self.dependencies),
            ("configuration", &self.configuration),
            ("infrastructure", &self.infrastructure),
            ("non_functional", &self.non_functional),
        ];
        slots
            .iter()
            .filter_map(|(name, value)| value.as_deref().map(|v| (*name, v)))
            .enumerate()
            .map(|(i, (_, v))| (i + 1, v))
            .collect()
    }
}

/// Canonical topic identifiers, in aggregator execution order.
pub const REPORT_TOPICS: [&str; 7] = [
    "data_model",
    "interfaces",
    "business_logic",
    "dependencies",
    "configuration",
    "infrastructure",
    "non_functional",
];

/// The full working state of one analysis thread, filled monotonically as
/// the workflow engine drives it through each node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisState {
    pub repo_url: String,
    #[serde(default)]
    pub file_structure: String,
    #[serde(default)]
    pub languages_used: HashSet<String>,
    #[serde(default)]
    pub ingested_repo_chunks: Vec<CodeChunk>,
    #[serde(default)]
    pub analyzed_code_chunks: Vec<CodeAnalysisChunk>,
    #[serde(default)]
    pub report_sections: ReportSections,
    #[serde(default)]
    pub consolidated_report: String,
    #[serde(default)]
    pub product_requirements: String,
}

impl AnalysisState {
    pub fn new(repo_url: impl Into<String>) -> Self {
        Self {
            repo_url: repo_url.into(),
            ..Default::default()
        }
    }

    /// Merge freshly analyzed chunks into state, dropping any whose
    /// `(business_logic, data_model)` fingerprint already appears.
    pub fn merge_analyzed_chunks(&mut self, fresh: Vec<CodeAnalysisChunk>) {
        let mut seen: HashSet<(String, String)> = self
            .analyzed_code_chunks
            .iter()
            .map(CodeAnalysisChunk::dedup_fingerprint)
            .collect();
        for chunk in fresh {
            let fp = chunk.dedup_fingerprint();
            if seen.insert(fp) {
                self.analyzed_code_chunks.push(chunk);
            }
        }
    }
}

/// API request body for `POST /api/v1/code-analysis`.
#[derive(Debug, Clone, Deserialize)]
pub struct CodeAnalysisRequest {
    pub repo_url: String,
}

/// API response body for `POST /api/v1/code-analysis`.
#[derive(Debug, Clone, Serialize)]
pub struct CodeAnalysisResponse {
    pub thread_id: String,
}

/// Structured planning response returned by the chunking LLM call.
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkPlanResponse {
    pub chunks: Vec<ChunkPlanEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChunkPlanEntry {
    pub chunk_id: String,
    pub description: String,
    pub files: Vec<String>,
}

/// A compact, name-only (or name+comment) view of one file's structural
/// record, used to build the chunker's planning prompt without shipping
/// full file contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimplifiedFileEntry {
    pub path: String,
    pub functions: Vec<String>,
    pub classes: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comments: Option<Vec<String>>,
}

/// `{path -> SimplifiedFileEntry}`, serialized into the planning prompt.
/// A `BTreeMap`, not a `HashMap`: §4.3 step 1 requires files in
/// lexicographic order, and this map is serialized directly into the
/// prompt, so its iteration order must be deterministic.
pub type SimplifiedStructure = BTreeMap<String, SimplifiedFileEntry>;
