//! The fixed linear node sequence driven by [`crate::WorkflowEngine`].

use codepulse_core::model::AnalysisState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeId {
    AcquireRepo,
    ExtractAndChunk,
    AnalyzeChunks,
    ReportDataModel,
    ReportInterfaces,
    ReportBusinessLogic,
    ReportDependencies,
    ReportConfiguration,
    ReportInfrastructure,
    ReportNonFunctional,
    Consolidate,
    ProductRequirements,
    End,
}

impl NodeId {
    pub const fn step_name(self) -> &'static str {
        match self {
            Self::AcquireRepo => "acquire_repo",
            Self::ExtractAndChunk => "extract_and_chunk",
            Self::AnalyzeChunks => "analyze_chunks",
            Self::ReportDataModel => "report_data_model",
            Self::ReportInterfaces => "report_interfaces",
            Self::ReportBusinessLogic => "report_business_logic",
            Self::ReportDependencies => "report_dependencies",
            Self::ReportConfiguration => "report_configuration",
            Self::ReportInfrastructure => "report_infrastructure",
            Self::ReportNonFunctional => "report_non_functional",
            Self::Consolidate => "consolidate",
            Self::ProductRequirements => "product_requirements",
            Self::End => "end",
        }
    }

    pub fn from_step_name(name: &str) -> Option<Self> {
        Some(match name {
            "acquire_repo" => Self::AcquireRepo,
            "extract_and_chunk" => Self::ExtractAndChunk,
            "analyze_chunks" => Self::AnalyzeChunks,
            "report_data_model" => Self::ReportDataModel,
            "report_interfaces" => Self::ReportInterfaces,
            "report_business_logic" => Self::ReportBusinessLogic,
            "report_dependencies" => Self::ReportDependencies,
            "report_configuration" => Self::ReportConfiguration,
            "report_infrastructure" => Self::ReportInfrastructure,
            "report_non_functional" => Self::ReportNonFunctional,
            "consolidate" => Self::Consolidate,
            "product_requirements" => Self::ProductRequirements,
            "end" => Self::End,
            _ => return None,
        })
    }

    /// The node immediately following this one in the fixed sequence.
    pub const fn next(self) -> Self {
        match self {
            Self::AcquireRepo => Self::ExtractAndChunk,
            Self::ExtractAndChunk => Self::AnalyzeChunks,
            Self::AnalyzeChunks => Self::ReportDataModel,
            Self::ReportDataModel => Self::ReportInterfaces,
            Self::ReportInterfaces => Self::ReportBusinessLogic,
            Self::ReportBusinessLogic => Self::ReportDependencies,
            Self::ReportDependencies => Self::ReportConfiguration,
            Self::ReportConfiguration => Self::ReportInfrastructure,
            Self::ReportInfrastructure => Self::ReportNonFunctional,
            Self::ReportNonFunctional => Self::Consolidate,
            Self::Consolidate => Self::ProductRequirements,
            Self::ProductRequirements => Self::End,
            Self::End => Self::End,
        }
    }

    /// The `ReportSections` topic this node writes, if it is a `report_*` node.
    pub const fn topic(self) -> Option<&'static str> {
        match self {
            Self::ReportDataModel => Some("data_model"),
            Self::ReportInterfaces => Some("interfaces"),
            Self::ReportBusinessLogic => Some("business_logic"),
            Self::ReportDependencies => Some("dependencies"),
            Self::ReportConfiguration => Some("configuration"),
            Self::ReportInfrastructure => Some("infrastructure"),
            Self::ReportNonFunctional => Some("non_functional"),
            _ => None,
        }
    }

    /// Determine the next node to run by examining which `AnalysisState`
    /// fields are already populated (§4.7: resumption fallback when a
    /// recorded `step_name` is unavailable or to validate it). Treats an
    /// empty `ingested_repo_chunks` as "chunking not yet run" — a
    /// deliberately conservative choice since a genuinely file-less repo is
    /// no more expensive to re-chunk than to distinguish from one that
    /// simply hasn't been chunked yet.
    pub fn from_state(state: &AnalysisState) -> Self {
        if state.file_structure.is_empty() {
            return Self::AcquireRepo;
        }
        if state.ingested_repo_chunks.is_empty() {
            return Self::ExtractAndChunk;
        }
        if state.analyzed_code_chunks.is_empty() {
            return Self::AnalyzeChunks;
        }
        let sections = &state.report_sections;
        if sections.data_model.is_none() {
            return Self::ReportDataModel;
        }
        if sections.interfaces.is_none() {
            return Self::ReportInterfaces;
        }
        if sections.business_logic.is_none() {
            return Self::ReportBusinessLogic;
        }
        if sections.dependencies.is_none() {
            return Self::ReportDependencies;
        }
        if sections.configuration.is_none() {
            return Self::ReportConfiguration;
        }
        if sections.infrastructure.is_none() {
            return Self::ReportInfrastructure;
        }
        if sections.non_functional.is_none() {
            return Self::ReportNonFunctional;
        }
        if state.consolidated_report.is_empty() {
            return Self::Consolidate;
        }
        if state.product_requirements.is_empty() {
            return Self::ProductRequirements;
        }
        Self::End
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_name_round_trips() {
        for node in [
            NodeId::AcquireRepo,
            NodeId::ExtractAndChunk,
            NodeId::AnalyzeChunks,
            NodeId::ReportDataModel,
            NodeId::ReportNonFunctional,
            NodeId::Consolidate,
            NodeId::ProductRequirements,
            NodeId::End,
        ] {
            assert_eq!(NodeId::from_step_name(node.step_name()), Some(node));
        }
    }

    #[test]
    fn next_is_monotonic_and_terminates_at_end() {
        let mut node = NodeId::AcquireRepo;
        for _ in 0..20 {
            if node == NodeId::End {
                break;
            }
            node = node.next();
        }
        assert_eq!(node, NodeId::End);
    }

    #[test]
    fn from_state_picks_first_unpopulated_field() {
        let state = AnalysisState::new("https://example.com/repo.git");
        assert_eq!(NodeId::from_state(&state), NodeId::AcquireRepo);

        let mut state = state;
        state.file_structure = "tree".to_string();
        assert_eq!(NodeId::from_state(&state), NodeId::ExtractAndChunk);
    }
}
