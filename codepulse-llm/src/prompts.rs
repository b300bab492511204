//! Fixed system prompts, one per call site (§4.9: "a fixed system prompt
//! per call site"). User prompts are built by the stage modules themselves
//! since they embed per-call data; only the invariant system half lives here.

pub const CHUNK_PLANNING_SYSTEM: &str = "You are a senior software architect partitioning a \
repository into feature-oriented chunks for downstream analysis. Given a file-structure tree \
and a simplified per-file structure (function names, class names, and optionally comments), \
produce a complete partition of the listed files into chunks grouped by feature or subsystem. \
A file may appear in more than one chunk when it is shared infrastructure. Respond with JSON \
only, matching exactly: {\"chunks\": [{\"chunk_id\": string, \"description\": string, \"files\": \
[string, ...]}]}. File entries may be literal paths or glob patterns relative to the repository \
root. Do not omit any file from the partition. Do not include any text outside the JSON object.";

pub const CHUNK_ANALYSIS_SYSTEM: &str = "You are a senior software engineer analyzing one chunk \
of a repository. Given the chunk's id, description, file list and concatenated content, produce \
a structured analysis. Respond with JSON only, matching exactly: {\"chunk_id\": string, \
\"summary\": string, \"data_model\": string|null, \"interfaces\": string|null, \
\"business_logic\": string|null, \"dependencies\": string|null, \"configuration\": string|null, \
\"infrastructure\": string|null, \"non_functional\": string|null}. Set a field to null when the \
topic does not apply to this chunk; otherwise it must be a non-empty string. The returned \
chunk_id must exactly equal the chunk_id you were given. Do not include any text outside the \
JSON object.";

/// One system prompt per aggregator topic, in [`codepulse_core::model::REPORT_TOPICS`] order.
pub fn aggregator_system_prompt(topic: &str) -> String {
    let title = topic_title(topic);
    format!(
        "You are a technical writer producing the \"{title}\" section of a repository analysis \
report. You will be given a sequence of per-chunk fragments, each preceded by its chunk id. \
Merge them into a single titled, markdown-formatted report: deduplicate repeated information, \
resolve contradictions in favor of the more specific statement, and organize the content with \
markdown headings and lists. Begin the report with a level-1 heading titled \"{title}\". Respond \
with the markdown report only, no surrounding commentary or code fences."
    )
}

pub fn topic_title(topic: &str) -> &'static str {
    match topic {
        "data_model" => "Data Model",
        "interfaces" => "Interfaces",
        "business_logic" => "Business Logic",
        "dependencies" => "Dependencies",
        "configuration" => "Configuration",
        "infrastructure" => "Infrastructure",
        "non_functional" => "Non-Functional Requirements",
        other => panic!("unknown report topic: {other}"),
    }
}

pub const PRODUCT_REQUIREMENTS_SYSTEM: &str = "You are a product manager deriving a product \
requirements document from a consolidated repository analysis report. Produce a markdown \
document with: an overview, a numbered list of features, each feature broken into numbered user \
stories, each story given BDD-style acceptance criteria (Given/When/Then), and a closing \
architecture-notes section. Respond with the markdown document only, no surrounding commentary \
or code fences.";

/// Sentinel written into a report section when its chunk fragments are
/// all empty/whitespace (§4.5 step 2).
pub const NO_INFORMATION_SENTINEL: &str = "No information found for this topic.";

/// Sentinel written into `product_requirements` when the consolidated
/// report is empty or absent (§4.6).
pub const EMPTY_CONSOLIDATED_REPORT_SENTINEL: &str =
    "No consolidated report was available to derive product requirements from.";
