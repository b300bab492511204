//! Report Aggregators (component C5) — one per topic, run in the fixed
//! order given by [`codepulse_core::model::REPORT_TOPICS`].

use codepulse_core::model::{CodeAnalysisChunk, ReportSections, REPORT_TOPICS};

use crate::client::{InvokeRequest, LlmClient, REPORT_READ_TIMEOUT};
use crate::prompts::{aggregator_system_prompt, NO_INFORMATION_SENTINEL};
use crate::Result;

fn topic_field(chunk: &CodeAnalysisChunk, topic: &str) -> Option<&str> {
    match topic {
        "data_model" => chunk.data_model.as_deref(),
        "interfaces" => chunk.interfaces.as_deref(),
        "business_logic" => chunk.business_logic.as_deref(),
        "dependencies" => chunk.dependencies.as_deref(),
        "configuration" => chunk.configuration.as_deref(),
        "infrastructure" => chunk.infrastructure.as_deref(),
        "non_functional" => chunk.non_functional.as_deref(),
        other => panic!("unknown report topic: {other}"),
    }
}

fn set_section(sections: &mut ReportSections, topic: &str, value: String) {
    match topic {
        "data_model" => sections.data_model = Some(value),
        "interfaces" => sections.interfaces = Some(value),
        "business_logic" => sections.business_logic = Some(value),
        "dependencies" => sections.dependencies = Some(value),
        "configuration" => sections.configuration = Some(value),
        "infrastructure" => sections.infrastructure = Some(value),
        "non_functional" => sections.non_functional = Some(value),
        other => panic!("unknown report topic: {other}"),
    }
}

/// Concatenate one topic's per-chunk fragments with the `Chunk <id>:`
/// separator, skipping chunks whose topic is absent (§4.5 step 1).
fn concatenate_fragments(chunks: &[CodeAnalysisChunk], topic: &str) -> String {
    let mut out = String::new();
    for chunk in chunks {
        if let Some(fragment) = topic_field(chunk, topic) {
            if !out.is_empty() {
                out.push_str("\n\n");
            }
            out.push_str(&format!("Chunk {}:\n{}", chunk.chunk_id, fragment));
        }
    }
    out
}

/// Run one aggregator by topic name. Exposed separately from
/// [`aggregate_all`] so the Workflow Engine can commit a checkpoint after
/// each of the seven `report_*` nodes individually.
pub async fn aggregate_topic(
    client: &LlmClient,
    chunks: &[CodeAnalysisChunk],
    topic: &str,
) -> Result<String> {
    let concatenated = concatenate_fragments(chunks, topic);
    if concatenated.trim().is_empty() {
        return Ok(NO_INFORMATION_SENTINEL.to_string());
    }

    let system = aggregator_system_prompt(topic);
    let request = InvokeRequest::new(system, concatenated, REPORT_READ_TIMEOUT).with_max_tokens(8192);
    client.invoke(request).await.map_err(Into::into)
}

/// Run all seven aggregators in the fixed order and write each result into
/// its field of `ReportSections`.
pub async fn aggregate_all(
    client: &LlmClient,
    chunks: &[CodeAnalysisChunk],
) -> Result<ReportSections> {
    let mut sections = ReportSections::default();
    for topic in REPORT_TOPICS {
        let report = aggregate_topic(client, chunks, topic).await?;
        set_section(&mut sections, topic, report);
    }
    Ok(sections)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(id: &str, data_model: Option<&str>) -> CodeAnalysisChunk {
        CodeAnalysisChunk {
            chunk_id: id.to_string(),
            summary: "s".to_string(),
            data_model: data_model.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn concatenates_only_populated_topics() {
        let chunks = vec![chunk("c1", Some("User has id")), chunk("c2", None)];
        let out = concatenate_fragments(&chunks, "data_model");
        assert_eq!(out, "Chunk c1:\nUser has id");
    }

    #[test]
    fn empty_concatenation_yields_empty_string() {
        let chunks = vec![chunk("c1", None)];
        let out = concatenate_fragments(&chunks, "data_model");
        assert!(out.is_empty());
    }
}
