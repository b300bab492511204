//! Chunker (component C3) — the LLM-driven half: composing and issuing the
//! planning prompt, then handing the parsed plan back to
//! [`codepulse_core::chunk`] to expand globs and realize chunk content.

use std::path::Path;

use codepulse_core::chunk;
use codepulse_core::extractor::StructuralRecord;
use codepulse_core::model::{ChunkPlanResponse, CodeChunk};

use crate::client::{InvokeRequest, LlmClient, CHUNKER_READ_TIMEOUT};
use crate::prompts::CHUNK_PLANNING_SYSTEM;
use crate::{LlmError, Result};

/// Above this many prompt tokens, comments are stripped from the
/// simplified structure and the prompt is rebuilt once (§4.3 step 3).
pub const PROMPT_TOKEN_SOFT_LIMIT: usize = 100_000;

/// The provider's hard context window. A prompt still over this after
/// comment stripping is unrecoverable.
pub const HARD_CONTEXT_WINDOW: usize = 200_000;

fn build_prompt(file_structure: &str, structure: &codepulse_core::model::SimplifiedStructure) -> String {
    let structure_json = serde_json::to_string_pretty(structure)
        .unwrap_or_else(|_| "{}".to_string());
    format!(
        "Repository file structure:\n{file_structure}\n\nSimplified per-file structure (JSON):\n{structure_json}"
    )
}

/// Plan and realize the repository's chunks.
///
/// `file_structure` is the ASCII tree from the acquirer; `records` is the
/// extractor's output for every non-excluded file.
pub async fn plan_and_realize_chunks(
    client: &LlmClient,
    repo_root: &Path,
    file_structure: &str,
    records: &[(String, StructuralRecord)],
) -> Result<Vec<CodeChunk>> {
    let with_comments = chunk::build_simplified_structure(records, true);
    let mut prompt = build_prompt(file_structure, &with_comments);
    let mut token_count = chunk::count_tokens(&prompt);

    if token_count > PROMPT_TOKEN_SOFT_LIMIT {
        tracing::warn!(
            token_count,
            limit = PROMPT_TOKEN_SOFT_LIMIT,
            "planning prompt exceeds soft limit, rebuilding without comments"
        );
        let without_comments = chunk::build_simplified_structure(records, false);
        prompt = build_prompt(file_structure, &without_comments);
        token_count = chunk::count_tokens(&prompt);
    }

    if token_count > HARD_CONTEXT_WINDOW {
        tracing::error!(token_count, "planning prompt exceeds hard context window");
        return Err(LlmError::ContextTooLarge);
    }

    let request = InvokeRequest::new(CHUNK_PLANNING_SYSTEM, prompt, CHUNKER_READ_TIMEOUT)
        .with_max_tokens(8192);
    let plan: ChunkPlanResponse = client.invoke_structured(request).await?;

    let mut chunks = Vec::with_capacity(plan.chunks.len());
    for entry in plan.chunks {
        let chunk = chunk::realize_chunk(repo_root, entry.chunk_id, entry.description, &entry.files)?;
        chunks.push(chunk);
    }
    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_prompt_embeds_tree_and_structure() {
        let structure = codepulse_core::model::SimplifiedStructure::new();
        let prompt = build_prompt("├── a.py\n", &structure);
        assert!(prompt.contains("a.py"));
        assert!(prompt.contains("Simplified per-file structure"));
    }
}
