//! Per-Chunk Analyzer (component C4).
//!
//! Invoked once per [`CodeChunk`], sequentially, in the order produced by
//! the chunker (§5: no intra-thread parallelism across chunks).

use codepulse_core::model::{CodeAnalysisChunk, CodeChunk};

use crate::client::{InvokeRequest, LlmClient, REPORT_READ_TIMEOUT};
use crate::prompts::CHUNK_ANALYSIS_SYSTEM;
use crate::Result;

/// Chunk content beyond this token count is logged in full for forensics
/// before the call is issued (§4.4). No request is ever rejected on this
/// basis — it is observability only.
pub const FORENSIC_LOG_THRESHOLD: usize = 150_000;

/// Cap on how much of an over-threshold chunk's content is logged verbatim;
/// the full files/content are logged "for forensics" (§4.4) but a 150k+
/// token chunk is still too large to dump whole into a log line.
const FORENSIC_LOG_CHAR_LIMIT: usize = 20_000;

fn build_prompt(chunk: &CodeChunk) -> String {
    format!(
        "chunk_id: {}\ndescription: {}\nfiles:\n{}\n\ncontent:{}",
        chunk.chunk_id,
        chunk.description,
        chunk.files.join("\n"),
        chunk.content
    )
}

/// Analyze one chunk. If the LLM returns a different `chunk_id` than the
/// one requested, the id is overwritten and a warning logged (§4.4).
pub async fn analyze_chunk(client: &LlmClient, chunk: &CodeChunk) -> Result<CodeAnalysisChunk> {
    let prompt = build_prompt(chunk);
    let token_count = codepulse_core::chunk::count_tokens(&prompt);
    if token_count > FORENSIC_LOG_THRESHOLD {
        tracing::warn!(
            chunk_id = %chunk.chunk_id,
            token_count,
            files = ?chunk.files,
            content = %codepulse_utils::string::truncate_for_log(&chunk.content, FORENSIC_LOG_CHAR_LIMIT),
            "chunk input exceeds forensic logging threshold"
        );
    }

    let request = InvokeRequest::new(CHUNK_ANALYSIS_SYSTEM, prompt, REPORT_READ_TIMEOUT)
        .with_max_tokens(8192);
    let mut analyzed: CodeAnalysisChunk = client.invoke_structured(request).await?;

    if analyzed.chunk_id != chunk.chunk_id {
        tracing::warn!(
            requested = %chunk.chunk_id,
            returned = %analyzed.chunk_id,
            "analyzer returned a mismatched chunk_id; overwriting"
        );
        analyzed.chunk_id = chunk.chunk_id.clone();
    }

    Ok(analyzed)
}

/// Analyze every chunk in order, accumulating results. A failure on any
/// chunk is fatal and aborts the remaining chunks (§4.4: "Failures in a
/// single chunk are fatal to the workflow").
pub async fn analyze_chunks(client: &LlmClient, chunks: &[CodeChunk]) -> Result<Vec<CodeAnalysisChunk>> {
    let mut analyzed = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        analyzed.push(analyze_chunk(client, chunk).await?);
    }
    Ok(analyzed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::LlmConfig;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn build_prompt_embeds_chunk_fields() {
        let chunk = CodeChunk {
            chunk_id: "c1".to_string(),
            description: "auth module".to_string(),
            files: vec!["auth.py".to_string()],
            content: "def login(): pass".to_string(),
        };
        let prompt = build_prompt(&chunk);
        assert!(prompt.contains("c1"));
        assert!(prompt.contains("auth module"));
        assert!(prompt.contains("def login()"));
    }

    #[tokio::test]
    async fn mismatched_chunk_id_is_repaired() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "{\"chunk_id\": \"wrong-id\", \"summary\": \"auth\"}"}}]
            })))
            .mount(&server)
            .await;

        let client = LlmClient::new(LlmConfig {
            model: "test".to_string(),
            region: None,
            api_key: None,
            endpoint: Some(server.uri()),
        });
        let chunk = CodeChunk {
            chunk_id: "requested-id".to_string(),
            description: "auth module".to_string(),
            files: vec!["auth.py".to_string()],
            content: "def login(): pass".to_string(),
        };

        let analyzed = analyze_chunk(&client, &chunk).await.unwrap();
        assert_eq!(analyzed.chunk_id, "requested-id");
    }
}
