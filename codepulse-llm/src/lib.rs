//! CodePulse LLM — the LLM Client Layer (C9) and the four pipeline stages
//! built on top of it: the Chunker's planning call (C3), the Per-Chunk
//! Analyzer (C4), the seven Report Aggregators (C5), and the
//! product-requirements half of the Consolidator (C6).
//!
//! Every call site funnels through [`client::LlmClient::invoke`], which
//! owns retries, timeouts and structured-output validation; the stage
//! modules only own prompt construction and response interpretation.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod aggregator;
pub mod analyzer;
pub mod chunker;
pub mod client;
pub mod consolidator;
mod json_extract;
pub mod prompts;
pub mod provider;

pub use client::{InvokeRequest, LlmClient, LlmConfig};
pub use provider::{AnthropicProvider, GeminiProvider, LlmProvider, OpenAiCompatibleProvider};

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("request timed out after {seconds}s")]
    Timeout { seconds: u64 },

    #[error("LLM provider returned a server error response: {0}")]
    ProviderError(String),

    #[error("LLM provider rejected the request: {0}")]
    ClientError(String),

    #[error("LLM response was not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("structured-output validation failed: {0}")]
    Schema(String),

    #[error("planning prompt exceeds the LLM's context window even after comment stripping")]
    ContextTooLarge,

    #[error("core pipeline error: {0}")]
    Core(#[from] codepulse_core::Error),
}
