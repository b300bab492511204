//! Consolidator (component C6) — the LLM-driven half: deriving the
//! product-requirements document from the consolidated report assembled by
//! [`codepulse_core::consolidate`].

use std::collections::HashSet;

use codepulse_core::consolidate;
use codepulse_core::model::ReportSections;

use crate::client::{InvokeRequest, LlmClient, REPORT_READ_TIMEOUT};
use crate::prompts::{EMPTY_CONSOLIDATED_REPORT_SENTINEL, PRODUCT_REQUIREMENTS_SYSTEM};
use crate::Result;

/// Assemble the consolidated report (pure, no LLM call).
pub fn consolidate_report(
    repo_url: &str,
    languages_used: &HashSet<String>,
    sections: &ReportSections,
) -> String {
    consolidate::assemble(repo_url, languages_used, sections)
}

/// Derive the product-requirements document from an already-assembled
/// consolidated report. Returns the sentinel message without calling the
/// LLM when the report is empty or whitespace-only (§4.6).
pub async fn derive_product_requirements(
    client: &LlmClient,
    consolidated_report: &str,
) -> Result<String> {
    if consolidated_report.trim().is_empty() {
        return Ok(EMPTY_CONSOLIDATED_REPORT_SENTINEL.to_string());
    }

    let request = InvokeRequest::new(
        PRODUCT_REQUIREMENTS_SYSTEM,
        consolidated_report.to_string(),
        REPORT_READ_TIMEOUT,
    )
    .with_max_tokens(8192);
    client.invoke(request).await.map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_report_skips_llm_call() {
        let config = crate::client::LlmConfig {
            model: "m".to_string(),
            region: None,
            api_key: None,
            endpoint: Some("http://127.0.0.1:0".to_string()),
        };
        let client = LlmClient::new(config);
        let prd = derive_product_requirements(&client, "   ").await.unwrap();
        assert_eq!(prd, EMPTY_CONSOLIDATED_REPORT_SENTINEL);
    }
}
