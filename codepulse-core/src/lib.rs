//! CodePulse Core — repository acquisition, structural extraction and chunking.
//!
//! This crate provides the non-LLM half of the analysis pipeline:
//! - the data model shared by every stage (`model`)
//! - exclusion-rule matching used by acquisition and extraction (`exclusion`)
//! - the Repository Acquirer, C1 (`acquirer`)
//! - the Structural Extractor, C2 (`extractor`)
//! - the Chunker's non-LLM half: simplified structure, glob expansion,
//!   content realization, C3 (`chunk`)
//! - the Consolidator's non-LLM half: heading renumbering and section
//!   assembly, C6 (`consolidate`)

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod acquirer;
pub mod chunk;
pub mod consolidate;
pub mod exclusion;
pub mod extractor;
pub mod model;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Analysis error: {0}")]
    Analysis(String),

    #[error("External tool error: {tool}: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("Operation timed out after {seconds} seconds")]
    Timeout { seconds: u64 },

    #[error("Utility error: {0}")]
    Util(#[from] codepulse_utils::UtilError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
