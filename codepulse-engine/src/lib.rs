//! CodePulse Engine — the Workflow Engine (C7) and its Checkpoint Store
//! (C8): a linear, checkpointed dispatcher over the node sequence defined
//! in `node`, backed by the `sled` store in `checkpoint`.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod checkpoint;
pub mod engine;
pub mod node;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use engine::{WorkflowEngine, DEFAULT_TIMEOUT};
pub use node::NodeId;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("core pipeline error: {0}")]
    Core(#[from] codepulse_core::Error),
    #[error("LLM stage error: {0}")]
    Llm(#[from] codepulse_llm::LlmError),
    #[error("checkpoint store error: {0}")]
    Store(#[from] sled::Error),
    #[error("checkpoint serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("unknown thread_id: {0}")]
    UnknownThread(String),
    #[error("node requires a working directory that is not available in this process")]
    MissingWorkingRoot,
}
