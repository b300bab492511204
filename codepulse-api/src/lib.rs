//! CodePulse API — the HTTP API (component C10), a thin `axum` surface
//! over the Workflow Engine. Handlers deserialize, call into the engine or
//! checkpoint store, and serialize; all error mapping lives in `error`.

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod error;
pub mod routes;

pub use routes::{router, AppState};
