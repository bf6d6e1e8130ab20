//! HTTP surface for leadpipe.
//!
//! The router is built separately from the binary so integration tests can
//! drive it in-process with mock search/model backends.

pub mod api;
pub mod envelope;

pub use api::{build_router, AppState};
