//! # thema-refinement
//!
//! Iterative judge-supervised refinement of a seeded group partition:
//! the orchestrator loop, its three phases, the per-call retry policy,
//! and the LLM-backed judge implementation.

pub mod engine;
pub mod judge;
pub mod phases;
pub mod retry;

pub use engine::{CancelHandle, RefinementEngine};
pub use judge::LlmJudge;
