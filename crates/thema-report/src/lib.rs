//! # thema-report
//!
//! Renders a terminal `RefinementState` into a human-readable markdown
//! document: relevant groups worst-rated first with representative
//! evidence, irrelevant groups and unassignable reviews never omitted.

pub mod markdown;

pub use markdown::{render_report, write_report};
