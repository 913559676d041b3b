//! Domain layer types and invariants.

pub mod content;
pub mod directives;
pub mod error;
