//! Application services layer.

pub mod content;
pub mod error;
pub mod media;
pub mod publish;
pub mod repos;
pub mod search;
