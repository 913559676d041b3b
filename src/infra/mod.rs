//! Infrastructure adapters and runtime bootstrap.

pub mod db;
pub mod error;
pub mod media;
pub mod telemetry;
