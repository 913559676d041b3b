//! Keyword-addressed topic and theme store.
//!
//! Lookups are served through a read-through cache in front of Postgres.
//! Images embedded in topic content are downloaded once and rewritten to
//! point at locally served copies.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
