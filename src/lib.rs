//! Block page composition: place configured blocks into regions, evaluate
//! access, and assemble a cacheable render tree whose cache tags, contexts
//! and max-age bubble up from every contributing block.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
