//! Domain layer types and invariants.

pub mod access;
pub mod block;
pub mod cacheability;
pub mod error;
pub mod page;
pub mod region;
pub mod render;
