//! Infrastructure adapters and runtime bootstrap.

pub mod access;
pub mod blocks;
pub mod error;
pub mod layout;
pub mod telemetry;
pub mod title;
