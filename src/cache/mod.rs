//! Render cache contract.
//!
//! The composer never stores anything itself. It looks entries up through a
//! [`RenderCache`] supplied by the host and offers finished nodes back to it
//! through [`StagedWrites`], which are flushed only after a page build has
//! completed successfully.

mod staging;
mod store;

pub use staging::{CacheWrite, StagedWrites};
pub use store::RenderCache;
