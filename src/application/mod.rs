//! Application services: page composition and the collaborator ports it
//! consumes.

pub mod block_renderer;
pub mod composer;
pub mod deferred;
pub mod error;
pub mod ports;

pub use block_renderer::{BlockRenderer, CONTENT_SLOT};
pub use composer::{ComposerConfig, FinalizedPage, PageComposer, PageRegions, PageShell};
pub use deferred::Deferred;
pub use error::{AppError, CollaboratorError, ComposeError, ErrorReport};
pub use ports::{AccessEvaluator, BlockPlugin, BlockPlugins, TitleRenderer};
