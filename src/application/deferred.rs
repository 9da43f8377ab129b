//! Lazily forced build steps scoped to a cache slot.

use std::fmt;
use std::future::Future;

use futures::future::{BoxFuture, FutureExt};

use crate::application::error::ComposeError;
use crate::domain::cacheability::CacheKeys;

type Thunk<T> = Box<dyn FnOnce() -> BoxFuture<'static, Result<T, ComposeError>> + Send>;

/// A build step that runs only when forced.
///
/// `keys` names the cache slot whose miss justifies forcing it; a caller
/// holding a valid entry for those keys drops the value instead.
pub struct Deferred<T> {
    keys: CacheKeys,
    thunk: Thunk<T>,
}

impl<T: Send + 'static> Deferred<T> {
    pub fn new<F, Fut>(keys: CacheKeys, build: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<T, ComposeError>> + Send + 'static,
    {
        Self {
            keys,
            thunk: Box::new(move || build().boxed()),
        }
    }

    pub fn keys(&self) -> &CacheKeys {
        &self.keys
    }

    pub async fn force(self) -> Result<T, ComposeError> {
        (self.thunk)().await
    }
}

impl<T> fmt::Debug for Deferred<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Deferred")
            .field("keys", &self.keys)
            .finish_non_exhaustive()
    }
}
