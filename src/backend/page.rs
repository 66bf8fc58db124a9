use async_trait::async_trait;

use super::error::BackendResult;

pub type PageBox<T> = Box<dyn RemotePage<T>>;

/// One page of a backend list query plus the means to request its successor.
#[async_trait]
pub trait RemotePage<T>: Send + Sync {
    fn items(&self) -> &[T];

    /// Continuation signal: whether the backend holds more results.
    fn has_next_page(&self) -> bool;

    async fn next_page(&self) -> BackendResult<PageBox<T>>;
}
