//! Lazily extending, single-flight view over a paginated backend query.
//!
//! The cursor knows nothing about visibility: the presentation layer calls
//! [`PaginationCursor::fetch_next`] whenever its boundary sentinel becomes
//! visible, and the cursor coalesces signals that arrive while a fetch is
//! outstanding.

use std::{
    future::Future,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use futures::{future::BoxFuture, FutureExt};

use crate::backend::{
    error::{BackendError, BackendResult},
    page::{PageBox, RemotePage},
    timeout::with_timeout,
};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const CURSOR_FETCH_FAILED: &str = "CURSOR_FETCH_FAILED";

type PageFactory<T> = Arc<dyn Fn() -> BoxFuture<'static, BackendResult<PageBox<T>>> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    InFlight,
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    Fetched { appended: usize },
    Skipped(SkipReason),
    Failed(BackendError),
}

enum Source<T> {
    Factory(PageFactory<T>),
    Page(Arc<dyn RemotePage<T>>),
    Done,
}

enum Request<T> {
    Initial(PageFactory<T>),
    Next(Arc<dyn RemotePage<T>>),
}

struct CursorState<T> {
    items: Vec<T>,
    source: Source<T>,
    fetching: bool,
    failure: Option<BackendError>,
}

pub struct PaginationCursor<T> {
    inner: Arc<Mutex<CursorState<T>>>,
    timeout: Duration,
}

impl<T> Clone for PaginationCursor<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            timeout: self.timeout,
        }
    }
}

impl<T> PaginationCursor<T> {
    fn state(&self) -> MutexGuard<'_, CursorState<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<T> std::fmt::Debug for PaginationCursor<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("PaginationCursor")
            .field("len", &state.items.len())
            .field("fetching", &state.fetching)
            .field("exhausted", &matches!(state.source, Source::Done))
            .finish()
    }
}

impl<T> PaginationCursor<T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wraps a zero-argument query; nothing is requested until the first `fetch_next`.
    pub fn new<F, Fut>(factory: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = BackendResult<PageBox<T>>> + Send + 'static,
    {
        let factory: PageFactory<T> = Arc::new(move || factory().boxed());
        Self {
            inner: Arc::new(Mutex::new(CursorState {
                items: Vec::new(),
                source: Source::Factory(factory),
                fetching: false,
                failure: None,
            })),
            timeout: DEFAULT_FETCH_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accumulated items in backend order.
    pub fn items(&self) -> Vec<T> {
        self.state().items.clone()
    }

    pub fn len(&self) -> usize {
        self.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().items.is_empty()
    }

    pub fn has_more(&self) -> bool {
        !matches!(self.state().source, Source::Done)
    }

    pub fn is_fetching(&self) -> bool {
        self.state().fetching
    }

    /// Last fetch failure; `None` when the cursor simply ran out of data.
    pub fn failure(&self) -> Option<BackendError> {
        self.state().failure.clone()
    }

    /// Requests the next page unless one is in flight or the query is exhausted.
    pub async fn fetch_next(&self) -> FetchOutcome {
        let request = match self.begin_fetch() {
            Ok(request) => request,
            Err(reason) => {
                tracing::debug!(reason = ?reason, "cursor fetch coalesced");
                return FetchOutcome::Skipped(reason);
            }
        };

        let mut in_flight = InFlight::arm(&self.inner);
        let result = match request {
            Request::Initial(factory) => with_timeout(self.timeout, factory()).await,
            Request::Next(page) => with_timeout(self.timeout, page.next_page()).await,
        };
        in_flight.disarm();

        self.finish_fetch(result)
    }

    /// Fetches until the cursor stops making progress; returns the item count.
    pub async fn fetch_all(&self) -> usize {
        while let FetchOutcome::Fetched { .. } = self.fetch_next().await {}
        self.len()
    }

    fn begin_fetch(&self) -> Result<Request<T>, SkipReason> {
        let mut state = self.state();
        if state.fetching {
            return Err(SkipReason::InFlight);
        }

        let request = match &state.source {
            Source::Factory(factory) => Request::Initial(Arc::clone(factory)),
            Source::Page(page) => Request::Next(Arc::clone(page)),
            Source::Done => return Err(SkipReason::Exhausted),
        };
        state.fetching = true;
        Ok(request)
    }

    fn finish_fetch(&self, result: BackendResult<PageBox<T>>) -> FetchOutcome {
        let mut state = self.state();
        state.fetching = false;

        match result {
            Ok(page) => {
                let page: Arc<dyn RemotePage<T>> = Arc::from(page);
                let appended = page.items().len();
                state.items.extend_from_slice(page.items());
                state.failure = None;
                state.source = if page.has_next_page() {
                    Source::Page(page)
                } else {
                    Source::Done
                };
                FetchOutcome::Fetched { appended }
            }
            Err(error) => {
                tracing::warn!(
                    code = CURSOR_FETCH_FAILED,
                    error_code = error.code(),
                    error = %error,
                    accumulated = state.items.len(),
                    "cursor fetch failed; treating query as exhausted"
                );
                state.source = Source::Done;
                state.failure = Some(error.clone());
                FetchOutcome::Failed(error)
            }
        }
    }
}

/// Clears the in-flight flag if a fetch future is dropped before it resolves.
struct InFlight<'a, T> {
    state: &'a Mutex<CursorState<T>>,
    armed: bool,
}

impl<'a, T> InFlight<'a, T> {
    fn arm(state: &'a Mutex<CursorState<T>>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<T> Drop for InFlight<'_, T> {
    fn drop(&mut self) {
        if self.armed {
            self.state
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .fetching = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use tokio::sync::Notify;

    use super::*;

    /// Serves fixed pages; every backend round-trip waits on `gate` when set.
    struct ScriptedBackend {
        pages: Vec<Vec<u32>>,
        queries: AtomicUsize,
        gate: Option<Arc<Notify>>,
        fail_at: Option<usize>,
    }

    impl ScriptedBackend {
        fn new(pages: Vec<Vec<u32>>) -> Arc<Self> {
            Arc::new(Self {
                pages,
                queries: AtomicUsize::new(0),
                gate: None,
                fail_at: None,
            })
        }

        fn gated(pages: Vec<Vec<u32>>, gate: Arc<Notify>) -> Arc<Self> {
            Arc::new(Self {
                pages,
                queries: AtomicUsize::new(0),
                gate: Some(gate),
                fail_at: None,
            })
        }

        fn failing_at(pages: Vec<Vec<u32>>, index: usize) -> Arc<Self> {
            Arc::new(Self {
                pages,
                queries: AtomicUsize::new(0),
                gate: None,
                fail_at: Some(index),
            })
        }

        async fn load(self: Arc<Self>, index: usize) -> BackendResult<PageBox<u32>> {
            self.queries.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_at == Some(index) {
                return Err(BackendError::unavailable("scripted failure"));
            }
            Ok(Box::new(ScriptedPage {
                backend: Arc::clone(&self),
                index,
            }))
        }

        fn queries(&self) -> usize {
            self.queries.load(Ordering::SeqCst)
        }
    }

    struct ScriptedPage {
        backend: Arc<ScriptedBackend>,
        index: usize,
    }

    #[async_trait]
    impl RemotePage<u32> for ScriptedPage {
        fn items(&self) -> &[u32] {
            &self.backend.pages[self.index]
        }

        fn has_next_page(&self) -> bool {
            self.index + 1 < self.backend.pages.len()
        }

        async fn next_page(&self) -> BackendResult<PageBox<u32>> {
            Arc::clone(&self.backend).load(self.index + 1).await
        }
    }

    fn cursor_over(backend: &Arc<ScriptedBackend>) -> PaginationCursor<u32> {
        let backend = Arc::clone(backend);
        PaginationCursor::new(move || Arc::clone(&backend).load(0))
    }

    #[tokio::test]
    async fn starts_empty_until_first_fetch_resolves() {
        let backend = ScriptedBackend::new(vec![vec![1, 2]]);
        let cursor = cursor_over(&backend);

        assert!(cursor.is_empty());
        assert!(cursor.has_more());
        assert_eq!(backend.queries(), 0);
    }

    #[tokio::test]
    async fn appends_pages_in_order_and_stops_when_exhausted() {
        let backend = ScriptedBackend::new(vec![vec![1, 2], vec![3, 4], vec![5]]);
        let cursor = cursor_over(&backend);

        assert_eq!(cursor.fetch_next().await, FetchOutcome::Fetched { appended: 2 });
        assert_eq!(cursor.fetch_next().await, FetchOutcome::Fetched { appended: 2 });
        assert_eq!(cursor.fetch_next().await, FetchOutcome::Fetched { appended: 1 });
        assert_eq!(
            cursor.fetch_next().await,
            FetchOutcome::Skipped(SkipReason::Exhausted)
        );

        assert_eq!(cursor.items(), vec![1, 2, 3, 4, 5]);
        assert!(!cursor.has_more());
        assert_eq!(backend.queries(), 3);
    }

    #[tokio::test]
    async fn concurrent_fetch_signals_issue_a_single_query() {
        let gate = Arc::new(Notify::new());
        let backend = ScriptedBackend::gated(vec![vec![1], vec![2]], Arc::clone(&gate));
        let cursor = cursor_over(&backend);

        let first = cursor.fetch_next();
        tokio::pin!(first);
        assert!(futures::poll!(&mut first).is_pending());
        assert!(cursor.is_fetching());

        let second = cursor.fetch_next().await;
        gate.notify_one();
        let first = first.await;

        assert_eq!(second, FetchOutcome::Skipped(SkipReason::InFlight));
        assert_eq!(first, FetchOutcome::Fetched { appended: 1 });
        assert_eq!(backend.queries(), 1);
        assert_eq!(cursor.items(), vec![1]);
        assert!(!cursor.is_fetching());
    }

    #[tokio::test]
    async fn clones_share_the_in_flight_guard() {
        let gate = Arc::new(Notify::new());
        let backend = ScriptedBackend::gated(vec![vec![1], vec![2]], Arc::clone(&gate));
        let cursor = cursor_over(&backend);
        let other = cursor.clone();

        let first = cursor.fetch_next();
        tokio::pin!(first);
        assert!(futures::poll!(&mut first).is_pending());

        assert_eq!(
            other.fetch_next().await,
            FetchOutcome::Skipped(SkipReason::InFlight)
        );
        gate.notify_one();
        first.await;

        assert_eq!(other.items(), vec![1]);
    }

    #[tokio::test]
    async fn failed_initial_query_yields_empty_exhausted_cursor_with_failure() {
        let backend = ScriptedBackend::failing_at(vec![vec![1]], 0);
        let cursor = cursor_over(&backend);

        let outcome = cursor.fetch_next().await;

        assert!(matches!(outcome, FetchOutcome::Failed(BackendError::Unavailable { .. })));
        assert!(cursor.is_empty());
        assert!(!cursor.has_more());
        assert!(cursor.failure().is_some());
        assert_eq!(
            cursor.fetch_next().await,
            FetchOutcome::Skipped(SkipReason::Exhausted)
        );
        assert_eq!(backend.queries(), 1);
    }

    #[tokio::test]
    async fn failed_later_page_keeps_accumulated_items() {
        let backend = ScriptedBackend::failing_at(vec![vec![1, 2], vec![3]], 1);
        let cursor = cursor_over(&backend);

        cursor.fetch_next().await;
        let outcome = cursor.fetch_next().await;

        assert!(matches!(outcome, FetchOutcome::Failed(_)));
        assert_eq!(cursor.items(), vec![1, 2]);
        assert!(!cursor.has_more());
    }

    #[tokio::test]
    async fn exhaustion_without_failure_reports_no_failure() {
        let backend = ScriptedBackend::new(vec![vec![]]);
        let cursor = cursor_over(&backend);

        assert_eq!(cursor.fetch_next().await, FetchOutcome::Fetched { appended: 0 });

        assert!(!cursor.has_more());
        assert_eq!(cursor.failure(), None);
    }

    #[tokio::test]
    async fn slow_query_times_out_and_stops_cursor() {
        let gate = Arc::new(Notify::new());
        let backend = ScriptedBackend::gated(vec![vec![1]], gate);
        let cursor = cursor_over(&backend).with_timeout(Duration::from_millis(5));

        let outcome = cursor.fetch_next().await;

        assert_eq!(outcome, FetchOutcome::Failed(BackendError::Timeout { after_ms: 5 }));
        assert!(!cursor.is_fetching());
        assert!(!cursor.has_more());
    }

    #[tokio::test]
    async fn dropped_fetch_releases_the_in_flight_flag() {
        let gate = Arc::new(Notify::new());
        let backend = ScriptedBackend::gated(vec![vec![1]], Arc::clone(&gate));
        let cursor = cursor_over(&backend);

        {
            let first = cursor.fetch_next();
            tokio::pin!(first);
            assert!(futures::poll!(&mut first).is_pending());
        }
        assert!(!cursor.is_fetching());

        gate.notify_one();
        assert_eq!(cursor.fetch_next().await, FetchOutcome::Fetched { appended: 1 });
    }

    #[tokio::test]
    async fn fetch_all_drains_every_page() {
        let backend = ScriptedBackend::new(vec![vec![1], vec![2], vec![3]]);
        let cursor = cursor_over(&backend);

        assert_eq!(cursor.fetch_all().await, 3);
        assert_eq!(cursor.items(), vec![1, 2, 3]);
    }
}
