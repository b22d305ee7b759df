//! Background catalog fetches with timeout, retry and stale-result guarding

use super::{FetchError, ProductSource, Snapshot};
use crate::constants::*;
use futures::future::try_join;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Timeout and retry settings for one fetch
#[derive(Debug, Clone, Copy)]
pub struct FetchPolicy {
    pub timeout: Duration,
    pub retries: u32,
    pub backoff: Duration,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_FETCH_TIMEOUT,
            retries: DEFAULT_FETCH_RETRIES,
            backoff: DEFAULT_RETRY_BACKOFF,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadStatus {
    Idle,
    Loading,
    Loaded,
    Failed(String),
}

struct LoadEvent {
    request_id: u64,
    result: Result<Snapshot, FetchError>,
}

/// Fetch products and categories together, retrying transient failures.
pub async fn fetch_snapshot(
    source: &dyn ProductSource,
    policy: FetchPolicy,
) -> Result<Snapshot, FetchError> {
    let mut attempt = 0;
    loop {
        let outcome = tokio::time::timeout(
            policy.timeout,
            try_join(source.fetch_products(), source.fetch_categories()),
        )
        .await;

        let err = match outcome {
            Ok(Ok((page, categories))) => return Snapshot::new(page, categories, source.describe()),
            Ok(Err(e)) => e,
            Err(_) => FetchError::Timeout(policy.timeout),
        };

        if !err.is_retryable() || attempt >= policy.retries {
            return Err(err);
        }
        attempt += 1;
        warn!(error = %err, attempt, source = %source.describe(), "Fetch failed, retrying");
        tokio::time::sleep(policy.backoff * attempt).await;
    }
}

/// Owns the current catalog snapshot and the fetch that refreshes it.
///
/// Every [`Loader::request`] gets a new request id and cancels the one before
/// it. Results are only accepted when their id matches the latest request, so
/// a slow, superseded response never replaces newer data.
pub struct Loader {
    source: Arc<dyn ProductSource>,
    policy: FetchPolicy,
    runtime: tokio::runtime::Handle,
    tx: UnboundedSender<LoadEvent>,
    rx: UnboundedReceiver<LoadEvent>,
    request_id: u64,
    cancel: Option<CancellationToken>,
    status: LoadStatus,
    snapshot: Option<Arc<Snapshot>>,
    data_version: u64,
    waker: Option<Arc<dyn Fn() + Send + Sync>>,
}

impl Loader {
    pub fn new(
        source: Arc<dyn ProductSource>,
        policy: FetchPolicy,
        runtime: tokio::runtime::Handle,
    ) -> Self {
        let (tx, rx) = unbounded_channel();
        Self {
            source,
            policy,
            runtime,
            tx,
            rx,
            request_id: 0,
            cancel: None,
            status: LoadStatus::Idle,
            snapshot: None,
            data_version: 0,
            waker: None,
        }
    }

    /// Called from the fetch task once a result is queued
    pub fn with_waker(mut self, waker: impl Fn() + Send + Sync + 'static) -> Self {
        self.waker = Some(Arc::new(waker));
        self
    }

    pub fn status(&self) -> &LoadStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        self.status == LoadStatus::Loading
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        self.snapshot.as_ref()
    }

    /// Bumped every time a new snapshot is installed
    pub fn data_version(&self) -> u64 {
        self.data_version
    }

    pub fn source_label(&self) -> String {
        self.source.describe()
    }

    /// Show previously cached data while the first fetch is in flight
    pub fn install_cached(&mut self, snapshot: Snapshot) {
        info!(
            count = snapshot.products().len(),
            fetched_at = %snapshot.fetched_at(),
            "Using cached snapshot"
        );
        self.snapshot = Some(Arc::new(snapshot));
        self.data_version += 1;
    }

    /// Switch sources and fetch from the new one. The current snapshot stays
    /// visible until the new fetch succeeds.
    pub fn set_source(&mut self, source: Arc<dyn ProductSource>) {
        info!(source = %source.describe(), "Product source changed");
        self.source = source;
        self.request();
    }

    pub fn set_policy(&mut self, policy: FetchPolicy) {
        self.policy = policy;
    }

    /// Start a fetch, superseding any fetch still in flight
    pub fn request(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
        self.request_id += 1;
        let request_id = self.request_id;
        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        self.status = LoadStatus::Loading;

        let source = self.source.clone();
        let policy = self.policy;
        let tx = self.tx.clone();
        let waker = self.waker.clone();

        debug!(request_id, source = %source.describe(), "Fetch requested");

        self.runtime.spawn(async move {
            let result = tokio::select! {
                _ = token.cancelled() => Err(FetchError::Cancelled),
                result = fetch_snapshot(source.as_ref(), policy) => result,
            };
            if tx.send(LoadEvent { request_id, result }).is_ok() {
                if let Some(waker) = waker {
                    waker();
                }
            }
        });
    }

    /// Drain finished fetches without blocking. Returns true if status or
    /// snapshot changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(event) = self.rx.try_recv() {
            changed |= self.accept(event);
        }
        changed
    }

    /// Wait for the next finished fetch and apply it
    pub async fn recv(&mut self) -> bool {
        match self.rx.recv().await {
            Some(event) => self.accept(event),
            None => false,
        }
    }

    fn accept(&mut self, event: LoadEvent) -> bool {
        if event.request_id != self.request_id {
            debug!(
                request_id = event.request_id,
                latest = self.request_id,
                "Discarding stale fetch result"
            );
            return false;
        }
        self.cancel = None;

        match event.result {
            Ok(snapshot) => {
                info!(
                    count = snapshot.products().len(),
                    categories = snapshot.categories().len(),
                    source = %snapshot.source(),
                    "Catalog loaded"
                );
                self.snapshot = Some(Arc::new(snapshot));
                self.data_version += 1;
                self.status = LoadStatus::Loaded;
            }
            Err(FetchError::Cancelled) => {
                self.status = LoadStatus::Idle;
            }
            Err(e) => {
                warn!(error = %e, "Catalog fetch failed");
                self.status = LoadStatus::Failed(e.to_string());
            }
        }
        true
    }
}

impl Drop for Loader {
    fn drop(&mut self) {
        if let Some(token) = self.cancel.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Product, ProductPage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    /// Each fetch returns one product named after the call number, after the
    /// delay configured for that call.
    struct ScriptedSource {
        calls: AtomicUsize,
        delays: Vec<Duration>,
        failing: AtomicBool,
        failures_left: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(delays: Vec<Duration>) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                delays,
                failing: AtomicBool::new(false),
                failures_left: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProductSource for ScriptedSource {
        fn describe(&self) -> String {
            "scripted".into()
        }

        async fn fetch_products(&self) -> Result<ProductPage, FetchError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            let delay = self.delays.get(call).copied().unwrap_or_default();
            tokio::time::sleep(delay).await;
            if self.failing.load(Ordering::SeqCst) {
                return Err(FetchError::Status(503));
            }
            if self.failures_left.load(Ordering::SeqCst) > 0 {
                self.failures_left.fetch_sub(1, Ordering::SeqCst);
                return Err(FetchError::Status(502));
            }
            Ok(ProductPage {
                items: vec![Product {
                    id: format!("call-{call}"),
                    name: format!("Call {call}"),
                    category: "A".into(),
                    price: 1.0,
                    in_stock: true,
                }],
                total: 1,
            })
        }

        async fn fetch_categories(&self) -> Result<Vec<String>, FetchError> {
            Ok(vec!["A".into()])
        }
    }

    fn fast_policy() -> FetchPolicy {
        FetchPolicy {
            timeout: Duration::from_secs(5),
            retries: 2,
            backoff: Duration::from_millis(1),
        }
    }

    fn first_id(loader: &Loader) -> String {
        loader.snapshot().unwrap().products()[0].id.clone()
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_newer_request_wins() {
        let source = Arc::new(ScriptedSource::new(vec![
            Duration::from_millis(300),
            Duration::from_millis(1),
        ]));
        let mut loader = Loader::new(source, fast_policy(), tokio::runtime::Handle::current());

        loader.request();
        // Let the first fetch claim the slow call before superseding it
        tokio::time::sleep(Duration::from_millis(50)).await;
        loader.request();
        while loader.is_loading() {
            loader.recv().await;
        }
        assert_eq!(loader.status(), &LoadStatus::Loaded);
        assert_eq!(first_id(&loader), "call-1");
        assert_eq!(loader.data_version(), 1);

        // The slow first call must never land afterwards
        tokio::time::sleep(Duration::from_millis(400)).await;
        loader.poll();
        assert_eq!(first_id(&loader), "call-1");
        assert_eq!(loader.data_version(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_failure_keeps_previous_snapshot() {
        let source = Arc::new(ScriptedSource::new(vec![]));
        let mut loader =
            Loader::new(source.clone(), fast_policy(), tokio::runtime::Handle::current());

        loader.request();
        loader.recv().await;
        assert_eq!(loader.status(), &LoadStatus::Loaded);

        source.failing.store(true, Ordering::SeqCst);
        loader.request();
        loader.recv().await;
        assert!(matches!(loader.status(), LoadStatus::Failed(_)));
        assert_eq!(first_id(&loader), "call-0");

        // Retry after recovery replaces the data
        source.failing.store(false, Ordering::SeqCst);
        loader.request();
        loader.recv().await;
        assert_eq!(loader.status(), &LoadStatus::Loaded);
        assert_ne!(first_id(&loader), "call-0");
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let source = ScriptedSource::new(vec![]);
        source.failures_left.store(2, Ordering::SeqCst);
        let snapshot = fetch_snapshot(&source, fast_policy()).await.unwrap();
        assert_eq!(snapshot.products()[0].id, "call-2");
    }

    #[tokio::test]
    async fn test_retries_are_bounded() {
        let source = ScriptedSource::new(vec![]);
        source.failing.store(true, Ordering::SeqCst);
        let err = fetch_snapshot(&source, fast_policy()).await.unwrap_err();
        assert!(matches!(err, FetchError::Status(503)));
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout() {
        let source = ScriptedSource::new(vec![Duration::from_secs(10)]);
        let policy = FetchPolicy {
            timeout: Duration::from_millis(20),
            retries: 0,
            backoff: Duration::from_millis(1),
        };
        let err = fetch_snapshot(&source, policy).await.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(_)));
    }
}
