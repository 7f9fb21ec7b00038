//! # Fake Resource Manager
//!
//! An axum server that behaves like a tiny slice of the Azure Resource Manager
//! control plane. Resources are kept in memory keyed by their lower-cased ID, so the
//! server accepts any resource type without knowing its schema.
//!
//! Behaviour mirrors the real service where clients depend on it:
//!
//! - `PUT` answers `201`/`200`; for nested resources it can answer with an
//!   `Azure-AsyncOperation` header that completes after a configurable number of polls
//! - `GET` of a missing resource answers `404` with the ARM error envelope
//! - `DELETE` answers `202` with a `Location` header, or `204` when nothing existed
//! - collections page with `nextLink` / `$skiptoken`
//! - resource providers report their registration state and can be registered
//! - a client-credentials token endpoint at `/{tenant}/oauth2/v2.0/token`
//!
//! ```no_run
//! # async fn run() -> std::io::Result<()> {
//! let arm = azurerm_mock::MockArm::start().await?;
//! println!("fake ARM listening on {}", arm.endpoint());
//! # Ok(())
//! # }
//! ```

use std::{
    net::SocketAddr,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use serde_json::Value;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use url::Url;

mod routes;
mod store;

pub use routes::router;
pub use store::RecordedRequest;

use store::Store;

/// Behaviour switches of the fake control plane
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Bearer token the server issues and expects
    pub token: String,
    /// When set, the token endpoint rejects any other secret
    pub client_secret: Option<String>,
    /// Answer writes to nested resources and deletes asynchronously
    pub long_running: bool,
    /// Polls answering "in progress" before an operation completes
    pub polls_before_done: u32,
    pub page_size: usize,
    /// Make the last page of a list point back at itself
    pub repeat_last_next_link: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            token: "mock-token".to_string(),
            client_secret: None,
            long_running: true,
            polls_before_done: 1,
            page_size: 50,
            repeat_last_next_link: false,
        }
    }
}

pub type MockStateRef = Arc<MockState>;

pub struct MockState {
    base_url: Url,
    pub(crate) options: MockOptions,
    store: Mutex<Store>,
}

impl MockState {
    pub fn new(base_url: Url, options: MockOptions) -> Self {
        Self {
            base_url,
            options,
            store: Mutex::new(Store::default()),
        }
    }

    pub(crate) fn store(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn operation_url(&self, operation_id: &str) -> String {
        format!("{}providers/Mock.Operations/operations/{operation_id}", self.base_url)
    }

    pub(crate) fn page_url(&self, path: &str, api_version: &str, skip: Option<usize>) -> String {
        let mut url = self.base_url.clone();
        url.set_path(path);
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("api-version", api_version);
            if let Some(skip) = skip {
                pairs.append_pair("$skiptoken", &skip.to_string());
            }
        }
        url.to_string()
    }
}

/// A running fake control plane, shut down when dropped
pub struct MockArm {
    addr: SocketAddr,
    state: MockStateRef,
    shutdown: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl MockArm {
    /// Start with default options on `127.0.0.1` and a random port
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(MockOptions::default()).await
    }

    pub async fn start_with(options: MockOptions) -> std::io::Result<Self> {
        Self::bind("127.0.0.1:0".parse().expect("static socket address"), options).await
    }

    pub async fn bind(addr: SocketAddr, options: MockOptions) -> std::io::Result<Self> {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let addr = listener.local_addr()?;

        let base_url = Url::parse(&format!("http://{addr}/"))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        let state = Arc::new(MockState::new(base_url, options));
        let app = router(Arc::clone(&state));

        let shutdown = CancellationToken::new();
        let signal = shutdown.clone().cancelled_owned();
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).with_graceful_shutdown(signal).await {
                error!(error = %e, "fake ARM server failed");
            }
        });

        info!(%addr, "fake ARM listening");
        Ok(Self {
            addr,
            state,
            shutdown,
            handle: Some(handle),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Base URL to use as the Resource Manager endpoint
    pub fn endpoint(&self) -> Url {
        self.state.base_url.clone()
    }

    /// Bearer token accepted by the server
    pub fn token(&self) -> &str {
        &self.state.options.token
    }

    /// Answer the next `count` ARM requests with `429 Too Many Requests`
    pub fn throttle_next(&self, count: u32) {
        self.state.store().throttle_remaining = count;
    }

    /// Make the next long running operation end in failure
    pub fn fail_next_operation(&self, code: &str, message: &str) {
        self.state.store().next_failure = Some((code.to_string(), message.to_string()));
    }

    /// Seed a resource directly, bypassing parent checks
    pub fn insert(&self, id: &str, body: Value) -> Value {
        self.state.store().put(id, body).0
    }

    pub fn resource(&self, id: &str) -> Option<Value> {
        self.state.store().get(id).cloned()
    }

    pub fn resource_count(&self) -> usize {
        self.state.store().len()
    }

    /// Whether a resource provider namespace was registered
    pub fn is_registered(&self, namespace: &str) -> bool {
        self.state.store().is_registered(namespace)
    }

    /// Every request that reached the ARM routes, in arrival order
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.store().requests.clone()
    }

    /// Stop the server and wait for it to finish
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for MockArm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
