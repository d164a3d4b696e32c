//! Cross-module test suites
//!
//! Shared helpers live here: a scripted backend for exact response
//! control and a gated backend for holding fetches in flight.

mod policy_tests;

use crate::error::ApiError;
use crate::mock::MockBackend;
use crate::resources::Storefront;
use crate::transport::{Backend, BoxFuture, WireRequest, WireResponse};
use crate::{ApiResult, SyncClient, SyncConfig};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::Semaphore;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A mock-backed client/storefront pair sharing one cache.
pub(crate) fn mock_storefront() -> (Arc<MockBackend>, Arc<SyncClient>, Storefront) {
    let backend = Arc::new(MockBackend::new());
    let client = Arc::new(SyncClient::with_backend(
        SyncConfig::new(),
        backend.clone() as Arc<dyn Backend>,
    ));
    let storefront = Storefront::with_client(client.clone());
    (backend, client, storefront)
}

/// Backend whose every response comes from a scripted function.
pub(crate) struct ScriptedBackend {
    script: Box<dyn Fn(&WireRequest) -> WireResponse + Send + Sync>,
    calls: Mutex<Vec<(String, String)>>,
}

impl ScriptedBackend {
    pub fn new(
        script: impl Fn(&WireRequest) -> WireResponse + Send + Sync + 'static,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Box::new(script),
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls_to(&self, path: &str) -> usize {
        lock(&self.calls)
            .iter()
            .filter(|(_, seen)| seen == path)
            .count()
    }
}

impl Backend for ScriptedBackend {
    fn execute<'a>(&'a self, request: WireRequest) -> BoxFuture<'a, ApiResult<WireResponse>> {
        lock(&self.calls).push((request.method.to_string(), request.path.clone()));
        let response = (self.script)(&request);
        Box::pin(async move { Ok(response) })
    }

    fn csrf_token(&self) -> Option<String> {
        Some("test-token".to_string())
    }
}

/// Backend that holds every call until the test releases a permit, so
/// tests can observe in-flight state deterministically.
pub(crate) struct GateBackend {
    inner: Arc<MockBackend>,
    gate: Semaphore,
    entered: AtomicUsize,
}

impl GateBackend {
    pub fn new(inner: Arc<MockBackend>) -> Arc<Self> {
        Arc::new(Self {
            inner,
            gate: Semaphore::new(0),
            entered: AtomicUsize::new(0),
        })
    }

    /// How many calls have reached the backend so far.
    pub fn entered(&self) -> usize {
        self.entered.load(Ordering::SeqCst)
    }

    /// Let `permits` held calls proceed.
    pub fn release(&self, permits: usize) {
        self.gate.add_permits(permits);
    }
}

impl Backend for GateBackend {
    fn execute<'a>(&'a self, request: WireRequest) -> BoxFuture<'a, ApiResult<WireResponse>> {
        Box::pin(async move {
            self.entered.fetch_add(1, Ordering::SeqCst);
            let permit = self
                .gate
                .acquire()
                .await
                .map_err(|_| ApiError::network("gate closed"))?;
            permit.forget();
            self.inner.execute(request).await
        })
    }

    fn csrf_token(&self) -> Option<String> {
        self.inner.csrf_token()
    }
}
