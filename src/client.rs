//! Synchronization client: the query and mutation executors
//!
//! [`SyncClient`] owns the cache store, the fetch layer, and the failure
//! policy, and runs every read and write through a fixed pipeline the
//! caller cannot skip:
//!
//! - **Queries**: fresh cache hit → return; otherwise join the in-flight
//!   fetch for the key or lead a new one, retrying transient failures once.
//!   Concurrent observers of one key share exactly one network call.
//! - **Mutations**: execute, then on success apply the operation's declared
//!   cache effects (evictions, invalidations, direct writes) *before*
//!   returning `Ok`; on failure run the global policy *before* returning
//!   `Err`. Callers therefore always observe a consistent cache.
//!
//! Mutations affecting overlapping keys are not serialized against each
//! other; the last response to resolve wins at the cache-entry level.
//! Callers needing strict ordering must gate on [`pending_mutations`].
//!
//! [`pending_mutations`]: SyncClient::pending_mutations

use crate::cache::CacheStore;
use crate::config::SyncConfig;
use crate::error::{ApiError, ApiResult};
use crate::key::ResourceKey;
use crate::mock::MockBackend;
use crate::policy::{FailurePolicy, Origin, SyncEvent};
use crate::transport::{Backend, Fetcher, Method, ReqwestBackend};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{broadcast, watch};

/// Declaration of one cached read: key identity plus policy.
#[derive(Debug, Clone)]
pub struct QuerySpec {
    pub key: ResourceKey,
    /// How long a fetched value stays fresh.
    pub staleness: Duration,
    /// Automatic retries for transient failures. `Unauthenticated` is
    /// never retried regardless of this value.
    pub retry: u32,
}

impl QuerySpec {
    pub fn new(key: ResourceKey, staleness: Duration) -> Self {
        Self {
            key,
            staleness,
            retry: 1,
        }
    }

    pub fn retry(mut self, retries: u32) -> Self {
        self.retry = retries;
        self
    }
}

/// Wire shape of a read: always a GET.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl QueryRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            query: Vec::new(),
        }
    }

    pub fn with_query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }
}

/// Declared cache effects of one mutation: a closed set, applied on
/// success before the caller observes the result.
#[derive(Debug, Clone, Default)]
pub struct MutationSpec {
    /// Families marked stale on success (refetched on next observation).
    pub invalidates: Vec<ResourceKey>,
    /// Families removed outright on success, atomically.
    pub evicts: Vec<ResourceKey>,
    /// Write the returned payload straight into this entry on success.
    pub write_result_to: Option<(ResourceKey, Duration)>,
    /// Rearm the session-expiry latch on success (login/signup).
    pub restores_session: bool,
}

impl MutationSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invalidates(mut self, family: ResourceKey) -> Self {
        self.invalidates.push(family);
        self
    }

    pub fn evicts(mut self, family: ResourceKey) -> Self {
        self.evicts.push(family);
        self
    }

    pub fn write_result_to(mut self, key: ResourceKey, staleness: Duration) -> Self {
        self.write_result_to = Some((key, staleness));
        self
    }

    pub fn restores_session(mut self) -> Self {
        self.restores_session = true;
        self
    }
}

/// Wire shape of a write.
#[derive(Debug, Clone)]
pub struct MutationRequest {
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

impl MutationRequest {
    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn post_empty(path: impl Into<String>) -> Self {
        Self {
            method: Method::Post,
            path: path.into(),
            body: None,
        }
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            path: path.into(),
            body: Some(body),
        }
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            path: path.into(),
            body: None,
        }
    }
}

type InflightResult = Option<Result<Value, ApiError>>;

enum Flight {
    Leader(watch::Sender<InflightResult>),
    Waiter(watch::Receiver<InflightResult>),
}

/// The cached-resource synchronization client.
///
/// Construct one per application (or per test) and share it; all state —
/// cache entries, in-flight reads, the anti-forgery token, the expiry
/// latch — lives on the instance, never in module globals.
pub struct SyncClient {
    config: SyncConfig,
    fetcher: Fetcher,
    cache: CacheStore,
    policy: FailurePolicy,
    inflight: Mutex<HashMap<ResourceKey, watch::Receiver<InflightResult>>>,
    pending: AtomicUsize,
}

impl SyncClient {
    /// Create a client per the configuration: the in-memory mock backend
    /// when `use_mock` is set, HTTP otherwise.
    pub fn new(config: SyncConfig) -> ApiResult<Self> {
        let backend: Arc<dyn Backend> = if config.use_mock {
            Arc::new(MockBackend::new())
        } else {
            Arc::new(ReqwestBackend::new(&config)?)
        };
        Ok(Self::with_backend(config, backend))
    }

    /// Create a client over an explicit transport.
    pub fn with_backend(config: SyncConfig, backend: Arc<dyn Backend>) -> Self {
        let cache = CacheStore::new(config.cache_capacity);
        let policy = FailurePolicy::new(config.session_gated.clone());
        Self {
            config,
            fetcher: Fetcher::new(backend),
            cache,
            policy,
            inflight: Mutex::new(HashMap::new()),
            pending: AtomicUsize::new(0),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// The cache store, for inspection and manual invalidation.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Subscribe to cross-cutting events (session expiry, mutation
    /// notices).
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.policy.subscribe()
    }

    /// Number of mutations currently in flight, for "disable while
    /// pending" UI affordances.
    pub fn pending_mutations(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }

    /// Execute a cached read.
    pub async fn query<T: DeserializeOwned>(
        &self,
        spec: QuerySpec,
        request: QueryRequest,
    ) -> ApiResult<T> {
        loop {
            if let Some(value) = self.cache.get_fresh(&spec.key) {
                tracing::debug!(key = %spec.key, "cache hit");
                return decode(value);
            }

            match self.join_or_lead(&spec.key) {
                Flight::Waiter(mut receiver) => {
                    match Self::await_leader(&mut receiver).await {
                        Some(result) => return result.and_then(decode),
                        // The leader was dropped mid-flight; nothing was
                        // committed. Re-enter and elect a new one.
                        None => continue,
                    }
                }
                Flight::Leader(sender) => {
                    let result = self.fetch_query(&request, spec.retry).await;
                    match &result {
                        Ok(value) => {
                            self.cache
                                .insert(spec.key.clone(), value.clone(), spec.staleness);
                        }
                        Err(error) => {
                            self.policy.after_failure(Origin::Query, error, &self.cache);
                        }
                    }
                    self.clear_inflight(&spec.key);
                    let _ = sender.send(Some(result.clone()));
                    return result.and_then(decode);
                }
            }
        }
    }

    /// Execute a write and apply its declared cache effects.
    pub async fn mutate<T: DeserializeOwned>(
        &self,
        spec: MutationSpec,
        request: MutationRequest,
    ) -> ApiResult<T> {
        let result = {
            let _pending = PendingGuard::enter(&self.pending);
            self.fetcher
                .call(request.method, &request.path, Vec::new(), request.body)
                .await
        };

        match result {
            Ok(value) => {
                self.apply_effects(&spec, &value);
                decode(value)
            }
            Err(error) => {
                self.policy
                    .after_failure(Origin::Mutation, &error, &self.cache);
                Err(error)
            }
        }
    }

    fn apply_effects(&self, spec: &MutationSpec, value: &Value) {
        if !spec.evicts.is_empty() {
            self.cache.evict_all(&spec.evicts);
        }
        for family in &spec.invalidates {
            self.cache.invalidate(family);
        }
        if let Some((key, staleness)) = &spec.write_result_to {
            self.cache.insert(key.clone(), value.clone(), *staleness);
        }
        if spec.restores_session {
            self.policy.restore_session();
        }
    }

    async fn fetch_query(&self, request: &QueryRequest, retry: u32) -> Result<Value, ApiError> {
        let mut attempts = 0;
        loop {
            match self
                .fetcher
                .call(Method::Get, &request.path, request.query.clone(), None)
                .await
            {
                Ok(value) => return Ok(value),
                Err(error) if error.kind.is_transient() && attempts < retry => {
                    attempts += 1;
                    tracing::warn!(
                        path = %request.path,
                        kind = %error.kind,
                        attempt = attempts,
                        "retrying query"
                    );
                }
                Err(error) => return Err(error),
            }
        }
    }

    fn join_or_lead(&self, key: &ResourceKey) -> Flight {
        let mut inflight = self
            .inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        if let Some(receiver) = inflight.get(key) {
            // A closed sender means its leader was dropped mid-flight;
            // take over instead of waiting forever.
            if receiver.has_changed().is_ok() {
                return Flight::Waiter(receiver.clone());
            }
            inflight.remove(key);
        }

        let (sender, receiver) = watch::channel(None);
        inflight.insert(key.clone(), receiver);
        Flight::Leader(sender)
    }

    fn clear_inflight(&self, key: &ResourceKey) {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    async fn await_leader(
        receiver: &mut watch::Receiver<InflightResult>,
    ) -> Option<Result<Value, ApiError>> {
        loop {
            if let Some(result) = receiver.borrow().clone() {
                return Some(result);
            }
            if receiver.changed().await.is_err() {
                return None;
            }
        }
    }

    /// Number of reads currently in flight.
    pub fn inflight_len(&self) -> usize {
        self.inflight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

fn decode<T: DeserializeOwned>(value: Value) -> ApiResult<T> {
    serde_json::from_value(value).map_err(ApiError::decode)
}

struct PendingGuard<'a> {
    counter: &'a AtomicUsize,
}

impl<'a> PendingGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self { counter }
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        self.counter.fetch_sub(1, Ordering::SeqCst);
    }
}
