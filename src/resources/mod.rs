//! Typed resource layer over [`SyncClient`]
//!
//! One module per backend domain, mirroring the REST surface: key factories
//! for the domain's cache families, the wire types, and the operations
//! themselves as methods on [`Storefront`]. Each mutation declares its
//! cache effects next to the call, so the invalidation contract of every
//! operation is auditable in one place.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod content;
pub mod orders;
pub mod payments;

use crate::client::SyncClient;
use crate::config::SyncConfig;
use crate::error::ApiResult;
use crate::policy::SyncEvent;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Facade over the synchronization client: one method per storefront
/// operation.
///
/// Cheap to clone; clones share the same client and cache.
#[derive(Clone)]
pub struct Storefront {
    client: Arc<SyncClient>,
}

impl Storefront {
    pub fn new(config: SyncConfig) -> ApiResult<Self> {
        Ok(Self {
            client: Arc::new(SyncClient::new(config)?),
        })
    }

    pub fn with_client(client: Arc<SyncClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &SyncClient {
        &self.client
    }

    /// Subscribe to session-expiry and notification events.
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.client.subscribe()
    }
}
