//! storefront-sync
//!
//! Cached-resource synchronization client for a storefront REST backend.
//!
//! The crate is a thin, disciplined convention layer — not a storage
//! engine: deterministic [`ResourceKey`]s identify server-derived
//! resources, reads are cached with per-domain staleness windows and
//! de-duplicated while in flight, and writes declare a closed set of cache
//! effects that apply before the caller observes the result. A single
//! [global failure policy](SyncEvent) handles session expiry and surfaces
//! mutation errors.
//!
//! # Example
//! ```rust,ignore
//! use storefront_sync::{Storefront, SyncConfig};
//!
//! let shop = Storefront::new(SyncConfig::from_env())?;
//! let products = shop.products().await?;
//! let item = shop.add_to_cart(&products[0].id, 1).await?;
//! let cart = shop.cart().await?; // refetched: adding invalidated it
//! ```

mod cache;
mod client;
mod config;
mod error;
mod key;
mod mock;
mod policy;
mod transport;

pub mod resources;

#[cfg(test)]
mod tests;

pub use cache::CacheStore;
pub use client::{MutationRequest, MutationSpec, QueryRequest, QuerySpec, SyncClient};
pub use config::{ENV_API_URL, ENV_USE_MOCK, SyncConfig};
pub use error::{ApiError, ApiResult, ErrorKind, derive_message};
pub use key::{FilterSet, ResourceKey};
pub use mock::MockBackend;
pub use policy::SyncEvent;
pub use resources::Storefront;
pub use transport::{Backend, BoxFuture, Fetcher, Method, ReqwestBackend, WireRequest, WireResponse};
