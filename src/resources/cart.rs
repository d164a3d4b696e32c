//! Cart: current-state read plus item mutations
//!
//! Every mutation here declares the same closed effect set the storefront
//! UI depends on: the cart's current-state family goes stale, and adding an
//! item also staleness-marks the product listings (stock display).

use super::Storefront;
use super::catalog::{self, Product};
use crate::client::{MutationRequest, MutationSpec, QueryRequest, QuerySpec};
use crate::error::ApiResult;
use crate::key::ResourceKey;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const DOMAIN: &str = "cart";

pub fn root_key() -> ResourceKey {
    ResourceKey::new(DOMAIN)
}

pub fn current_key() -> ResourceKey {
    root_key().child("current")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: String,
    pub product: Product,
    pub quantity: u32,
    pub line_total: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub items: Vec<CartItem>,
    pub total: u64,
}

impl Cart {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl Storefront {
    /// Current cart contents.
    pub async fn cart(&self) -> ApiResult<Cart> {
        let config = self.client().config();
        self.client()
            .query(
                QuerySpec::new(current_key(), config.catalog_staleness)
                    .retry(config.retry_limit),
                QueryRequest::new("/cart/"),
            )
            .await
    }

    /// Add a product to the cart.
    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> ApiResult<CartItem> {
        let spec = MutationSpec::new()
            .invalidates(current_key())
            .invalidates(catalog::root_key());
        self.client()
            .mutate(
                spec,
                MutationRequest::post(
                    "/cart/",
                    json!({"productId": product_id, "quantity": quantity}),
                ),
            )
            .await
    }

    /// Change the quantity of a cart item.
    pub async fn update_cart_quantity(&self, item_id: &str, quantity: u32) -> ApiResult<CartItem> {
        let spec = MutationSpec::new().invalidates(current_key());
        self.client()
            .mutate(
                spec,
                MutationRequest::put(format!("/cart/{item_id}/"), json!({"quantity": quantity})),
            )
            .await
    }

    /// Remove a cart item.
    pub async fn remove_from_cart(&self, item_id: &str) -> ApiResult<()> {
        let spec = MutationSpec::new().invalidates(current_key());
        let _: Value = self
            .client()
            .mutate(spec, MutationRequest::delete(format!("/cart/{item_id}/delete/")))
            .await?;
        Ok(())
    }
}
