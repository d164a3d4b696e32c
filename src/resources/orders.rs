//! Orders: history read and order placement

use super::Storefront;
use super::cart::{self, CartItem};
use crate::client::{MutationRequest, MutationSpec, QueryRequest, QuerySpec};
use crate::error::ApiResult;
use crate::key::ResourceKey;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const DOMAIN: &str = "orders";

pub fn root_key() -> ResourceKey {
    ResourceKey::new(DOMAIN)
}

pub fn list_key() -> ResourceKey {
    root_key().child("list")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Placed,
    Paid,
    Processing,
    Shipped,
    Delivered,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub items: Vec<CartItem>,
    pub total: u64,
    pub status: OrderStatus,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemInput {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDetails {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub country: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gift_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceOrderRequest {
    pub items: Vec<OrderItemInput>,
    pub customer_details: CustomerDetails,
    pub shipping_address: ShippingAddress,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_preferences: Option<DeliveryPreferences>,
}

impl Storefront {
    /// Order history for the current session.
    pub async fn orders(&self) -> ApiResult<Vec<Order>> {
        let config = self.client().config();
        self.client()
            .query(
                QuerySpec::new(list_key(), config.catalog_staleness).retry(config.retry_limit),
                QueryRequest::new("/orders"),
            )
            .await
    }

    /// Place an order. On success the order history goes stale and so does
    /// the cart, which the backend clears.
    pub async fn place_order(&self, request: &PlaceOrderRequest) -> ApiResult<Order> {
        let spec = MutationSpec::new()
            .invalidates(list_key())
            .invalidates(cart::current_key());
        let body = serde_json::to_value(request).unwrap_or(Value::Null);
        self.client()
            .mutate(spec, MutationRequest::post("/orders", body))
            .await
    }
}
