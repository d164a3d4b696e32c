//! Payment-provider order creation
//!
//! Creating a provider order has no bearing on any cached resource, so the
//! mutation declares an empty effect set.

use super::Storefront;
use crate::client::{MutationRequest, MutationSpec};
use crate::error::ApiResult;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentProvider {
    Razorpay,
    Stripe,
    Other,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrderRequest {
    pub amount: u64,
    pub currency: String,
    pub order_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentOrder {
    pub payment_order_id: String,
    pub provider: PaymentProvider,
    pub amount: u64,
    pub currency: String,
}

impl Storefront {
    /// Create an order with the payment provider for the given amount.
    pub async fn create_payment_order(
        &self,
        request: &PaymentOrderRequest,
    ) -> ApiResult<PaymentOrder> {
        let body = serde_json::to_value(request).unwrap_or(Value::Null);
        self.client()
            .mutate(
                MutationSpec::new(),
                MutationRequest::post("/payments/create-order/", body),
            )
            .await
    }
}
