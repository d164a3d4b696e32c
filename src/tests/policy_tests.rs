//! Global failure policy tests - 401 escalation, notices, latch rearm

use super::{ScriptedBackend, mock_storefront};
use crate::resources::auth::Credentials;
use crate::resources::{Storefront, auth, cart, catalog, orders};
use crate::transport::{Backend, WireResponse};
use crate::{ErrorKind, SyncClient, SyncConfig, SyncEvent};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

const MINUTE: Duration = Duration::from_secs(60);

/// Backend where every read 401s but logging in still works.
fn expired_session_backend() -> Arc<ScriptedBackend> {
    ScriptedBackend::new(|request| {
        if request.path == "/auth/login/" {
            WireResponse::json(
                200,
                json!({"id": "user-1", "email": "priya@example.com", "name": "priya"}),
            )
        } else {
            WireResponse::json(
                401,
                json!({"detail": "Authentication credentials were not provided."}),
            )
        }
    })
}

fn client_over(backend: Arc<ScriptedBackend>) -> (Arc<SyncClient>, Storefront) {
    let client = Arc::new(SyncClient::with_backend(
        SyncConfig::new(),
        backend as Arc<dyn Backend>,
    ));
    (client.clone(), Storefront::with_client(client))
}

#[tokio::test]
async fn concurrent_401s_escalate_exactly_once() {
    let (client, shop) = client_over(expired_session_backend());
    let mut events = client.subscribe();

    // Simulate a previously healthy session's cache.
    client.cache().insert(auth::user_key(), json!({}), MINUTE);
    client
        .cache()
        .insert(cart::current_key(), json!({"items": [], "total": 0}), MINUTE);
    client.cache().insert(orders::list_key(), json!([]), MINUTE);
    client.cache().insert(auth::profile_key(), json!({}), MINUTE);
    client.cache().insert(catalog::list_key(), json!([]), MINUTE);
    // Both keys must miss the cache for the reads to hit the wire.
    client.cache().invalidate(&auth::user_key());
    client.cache().invalidate(&auth::profile_key());

    let (user, profile) = futures::join!(shop.current_user(), shop.profile());
    assert_eq!(user.expect_err("expired").kind, ErrorKind::Unauthenticated);
    assert_eq!(profile.expect_err("expired").kind, ErrorKind::Unauthenticated);

    // One redirect trigger, no matter how many 401s landed.
    assert_eq!(events.try_recv(), Ok(SyncEvent::SessionExpired));
    assert!(events.try_recv().is_err());

    // Session-gated families are gone; the catalog is untouched.
    assert!(!client.cache().contains(&auth::user_key()));
    assert!(!client.cache().contains(&cart::current_key()));
    assert!(!client.cache().contains(&orders::list_key()));
    assert!(!client.cache().contains(&auth::profile_key()));
    assert!(client.cache().contains(&catalog::list_key()));
}

#[tokio::test]
async fn escalation_rearms_after_a_successful_login() {
    let (client, shop) = client_over(expired_session_backend());
    let mut events = client.subscribe();

    shop.profile().await.expect_err("expired");
    assert_eq!(events.try_recv(), Ok(SyncEvent::SessionExpired));

    shop.current_user().await.expect_err("still expired");
    assert!(events.try_recv().is_err(), "latched: no duplicate trigger");

    let credentials = Credentials {
        email: "priya@example.com".to_string(),
        password: "hunter2".to_string(),
    };
    shop.login(&credentials).await.expect("login");

    shop.profile().await.expect_err("expired again");
    assert_eq!(events.try_recv(), Ok(SyncEvent::SessionExpired));
}

#[tokio::test]
async fn failed_mutations_notify_with_the_derived_message() {
    let (_backend, client, shop) = mock_storefront();
    let mut events = client.subscribe();

    shop.add_to_cart("no-such-product", 1)
        .await
        .expect_err("unknown product");

    match events.try_recv() {
        Ok(SyncEvent::Notice(message)) => {
            assert_eq!(message, "The requested resource was not found.")
        }
        other => panic!("expected a notice, got {other:?}"),
    }
}

#[tokio::test]
async fn failed_queries_stay_inline_and_silent() {
    let (_backend, client, shop) = mock_storefront();
    let mut events = client.subscribe();

    let error = shop.product("no-such-product").await.expect_err("missing");
    assert_eq!(error.kind, ErrorKind::NotFound);
    assert!(events.try_recv().is_err(), "query failures emit no notice");
}

#[tokio::test]
async fn field_validation_failures_carry_the_field_message() {
    let (_backend, client, shop) = mock_storefront();
    let mut events = client.subscribe();

    shop.add_to_cart("1", 1).await.expect("seed cart");
    let cart = shop.cart().await.expect("cart");
    let item_id = cart.items[0].id.clone();

    let error = shop
        .update_cart_quantity(&item_id, 0)
        .await
        .expect_err("zero quantity");
    assert_eq!(error.kind, ErrorKind::RequestError);
    assert_eq!(error.message, "quantity: Quantity must be greater than 0.");

    assert_eq!(
        events.try_recv(),
        Ok(SyncEvent::Notice(
            "quantity: Quantity must be greater than 0.".to_string()
        ))
    );
}
