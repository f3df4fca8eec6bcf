//! HTTP surface wired to the in-memory adapters.

use std::str::FromStr;
use std::sync::Arc;

use actix_web::{http::StatusCode, test, web, App};
use bigdecimal::BigDecimal;
use serde_json::{json, Value};
use uuid::Uuid;

use storefront_orders::application::fulfillment::FulfillmentSettings;
use storefront_orders::configure_routes;
use storefront_orders::domain::payment::PaymentStatus;
use storefront_orders::domain::pricing::PricingPolicy;
use storefront_orders::infrastructure::memory::{
    InMemoryInventoryLedger, InMemoryNotifier, InMemoryOrderStore, InMemoryPaymentVerifier,
};
use storefront_orders::AppState;

struct Adapters {
    payments: Arc<InMemoryPaymentVerifier>,
    notifier: Arc<InMemoryNotifier>,
}

fn state() -> (web::Data<AppState>, Adapters) {
    let payments = Arc::new(InMemoryPaymentVerifier::new());
    let notifier = Arc::new(InMemoryNotifier::new());
    let state = AppState::new(
        Arc::new(InMemoryOrderStore::new()),
        Arc::new(InMemoryInventoryLedger::new()),
        payments.clone(),
        notifier.clone(),
        PricingPolicy::new(
            BigDecimal::from(1000),
            BigDecimal::from(500),
            vec![("WELCOME10".to_string(), 10)],
        ),
        FulfillmentSettings::default(),
    );
    (web::Data::new(state), Adapters { payments, notifier })
}

fn checkout_body(product_id: Uuid, quantity: i32, discount_code: Option<&str>) -> Value {
    json!({
        "customer": { "name": "Lucia", "email": "lucia@example.com", "phone": "1155550000" },
        "items": [{ "product_id": product_id, "size": "M", "quantity": quantity, "unit_price": "100.00" }],
        "shipping_address": { "method": "branch", "branch_id": "12", "branch_name": "Centro", "city": "Rosario" },
        "discount_code": discount_code
    })
}

macro_rules! app {
    ($state:expr) => {
        test::init_service(App::new().app_data($state.clone()).configure(configure_routes)).await
    };
}

macro_rules! call_json {
    ($app:expr, $req:expr) => {{
        let resp = test::call_service(&$app, $req.to_request()).await;
        let status = resp.status();
        let body: Value = test::read_body_json(resp).await;
        (status, body)
    }};
}

macro_rules! set_stock {
    ($app:expr, $product_id:expr, $quantity:expr) => {{
        let req = test::TestRequest::put()
            .uri(&format!("/inventory/{}/M", $product_id))
            .set_json(json!({ "quantity": $quantity }));
        let resp = test::call_service(&$app, req.to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
    }};
}

fn webhook(payment_id: &str) -> test::TestRequest {
    test::TestRequest::post()
        .uri("/webhooks/payments")
        .set_json(json!({ "type": "payment", "data": { "id": payment_id } }))
}

fn register_approved(adapters: &Adapters, payment_id: &str, order: &Value) {
    let order_id = Uuid::parse_str(order["id"].as_str().unwrap()).unwrap();
    let amount = BigDecimal::from_str(order["total_amount"].as_str().unwrap()).unwrap();
    adapters
        .payments
        .register(payment_id, PaymentStatus::Approved, Some(order_id), amount);
}

#[actix_web::test]
async fn checkout_then_payment_fulfills_the_order() {
    let (state, adapters) = state();
    let app = app!(state);
    let product_id = Uuid::new_v4();
    set_stock!(app, product_id, 5);

    let (status, order) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/orders")
            .set_json(checkout_body(product_id, 2, Some("welcome10")))
    );
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["status"], "pending");
    assert_eq!(order["subtotal"], "200.00");
    assert_eq!(order["total_amount"], "680.00");
    assert_eq!(order["discount_code"], "WELCOME10");
    assert!(order["tracking_code"].is_null());

    register_approved(&adapters, "pay-1", &order);
    let (status, body) = call_json!(app, webhook("pay-1"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["outcome"], "fulfilled");

    let id = order["id"].as_str().unwrap();
    let (_, fetched) = call_json!(app, test::TestRequest::get().uri(&format!("/orders/{}", id)));
    assert_eq!(fetched["status"], "success");
    assert_eq!(fetched["tracking_code"], body["tracking_code"]);
    assert_eq!(fetched["payment_provider_id"], "pay-1");
    assert_eq!(fetched["notification"]["status"], "sent");

    let (_, stock) = call_json!(
        app,
        test::TestRequest::get().uri(&format!("/inventory/{}/M", product_id))
    );
    assert_eq!(stock["quantity"], 3);

    let (status, replay) = call_json!(app, webhook("pay-1"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replay["outcome"], "already_fulfilled");
    assert_eq!(adapters.notifier.attempts().len(), 1);
}

#[actix_web::test]
async fn malformed_webhook_is_rejected() {
    let (state, adapters) = state();
    let app = app!(state);

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/webhooks/payments")
            .insert_header(("content-type", "application/json"))
            .set_payload("{not json")
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Malformed"));

    let (status, _) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/webhooks/payments")
            .set_json(json!({ "type": "payment", "data": { "id": "  " } }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(adapters.payments.lookups(), 0);
}

#[actix_web::test]
async fn payment_ids_with_url_syntax_are_rejected_before_lookup() {
    let (state, adapters) = state();
    let app = app!(state);

    for id in ["../../v1/payments/123", "123?x=1"] {
        let (status, body) = call_json!(
            app,
            test::TestRequest::post()
                .uri("/webhooks/payments")
                .set_json(json!({ "type": "payment", "data": { "id": id } }))
        );
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("data.id"));
    }
    assert_eq!(adapters.payments.lookups(), 0);
}

#[actix_web::test]
async fn other_event_types_are_acknowledged() {
    let (state, adapters) = state();
    let app = app!(state);

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/webhooks/payments")
            .set_json(json!({ "type": "refund", "data": { "id": "pay-9" } }))
    );

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["outcome"], "ignored");
    assert_eq!(adapters.payments.lookups(), 0);
}

#[actix_web::test]
async fn stock_shortfall_is_a_conflict_listing_items() {
    let (state, adapters) = state();
    let app = app!(state);
    let product_id = Uuid::new_v4();
    set_stock!(app, product_id, 1);

    let (_, order) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/orders")
            .set_json(checkout_body(product_id, 2, None))
    );
    register_approved(&adapters, "pay-1", &order);

    let (status, body) = call_json!(app, webhook("pay-1"));
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["items"][0]["requested"], 2);
    assert_eq!(body["items"][0]["available"], 1);

    let id = order["id"].as_str().unwrap();
    let (_, fetched) = call_json!(app, test::TestRequest::get().uri(&format!("/orders/{}", id)));
    assert_eq!(fetched["status"], "pending");
}

#[actix_web::test]
async fn provider_outage_maps_to_503_and_unknown_payment_to_404() {
    let (state, adapters) = state();
    let app = app!(state);

    let (status, _) = call_json!(app, webhook("missing"));
    assert_eq!(status, StatusCode::NOT_FOUND);

    adapters.payments.set_unavailable(true);
    let (status, body) = call_json!(app, webhook("missing"));
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].is_string());
}

#[actix_web::test]
async fn payment_for_unknown_order_is_404() {
    let (state, adapters) = state();
    let app = app!(state);
    adapters.payments.register(
        "pay-1",
        PaymentStatus::Approved,
        Some(Uuid::new_v4()),
        BigDecimal::from(10),
    );

    let (status, body) = call_json!(app, webhook("pay-1"));
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Order not found");
}

#[actix_web::test]
async fn confirmation_resend_endpoint() {
    let (state, adapters) = state();
    let app = app!(state);
    let product_id = Uuid::new_v4();
    set_stock!(app, product_id, 5);
    let (_, order) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/orders")
            .set_json(checkout_body(product_id, 1, None))
    );
    let id = order["id"].as_str().unwrap().to_string();

    let (status, _) = call_json!(
        app,
        test::TestRequest::post().uri(&format!("/orders/{}/confirmation", id))
    );
    assert_eq!(status, StatusCode::CONFLICT);

    register_approved(&adapters, "pay-1", &order);
    call_json!(app, webhook("pay-1"));

    let (status, body) = call_json!(
        app,
        test::TestRequest::post().uri(&format!("/orders/{}/confirmation", id))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "skipped");

    let (status, body) = call_json!(
        app,
        test::TestRequest::post().uri(&format!("/orders/{}/confirmation?force=true", id))
    );
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["outcome"], "sent");
    assert!(body["message_id"].is_string());
    assert_eq!(adapters.notifier.attempts().len(), 2);
}

#[actix_web::test]
async fn checkout_validation_errors_are_400() {
    let (state, _adapters) = state();
    let app = app!(state);
    let product_id = Uuid::new_v4();

    let (status, body) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/orders")
            .set_json(checkout_body(product_id, 1, Some("BOGUS")))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("BOGUS"));

    let (status, _) = call_json!(
        app,
        test::TestRequest::post()
            .uri("/orders")
            .set_json(checkout_body(product_id, 0, None))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut bad_price = checkout_body(product_id, 1, None);
    bad_price["items"][0]["unit_price"] = json!("ten");
    let (status, _) = call_json!(
        app,
        test::TestRequest::post().uri("/orders").set_json(bad_price)
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn orders_can_be_listed_by_status() {
    let (state, adapters) = state();
    let app = app!(state);
    let product_id = Uuid::new_v4();
    set_stock!(app, product_id, 5);

    let mut created = Vec::new();
    for _ in 0..3 {
        let (_, order) = call_json!(
            app,
            test::TestRequest::post()
                .uri("/orders")
                .set_json(checkout_body(product_id, 1, None))
        );
        created.push(order);
    }
    register_approved(&adapters, "pay-1", &created[0]);
    call_json!(app, webhook("pay-1"));

    let (status, all) = call_json!(app, test::TestRequest::get().uri("/orders?limit=2"));
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all["total"], 3);
    assert_eq!(all["items"].as_array().unwrap().len(), 2);

    let (_, pending) = call_json!(app, test::TestRequest::get().uri("/orders?status=pending"));
    assert_eq!(pending["total"], 2);

    let (_, success) = call_json!(app, test::TestRequest::get().uri("/orders?status=success"));
    assert_eq!(success["total"], 1);
    assert_eq!(success["items"][0]["id"], created[0]["id"]);

    let (status, _) = call_json!(app, test::TestRequest::get().uri("/orders?status=shipped"));
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[actix_web::test]
async fn negative_stock_is_rejected() {
    let (state, _adapters) = state();
    let app = app!(state);

    let (status, _) = call_json!(
        app,
        test::TestRequest::put()
            .uri(&format!("/inventory/{}/M", Uuid::new_v4()))
            .set_json(json!({ "quantity": -1 }))
    );
    assert_eq!(status, StatusCode::BAD_REQUEST);
}
