//! Integration tests for the checkout flow: payment initialization against
//! the gateway, caller-triggered verification and the single-transaction
//! state flip (payment verified, cart paid, listings deactivated).

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp, GATEWAY_SECRET};
use rust_decimal_macros::dec;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};
use serde_json::json;
use wiremock::matchers::{bearer_token, method, path, path_regex};
use wiremock::{Mock, ResponseTemplate};

use realty_api::entities::{payment, Cart, Listing, Payment, UserModel};

const CHECKOUT_URL: &str = "https://checkout.paystack.com/session-abc123";

async fn mock_initialize_success(app: &TestApp) {
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .and(bearer_token(GATEWAY_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Authorization URL created",
            "data": {
                "authorization_url": CHECKOUT_URL,
                "access_code": "access_abc123",
            }
        })))
        .mount(&app.gateway_server)
        .await;
}

async fn mock_verify_with_status(app: &TestApp, status: &str) {
    Mock::given(method("GET"))
        .and(path_regex("^/transaction/verify/.+$"))
        .and(bearer_token(GATEWAY_SECRET))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": true,
            "message": "Verification complete",
            "data": { "status": status }
        })))
        .mount(&app.gateway_server)
        .await;
}

/// Seeds a buyer with a cart holding listings priced 100.00 and 250.50.
async fn seed_filled_cart(app: &TestApp) -> (UserModel, String, Vec<realty_api::entities::ListingModel>) {
    let (agent, _) = app.seed_agent("agent@example.com").await;
    let (buyer, buyer_token) = app.seed_buyer("buyer@example.com").await;
    let flat = app.seed_listing(&agent, "Flat", dec!(100.00)).await;
    let duplex = app.seed_listing(&agent, "Duplex", dec!(250.50)).await;

    for listing in [&flat, &duplex] {
        let response = app
            .request(
                Method::POST,
                &format!("/api/v1/cart/items/{}", listing.id),
                None,
                Some(&buyer_token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::CREATED);
    }

    (buyer, buyer_token, vec![flat, duplex])
}

#[tokio::test]
async fn initialize_without_a_cart_is_not_found() {
    let app = TestApp::new().await;
    let (_, buyer_token) = app.seed_buyer("buyer@example.com").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            None,
            Some(&buyer_token),
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn initialize_stores_minor_unit_amount_and_returns_redirect() {
    let app = TestApp::new().await;
    let (buyer, buyer_token, _) = seed_filled_cart(&app).await;
    mock_initialize_success(&app).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            None,
            Some(&buyer_token),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["payment_url"], CHECKOUT_URL);
    let reference = body["reference"].as_str().expect("reference in response");

    // 100.00 + 250.50 captured as the gateway's minor-unit integer
    let row = Payment::find()
        .filter(payment::Column::Reference.eq(reference))
        .one(&*app.state.db)
        .await
        .unwrap()
        .expect("payment row persisted");
    assert_eq!(row.amount, 35_050);
    assert_eq!(row.user_id, buyer.id);
    assert!(!row.verified);
}

#[tokio::test]
async fn references_are_unique_across_repeated_attempts() {
    let app = TestApp::new().await;
    let (_, buyer_token, _) = seed_filled_cart(&app).await;
    mock_initialize_success(&app).await;

    let mut references = Vec::new();
    for _ in 0..2 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/payments/initialize",
                None,
                Some(&buyer_token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_json(response).await;
        references.push(body["reference"].as_str().unwrap().to_string());
    }

    assert_ne!(references[0], references[1]);
    assert_eq!(Payment::find().count(&*app.state.db).await.unwrap(), 2);
}

#[tokio::test]
async fn declined_initialization_returns_gateway_body_verbatim() {
    let app = TestApp::new().await;
    let (_, buyer_token, _) = seed_filled_cart(&app).await;

    let declined = json!({
        "status": false,
        "message": "Invalid amount charged"
    });
    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(200).set_body_json(declined.clone()))
        .mount(&app.gateway_server)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            None,
            Some(&buyer_token),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(response_json(response).await, declined);

    // A decline persists nothing
    assert_eq!(Payment::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn unreadable_gateway_response_is_a_bad_gateway() {
    let app = TestApp::new().await;
    let (_, buyer_token, _) = seed_filled_cart(&app).await;

    Mock::given(method("POST"))
        .and(path("/transaction/initialize"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream blew up"))
        .mount(&app.gateway_server)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            None,
            Some(&buyer_token),
        )
        .await;

    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    assert_eq!(Payment::find().count(&*app.state.db).await.unwrap(), 0);
}

#[tokio::test]
async fn successful_verification_flips_payment_cart_and_listings() {
    let app = TestApp::new().await;
    let (buyer, buyer_token, listings) = seed_filled_cart(&app).await;
    mock_initialize_success(&app).await;
    mock_verify_with_status(&app, "success").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            None,
            Some(&buyer_token),
        )
        .await;
    let body = response_json(response).await;
    let reference = body["reference"].as_str().unwrap().to_string();

    // Verify is deliberately open: no bearer token on this request
    let verified = app
        .request(
            Method::GET,
            &format!("/api/v1/payments/verify?reference={}", reference),
            None,
            None,
        )
        .await;
    assert_eq!(verified.status(), StatusCode::OK);

    let row = Payment::find()
        .filter(payment::Column::Reference.eq(reference.as_str()))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(row.verified);
    assert_eq!(row.amount, 35_050);

    let cart = Cart::find_by_id(row.cart_id)
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(cart.is_paid);
    assert_eq!(cart.user_id, buyer.id);

    for listing in &listings {
        let bought = Listing::find_by_id(listing.id)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!bought.is_active, "purchased listing must be deactivated");
    }
}

#[tokio::test]
async fn verification_is_idempotent() {
    let app = TestApp::new().await;
    let (_, buyer_token, listings) = seed_filled_cart(&app).await;
    mock_initialize_success(&app).await;
    mock_verify_with_status(&app, "success").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            None,
            Some(&buyer_token),
        )
        .await;
    let reference = response_json(response).await["reference"]
        .as_str()
        .unwrap()
        .to_string();

    let uri = format!("/api/v1/payments/verify?reference={}", reference);
    for _ in 0..2 {
        let verified = app.request(Method::GET, &uri, None, None).await;
        assert_eq!(verified.status(), StatusCode::OK);
    }

    let row = Payment::find()
        .filter(payment::Column::Reference.eq(reference.as_str()))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(row.verified);

    for listing in &listings {
        let bought = Listing::find_by_id(listing.id)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!bought.is_active);
    }
}

#[tokio::test]
async fn failed_verification_changes_nothing() {
    let app = TestApp::new().await;
    let (buyer, buyer_token, listings) = seed_filled_cart(&app).await;
    mock_initialize_success(&app).await;
    mock_verify_with_status(&app, "failed").await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/payments/initialize",
            None,
            Some(&buyer_token),
        )
        .await;
    let reference = response_json(response).await["reference"]
        .as_str()
        .unwrap()
        .to_string();

    let verified = app
        .request(
            Method::GET,
            &format!("/api/v1/payments/verify?reference={}", reference),
            None,
            None,
        )
        .await;
    assert_eq!(verified.status(), StatusCode::BAD_REQUEST);

    let row = Payment::find()
        .filter(payment::Column::Reference.eq(reference.as_str()))
        .one(&*app.state.db)
        .await
        .unwrap()
        .unwrap();
    assert!(!row.verified);

    let cart = app.state.services.carts.get_cart(buyer.id).await.unwrap();
    assert!(!cart.cart.is_paid);

    for listing in &listings {
        let unchanged = Listing::find_by_id(listing.id)
            .one(&*app.state.db)
            .await
            .unwrap()
            .unwrap();
        assert!(unchanged.is_active);
    }
}

#[tokio::test]
async fn verifying_an_unknown_reference_is_not_found() {
    let app = TestApp::new().await;
    mock_verify_with_status(&app, "success").await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/payments/verify?reference=no-such-reference",
            None,
            None,
        )
        .await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn verification_requires_a_reference() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::GET, "/api/v1/payments/verify", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .request(Method::GET, "/api/v1/payments/verify?reference=", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn initialize_requires_authentication() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/payments/initialize", None, None)
        .await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
