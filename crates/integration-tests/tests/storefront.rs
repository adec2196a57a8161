//! Integration tests for browsing, cart, wishlist and checkout.
//!
//! Each test runs its own storefront with an in-memory database; nothing
//! external is needed.

use bazaar_core::OrderStatus;
use bazaar_integration_tests::{TestApp, WHATSAPP_NUMBER};
use bazaar_storefront::db::OrderRepository;
use reqwest::StatusCode;
use reqwest::redirect::Policy;

// ============================================================================
// Health & Browsing
// ============================================================================

#[tokio::test]
async fn test_health_endpoints() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, _) = app.get("/health/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_home_lists_static_catalog() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Handwoven Market Basket"));
    assert!(body.contains("Brass Bottle Opener"));
}

#[tokio::test]
async fn test_home_filters_by_search_and_price() {
    let app = TestApp::spawn().await;

    let (_, body) = app.get("/?q=candle").await;
    assert!(body.contains("Beeswax Candle"));
    assert!(!body.contains("Canvas Tote"));

    let (_, body) = app.get("/?min=30&sort=price_desc").await;
    assert!(body.contains("Ceramic Pour-Over Set"));
    assert!(!body.contains("Brass Bottle Opener"));
}

#[tokio::test]
async fn test_category_and_product_pages() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/category/Kitchen").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ceramic Pour-Over Set"));
    assert!(!body.contains("Canvas Tote"));

    let (status, body) = app.get("/product/static-2").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Ceramic Pour-Over Set"));
    assert!(body.contains("$48.50"));

    let (status, _) = app.get("/product/static-999").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unmatched_routes_redirect_home() {
    let app = TestApp::spawn().await;
    let client = reqwest::Client::builder()
        .redirect(Policy::none())
        .build()
        .expect("Failed to create HTTP client");

    let resp = client
        .get(app.url("/no/such/page"))
        .send()
        .await
        .expect("GET failed");

    assert!(resp.status().is_redirection());
    assert_eq!(
        resp.headers()
            .get(reqwest::header::LOCATION)
            .and_then(|v| v.to_str().ok()),
        Some("/")
    );
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_adding_same_product_twice_merges_lines() {
    let app = TestApp::spawn().await;

    app.post_form("/cart/add", &[("product_id", "static-1")]).await;
    let (status, body) = app
        .post_form("/cart/add", &[("product_id", "static-1")])
        .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.matches("name=\"quantity\" value=\"2\"").count(), 1);
    assert!(body.contains("$68.00"));
}

#[tokio::test]
async fn test_decrement_never_goes_below_one() {
    let app = TestApp::spawn().await;
    app.post_form("/cart/add", &[("product_id", "static-4"), ("quantity", "2")])
        .await;

    let mut body = String::new();
    for _ in 0..3 {
        (_, body) = app
            .post_form("/cart/decrement", &[("product_id", "static-4")])
            .await;
    }

    assert!(body.contains("name=\"quantity\" value=\"1\""));
}

#[tokio::test]
async fn test_remove_and_clear() {
    let app = TestApp::spawn().await;
    app.post_form("/cart/add", &[("product_id", "static-1")]).await;
    app.post_form("/cart/add", &[("product_id", "static-5")]).await;

    let (_, body) = app
        .post_form("/cart/remove", &[("product_id", "static-1")])
        .await;
    assert!(!body.contains("Handwoven Market Basket"));
    assert!(body.contains("Canvas Tote"));

    let (_, body) = app.post_form("/cart/clear", &[]).await;
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_cart_shows_free_shipping_totals() {
    let app = TestApp::spawn().await;
    app.post_form("/cart/add", &[("product_id", "static-3"), ("quantity", "2")])
        .await;

    let (_, body) = app.get("/cart").await;
    assert!(body.contains("$36.00"));
    assert!(body.contains("Free"));
}

#[tokio::test]
async fn test_adding_unknown_product_is_not_found() {
    let app = TestApp::spawn().await;

    let (status, _) = app
        .post_form("/cart/add", &[("product_id", "static-404")])
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// ============================================================================
// Wishlist
// ============================================================================

#[tokio::test]
async fn test_wishlist_toggle_is_pairwise_idempotent() {
    let app = TestApp::spawn().await;

    let (_, body) = app
        .post_form("/wishlist/toggle", &[("product_id", "static-6")])
        .await;
    assert!(body.contains("Brass Bottle Opener"));

    let (_, body) = app
        .post_form("/wishlist/toggle", &[("product_id", "static-6")])
        .await;
    assert!(body.contains("Nothing saved yet"));
}

// ============================================================================
// Checkout
// ============================================================================

#[tokio::test]
async fn test_checkout_with_empty_cart_returns_to_cart() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/checkout").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Your cart is empty"));
}

#[tokio::test]
async fn test_checkout_requires_contact_details() {
    let app = TestApp::spawn().await;
    app.post_form("/cart/add", &[("product_id", "static-1")]).await;

    let (status, body) = app
        .post_form(
            "/checkout",
            &[("name", "Ada"), ("phone", "+1 555 0100"), ("address", "  ")],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Please enter your delivery address"));
    assert!(body.contains("value=\"Ada\""));

    let orders = OrderRepository::new(app.state.store()).all().await.expect("Failed to read orders");
    assert!(orders.is_empty());
}

#[tokio::test]
async fn test_checkout_clears_cart_and_records_order_when_relay_is_down() {
    let app = TestApp::spawn().await;
    app.post_form("/cart/add", &[("product_id", "static-1"), ("quantity", "2")])
        .await;
    app.post_form("/cart/add", &[("product_id", "static-6")]).await;

    let (status, body) = app
        .post_form(
            "/checkout",
            &[
                ("name", "Ada Lovelace"),
                ("phone", "+1 555 0100"),
                ("address", "1 Loop Rd"),
            ],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains(&format!("https://wa.me/{WHATSAPP_NUMBER}?text=")));
    assert!(body.contains("http-equiv=\"refresh\""));

    let (_, cart) = app.get("/cart").await;
    assert!(cart.contains("Your cart is empty"));

    let orders = OrderRepository::new(app.state.store()).all().await.expect("Failed to read orders");
    assert_eq!(orders.len(), 1);
    let order = orders.first().expect("Order was not recorded");
    assert_eq!(order.status, OrderStatus::Pending);
    assert_eq!(order.item_count(), 3);
    assert_eq!(order.customer_name, "Ada Lovelace");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_simultaneous_checkouts_all_record_orders() {
    let app = TestApp::spawn().await;
    let visitors = [app.visitor(), app.visitor(), app.visitor(), app.visitor()];
    for visitor in &visitors {
        visitor
            .post_form("/cart/add", &[("product_id", "static-2")])
            .await;
    }

    async fn checkout(visitor: &TestApp, name: &str) -> (StatusCode, String) {
        visitor
            .post_form(
                "/checkout",
                &[("name", name), ("phone", "555 0100"), ("address", "1 Loop Rd")],
            )
            .await
    }

    let [a, b, c, d] = &visitors;
    let results = tokio::join!(
        checkout(a, "Ada"),
        checkout(b, "Babbage"),
        checkout(c, "Curie"),
        checkout(d, "Dijkstra"),
    );
    for (status, _) in [results.0, results.1, results.2, results.3] {
        assert_eq!(status, StatusCode::OK);
    }

    let orders = OrderRepository::new(app.state.store())
        .all()
        .await
        .expect("Failed to read orders");
    let mut names: Vec<_> = orders.iter().map(|o| o.customer_name.as_str()).collect();
    names.sort_unstable();
    assert_eq!(names, ["Ada", "Babbage", "Curie", "Dijkstra"]);
}

#[tokio::test]
async fn test_success_without_checkout_redirects_home() {
    let app = TestApp::spawn().await;

    let (status, body) = app.get("/success").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Handwoven Market Basket"));
}

#[tokio::test]
async fn test_newsletter_reports_outcome() {
    let app = TestApp::spawn().await;

    let (_, body) = app
        .post_form("/newsletter", &[("email", "reader@example.com")])
        .await;
    assert!(body.contains("Thanks for subscribing!"));

    let (_, body) = app.post_form("/newsletter", &[("email", "nope")]).await;
    assert!(body.contains("Please enter a valid email address."));
}
