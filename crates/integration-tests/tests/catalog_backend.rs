//! Integration tests for seller listings against a product backend.
//!
//! A [`MockBackend`] stands in for the document store, so these tests cover
//! the whole path from dashboard form to backend request to public listing.

use bazaar_core::{Email, Role};
use bazaar_integration_tests::{ADMIN_EMAIL, MockBackend, TestApp};
use bazaar_storefront::db::UserRepository;
use reqwest::StatusCode;

const MUG: &[(&str, &str)] = &[
    ("name", "Handmade Mug"),
    ("price", "18.50"),
    ("description", "Stoneware, glazed by hand."),
    ("category", "Kitchen"),
    ("image", "https://example.com/mug.jpg"),
    ("images", ""),
];

async fn spawn_with_backend() -> (TestApp, MockBackend) {
    let (backend, url) = MockBackend::spawn().await;
    let app = TestApp::spawn_with(MockBackend::config(&url)).await;
    (app, backend)
}

#[tokio::test]
async fn test_seller_listing_waits_for_approval() {
    let (seller, backend) = spawn_with_backend().await;
    seller.signup("Sam", "sam@example.com", "sam-password").await;

    let (status, body) = seller.post_form("/dashboard/products", MUG).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("Handmade Mug was submitted for review"));
    assert!(body.contains("Pending review"));

    let stored = backend.products().await;
    assert_eq!(stored.len(), 1);
    assert!(!stored[0].is_approved);
    let path = format!("/product/{}", stored[0].id);

    // Owner sees the pending listing; everyone else does not.
    let (status, _) = seller.get(&path).await;
    assert_eq!(status, StatusCode::OK);

    let anonymous = seller.visitor();
    let (status, _) = anonymous.get(&path).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, home) = anonymous.get("/").await;
    assert!(!home.contains("Handmade Mug"));

    // Sellers cannot approve their own listings.
    let (_, body) = seller
        .post_form(&format!("/dashboard/products/{}/approve", stored[0].id), &[])
        .await;
    assert!(body.contains("Only admins can moderate products"));

    let admin = seller.visitor();
    admin.signup("Owner", ADMIN_EMAIL, "admin-password").await;
    let (_, body) = admin
        .post_form(&format!("/dashboard/products/{}/approve", stored[0].id), &[])
        .await;
    assert!(body.contains("Handmade Mug approved"));

    assert!(backend.products().await[0].is_approved);
    let (status, page) = anonymous.get(&path).await;
    assert_eq!(status, StatusCode::OK);
    assert!(page.contains("Handmade Mug"));
    assert!(page.contains("$18.50"));
}

#[tokio::test]
async fn test_admin_listing_is_live_and_rejection_hides_it() {
    let (admin, backend) = spawn_with_backend().await;
    admin.signup("Owner", ADMIN_EMAIL, "admin-password").await;

    let (_, body) = admin.post_form("/dashboard/products", MUG).await;
    assert!(body.contains("Handmade Mug is live"));

    let anonymous = admin.visitor();
    let (_, home) = anonymous.get("/").await;
    assert!(home.contains("Handmade Mug"));

    let id = backend.products().await[0].id.clone();
    let (_, body) = admin
        .post_form(&format!("/dashboard/products/{id}/reject"), &[])
        .await;
    assert!(body.contains("Handmade Mug rejected"));

    let stored = backend.products().await;
    assert!(stored[0].is_denied);
    assert!(!stored[0].is_approved);
    let (_, home) = anonymous.get("/").await;
    assert!(!home.contains("Handmade Mug"));
}

#[tokio::test]
async fn test_demoted_admin_cannot_moderate() {
    let (seller, backend) = spawn_with_backend().await;
    seller.signup("Sam", "sam@example.com", "sam-password").await;
    seller.post_form("/dashboard/products", MUG).await;
    let id = backend.products().await[0].id.clone();

    let admin = seller.visitor();
    admin.signup("Owner", ADMIN_EMAIL, "admin-password").await;
    UserRepository::new(admin.state.store())
        .set_role(
            &Email::parse(ADMIN_EMAIL).expect("valid admin email"),
            Role::User,
        )
        .await
        .expect("Failed to demote");

    let (_, body) = admin
        .post_form(&format!("/dashboard/products/{id}/approve"), &[])
        .await;
    assert!(body.contains("Only admins can moderate products"));
    assert!(!backend.products().await[0].is_approved);
}

#[tokio::test]
async fn test_invalid_listing_is_flashed_and_not_sent() {
    let (seller, backend) = spawn_with_backend().await;
    seller.signup("Sam", "sam@example.com", "sam-password").await;

    let (status, _) = seller
        .post_form(
            "/dashboard/products",
            &[("name", "Free Lunch"), ("price", "-3"), ("category", "Food")],
        )
        .await;

    assert_eq!(status, StatusCode::OK);
    assert!(backend.products().await.is_empty());
}

#[tokio::test]
async fn test_static_products_cannot_be_deleted() {
    let (seller, _backend) = spawn_with_backend().await;
    seller.signup("Sam", "sam@example.com", "sam-password").await;

    let (_, body) = seller
        .post_form("/dashboard/products/static-1/delete", &[])
        .await;
    assert!(body.contains("static products cannot be changed"));

    let (status, _) = seller.get("/product/static-1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_backend_outage_keeps_last_snapshot() {
    let (admin, backend) = spawn_with_backend().await;
    admin.signup("Owner", ADMIN_EMAIL, "admin-password").await;
    admin.post_form("/dashboard/products", MUG).await;

    backend.set_failing(true);
    admin.state.catalog().refresh().await;

    let anonymous = admin.visitor();
    let (status, home) = anonymous.get("/").await;
    assert_eq!(status, StatusCode::OK);
    assert!(home.contains("Handmade Mug"));

    // Writes surface the outage instead of pretending to succeed.
    let (status, _) = admin.post_form("/dashboard/products", MUG).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    backend.set_failing(false);
    admin.state.catalog().refresh().await;
    assert_eq!(backend.products().await.len(), 1);
}

#[tokio::test]
async fn test_dashboard_without_backend_is_read_only() {
    let app = TestApp::spawn().await;
    app.signup("Sam", "sam@example.com", "sam-password").await;

    let (status, body) = app.post_form("/dashboard/products", MUG).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("product backend is not configured"));
}
