//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                                  - Home page (listing + newsletter)
//! GET  /health                            - Health check
//! GET  /health/ready                      - Readiness check
//!
//! # Catalog
//! GET  /categories                        - Category index
//! GET  /category/{name}                   - Category listing
//! GET  /product/{id}                      - Product detail
//!
//! # Cart and wishlist (form POSTs, redirect back)
//! GET  /cart                              - Cart page
//! POST /cart/add                          - Add (merges into an existing line)
//! POST /cart/increment                    - Quantity +1
//! POST /cart/decrement                    - Quantity -1 (never below 1)
//! POST /cart/update                       - Set quantity
//! POST /cart/remove                       - Remove a line
//! POST /cart/clear                        - Empty the cart
//! GET  /wishlist                          - Wishlist page
//! POST /wishlist/toggle                   - Add or remove
//!
//! # Checkout
//! GET  /checkout                          - Contact form
//! POST /checkout                          - Place order (rate limited)
//! GET  /success                           - WhatsApp handoff
//! POST /newsletter                        - Newsletter signup (rate limited)
//!
//! # Auth
//! GET  /auth?screen=login|signup|profile  - Auth wizard
//! POST /auth                              - Submit a screen (rate limited)
//! POST /auth/logout                       - Logout
//!
//! # Dashboard (requires auth)
//! GET  /dashboard                         - Products, moderation and orders
//! POST /dashboard/products                - List a product
//! POST /dashboard/products/{id}           - Edit a product
//! POST /dashboard/products/{id}/delete    - Delete (owner)
//! POST /dashboard/products/{id}/approve   - Approve (admin)
//! POST /dashboard/products/{id}/reject    - Reject (admin)
//! POST /dashboard/orders                  - Manual order (admin)
//! POST /dashboard/orders/{id}/status      - Change order status
//!
//! Anything else redirects to /.
//! ```

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod dashboard;
pub mod home;
pub mod layout;
pub mod newsletter;
pub mod wishlist;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};

use crate::middleware::{auth_rate_limiter, form_rate_limiter};
use crate::state::AppState;

/// Create the catalog routes router.
pub fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(catalog::index))
        .route("/category/{name}", get(catalog::show))
        .route("/product/{id}", get(catalog::product))
}

/// Create the cart routes router.
pub fn cart_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(cart::show))
        .route("/add", post(cart::add))
        .route("/increment", post(cart::increment))
        .route("/decrement", post(cart::decrement))
        .route("/update", post(cart::update))
        .route("/remove", post(cart::remove))
        .route("/clear", post(cart::clear))
}

/// Create the wishlist routes router.
pub fn wishlist_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(wishlist::show))
        .route("/toggle", post(wishlist::toggle))
}

/// Create the dashboard routes router.
pub fn dashboard_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(dashboard::show))
        .route("/products", post(dashboard::create_product))
        .route("/products/{id}", post(dashboard::update_product))
        .route("/products/{id}/delete", post(dashboard::delete_product))
        .route("/products/{id}/approve", post(dashboard::approve_product))
        .route("/products/{id}/reject", post(dashboard::reject_product))
        .route("/orders", post(dashboard::create_manual_order))
        .route("/orders/{id}/status", post(dashboard::update_order_status))
}

/// Login and signup submissions, rate limited per client.
fn auth_submit_routes() -> Router<AppState> {
    Router::new()
        .route("/auth", post(auth::submit))
        .route_layer(auth_rate_limiter())
}

/// Forms that send a relay email, rate limited per client.
fn relay_form_routes() -> Router<AppState> {
    Router::new()
        .route("/checkout", post(checkout::submit))
        .route("/newsletter", post(newsletter::subscribe))
        .route_layer(form_rate_limiter())
}

/// Create all routes for the storefront.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(home::home))
        .merge(catalog_routes())
        .nest("/cart", cart_routes())
        .nest("/wishlist", wishlist_routes())
        .route("/checkout", get(checkout::show))
        .route("/success", get(checkout::success))
        .route("/auth", get(auth::page))
        .route("/auth/logout", post(auth::logout))
        .nest("/dashboard", dashboard_routes())
        .merge(auth_submit_routes())
        .merge(relay_form_routes())
        .fallback(|| async { Redirect::to("/") })
}
