//! Wishlist route handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use bazaar_core::ProductId;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::layout::{Layout, ProductCard, safe_return_path};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::services::visitor;
use crate::state::AppState;

/// Wishlist page template.
#[derive(Template, WebTemplate)]
#[template(path = "wishlist.html")]
pub struct WishlistTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
}

/// Toggle form data.
#[derive(Debug, Deserialize)]
pub struct ToggleForm {
    pub product_id: String,
    pub redirect_to: Option<String>,
}

/// Display the wishlist.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> WishlistTemplate {
    let wishlist = visitor::wishlist(&session).await;
    let products = ProductCard::list(wishlist.items(), state.config().currency, &wishlist);

    WishlistTemplate {
        layout: Layout::load(&state, &session, user, "Wishlist").await,
        products,
    }
}

/// Add a product to the wishlist, or remove it if already there.
///
/// Removing never needs the catalog, so a product that has since gone away
/// can still be dropped from the list.
///
/// # Errors
///
/// Returns `AppError::NotFound` when adding a product the visitor cannot see.
#[instrument(skip(state, session, user, form), fields(product_id = %form.product_id))]
pub async fn toggle(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<ToggleForm>,
) -> Result<Redirect> {
    let id = ProductId::new(form.product_id.trim());
    let mut wishlist = visitor::wishlist(&session).await;

    if wishlist.remove(&id) {
        add_breadcrumb("wishlist", "Removed from wishlist", Some(&[("product_id", id.as_str())]));
    } else {
        let product = state
            .catalog()
            .get_visible(&id, user.as_ref())
            .await
            .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;
        wishlist.toggle(product);
        add_breadcrumb("wishlist", "Added to wishlist", Some(&[("product_id", id.as_str())]));
    }
    visitor::save_wishlist(&session, &wishlist).await?;

    Ok(Redirect::to(&safe_return_path(
        form.redirect_to.as_deref(),
        "/wishlist",
    )))
}
