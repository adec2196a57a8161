//! Data shared by every page: header badges, the logged-in user, flash
//! messages, and the product card partial.

use bazaar_core::{CurrencyCode, Product, Wishlist, is_static_id};
use tower_sessions::Session;

use crate::models::{CurrentUser, Flash};
use crate::services::visitor::{self, HeaderCounts};
use crate::state::AppState;

/// Page chrome rendered by `base.html`.
pub struct Layout {
    pub store_name: String,
    pub title: String,
    pub user: Option<CurrentUser>,
    pub cart_count: u32,
    pub wishlist_count: usize,
    pub flash: Option<Flash>,
}

impl Layout {
    /// Build the layout for a page, consuming any pending flash message.
    pub async fn load(
        state: &AppState,
        session: &Session,
        user: Option<CurrentUser>,
        title: impl Into<String>,
    ) -> Self {
        let counts = HeaderCounts::load(session).await;
        Self {
            store_name: state.config().store_name.clone(),
            title: title.into(),
            user,
            cart_count: counts.cart,
            wishlist_count: counts.wishlist,
            flash: visitor::take_flash(session).await,
        }
    }

    /// Replace the flash message, for forms re-rendered with an error.
    #[must_use]
    pub fn with_flash(mut self, flash: Flash) -> Self {
        self.flash = Some(flash);
        self
    }
}

/// Product as shown in grids (`partials/product_card.html`).
pub struct ProductCard {
    pub id: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub image: String,
    pub in_wishlist: bool,
    /// Moderation badge for products the public cannot see yet.
    pub badge: Option<&'static str>,
}

impl ProductCard {
    #[must_use]
    pub fn new(product: &Product, currency: CurrencyCode, wishlist: &Wishlist) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: currency.format(product.price),
            category: product.category.clone(),
            image: product.image.clone(),
            in_wishlist: wishlist.contains(&product.id),
            badge: moderation_badge(product),
        }
    }

    /// Cards for a list of products.
    #[must_use]
    pub fn list<'a>(
        products: impl IntoIterator<Item = &'a Product>,
        currency: CurrencyCode,
        wishlist: &Wishlist,
    ) -> Vec<Self> {
        products
            .into_iter()
            .map(|product| Self::new(product, currency, wishlist))
            .collect()
    }
}

/// Label for a product's moderation state, or `None` once it is public.
#[must_use]
pub fn moderation_badge(product: &Product) -> Option<&'static str> {
    if is_static_id(&product.id) || product.is_approved {
        None
    } else if product.is_denied {
        Some("Rejected")
    } else {
        Some("Pending review")
    }
}

/// Only same-site paths are accepted as post-action redirect targets.
#[must_use]
pub fn safe_return_path(candidate: Option<&str>, fallback: &'static str) -> String {
    match candidate {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path.to_string()
        }
        _ => fallback.to_string(),
    }
}
