//! Cart route handlers.
//!
//! The cart lives in the session as a list of product snapshots. Every action
//! is a plain form POST that redirects back (to `redirect_to` when it is a
//! same-site path, otherwise to `/cart`).

use askama::Template;
use askama_web::WebTemplate;
use axum::{Form, extract::State, response::Redirect};
use bazaar_core::{Cart, CartItem, CurrencyCode, ProductId};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::layout::{Layout, safe_return_path};
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::services::checkout::SHIPPING_POLICY;
use crate::services::visitor;
use crate::state::AppState;

/// Cart line display data for templates.
pub struct CartLineView {
    pub id: String,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_total: String,
}

impl CartLineView {
    fn new(line: &CartItem, currency: CurrencyCode) -> Self {
        Self {
            id: line.product.id.to_string(),
            name: line.product.name.clone(),
            image: line.product.image.clone(),
            quantity: line.quantity,
            price: currency.format(line.product.price),
            line_total: currency.format(line.line_total()),
        }
    }
}

/// Cart display data for templates.
pub struct CartView {
    pub lines: Vec<CartLineView>,
    pub item_count: u32,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
}

impl CartView {
    #[must_use]
    pub fn new(cart: &Cart, currency: CurrencyCode) -> Self {
        let totals = cart.totals(SHIPPING_POLICY);
        Self {
            lines: cart
                .items()
                .iter()
                .map(|line| CartLineView::new(line, currency))
                .collect(),
            item_count: cart.item_count(),
            subtotal: currency.format(totals.subtotal),
            shipping: shipping_label(totals.fee, currency),
            total: currency.format(totals.total),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

/// `Free` when no fee is charged.
#[must_use]
pub fn shipping_label(fee: Decimal, currency: CurrencyCode) -> String {
    if fee.is_zero() {
        "Free".to_string()
    } else {
        currency.format(fee)
    }
}

/// Form data for actions on a single product.
#[derive(Debug, Deserialize)]
pub struct CartLineForm {
    pub product_id: String,
    pub quantity: Option<String>,
    pub redirect_to: Option<String>,
}

impl CartLineForm {
    fn product_id(&self) -> ProductId {
        ProductId::new(self.product_id.trim())
    }

    /// Missing or unparsable quantities count as one.
    fn quantity(&self) -> u32 {
        self.quantity
            .as_deref()
            .and_then(|q| q.trim().parse().ok())
            .unwrap_or(1)
    }

    fn redirect(&self) -> Redirect {
        Redirect::to(&safe_return_path(self.redirect_to.as_deref(), "/cart"))
    }
}

/// Form data for clearing the cart.
#[derive(Debug, Default, Deserialize)]
pub struct ClearCartForm {
    pub redirect_to: Option<String>,
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart.html")]
pub struct CartTemplate {
    pub layout: Layout,
    pub cart: CartView,
}

/// Display cart page.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> CartTemplate {
    let cart = visitor::cart(&session).await;

    CartTemplate {
        layout: Layout::load(&state, &session, user, "Cart").await,
        cart: CartView::new(&cart, state.config().currency),
    }
}

/// Add a product to the cart, merging with an existing line.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product is not visible to the visitor.
#[instrument(skip(state, session, user, form), fields(product_id = %form.product_id))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<CartLineForm>,
) -> Result<Redirect> {
    let id = form.product_id();
    let product = state
        .catalog()
        .get_visible(&id, user.as_ref())
        .await
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let name = product.name.clone();
    let mut cart = visitor::cart(&session).await;
    cart.add(product, form.quantity());
    visitor::save_cart(&session, &cart).await?;

    add_breadcrumb("cart", "Added to cart", Some(&[("product_id", id.as_str())]));
    visitor::flash(&session, Flash::success(format!("{name} added to cart"))).await;

    Ok(form.redirect())
}

/// Increase a line by one.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(session, form), fields(product_id = %form.product_id))]
pub async fn increment(session: Session, Form(form): Form<CartLineForm>) -> Result<Redirect> {
    edit_line(&session, &form, |cart, id| cart.increment(id)).await
}

/// Decrease a line by one, never below one.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(session, form), fields(product_id = %form.product_id))]
pub async fn decrement(session: Session, Form(form): Form<CartLineForm>) -> Result<Redirect> {
    edit_line(&session, &form, |cart, id| cart.decrement(id)).await
}

/// Set a line's quantity.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(session, form), fields(product_id = %form.product_id))]
pub async fn update(session: Session, Form(form): Form<CartLineForm>) -> Result<Redirect> {
    let quantity = form.quantity();
    edit_line(&session, &form, |cart, id| cart.set_quantity(id, quantity)).await
}

/// Remove a line.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(session, form), fields(product_id = %form.product_id))]
pub async fn remove(session: Session, Form(form): Form<CartLineForm>) -> Result<Redirect> {
    let removed = edit_line(&session, &form, |cart, id| cart.remove(id)).await?;
    add_breadcrumb(
        "cart",
        "Removed from cart",
        Some(&[("product_id", form.product_id.as_str())]),
    );
    Ok(removed)
}

/// Empty the cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
#[instrument(skip(session, form))]
pub async fn clear(session: Session, Form(form): Form<ClearCartForm>) -> Result<Redirect> {
    let mut cart = visitor::cart(&session).await;
    cart.clear();
    visitor::save_cart(&session, &cart).await?;
    add_breadcrumb("cart", "Cleared cart", None);

    Ok(Redirect::to(&safe_return_path(
        form.redirect_to.as_deref(),
        "/cart",
    )))
}

/// Apply `edit` to the cart and save it if a line changed.
async fn edit_line<F>(session: &Session, form: &CartLineForm, edit: F) -> Result<Redirect>
where
    F: FnOnce(&mut Cart, &ProductId) -> bool,
{
    let id = form.product_id();
    let mut cart = visitor::cart(session).await;
    if edit(&mut cart, &id) {
        visitor::save_cart(session, &cart).await?;
    } else {
        tracing::debug!(product_id = %id, "Cart has no line for product");
    }
    Ok(form.redirect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bazaar_core::Product;
    use chrono::Utc;

    fn line(id: &str, price: i64, quantity: u32) -> CartItem {
        CartItem {
            product: Product {
                id: ProductId::new(id),
                name: id.to_uppercase(),
                price: Decimal::new(price, 0),
                description: String::new(),
                category: "Home".to_string(),
                image: String::new(),
                images: Vec::new(),
                user_id: None,
                is_approved: true,
                is_denied: false,
                created_at: Utc::now(),
            },
            quantity,
        }
    }

    #[test]
    fn test_cart_view_totals_with_free_shipping() {
        let mut cart = Cart::default();
        let a = line("a", 10, 2);
        let b = line("b", 5, 3);
        cart.add(a.product, a.quantity);
        cart.add(b.product, b.quantity);

        let view = CartView::new(&cart, CurrencyCode::USD);
        assert_eq!(view.item_count, 5);
        assert_eq!(view.subtotal, "$35.00");
        assert_eq!(view.shipping, "Free");
        assert_eq!(view.total, "$35.00");
        assert_eq!(view.lines[0].line_total, "$20.00");
    }

    #[test]
    fn test_form_quantity_defaults_to_one() {
        let form = CartLineForm {
            product_id: " static-1 ".to_string(),
            quantity: Some("abc".to_string()),
            redirect_to: Some("//elsewhere".to_string()),
        };
        assert_eq!(form.quantity(), 1);
        assert_eq!(form.product_id().as_str(), "static-1");
    }
}
