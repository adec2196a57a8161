//! Checkout route handlers.
//!
//! `POST /checkout` records the order, clears the cart and sends the visitor
//! to `/success`, which forwards them to WhatsApp with the summary pre-filled.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::cart::CartView;
use super::layout::Layout;
use crate::error::{Result, add_breadcrumb};
use crate::middleware::OptionalAuth;
use crate::models::Flash;
use crate::services::checkout::validate_customer;
use crate::services::{CheckoutError, CheckoutService, visitor};
use crate::state::AppState;

/// Contact details form. Fields are echoed back when validation fails.
#[derive(Debug, Default, Deserialize)]
pub struct CheckoutForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
}

/// Checkout page template.
#[derive(Template, WebTemplate)]
#[template(path = "checkout.html")]
pub struct CheckoutTemplate {
    pub layout: Layout,
    pub cart: CartView,
    pub form: CheckoutForm,
}

/// Success page template.
#[derive(Template, WebTemplate)]
#[template(path = "success.html")]
pub struct SuccessTemplate {
    pub layout: Layout,
    pub order_id: String,
    pub deep_link: String,
}

/// Display the checkout form.
#[instrument(skip(state, session, user))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    let cart = visitor::cart(&session).await;
    if cart.is_empty() {
        return Redirect::to("/cart").into_response();
    }

    let form = CheckoutForm {
        name: user.as_ref().map(|u| u.name.clone()).unwrap_or_default(),
        ..CheckoutForm::default()
    };

    CheckoutTemplate {
        layout: Layout::load(&state, &session, user, "Checkout").await,
        cart: CartView::new(&cart, state.config().currency),
        form,
    }
    .into_response()
}

/// Place the order.
///
/// Invalid contact details re-render the form with the error; an empty cart
/// goes back to `/cart`.
///
/// # Errors
///
/// Returns an error if the order cannot be stored or the session cannot be
/// modified.
#[instrument(skip(state, session, user, form))]
pub async fn submit(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Form(form): Form<CheckoutForm>,
) -> Result<Response> {
    let mut cart = visitor::cart(&session).await;
    if cart.is_empty() {
        visitor::flash(&session, Flash::error(CheckoutError::EmptyCart.to_string())).await;
        return Ok(Redirect::to("/cart").into_response());
    }

    let customer = match validate_customer(&form.name, &form.phone, &form.address) {
        Ok(customer) => customer,
        Err(e) => {
            let layout = Layout::load(&state, &session, user, "Checkout").await;
            return Ok(CheckoutTemplate {
                layout: layout.with_flash(Flash::error(e.to_string())),
                cart: CartView::new(&cart, state.config().currency),
                form,
            }
            .into_response());
        }
    };

    let checkout = CheckoutService::new(state.store(), state.relay(), state.config());
    let (order, handoff) = checkout.place_order(&cart, customer, user.as_ref()).await?;

    cart.clear();
    visitor::save_cart(&session, &cart).await?;
    visitor::save_last_checkout(&session, &handoff).await?;
    add_breadcrumb("checkout", "Order placed", Some(&[("order_id", order.id.as_str())]));

    Ok(Redirect::to("/success").into_response())
}

/// Show the handoff link for the last order.
#[instrument(skip(state, session, user))]
pub async fn success(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> Response {
    let Some(handoff) = visitor::last_checkout(&session).await else {
        return Redirect::to("/").into_response();
    };

    SuccessTemplate {
        layout: Layout::load(&state, &session, user, "Order placed").await,
        order_id: handoff.order_id.short().to_string(),
        deep_link: handoff.deep_link,
    }
    .into_response()
}
