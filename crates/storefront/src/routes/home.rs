//! Home page route handler.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Query, State};
use bazaar_core::categories;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::catalog::{CategoryLink, ListingForm, ListingParams};
use super::layout::{Layout, ProductCard};
use crate::middleware::OptionalAuth;
use crate::services::visitor;
use crate::state::AppState;

/// Home page query: listing filters plus the newsletter result flag.
#[derive(Debug, Default, Deserialize)]
pub struct HomeParams {
    #[serde(flatten)]
    pub listing: ListingParams,
    /// `1` after a successful newsletter signup, `0` after a rejected one.
    pub subscribed: Option<String>,
}

/// Home page template.
#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub layout: Layout,
    pub products: Vec<ProductCard>,
    pub categories: Vec<CategoryLink>,
    pub form: ListingForm,
    pub subscribed: Option<bool>,
}

/// Display the home page: every visible product, filtered and sorted.
#[instrument(skip(state, session, user, params))]
pub async fn home(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Query(params): Query<HomeParams>,
) -> HomeTemplate {
    let products = state.catalog().visible(user.as_ref()).await;
    let wishlist = visitor::wishlist(&session).await;

    let listed = params.listing.to_query(None).apply(&products);
    let cards = ProductCard::list(listed, state.config().currency, &wishlist);
    let store_name = state.config().store_name.clone();

    HomeTemplate {
        layout: Layout::load(&state, &session, user, store_name).await,
        products: cards,
        categories: CategoryLink::list(categories(&products)),
        form: ListingForm::new("/", &params.listing),
        subscribed: params.subscribed.as_deref().map(|flag| flag == "1"),
    }
}
