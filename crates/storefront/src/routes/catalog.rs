//! Catalog route handlers: categories, category listings, product detail.

use askama::Template;
use askama_web::WebTemplate;
use axum::extract::{Path, Query, State};
use bazaar_core::{ListingQuery, ProductId, SortOrder, categories};
use rust_decimal::Decimal;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::layout::{Layout, ProductCard, moderation_badge};
use crate::error::{AppError, Result};
use crate::middleware::OptionalAuth;
use crate::services::visitor;
use crate::state::AppState;

/// Listing filters from the query string.
#[derive(Debug, Default, Deserialize)]
pub struct ListingParams {
    pub q: Option<String>,
    pub min: Option<String>,
    pub max: Option<String>,
    pub sort: Option<String>,
}

impl ListingParams {
    /// Unparsable prices are ignored rather than rejected.
    #[must_use]
    pub fn to_query(&self, category: Option<String>) -> ListingQuery {
        let price = |raw: &Option<String>| {
            raw.as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .and_then(|s| s.parse::<Decimal>().ok())
        };

        ListingQuery {
            category,
            search: self.q.clone().filter(|q| !q.trim().is_empty()),
            min_price: price(&self.min),
            max_price: price(&self.max),
            sort: SortOrder::from_query(self.sort.as_deref()),
        }
    }
}

/// A `<select>` option for sorting.
pub struct SortOption {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

/// Current filter values, echoed back into the filter form.
pub struct ListingForm {
    /// Form action path.
    pub action: String,
    pub q: String,
    pub min: String,
    pub max: String,
    pub sort_options: Vec<SortOption>,
}

impl ListingForm {
    #[must_use]
    pub fn new(action: impl Into<String>, params: &ListingParams) -> Self {
        let current = SortOrder::from_query(params.sort.as_deref());
        Self {
            action: action.into(),
            q: params.q.clone().unwrap_or_default(),
            min: params.min.clone().unwrap_or_default(),
            max: params.max.clone().unwrap_or_default(),
            sort_options: SortOrder::OPTIONS
                .iter()
                .map(|&(order, value, label)| SortOption {
                    value,
                    label,
                    selected: order == current,
                })
                .collect(),
        }
    }
}

/// Category link with product count.
pub struct CategoryLink {
    pub name: String,
    pub href: String,
    pub count: usize,
}

impl CategoryLink {
    #[must_use]
    pub fn list(counts: Vec<(String, usize)>) -> Vec<Self> {
        counts
            .into_iter()
            .map(|(name, count)| Self {
                href: format!("/category/{}", urlencoding::encode(&name)),
                name,
                count,
            })
            .collect()
    }
}

/// Categories page template.
#[derive(Template, WebTemplate)]
#[template(path = "categories.html")]
pub struct CategoriesTemplate {
    pub layout: Layout,
    pub categories: Vec<CategoryLink>,
}

/// Category listing template.
#[derive(Template, WebTemplate)]
#[template(path = "category.html")]
pub struct CategoryTemplate {
    pub layout: Layout,
    pub category: String,
    pub products: Vec<ProductCard>,
    pub form: ListingForm,
}

/// Product detail template.
#[derive(Template, WebTemplate)]
#[template(path = "product.html")]
pub struct ProductTemplate {
    pub layout: Layout,
    pub product: ProductDetail,
    pub related: Vec<ProductCard>,
}

/// Product detail display data.
pub struct ProductDetail {
    pub id: String,
    pub name: String,
    pub price: String,
    pub description: String,
    pub category: String,
    pub category_href: String,
    pub images: Vec<String>,
    pub in_wishlist: bool,
    pub in_cart: u32,
    pub badge: Option<&'static str>,
}

/// Number of related products shown under a product.
const RELATED_LIMIT: usize = 4;

/// Display all categories.
#[instrument(skip(state, session, user))]
pub async fn index(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
) -> CategoriesTemplate {
    let products = state.catalog().visible(user.as_ref()).await;
    let categories = CategoryLink::list(categories(&products));

    CategoriesTemplate {
        layout: Layout::load(&state, &session, user, "Categories").await,
        categories,
    }
}

/// Display products in a category.
#[instrument(skip(state, session, user, params))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(name): Path<String>,
    Query(params): Query<ListingParams>,
) -> CategoryTemplate {
    let products = state.catalog().visible(user.as_ref()).await;
    let wishlist = visitor::wishlist(&session).await;
    let listed = params.to_query(Some(name.clone())).apply(&products);
    let cards = ProductCard::list(listed, state.config().currency, &wishlist);

    CategoryTemplate {
        layout: Layout::load(&state, &session, user, name.clone()).await,
        form: ListingForm::new(format!("/category/{}", urlencoding::encode(&name)), &params),
        category: name,
        products: cards,
    }
}

/// Display a single product.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the product does not exist or the viewer
/// may not see it.
#[instrument(skip(state, session, user))]
pub async fn product(
    State(state): State<AppState>,
    session: Session,
    OptionalAuth(user): OptionalAuth,
    Path(id): Path<String>,
) -> Result<ProductTemplate> {
    let id = ProductId::new(id);
    let products = state.catalog().visible(user.as_ref()).await;
    let product = products
        .iter()
        .find(|p| p.id == id)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))?;

    let currency = state.config().currency;
    let wishlist = visitor::wishlist(&session).await;
    let cart = visitor::cart(&session).await;

    let related_query = ListingQuery {
        category: Some(product.category.clone()),
        ..ListingQuery::default()
    };
    let related = related_query
        .apply(&products)
        .into_iter()
        .filter(|p| p.id != product.id)
        .take(RELATED_LIMIT);
    let related = ProductCard::list(related, currency, &wishlist);

    let detail = ProductDetail {
        id: product.id.to_string(),
        name: product.name.clone(),
        price: currency.format(product.price),
        description: product.description.clone(),
        category: product.category.clone(),
        category_href: format!("/category/{}", urlencoding::encode(&product.category)),
        images: product.image_set().into_iter().map(str::to_string).collect(),
        in_wishlist: wishlist.contains(&product.id),
        in_cart: cart
            .items()
            .iter()
            .find(|line| line.product.id == product.id)
            .map_or(0, |line| line.quantity),
        badge: moderation_badge(product),
    };

    Ok(ProductTemplate {
        layout: Layout::load(&state, &session, user, product.name.clone()).await,
        product: detail,
        related,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_listing_params_ignore_bad_prices() {
        let params = ListingParams {
            q: Some("  ".to_string()),
            min: Some("abc".to_string()),
            max: Some("20".to_string()),
            sort: Some("price_desc".to_string()),
        };
        let query = params.to_query(None);
        assert!(query.search.is_none());
        assert!(query.min_price.is_none());
        assert_eq!(query.max_price, Some(Decimal::new(20, 0)));
        assert_eq!(query.sort, SortOrder::PriceDesc);
    }

    #[test]
    fn test_listing_form_marks_selected_sort() {
        let params = ListingParams {
            sort: Some("name".to_string()),
            ..ListingParams::default()
        };
        let form = ListingForm::new("/", &params);
        let selected: Vec<_> = form
            .sort_options
            .iter()
            .filter(|o| o.selected)
            .map(|o| o.value)
            .collect();
        assert_eq!(selected, vec!["name"]);
    }

    #[test]
    fn test_category_links_are_encoded() {
        let links = CategoryLink::list(vec![("Home & Garden".to_string(), 2)]);
        assert_eq!(links[0].href, "/category/Home%20%26%20Garden");
    }
}
