//! Seller and admin dashboard.
//!
//! Every logged-in user is a seller: they list products (pending until an
//! admin approves them), edit or delete their own listings, and follow orders
//! that contain their products. Admins additionally moderate listings, see
//! every order and can enter orders by hand.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, Query, State},
    response::Redirect,
};
use bazaar_core::{
    CartItem, CurrencyCode, Order, OrderId, OrderSource, OrderStatus, Product, ProductDraft,
    ProductId, is_static_id,
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use super::cart::shipping_label;
use super::layout::{Layout, moderation_badge};
use crate::db::OrderRepository;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireAuth;
use crate::models::{CurrentUser, Flash};
use crate::services::checkout::{SHIPPING_POLICY, validate_customer};
use crate::services::{CatalogError, visitor};
use crate::state::AppState;

/// `?edit=` selects the product loaded into the product form.
#[derive(Debug, Default, Deserialize)]
pub struct DashboardQuery {
    pub edit: Option<String>,
}

/// Product create/edit form data.
#[derive(Debug, Default, Deserialize)]
pub struct ProductForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image: String,
    /// Extra image URLs, one per line or comma separated.
    #[serde(default)]
    pub images: String,
}

impl ProductForm {
    fn parse(&self) -> std::result::Result<ProductDraft, bazaar_core::DraftError> {
        ProductDraft::parse(
            &self.name,
            &self.price,
            &self.description,
            &self.category,
            &self.image,
            &self.images,
        )
    }
}

/// Order status form data.
#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: String,
}

/// Manual order form data.
#[derive(Debug, Default, Deserialize)]
pub struct ManualOrderForm {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub product_id: String,
    #[serde(default)]
    pub quantity: String,
}

/// A product row in the dashboard tables.
pub struct DashboardProduct {
    pub id: String,
    pub name: String,
    pub price: String,
    pub category: String,
    pub image: String,
    pub status: &'static str,
    pub can_edit: bool,
    pub can_delete: bool,
}

impl DashboardProduct {
    fn new(product: &Product, viewer: &CurrentUser, currency: CurrencyCode) -> Self {
        let mutable = !is_static_id(&product.id);
        let owned = product.is_owned_by(&viewer.id);
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            price: currency.format(product.price),
            category: product.category.clone(),
            image: product.image.clone(),
            status: moderation_badge(product).unwrap_or("Live"),
            can_edit: mutable && (owned || viewer.is_admin()),
            can_delete: mutable && owned,
        }
    }
}

/// The product form, blank for a new listing or filled for an edit.
pub struct ProductFormView {
    pub action: String,
    pub heading: &'static str,
    pub editing: bool,
    pub name: String,
    pub price: String,
    pub description: String,
    pub category: String,
    pub image: String,
    pub images: String,
}

impl ProductFormView {
    fn blank() -> Self {
        Self {
            action: "/dashboard/products".to_string(),
            heading: "List a new product",
            editing: false,
            name: String::new(),
            price: String::new(),
            description: String::new(),
            category: String::new(),
            image: String::new(),
            images: String::new(),
        }
    }

    fn edit(product: &Product) -> Self {
        Self {
            action: format!("/dashboard/products/{}", urlencoding::encode(product.id.as_str())),
            heading: "Edit product",
            editing: true,
            name: product.name.clone(),
            price: product.price.to_string(),
            description: product.description.clone(),
            category: product.category.clone(),
            image: product.image.clone(),
            images: product.images.join("\n"),
        }
    }
}

/// A `<select>` option for order status.
pub struct StatusOption {
    pub value: &'static str,
    pub selected: bool,
}

/// An order row.
pub struct OrderView {
    pub id: String,
    pub short_id: String,
    pub customer_name: String,
    pub phone: String,
    pub address: String,
    pub lines: Vec<String>,
    pub subtotal: String,
    pub shipping: String,
    pub total: String,
    pub status: &'static str,
    pub manual: bool,
    pub placed_at: String,
    pub can_update: bool,
    pub status_options: Vec<StatusOption>,
}

impl OrderView {
    fn new(order: &Order, viewer: &CurrentUser, currency: CurrencyCode) -> Self {
        Self {
            id: order.id.to_string(),
            short_id: order.id.short().to_string(),
            customer_name: order.customer_name.clone(),
            phone: order.phone.clone(),
            address: order.address.clone(),
            lines: order
                .items
                .iter()
                .map(|line| {
                    format!(
                        "{} x{} ({})",
                        line.product.name,
                        line.quantity,
                        currency.format(line.line_total())
                    )
                })
                .collect(),
            subtotal: currency.format(order.subtotal),
            shipping: shipping_label(order.fee, currency),
            total: currency.format(order.total),
            status: order.status.as_str(),
            manual: order.source == OrderSource::Manual,
            placed_at: order.created_at.format("%Y-%m-%d %H:%M").to_string(),
            can_update: can_update_order(order, viewer),
            status_options: OrderStatus::ALL
                .into_iter()
                .map(|status| StatusOption {
                    value: status.as_str(),
                    selected: status == order.status,
                })
                .collect(),
        }
    }

    fn list(orders: &[Order], viewer: &CurrentUser, currency: CurrencyCode) -> Vec<Self> {
        orders
            .iter()
            .map(|order| Self::new(order, viewer, currency))
            .collect()
    }
}

/// Admins update any order; sellers update orders containing their products.
#[must_use]
pub fn can_update_order(order: &Order, viewer: &CurrentUser) -> bool {
    viewer.is_admin() || order.involves_seller(&viewer.id)
}

/// Dashboard template.
#[derive(Template, WebTemplate)]
#[template(path = "dashboard.html")]
pub struct DashboardTemplate {
    pub layout: Layout,
    pub is_admin: bool,
    /// False when no product backend is configured.
    pub catalog_writable: bool,
    pub my_products: Vec<DashboardProduct>,
    /// Remote listings from other sellers (admins only).
    pub moderation: Vec<DashboardProduct>,
    pub product_form: ProductFormView,
    /// Orders for the admin (all) or seller (containing their products).
    pub sales: Vec<OrderView>,
    pub my_orders: Vec<OrderView>,
}

/// Display the dashboard.
///
/// # Errors
///
/// Returns an error if orders cannot be read.
#[instrument(skip(state, session, user, query), fields(user_id = %user.id))]
pub async fn show(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Query(query): Query<DashboardQuery>,
) -> Result<DashboardTemplate> {
    let currency = state.config().currency;
    let products = state.catalog().all().await;
    let orders = OrderRepository::new(state.store());

    let my_products = products
        .iter()
        .filter(|p| p.is_owned_by(&user.id))
        .map(|p| DashboardProduct::new(p, &user, currency))
        .collect();
    let moderation = if user.is_admin() {
        products
            .iter()
            .filter(|p| !is_static_id(&p.id) && !p.is_owned_by(&user.id))
            .map(|p| DashboardProduct::new(p, &user, currency))
            .collect()
    } else {
        Vec::new()
    };

    let editing = query
        .edit
        .as_deref()
        .map(ProductId::new)
        .and_then(|id| products.iter().find(|p| p.id == id))
        .filter(|p| !is_static_id(&p.id) && (p.is_owned_by(&user.id) || user.is_admin()));
    let product_form = editing.map_or_else(ProductFormView::blank, ProductFormView::edit);

    let sales = if user.is_admin() {
        orders.all().await?
    } else {
        orders.for_seller(&user.id).await?
    };
    let my_orders = orders.for_buyer(&user.id).await?;

    Ok(DashboardTemplate {
        is_admin: user.is_admin(),
        catalog_writable: state.catalog().is_writable(),
        my_products,
        moderation,
        product_form,
        sales: OrderView::list(&sales, &user, currency),
        my_orders: OrderView::list(&my_orders, &user, currency),
        layout: Layout::load(&state, &session, Some(user), "Dashboard").await,
    })
}

/// List a new product.
///
/// # Errors
///
/// Returns an error if the product backend fails. Invalid input and missing
/// permissions are reported as flash messages.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn create_product(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let result = match form.parse() {
        Ok(draft) => state.catalog().create(draft, &user).await.map(|product| {
            if product.is_approved {
                format!("{} is live", product.name)
            } else {
                format!("{} was submitted for review", product.name)
            }
        }),
        Err(e) => Err(CatalogError::from(e)),
    };

    finish_product_action(&session, result, "/dashboard").await
}

/// Save edits to a product.
///
/// # Errors
///
/// Returns an error if the product backend fails.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_product(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<ProductForm>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    let result = match form.parse() {
        Ok(draft) => state
            .catalog()
            .update(&id, draft, &user)
            .await
            .map(|product| format!("{} was updated", product.name)),
        Err(e) => Err(CatalogError::from(e)),
    };

    let retry = format!("/dashboard?edit={}", urlencoding::encode(id.as_str()));
    match result {
        Ok(message) => finish_product_action(&session, Ok(message), "/dashboard").await,
        Err(e) => finish_product_action(&session, Err(e), &retry).await,
    }
}

/// Delete one of the seller's products.
///
/// # Errors
///
/// Returns an error if the product backend fails.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn delete_product(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let id = ProductId::new(id);
    let result = state
        .catalog()
        .delete(&id, &user)
        .await
        .map(|()| "Product deleted".to_string());

    finish_product_action(&session, result, "/dashboard").await
}

/// Approve a listing.
///
/// # Errors
///
/// Returns an error if the product backend fails.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn approve_product(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let result = state
        .catalog()
        .approve(&ProductId::new(id), &user)
        .await
        .map(|product| format!("{} approved", product.name));

    finish_product_action(&session, result, "/dashboard").await
}

/// Reject a listing.
///
/// # Errors
///
/// Returns an error if the product backend fails.
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn reject_product(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
) -> Result<Redirect> {
    let result = state
        .catalog()
        .reject(&ProductId::new(id), &user)
        .await
        .map(|product| format!("{} rejected", product.name));

    finish_product_action(&session, result, "/dashboard").await
}

/// Flash the outcome of a product action and redirect.
///
/// Errors the seller can act on become flash messages; backend and storage
/// failures propagate as error pages.
async fn finish_product_action(
    session: &Session,
    result: std::result::Result<String, CatalogError>,
    on_error: &str,
) -> Result<Redirect> {
    match result {
        Ok(message) => {
            add_breadcrumb("dashboard", &message, None);
            visitor::flash(session, Flash::success(message)).await;
            Ok(Redirect::to("/dashboard"))
        }
        Err(
            e @ (CatalogError::Draft(_)
            | CatalogError::Forbidden(_)
            | CatalogError::Immutable
            | CatalogError::NotFound(_)
            | CatalogError::BackendDisabled),
        ) => {
            tracing::info!(error = %e, "Product action rejected");
            visitor::flash(session, Flash::error(e.to_string())).await;
            Ok(Redirect::to(on_error))
        }
        Err(e) => Err(e.into()),
    }
}

/// Change an order's status.
///
/// # Errors
///
/// Returns `AppError::NotFound` for an unknown order, `AppError::Forbidden`
/// if the user may not manage it, or `AppError::BadRequest` for an unknown
/// status.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_order_status(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Path(id): Path<String>,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let id = OrderId::new(id);
    let status: OrderStatus = form.status.parse().map_err(AppError::BadRequest)?;
    let orders = OrderRepository::new(state.store());

    let order = orders
        .get(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("order {id}")))?;
    if !can_update_order(&order, &user) {
        return Err(AppError::Forbidden(
            "Only admins or sellers in this order can update it".to_string(),
        ));
    }

    let order = orders.set_status(&id, status).await?;
    tracing::info!(order_id = %order.id, status = %order.status, "Order status updated");
    visitor::flash(
        &session,
        Flash::success(format!("Order {} is now {}", order.id.short(), order.status)),
    )
    .await;

    Ok(Redirect::to("/dashboard"))
}

/// Enter an order by hand (admin only).
///
/// # Errors
///
/// Returns `AppError::Forbidden` for non-admins, or an error if the order
/// cannot be stored.
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn create_manual_order(
    State(state): State<AppState>,
    session: Session,
    RequireAuth(user): RequireAuth,
    Form(form): Form<ManualOrderForm>,
) -> Result<Redirect> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Only admins can enter orders".to_string()));
    }

    let customer = match validate_customer(&form.name, &form.phone, &form.address) {
        Ok(customer) => customer,
        Err(e) => {
            visitor::flash(&session, Flash::error(e.to_string())).await;
            return Ok(Redirect::to("/dashboard"));
        }
    };

    let id = ProductId::new(form.product_id.trim());
    let Some(product) = state.catalog().all().await.into_iter().find(|p| p.id == id) else {
        visitor::flash(&session, Flash::error(format!("No product with id {id}"))).await;
        return Ok(Redirect::to("/dashboard"));
    };
    let quantity = form.quantity.trim().parse::<u32>().unwrap_or(1).max(1);

    let order = Order::new(
        None,
        customer,
        vec![CartItem { product, quantity }],
        SHIPPING_POLICY,
        OrderSource::Manual,
    );
    let order = OrderRepository::new(state.store()).create(order).await?;

    tracing::info!(order_id = %order.id, "Manual order recorded");
    visitor::flash(
        &session,
        Flash::success(format!("Order {} recorded", order.id.short())),
    )
    .await;

    Ok(Redirect::to("/dashboard"))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::{Customer, Email, Role, ShippingPolicy, UserId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn viewer(id: &str, role: Role) -> CurrentUser {
        CurrentUser {
            id: UserId::new(id),
            name: id.to_string(),
            email: Email::parse(&format!("{id}@example.com")).unwrap(),
            role,
        }
    }

    fn product(id: &str, owner: Option<&str>) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_string(),
            price: Decimal::new(10, 0),
            description: String::new(),
            category: "Home".to_string(),
            image: String::new(),
            images: Vec::new(),
            user_id: owner.map(UserId::new),
            is_approved: false,
            is_denied: false,
            created_at: Utc::now(),
        }
    }

    fn order_with(product: Product) -> Order {
        Order::new(
            None,
            Customer {
                name: "Ada".to_string(),
                phone: "555".to_string(),
                address: "1 Loop Rd".to_string(),
            },
            vec![CartItem {
                product,
                quantity: 1,
            }],
            ShippingPolicy::Free,
            OrderSource::Checkout,
        )
    }

    #[test]
    fn test_order_permissions() {
        let order = order_with(product("p1", Some("sam")));
        assert!(can_update_order(&order, &viewer("root", Role::Admin)));
        assert!(can_update_order(&order, &viewer("sam", Role::User)));
        assert!(!can_update_order(&order, &viewer("eve", Role::User)));
    }

    #[test]
    fn test_static_products_are_never_editable() {
        let admin = viewer("root", Role::Admin);
        let row = DashboardProduct::new(&product("static-1", None), &admin, CurrencyCode::USD);
        assert!(!row.can_edit);
        assert!(!row.can_delete);
    }

    #[test]
    fn test_only_owner_can_delete() {
        let admin = viewer("root", Role::Admin);
        let row = DashboardProduct::new(&product("p1", Some("sam")), &admin, CurrencyCode::USD);
        assert!(row.can_edit);
        assert!(!row.can_delete);
        assert_eq!(row.status, "Pending review");

        let owner = viewer("sam", Role::User);
        let row = DashboardProduct::new(&product("p1", Some("sam")), &owner, CurrencyCode::USD);
        assert!(row.can_delete);
    }

    #[test]
    fn test_edit_form_joins_images() {
        let mut p = product("p1", Some("sam"));
        p.images = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        let form = ProductFormView::edit(&p);
        assert!(form.editing);
        assert_eq!(form.action, "/dashboard/products/p1");
        assert_eq!(form.images, "a.jpg\nb.jpg");
    }
}
