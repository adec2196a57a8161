//! Order listing.
//!
//! # Usage
//!
//! ```bash
//! bazaar-cli orders list
//! bazaar-cli orders list --status pending
//! ```

use bazaar_core::{Order, OrderStatus};
use bazaar_storefront::db::{LocalStore, OrderRepository};

use super::{CommandError, connect};

/// One line per order: id, status, created, customer, phone, total.
#[must_use]
pub fn format_order(order: &Order) -> String {
    format!(
        "{}\t{}\t{}\t{}\t{}\t{}",
        order.id,
        order.status,
        order.created_at.format("%Y-%m-%d %H:%M"),
        order.customer_name,
        order.phone,
        order.total
    )
}

/// Print orders, newest first, optionally filtered by status.
///
/// # Errors
///
/// Returns `CommandError::InvalidStatus` for an unknown status, or a
/// repository error if the orders cannot be read.
pub async fn list(status: Option<&str>) -> Result<(), CommandError> {
    let status = status
        .map(str::parse::<OrderStatus>)
        .transpose()
        .map_err(CommandError::InvalidStatus)?;

    let store = LocalStore::new(connect().await?);
    let orders = OrderRepository::new(&store).all().await?;
    let orders: Vec<_> = orders
        .iter()
        .filter(|order| status.is_none_or(|status| order.status == status))
        .collect();

    tracing::info!("{} orders", orders.len());

    #[allow(clippy::print_stdout)]
    for order in orders {
        println!("{}", format_order(order));
    }
    Ok(())
}
