//! Orders placed at checkout or entered by an admin.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::cart::{CartItem, ShippingPolicy, Totals};
use crate::types::{OrderId, OrderStatus, UserId};

/// Where an order came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    #[default]
    Checkout,
    Manual,
}

/// A placed order. Orders are never deleted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: OrderId,
    /// Buyer account, if the buyer was logged in.
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub customer_name: String,
    pub phone: String,
    /// Free-text delivery address.
    pub address: String,
    pub items: Vec<CartItem>,
    pub subtotal: Decimal,
    pub fee: Decimal,
    pub total: Decimal,
    #[serde(default)]
    pub status: OrderStatus,
    #[serde(default)]
    pub source: OrderSource,
    pub created_at: DateTime<Utc>,
}

/// Contact details captured with an order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Customer {
    pub name: String,
    pub phone: String,
    pub address: String,
}

impl Order {
    /// Create a pending order for the given lines, computing totals with `policy`.
    #[must_use]
    pub fn new(
        user_id: Option<UserId>,
        customer: Customer,
        items: Vec<CartItem>,
        policy: ShippingPolicy,
        source: OrderSource,
    ) -> Self {
        let totals = Totals::of(&items, policy);
        Self {
            id: OrderId::generate(),
            user_id,
            customer_name: customer.name,
            phone: customer.phone,
            address: customer.address,
            items,
            subtotal: totals.subtotal,
            fee: totals.fee,
            total: totals.total,
            status: OrderStatus::Pending,
            source,
            created_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn totals(&self) -> Totals {
        Totals {
            subtotal: self.subtotal,
            fee: self.fee,
            total: self.total,
        }
    }

    /// Whether any line was listed by `seller`.
    #[must_use]
    pub fn involves_seller(&self, seller: &UserId) -> bool {
        self.items.iter().any(|line| line.product.is_owned_by(seller))
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |count, line| count.saturating_add(line.quantity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;

    fn customer() -> Customer {
        Customer {
            name: "Ada".to_owned(),
            phone: "+1 555 0100".to_owned(),
            address: "1 Loop Rd".to_owned(),
        }
    }

    #[test]
    fn test_new_order_is_pending_with_totals() {
        let items = vec![
            CartItem {
                product: product("a", 10, "X"),
                quantity: 2,
            },
            CartItem {
                product: product("b", 5, "X"),
                quantity: 3,
            },
        ];
        let order = Order::new(
            None,
            customer(),
            items,
            ShippingPolicy::Free,
            OrderSource::Checkout,
        );

        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.subtotal, Decimal::new(35, 0));
        assert_eq!(order.fee, Decimal::ZERO);
        assert_eq!(order.total, Decimal::new(35, 0));
        assert_eq!(order.item_count(), 5);
    }

    #[test]
    fn test_involves_seller() {
        let seller = UserId::new("seller");
        let mut owned = product("a", 10, "X");
        owned.user_id = Some(seller.clone());

        let order = Order::new(
            None,
            customer(),
            vec![CartItem {
                product: owned,
                quantity: 1,
            }],
            ShippingPolicy::Free,
            OrderSource::Manual,
        );

        assert!(order.involves_seller(&seller));
        assert!(!order.involves_seller(&UserId::new("other")));
    }
}
