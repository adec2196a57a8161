//! Shopping cart lines, the merge rule and totals.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::ProductId;

/// A product snapshot plus the quantity ordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub product: Product,
    pub quantity: u32,
}

impl CartItem {
    /// Price multiplied by quantity, saturating at `Decimal::MAX`.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.product
            .price
            .saturating_mul(Decimal::from(self.quantity))
    }
}

fn sum_lines(items: &[CartItem]) -> Decimal {
    items
        .iter()
        .map(CartItem::line_total)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// The visitor's cart. Serializes as a plain JSON array of lines.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    /// Lines in the order they were first added.
    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add `quantity` of a product. Merges into an existing line for the same
    /// product id; a quantity of zero counts as one.
    pub fn add(&mut self, product: Product, quantity: u32) {
        let quantity = quantity.max(1);
        match self.line_mut(&product.id) {
            Some(line) => line.quantity = line.quantity.saturating_add(quantity),
            None => self.items.push(CartItem { product, quantity }),
        }
    }

    /// Increase a line by one. Returns false if the product is not in the cart.
    pub fn increment(&mut self, id: &ProductId) -> bool {
        self.line_mut(id)
            .map(|line| line.quantity = line.quantity.saturating_add(1))
            .is_some()
    }

    /// Decrease a line by one, never below one.
    pub fn decrement(&mut self, id: &ProductId) -> bool {
        self.line_mut(id)
            .map(|line| line.quantity = line.quantity.saturating_sub(1).max(1))
            .is_some()
    }

    /// Set a line's quantity, clamped to at least one.
    pub fn set_quantity(&mut self, id: &ProductId, quantity: u32) -> bool {
        self.line_mut(id)
            .map(|line| line.quantity = quantity.max(1))
            .is_some()
    }

    /// Remove the line for exactly this product id.
    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|line| &line.product.id != id);
        self.items.len() != before
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |count, line| count.saturating_add(line.quantity))
    }

    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        sum_lines(&self.items)
    }

    #[must_use]
    pub fn totals(&self, policy: ShippingPolicy) -> Totals {
        Totals::new(self.subtotal(), policy)
    }

    fn line_mut(&mut self, id: &ProductId) -> Option<&mut CartItem> {
        self.items.iter_mut().find(|line| &line.product.id == id)
    }
}

/// How the delivery fee is charged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShippingPolicy {
    /// Shipping is free on every order.
    #[default]
    Free,
}

impl ShippingPolicy {
    #[must_use]
    pub const fn fee(self, _subtotal: Decimal) -> Decimal {
        match self {
            Self::Free => Decimal::ZERO,
        }
    }
}

/// Computed order amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub fee: Decimal,
    pub total: Decimal,
}

impl Totals {
    #[must_use]
    pub fn new(subtotal: Decimal, policy: ShippingPolicy) -> Self {
        let fee = policy.fee(subtotal);
        Self {
            subtotal,
            fee,
            total: subtotal.saturating_add(fee),
        }
    }

    /// Totals for an arbitrary set of lines.
    #[must_use]
    pub fn of(items: &[CartItem], policy: ShippingPolicy) -> Self {
        Self::new(sum_lines(items), policy)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;

    #[test]
    fn test_add_same_product_merges() {
        let mut cart = Cart::default();
        cart.add(product("a", 10, "X"), 1);
        cart.add(product("a", 10, "X"), 1);

        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].quantity, 2);
    }

    #[test]
    fn test_add_with_quantity() {
        let mut cart = Cart::default();
        cart.add(product("a", 10, "X"), 3);
        cart.add(product("a", 10, "X"), 0);
        cart.add(product("b", 5, "X"), 2);

        assert_eq!(cart.items()[0].quantity, 4);
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_remove_only_that_product() {
        let mut cart = Cart::default();
        cart.add(product("a", 10, "X"), 1);
        cart.add(product("b", 10, "X"), 1);

        assert!(cart.remove(&ProductId::new("a")));
        assert_eq!(cart.items().len(), 1);
        assert_eq!(cart.items()[0].product.id.as_str(), "b");
        assert!(!cart.remove(&ProductId::new("a")));
    }

    #[test]
    fn test_decrement_never_below_one() {
        let mut cart = Cart::default();
        cart.add(product("a", 10, "X"), 2);
        let id = ProductId::new("a");

        for _ in 0..5 {
            assert!(cart.decrement(&id));
        }
        assert_eq!(cart.items()[0].quantity, 1);

        assert!(cart.set_quantity(&id, 0));
        assert_eq!(cart.items()[0].quantity, 1);

        assert!(cart.increment(&id));
        assert_eq!(cart.items()[0].quantity, 2);

        assert!(!cart.decrement(&ProductId::new("missing")));
    }

    #[test]
    fn test_totals_with_free_shipping() {
        let mut cart = Cart::default();
        cart.add(product("a", 10, "X"), 2);
        cart.add(product("b", 5, "X"), 3);

        let totals = cart.totals(ShippingPolicy::Free);
        assert_eq!(totals.subtotal, Decimal::new(35, 0));
        assert_eq!(totals.fee, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(35, 0));
    }

    #[test]
    fn test_totals_saturate_instead_of_overflowing() {
        let mut huge = product("big", 0, "X");
        huge.price = Decimal::MAX;

        let mut cart = Cart::default();
        cart.add(huge, 2);
        cart.add(product("a", 10, "X"), u32::MAX);

        assert_eq!(cart.items()[0].line_total(), Decimal::MAX);
        assert_eq!(cart.subtotal(), Decimal::MAX);
        assert_eq!(cart.totals(ShippingPolicy::Free).total, Decimal::MAX);
    }

    #[test]
    fn test_clear_empties() {
        let mut cart = Cart::default();
        cart.add(product("a", 10, "X"), 2);
        cart.clear();
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal(), Decimal::ZERO);
    }

    #[test]
    fn test_serializes_as_array() {
        let mut cart = Cart::default();
        cart.add(product("a", 10, "X"), 2);
        let json = serde_json::to_value(&cart).unwrap();
        assert!(json.is_array());

        let back: Cart = serde_json::from_value(json).unwrap();
        assert_eq!(back.items()[0].quantity, 2);
    }
}
