//! Wishlist membership, keyed by product id.

use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::types::ProductId;

/// Saved products. Serializes as a JSON array of product snapshots.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Wishlist {
    items: Vec<Product>,
}

impl Wishlist {
    #[must_use]
    pub fn items(&self) -> &[Product] {
        &self.items
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.items.iter().any(|p| &p.id == id)
    }

    /// Add the product if absent, remove it if present. Returns true when added.
    pub fn toggle(&mut self, product: Product) -> bool {
        if self.remove(&product.id) {
            false
        } else {
            self.items.push(product);
            true
        }
    }

    pub fn remove(&mut self, id: &ProductId) -> bool {
        let before = self.items.len();
        self.items.retain(|p| &p.id != id);
        self.items.len() != before
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::product;

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut wishlist = Wishlist::default();
        assert!(wishlist.toggle(product("a", 1, "X")));
        assert!(wishlist.contains(&ProductId::new("a")));
        assert_eq!(wishlist.len(), 1);

        assert!(!wishlist.toggle(product("a", 1, "X")));
        assert!(wishlist.is_empty());
    }

    #[test]
    fn test_membership_is_a_set() {
        let mut wishlist = Wishlist::default();
        wishlist.toggle(product("a", 1, "X"));
        wishlist.toggle(product("b", 1, "X"));
        wishlist.toggle(product("a", 2, "Y"));
        wishlist.toggle(product("a", 3, "Z"));

        let ids: Vec<&str> = wishlist.items().iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }
}
