//! Session-related types.
//!
//! Everything a visitor carries between requests lives in their session:
//! the logged-in identity, the cart, the wishlist, the last checkout handoff
//! and any pending flash message.

use serde::{Deserialize, Serialize};

use bazaar_core::{Email, OrderId, Role, User, UserId};

/// Session-stored user identity.
///
/// Minimal data stored in the session to identify the logged-in user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    /// User's ID in the registered users store.
    pub id: UserId,
    pub name: String,
    pub email: Email,
    pub role: Role,
}

impl CurrentUser {
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            role: user.role,
        }
    }
}

/// Result of the last checkout, shown on the success page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutHandoff {
    pub order_id: OrderId,
    /// `wa.me` link pre-filled with the order summary.
    pub deep_link: String,
}

/// One-shot message shown on the next rendered page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    /// `success` or `error`, used as a CSS class.
    pub kind: String,
    pub message: String,
}

impl Flash {
    #[must_use]
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: "success".to_string(),
            message: message.into(),
        }
    }

    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: "error".to_string(),
            message: message.into(),
        }
    }
}

/// Session keys.
pub mod keys {
    /// Key for storing the current logged-in user.
    pub const CURRENT_USER: &str = "current_user";

    /// Key for the visitor's cart lines.
    pub const CART: &str = "cart";

    /// Key for the visitor's saved products.
    pub const WISHLIST: &str = "wishlist";

    /// Key for the handoff produced by the last checkout.
    pub const LAST_CHECKOUT: &str = "last_checkout";

    /// Key for the pending flash message.
    pub const FLASH: &str = "flash";
}
