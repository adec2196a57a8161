//! Business logic services for storefront.
//!
//! # Services
//!
//! - `auth` - Signup, login and profile edits
//! - `catalog` - Static and remote products, cache and change feed
//! - `checkout` - Order recording and the WhatsApp handoff
//! - `relay` - Form relay emails (orders, newsletter)
//! - `visitor` - Cart, wishlist and identity stored in the session

pub mod auth;
pub mod catalog;
pub mod checkout;
pub mod relay;
pub mod visitor;

pub use catalog::{CatalogChange, CatalogError, CatalogService};
pub use checkout::{CheckoutError, CheckoutService};
pub use relay::{FormRelayClient, RelayError, RelayMessage};
