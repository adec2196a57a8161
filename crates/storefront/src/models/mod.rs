//! Storefront-specific models.
//!
//! Domain entities live in `bazaar-core`; this module only holds what the
//! storefront keeps in the visitor's session.

pub mod session;

pub use session::{CheckoutHandoff, CurrentUser, Flash, keys as session_keys};
