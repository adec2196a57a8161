//! Bazaar Core - Domain types and storefront rules.
//!
//! This crate is shared by every Bazaar component:
//! - `storefront` - The web storefront and seller/admin dashboard
//! - `cli` - Command-line tools for migrations and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Everything here can be unit tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, emails, prices and statuses
//! - [`catalog`] - Products, the visibility rule and listing queries
//! - [`cart`] - Cart lines, the merge rule and totals
//! - [`wishlist`] - Wishlist membership
//! - [`order`] - Orders built from carts or entered by hand
//! - [`user`] - Registered users and roles

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cart;
pub mod catalog;
pub mod order;
pub mod types;
pub mod user;
pub mod wishlist;

pub use cart::{Cart, CartItem, ShippingPolicy, Totals};
pub use catalog::{
    DraftError, ListingQuery, MAX_PRICE, Product, ProductDraft, SortOrder, categories, is_static_id,
    is_visible,
};
pub use order::{Customer, Order, OrderSource};
pub use types::*;
pub use user::User;
pub use wishlist::Wishlist;
