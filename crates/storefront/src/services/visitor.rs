//! Per-visitor containers held in the session.
//!
//! A missing or unreadable entry reads as empty, so a visitor with a stale
//! or corrupted session simply starts over.

use bazaar_core::{Cart, Wishlist};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_sessions::Session;

use crate::models::{CheckoutHandoff, CurrentUser, Flash, session_keys};

async fn load<T>(session: &Session, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    match session.get::<T>(key).await {
        Ok(value) => value.unwrap_or_default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "Unreadable session value, using default");
            T::default()
        }
    }
}

async fn save<T>(
    session: &Session,
    key: &str,
    value: &T,
) -> Result<(), tower_sessions::session::Error>
where
    T: Serialize + Send + Sync,
{
    session.insert(key, value).await
}

/// The visitor's cart.
pub async fn cart(session: &Session) -> Cart {
    load(session, session_keys::CART).await
}

/// Persist the visitor's cart.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_cart(
    session: &Session,
    cart: &Cart,
) -> Result<(), tower_sessions::session::Error> {
    save(session, session_keys::CART, cart).await
}

/// The visitor's wishlist.
pub async fn wishlist(session: &Session) -> Wishlist {
    load(session, session_keys::WISHLIST).await
}

/// Persist the visitor's wishlist.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_wishlist(
    session: &Session,
    wishlist: &Wishlist,
) -> Result<(), tower_sessions::session::Error> {
    save(session, session_keys::WISHLIST, wishlist).await
}

/// The handoff from the visitor's last checkout, if any.
pub async fn last_checkout(session: &Session) -> Option<CheckoutHandoff> {
    load(session, session_keys::LAST_CHECKOUT).await
}

/// Remember the handoff for the success page.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn save_last_checkout(
    session: &Session,
    handoff: &CheckoutHandoff,
) -> Result<(), tower_sessions::session::Error> {
    save(session, session_keys::LAST_CHECKOUT, handoff).await
}

/// The logged-in user, if any.
pub async fn current_user(session: &Session) -> Option<CurrentUser> {
    load(session, session_keys::CURRENT_USER).await
}

/// Queue a message for the next rendered page.
///
/// A failure only loses the message, so it is logged and ignored.
pub async fn flash(session: &Session, flash: Flash) {
    if let Err(e) = save(session, session_keys::FLASH, &flash).await {
        tracing::warn!(error = %e, "Failed to store flash message");
    }
}

/// Take the pending flash message, if any.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}

/// Badge counts shown in the page header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeaderCounts {
    pub cart: u32,
    pub wishlist: usize,
}

impl HeaderCounts {
    pub async fn load(session: &Session) -> Self {
        Self {
            cart: cart(session).await.item_count(),
            wishlist: wishlist(session).await.len(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use bazaar_core::{Product, ProductId};
    use chrono::Utc;
    use rust_decimal::Decimal;
    use tower_sessions::MemoryStore;

    fn session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    fn product(id: &str) -> Product {
        Product {
            id: ProductId::new(id),
            name: id.to_string(),
            price: Decimal::new(5, 0),
            description: String::new(),
            category: "Home".to_string(),
            image: String::new(),
            images: Vec::new(),
            user_id: None,
            is_approved: true,
            is_denied: false,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_empty_session_reads_defaults() {
        let session = session();
        assert!(cart(&session).await.is_empty());
        assert!(wishlist(&session).await.is_empty());
        assert!(last_checkout(&session).await.is_none());
        assert!(current_user(&session).await.is_none());
    }

    #[tokio::test]
    async fn test_cart_round_trips_through_session() {
        let session = session();
        let mut stored = cart(&session).await;
        stored.add(product("a"), 2);
        stored.add(product("a"), 1);
        save_cart(&session, &stored).await.unwrap();

        let counts = HeaderCounts::load(&session).await;
        assert_eq!(counts.cart, 3);
        assert_eq!(counts.wishlist, 0);
    }

    #[tokio::test]
    async fn test_flash_is_taken_once() {
        let session = session();
        flash(&session, Flash::success("Saved")).await;

        assert_eq!(take_flash(&session).await, Some(Flash::success("Saved")));
        assert_eq!(take_flash(&session).await, None);
    }

    #[tokio::test]
    async fn test_corrupt_value_reads_default() {
        let session = session();
        session
            .insert(session_keys::CART, "not a cart")
            .await
            .unwrap();
        assert!(cart(&session).await.is_empty());
    }
}
