//! Checkout handoff.
//!
//! Checkout never takes payment. It records a pending order, builds a WhatsApp
//! deep link pre-filled with the order summary, and asks the form relay to
//! email the same summary. The relay is fire-and-forget; the order is recorded
//! whether or not the email goes out.

use bazaar_core::{Cart, CurrencyCode, Customer, Order, OrderSource, ShippingPolicy};
use thiserror::Error;
use tracing::instrument;

use crate::config::StorefrontConfig;
use crate::db::{LocalStore, OrderRepository, RepositoryError};
use crate::models::{CheckoutHandoff, CurrentUser};
use crate::services::relay::{FormRelayClient, RelayMessage};

/// Shipping policy applied to every checkout.
pub const SHIPPING_POLICY: ShippingPolicy = ShippingPolicy::Free;

/// Errors that stop a checkout.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Your cart is empty")]
    EmptyCart,

    /// A required contact field was blank.
    #[error("Please enter your {0}")]
    MissingField(&'static str),

    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Validate the contact details, trimming every field.
///
/// # Errors
///
/// Returns `CheckoutError::MissingField` for the first blank field.
pub fn validate_customer(
    name: &str,
    phone: &str,
    address: &str,
) -> Result<Customer, CheckoutError> {
    let required = |value: &str, field: &'static str| {
        let value = value.trim();
        if value.is_empty() {
            Err(CheckoutError::MissingField(field))
        } else {
            Ok(value.to_string())
        }
    };

    Ok(Customer {
        name: required(name, "name")?,
        phone: required(phone, "phone number")?,
        address: required(address, "delivery address")?,
    })
}

/// Plain-text order summary used for both the deep link and the relay email.
#[must_use]
pub fn order_summary(store_name: &str, order: &Order, currency: CurrencyCode) -> String {
    let mut lines = vec![
        format!("New order from {store_name}"),
        format!("Order: {}", order.id.short()),
        String::new(),
    ];

    lines.extend(order.items.iter().map(|line| {
        format!(
            "• {} x{} — {}",
            line.product.name,
            line.quantity,
            currency.format(line.line_total())
        )
    }));

    let shipping = if order.fee.is_zero() {
        "Free".to_string()
    } else {
        currency.format(order.fee)
    };

    lines.extend([
        String::new(),
        format!("Subtotal: {}", currency.format(order.subtotal)),
        format!("Shipping: {shipping}"),
        format!("Total: {}", currency.format(order.total)),
        String::new(),
        format!("Name: {}", order.customer_name),
        format!("Phone: {}", order.phone),
        format!("Address: {}", order.address),
    ]);

    lines.join("\n")
}

/// `wa.me` link that opens a chat with `number` pre-filled with `text`.
///
/// `number` is reduced to its digits.
#[must_use]
pub fn whatsapp_link(number: &str, text: &str) -> String {
    let digits: String = number.chars().filter(char::is_ascii_digit).collect();
    format!("https://wa.me/{digits}?text={}", urlencoding::encode(text))
}

/// Places orders from a visitor's cart.
pub struct CheckoutService<'a> {
    orders: OrderRepository<'a>,
    relay: &'a FormRelayClient,
    config: &'a StorefrontConfig,
}

impl<'a> CheckoutService<'a> {
    #[must_use]
    pub const fn new(
        store: &'a LocalStore,
        relay: &'a FormRelayClient,
        config: &'a StorefrontConfig,
    ) -> Self {
        Self {
            orders: OrderRepository::new(store),
            relay,
            config,
        }
    }

    /// Record the order and start the handoff.
    ///
    /// The caller clears the cart once this succeeds.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError::EmptyCart` for an empty cart, or
    /// `CheckoutError::Repository` if the order cannot be stored.
    #[instrument(skip_all, fields(items = cart.item_count()))]
    pub async fn place_order(
        &self,
        cart: &Cart,
        customer: Customer,
        buyer: Option<&CurrentUser>,
    ) -> Result<(Order, CheckoutHandoff), CheckoutError> {
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }

        let order = Order::new(
            buyer.map(|user| user.id.clone()),
            customer,
            cart.items().to_vec(),
            SHIPPING_POLICY,
            OrderSource::Checkout,
        );
        let summary = order_summary(&self.config.store_name, &order, self.config.currency);
        let deep_link = whatsapp_link(&self.config.checkout.whatsapp_number, &summary);

        let order = self.orders.create(order).await?;
        tracing::info!(order_id = %order.id, total = %order.total, "Order placed");

        self.relay.dispatch(
            RelayMessage::new(format!("New order {}", order.id.short()))
                .field("name", order.customer_name.clone())
                .field("phone", order.phone.clone())
                .field("address", order.address.clone())
                .field("message", summary)
                .field("total", self.config.currency.format(order.total)),
        );

        let handoff = CheckoutHandoff {
            order_id: order.id.clone(),
            deep_link,
        };
        Ok((order, handoff))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use bazaar_core::{CartItem, Product, ProductId};
    use chrono::Utc;
    use rust_decimal::Decimal;

    fn product(id: &str, name: &str, price: i64) -> Product {
        Product {
            id: ProductId::new(id),
            name: name.to_string(),
            price: Decimal::new(price, 0),
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

    fn order() -> Order {
        Order::new(
            None,
            validate_customer("Ada", "+1 555 0100", "1 Loop Rd").unwrap(),
            vec![
                CartItem {
                    product: product("a", "Mug", 10),
                    quantity: 2,
                },
                CartItem {
                    product: product("b", "Towel", 5),
                    quantity: 3,
                },
            ],
            SHIPPING_POLICY,
            OrderSource::Checkout,
        )
    }

    #[test]
    fn test_validate_customer_rejects_blank_fields() {
        assert!(matches!(
            validate_customer("  ", "1", "x"),
            Err(CheckoutError::MissingField("name"))
        ));
        assert!(matches!(
            validate_customer("Ada", "", "x"),
            Err(CheckoutError::MissingField("phone number"))
        ));
        assert!(matches!(
            validate_customer("Ada", "1", "\n"),
            Err(CheckoutError::MissingField("delivery address"))
        ));

        let customer = validate_customer(" Ada ", "1", "Here").unwrap();
        assert_eq!(customer.name, "Ada");
    }

    #[test]
    fn test_summary_lists_lines_and_totals() {
        let summary = order_summary("Bazaar", &order(), CurrencyCode::USD);

        assert!(summary.starts_with("New order from Bazaar"));
        assert!(summary.contains("• Mug x2 — $20.00"));
        assert!(summary.contains("• Towel x3 — $15.00"));
        assert!(summary.contains("Subtotal: $35.00"));
        assert!(summary.contains("Shipping: Free"));
        assert!(summary.contains("Total: $35.00"));
        assert!(summary.contains("Address: 1 Loop Rd"));
    }

    #[test]
    fn test_whatsapp_link_strips_number_and_encodes_text() {
        let link = whatsapp_link("+1 (555) 010-0999", "Hi there & bye");
        assert_eq!(link, "https://wa.me/15550100999?text=Hi%20there%20%26%20bye");
    }
}
