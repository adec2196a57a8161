//! Orders, stored under [`keys::ORDERS`].

use bazaar_core::{Order, OrderId, OrderStatus, UserId};

use super::{LocalStore, RepositoryError, keys};

/// Repository for placed orders. Orders are appended and updated, never deleted.
pub struct OrderRepository<'a> {
    store: &'a LocalStore,
}

impl<'a> OrderRepository<'a> {
    #[must_use]
    pub const fn new(store: &'a LocalStore) -> Self {
        Self { store }
    }

    /// Every order, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self.store.load(keys::ORDERS).await?;
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    /// Orders placed by a buyer account.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_buyer(&self, user: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.all().await?;
        orders.retain(|o| o.user_id.as_ref() == Some(user));
        Ok(orders)
    }

    /// Orders containing at least one product listed by `seller`.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn for_seller(&self, seller: &UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders = self.all().await?;
        orders.retain(|o| o.involves_seller(seller));
        Ok(orders)
    }

    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get(&self, id: &OrderId) -> Result<Option<Order>, RepositoryError> {
        let orders: Vec<Order> = self.store.load(keys::ORDERS).await?;
        Ok(orders.into_iter().find(|o| &o.id == id))
    }

    /// Append an order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError` if the write fails.
    pub async fn create(&self, order: Order) -> Result<Order, RepositoryError> {
        self.store
            .update(keys::ORDERS, |orders: &mut Vec<Order>| {
                orders.push(order.clone());
                Ok(order)
            })
            .await
    }

    /// Set an order's status.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no order has that id.
    pub async fn set_status(
        &self,
        id: &OrderId,
        status: OrderStatus,
    ) -> Result<Order, RepositoryError> {
        self.store
            .update(keys::ORDERS, |orders: &mut Vec<Order>| {
                let order = orders
                    .iter_mut()
                    .find(|o| &o.id == id)
                    .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
                order.status = status;
                Ok(order.clone())
            })
            .await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::{create_memory_pool, migrate};
    use bazaar_core::{Customer, OrderSource, ShippingPolicy};

    fn order(user: Option<UserId>) -> Order {
        Order::new(
            user,
            Customer {
                name: "Ada".to_string(),
                phone: "555".to_string(),
                address: "1 Loop Rd".to_string(),
            },
            Vec::new(),
            ShippingPolicy::Free,
            OrderSource::Manual,
        )
    }

    #[tokio::test]
    async fn test_create_filter_and_update_status() {
        let pool = create_memory_pool().await.unwrap();
        migrate(&pool).await.unwrap();
        let store = LocalStore::new(pool);
        let orders = OrderRepository::new(&store);

        let buyer = UserId::new("buyer");
        let mine = orders.create(order(Some(buyer.clone()))).await.unwrap();
        orders.create(order(None)).await.unwrap();

        assert_eq!(orders.all().await.unwrap().len(), 2);
        assert_eq!(orders.for_buyer(&buyer).await.unwrap().len(), 1);

        let shipped = orders
            .set_status(&mine.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(shipped.status, OrderStatus::Shipped);
        assert_eq!(
            orders.get(&mine.id).await.unwrap().unwrap().status,
            OrderStatus::Shipped
        );

        let missing = orders
            .set_status(&OrderId::new("nope"), OrderStatus::Delivered)
            .await;
        assert!(matches!(missing, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_creates_are_all_kept() {
        let pool = create_memory_pool().await.unwrap();
        migrate(&pool).await.unwrap();
        let store = LocalStore::new(pool);

        let tasks: Vec<_> = (0..20)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { OrderRepository::new(&store).create(order(None)).await })
            })
            .collect();
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        assert_eq!(OrderRepository::new(&store).all().await.unwrap().len(), 20);
    }
}
