//! In-memory store implementations.
//!
//! Back the same traits as the `PostgreSQL` stores with maps behind async
//! locks, so handler and service tests run without a database. Semantics
//! mirror the SQL implementations, including the conflict and
//! compare-and-swap behavior.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use threadline_core::{CheckoutId, Email, GuestId, OrderId, ProductId, UserId};

use super::{
    CartStore, CheckoutStore, NewUser, OrderStore, ProductStore, RepositoryError, SubscriberStore,
    UserStore, UserUpdate, UserWithPassword,
};
use crate::models::{Cart, Checkout, Order, Product, Subscriber, User};

#[derive(Default)]
pub struct MemoryUserStore {
    users: RwLock<HashMap<UserId, (User, String)>>,
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.read().await.get(&id).map(|(u, _)| u.clone()))
    }

    async fn find_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|(u, _)| u.email == *email)
            .map(|(u, _)| u.clone()))
    }

    async fn find_with_password(
        &self,
        email: &Email,
    ) -> Result<Option<UserWithPassword>, RepositoryError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|(u, _)| u.email == *email)
            .map(|(user, hash)| UserWithPassword {
                user: user.clone(),
                password_hash: hash.clone(),
            }))
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;
        if users.values().any(|(u, _)| u.email == new_user.email) {
            return Err(RepositoryError::Conflict(format!(
                "email already registered: {}",
                new_user.email
            )));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::generate(),
            name: new_user.name,
            email: new_user.email,
            role: new_user.role,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, (user.clone(), new_user.password_hash));
        Ok(user)
    }

    async fn update(&self, id: UserId, update: UserUpdate) -> Result<User, RepositoryError> {
        let mut users = self.users.write().await;

        if let Some(email) = &update.email
            && users
                .values()
                .any(|(u, _)| u.id != id && u.email == *email)
        {
            return Err(RepositoryError::Conflict(
                "email already registered".to_owned(),
            ));
        }

        let (user, _) = users.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(email) = update.email {
            user.email = email;
        }
        if let Some(role) = update.role {
            user.role = role;
        }
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn delete(&self, id: UserId) -> Result<(), RepositoryError> {
        self.users
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let mut users: Vec<User> = self
            .users
            .read()
            .await
            .values()
            .map(|(u, _)| u.clone())
            .collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}

#[derive(Default)]
pub struct MemoryProductStore {
    products: RwLock<HashMap<ProductId, Product>>,
}

#[async_trait]
impl ProductStore for MemoryProductStore {
    async fn find_by_id(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list(&self) -> Result<Vec<Product>, RepositoryError> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn create(&self, product: Product) -> Result<Product, RepositoryError> {
        self.products
            .write()
            .await
            .insert(product.id, product.clone());
        Ok(product)
    }
}

#[derive(Default)]
pub struct MemoryCartStore {
    carts: RwLock<Vec<Cart>>,
}

#[async_trait]
impl CartStore for MemoryCartStore {
    async fn find_by_user(&self, user: UserId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self
            .carts
            .read()
            .await
            .iter()
            .find(|c| c.user == Some(user))
            .cloned())
    }

    async fn find_by_guest(&self, guest: &GuestId) -> Result<Option<Cart>, RepositoryError> {
        Ok(self
            .carts
            .read()
            .await
            .iter()
            .find(|c| c.guest_id.as_ref() == Some(guest))
            .cloned())
    }

    async fn save(&self, cart: &Cart) -> Result<(), RepositoryError> {
        let mut carts = self.carts.write().await;
        if let Some(existing) = carts.iter_mut().find(|c| c.id == cart.id) {
            *existing = cart.clone();
        } else {
            carts.push(cart.clone());
        }
        Ok(())
    }

    async fn claim_guest(&self, guest: &GuestId) -> Result<Option<Cart>, RepositoryError> {
        let mut carts = self.carts.write().await;
        let position = carts
            .iter()
            .position(|c| c.guest_id.as_ref() == Some(guest));
        Ok(position.map(|i| carts.swap_remove(i)))
    }

    async fn delete_by_user(&self, user: UserId) -> Result<(), RepositoryError> {
        self.carts.write().await.retain(|c| c.user != Some(user));
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryCheckoutStore {
    checkouts: RwLock<HashMap<CheckoutId, Checkout>>,
}

#[async_trait]
impl CheckoutStore for MemoryCheckoutStore {
    async fn insert(&self, checkout: &Checkout) -> Result<(), RepositoryError> {
        self.checkouts
            .write()
            .await
            .insert(checkout.id, checkout.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: CheckoutId) -> Result<Option<Checkout>, RepositoryError> {
        Ok(self.checkouts.read().await.get(&id).cloned())
    }

    async fn mark_paid(
        &self,
        id: CheckoutId,
        payment_details: Option<serde_json::Value>,
        at: DateTime<Utc>,
    ) -> Result<Checkout, RepositoryError> {
        let mut checkouts = self.checkouts.write().await;
        let checkout = checkouts.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        checkout.state = checkout
            .state
            .clone()
            .pay(payment_details, at)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
        checkout.updated_at = at;
        Ok(checkout.clone())
    }

    async fn mark_finalized(
        &self,
        id: CheckoutId,
        at: DateTime<Utc>,
    ) -> Result<Checkout, RepositoryError> {
        let mut checkouts = self.checkouts.write().await;
        let checkout = checkouts.get_mut(&id).ok_or(RepositoryError::NotFound)?;

        checkout.state = checkout
            .state
            .clone()
            .finalize(at)
            .map_err(|e| RepositoryError::Conflict(e.to_string()))?;
        checkout.updated_at = at;
        Ok(checkout.clone())
    }
}

#[derive(Default)]
pub struct MemoryOrderStore {
    orders: RwLock<HashMap<OrderId, Order>>,
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn insert(&self, order: &Order) -> Result<(), RepositoryError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: OrderId) -> Result<Option<Order>, RepositoryError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn list_by_user(&self, user: UserId) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .await
            .values()
            .filter(|o| o.user == user)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn list_all(&self) -> Result<Vec<Order>, RepositoryError> {
        let mut orders: Vec<Order> = self.orders.read().await.values().cloned().collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(orders)
    }

    async fn save(&self, order: &Order) -> Result<(), RepositoryError> {
        let mut orders = self.orders.write().await;
        let existing = orders.get_mut(&order.id).ok_or(RepositoryError::NotFound)?;
        *existing = order.clone();
        Ok(())
    }

    async fn delete(&self, id: OrderId) -> Result<(), RepositoryError> {
        self.orders
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[derive(Default)]
pub struct MemorySubscriberStore {
    subscribers: RwLock<Vec<Subscriber>>,
}

#[async_trait]
impl SubscriberStore for MemorySubscriberStore {
    async fn find_by_email(&self, email: &Email) -> Result<Option<Subscriber>, RepositoryError> {
        Ok(self
            .subscribers
            .read()
            .await
            .iter()
            .find(|s| s.email == *email)
            .cloned())
    }

    async fn insert(&self, subscriber: &Subscriber) -> Result<(), RepositoryError> {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.iter().any(|s| s.email == subscriber.email) {
            return Err(RepositoryError::Conflict(
                "email already subscribed".to_owned(),
            ));
        }
        subscribers.push(subscriber.clone());
        Ok(())
    }
}
