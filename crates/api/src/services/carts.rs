//! Cart operations for users and guests.
//!
//! A cart belongs to either an authenticated user or a guest token. Guests
//! get a token minted on their first add; the client stores it and sends it
//! back on every cart call. Line identity is the (product, size, color)
//! triple.

use std::sync::Arc;

use chrono::Utc;

use threadline_core::{GuestId, ProductId, UserId};

use crate::db::{CartStore, ProductStore, RepositoryError};
use crate::models::{Cart, LineItem, LineKey};

/// Who a cart call is acting for.
#[derive(Debug, Clone)]
pub enum CartIdentity {
    User(UserId),
    Guest(GuestId),
}

/// Cart operation failures.
#[derive(Debug, thiserror::Error)]
pub enum CartError {
    /// Referenced product does not exist.
    #[error("product not found")]
    ProductNotFound,

    /// No cart exists for the identity.
    #[error("cart not found")]
    CartNotFound,

    /// The (product, size, color) line is not in the cart.
    #[error("item not found in cart")]
    ItemNotFound,

    /// Merge was called with a guest cart that has no items.
    #[error("guest cart is empty")]
    EmptyGuestCart,

    /// Merge was called with a guest token that has no cart.
    #[error("guest cart not found")]
    GuestCartNotFound,

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Result of an add: the cart and whether it was created by this call.
#[derive(Debug)]
pub struct AddOutcome {
    pub cart: Cart,
    pub created: bool,
}

/// Fields for a line being added.
#[derive(Debug, Clone)]
pub struct AddItem {
    pub product_id: ProductId,
    pub quantity: u32,
    pub size: String,
    pub color: String,
}

/// Cart logic over the store traits.
#[derive(Clone)]
pub struct CartService {
    carts: Arc<dyn CartStore>,
    products: Arc<dyn ProductStore>,
}

impl CartService {
    #[must_use]
    pub fn new(carts: Arc<dyn CartStore>, products: Arc<dyn ProductStore>) -> Self {
        Self { carts, products }
    }

    async fn find(&self, identity: &CartIdentity) -> Result<Option<Cart>, CartError> {
        let cart = match identity {
            CartIdentity::User(user) => self.carts.find_by_user(*user).await?,
            CartIdentity::Guest(guest) => self.carts.find_by_guest(guest).await?,
        };
        Ok(cart)
    }

    /// Fetch the active cart.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CartNotFound`] when the identity has no cart.
    pub async fn get(&self, identity: &CartIdentity) -> Result<Cart, CartError> {
        self.find(identity).await?.ok_or(CartError::CartNotFound)
    }

    /// Add a line, creating the cart if the identity has none.
    ///
    /// Adding a line whose (product, size, color) already exists accumulates
    /// the quantity instead of duplicating the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::ProductNotFound`] when the product is unknown.
    pub async fn add_item(
        &self,
        identity: &CartIdentity,
        item: AddItem,
    ) -> Result<AddOutcome, CartError> {
        let product = self
            .products
            .find_by_id(item.product_id)
            .await?
            .ok_or(CartError::ProductNotFound)?;

        let line = LineItem {
            product_id: product.id,
            name: product.name.clone(),
            image: product.primary_image(),
            price: product.price,
            size: item.size,
            color: item.color,
            quantity: item.quantity,
        };

        let now = Utc::now();
        let (mut cart, created) = match self.find(identity).await? {
            Some(cart) => (cart, false),
            None => {
                let cart = match identity {
                    CartIdentity::User(user) => Cart::for_user(*user, now),
                    CartIdentity::Guest(guest) => Cart::for_guest(guest.clone(), now),
                };
                (cart, true)
            }
        };

        cart.add_line(line, now);
        self.carts.save(&cart).await?;
        Ok(AddOutcome { cart, created })
    }

    /// Set a line's quantity. A quantity of zero or less removes the line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CartNotFound`] or [`CartError::ItemNotFound`].
    pub async fn set_quantity(
        &self,
        identity: &CartIdentity,
        key: &LineKey,
        quantity: i64,
    ) -> Result<Cart, CartError> {
        let mut cart = self.get(identity).await?;
        if !cart.set_quantity(key, quantity, Utc::now()) {
            return Err(CartError::ItemNotFound);
        }
        self.carts.save(&cart).await?;
        Ok(cart)
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::CartNotFound`] or [`CartError::ItemNotFound`].
    pub async fn remove_item(
        &self,
        identity: &CartIdentity,
        key: &LineKey,
    ) -> Result<Cart, CartError> {
        let mut cart = self.get(identity).await?;
        if !cart.remove_line(key, Utc::now()) {
            return Err(CartError::ItemNotFound);
        }
        self.carts.save(&cart).await?;
        Ok(cart)
    }

    /// Merge a guest cart into a user's cart at login.
    ///
    /// The guest cart is claimed atomically, so a token can be merged once;
    /// a concurrent second merge finds no guest cart. The empty-cart check
    /// runs before the claim, so a rejected merge leaves the guest cart in
    /// place.
    ///
    /// # Errors
    ///
    /// Returns [`CartError::EmptyGuestCart`] when the guest cart has no
    /// items and [`CartError::GuestCartNotFound`] when the token has no
    /// cart.
    pub async fn merge(&self, user: UserId, guest: &GuestId) -> Result<Cart, CartError> {
        match self.carts.find_by_guest(guest).await? {
            None => Err(CartError::GuestCartNotFound),
            Some(cart) if cart.is_empty() => Err(CartError::EmptyGuestCart),
            Some(_) => {
                let Some(guest_cart) = self.carts.claim_guest(guest).await? else {
                    // Lost the race to a concurrent merge of the same token.
                    return Err(CartError::GuestCartNotFound);
                };

                let now = Utc::now();
                let cart = match self.carts.find_by_user(user).await? {
                    Some(mut user_cart) => {
                        user_cart.merge_items(guest_cart.items, now);
                        user_cart
                    }
                    // No user cart yet: re-own the guest cart wholesale.
                    None => {
                        let mut cart = guest_cart;
                        cart.assign_to_user(user, now);
                        cart
                    }
                };
                self.carts.save(&cart).await?;
                Ok(cart)
            }
        }
    }

    /// Fetch the user's cart after a merge failed because the guest cart was
    /// missing. Mirrors the login flow falling back to whatever cart the
    /// user already had.
    pub async fn find_for_user(&self, user: UserId) -> Result<Option<Cart>, CartError> {
        Ok(self.carts.find_by_user(user).await?)
    }
}
