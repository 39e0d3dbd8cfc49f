//! Shopping cart domain types.
//!
//! A cart belongs to exactly one identity: either a registered user or an
//! anonymous guest token. Line items are keyed by `(product, size, color)`
//! and the total is recomputed from the items after every mutation - the
//! stored total is derived state, never input.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use threadline_core::{CartId, GuestId, ProductId, UserId};

/// Identity/uniqueness key of a cart line item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub product_id: ProductId,
    pub size: String,
    pub color: String,
}

/// One line of a cart (and, snapshotted, of a checkout or order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    /// Catalog product this line refers to.
    pub product_id: ProductId,
    /// Product name copied at add time.
    pub name: String,
    /// Primary product image copied at add time.
    pub image: Option<String>,
    /// Unit price copied at add time.
    pub price: Decimal,
    /// Chosen size variant.
    pub size: String,
    /// Chosen color variant.
    pub color: String,
    /// Number of units.
    pub quantity: u32,
}

impl LineItem {
    /// The `(product, size, color)` key this line is unique under.
    #[must_use]
    pub fn key(&self) -> LineKey {
        LineKey {
            product_id: self.product_id,
            size: self.size.clone(),
            color: self.color.clone(),
        }
    }

    fn matches(&self, key: &LineKey) -> bool {
        self.product_id == key.product_id && self.size == key.size && self.color == key.color
    }

    /// Price contribution of this line (`price * quantity`).
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

/// A shopping cart.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    /// Unique cart ID.
    pub id: CartId,
    /// Owning registered user, if any.
    pub user: Option<UserId>,
    /// Owning guest token, if any. Cleared when merged into a user cart.
    pub guest_id: Option<GuestId>,
    /// Line items. The wire name `products` is the public API contract.
    #[serde(rename = "products")]
    pub items: Vec<LineItem>,
    /// Derived sum of all line totals.
    pub total_price: Decimal,
    /// When the cart was created.
    pub created_at: DateTime<Utc>,
    /// When the cart was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Cart {
    /// Create an empty cart owned by a registered user.
    #[must_use]
    pub fn for_user(user: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::generate(),
            user: Some(user),
            guest_id: None,
            items: Vec::new(),
            total_price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Create an empty cart owned by a guest token.
    #[must_use]
    pub fn for_guest(guest: GuestId, now: DateTime<Utc>) -> Self {
        Self {
            id: CartId::generate(),
            user: None,
            guest_id: Some(guest),
            items: Vec::new(),
            total_price: Decimal::ZERO,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether the cart holds no line items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Add a line item, accumulating quantity when the key already exists.
    /// Accumulation saturates at `u32::MAX`.
    pub fn add_line(&mut self, item: LineItem, now: DateTime<Utc>) {
        let key = item.key();
        if let Some(existing) = self.items.iter_mut().find(|line| line.matches(&key)) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            self.items.push(item);
        }
        self.touch(now);
    }

    /// Overwrite a line's quantity. A quantity of zero or less removes the
    /// line entirely (not an error). Returns `false` if no line matches.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: i64, now: DateTime<Utc>) -> bool {
        let Some(pos) = self.items.iter().position(|line| line.matches(key)) else {
            return false;
        };
        if quantity > 0 {
            // The position came from `iter().position` just above.
            #[allow(clippy::indexing_slicing)]
            {
                self.items[pos].quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
            }
        } else {
            self.items.remove(pos);
        }
        self.touch(now);
        true
    }

    /// Remove a line item. Returns `false` if no line matches.
    pub fn remove_line(&mut self, key: &LineKey, now: DateTime<Utc>) -> bool {
        let Some(pos) = self.items.iter().position(|line| line.matches(key)) else {
            return false;
        };
        self.items.remove(pos);
        self.touch(now);
        true
    }

    /// Fold another cart's items into this one: quantities add on matching
    /// keys, unmatched lines transfer as-is.
    pub fn merge_items(&mut self, incoming: Vec<LineItem>, now: DateTime<Utc>) {
        for item in incoming {
            self.add_line(item, now);
        }
    }

    /// Re-own a guest cart: set the user, clear the guest token.
    pub fn assign_to_user(&mut self, user: UserId, now: DateTime<Utc>) {
        self.user = Some(user);
        self.guest_id = None;
        self.touch(now);
    }

    /// Recompute the derived total from the current line items.
    pub fn recompute_total(&mut self) {
        self.total_price = self.items.iter().map(LineItem::line_total).sum();
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.recompute_total();
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().expect("decimal literal")
    }

    fn item(product_id: ProductId, price: &str, size: &str, quantity: u32) -> LineItem {
        LineItem {
            product_id,
            name: "Linen Shirt".to_owned(),
            image: Some("https://media.example/shirt.jpg".to_owned()),
            price: price.parse().expect("price"),
            size: size.to_owned(),
            color: "navy".to_owned(),
            quantity,
        }
    }

    #[test]
    fn test_add_line_accumulates_on_same_key() {
        let now = Utc::now();
        let product = ProductId::generate();
        let mut cart = Cart::for_user(UserId::generate(), now);

        cart.add_line(item(product, "19.99", "M", 1), now);
        cart.add_line(item(product, "19.99", "M", 2), now);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.first().map(|l| l.quantity), Some(3));
        assert_eq!(cart.total_price, dec("59.97"));
    }

    #[test]
    fn test_add_line_saturates_at_max_quantity() {
        let now = Utc::now();
        let product = ProductId::generate();
        let mut cart = Cart::for_user(UserId::generate(), now);

        cart.add_line(item(product, "19.99", "M", u32::MAX), now);
        cart.add_line(item(product, "19.99", "M", 1), now);

        assert_eq!(cart.items.len(), 1);
        assert_eq!(cart.items.first().map(|l| l.quantity), Some(u32::MAX));
    }

    #[test]
    fn test_add_line_distinct_key_appends() {
        let now = Utc::now();
        let product = ProductId::generate();
        let mut cart = Cart::for_user(UserId::generate(), now);

        cart.add_line(item(product, "19.99", "M", 1), now);
        cart.add_line(item(product, "19.99", "L", 1), now);

        assert_eq!(cart.items.len(), 2);
        assert_eq!(cart.total_price, dec("39.98"));
    }

    #[test]
    fn test_total_is_recomputed_not_accumulated() {
        let now = Utc::now();
        let mut cart = Cart::for_user(UserId::generate(), now);
        let product = ProductId::generate();

        cart.add_line(item(product, "10.00", "M", 2), now);
        // Tamper with the derived field; the next mutation must fix it.
        cart.total_price = dec("999.00");
        cart.add_line(item(product, "10.00", "M", 1), now);

        assert_eq!(cart.total_price, dec("30.00"));
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let now = Utc::now();
        let mut cart = Cart::for_user(UserId::generate(), now);
        let line = item(ProductId::generate(), "5.00", "S", 4);
        let key = line.key();
        cart.add_line(line, now);

        assert!(cart.set_quantity(&key, 0, now));
        assert!(cart.is_empty());
        assert_eq!(cart.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_set_quantity_overwrites() {
        let now = Utc::now();
        let mut cart = Cart::for_user(UserId::generate(), now);
        let line = item(ProductId::generate(), "5.00", "S", 4);
        let key = line.key();
        cart.add_line(line, now);

        assert!(cart.set_quantity(&key, 2, now));
        assert_eq!(cart.items.first().map(|l| l.quantity), Some(2));
        assert_eq!(cart.total_price, dec("10.00"));
    }

    #[test]
    fn test_set_quantity_missing_line() {
        let now = Utc::now();
        let mut cart = Cart::for_user(UserId::generate(), now);
        let key = LineKey {
            product_id: ProductId::generate(),
            size: "M".to_owned(),
            color: "navy".to_owned(),
        };
        assert!(!cart.set_quantity(&key, 3, now));
    }

    #[test]
    fn test_remove_line() {
        let now = Utc::now();
        let mut cart = Cart::for_user(UserId::generate(), now);
        let line = item(ProductId::generate(), "7.50", "M", 2);
        let key = line.key();
        cart.add_line(line, now);

        assert!(cart.remove_line(&key, now));
        assert!(!cart.remove_line(&key, now));
        assert_eq!(cart.total_price, Decimal::ZERO);
    }

    #[test]
    fn test_assign_to_user_clears_guest_token() {
        let now = Utc::now();
        let mut cart = Cart::for_guest(GuestId::mint(now), now);
        let user = UserId::generate();

        cart.assign_to_user(user, now);

        assert_eq!(cart.user, Some(user));
        assert!(cart.guest_id.is_none());
    }

    #[test]
    fn test_merge_items_adds_quantities_on_match() {
        let now = Utc::now();
        let product = ProductId::generate();
        let mut user_cart = Cart::for_user(UserId::generate(), now);
        user_cart.add_line(item(product, "19.99", "M", 1), now);

        user_cart.merge_items(vec![item(product, "19.99", "M", 2)], now);

        assert_eq!(user_cart.items.len(), 1);
        assert_eq!(user_cart.items.first().map(|l| l.quantity), Some(3));
        assert_eq!(user_cart.total_price, dec("59.97"));
    }

    #[test]
    fn test_serializes_items_as_products() {
        let now = Utc::now();
        let cart = Cart::for_user(UserId::generate(), now);
        let json = serde_json::to_value(&cart).expect("serialize");
        assert!(json.get("products").is_some());
        assert!(json.get("items").is_none());
        assert!(json.get("totalPrice").is_some());
    }
}
