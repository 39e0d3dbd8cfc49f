//! Domain models for the Threadline backend.
//!
//! These types are the single source of truth for both persistence and the
//! public wire format: every entity serializes to the camelCase JSON the API
//! contract uses, while the storage layer maps them to and from rows.

pub mod cart;
pub mod checkout;
pub mod order;
pub mod product;
pub mod subscriber;
pub mod user;

pub use cart::{Cart, LineItem, LineKey};
pub use checkout::{Checkout, CheckoutState, CheckoutView, ShippingAddress, TransitionError};
pub use order::{Order, OrderOwner, OrderView, OwnerSummary};
pub use product::{Product, ProductImage};
pub use subscriber::Subscriber;
pub use user::User;
