//! Application services.
//!
//! Handlers stay thin; the cart, checkout, auth and media logic lives here,
//! written against the store traits so it is testable without `PostgreSQL`.

pub mod auth;
pub mod carts;
pub mod checkout;
pub mod media;

pub use auth::{AuthError, AuthService};
pub use carts::{AddItem, AddOutcome, CartError, CartIdentity, CartService};
pub use checkout::{CheckoutError, CheckoutService, PaymentConfirmation};
pub use media::{MediaClient, MediaError};
