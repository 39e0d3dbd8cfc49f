//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ApiConfig;
use crate::db::Stores;
use crate::services::{AuthService, CartService, CheckoutService, MediaClient};

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like the stores, services and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: ApiConfig,
    stores: Stores,
    auth: AuthService,
    carts: CartService,
    checkout: CheckoutService,
    media: Option<MediaClient>,
}

impl AppState {
    /// Create a new application state over the given stores.
    #[must_use]
    pub fn new(config: ApiConfig, stores: Stores) -> Self {
        let auth = AuthService::new(config.jwt_secret.clone(), config.token_ttl_hours);
        let carts = CartService::new(stores.carts.clone(), stores.products.clone());
        let checkout = CheckoutService::new(
            stores.checkouts.clone(),
            stores.orders.clone(),
            stores.carts.clone(),
        );
        let media = config
            .media
            .as_ref()
            .map(|m| MediaClient::new(m.upload_url.clone(), m.upload_preset.clone()));

        Self {
            inner: Arc::new(AppStateInner {
                config,
                stores,
                auth,
                carts,
                checkout,
                media,
            }),
        }
    }

    /// Get a reference to the API configuration.
    #[must_use]
    pub fn config(&self) -> &ApiConfig {
        &self.inner.config
    }

    /// Get a reference to the entity stores.
    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.inner.stores
    }

    /// Get a reference to the auth service.
    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    /// Get a reference to the cart service.
    #[must_use]
    pub fn carts(&self) -> &CartService {
        &self.inner.carts
    }

    /// Get a reference to the checkout service.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }

    /// Get a reference to the media client, when uploads are configured.
    #[must_use]
    pub fn media(&self) -> Option<&MediaClient> {
        self.inner.media.as_ref()
    }
}
