//! Product catalog domain types.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use threadline_core::ProductId;

/// A hosted product image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductImage {
    /// URL on the media host.
    pub url: String,
    /// Alternative text for accessibility.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// A catalog product.
///
/// Cart line items copy `name`, the first image URL, and `price` out of the
/// product at add time; the cart never re-reads the catalog afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    /// Unique product ID.
    pub id: ProductId,
    /// Product name.
    pub name: String,
    /// Long-form description.
    pub description: String,
    /// Unit price.
    pub price: Decimal,
    /// Gallery images, first one is the cart thumbnail.
    pub images: Vec<ProductImage>,
    /// Available sizes.
    pub sizes: Vec<String>,
    /// Available colors.
    pub colors: Vec<String>,
    /// When the product was created.
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// URL of the primary image, if the product has any.
    #[must_use]
    pub fn primary_image(&self) -> Option<String> {
        self.images.first().map(|img| img.url.clone())
    }
}
