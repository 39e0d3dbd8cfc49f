//! Seed the catalog from a JSON file.
//!
//! The file is a JSON array of products:
//!
//! ```json
//! [
//!   {
//!     "name": "Linen Shirt",
//!     "description": "Breathable summer shirt",
//!     "price": "29.99",
//!     "images": [{"url": "https://...", "altText": null}],
//!     "sizes": ["S", "M", "L"],
//!     "colors": ["white", "navy"]
//!   }
//! ]
//! ```

use chrono::Utc;
use serde::Deserialize;
use sqlx::PgPool;
use thiserror::Error;

use threadline_api::db::{PgProductStore, ProductStore, RepositoryError};
use threadline_api::models::{Product, ProductImage};
use threadline_core::ProductId;

/// Errors that can occur while seeding.
#[derive(Debug, Error)]
pub enum SeedError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// File could not be read.
    #[error("Failed to read {0}: {1}")]
    Io(String, std::io::Error),

    /// File is not valid JSON.
    #[error("Failed to parse {0}: {1}")]
    Parse(String, serde_json::Error),

    /// Database error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Repository failure.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedProduct {
    name: String,
    #[serde(default)]
    description: String,
    price: rust_decimal::Decimal,
    #[serde(default)]
    images: Vec<ProductImage>,
    #[serde(default)]
    sizes: Vec<String>,
    #[serde(default)]
    colors: Vec<String>,
}

/// Insert every product from the file.
///
/// # Errors
///
/// Returns an error if the file is unreadable, malformed, or an insert
/// fails.
pub async fn products(file_path: &str) -> Result<(), SeedError> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("API_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map_err(|_| SeedError::MissingEnvVar("API_DATABASE_URL"))?;

    let raw = std::fs::read_to_string(file_path)
        .map_err(|e| SeedError::Io(file_path.to_owned(), e))?;
    let seeds: Vec<SeedProduct> =
        serde_json::from_str(&raw).map_err(|e| SeedError::Parse(file_path.to_owned(), e))?;

    let pool = PgPool::connect(&database_url).await?;
    let store = PgProductStore::new(pool);

    let count = seeds.len();
    for seed in seeds {
        let product = Product {
            id: ProductId::generate(),
            name: seed.name,
            description: seed.description,
            price: seed.price,
            images: seed.images,
            sizes: seed.sizes,
            colors: seed.colors,
            created_at: Utc::now(),
        };
        store.create(product).await?;
    }

    tracing::info!(count, "catalog seeded");
    Ok(())
}
