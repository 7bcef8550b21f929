//! Seed the catalog with demo data.
//!
//! Inserts a handful of categories and products through the same store
//! adapter the API uses, so seeded rows go through slug derivation and
//! validation exactly like production writes.

use rust_decimal::Decimal;
use secrecy::SecretString;
use tracing::info;

use greenbasket_api::models::ProductInput;
use greenbasket_api::store::{CatalogStore, PgStore, create_pool};
use greenbasket_core::{Price, Slug};

const DEMO_PRODUCTS: &[(&str, &str, i64, u32)] = &[
    ("Cold Brew Kit", "Everything needed to brew at home", 25, 40),
    ("Stoneware Mug", "A 350ml hand-glazed mug", 10, 120),
    ("Single Origin Beans", "1kg of washed-process beans", 18, 75),
    ("Pour Over Stand", "Walnut stand for V60-style brewers", 45, 15),
    ("Travel Press", "Leak-proof press for the road", 30, 60),
];

/// Seed demo categories and products.
///
/// # Errors
///
/// Returns an error if the database URL is missing or a write fails.
pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("GREENBASKET_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| "GREENBASKET_DATABASE_URL not set")?;

    let pool = create_pool(&database_url).await?;
    let store = PgStore::new(pool);

    let category = store.insert_category("Coffee Gear").await?;
    info!(category = %category.name, "seeded category");

    for &(name, description, price, quantity) in DEMO_PRODUCTS {
        let record = store
            .insert_product(ProductInput {
                name: name.to_owned(),
                slug: Slug::from_name(name),
                description: description.to_owned(),
                price: Price::new(Decimal::new(price, 0))?,
                quantity,
                category_id: category.id,
                shipping: true,
                photo: None,
            })
            .await?;
        info!(product = %record.name, slug = %record.slug, "seeded product");
    }

    info!("Seeding complete!");
    Ok(())
}
