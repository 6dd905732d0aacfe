//! Seed the catalog from a YAML file.
//!
//! Reads states, locations, products, customers, and per-location stock from
//! a YAML document and inserts them. Rows that already exist (matched by
//! unique key) are left untouched, so re-running a seed file is harmless.

use std::path::Path;

use rust_decimal::Decimal;
use secrecy::SecretString;
use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use packhouse_engine::create_pool;

#[derive(Debug, Deserialize)]
struct SeedFile {
    #[serde(default)]
    states: Vec<SeedState>,
    #[serde(default)]
    locations: Vec<SeedLocation>,
    #[serde(default)]
    products: Vec<SeedProduct>,
    #[serde(default)]
    customers: Vec<SeedCustomer>,
    #[serde(default)]
    stock: Vec<SeedStock>,
}

#[derive(Debug, Deserialize)]
struct SeedState {
    id: i32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SeedLocation {
    id: i32,
    name: String,
}

#[derive(Debug, Deserialize)]
struct SeedProduct {
    id: i32,
    name: String,
    price: Decimal,
    currency: String,
    sku: String,
}

#[derive(Debug, Deserialize)]
struct SeedCustomer {
    id: i32,
    first_name: String,
    last_name: String,
    street: String,
    city: String,
    zip: String,
}

#[derive(Debug, Deserialize)]
struct SeedStock {
    location_id: i32,
    product_id: i32,
    quantity: i32,
}

/// Seed catalog data from a YAML file.
///
/// # Errors
///
/// Returns an error if environment variables are missing, the file cannot be
/// read or parsed, or database operations fail.
pub async fn catalog(file_path: &str) -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let database_url = std::env::var("PACKHOUSE_DATABASE_URL")
        .map(SecretString::from)
        .map_err(|_| "PACKHOUSE_DATABASE_URL not set")?;

    let path = Path::new(file_path);
    if !path.exists() {
        return Err(format!("File not found: {file_path}").into());
    }

    info!(path = %file_path, "Loading seed data from file");

    // Parse and validate before touching the database
    let content = tokio::fs::read_to_string(path).await?;
    let seed: SeedFile = serde_yaml::from_str(&content)?;

    for product in &seed.products {
        if product.price < Decimal::ZERO {
            return Err(format!("product {} has a negative price", product.sku).into());
        }
    }
    for stock in &seed.stock {
        if stock.quantity < 0 {
            return Err(format!(
                "stock for product {} at location {} is negative",
                stock.product_id, stock.location_id
            )
            .into());
        }
    }

    let pool = create_pool(&database_url).await?;
    info!("Connected to database");

    insert_all(&pool, &seed).await?;

    info!("Seeding complete!");
    info!("  States: {}", seed.states.len());
    info!("  Locations: {}", seed.locations.len());
    info!("  Products: {}", seed.products.len());
    info!("  Customers: {}", seed.customers.len());
    info!("  Stock rows: {}", seed.stock.len());

    Ok(())
}

async fn insert_all(pool: &PgPool, seed: &SeedFile) -> Result<(), sqlx::Error> {
    let mut tx = pool.begin().await?;

    for state in &seed.states {
        sqlx::query(
            "INSERT INTO state (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(state.id)
        .bind(&state.name)
        .execute(&mut *tx)
        .await?;
    }

    for location in &seed.locations {
        sqlx::query(
            "INSERT INTO location (id, name) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
        )
        .bind(location.id)
        .bind(&location.name)
        .execute(&mut *tx)
        .await?;
    }

    for product in &seed.products {
        sqlx::query(
            r"
            INSERT INTO product (id, name, price_amount, currency_code, sku)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.price)
        .bind(&product.currency)
        .bind(&product.sku)
        .execute(&mut *tx)
        .await?;
    }

    for customer in &seed.customers {
        let (address_id,): (i32,) = sqlx::query_as(
            "INSERT INTO address (street, city, zip) VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(&customer.street)
        .bind(&customer.city)
        .bind(&customer.zip)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r"
            INSERT INTO customer (id, first_name, last_name, address_id)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (id) DO NOTHING
            ",
        )
        .bind(customer.id)
        .bind(&customer.first_name)
        .bind(&customer.last_name)
        .bind(address_id)
        .execute(&mut *tx)
        .await?;
    }

    for stock in &seed.stock {
        sqlx::query(
            r"
            INSERT INTO location_stock (location_id, product_id, quantity)
            VALUES ($1, $2, $3)
            ON CONFLICT (location_id, product_id) DO NOTHING
            ",
        )
        .bind(stock.location_id)
        .bind(stock.product_id)
        .bind(stock.quantity)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await
}
