//! # Seed Data Generator
//!
//! Provisions a database file and populates it with demo data plus sample
//! products for development.
//!
//! ## Usage
//! ```bash
//! # Provision ./khata.db with the demo rows and 50 sample products
//! cargo run -p khata-db --bin seed
//!
//! # Custom path and product count
//! cargo run -p khata-db --bin seed -- --db ./data/khata.db --count 200
//! ```

use std::env;

use khata_core::NewProduct;
use khata_db::{seed, Database, DbConfig, DbError};

/// Product categories for realistic sample data.
const CATEGORIES: &[(&str, &[&str])] = &[
    (
        "FAB",
        &[
            "Cotton Bale", "Silk Yard", "Linen Roll", "Denim Bolt", "Khadi Sheet",
            "Chiffon Roll", "Georgette Bolt", "Voile Sheet",
        ],
    ),
    (
        "HRD",
        &[
            "Hex Bolt Box", "Wood Screw Pack", "Door Hinge", "Tower Bolt", "Hasp Set",
            "Wire Spool", "Nail Carton", "Anchor Pack",
        ],
    ),
    (
        "STA",
        &[
            "Ledger Book", "Carbon Paper", "Ink Bottle", "Stamp Pad", "Register",
            "File Folder", "Envelope Pack", "Receipt Book",
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), DbError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let db_path = arg_value(&args, "--db").unwrap_or_else(|| "./khata.db".to_string());
    let count: usize = arg_value(&args, "--count")
        .and_then(|v| v.parse().ok())
        .unwrap_or(50);

    println!("Provisioning {db_path} ...");
    let db = Database::new(DbConfig::new(&db_path)).await?;

    seed::seed_demo_data(&db).await?;
    println!("✓ Demo customer and product in place");

    for seq in 0..count {
        let (category, names) = CATEGORIES[seq % CATEGORIES.len()];
        let name = names[(seq / CATEGORIES.len()) % names.len()];
        let product = generate_product(category, name, seq);

        match db.products().create(&product).await {
            Ok(_) => {}
            // Re-runs collide with already-seeded SKUs; skip and move on
            Err(DbError::UniqueViolation { .. }) => {}
            Err(e) => return Err(e),
        }
    }

    let total = db.products().count().await?;
    println!("✓ Seed complete: {total} products in {db_path}");

    Ok(())
}

fn arg_value(args: &[String], flag: &str) -> Option<String> {
    args.iter()
        .position(|a| a == flag)
        .and_then(|i| args.get(i + 1))
        .cloned()
}

/// Generates a single sample product with deterministic pseudo-varied data.
fn generate_product(category: &str, name: &str, seq: usize) -> NewProduct {
    // Price band 50.00 - 849.00, varied by sequence
    let price = 50.0 + ((seq * 17) % 800) as f64;
    let stock = ((seq * 7) % 120) as i64;

    NewProduct {
        fs_sku: format!("{}-{:04}", category, seq),
        fs_prod_id: format!("prod-{seq}"),
        fs_variation_id: format!("var-{seq}"),
        fs_category_id: format!("cat-{}", category.to_lowercase()),
        category_name: category.to_string(),
        prod_name: format!("{name} {}", seq % 10),
        price,
        stock,
    }
}
