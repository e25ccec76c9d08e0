//! # Seed Data Loader
//!
//! Populates the database with a small sample catalog for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./aroma_dev.db (default)
//! cargo run -p aroma-db --bin seed
//!
//! # Specify database path
//! cargo run -p aroma-db --bin seed -- --db ./data/aroma.db
//! ```
//!
//! ## Catalog
//! - Ingredients: essential oils (drops, 20 per ml), carrier oils, a
//!   hydrosol and an absolute
//! - Packaging items: bottle, roll-on cap, dropper, label
//! - Bundles: a roll-on and a dropper package, both 30ml
//! - Recipes: three 30ml blends
//!
//! Everything is written to the shared bucket (no owner). Stock for drop
//! measured oils is given in drops.

use std::collections::HashMap;
use std::env;

use aroma_core::{
    CapacityPolicy, IngredientDraft, MeasurementKind, Money, PackageBundleDraft,
    PackagingItemDraft, RecipeDraft, RecipeIngredient,
};
use aroma_db::{Database, DbConfig};

/// (name, category, description, properties, notes, price per ml, stock, drops per ml)
type IngredientSeed = (&'static str, &'static str, &'static str, &'static str, &'static str, f64, f64, Option<f64>);

const INGREDIENTS: &[IngredientSeed] = &[
    (
        "Lavender Essential Oil",
        "Essential Oil",
        "A versatile oil with a sweet, floral aroma",
        "Calming, relaxing, balancing. Good for skin care and sleep support.",
        "From Provence, France",
        0.85,
        2000.0,
        Some(20.0),
    ),
    (
        "Tea Tree Essential Oil",
        "Essential Oil",
        "Fresh, medicinal aroma with powerful cleansing properties",
        "Antimicrobial, cleansing, purifying",
        "Australian sourced",
        0.65,
        2000.0,
        Some(20.0),
    ),
    (
        "Sweet Almond Oil",
        "Carrier Oil",
        "Light, sweet, nutty carrier oil",
        "Moisturizing, nourishing, gentle",
        "Cold pressed",
        0.15,
        500.0,
        None,
    ),
    (
        "Rose Otto",
        "Essential Oil",
        "Deep, rich, floral aroma",
        "Nurturing, uplifting, balancing",
        "Steam distilled",
        150.0,
        200.0,
        Some(20.0),
    ),
    (
        "Frankincense",
        "Essential Oil",
        "Warm, spicy, woody aroma",
        "Grounding, meditative, rejuvenating",
        "Sourced from Oman",
        8.50,
        1000.0,
        Some(20.0),
    ),
    (
        "Rose Hydrosol",
        "Hydrosol",
        "Gentle, floral water",
        "Hydrating, balancing, soothing",
        "Steam distilled",
        0.45,
        250.0,
        None,
    ),
    (
        "Jojoba Oil",
        "Carrier Oil",
        "Golden, liquid wax similar to skin's sebum",
        "Balancing, moisturizing, non-greasy",
        "Cold pressed",
        0.35,
        500.0,
        None,
    ),
    (
        "Jasmine Absolute",
        "Absolute",
        "Rich, exotic, floral aroma",
        "Uplifting, sensual, confidence-boosting",
        "Solvent extracted",
        95.0,
        300.0,
        Some(20.0),
    ),
];

/// (name, type, material, description, price, stock, capacity, color, notes)
type PackagingSeed = (&'static str, &'static str, &'static str, &'static str, f64, i64, Option<f64>, &'static str, &'static str);

const PACKAGING_ITEMS: &[PackagingSeed] = &[
    (
        "Amber Glass Bottle",
        "Bottle",
        "Glass",
        "Dark amber glass bottle",
        2.50,
        100,
        Some(30.0),
        "Amber",
        "UV protective glass",
    ),
    (
        "Roll-on Cap",
        "Cap",
        "Stainless Steel",
        "Stainless steel roll-on applicator",
        1.00,
        150,
        None,
        "Silver",
        "Fits 30ml bottles",
    ),
    (
        "Glass Dropper",
        "Dropper",
        "Glass",
        "Glass pipette with rubber bulb",
        1.25,
        120,
        None,
        "Black",
        "Fits 30ml bottles",
    ),
    (
        "Label",
        "Label",
        "Vinyl",
        "Waterproof label with elegant design",
        0.50,
        200,
        None,
        "White",
        "Waterproof and oil-resistant",
    ),
];

/// (name, description, capacity, notes, item names)
const BUNDLES: &[(&str, &str, f64, &str, &[&str])] = &[
    (
        "Standard 30ml Package",
        "Complete roll-on packaging set for 30ml products",
        30.0,
        "Our most popular packaging option",
        &["Amber Glass Bottle", "Roll-on Cap", "Label"],
    ),
    (
        "Dropper 30ml Package",
        "Bottle, dropper and label for facial oils",
        30.0,
        "For oils applied by the drop",
        &["Amber Glass Bottle", "Glass Dropper", "Label"],
    ),
];

/// (name, description, volume, retail price, notes, bundle name, entries)
const RECIPES: &[(&str, &str, f64, f64, &str, &str, &[(&str, f64)])] = &[
    (
        "Relaxing Sleep Blend",
        "A calming blend to promote restful sleep",
        30.0,
        45.0,
        "Best used before bedtime",
        "Standard 30ml Package",
        &[
            ("Lavender Essential Oil", 3.0),
            ("Sweet Almond Oil", 25.0),
            ("Frankincense", 2.0),
        ],
    ),
    (
        "Stress Relief Roll-on",
        "An uplifting blend to ease tension and stress",
        30.0,
        35.0,
        "Apply to pulse points",
        "Standard 30ml Package",
        &[
            ("Lavender Essential Oil", 2.0),
            ("Rose Otto", 1.0),
            ("Jojoba Oil", 27.0),
        ],
    ),
    (
        "Luxury Rose Facial Oil",
        "A luxurious facial oil for glowing skin",
        30.0,
        85.0,
        "Use morning and evening after cleansing",
        "Dropper 30ml Package",
        &[
            ("Rose Otto", 1.5),
            ("Jasmine Absolute", 1.0),
            ("Jojoba Oil", 15.0),
            ("Sweet Almond Oil", 12.5),
        ],
    ),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut db_path = String::from("./aroma_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("AromaDB Seed Data Loader");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: ./aroma_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 AromaDB Seed Data Loader");
    println!("===========================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.ingredients().count(None).await?
        + db.packaging_items().count(None).await?
        + db.package_bundles().count(None).await?
        + db.recipes().count(None).await?;
    if existing > 0 {
        println!("⚠ Database already has {} records", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Ingredients
    let mut ingredient_ids = HashMap::new();
    for (name, category, description, properties, notes, price, stock, drops_per_ml) in INGREDIENTS {
        let draft = IngredientDraft {
            name: name.to_string(),
            category: category.to_string(),
            description: description.to_string(),
            properties: properties.to_string(),
            notes: Some(notes.to_string()),
            price_per_unit: Money::from_decimal(*price),
            stock_amount: *stock,
            measurement_type: if drops_per_ml.is_some() {
                MeasurementKind::Drops
            } else {
                MeasurementKind::Ml
            },
            drops_per_ml: *drops_per_ml,
        };
        let ingredient = db.ingredients().create(None, draft).await?;
        ingredient_ids.insert(*name, ingredient.id);
    }
    println!("✓ {} ingredients", ingredient_ids.len());

    // Packaging items
    let mut item_ids = HashMap::new();
    for (name, item_type, material, description, price, stock, capacity, color, notes) in PACKAGING_ITEMS {
        let draft = PackagingItemDraft {
            name: name.to_string(),
            item_type: item_type.to_string(),
            material: material.to_string(),
            description: description.to_string(),
            price: Money::from_decimal(*price),
            stock_amount: *stock,
            capacity_ml: *capacity,
            color: Some(color.to_string()),
            notes: Some(notes.to_string()),
        };
        let item = db.packaging_items().create(None, draft).await?;
        item_ids.insert(*name, item.id);
    }
    println!("✓ {} packaging items", item_ids.len());

    // Bundles
    let mut bundle_ids = HashMap::new();
    for (name, description, capacity, notes, items) in BUNDLES {
        let draft = PackageBundleDraft {
            name: name.to_string(),
            description: description.to_string(),
            capacity_ml: *capacity,
            notes: Some(notes.to_string()),
            item_ids: items
                .iter()
                .filter_map(|item| item_ids.get(item).cloned())
                .collect(),
        };
        let bundle = db.package_bundles().create(None, draft).await?;
        println!("  {} → {}", bundle.name, bundle.total_price);
        bundle_ids.insert(*name, bundle.id);
    }
    println!("✓ {} package bundles", bundle_ids.len());

    // Recipes
    for (name, description, volume, retail, notes, bundle, entries) in RECIPES {
        let draft = RecipeDraft {
            name: name.to_string(),
            description: description.to_string(),
            total_volume_ml: *volume,
            retail_price: Some(Money::from_decimal(*retail)),
            notes: Some(notes.to_string()),
            package_bundle_id: bundle_ids.get(bundle).cloned(),
            ingredients: entries
                .iter()
                .filter_map(|(ingredient, amount_ml)| {
                    ingredient_ids.get(ingredient).map(|id| RecipeIngredient {
                        ingredient_id: id.clone(),
                        amount_ml: *amount_ml,
                    })
                })
                .collect(),
        };

        match db.recipes().create(None, draft, CapacityPolicy::Enforce).await {
            Ok(saved) => println!("  {} → cost {}", saved.recipe.name, saved.recipe.total_cost),
            Err(e) => eprintln!("Failed to insert {}: {}", name, e),
        }
    }
    println!("✓ {} recipes", db.recipes().count(None).await?);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
