//! # Seed Files
//!
//! A seed file describes a catalog plus a scripted cart session.
//!
//! ## File Format (TOML)
//! ```toml
//! [[products]]
//! id = 1
//! name = "Product 1"
//! price = 50
//!
//! [[discounts]]
//! name = "Discount 4"
//! kind = "percentage"
//! amount = 100
//! max_amount = 500
//!
//! [[promotions]]
//! buy_product_id = 1
//! get_product_id = 2
//! get_quantity = 5
//!
//! [[steps]]
//! op = "add"
//! product_id = 1
//!
//! [[steps]]
//! op = "update"
//! product_id = 1
//! quantity = 3
//!
//! [[steps]]
//! op = "apply_discount"
//! name = "Discount 4"
//! ```
//!
//! The same shape is accepted as JSON when the file ends in `.json`.
//! Step ops: `add`, `update`, `update_by_relative`,
//! `add_or_update_by_relative`, `remove`, `apply_discount`,
//! `remove_discount`, `destroy`. Item steps also accept the `is_free` and
//! `no_emit` flags.

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use till_core::{Catalog, ItemOptions, NewDiscount, NewProduct, NewPromotion, ProductId};

use crate::error::{CliError, CliResult};

// =============================================================================
// Steps
// =============================================================================

/// One scripted cart call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Step {
    Add {
        product_id: ProductId,
        #[serde(flatten)]
        options: ItemOptions,
    },
    Update {
        product_id: ProductId,
        quantity: i64,
        #[serde(flatten)]
        options: ItemOptions,
    },
    UpdateByRelative {
        product_id: ProductId,
        delta: i64,
        #[serde(flatten)]
        options: ItemOptions,
    },
    AddOrUpdateByRelative {
        product_id: ProductId,
        delta: i64,
        #[serde(flatten)]
        options: ItemOptions,
    },
    Remove {
        product_id: ProductId,
    },
    ApplyDiscount {
        name: String,
    },
    RemoveDiscount {
        name: String,
    },
    Destroy,
}

impl Step {
    /// The `op` tag, for logs and errors.
    pub fn op(&self) -> &'static str {
        match self {
            Step::Add { .. } => "add",
            Step::Update { .. } => "update",
            Step::UpdateByRelative { .. } => "update_by_relative",
            Step::AddOrUpdateByRelative { .. } => "add_or_update_by_relative",
            Step::Remove { .. } => "remove",
            Step::ApplyDiscount { .. } => "apply_discount",
            Step::RemoveDiscount { .. } => "remove_discount",
            Step::Destroy => "destroy",
        }
    }
}

// =============================================================================
// Seed File
// =============================================================================

/// Catalog inputs plus the session script.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedFile {
    #[serde(default)]
    pub products: Vec<NewProduct>,
    #[serde(default)]
    pub discounts: Vec<NewDiscount>,
    #[serde(default)]
    pub promotions: Vec<NewPromotion>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl SeedFile {
    /// Reads a seed file, choosing the parser by extension.
    pub fn load(path: &Path) -> CliResult<Self> {
        let format = path.extension().and_then(|e| e.to_str());
        let contents = match format {
            Some("toml") | Some("json") => std::fs::read_to_string(path)?,
            _ => return Err(CliError::UnsupportedSeed(path.to_path_buf())),
        };

        let seed = if format == Some("toml") {
            Self::from_toml_str(&contents)?
        } else {
            Self::from_json_str(&contents)?
        };

        debug!(
            path = %path.display(),
            products = seed.products.len(),
            discounts = seed.discounts.len(),
            promotions = seed.promotions.len(),
            steps = seed.steps.len(),
            "Parsed seed file"
        );
        Ok(seed)
    }

    pub fn from_toml_str(contents: &str) -> CliResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn from_json_str(contents: &str) -> CliResult<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Bulk-loads the three registries. Promotions go last so their product
    /// references can be checked.
    pub fn build_catalog(&self) -> CliResult<Catalog> {
        let mut catalog = Catalog::new();
        catalog.add_products(self.products.clone())?;
        catalog.add_discounts(self.discounts.clone())?;
        catalog.add_promotions(self.promotions.clone())?;
        Ok(catalog)
    }

    /// Built-in session used when no seed file is configured.
    ///
    /// Three products, four discounts, buy Product 1 get Product 2, and a
    /// short session that ends with the capped 100% discount applied.
    pub fn demo() -> Self {
        let paid = ItemOptions::paid();
        SeedFile {
            products: vec![
                NewProduct::new("Product 1", 50).with_id(1),
                NewProduct::new("Product 2", 150).with_id(2),
                NewProduct::new("Product 3", 250).with_id(3),
            ],
            discounts: vec![
                NewDiscount::percentage("Discount 1", 50),
                NewDiscount::fixed("Discount 2", 250),
                NewDiscount::fixed("Discount 3", 500),
                NewDiscount::percentage("Discount 4", 100).with_max_amount(500),
            ],
            promotions: vec![NewPromotion::new(1, 2)],
            steps: vec![
                Step::Add {
                    product_id: ProductId::new(1),
                    options: paid,
                },
                Step::Update {
                    product_id: ProductId::new(1),
                    quantity: 200,
                    options: paid,
                },
                Step::AddOrUpdateByRelative {
                    product_id: ProductId::new(2),
                    delta: 2,
                    options: paid,
                },
                Step::AddOrUpdateByRelative {
                    product_id: ProductId::new(3),
                    delta: 3,
                    options: paid,
                },
                Step::Update {
                    product_id: ProductId::new(3),
                    quantity: 10,
                    options: paid,
                },
                Step::Remove {
                    product_id: ProductId::new(3),
                },
                Step::ApplyDiscount {
                    name: "Discount 4".to_string(),
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML_SEED: &str = r#"
        [[products]]
        id = 1
        name = "Product 1"
        price = 50

        [[products]]
        name = "Product 2"
        price = 150

        [[discounts]]
        name = "Half"
        kind = "percentage"
        amount = 50

        [[promotions]]
        buy_product_id = 1
        get_product_id = 2
        buy_quantity = 2
        once = true

        [[steps]]
        op = "add"
        product_id = 1

        [[steps]]
        op = "update_by_relative"
        product_id = 1
        delta = 4
        is_free = true

        [[steps]]
        op = "apply_discount"
        name = "Half"

        [[steps]]
        op = "destroy"
    "#;

    #[test]
    fn test_parse_toml_seed() {
        let seed = SeedFile::from_toml_str(TOML_SEED).unwrap();

        assert_eq!(seed.products.len(), 2);
        assert_eq!(seed.products[1].id, None);
        assert!(seed.promotions[0].once);
        assert_eq!(seed.promotions[0].get_quantity, 1);
        assert_eq!(
            seed.steps[1],
            Step::UpdateByRelative {
                product_id: ProductId::new(1),
                delta: 4,
                options: ItemOptions::free(),
            }
        );
        assert_eq!(seed.steps[3], Step::Destroy);
    }

    #[test]
    fn test_parse_json_seed() {
        let seed = SeedFile::from_json_str(
            r#"{
                "products": [{"name": "Only", "price": 10}],
                "steps": [
                    {"op": "add", "product_id": 1},
                    {"op": "update", "product_id": 1, "quantity": 3, "no_emit": true},
                    {"op": "remove_discount", "name": "Nope"}
                ]
            }"#,
        )
        .unwrap();

        assert!(seed.discounts.is_empty());
        assert_eq!(
            seed.steps[1],
            Step::Update {
                product_id: ProductId::new(1),
                quantity: 3,
                options: ItemOptions::paid().silent(),
            }
        );
        assert_eq!(seed.steps[2].op(), "remove_discount");
    }

    #[test]
    fn test_unknown_step_is_rejected() {
        let err = SeedFile::from_json_str(r#"{"steps": [{"op": "checkout"}]}"#).unwrap_err();
        assert!(matches!(err, CliError::Json(_)));
    }

    #[test]
    fn test_build_catalog_allocates_ids() {
        let seed = SeedFile::from_toml_str(TOML_SEED).unwrap();
        let catalog = seed.build_catalog().unwrap();

        assert_eq!(catalog.product(ProductId::new(2)).unwrap().name(), "Product 2");
        assert_eq!(catalog.promotions().len(), 1);
    }

    #[test]
    fn test_build_catalog_rejects_dangling_promotion() {
        let mut seed = SeedFile::demo();
        seed.promotions.push(NewPromotion::new(1, 7));
        let err = seed.build_catalog().unwrap_err();
        assert!(matches!(err, CliError::Core(_)));
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let err = SeedFile::load(Path::new("session.yaml")).unwrap_err();
        assert!(matches!(err, CliError::UnsupportedSeed(_)));
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("till-seed-{}.toml", uuid::Uuid::new_v4()));
        std::fs::write(&path, TOML_SEED).unwrap();

        let seed = SeedFile::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(seed.steps.len(), 4);
    }
}
