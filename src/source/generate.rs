//! Synthetic catalog for exercising the large-list path

use super::{FetchError, ProductSource};
use crate::constants::GENERATED_CATEGORIES;
use crate::types::{Product, ProductPage};
use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// `count` rows: categories A-D, integer prices in [100, 10000), ~70% in stock
pub fn generate_products<R: Rng>(count: usize, rng: &mut R) -> Vec<Product> {
    (0..count)
        .map(|i| Product {
            id: format!("product-{}", i + 1),
            name: format!("Product {}", i + 1),
            category: GENERATED_CATEGORIES[rng.gen_range(0..GENERATED_CATEGORIES.len())].to_string(),
            price: rng.gen_range(100..10_000) as f64,
            in_stock: rng.gen_bool(0.7),
        })
        .collect()
}

pub struct GeneratedSource {
    count: usize,
    seed: Option<u64>,
}

impl GeneratedSource {
    /// A fixed `seed` yields the same dataset on every fetch
    pub fn new(count: usize, seed: Option<u64>) -> Self {
        Self { count, seed }
    }
}

#[async_trait]
impl ProductSource for GeneratedSource {
    fn describe(&self) -> String {
        format!("generated ({} rows)", self.count)
    }

    async fn fetch_products(&self) -> Result<ProductPage, FetchError> {
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let items = generate_products(self.count, &mut rng);
        debug!(count = items.len(), "Generated products");
        Ok(ProductPage {
            total: items.len(),
            items,
        })
    }

    async fn fetch_categories(&self) -> Result<Vec<String>, FetchError> {
        Ok(GENERATED_CATEGORIES.iter().map(|c| c.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_rows_in_range() {
        let mut rng = StdRng::seed_from_u64(7);
        let products = generate_products(2_000, &mut rng);
        assert_eq!(products.len(), 2_000);
        assert_eq!(products[1_999].id, "product-2000");
        for p in &products {
            assert!((100.0..10_000.0).contains(&p.price));
            assert_eq!(p.price.fract(), 0.0);
            assert!(GENERATED_CATEGORIES.contains(&p.category.as_str()));
        }
        let in_stock = products.iter().filter(|p| p.in_stock).count();
        assert!(in_stock > 1_200 && in_stock < 1_600, "{in_stock} in stock");
    }

    #[tokio::test]
    async fn test_seeded_source_is_repeatable() {
        let source = GeneratedSource::new(100, Some(42));
        let a = source.fetch_products().await.unwrap();
        let b = source.fetch_products().await.unwrap();
        assert_eq!(a.items, b.items);
        assert_eq!(source.fetch_categories().await.unwrap(), vec!["A", "B", "C", "D"]);
    }
}
