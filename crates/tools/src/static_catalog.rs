//! In-memory product catalog with keyword matching.
//!
//! Used when no product index is configured, and in tests.

use async_trait::async_trait;
use shopassist_core::catalog::Product;
use shopassist_core::error::ToolError;

use crate::search::{SearchBackend, SearchQuery};

pub struct StaticCatalog {
    products: Vec<Product>,
}

impl StaticCatalog {
    pub fn new(products: Vec<Product>) -> Self {
        Self { products }
    }

    /// A small built-in catalog of home electronics.
    pub fn demo() -> Self {
        Self::new(vec![
            item("Roborock S8 Robot Vacuum", 5990.0, "Home Appliances", "Robot vacuums",
                "Robot vacuum and mop with LiDAR navigation and self-emptying dock.", "roborock-s8"),
            item("Dyson V15 Detect Stick Vacuum", 7490.0, "Home Appliances", "Vacuum cleaners",
                "Cordless stick vacuum with laser dust detection and 60 minute runtime.", "dyson-v15"),
            item("Samsung 55\" Neo QLED 4K Smart TV", 12990.0, "TV & Audio", "TVs",
                "55 inch 4K QLED smart TV with Quantum HDR and a 120 Hz panel.", "samsung-qn55"),
            item("Sonos Era 100 Smart Speaker", 2790.0, "TV & Audio", "Speakers",
                "Compact smart speaker with stereo sound and voice control.", "sonos-era-100"),
            item("PlayStation 5 Slim", 5990.0, "Gaming", "Consoles",
                "Slim gaming console with 1 TB SSD and DualSense controller.", "ps5-slim"),
            item("Philips Series 3300 Espresso Machine", 4490.0, "Small Appliances", "Coffee machines",
                "Fully automatic coffee machine with LatteGo milk system.", "philips-ep3300"),
            item("Xiaomi Smart Air Purifier 4", 1790.0, "Home Appliances", "Air purifiers",
                "Air purifier with HEPA filter for rooms up to 48 square meters.", "xiaomi-ap4"),
            item("Google Nest Thermostat", 1690.0, "Smart Home", "Thermostats",
                "Smart thermostat that learns your schedule to save energy.", "nest-thermostat"),
            item("Arlo Pro 5 Security Camera", 2490.0, "Smart Home", "Security cameras",
                "Wireless 2K security camera with colour night vision.", "arlo-pro-5"),
            item("Logitech MX Keys S Keyboard", 1290.0, "Computers", "Keyboards",
                "Wireless illuminated keyboard for the home office.", "mx-keys-s"),
        ])
    }
}

fn item(title: &str, price: f64, category: &str, subcategory: &str, description: &str, slug: &str) -> Product {
    Product {
        title: title.into(),
        price,
        category: category.into(),
        subcategory: Some(subcategory.into()),
        description: description.into(),
        image_url: format!("https://images.example.com/{slug}.jpg"),
        link_url: format!("https://shop.example.com/p/{slug}"),
    }
}

/// Number of query terms found in the product's searchable text.
fn score(product: &Product, terms: &[String]) -> usize {
    let haystack = format!(
        "{} {} {} {}",
        product.title,
        product.category,
        product.subcategory.as_deref().unwrap_or_default(),
        product.description
    )
    .to_lowercase();

    terms.iter().filter(|t| haystack.contains(t.as_str())).count()
}

#[async_trait]
impl SearchBackend for StaticCatalog {
    fn name(&self) -> &str {
        "static-catalog"
    }

    /// Keyword match over title, category and description. A `filter` restricts
    /// results to a category or subcategory name.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<Product>, ToolError> {
        let terms: Vec<String> = query
            .query
            .split_whitespace()
            .map(str::to_lowercase)
            .collect();

        let in_filter = |p: &Product| match &query.filter {
            Some(f) => {
                p.category.eq_ignore_ascii_case(f)
                    || p.subcategory.as_deref().is_some_and(|s| s.eq_ignore_ascii_case(f))
            }
            None => true,
        };

        let mut scored: Vec<(usize, &Product)> = self
            .products
            .iter()
            .filter(|p| in_filter(p))
            .map(|p| (score(p, &terms), p))
            .filter(|(s, _)| *s > 0)
            .collect();

        // Stable sort keeps catalog order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        Ok(scored
            .into_iter()
            .take(query.items)
            .map(|(_, p)| p.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn finds_vacuums_best_match_first() {
        let catalog = StaticCatalog::demo();
        let products = catalog.search(&SearchQuery::new("robot vacuum")).await.unwrap();

        assert_eq!(products.len(), 2);
        assert_eq!(products[0].title, "Roborock S8 Robot Vacuum");
        assert_eq!(products[1].title, "Dyson V15 Detect Stick Vacuum");
    }

    #[tokio::test]
    async fn no_match_is_empty() {
        let catalog = StaticCatalog::demo();
        let products = catalog.search(&SearchQuery::new("kayak")).await.unwrap();
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn filter_restricts_category() {
        let catalog = StaticCatalog::demo();
        let query = SearchQuery {
            filter: Some("smart home".into()),
            ..SearchQuery::new("smart")
        };
        let products = catalog.search(&query).await.unwrap();
        assert!(!products.is_empty());
        assert!(products.iter().all(|p| p.category == "Smart Home"));
    }

    #[tokio::test]
    async fn items_limits_results() {
        let catalog = StaticCatalog::demo();
        let query = SearchQuery {
            items: 1,
            ..SearchQuery::new("smart")
        };
        assert_eq!(catalog.search(&query).await.unwrap().len(), 1);
    }
}
