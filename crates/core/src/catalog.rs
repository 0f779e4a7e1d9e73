//! Catalog value types: products returned by search and shopper profiles.
//!
//! Both are produced by external collaborators and treated as immutable
//! values once they enter the agent.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeSet;

/// A product returned by the search tool.
///
/// Field aliases accept the product index's native column names
/// (`description_short`, `image_URL`, `title_URL`). The index sends `null`
/// for empty columns; those decode as the field's default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,

    #[serde(default, deserialize_with = "null_as_default")]
    pub price: f64,

    #[serde(default, deserialize_with = "null_as_default")]
    pub category: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subcategory: Option<String>,

    #[serde(default, alias = "description_short", deserialize_with = "null_as_default")]
    pub description: String,

    #[serde(default, alias = "image_URL", deserialize_with = "null_as_default")]
    pub image_url: String,

    #[serde(default, alias = "title_URL", deserialize_with = "null_as_default")]
    pub link_url: String,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// One past purchase in a shopper's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Purchase {
    pub name: String,
    /// List price
    pub price: f64,
    /// What the shopper actually paid
    pub actual_price: f64,
    pub purchase_date: NaiveDate,
}

/// A shopper profile used to personalize recommendations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    pub age: u8,
    pub occupation: String,
    pub interests: BTreeSet<String>,

    /// Most recent first
    #[serde(default)]
    pub purchase_history: Vec<Purchase>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub join_date: Option<NaiveDate>,
}

impl UserProfile {
    /// Names of past purchases, in history order.
    pub fn purchase_names(&self) -> Vec<&str> {
        self.purchase_history.iter().map(|p| p.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn product_accepts_index_field_names() {
        let json = r#"{
            "id": "1",
            "title": "Robot Vacuum X1",
            "category": "Home",
            "subcategory": "Vacuums",
            "price": 299.0,
            "description_short": "Self-emptying robot vacuum",
            "image_URL": "https://img.example/x1.jpg",
            "title_URL": "https://shop.example/x1"
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.title, "Robot Vacuum X1");
        assert_eq!(product.description, "Self-emptying robot vacuum");
        assert_eq!(product.image_url, "https://img.example/x1.jpg");
        assert_eq!(product.link_url, "https://shop.example/x1");
        assert_eq!(product.subcategory.as_deref(), Some("Vacuums"));
    }

    #[test]
    fn product_null_columns_decode_as_empty() {
        let json = r#"{
            "title": "Dyson V15",
            "category": null,
            "subcategory": null,
            "price": null,
            "description_short": null,
            "image_URL": null,
            "title_URL": null
        }"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.title, "Dyson V15");
        assert_eq!(product.price, 0.0);
        assert!(product.category.is_empty());
        assert!(product.subcategory.is_none());
        assert!(product.description.is_empty());
        assert!(product.image_url.is_empty());
        assert!(product.link_url.is_empty());
    }

    #[test]
    fn product_serializes_camel_case() {
        let product = Product {
            title: "Kettle".into(),
            price: 39.9,
            category: "Kitchen".into(),
            subcategory: None,
            description: "1.7 l".into(),
            image_url: "i".into(),
            link_url: "l".into(),
        };
        let json = serde_json::to_string(&product).unwrap();
        assert!(json.contains("\"imageUrl\""));
        assert!(json.contains("\"linkUrl\""));
        assert!(!json.contains("subcategory"));
    }

    #[test]
    fn profile_purchase_names_keep_order() {
        let profile = UserProfile {
            id: "u1".into(),
            name: "Kari Nordmann".into(),
            email: None,
            age: 34,
            occupation: "Teacher".into(),
            interests: ["Gaming".to_string()].into_iter().collect(),
            purchase_history: vec![
                Purchase {
                    name: "Smart Speaker".into(),
                    price: 99.99,
                    actual_price: 95.0,
                    purchase_date: NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
                },
                Purchase {
                    name: "Coffee Maker".into(),
                    price: 159.99,
                    actual_price: 160.5,
                    purchase_date: NaiveDate::from_ymd_opt(2024, 1, 3).unwrap(),
                },
            ],
            join_date: None,
        };
        assert_eq!(profile.purchase_names(), ["Smart Speaker", "Coffee Maker"]);
    }
}
