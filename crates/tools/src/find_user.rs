//! Shopper profile lookup.
//!
//! The `findUser` tool and the personalization path both obtain a profile
//! through a [`ProfileSource`]. The built-in source fabricates a plausible
//! shopper, since there is no customer database behind the assistant.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{NaiveDate, TimeDelta, Utc};
use rand::Rng;
use rand::seq::IndexedRandom;
use shopassist_core::catalog::{Purchase, UserProfile};
use shopassist_core::error::ToolError;
use shopassist_core::tool::{Tool, ToolResult};

/// Supplies the profile of the current shopper.
#[async_trait]
pub trait ProfileSource: Send + Sync {
    async fn find_user(&self) -> Result<UserProfile, ToolError>;
}

const INTERESTS: &[&str] = &[
    "Photography",
    "Gaming",
    "Home Automation",
    "Cooking",
    "Smart Devices",
    "Home Theater",
    "Music Production",
    "Remote Work",
    "Smart Home",
    "Virtual Reality",
    "Streaming",
    "DIY Electronics",
    "Home Office",
    "Smart Kitchen",
    "Home Entertainment",
];

const OCCUPATIONS: &[&str] = &[
    "Software Engineer",
    "Teacher",
    "Marketing Manager",
    "Doctor",
    "Graphic Designer",
    "Business Analyst",
    "Chef",
    "Architect",
    "Sales Representative",
    "Financial Advisor",
    "Project Manager",
    "Content Creator",
    "Small Business Owner",
    "Consultant",
];

const ELECTRONICS: &[(&str, f64)] = &[
    ("4K Smart TV", 899.99),
    ("Robot Vacuum", 299.99),
    ("Smart Speaker", 99.99),
    ("Coffee Maker", 159.99),
    ("Gaming Console", 499.99),
    ("Microwave Oven", 199.99),
    ("Air Purifier", 249.99),
    ("Security Camera", 179.99),
    ("Smart Thermostat", 149.99),
    ("Dishwasher", 699.99),
];

const FIRST_NAMES: &[&str] = &[
    "Emma", "Noah", "Olivia", "Liam", "Sofie", "Jakob", "Nora", "Lucas", "Ingrid", "Elias",
    "Maja", "Oskar",
];

const LAST_NAMES: &[&str] = &[
    "Hansen", "Johansen", "Olsen", "Larsen", "Andersen", "Pedersen", "Nilsen", "Berg", "Haugen",
    "Dahl",
];

/// Generates a random but plausible shopper on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct FakeProfileGenerator;

impl FakeProfileGenerator {
    /// Build a profile dated relative to `today`.
    ///
    /// Ages fall in 23..=75, two to five interests are sampled without
    /// repetition, and one to five purchases go back in time from `today`,
    /// each strictly older than the previous one.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, today: NaiveDate) -> UserProfile {
        let first = FIRST_NAMES.choose(rng).copied().unwrap_or("Alex");
        let last = LAST_NAMES.choose(rng).copied().unwrap_or("Berg");
        let name = format!("{first} {last}");
        let email = format!(
            "{}.{}{}@example.com",
            first.to_lowercase(),
            last.to_lowercase(),
            rng.random_range(1..100)
        );

        let interest_count = rng.random_range(2..=5);
        let interests: BTreeSet<String> = INTERESTS
            .choose_multiple(rng, interest_count)
            .map(|s| s.to_string())
            .collect();

        let mut purchase_history = Vec::new();
        let mut last_date = today;
        for _ in 0..rng.random_range(1..=5) {
            let Some((product, list_price)) = ELECTRONICS.choose(rng).copied() else {
                break;
            };
            let variation: f64 = rng.random_range(-0.1..=0.1);
            let actual_price = (list_price * (1.0 + variation) * 100.0).round() / 100.0;
            last_date = last_date - TimeDelta::days(rng.random_range(1..=365));

            purchase_history.push(Purchase {
                name: product.to_string(),
                price: list_price,
                actual_price,
                purchase_date: last_date,
            });
        }

        UserProfile {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            email: Some(email),
            age: rng.random_range(23..=75),
            occupation: OCCUPATIONS.choose(rng).copied().unwrap_or("Consultant").to_string(),
            interests,
            purchase_history,
            join_date: Some(today - TimeDelta::days(rng.random_range(1..=1095))),
        }
    }
}

#[async_trait]
impl ProfileSource for FakeProfileGenerator {
    async fn find_user(&self) -> Result<UserProfile, ToolError> {
        let today = Utc::now().date_naive();
        Ok(Self::generate(&mut rand::rng(), today))
    }
}

/// The `findUser` tool exposed to the model.
pub struct FindUserTool {
    source: Arc<dyn ProfileSource>,
}

impl FindUserTool {
    pub fn new(source: Arc<dyn ProfileSource>) -> Self {
        Self { source }
    }
}

#[async_trait]
impl Tool for FindUserTool {
    fn name(&self) -> &str {
        "findUser"
    }

    fn description(&self) -> &str {
        "Looks up the current shopper's profile with purchase history and interests, \
         used to personalize product recommendations."
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let profile = self.source.find_user().await?;
        let data = serde_json::to_value(&profile).map_err(|e| ToolError::ExecutionFailed {
            tool_name: "findUser".into(),
            reason: e.to_string(),
        })?;

        Ok(ToolResult {
            call_id: String::new(),
            success: true,
            output: data.to_string(),
        })
    }
}
