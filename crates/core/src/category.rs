use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// The closed set of labels a transaction can carry.
///
/// Declaration order is the order categories appear in summaries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Income,
    Rent,
    Groceries,
    FoodDelivery,
    Shopping,
    Transport,
    Utilities,
    Subscription,
    BankFees,
    Transfer,
    #[default]
    Other,
}

pub const ALL_CATEGORIES: [Category; 11] = [
    Category::Income,
    Category::Rent,
    Category::Groceries,
    Category::FoodDelivery,
    Category::Shopping,
    Category::Transport,
    Category::Utilities,
    Category::Subscription,
    Category::BankFees,
    Category::Transfer,
    Category::Other,
];

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Income => "INCOME",
            Category::Rent => "RENT",
            Category::Groceries => "GROCERIES",
            Category::FoodDelivery => "FOOD_DELIVERY",
            Category::Shopping => "SHOPPING",
            Category::Transport => "TRANSPORT",
            Category::Utilities => "UTILITIES",
            Category::Subscription => "SUBSCRIPTION",
            Category::BankFees => "BANK_FEES",
            Category::Transfer => "TRANSFER",
            Category::Other => "OTHER",
        }
    }

    /// Bank fees, subscriptions and food delivery: spend that is easy to cut.
    pub fn is_leak(self) -> bool {
        matches!(
            self,
            Category::BankFees | Category::Subscription | Category::FoodDelivery
        )
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown category: '{0}'")]
pub struct ParseCategoryError(pub String);

impl std::str::FromStr for Category {
    type Err = ParseCategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace([' ', '-'], "_");
        ALL_CATEGORIES
            .iter()
            .copied()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| ParseCategoryError(s.to_string()))
    }
}
