use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::category::{Category, ALL_CATEGORIES};
use super::money::Money;
use super::period::MonthKey;

/// Maximum number of entries in `Summary::top_merchants`.
pub const TOP_MERCHANT_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlyTotals {
    pub income: Money,
    pub spending: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MerchantTotal {
    pub merchant: String,
    pub amount: Money,
}

/// The three leak categories, copied out of `by_category`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Leaks {
    pub bank_fees: Money,
    pub subscriptions: Money,
    pub food_delivery: Money,
}

impl Leaks {
    pub fn from_categories(by_category: &BTreeMap<Category, Money>) -> Self {
        let mut leaks = Leaks::default();
        for (&category, &amount) in by_category.iter().filter(|(c, _)| c.is_leak()) {
            let slot = match category {
                Category::BankFees => &mut leaks.bank_fees,
                Category::Subscription => &mut leaks.subscriptions,
                Category::FoodDelivery => &mut leaks.food_delivery,
                _ => continue,
            };
            *slot = amount;
        }
        leaks
    }

    pub fn total(&self) -> Money {
        self.bank_fees + self.subscriptions + self.food_delivery
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_income: Money,
    pub total_spending: Money,
    pub net: Money,
    pub by_category: BTreeMap<Category, Money>,
    pub leaks: Leaks,
    #[serde(default)]
    pub monthly: BTreeMap<MonthKey, MonthlyTotals>,
    #[serde(default)]
    pub top_merchants: Vec<MerchantTotal>,
}

/// A category map with every category present at zero.
pub fn zeroed_categories() -> BTreeMap<Category, Money> {
    ALL_CATEGORIES.iter().map(|&c| (c, Money::zero())).collect()
}

impl Default for Summary {
    fn default() -> Self {
        Summary {
            total_income: Money::zero(),
            total_spending: Money::zero(),
            net: Money::zero(),
            by_category: zeroed_categories(),
            leaks: Leaks::default(),
            monthly: BTreeMap::new(),
            top_merchants: Vec::new(),
        }
    }
}
