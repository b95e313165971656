use std::collections::{BTreeMap, HashMap};

use moneyleaks_core::{
    zeroed_categories, Category, Leaks, MerchantTotal, Money, MonthKey, MonthlyTotals, Summary,
    Transaction, TOP_MERCHANT_LIMIT,
};

/// Single-pass fold of categorised, named transactions into a [`Summary`].
#[derive(Debug, Clone)]
pub struct Aggregator {
    total_income: Money,
    total_spending: Money,
    by_category: BTreeMap<Category, Money>,
    monthly: BTreeMap<MonthKey, MonthlyTotals>,
    /// Merchant totals in first-seen order.
    merchants: Vec<MerchantTotal>,
    merchant_index: HashMap<String, usize>,
    undated: usize,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            total_income: Money::zero(),
            total_spending: Money::zero(),
            by_category: zeroed_categories(),
            monthly: BTreeMap::new(),
            merchants: Vec::new(),
            merchant_index: HashMap::new(),
            undated: 0,
        }
    }

    pub fn push(&mut self, tx: &Transaction) {
        if tx.is_credit() {
            self.total_income += tx.amount;
        } else {
            self.total_spending += tx.amount;
        }

        *self.by_category.entry(tx.category).or_default() += tx.amount;

        match tx.month() {
            Some(month) => {
                let bucket = self.monthly.entry(month).or_default();
                if tx.is_credit() {
                    bucket.income += tx.amount;
                } else {
                    bucket.spending += tx.amount;
                }
            }
            None => self.undated += 1,
        }

        if tx.is_debit() && tx.category != Category::Transfer {
            if let Some(merchant) = &tx.merchant {
                match self.merchant_index.get(merchant) {
                    Some(&idx) => self.merchants[idx].amount += tx.amount,
                    None => {
                        self.merchant_index.insert(merchant.clone(), self.merchants.len());
                        self.merchants.push(MerchantTotal {
                            merchant: merchant.clone(),
                            amount: tx.amount,
                        });
                    }
                }
            }
        }
    }

    /// Transactions whose date could not be placed in a month.
    pub fn undated(&self) -> usize {
        self.undated
    }

    pub fn finish(self) -> Summary {
        if self.undated > 0 {
            tracing::debug!(undated = self.undated, "transactions left out of monthly totals");
        }

        let mut top_merchants = self.merchants;
        // Stable: equal totals keep first-seen order.
        top_merchants.sort_by(|a, b| b.amount.cmp(&a.amount));
        top_merchants.truncate(TOP_MERCHANT_LIMIT);

        Summary {
            total_income: self.total_income,
            total_spending: self.total_spending,
            net: self.total_income - self.total_spending,
            leaks: Leaks::from_categories(&self.by_category),
            by_category: self.by_category,
            monthly: self.monthly,
            top_merchants,
        }
    }
}

/// Summarise a whole transaction sequence.
pub fn summarize(transactions: &[Transaction]) -> Summary {
    let mut aggregator = Aggregator::new();
    for tx in transactions {
        aggregator.push(tx);
    }
    aggregator.finish()
}
