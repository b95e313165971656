use std::path::Path;
use std::sync::OnceLock;

use moneyleaks_core::{Category, Transaction};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub match_type: MatchType,
    pub category: Category,
    /// Higher runs first; equal priorities keep their listed order.
    #[serde(default)]
    pub priority: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    #[default]
    Contains,
    Exact,
    Regex,
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse rules TOML: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Rule '{name}' has an invalid regex: {source}")]
    InvalidRegex {
        name: String,
        #[source]
        source: regex::Error,
    },
}

// ── Built-in rule table ───────────────────────────────────────────────────────
//
// Evaluated top to bottom after the CREDIT short-circuit; the first match
// wins, so the order here is part of the behaviour.

const BUILTIN_RULES: &[(&str, Category, &str)] = &[
    (
        "subscriptions",
        Category::Subscription,
        r"netflix|spotify|youtube premium|hotstar|prime|zee5|sonyliv|subscription|renewal",
    ),
    (
        "food delivery",
        Category::FoodDelivery,
        r"swiggy|zomato|blinkit|instamart|eats|foodpanda|dominos|pizza hut",
    ),
    ("rent", Category::Rent, r"\brent"),
    (
        "groceries",
        Category::Groceries,
        r"big bazaar|bigbazaar|d-mart|dmart|grofers|grocery|groceries|more supermarket|reliance fresh",
    ),
    (
        "shopping",
        Category::Shopping,
        r"amazon|flipkart|myntra|ajio|nykaa|meesho|croma|reliance digital",
    ),
    (
        "transport",
        Category::Transport,
        r"uber|\bola\b|olacabs|rapido|metro|\bbus\b|\bauto\b|\bcab\b|irctc|petrol|fuel",
    ),
    (
        "utilities",
        Category::Utilities,
        r"electricity|water bill|gas bill|mobile bill|postpaid|prepaid|wifi|broadband|\bjio\b|airtel|\bvi\b",
    ),
    (
        "bank fees",
        Category::BankFees,
        r"\bcharges?\b|\bfees?\b|\bpenalty\b|\bfine\b|\binterest\b|\bchg\b",
    ),
    (
        "transfers",
        Category::Transfer,
        r"\bneft\b|\brtgs\b|\bimps\b|\bupi\b|transfer|to account|from account",
    ),
];

fn builtin_rules() -> Vec<CategoryRule> {
    BUILTIN_RULES
        .iter()
        .map(|&(name, category, pattern)| CategoryRule {
            name: name.to_string(),
            pattern: pattern.to_string(),
            match_type: MatchType::Regex,
            category,
            priority: 0,
        })
        .collect()
}

/// Internal pairing of a rule with its precompiled regex (if applicable).
struct CompiledRule {
    rule: CategoryRule,
    compiled_regex: Option<regex::Regex>,
    lowered_pattern: String,
}

/// Ordered, first-match-wins categoriser.
pub struct CategoryRuleEngine {
    rules: Vec<CompiledRule>,
}

#[derive(Deserialize)]
struct RuleFile {
    #[serde(default)]
    rules: Vec<CategoryRule>,
}

impl CategoryRuleEngine {
    /// An engine over `rules` alone. Regex rules match case-insensitively.
    pub fn new(rules: Vec<CategoryRule>) -> Result<Self, RuleError> {
        let mut compiled = rules
            .into_iter()
            .map(|rule| {
                let compiled_regex = match rule.match_type {
                    MatchType::Regex => Some(
                        regex::RegexBuilder::new(&rule.pattern)
                            .case_insensitive(true)
                            .build()
                            .map_err(|source| RuleError::InvalidRegex {
                                name: rule.name.clone(),
                                source,
                            })?,
                    ),
                    _ => None,
                };
                let lowered_pattern = rule.pattern.to_lowercase();
                Ok(CompiledRule { rule, compiled_regex, lowered_pattern })
            })
            .collect::<Result<Vec<_>, RuleError>>()?;
        // Highest priority first; sort_by is stable so ties keep their order.
        compiled.sort_by(|a, b| b.rule.priority.cmp(&a.rule.priority));
        Ok(Self { rules: compiled })
    }

    /// The built-in table.
    pub fn builtin() -> Self {
        Self::new(builtin_rules()).expect("built-in rules compile")
    }

    /// Custom rules ahead of the built-in table.
    pub fn with_custom_rules(custom: Vec<CategoryRule>) -> Result<Self, RuleError> {
        let builtin_floor = custom.iter().map(|r| r.priority).min().unwrap_or(0).min(0);
        let mut rules = custom;
        rules.extend(builtin_rules().into_iter().map(|mut r| {
            r.priority = builtin_floor;
            r
        }));
        Self::new(rules)
    }

    /// Parse a `[[rules]]` TOML document and put its rules ahead of the
    /// built-in table.
    pub fn from_toml(toml_content: &str) -> Result<Self, RuleError> {
        let file: RuleFile = toml::from_str(toml_content)?;
        Self::with_custom_rules(file.rules)
    }

    pub fn from_toml_file(path: &Path) -> Result<Self, RuleError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn find_matching_rule(&self, description: &str) -> Option<&CategoryRule> {
        let lowered = description.to_lowercase();
        self.rules
            .iter()
            .find(|cr| rule_matches(cr, description, &lowered))
            .map(|cr| &cr.rule)
    }

    /// Category for a single transaction. CREDIT is always INCOME.
    pub fn classify(&self, tx: &Transaction) -> Category {
        if tx.is_credit() {
            return Category::Income;
        }
        self.find_matching_rule(&tx.description)
            .map(|r| r.category)
            .unwrap_or(Category::Other)
    }

    pub fn categorize(&self, mut tx: Transaction) -> Transaction {
        tx.category = self.classify(&tx);
        tx
    }
}

impl Default for CategoryRuleEngine {
    fn default() -> Self {
        Self::builtin()
    }
}

fn rule_matches(cr: &CompiledRule, original: &str, lowered: &str) -> bool {
    match &cr.rule.match_type {
        MatchType::Contains => lowered.contains(&cr.lowered_pattern),
        MatchType::Exact => lowered.trim() == cr.lowered_pattern,
        MatchType::Regex => cr
            .compiled_regex
            .as_ref()
            .is_some_and(|re| re.is_match(original)),
    }
}

/// Categorise with the built-in table.
pub fn categorize(tx: Transaction) -> Transaction {
    static ENGINE: OnceLock<CategoryRuleEngine> = OnceLock::new();
    ENGINE.get_or_init(CategoryRuleEngine::builtin).categorize(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use moneyleaks_core::{Money, Row, TransactionType};

    fn debit(desc: &str) -> Transaction {
        Transaction::new("01-10-2025", desc, Money::from(100), TransactionType::Debit, Row::new())
    }

    fn credit(desc: &str) -> Transaction {
        Transaction::new("01-10-2025", desc, Money::from(100), TransactionType::Credit, Row::new())
    }

    fn category_of(desc: &str) -> Category {
        categorize(debit(desc)).category
    }

    fn make_rule(pattern: &str, match_type: MatchType, category: Category, priority: i32) -> CategoryRule {
        CategoryRule {
            name: "test".to_string(),
            pattern: pattern.to_string(),
            match_type,
            category,
            priority,
        }
    }

    // ── built-in table ────────────────────────────────────────────────────────

    #[test]
    fn credit_is_always_income() {
        assert_eq!(categorize(credit("SWIGGY REFUND")).category, Category::Income);
        assert_eq!(categorize(credit("NETFLIX")).category, Category::Income);
        assert_eq!(categorize(credit("UPI/FRIEND/123/split")).category, Category::Income);
    }

    #[test]
    fn each_builtin_category_is_reachable() {
        assert_eq!(category_of("NETFLIX.COM"), Category::Subscription);
        assert_eq!(category_of("SWIGGY ORDER"), Category::FoodDelivery);
        assert_eq!(category_of("HOUSE RENT OCT"), Category::Rent);
        assert_eq!(category_of("DMART AVENUE"), Category::Groceries);
        assert_eq!(category_of("AMAZON PAY INDIA"), Category::Shopping);
        assert_eq!(category_of("UBER TRIP"), Category::Transport);
        assert_eq!(category_of("TATA POWER ELECTRICITY"), Category::Utilities);
        assert_eq!(category_of("ATM WDL CHARGES"), Category::BankFees);
        assert_eq!(category_of("NEFT TO SELF"), Category::Transfer);
        assert_eq!(category_of("CHAI POINT"), Category::Other);
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(category_of("swiggy"), Category::FoodDelivery);
        assert_eq!(category_of("Zomato Ltd"), Category::FoodDelivery);
    }

    #[test]
    fn order_breaks_ties() {
        // Subscription runs before shopping.
        assert_eq!(category_of("AMAZON PRIME MEMBERSHIP"), Category::Subscription);
        // Food delivery runs before transfers.
        assert_eq!(category_of("UPI/SWIGGY/123/order"), Category::FoodDelivery);
        // Utilities run before bank fees.
        assert_eq!(category_of("AIRTEL POSTPAID LATE FEE"), Category::Utilities);
    }

    #[test]
    fn rent_needs_word_start() {
        assert_eq!(category_of("RENT PAYMENT"), Category::Rent);
        assert_eq!(category_of("CURRENT ACCOUNT CHARGES"), Category::BankFees);
        assert_eq!(category_of("PARENT UPI/MOM/1/x"), Category::Transfer);
    }

    #[test]
    fn short_keywords_need_word_boundaries() {
        assert_eq!(category_of("OLA CABS"), Category::Transport);
        assert_eq!(category_of("COCA COLA"), Category::Other);
        assert_eq!(category_of("COFFEE HOUSE"), Category::Other);
    }

    #[test]
    fn upi_narration_without_keywords_is_transfer() {
        assert_eq!(
            category_of("UPI/DEVRAJ VERMA/29xxxx/Sent using Paytm UPI-527431570952"),
            Category::Transfer
        );
    }

    // ── engine ────────────────────────────────────────────────────────────────

    #[test]
    fn contains_match_case_insensitive() {
        let engine = CategoryRuleEngine::new(vec![make_rule(
            "chai point",
            MatchType::Contains,
            Category::FoodDelivery,
            0,
        )])
        .unwrap();
        assert!(engine.find_matching_rule("CHAI POINT HSR").is_some());
        assert!(engine.find_matching_rule("STARBUCKS").is_none());
    }

    #[test]
    fn exact_match() {
        let engine =
            CategoryRuleEngine::new(vec![make_rule("gym", MatchType::Exact, Category::Other, 0)])
                .unwrap();
        assert!(engine.find_matching_rule("GYM").is_some());
        assert!(engine.find_matching_rule("GYM MEMBERSHIP").is_none());
    }

    #[test]
    fn priority_ordering_highest_wins() {
        let engine = CategoryRuleEngine::new(vec![
            make_rule("amazon", MatchType::Contains, Category::Shopping, 1),
            make_rule("amazon", MatchType::Contains, Category::Subscription, 10),
        ])
        .unwrap();
        let rule = engine.find_matching_rule("AMAZON").unwrap();
        assert_eq!(rule.category, Category::Subscription);
    }

    #[test]
    fn equal_priority_keeps_listed_order() {
        let engine = CategoryRuleEngine::new(vec![
            make_rule("x", MatchType::Contains, Category::Rent, 0),
            make_rule("x", MatchType::Contains, Category::Shopping, 0),
        ])
        .unwrap();
        assert_eq!(engine.find_matching_rule("x").unwrap().category, Category::Rent);
    }

    #[test]
    fn invalid_regex_is_an_error() {
        let result = CategoryRuleEngine::new(vec![make_rule("(", MatchType::Regex, Category::Other, 0)]);
        assert!(matches!(result, Err(RuleError::InvalidRegex { .. })));
    }

    #[test]
    fn custom_rules_run_before_builtin_and_never_beat_credit() {
        let toml = r#"
            [[rules]]
            name = "gym"
            pattern = "cult.fit"
            match_type = "contains"
            category = "SUBSCRIPTION"

            [[rules]]
            name = "landlord"
            pattern = "^UPI/RAMESH"
            match_type = "regex"
            category = "RENT"
        "#;
        let engine = CategoryRuleEngine::from_toml(toml).unwrap();
        assert_eq!(engine.len(), 2 + BUILTIN_RULES.len());
        assert_eq!(engine.classify(&debit("CULT.FIT BLR")), Category::Subscription);
        assert_eq!(engine.classify(&debit("UPI/RAMESH K/998/rent oct")), Category::Rent);
        assert_eq!(engine.classify(&debit("UPI/SURESH/998/misc")), Category::Transfer);
        assert_eq!(engine.classify(&credit("CULT.FIT REFUND")), Category::Income);
    }

    #[test]
    fn negative_priority_custom_rule_still_precedes_builtin() {
        let engine = CategoryRuleEngine::with_custom_rules(vec![make_rule(
            "upi/",
            MatchType::Contains,
            Category::Other,
            -5,
        )])
        .unwrap();
        assert_eq!(engine.classify(&debit("UPI/A/1/x")), Category::Other);
    }

    #[test]
    fn from_toml_file_reads_rules() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rules.toml");
        std::fs::write(
            &path,
            "[[rules]]\nname = \"tea\"\npattern = \"chai\"\ncategory = \"FOOD_DELIVERY\"\n",
        )
        .unwrap();
        let engine = CategoryRuleEngine::from_toml_file(&path).unwrap();
        assert_eq!(engine.classify(&debit("CHAI POINT")), Category::FoodDelivery);
    }

    #[test]
    fn bad_toml_is_an_error() {
        assert!(matches!(
            CategoryRuleEngine::from_toml("[[rules]]\nname = 1"),
            Err(RuleError::Toml(_))
        ));
    }
}
