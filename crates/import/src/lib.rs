pub mod delimited;
pub mod mapper;
pub mod merchant;
pub mod pdf_text;
pub mod rules;

pub use delimited::{DelimitedError, DelimitedOptions};
pub use mapper::{map_row, map_rows, MapContext, MapOutcome, Rejection};
pub use merchant::{name_counterparty, normalize_counterparty};
pub use rules::{categorize, CategoryRule, CategoryRuleEngine, MatchType, RuleError};
