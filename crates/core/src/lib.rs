pub mod category;
pub mod money;
pub mod period;
pub mod row;
pub mod summary;
pub mod transaction;

pub use category::{Category, ParseCategoryError, ALL_CATEGORIES};
pub use money::Money;
pub use period::{parse_statement_date, MonthKey, ParseMonthKeyError};
pub use row::Row;
pub use summary::{zeroed_categories, Leaks, MerchantTotal, MonthlyTotals, Summary, TOP_MERCHANT_LIMIT};
pub use transaction::{Transaction, TransactionType};
