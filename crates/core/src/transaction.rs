use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::Category;
use super::money::Money;
use super::period::{parse_statement_date, MonthKey};
use super::row::Row;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TransactionType {
    Debit,
    Credit,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Debit => write!(f, "DEBIT"),
            TransactionType::Credit => write!(f, "CREDIT"),
        }
    }
}

/// A validated ledger entry.
///
/// `amount` is always a non-negative magnitude; direction lives in `tx_type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    /// Date exactly as it appeared in the statement.
    pub date: String,
    pub description: String,
    pub amount: Money,
    #[serde(rename = "type")]
    pub tx_type: TransactionType,
    pub category: Category,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant: Option<String>,
    /// The row this transaction was mapped from.
    pub row: Row,
}

impl Transaction {
    /// A fresh, not yet categorised transaction. Negative amounts are folded
    /// into their magnitude.
    pub fn new(
        date: impl Into<String>,
        description: impl Into<String>,
        amount: Money,
        tx_type: TransactionType,
        row: Row,
    ) -> Self {
        Transaction {
            date: date.into(),
            description: description.into(),
            amount: amount.abs(),
            tx_type,
            category: Category::Other,
            merchant: None,
            row,
        }
    }

    pub fn is_credit(&self) -> bool {
        self.tx_type == TransactionType::Credit
    }

    pub fn is_debit(&self) -> bool {
        self.tx_type == TransactionType::Debit
    }

    /// Calendar month of the raw date, if it can be parsed.
    pub fn month(&self) -> Option<MonthKey> {
        parse_statement_date(&self.date).map(MonthKey::from)
    }
}
