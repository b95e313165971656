use chrono::NaiveDate;
use moneyleaks_core::{Money, Row, Transaction, TransactionType};
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;

// ── Alias tables ──────────────────────────────────────────────────────────────
//
// Header vocabularies differ per bank. Each logical field resolves to the first
// alias present in the row with a non-blank value. Matching ignores case and
// surrounding whitespace.

pub const DATE_ALIASES: &[&str] = &[
    "Date",
    "Transaction Date",
    "Txn Date",
    "Tran Date",
    "Value Date",
    "Posting Date",
];

pub const DESCRIPTION_ALIASES: &[&str] = &[
    "Description",
    "Transaction Details",
    "Narration",
    "Details",
    "Particulars",
    "Remarks",
    "Transaction Remarks",
];

pub const AMOUNT_ALIASES: &[&str] = &[
    "Amount",
    "Transaction Amount",
    "Amount (INR)",
    "Withdrawal Amt.",
    "Withdrawal Amount",
    "Debit",
    "Debit Amount",
    "Deposit Amt.",
    "Deposit Amount",
    "Credit",
    "Credit Amount",
];

pub const TYPE_ALIASES: &[&str] = &[
    "Credit/Debit",
    "Cr/Dr",
    "Dr/Cr",
    "Type",
    "Transaction Type",
    "Txn Type",
];

const DESCRIPTION_POSITION: usize = 1;
const AMOUNT_POSITION: usize = 2;

/// Why a row could not become a transaction. Rejected rows are dropped from
/// the batch, never fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("Row has no amount column")]
    MissingAmount,
    #[error("Amount is not a number: '{0}'")]
    InvalidAmount(String),
    #[error("Amount is zero")]
    ZeroAmount,
}

/// Per-run inputs that do not come from the row itself.
#[derive(Debug, Clone)]
pub struct MapContext {
    /// Stands in for rows that carry no date column.
    pub processing_date: String,
}

impl MapContext {
    pub fn new(processing_date: NaiveDate) -> Self {
        Self {
            processing_date: processing_date.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn today() -> Self {
        Self::new(chrono::Local::now().date_naive())
    }
}

#[derive(Debug, Clone, Default)]
pub struct MapOutcome {
    pub transactions: Vec<Transaction>,
    pub rejected: usize,
}

/// First alias with a non-blank value in `row`.
pub fn resolve<'a>(row: &'a Row, aliases: &[&str]) -> Option<&'a str> {
    aliases
        .iter()
        .filter_map(|alias| row.get_ignore_case(alias))
        .map(str::trim)
        .find(|v| !v.is_empty())
}

/// Keep digits, `.` and `-`, then parse what is left.
pub fn clean_amount(raw: &str) -> Result<Decimal, Rejection> {
    let cleaned: String = raw
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();
    let value =
        Decimal::from_str(&cleaned).map_err(|_| Rejection::InvalidAmount(raw.to_string()))?;
    if value.is_zero() {
        return Err(Rejection::ZeroAmount);
    }
    Ok(value)
}

/// Direction from an explicit type column, else from the amount's sign.
///
/// A negative amount is read as CREDIT, matching the statements this was
/// built against.
fn resolve_type(row: &Row, amount: Decimal) -> TransactionType {
    match resolve(row, TYPE_ALIASES) {
        Some(indicator) => {
            let ind = indicator.to_lowercase();
            if ind.contains("credit") || ind.contains("cr") {
                TransactionType::Credit
            } else {
                TransactionType::Debit
            }
        }
        None if amount.is_sign_negative() => TransactionType::Credit,
        None => TransactionType::Debit,
    }
}

pub fn map_row(row: Row, ctx: &MapContext) -> Result<Transaction, Rejection> {
    let raw_amount = resolve(&row, AMOUNT_ALIASES)
        .or_else(|| row.value_at(AMOUNT_POSITION))
        .ok_or(Rejection::MissingAmount)?;
    let value = clean_amount(raw_amount)?;
    let amount = Money::from_decimal(value);
    if amount.is_zero() {
        return Err(Rejection::ZeroAmount);
    }

    let tx_type = resolve_type(&row, value);
    let description = resolve(&row, DESCRIPTION_ALIASES)
        .or_else(|| row.value_at(DESCRIPTION_POSITION))
        .unwrap_or_default()
        .trim()
        .to_string();
    let date = resolve(&row, DATE_ALIASES)
        .unwrap_or(&ctx.processing_date)
        .to_string();

    Ok(Transaction::new(date, description, amount, tx_type, row))
}

/// Map every row, dropping and counting the ones that are rejected.
pub fn map_rows(rows: impl IntoIterator<Item = Row>, ctx: &MapContext) -> MapOutcome {
    let mut outcome = MapOutcome::default();
    for row in rows {
        match map_row(row, ctx) {
            Ok(tx) => outcome.transactions.push(tx),
            Err(reason) => {
                tracing::debug!(%reason, "row rejected");
                outcome.rejected += 1;
            }
        }
    }
    outcome
}
