use std::sync::OnceLock;

use moneyleaks_core::Row;
use regex::Regex;

pub const KEY_DATE: &str = "Date";
pub const KEY_DESCRIPTION: &str = "Description";
pub const KEY_AMOUNT: &str = "Amount";
pub const KEY_BALANCE: &str = "Balance";
pub const KEY_DIRECTION: &str = "Credit/Debit";

/// Used when a transaction line carries nothing between its date and amount.
pub const PLACEHOLDER_DESCRIPTION: &str = "UNKNOWN TRANSACTION";

const MIN_TOKENS: usize = 5;
const DATE_TOKENS: usize = 3;

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_row_date,
    r"(?i)^\d{2} (jan|feb|mar|apr|may|jun|jul|aug|sep|oct|nov|dec), \d{4}$");

// ── Public extraction API ─────────────────────────────────────────────────────

/// Recover transaction rows from text already pulled out of a PDF statement.
///
/// Expects one transaction per line, shaped like
/// `01 Oct, 2025 <narration...> <amount> <balance>`. Anything else (page
/// headers, disclaimers, wrapped narration) is dropped.
pub fn extract_rows(text: &str) -> Vec<Row> {
    let mut rows = Vec::new();
    let mut skipped = 0usize;

    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse_line(line) {
            Some(row) => rows.push(row),
            None => skipped += 1,
        }
    }

    tracing::debug!(rows = rows.len(), skipped, "extracted pdf text rows");
    rows
}

fn parse_line(line: &str) -> Option<Row> {
    if is_boilerplate(line) {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        return None;
    }

    let date = tokens[..DATE_TOKENS].join(" ");
    if !re_row_date().is_match(&date) {
        return None;
    }

    // Numeric-looking tokens after the date: the last is the running
    // balance, the one before it the transaction amount.
    let numeric: Vec<usize> = (DATE_TOKENS..tokens.len())
        .filter(|&i| tokens[i].chars().any(|c| c.is_ascii_digit()))
        .collect();
    let &[.., amount_idx, balance_idx] = numeric.as_slice() else {
        return None;
    };

    let description = match tokens[DATE_TOKENS..amount_idx].join(" ") {
        d if d.is_empty() => PLACEHOLDER_DESCRIPTION.to_string(),
        d => d,
    };
    let amount = tokens[amount_idx];
    let direction = if amount.contains('-') { "Debit" } else { "Credit" };

    let mut row = Row::new();
    row.insert(KEY_DATE, date);
    row.insert(KEY_DESCRIPTION, description);
    row.insert(KEY_AMOUNT, amount);
    row.insert(KEY_BALANCE, tokens[balance_idx]);
    row.insert(KEY_DIRECTION, direction);
    Some(row)
}

/// Column headers, page furniture and balance carry-forward lines.
fn is_boilerplate(line: &str) -> bool {
    let lower = line.to_lowercase();
    lower.starts_with("date")
        || lower.contains("transaction details")
        || lower.contains("cheque/reference")
        || lower.contains("opening balance")
        || lower.contains("closing balance")
        || (lower.contains("debit") && lower.contains("credit") && lower.contains("balance"))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
