use std::sync::OnceLock;

use moneyleaks_core::Transaction;
use regex::Regex;

/// Longest counterparty name kept, in characters.
pub const MAX_NAME_CHARS: usize = 60;

/// Rail prefixes stripped from free-form narrations, matched case-insensitively.
const NOISY_PREFIXES: &[&str] = &[
    "upi/",
    "upi-",
    "imps/",
    "imps-",
    "neft/",
    "neft-",
    "rtgs/",
    "rtgs-",
    "by transfer",
    "to transfer",
    "trf to",
    "transfer to",
];

/// Payment-app boilerplate; everything from the marker onwards is dropped.
const TRAILING_MARKERS: &[&str] = &[
    "sent using paytm",
    "sent using payt",
    "sent using gpay",
    "sent from paytm",
    "upi payment",
];

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// PREFIX/NAME/REFERENCE[/NOTE...]
re!(re_slash_narration, r"^\s*([A-Za-z][A-Za-z ]{0,15})/([^/]+)/[^/]*");

// ── Public API ────────────────────────────────────────────────────────────────

/// Pull a readable counterparty name out of a payment narration.
///
/// Slash-structured narrations (`UPI/NAME/REF/NOTE`) yield their second
/// field. Anything else gets a best-effort cleanup. Returns `None` when no
/// letters survive.
pub fn normalize_counterparty(description: &str) -> Option<String> {
    let description = description.trim();
    if description.is_empty() {
        return None;
    }

    let candidate = match re_slash_narration().captures(description) {
        Some(caps) => caps.get(2).map_or("", |m| m.as_str()).to_string(),
        None => free_form_candidate(description),
    };

    finish(&candidate)
}

/// Set `merchant` from the description.
pub fn name_counterparty(mut tx: Transaction) -> Transaction {
    tx.merchant = normalize_counterparty(&tx.description);
    tx
}

// ── Cleanup ───────────────────────────────────────────────────────────────────

fn free_form_candidate(description: &str) -> String {
    let mut desc = description.to_string();

    let lower = desc.to_ascii_lowercase();
    if let Some(prefix) = NOISY_PREFIXES.iter().find(|p| lower.starts_with(*p)) {
        desc = desc[prefix.len()..].trim().to_string();
    }

    // NAME/number/extra keeps NAME.
    if let Some((head, _)) = desc.split_once('/') {
        if !head.trim().is_empty() {
            desc = head.trim().to_string();
        }
    }

    let lower = desc.to_ascii_lowercase();
    if let Some(idx) = TRAILING_MARKERS.iter().filter_map(|m| lower.find(m)).min() {
        desc.truncate(idx);
    }

    // NAME-REF123 keeps NAME; hyphenated names like D-MART survive.
    if let Some((left, right)) = desc.split_once('-') {
        if !left.trim().is_empty() && right.chars().any(|c| c.is_ascii_digit()) {
            desc = left.trim().to_string();
        }
    }

    desc
}

/// Drop reference-number fragments, collapse whitespace and cap the length.
fn finish(candidate: &str) -> Option<String> {
    let name = candidate
        .split_whitespace()
        .filter(|token| !is_reference_fragment(token))
        .collect::<Vec<_>>()
        .join(" ");

    if !name.chars().any(char::is_alphabetic) {
        return None;
    }
    Some(name.chars().take(MAX_NAME_CHARS).collect::<String>().trim_end().to_string())
}

fn is_reference_fragment(token: &str) -> bool {
    let digits = token.chars().filter(char::is_ascii_digit).count();
    let letters = token.chars().filter(|c| c.is_alphabetic()).count();
    digits > 0 && (letters == 0 || digits >= 3)
}
