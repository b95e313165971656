use moneyleaks_core::{Money, Summary};
use rust_decimal::Decimal;

/// Rule-based budgeting advice built from summary numbers only.
///
/// Used on its own when no hosted model is configured, and as the fallback
/// when the hosted call fails.
pub fn local_advice(summary: &Summary) -> String {
    let leaks = &summary.leaks;
    let mut lines: Vec<String> = Vec::new();

    lines.push("Here's a quick summary of your situation based on the numbers I see.".to_string());
    lines.push(format!(
        "Your total income for this period is about {}, and you spent around {}, leaving you with a net of {}.",
        rupees(summary.total_income.as_decimal()),
        rupees(summary.total_spending.as_decimal()),
        rupees(summary.net.as_decimal()),
    ));

    if let Some(trend) = spending_trend(summary) {
        lines.push(trend);
    }

    let leak_details: Vec<String> = [
        ("bank fees", leaks.bank_fees),
        ("subscriptions", leaks.subscriptions),
        ("food delivery", leaks.food_delivery),
    ]
    .into_iter()
    .filter(|(_, amount)| is_positive(*amount))
    .map(|(label, amount)| format!("{label} ({})", rupees(amount.as_decimal())))
    .collect();

    if !leak_details.is_empty() {
        lines.push(format!(
            "The easiest places to cut back without hurting your basic lifestyle are: {}.",
            leak_details.join(", ")
        ));
    }

    // topMerchants is sorted, so the first entry is the largest.
    if let Some(worst) = summary.top_merchants.first() {
        lines.push(format!(
            "You are also spending quite a bit at {} ({} in this period). Check if all those payments were actually necessary.",
            worst.merchant,
            rupees(worst.amount.as_decimal()),
        ));
    }

    let leak_total = leaks.total();
    if is_positive(leak_total) {
        let half = leak_total.as_decimal() / Decimal::TWO;
        lines.push(format!(
            "If you reduce these leak categories by even 50%, you could free up roughly {} per month, or about {} per year.",
            rupees(half),
            rupees(half * Decimal::from(12)),
        ));
    }

    lines.push("Here are a few practical next steps:".to_string());
    if is_positive(leaks.bank_fees) {
        lines.push("- Talk to your bank about charges and see if you can switch to a low-fee account or avoid penalty situations.".to_string());
    }
    if is_positive(leaks.subscriptions) {
        lines.push("- Review all your subscriptions and cancel the ones you rarely use or can share with family.".to_string());
    }
    if is_positive(leaks.food_delivery) {
        lines.push("- Limit food delivery orders and replace a few of them each week with home-cooked or office meals.".to_string());
    }
    lines.push("- Decide a simple monthly spending limit and check this dashboard once a month to ensure you are on track.".to_string());

    lines.join("\n")
}

/// First month against last month, with a ±10% stable band.
fn spending_trend(summary: &Summary) -> Option<String> {
    if summary.monthly.len() < 2 {
        return None;
    }
    let first = summary.monthly.values().next()?.spending.as_decimal();
    let last = summary.monthly.values().next_back()?.spending.as_decimal();

    let upper = first * Decimal::new(11, 1);
    let lower = first * Decimal::new(9, 1);
    let line = if last > upper {
        format!(
            "Your monthly spending has gone up from ~{} to ~{}.",
            rupees(first),
            rupees(last)
        )
    } else if last < lower {
        format!(
            "Your monthly spending has come down from ~{} to ~{}.",
            rupees(first),
            rupees(last)
        )
    } else {
        "Your monthly spending is roughly stable.".to_string()
    };
    Some(line)
}

/// Prompt sent to the hosted model: the coaching brief plus a compact
/// plain-text rendering of the summary.
pub fn build_prompt(summary: &Summary) -> String {
    let leaks = &summary.leaks;
    let mut context = vec![
        format!("Total income this period: {}", summary.total_income.as_decimal()),
        format!("Total spending this period: {}", summary.total_spending.as_decimal()),
        format!("Net balance (income - spending): {}", summary.net.as_decimal()),
        "Leaks:".to_string(),
        format!("  - Bank fees: {}", leaks.bank_fees.as_decimal()),
        format!("  - Subscriptions: {}", leaks.subscriptions.as_decimal()),
        format!("  - Food delivery: {}", leaks.food_delivery.as_decimal()),
    ];

    if !summary.top_merchants.is_empty() {
        context.push("Top merchants (you spent the most at):".to_string());
        context.extend(
            summary
                .top_merchants
                .iter()
                .take(PROMPT_MERCHANTS)
                .map(|m| format!("  - {}: {}", m.merchant, m.amount.as_decimal())),
        );
    }

    if !summary.monthly.is_empty() {
        context.push("Monthly spending trend (YYYY-MM -> spending):".to_string());
        context.extend(
            summary
                .monthly
                .iter()
                .map(|(month, totals)| format!("  - {month}: {}", totals.spending.as_decimal())),
        );
    }

    format!(
        "{COACH_BRIEF}\n\nHere is the data:\n\n{}\n\nNow give your advice:",
        context.join("\n")
    )
}

const PROMPT_MERCHANTS: usize = 5;

const COACH_BRIEF: &str = "\
You are a friendly personal finance coach for an Indian user.

You will be given a summary of their bank/UPI/card transactions for a few months.
Based on this data, explain:

1) Where they are overspending (categories or merchants).
2) 3-5 specific, realistic actions they can take next month to save more.
3) Roughly how much they could save per month and per year by applying those actions
   (just approximate numbers; use the leaks and major categories).

Important rules:
- DO NOT give investment advice or recommend specific financial products.
- Focus only on spending control, budgeting habits, and lifestyle changes.
- Be encouraging, non-judgmental, and practical.
- Keep the answer under 200-250 words.
- Write in simple, conversational English.";

fn is_positive(amount: Money) -> bool {
    amount > Money::zero()
}

fn rupees(amount: Decimal) -> String {
    format!("₹{}", amount.round_dp(0))
}
