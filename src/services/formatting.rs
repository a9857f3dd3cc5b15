use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

const PESO_SIGN: char = '₱';
pub const MISSING: &str = "—";

/// `₱1,234,567.50`. Rounds half away from zero to centavos.
pub fn format_peso(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let negative = rounded.is_sign_negative() && !rounded.is_zero();
    let text = format!("{:.2}", rounded.abs());
    let (whole, cents) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (index, digit) in whole.chars().enumerate() {
        if index > 0 && (whole.len() - index) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if negative { "-" } else { "" };
    format!("{sign}{PESO_SIGN}{grouped}.{cents}")
}

/// `Jan 5, 2025`, or an em dash when the date is unknown.
pub fn format_display_date(date: Option<NaiveDate>) -> String {
    date.map(|value| value.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|| MISSING.to_string())
}

pub fn format_nights(nights: i64) -> String {
    match nights {
        1 => "1 night".to_string(),
        other => format!("{other} nights"),
    }
}
