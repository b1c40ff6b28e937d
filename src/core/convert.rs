//! Pure conversion math and display helpers.

use crate::core::rates::RateTable;

/// Converts `amount` of `from` into `to`, rounded to cents.
///
/// Returns `None` when either currency is missing from the table. The amount
/// itself is not validated: negative amounts give negative results and NaN
/// propagates.
pub fn convert(rates: &RateTable, amount: f64, from: &str, to: &str) -> Option<f64> {
    let from_rate = rates.get(from)?;
    let to_rate = rates.get(to)?;
    Some(round_to_cents((amount / from_rate) * to_rate))
}

pub fn round_to_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub fn format_amount(value: f64) -> String {
    format!("{value:.2}")
}

/// Flag icon for a currency, keyed on the first two letters of its code.
///
/// This is not a real currency to country mapping: `EUR` yields `eu` and
/// `XOF` yields `xo`.
pub fn flag_url(cdn_base_url: &str, currency: &str) -> String {
    let code: String = currency.chars().take(2).collect::<String>().to_lowercase();
    format!("{}/w40/{}.png", cdn_base_url.trim_end_matches('/'), code)
}
