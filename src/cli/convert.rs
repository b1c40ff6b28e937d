use super::ui::{self, StyleType, Theme};
use crate::core::convert::format_amount;
use crate::core::{ConverterState, Event, reduce};
use crate::store::RateStore;
use anyhow::{Result, bail};

/// Performs one conversion against freshly fetched rates.
pub async fn convert_once(
    store: &RateStore,
    amount: f64,
    from: &str,
    to: &str,
) -> Result<ConverterState> {
    let snapshot = super::fetch_once(store).await?;
    let state = reduce(
        ConverterState::new(amount, from, to, false),
        Event::RatesLoaded(snapshot),
    );

    for code in [&state.source, &state.target] {
        if !state.rates.contains(code) {
            bail!("Unknown currency: {}", code);
        }
    }
    Ok(state)
}

/// `<amount> <FROM> = <result> <TO>`
pub fn format_conversion(state: &ConverterState) -> String {
    format!(
        "{} {} = {} {}",
        state.amount,
        state.source,
        format_amount(state.result),
        state.target
    )
}

pub async fn run(store: &RateStore, amount: f64, from: &str, to: &str, dark_mode: bool) -> Result<()> {
    let theme = Theme::from_dark_mode(dark_mode);
    match convert_once(store, amount, from, to).await {
        Ok(state) => {
            println!("{}", ui::style_text(&format_conversion(&state), StyleType::Result, theme));
            Ok(())
        }
        Err(e) => {
            eprintln!("{}", ui::style_text(&e.to_string(), StyleType::Error, theme));
            Err(e)
        }
    }
}
