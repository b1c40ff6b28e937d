//! Converter state snapshot and its pure transition function.
//!
//! Every user action and every refresh outcome is an [`Event`]. [`reduce`]
//! maps the current snapshot and one event to the next snapshot, deriving
//! the displayed result along the way.

use crate::core::convert::convert;
use crate::core::rates::{RateSnapshot, RateTable};
use chrono::{DateTime, Utc};

pub const FETCH_ERROR_MESSAGE: &str = "Failed to fetch exchange rates. Try again later.";

#[derive(Debug, Clone, PartialEq)]
pub struct ConverterState {
    pub rates: RateTable,
    pub last_updated: Option<DateTime<Utc>>,
    pub amount: f64,
    pub source: String,
    pub target: String,
    pub result: f64,
    pub error: Option<String>,
    pub dark_mode: bool,
}

impl Default for ConverterState {
    fn default() -> Self {
        Self::new(1.0, "USD", "EUR", false)
    }
}

impl ConverterState {
    pub fn new(amount: f64, source: &str, target: &str, dark_mode: bool) -> Self {
        Self {
            rates: RateTable::default(),
            last_updated: None,
            amount,
            source: source.to_uppercase(),
            target: target.to_uppercase(),
            result: 0.0,
            error: None,
            dark_mode,
        }
    }

    /// Whether both selected currencies have a known rate.
    pub fn has_rates_for_selection(&self) -> bool {
        self.rates.contains(&self.source) && self.rates.contains(&self.target)
    }

    fn converted(&self) -> Option<f64> {
        convert(&self.rates, self.amount, &self.source, &self.target)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    SetAmount(f64),
    SetSource(String),
    SetTarget(String),
    Swap,
    RatesLoaded(RateSnapshot),
    RatesFailed,
    ToggleTheme,
}

pub fn reduce(state: ConverterState, event: Event) -> ConverterState {
    match event {
        Event::SetAmount(amount) => recompute_on_input(ConverterState { amount, ..state }),
        Event::SetSource(code) => recompute_on_input(ConverterState {
            source: code.to_uppercase(),
            ..state
        }),
        Event::SetTarget(code) => recompute_on_input(ConverterState {
            target: code.to_uppercase(),
            ..state
        }),
        Event::Swap => {
            let ConverterState { source, target, .. } = &state;
            let (source, target) = (target.clone(), source.clone());
            recompute_on_input(ConverterState {
                source,
                target,
                ..state
            })
        }
        Event::RatesLoaded(snapshot) => {
            let next = ConverterState {
                rates: snapshot.table,
                last_updated: snapshot.last_updated,
                error: None,
                ..state
            };
            // A fresh table recomputes regardless of the amount.
            match next.converted() {
                Some(result) => ConverterState { result, ..next },
                None => next,
            }
        }
        Event::RatesFailed => ConverterState {
            error: Some(FETCH_ERROR_MESSAGE.to_string()),
            ..state
        },
        Event::ToggleTheme => ConverterState {
            dark_mode: !state.dark_mode,
            ..state
        },
    }
}

/// Input changes only recompute for a positive amount; otherwise the last
/// result stays on screen.
fn recompute_on_input(state: ConverterState) -> ConverterState {
    if state.amount > 0.0 {
        if let Some(result) = state.converted() {
            return ConverterState { result, ..state };
        }
    }
    state
}
