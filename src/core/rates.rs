//! Exchange rate abstractions and core types

use anyhow::{Result, bail};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::warn;

/// Rates for every known currency, each expressed as units of that currency
/// per one unit of `base`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RateTable {
    pub base: String,
    pub rates: BTreeMap<String, f64>,
}

impl RateTable {
    /// Builds a table, rejecting empty mappings and non-positive or non-finite rates.
    ///
    /// The base currency's own rate is expected to be 1 but is not enforced.
    /// Conversions divide by the source rate, so they stay consistent with
    /// whatever the provider sent. A mismatch is only logged and the table is
    /// kept exactly as received.
    pub fn new(base: &str, rates: BTreeMap<String, f64>) -> Result<Self> {
        if rates.is_empty() {
            bail!("Rate table for {} is empty", base);
        }
        if let Some((code, rate)) = rates.iter().find(|(_, r)| !r.is_finite() || **r <= 0.0) {
            bail!("Invalid rate for {}: {}", code, rate);
        }
        if let Some(own) = rates.get(base) {
            if *own != 1.0 {
                warn!(base, rate = own, "Base currency rate is not 1");
            }
        }
        Ok(Self {
            base: base.to_string(),
            rates,
        })
    }

    pub fn get(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }

    pub fn contains(&self, code: &str) -> bool {
        self.rates.contains_key(code)
    }

    /// Currency codes in sorted order, as offered to the currency selectors.
    pub fn currencies(&self) -> impl Iterator<Item = &str> {
        self.rates.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }
}

/// A successfully fetched table along with the provider's own timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct RateSnapshot {
    pub table: RateTable,
    pub last_updated: Option<DateTime<Utc>>,
}

#[async_trait]
pub trait RateProvider: Send + Sync {
    async fn fetch_rates(&self, base: &str) -> Result<RateSnapshot>;
}
