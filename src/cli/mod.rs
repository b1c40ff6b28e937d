pub mod convert;
pub mod rates;
pub mod session;
pub mod setup;
pub mod ui;

use crate::core::{Event, FETCH_ERROR_MESSAGE, RateSnapshot};
use crate::store::RateStore;
use anyhow::{Result, bail};

/// Runs a single refresh behind a spinner for the one-shot commands.
pub(crate) async fn fetch_once(store: &RateStore) -> Result<RateSnapshot> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let event = store.refresh().await;
    pb.finish_and_clear();

    match event {
        Some(Event::RatesLoaded(snapshot)) => Ok(snapshot),
        Some(_) => bail!(FETCH_ERROR_MESSAGE),
        None => bail!("A refresh is already in progress"),
    }
}
