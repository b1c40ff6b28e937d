pub mod cli;
pub mod core;
pub mod providers;
pub mod scheduler;
pub mod store;

use anyhow::Result;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    Convert { amount: f64, from: String, to: String },
    Rates { codes: Vec<String> },
    Interactive,
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("Currency converter starting...");

    let config = match config_path {
        Some(path) => core::config::AppConfig::load_from_path(path)?,
        None => core::config::AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let provider = providers::ExchangeRateApiProvider::new(config.rate_api_base_url());
    let store = Arc::new(
        store::RateStore::new(Arc::new(provider), &config.base_currency)
            .with_timeout(config.request_timeout()),
    );
    let dark_mode = config.defaults.dark_mode;

    match command {
        AppCommand::Convert { amount, from, to } => {
            cli::convert::run(&store, amount, &from, &to, dark_mode).await
        }
        AppCommand::Rates { codes } => {
            cli::rates::run(&store, &codes, &config.flags.base_url, dark_mode).await
        }
        AppCommand::Interactive => cli::session::run(&config, store).await,
    }
}
