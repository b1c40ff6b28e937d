use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, instrument};

use crate::core::rates::{RateProvider, RateSnapshot, RateTable};

// ExchangeRateApiProvider implementation for RateProvider
pub struct ExchangeRateApiProvider {
    base_url: String,
}

impl ExchangeRateApiProvider {
    pub fn new(base_url: &str) -> Self {
        ExchangeRateApiProvider {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct LatestRatesResponse {
    base: Option<String>,
    time_last_updated: Option<i64>,
    rates: BTreeMap<String, f64>,
}

#[async_trait]
impl RateProvider for ExchangeRateApiProvider {
    #[instrument(name = "ExchangeRateFetch", skip(self), fields(base = %base))]
    async fn fetch_rates(&self, base: &str) -> Result<RateSnapshot> {
        let url = format!("{}/v4/latest/{}", self.base_url, base);
        debug!("Requesting exchange rates from {}", url);

        let client = reqwest::Client::builder()
            .user_agent(concat!("fxconv/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let response = client
            .get(&url)
            .send()
            .await
            .map_err(|e| anyhow!("Request error: {} for base currency: {}", e, base))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for base currency: {}",
                response.status(),
                base
            ));
        }

        let text = response.text().await?;
        let data: LatestRatesResponse = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", base, e))?;

        let table_base = data.base.unwrap_or_else(|| base.to_string());
        let table = RateTable::new(&table_base, data.rates)?;
        let last_updated = data
            .time_last_updated
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single());

        debug!(currencies = table.len(), "Received exchange rates");
        Ok(RateSnapshot {
            table,
            last_updated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Datelike;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub async fn create_mock_server(base: &str, template: ResponseTemplate) -> MockServer {
        let mock_server = MockServer::start().await;
        let request_path = format!("/v4/latest/{base}");

        Mock::given(method("GET"))
            .and(path(request_path))
            .respond_with(template)
            .mount(&mock_server)
            .await;

        mock_server
    }

    const MOCK_JSON: &str = r#"{
        "provider": "https://www.exchangerate-api.com",
        "base": "USD",
        "date": "2026-10-18",
        "time_last_updated": 1792281601,
        "rates": {
            "USD": 1,
            "EUR": 0.9,
            "JPY": 150.0
        }
    }"#;

    #[tokio::test]
    async fn test_successful_rates_fetch() {
        let mock_server =
            create_mock_server("USD", ResponseTemplate::new(200).set_body_string(MOCK_JSON)).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri());

        let snapshot = provider.fetch_rates("USD").await.unwrap();
        assert_eq!(snapshot.table.base, "USD");
        assert_eq!(snapshot.table.len(), 3);
        assert_eq!(snapshot.table.get("USD"), Some(1.0));
        assert_eq!(snapshot.table.get("EUR"), Some(0.9));
        assert_eq!(snapshot.table.get("JPY"), Some(150.0));
        assert_eq!(snapshot.last_updated.unwrap().year(), 2026);
    }

    #[tokio::test]
    async fn test_minimal_payload() {
        let mock_server = create_mock_server(
            "EUR",
            ResponseTemplate::new(200).set_body_string(r#"{"rates": {"EUR": 1, "USD": 1.1}}"#),
        )
        .await;
        let provider = ExchangeRateApiProvider::new(&format!("{}/", mock_server.uri()));

        let snapshot = provider.fetch_rates("EUR").await.unwrap();
        assert_eq!(snapshot.table.base, "EUR");
        assert_eq!(snapshot.table.get("USD"), Some(1.1));
        assert!(snapshot.last_updated.is_none());
    }

    #[tokio::test]
    async fn test_api_error_response() {
        let mock_server = create_mock_server("USD", ResponseTemplate::new(500)).await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri());

        let result = provider.fetch_rates("USD").await;
        assert!(result.is_err());
        assert_eq!(
            result.unwrap_err().to_string(),
            "HTTP error: 500 Internal Server Error for base currency: USD"
        );
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(r#"{"base": "USD", "conversion_rates": {}}"#),
        )
        .await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri());

        let result = provider.fetch_rates("USD").await;
        assert!(result.is_err());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse JSON response for USD")
        );
    }

    #[tokio::test]
    async fn test_non_positive_rate_rejected() {
        let mock_server = create_mock_server(
            "USD",
            ResponseTemplate::new(200).set_body_string(r#"{"rates": {"USD": 1, "EUR": 0}}"#),
        )
        .await;
        let provider = ExchangeRateApiProvider::new(&mock_server.uri());

        let result = provider.fetch_rates("USD").await;
        assert_eq!(result.unwrap_err().to_string(), "Invalid rate for EUR: 0");
    }

    #[tokio::test]
    async fn test_unreachable_server() {
        let provider = ExchangeRateApiProvider::new("http://127.0.0.1:1");

        let result = provider.fetch_rates("USD").await;
        assert!(
            result
                .unwrap_err()
                .to_string()
                .starts_with("Request error:")
        );
    }
}
