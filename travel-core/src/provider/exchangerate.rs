use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    error::{ErrorKind, ProviderError},
    model::RateTable,
    provider::{ProviderClient, ProviderId, decode, rejected, send},
};

pub const DEFAULT_BASE_URL: &str = "https://v6.exchangerate-api.com";
pub const DEFAULT_BASE_CURRENCY: &str = "USD";

/// Latest rates from ExchangeRate-API v6. The key is part of the path.
#[derive(Debug, Clone)]
pub struct ExchangeRateClient {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl ExchangeRateClient {
    pub fn new(api_key: Option<String>, base_url: Option<String>, http: Client) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http,
        }
    }
}

#[async_trait]
impl ProviderClient for ExchangeRateClient {
    type Input = str;
    type Output = RateTable;

    fn id(&self) -> ProviderId {
        ProviderId::ExchangeRate
    }

    #[tracing::instrument(name = "exchangerate_latest", level = "debug", skip(self))]
    async fn fetch(&self, base_currency: &str) -> Result<RateTable, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::not_configured(self.id()))?;

        let url = format!("{}/v6/{}/latest/{}", self.base_url, api_key, base_currency);
        let (status, body) = send(self.id(), self.http.get(url)).await?;
        parse_latest(status, &body, base_currency)
    }
}

#[derive(Debug, Deserialize)]
struct ErLatestResponse {
    result: String,
    #[serde(rename = "error-type")]
    error_type: Option<String>,
    base_code: Option<String>,
    time_last_update_unix: Option<i64>,
    #[serde(default)]
    conversion_rates: BTreeMap<String, f64>,
}

/// Translate a `latest` response. The provider reports failures in the body
/// (`result: "error"`), sometimes with a success status.
pub fn parse_latest(status: StatusCode, body: &str, requested_base: &str) -> Result<RateTable, ProviderError> {
    let provider = ProviderId::ExchangeRate;

    let parsed: ErLatestResponse = match decode(provider, body) {
        Ok(parsed) => parsed,
        Err(_) if !status.is_success() => return Err(rejected(provider, status, body)),
        Err(err) => return Err(err),
    };

    if parsed.result != "success" {
        let error_type = parsed.error_type.unwrap_or_else(|| "unknown-error".to_string());
        return Err(ProviderError::new(ErrorKind::ProviderRejected, provider, error_type));
    }

    if !status.is_success() {
        return Err(rejected(provider, status, body));
    }

    let rates: BTreeMap<String, f64> = parsed
        .conversion_rates
        .into_iter()
        .filter(|(_, rate)| rate.is_finite() && *rate > 0.0)
        .collect();

    if rates.is_empty() {
        return Err(ProviderError::new(ErrorKind::NoData, provider, "response contained no rates"));
    }

    Ok(RateTable {
        base_currency: parsed.base_code.unwrap_or_else(|| requested_base.to_string()),
        rates,
        updated_at: parsed.time_last_update_unix.and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
    })
}
