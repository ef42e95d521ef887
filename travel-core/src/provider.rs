use crate::{
    Attraction, Config, RateTable, WeatherView,
    error::{ErrorKind, ProviderError},
    provider::{
        exchangerate::ExchangeRateClient,
        foursquare::{FoursquarePhotoClient, FoursquarePlacesClient},
        openweather::OpenWeatherClient,
    },
};
use anyhow::Context;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::{convert::TryFrom, fmt::Debug, sync::Arc, time::Duration};

pub mod exchangerate;
pub mod foursquare;
pub mod openweather;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProviderId {
    OpenWeather,
    Foursquare,
    ExchangeRate,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenWeather => "openweather",
            ProviderId::Foursquare => "foursquare",
            ProviderId::ExchangeRate => "exchangerate",
        }
    }

    pub const fn all() -> &'static [ProviderId] {
        &[ProviderId::OpenWeather, ProviderId::Foursquare, ProviderId::ExchangeRate]
    }

    /// Environment variable that overrides the configured key.
    pub fn env_var(&self) -> String {
        format!("TRAVEL_{}_API_KEY", self.as_str().to_uppercase())
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ProviderId {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let lower = value.to_lowercase();

        match lower.as_str() {
            "openweather" => Ok(ProviderId::OpenWeather),
            "foursquare" => Ok(ProviderId::Foursquare),
            "exchangerate" => Ok(ProviderId::ExchangeRate),
            _ => Err(anyhow::anyhow!(
                "Unknown provider '{value}'. Supported providers: openweather, foursquare, exchangerate."
            )),
        }
    }
}

/// Uniform contract for one external data source.
///
/// Implementations never panic and never hang: every transport, status and
/// decoding problem comes back as a [`ProviderError`].
#[async_trait]
pub trait ProviderClient: Send + Sync + Debug {
    type Input: ?Sized + Sync;
    type Output: Send;

    fn id(&self) -> ProviderId;

    async fn fetch(&self, input: &Self::Input) -> Result<Self::Output, ProviderError>;
}

pub type WeatherClient = Arc<dyn ProviderClient<Input = str, Output = WeatherView>>;
pub type PlacesClient = Arc<dyn ProviderClient<Input = str, Output = Vec<Attraction>>>;
/// Looks up a display URL for a place id; `None` when the place has no photo.
pub type PhotoClient = Arc<dyn ProviderClient<Input = str, Output = Option<String>>>;
/// Fetches a rate table for a base currency code.
pub type RatesClient = Arc<dyn ProviderClient<Input = str, Output = RateTable>>;

/// The set of adapters one search fans out to.
#[derive(Debug, Clone)]
pub struct Providers {
    pub weather: WeatherClient,
    pub places: PlacesClient,
    pub photos: PhotoClient,
    pub rates: RatesClient,
    pub base_currency: String,
}

impl Providers {
    /// Build HTTP adapters for every provider. Missing keys are not an error
    /// here; the affected section fails with `NotConfigured` at fetch time.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let http = http_client(config.timeout())?;

        let weather = OpenWeatherClient::new(
            config.resolve_api_key(ProviderId::OpenWeather),
            config.base_url(ProviderId::OpenWeather),
            http.clone(),
        );
        let foursquare_key = config.resolve_api_key(ProviderId::Foursquare);
        let foursquare_url = config.base_url(ProviderId::Foursquare);
        let places = FoursquarePlacesClient::new(
            foursquare_key.clone(),
            foursquare_url.clone(),
            config.place_limit,
            http.clone(),
        );
        let photos = FoursquarePhotoClient::new(foursquare_key, foursquare_url, http.clone());
        let rates = ExchangeRateClient::new(
            config.resolve_api_key(ProviderId::ExchangeRate),
            config.base_url(ProviderId::ExchangeRate),
            http,
        );

        Ok(Self {
            weather: Arc::new(weather),
            places: Arc::new(places),
            photos: Arc::new(photos),
            rates: Arc::new(rates),
            base_currency: config.base_currency.clone(),
        })
    }
}

/// Shared client; the timeout bounds every request made through it.
pub fn http_client(timeout: Duration) -> anyhow::Result<Client> {
    Client::builder()
        .timeout(timeout)
        .user_agent(concat!("travel-core/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")
}

/// Send a request and read the whole body, mapping any failure to `Transport`.
pub(crate) async fn send(
    provider: ProviderId,
    request: RequestBuilder,
) -> Result<(StatusCode, String), ProviderError> {
    let res = request.send().await.map_err(|err| transport_error(provider, err))?;

    let status = res.status();
    let body = res.text().await.map_err(|err| transport_error(provider, err))?;

    Ok((status, body))
}

pub(crate) fn decode<T: DeserializeOwned>(provider: ProviderId, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|err| {
        ProviderError::new(
            ErrorKind::Unparseable,
            provider,
            format!("failed to parse response: {err}"),
        )
    })
}

pub(crate) fn rejected(provider: ProviderId, status: StatusCode, detail: &str) -> ProviderError {
    ProviderError::new(
        ErrorKind::ProviderRejected,
        provider,
        format!("request failed with status {status}: {}", truncate_body(detail)),
    )
}

/// Request URLs may carry API keys, so the message never includes them.
fn transport_error(provider: ProviderId, err: reqwest::Error) -> ProviderError {
    let err = err.without_url();
    let message = if err.is_timeout() {
        format!("request timed out: {err}")
    } else {
        format!("request failed: {err}")
    };
    ProviderError::new(ErrorKind::Transport, provider, message)
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    if body.chars().count() > MAX {
        format!("{}...", body.chars().take(MAX).collect::<String>())
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn provider_id_as_str_roundtrip() {
        for id in ProviderId::all() {
            let s = id.as_str();
            let parsed = ProviderId::try_from(s).expect("roundtrip should succeed");
            assert_eq!(*id, parsed);
        }
    }

    #[test]
    fn unknown_provider_error() {
        let err = ProviderId::try_from("doesnotexist").unwrap_err();
        assert!(err.to_string().contains("Unknown provider"));
    }

    #[test]
    fn env_var_names() {
        assert_eq!(ProviderId::OpenWeather.env_var(), "TRAVEL_OPENWEATHER_API_KEY");
        assert_eq!(ProviderId::ExchangeRate.env_var(), "TRAVEL_EXCHANGERATE_API_KEY");
    }

    #[test]
    fn providers_build_without_any_keys() {
        let providers = Providers::from_config(&Config::default()).expect("client builds");
        assert_eq!(providers.base_currency, "USD");
        assert_eq!(providers.weather.id(), ProviderId::OpenWeather);
        assert_eq!(providers.photos.id(), ProviderId::Foursquare);
    }

    #[test]
    fn truncate_long_body() {
        let body = "é".repeat(300);
        let out = truncate_body(&body);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }

    #[test]
    fn decode_failure_is_unparseable() {
        let err = decode::<Vec<u8>>(ProviderId::Foursquare, "not json").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Unparseable);
    }

    #[test]
    fn rejected_carries_status() {
        let err = rejected(ProviderId::OpenWeather, StatusCode::UNAUTHORIZED, "bad key");
        assert_eq!(err.kind, ErrorKind::ProviderRejected);
        assert!(err.message.contains("401"));
        assert!(err.message.contains("bad key"));
    }
}
