use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use crate::{
    error::{ErrorKind, ProviderError},
    model::WeatherView,
    provider::{ProviderClient, ProviderId, decode, rejected, send},
};

pub const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// Current conditions from OpenWeather, metric units.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: Option<String>, base_url: Option<String>, http: Client) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http,
        }
    }
}

#[async_trait]
impl ProviderClient for OpenWeatherClient {
    type Input = str;
    type Output = WeatherView;

    fn id(&self) -> ProviderId {
        ProviderId::OpenWeather
    }

    #[tracing::instrument(name = "openweather_current", level = "debug", skip(self))]
    async fn fetch(&self, location: &str) -> Result<WeatherView, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::not_configured(self.id()))?;

        let url = format!("{}/data/2.5/weather", self.base_url);
        let request = self
            .http
            .get(url)
            .query(&[("q", location), ("appid", api_key), ("units", "metric")]);

        let (status, body) = send(self.id(), request).await?;
        parse_current(status, &body)
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    #[serde(default)]
    name: String,
    dt: Option<i64>,
    main: OwMain,
    #[serde(default)]
    weather: Vec<OwWeather>,
}

#[derive(Debug, Deserialize)]
struct OwErrorBody {
    message: String,
}

/// Translate a raw OpenWeather response into the weather section view.
pub fn parse_current(status: StatusCode, body: &str) -> Result<WeatherView, ProviderError> {
    let provider = ProviderId::OpenWeather;

    if !status.is_success() {
        let detail = serde_json::from_str::<OwErrorBody>(body)
            .map(|e| e.message)
            .unwrap_or_else(|_| body.to_string());
        return Err(rejected(provider, status, &detail));
    }

    let parsed: OwCurrentResponse = decode(provider, body)?;

    let condition = parsed.weather.into_iter().next().ok_or_else(|| {
        ProviderError::new(ErrorKind::NoData, provider, "response contained no weather conditions")
    })?;

    Ok(WeatherView {
        location_name: parsed.name,
        description: condition.description,
        temperature_c: parsed.main.temp,
        feels_like_c: parsed.main.feels_like,
        icon: condition.icon,
        observation_time: parsed.dt.and_then(unix_to_utc),
    })
}

fn unix_to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp(ts, 0)
}
