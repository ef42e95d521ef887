use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ErrorKind, ProviderError, QueryError};

/// A trimmed, non-empty location string entered by the user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Query(String);

impl Query {
    pub fn parse(raw: &str) -> Result<Self, QueryError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(QueryError::Empty);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Current conditions as shown in the weather section. Celsius throughout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherView {
    pub location_name: String,
    pub description: String,
    pub temperature_c: f64,
    pub feels_like_c: f64,
    pub icon: String,
    pub observation_time: Option<DateTime<Utc>>,
}

impl WeatherView {
    pub fn icon_url(&self) -> String {
        format!("https://openweathermap.org/img/wn/{}@2x.png", self.icon)
    }
}

/// A point of interest. Identity is `id`; other fields may differ between fetches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attraction {
    pub id: String,
    pub name: String,
    pub address: String,
    pub categories: Vec<String>,
    pub coordinates: Option<Coordinates>,
    pub photo_url: Option<String>,
}

/// Snapshot of an attraction at the moment it was favorited.
///
/// Stored blobs are decoded leniently: missing fields default and unknown
/// fields are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FavoriteAttraction {
    pub id: String,
    pub name: String,
    pub address: String,
}

impl From<&Attraction> for FavoriteAttraction {
    fn from(attraction: &Attraction) -> Self {
        Self {
            id: attraction.id.clone(),
            name: attraction.name.clone(),
            address: attraction.address.clone(),
        }
    }
}

/// Exchange rates relative to `base_currency`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateTable {
    pub base_currency: String,
    pub rates: BTreeMap<String, f64>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl RateTable {
    pub fn rate(&self, code: &str) -> Option<f64> {
        self.rates.get(code).copied()
    }
}

/// Render state of one section for one search.
#[derive(Debug, Clone, PartialEq)]
pub enum SectionResult<T> {
    Loading,
    Ready(T),
    Failed(ProviderError),
}

impl<T> SectionResult<T> {
    pub fn is_loading(&self) -> bool {
        matches!(self, SectionResult::Loading)
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, SectionResult::Ready(_))
    }

    pub fn ready(&self) -> Option<&T> {
        match self {
            SectionResult::Ready(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        match self {
            SectionResult::Failed(err) => Some(err.kind),
            _ => None,
        }
    }
}

impl<T> From<Result<T, ProviderError>> for SectionResult<T> {
    fn from(result: Result<T, ProviderError>) -> Self {
        match result {
            Ok(value) => SectionResult::Ready(value),
            Err(err) => SectionResult::Failed(err),
        }
    }
}
