//! Foursquare Places v3: place search near a location and first-photo lookup.

use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url, header::AUTHORIZATION};
use serde::Deserialize;

use crate::{
    error::{ErrorKind, ProviderError},
    model::{Attraction, Coordinates},
    provider::{ProviderClient, ProviderId, decode, rejected, send},
};

pub const DEFAULT_BASE_URL: &str = "https://api.foursquare.com";
pub const DEFAULT_PLACE_LIMIT: u32 = 10;
/// Size segment spliced between photo prefix and suffix.
pub const PHOTO_SIZE: &str = "300x300";

#[derive(Debug, Clone)]
pub struct FoursquarePlacesClient {
    api_key: Option<String>,
    base_url: String,
    limit: u32,
    http: Client,
}

impl FoursquarePlacesClient {
    pub fn new(api_key: Option<String>, base_url: Option<String>, limit: u32, http: Client) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            limit,
            http,
        }
    }
}

#[async_trait]
impl ProviderClient for FoursquarePlacesClient {
    type Input = str;
    type Output = Vec<Attraction>;

    fn id(&self) -> ProviderId {
        ProviderId::Foursquare
    }

    #[tracing::instrument(name = "foursquare_search", level = "debug", skip(self))]
    async fn fetch(&self, near: &str) -> Result<Vec<Attraction>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::not_configured(self.id()))?;

        let url = format!("{}/v3/places/search", self.base_url);
        let request = self
            .http
            .get(url)
            .header(AUTHORIZATION, api_key)
            .query(&[("near", near), ("limit", &self.limit.to_string())]);

        let (status, body) = send(self.id(), request).await?;
        parse_places(status, &body)
    }
}

#[derive(Debug, Clone)]
pub struct FoursquarePhotoClient {
    api_key: Option<String>,
    base_url: String,
    http: Client,
}

impl FoursquarePhotoClient {
    pub fn new(api_key: Option<String>, base_url: Option<String>, http: Client) -> Self {
        Self {
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            http,
        }
    }
}

#[async_trait]
impl ProviderClient for FoursquarePhotoClient {
    type Input = str;
    type Output = Option<String>;

    fn id(&self) -> ProviderId {
        ProviderId::Foursquare
    }

    #[tracing::instrument(name = "foursquare_photo", level = "debug", skip(self))]
    async fn fetch(&self, place_id: &str) -> Result<Option<String>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::not_configured(self.id()))?;

        let url = photos_url(&self.base_url, place_id)?;
        let request = self
            .http
            .get(url)
            .header(AUTHORIZATION, api_key)
            .query(&[("limit", "1")]);

        let (status, body) = send(self.id(), request).await?;
        parse_photos(status, &body)
    }
}

/// `{base}/v3/places/{id}/photos` with the id encoded as a single path segment.
pub fn photos_url(base_url: &str, place_id: &str) -> Result<Url, ProviderError> {
    let invalid = || {
        ProviderError::new(
            ErrorKind::Transport,
            ProviderId::Foursquare,
            format!("invalid base URL: {base_url}"),
        )
    };
    let mut url = Url::parse(base_url).map_err(|_| invalid())?;
    url.path_segments_mut()
        .map_err(|_| invalid())?
        .pop_if_empty()
        .extend(["v3", "places", place_id, "photos"]);
    Ok(url)
}

#[derive(Debug, Deserialize)]
struct FsqSearchResponse {
    #[serde(default)]
    results: Vec<FsqPlace>,
}

#[derive(Debug, Deserialize)]
struct FsqPlace {
    fsq_id: String,
    name: String,
    #[serde(default)]
    location: FsqLocation,
    #[serde(default)]
    categories: Vec<FsqCategory>,
    #[serde(default)]
    geocodes: Option<FsqGeocodes>,
}

#[derive(Debug, Default, Deserialize)]
struct FsqLocation {
    formatted_address: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FsqCategory {
    name: String,
}

#[derive(Debug, Deserialize)]
struct FsqGeocodes {
    main: Option<FsqPoint>,
}

#[derive(Debug, Deserialize)]
struct FsqPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct FsqPhoto {
    prefix: String,
    suffix: String,
}

#[derive(Debug, Deserialize)]
struct FsqErrorBody {
    message: String,
}

fn error_detail(body: &str) -> String {
    serde_json::from_str::<FsqErrorBody>(body)
        .map(|e| e.message)
        .unwrap_or_else(|_| body.to_string())
}

/// Translate a place search response. Photos are attached later.
pub fn parse_places(status: StatusCode, body: &str) -> Result<Vec<Attraction>, ProviderError> {
    let provider = ProviderId::Foursquare;

    if !status.is_success() {
        return Err(rejected(provider, status, &error_detail(body)));
    }

    let parsed: FsqSearchResponse = decode(provider, body)?;

    Ok(parsed
        .results
        .into_iter()
        .map(|place| Attraction {
            id: place.fsq_id,
            name: place.name,
            address: place
                .location
                .formatted_address
                .unwrap_or_else(|| "Address not available".to_string()),
            categories: place.categories.into_iter().map(|c| c.name).collect(),
            coordinates: place
                .geocodes
                .and_then(|g| g.main)
                .map(|p| Coordinates { lat: p.latitude, lon: p.longitude }),
            photo_url: None,
        })
        .collect())
}

/// Translate a photo lookup. An empty list is a successful "no photo".
pub fn parse_photos(status: StatusCode, body: &str) -> Result<Option<String>, ProviderError> {
    let provider = ProviderId::Foursquare;

    if !status.is_success() {
        return Err(rejected(provider, status, &error_detail(body)));
    }

    let photos: Vec<FsqPhoto> = decode(provider, body)?;

    Ok(photos
        .into_iter()
        .next()
        .map(|p| format!("{}{}{}", p.prefix, PHOTO_SIZE, p.suffix)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEARCH: &str = r#"{
        "results": [
            {
                "fsq_id": "4adcda10f964a520af3521e3",
                "name": "Musée du Louvre",
                "location": {"formatted_address": "Rue de Rivoli, 75001 Paris"},
                "categories": [{"id": 10027, "name": "Art Museum"}],
                "geocodes": {"main": {"latitude": 48.8606, "longitude": 2.3376}}
            },
            {
                "fsq_id": "b2",
                "name": "Somewhere",
                "location": {}
            }
        ]
    }"#;

    #[test]
    fn parses_places() {
        let places = parse_places(StatusCode::OK, SEARCH).expect("valid payload");

        assert_eq!(places.len(), 2);
        assert_eq!(places[0].id, "4adcda10f964a520af3521e3");
        assert_eq!(places[0].address, "Rue de Rivoli, 75001 Paris");
        assert_eq!(places[0].categories, vec!["Art Museum".to_string()]);
        assert_eq!(places[0].coordinates, Some(Coordinates { lat: 48.8606, lon: 2.3376 }));
        assert!(places[0].photo_url.is_none());

        assert_eq!(places[1].address, "Address not available");
        assert!(places[1].coordinates.is_none());
    }

    #[test]
    fn empty_results_is_ready_empty() {
        let places = parse_places(StatusCode::OK, r#"{"results":[]}"#).expect("valid payload");
        assert!(places.is_empty());
    }

    #[test]
    fn unauthorized_is_rejected() {
        let err = parse_places(StatusCode::UNAUTHORIZED, r#"{"message":"Invalid request token."}"#)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProviderRejected);
        assert!(err.message.contains("Invalid request token."));
    }

    #[test]
    fn photo_url_is_composed_from_prefix_size_suffix() {
        let body = r#"[{"id":"p1","prefix":"https://fastly.4sqi.net/img/general/","suffix":"/abc.jpg"}]"#;
        let url = parse_photos(StatusCode::OK, body).expect("valid payload");
        assert_eq!(url.as_deref(), Some("https://fastly.4sqi.net/img/general/300x300/abc.jpg"));
    }

    #[test]
    fn no_photos_is_success_none() {
        assert_eq!(parse_photos(StatusCode::OK, "[]").expect("valid payload"), None);
    }

    #[test]
    fn photo_rate_limit_is_an_error() {
        let err = parse_photos(StatusCode::TOO_MANY_REQUESTS, "slow down").unwrap_err();
        assert_eq!(err.kind, ErrorKind::ProviderRejected);
    }

    #[test]
    fn photos_url_encodes_place_id_as_one_segment() {
        let url = photos_url("https://api.example", "a/b?limit=50#x").expect("valid base");
        assert_eq!(url.path(), "/v3/places/a%2Fb%3Flimit=50%23x/photos");
        assert_eq!(url.query(), None);

        let url = photos_url("https://api.example/", "4b0587").expect("valid base");
        assert_eq!(url.as_str(), "https://api.example/v3/places/4b0587/photos");
    }

    #[test]
    fn photos_url_rejects_unusable_base() {
        let err = photos_url("not a url", "p1").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Transport);
    }
}
