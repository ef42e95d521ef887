//! Stub providers and fixtures shared by the integration tests.
#![allow(dead_code)]

use std::{collections::{BTreeMap, HashMap}, fmt, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Notify;
use travel_core::{
    Attraction, Coordinates, ErrorKind, ProviderClient, ProviderError, ProviderId, Providers,
    RateTable, WeatherView,
};

type Respond<O> = Box<dyn Fn(&str) -> Result<O, ProviderError> + Send + Sync>;

/// Provider answering from a closure. Inputs registered with `gate` wait for
/// the matching `Notify` before answering.
pub struct StubClient<O> {
    id: ProviderId,
    respond: Respond<O>,
    gates: HashMap<String, Arc<Notify>>,
    calls: Mutex<Vec<String>>,
}

impl<O> fmt::Debug for StubClient<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StubClient").field("id", &self.id).finish()
    }
}

impl<O: Send + 'static> StubClient<O> {
    pub fn new(
        id: ProviderId,
        respond: impl Fn(&str) -> Result<O, ProviderError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            id,
            respond: Box::new(respond),
            gates: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn gate(mut self, input: &str, gate: Arc<Notify>) -> Self {
        self.gates.insert(input.to_string(), gate);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl<O: Send + 'static> ProviderClient for StubClient<O> {
    type Input = str;
    type Output = O;

    fn id(&self) -> ProviderId {
        self.id
    }

    async fn fetch(&self, input: &str) -> Result<O, ProviderError> {
        self.calls.lock().push(input.to_string());
        if let Some(gate) = self.gates.get(input) {
            gate.notified().await;
        }
        (self.respond)(input)
    }
}

pub fn weather_for(location: &str) -> WeatherView {
    WeatherView {
        location_name: location.to_string(),
        description: format!("clear sky over {location}"),
        temperature_c: 18.0,
        feels_like_c: 17.2,
        icon: "01d".into(),
        observation_time: None,
    }
}

pub fn place(id: &str, name: &str, coords: Option<(f64, f64)>) -> Attraction {
    Attraction {
        id: id.into(),
        name: name.into(),
        address: format!("{name} street"),
        categories: vec!["Landmark".into()],
        coordinates: coords.map(|(lat, lon)| Coordinates { lat, lon }),
        photo_url: None,
    }
}

pub fn paris_places() -> Vec<Attraction> {
    vec![
        place("p1", "Louvre", Some((48.8606, 2.3376))),
        place("p2", "Eiffel Tower", Some((48.8584, 2.2945))),
        place("p3", "Sainte-Chapelle", None),
    ]
}

pub fn rates(pairs: &[(&str, f64)]) -> RateTable {
    RateTable {
        base_currency: "USD".into(),
        rates: pairs.iter().map(|(c, r)| ((*c).to_string(), *r)).collect::<BTreeMap<_, _>>(),
        updated_at: None,
    }
}

pub fn photo_url(place_id: &str) -> String {
    format!("https://img.example/300x300/{place_id}.jpg")
}

pub fn error(kind: ErrorKind, provider: ProviderId, message: &str) -> ProviderError {
    ProviderError::new(kind, provider, message)
}

/// Stubs returning the Paris fixtures for every input.
pub struct Stubs {
    pub weather: Arc<StubClient<WeatherView>>,
    pub places: Arc<StubClient<Vec<Attraction>>>,
    pub photos: Arc<StubClient<Option<String>>>,
    pub rates: Arc<StubClient<RateTable>>,
}

impl Default for Stubs {
    fn default() -> Self {
        Self {
            weather: Arc::new(StubClient::new(ProviderId::OpenWeather, |q| Ok(weather_for(q)))),
            places: Arc::new(StubClient::new(ProviderId::Foursquare, |_| Ok(paris_places()))),
            photos: Arc::new(StubClient::new(ProviderId::Foursquare, |id| Ok(Some(photo_url(id))))),
            rates: Arc::new(StubClient::new(ProviderId::ExchangeRate, |_| {
                Ok(rates(&[("EUR", 0.9), ("GBP", 0.8)]))
            })),
        }
    }
}

impl Stubs {
    pub fn providers(&self) -> Providers {
        Providers {
            weather: self.weather.clone(),
            places: self.places.clone(),
            photos: self.photos.clone(),
            rates: self.rates.clone(),
            base_currency: "USD".into(),
        }
    }
}
