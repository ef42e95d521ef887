//! Search fan-out/fan-in and the per-section view state of the current search.
//!
//! # Responsibility
//! - Fetch weather, attractions and currency concurrently for one query.
//! - Apply each branch's result to its own section as soon as it settles.
//! - Drive the map and currency recalculation from the settled sections.
//!
//! # Invariants
//! - Every section goes `Loading` → `Ready`/`Failed` exactly once per search.
//! - A failed branch never blocks or alters the others.
//! - Results tagged with a superseded search token are discarded.
//! - Everything runs on the caller's task; nothing is spawned.

use futures::{
    FutureExt, StreamExt,
    future::{LocalBoxFuture, join_all},
    stream::FuturesUnordered,
};

use crate::{
    currency::{Conversion, CurrencyRecalculator},
    error::{ProviderError, QueryError},
    map::{MapController, MapView},
    model::{Attraction, Query, RateTable, SectionResult, WeatherView},
    provider::Providers,
};

/// Identifies one search. Tokens increase monotonically per session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    token: u64,
    query: Query,
}

impl SearchTicket {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn query(&self) -> &Query {
        &self.query
    }
}

/// The settled result of one branch of a search.
#[derive(Debug, Clone)]
pub enum SectionUpdate {
    Weather(Result<WeatherView, ProviderError>),
    Attractions(Result<Vec<Attraction>, ProviderError>),
    Currency(Result<RateTable, ProviderError>),
}

/// Render state of every section. Before the first search `query` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchView {
    pub query: Option<Query>,
    pub weather: SectionResult<WeatherView>,
    pub attractions: SectionResult<Vec<Attraction>>,
    pub map: SectionResult<MapView>,
    pub currency: SectionResult<RateTable>,
}

impl SearchView {
    fn loading(query: Option<Query>) -> Self {
        Self {
            query,
            weather: SectionResult::Loading,
            attractions: SectionResult::Loading,
            map: SectionResult::Loading,
            currency: SectionResult::Loading,
        }
    }

    /// True once weather, attractions and currency have all settled.
    pub fn is_settled(&self) -> bool {
        !self.weather.is_loading() && !self.attractions.is_loading() && !self.currency.is_loading()
    }
}

/// Issues the provider calls for one query. Holds no per-search state.
#[derive(Debug, Clone)]
pub struct Aggregator {
    providers: Providers,
}

impl Aggregator {
    pub fn new(providers: Providers) -> Self {
        Self { providers }
    }

    pub async fn fetch_weather(&self, query: &Query) -> Result<WeatherView, ProviderError> {
        self.providers.weather.fetch(query.as_str()).await
    }

    /// Place search, then one concurrent photo lookup per place. A failed
    /// lookup leaves that place without a photo.
    pub async fn fetch_attractions(&self, query: &Query) -> Result<Vec<Attraction>, ProviderError> {
        let mut places = self.providers.places.fetch(query.as_str()).await?;

        // Unbounded: the place search already caps the result count.
        let photos = join_all(places.iter().map(|place| self.photo_for(&place.id))).await;

        for (place, photo) in places.iter_mut().zip(photos) {
            place.photo_url = photo;
        }

        tracing::debug!(query = %query, count = places.len(), "attractions resolved");
        Ok(places)
    }

    async fn photo_for(&self, place_id: &str) -> Option<String> {
        match self.providers.photos.fetch(place_id).await {
            Ok(url) => url,
            Err(err) => {
                tracing::warn!(place_id, error = %err, "photo lookup failed");
                None
            }
        }
    }

    pub async fn fetch_currency(&self) -> Result<RateTable, ProviderError> {
        self.providers.rates.fetch(&self.providers.base_currency).await
    }

    /// The three independent branches of a search, yielded as each settles.
    pub fn updates<'a>(&'a self, query: &'a Query) -> FuturesUnordered<LocalBoxFuture<'a, SectionUpdate>> {
        let pending: FuturesUnordered<LocalBoxFuture<'a, SectionUpdate>> = FuturesUnordered::new();
        pending.push(async move { SectionUpdate::Weather(self.fetch_weather(query).await) }.boxed_local());
        pending.push(async move { SectionUpdate::Attractions(self.fetch_attractions(query).await) }.boxed_local());
        pending.push(async move { SectionUpdate::Currency(self.fetch_currency().await) }.boxed_local());
        pending
    }
}

/// Mutable state of the current search: section views, the live map and the
/// displayed rate table.
#[derive(Debug)]
pub struct SearchSession {
    current: u64,
    view: SearchView,
    map: MapController,
    currency: CurrencyRecalculator,
}

impl SearchSession {
    pub fn new(map: MapController) -> Self {
        Self {
            current: 0,
            view: SearchView::loading(None),
            map,
            currency: CurrencyRecalculator::new(),
        }
    }

    /// Start a search: supersede any in-flight one and set every section to
    /// `Loading`. Blank queries are rejected and leave the view untouched.
    pub fn begin(&mut self, raw_query: &str) -> Result<SearchTicket, QueryError> {
        let query = Query::parse(raw_query)?;

        self.current += 1;
        self.currency.clear();
        self.view = SearchView::loading(Some(query.clone()));

        tracing::info!(query = %query, token = self.current, "search started");
        Ok(SearchTicket { token: self.current, query })
    }

    pub fn is_current(&self, ticket: &SearchTicket) -> bool {
        ticket.token == self.current
    }

    /// Apply one settled branch. Returns `false` when the update was
    /// discarded because its search was superseded or the section already
    /// settled.
    pub fn apply(&mut self, ticket: &SearchTicket, update: SectionUpdate) -> bool {
        if !self.is_current(ticket) {
            tracing::debug!(
                stale = ticket.token,
                current = self.current,
                query = %ticket.query,
                "discarding result of superseded search"
            );
            return false;
        }

        match update {
            SectionUpdate::Weather(result) => {
                if !self.view.weather.is_loading() {
                    return false;
                }
                log_failure("weather", &result);
                self.view.weather = result.into();
            }
            SectionUpdate::Attractions(result) => {
                if !self.view.attractions.is_loading() {
                    return false;
                }
                log_failure("attractions", &result);
                match result {
                    Ok(attractions) => {
                        self.view.map = SectionResult::Ready(self.map.render(&attractions));
                        self.view.attractions = SectionResult::Ready(attractions);
                    }
                    Err(err) => {
                        self.map.teardown();
                        self.view.map = SectionResult::Ready(MapView::Unavailable);
                        self.view.attractions = SectionResult::Failed(err);
                    }
                }
            }
            SectionUpdate::Currency(result) => {
                if !self.view.currency.is_loading() {
                    return false;
                }
                log_failure("currency", &result);
                if let Ok(table) = &result {
                    self.currency.set_table(table.clone());
                }
                self.view.currency = result.into();
            }
        }
        true
    }

    pub fn view(&self) -> &SearchView {
        &self.view
    }

    pub fn conversions(&self) -> &[Conversion] {
        self.currency.conversions()
    }

    pub fn amount(&self) -> f64 {
        self.currency.amount()
    }

    /// Recompute conversions for a new amount without refetching.
    pub fn on_amount_change(&mut self, input: &str) -> &[Conversion] {
        self.currency.on_amount_change(input)
    }
}

fn log_failure<T>(section: &str, result: &Result<T, ProviderError>) {
    if let Err(err) = result {
        tracing::warn!(section, kind = ?err.kind, error = %err, "section failed");
    }
}

/// One search session wired to its providers.
#[derive(Debug)]
pub struct Orchestrator {
    aggregator: Aggregator,
    session: SearchSession,
}

impl Orchestrator {
    pub fn new(providers: Providers, map: MapController) -> Self {
        Self {
            aggregator: Aggregator::new(providers),
            session: SearchSession::new(map),
        }
    }

    /// Run a full search and return the settled view.
    pub async fn run_search(&mut self, raw_query: &str) -> Result<&SearchView, QueryError> {
        let ticket = self.session.begin(raw_query)?;

        let mut pending = self.aggregator.updates(ticket.query());
        while let Some(update) = pending.next().await {
            self.session.apply(&ticket, update);
        }

        Ok(self.session.view())
    }

    pub fn session(&self) -> &SearchSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SearchSession {
        &mut self.session
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }
}
