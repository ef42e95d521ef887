//! Map section: drives a map surface from the attractions of the current search.

use std::{fmt::Debug, sync::Arc};

use parking_lot::Mutex;
use thiserror::Error;

use crate::model::{Attraction, Coordinates};

/// Used when no attraction carries coordinates.
pub const DEFAULT_CENTER: Coordinates = Coordinates { lat: 20.0, lon: 0.0 };
pub const DEFAULT_ZOOM: u8 = 2;
pub const ATTRACTION_ZOOM: u8 = 13;
pub const DEFAULT_CONTAINER: &str = "map-container";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("map unavailable: {0}")]
pub struct MapError(pub String);

/// Rendering capability the map section drives.
pub trait MapSurface: Send + Debug {
    fn init(&mut self, container: &str, center: Coordinates, zoom: u8) -> Result<(), MapError>;

    fn add_marker(&mut self, coords: Coordinates, popup_text: &str) -> Result<(), MapError>;

    fn teardown(&mut self);
}

/// What the map section shows once attractions have settled.
#[derive(Debug, Clone, PartialEq)]
pub enum MapView {
    Plotted {
        center: Coordinates,
        zoom: u8,
        markers: usize,
    },
    /// The search returned no attractions.
    NoLocationData,
    /// Attractions failed or the surface could not be initialized.
    Unavailable,
}

/// Owns the single live map instance and guarantees it is torn down exactly
/// once before being re-created.
#[derive(Debug)]
pub struct MapController {
    surface: Box<dyn MapSurface>,
    container: String,
    active: bool,
}

impl MapController {
    pub fn new(surface: Box<dyn MapSurface>) -> Self {
        Self::with_container(surface, DEFAULT_CONTAINER)
    }

    pub fn with_container(surface: Box<dyn MapSurface>, container: impl Into<String>) -> Self {
        Self {
            surface,
            container: container.into(),
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Replace whatever is on the map with markers for `attractions`.
    pub fn render(&mut self, attractions: &[Attraction]) -> MapView {
        self.teardown();

        if attractions.is_empty() {
            return MapView::NoLocationData;
        }

        let (center, zoom) = attractions
            .iter()
            .find_map(|a| a.coordinates)
            .map(|c| (c, ATTRACTION_ZOOM))
            .unwrap_or((DEFAULT_CENTER, DEFAULT_ZOOM));

        if let Err(err) = self.surface.init(&self.container, center, zoom) {
            tracing::warn!(error = %err, "map init failed; showing no map");
            return MapView::Unavailable;
        }
        self.active = true;

        let mut markers = 0;
        for attraction in attractions {
            let Some(coords) = attraction.coordinates else {
                continue;
            };
            let popup = format!("{}\n{}", attraction.name, attraction.address);
            match self.surface.add_marker(coords, &popup) {
                Ok(()) => markers += 1,
                Err(err) => tracing::warn!(id = %attraction.id, error = %err, "marker skipped"),
            }
        }

        MapView::Plotted { center, zoom, markers }
    }

    /// Tear down the current map, if any. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        if self.active {
            self.surface.teardown();
            self.active = false;
        }
    }
}

impl Drop for MapController {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TextMapState {
    pub container: Option<String>,
    pub center: Option<Coordinates>,
    pub zoom: u8,
    pub markers: Vec<(Coordinates, String)>,
    pub inits: usize,
    pub teardowns: usize,
}

/// Surface that keeps the plotted state in memory, for terminals and tests.
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct TextMap {
    state: Arc<Mutex<TextMapState>>,
}

impl TextMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> TextMapState {
        self.state.lock().clone()
    }
}

impl MapSurface for TextMap {
    fn init(&mut self, container: &str, center: Coordinates, zoom: u8) -> Result<(), MapError> {
        let mut state = self.state.lock();
        state.container = Some(container.to_string());
        state.center = Some(center);
        state.zoom = zoom;
        state.markers.clear();
        state.inits += 1;
        Ok(())
    }

    fn add_marker(&mut self, coords: Coordinates, popup_text: &str) -> Result<(), MapError> {
        let mut state = self.state.lock();
        if state.container.is_none() {
            return Err(MapError("marker added before init".into()));
        }
        state.markers.push((coords, popup_text.to_string()));
        Ok(())
    }

    fn teardown(&mut self) {
        let mut state = self.state.lock();
        state.container = None;
        state.center = None;
        state.markers.clear();
        state.teardowns += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attraction(id: &str, coords: Option<(f64, f64)>) -> Attraction {
        Attraction {
            id: id.into(),
            name: format!("Place {id}"),
            address: "Somewhere".into(),
            categories: Vec::new(),
            coordinates: coords.map(|(lat, lon)| Coordinates { lat, lon }),
            photo_url: None,
        }
    }

    #[derive(Debug)]
    struct BrokenSurface;

    impl MapSurface for BrokenSurface {
        fn init(&mut self, _: &str, _: Coordinates, _: u8) -> Result<(), MapError> {
            Err(MapError("no tiles".into()))
        }

        fn add_marker(&mut self, _: Coordinates, _: &str) -> Result<(), MapError> {
            Ok(())
        }

        fn teardown(&mut self) {}
    }

    #[test]
    fn centers_on_first_attraction_with_coordinates() {
        let map = TextMap::new();
        let mut controller = MapController::new(Box::new(map.clone()));

        let view = controller.render(&[
            attraction("a", None),
            attraction("b", Some((48.86, 2.33))),
            attraction("c", Some((48.85, 2.35))),
        ]);

        let center = Coordinates { lat: 48.86, lon: 2.33 };
        assert_eq!(view, MapView::Plotted { center, zoom: ATTRACTION_ZOOM, markers: 2 });

        let state = map.snapshot();
        assert_eq!(state.container.as_deref(), Some(DEFAULT_CONTAINER));
        assert_eq!(state.markers.len(), 2);
        assert_eq!(state.markers[0].1, "Place b\nSomewhere");
    }

    #[test]
    fn falls_back_to_default_center() {
        let map = TextMap::new();
        let mut controller = MapController::new(Box::new(map.clone()));

        let view = controller.render(&[attraction("a", None)]);

        assert_eq!(view, MapView::Plotted { center: DEFAULT_CENTER, zoom: DEFAULT_ZOOM, markers: 0 });
    }

    #[test]
    fn empty_list_is_no_location_data() {
        let map = TextMap::new();
        let mut controller = MapController::new(Box::new(map.clone()));

        assert_eq!(controller.render(&[]), MapView::NoLocationData);
        assert_eq!(map.snapshot().inits, 0);
        assert!(!controller.is_active());
    }

    #[test]
    fn rerender_tears_down_exactly_once() {
        let map = TextMap::new();
        let mut controller = MapController::new(Box::new(map.clone()));
        let places = [attraction("a", Some((1.0, 2.0)))];

        controller.render(&places);
        controller.render(&places);
        controller.render(&[]);
        controller.teardown();

        let state = map.snapshot();
        assert_eq!(state.inits, 2);
        assert_eq!(state.teardowns, 2);
    }

    #[test]
    fn drop_tears_down_live_map() {
        let map = TextMap::new();
        {
            let mut controller = MapController::new(Box::new(map.clone()));
            controller.render(&[attraction("a", Some((1.0, 2.0)))]);
        }
        assert_eq!(map.snapshot().teardowns, 1);
    }

    #[test]
    fn init_failure_degrades_to_unavailable() {
        let mut controller = MapController::new(Box::new(BrokenSurface));
        let view = controller.render(&[attraction("a", Some((1.0, 2.0)))]);

        assert_eq!(view, MapView::Unavailable);
        assert!(!controller.is_active());
    }
}
