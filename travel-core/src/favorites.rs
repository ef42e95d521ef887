//! Favorite destinations and attractions, and the toggle controls showing them.
//!
//! The controller is the only writer of both favorites sets. Toggle controls
//! are registered by whatever UI renders them; after every mutation the
//! controller tells each control bound to the affected identity what to show.

use std::{collections::HashMap, sync::Arc};

use crate::{
    error::StorageError,
    model::{Attraction, FavoriteAttraction, Query},
    persistent_set::{Mutation, PersistentSet},
    storage::BlobStore,
};

pub const DESTINATIONS_KEY: &str = "favorite_destinations";
pub const ATTRACTIONS_KEY: &str = "favorite_attractions";

/// Identity a toggle control is bound to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FavoriteKey {
    Destination(String),
    Attraction(String),
}

/// Opaque handle the UI assigns to a rendered control.
pub type ControlId = u64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleState {
    pub is_favorite: bool,
}

impl ToggleState {
    pub fn label(&self) -> &'static str {
        if self.is_favorite { "Remove from Favorites" } else { "Add to Favorites" }
    }

    pub fn marker(&self) -> &'static str {
        if self.is_favorite { "★" } else { "☆" }
    }
}

/// Instruction for one rendered control.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlRefresh {
    pub control: ControlId,
    pub state: ToggleState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub key: FavoriteKey,
    pub state: ToggleState,
    pub mutation: Mutation,
    pub refresh: Vec<ControlRefresh>,
}

fn attraction_identity(favorite: &FavoriteAttraction) -> &str {
    &favorite.id
}

#[derive(Debug)]
pub struct FavoritesController {
    destinations: PersistentSet<String>,
    attractions: PersistentSet<FavoriteAttraction>,
    controls: HashMap<FavoriteKey, Vec<ControlId>>,
}

impl FavoritesController {
    pub fn new(store: Arc<dyn BlobStore>) -> Self {
        Self {
            destinations: PersistentSet::new(DESTINATIONS_KEY, store.clone(), String::as_str),
            attractions: PersistentSet::new(ATTRACTIONS_KEY, store, attraction_identity),
            controls: HashMap::new(),
        }
    }

    pub fn is_favorite_destination(&self, query: &str) -> bool {
        self.destinations.contains(query)
    }

    pub fn is_favorite_attraction(&self, id: &str) -> bool {
        self.attractions.contains(id)
    }

    pub fn state_of(&self, key: &FavoriteKey) -> ToggleState {
        let is_favorite = match key {
            FavoriteKey::Destination(query) => self.is_favorite_destination(query),
            FavoriteKey::Attraction(id) => self.is_favorite_attraction(id),
        };
        ToggleState { is_favorite }
    }

    /// Register a rendered control and return the state it should show.
    pub fn bind(&mut self, control: ControlId, key: FavoriteKey) -> ToggleState {
        let state = self.state_of(&key);
        let bound = self.controls.entry(key).or_default();
        if !bound.contains(&control) {
            bound.push(control);
        }
        state
    }

    /// Forget every registered control, e.g. before a view is re-rendered.
    pub fn unbind_all(&mut self) {
        self.controls.clear();
    }

    /// What every control bound to `key` should display. Reads only.
    pub fn refresh(&self, key: &FavoriteKey) -> Vec<ControlRefresh> {
        let state = self.state_of(key);
        self.controls
            .get(key)
            .map(|bound| bound.iter().map(|&control| ControlRefresh { control, state }).collect())
            .unwrap_or_default()
    }

    pub fn toggle_destination(&mut self, query: &Query) -> Result<ToggleOutcome, StorageError> {
        let id = query.as_str();
        let mutation = if self.destinations.contains(id) {
            self.destinations.remove(id)
        } else {
            self.destinations.add(id.to_string())
        };

        self.finish_toggle(FavoriteKey::Destination(id.to_string()), mutation)
    }

    /// Toggle an attraction. Adding stores a snapshot of its current fields.
    pub fn toggle_attraction(
        &mut self,
        attraction: impl Into<FavoriteAttraction>,
    ) -> Result<ToggleOutcome, StorageError> {
        let snapshot = attraction.into();
        let key = FavoriteKey::Attraction(snapshot.id.clone());
        let mutation = if self.attractions.contains(&snapshot.id) {
            self.attractions.remove(&snapshot.id)
        } else {
            self.attractions.add(snapshot)
        };

        self.finish_toggle(key, mutation)
    }

    fn finish_toggle(
        &self,
        key: FavoriteKey,
        mutation: Result<Mutation, StorageError>,
    ) -> Result<ToggleOutcome, StorageError> {
        let mutation = mutation.inspect_err(|err| {
            tracing::warn!(?key, error = %err, "favorite change not saved");
        })?;

        let state = self.state_of(&key);
        tracing::debug!(?key, favorite = state.is_favorite, ?mutation, "favorite toggled");

        Ok(ToggleOutcome {
            refresh: self.refresh(&key),
            key,
            state,
            mutation,
        })
    }

    pub fn list_favorite_destinations(&self) -> Vec<String> {
        self.destinations.load().to_vec()
    }

    pub fn list_favorite_attractions(&self) -> Vec<FavoriteAttraction> {
        self.attractions.load().to_vec()
    }

    /// Remove from the destinations listing and return the new listing.
    pub fn remove_destination(&mut self, query: &str) -> Result<Vec<String>, StorageError> {
        self.destinations.remove(query)?;
        Ok(self.list_favorite_destinations())
    }

    /// Remove from the attractions listing and return the new listing.
    pub fn remove_attraction(&mut self, id: &str) -> Result<Vec<FavoriteAttraction>, StorageError> {
        self.attractions.remove(id)?;
        Ok(self.list_favorite_attractions())
    }

    /// Pair each attraction with its current favorite state.
    pub fn decorate<'a>(&self, attractions: &'a [Attraction]) -> Vec<(&'a Attraction, ToggleState)> {
        attractions
            .iter()
            .map(|a| (a, ToggleState { is_favorite: self.is_favorite_attraction(&a.id) }))
            .collect()
    }
}
