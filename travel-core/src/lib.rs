//! Core library for the `travel` explorer.
//!
//! This crate defines:
//! - Provider adapters for weather, places, place photos and exchange rates
//! - The search orchestrator that fans out to them and tracks per-section state
//! - Currency recalculation over the last fetched rate table
//! - Durable favorites (destinations and attractions) and their toggle controls
//! - Configuration & credentials handling
//!
//! It is used by `travel-cli`, but can also be driven by any other front end:
//! the core only emits state and never renders.

pub mod config;
pub mod currency;
pub mod error;
pub mod favorites;
pub mod map;
pub mod model;
pub mod orchestrator;
pub mod persistent_set;
pub mod provider;
pub mod storage;

pub use config::{Config, ProviderConfig};
pub use currency::{Conversion, CurrencyRecalculator};
pub use error::{ErrorKind, ProviderError, QueryError, StorageError};
pub use favorites::{FavoriteKey, FavoritesController, ToggleState};
pub use map::{MapController, MapSurface, MapView, TextMap};
pub use model::{Attraction, Coordinates, FavoriteAttraction, Query, RateTable, SectionResult, WeatherView};
pub use orchestrator::{Aggregator, Orchestrator, SearchSession, SearchTicket, SearchView, SectionUpdate};
pub use persistent_set::{Mutation, PersistentSet};
pub use provider::{ProviderClient, ProviderId, Providers};
pub use storage::{BlobStore, FileStore, MemoryStore};
