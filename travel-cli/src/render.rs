use std::fmt;

use travel_core::{
    Conversion, FavoriteAttraction, MapView, ProviderError, SearchView, SectionResult, ToggleState,
    favorites::FavoritesController,
};

/// Text rendering of one search. Favorite markers reflect current set state.
pub struct Report<'a> {
    pub view: &'a SearchView,
    pub conversions: &'a [Conversion],
    pub amount: f64,
    pub favorites: &'a FavoritesController,
}

impl Report<'_> {
    fn section<T>(
        f: &mut fmt::Formatter<'_>,
        title: &str,
        section: &SectionResult<T>,
        ready: impl FnOnce(&mut fmt::Formatter<'_>, &T) -> fmt::Result,
    ) -> fmt::Result {
        writeln!(f, "\n{title}")?;
        match section {
            SectionResult::Loading => writeln!(f, "  Loading..."),
            SectionResult::Failed(err) => failed(f, err),
            SectionResult::Ready(value) => ready(f, value),
        }
    }
}

fn failed(f: &mut fmt::Formatter<'_>, err: &ProviderError) -> fmt::Result {
    writeln!(f, "  {}", err.kind.user_message())?;
    writeln!(f, "  ({err})")
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(query) = &self.view.query else {
            return writeln!(f, "No destination specified.");
        };
        let state = ToggleState { is_favorite: self.favorites.is_favorite_destination(query.as_str()) };
        writeln!(f, "Details for {query}  [{} {}]", state.marker(), state.label())?;

        Self::section(f, "Weather", &self.view.weather, |f, w| {
            writeln!(
                f,
                "  {}: {}, {:.1}°C (feels like {:.1}°C)",
                w.location_name, w.description, w.temperature_c, w.feels_like_c
            )?;
            writeln!(f, "  Icon: {}", w.icon_url())
        })?;

        Self::section(f, "Attractions", &self.view.attractions, |f, list| {
            if list.is_empty() {
                return writeln!(f, "  No attractions found.");
            }
            for (i, (attraction, state)) in self.favorites.decorate(list).into_iter().enumerate() {
                writeln!(f, "  {:>2}. {} {}", i + 1, state.marker(), attraction.name)?;
                writeln!(f, "      {}", attraction.address)?;
                if !attraction.categories.is_empty() {
                    writeln!(f, "      {}", attraction.categories.join(", "))?;
                }
                match &attraction.photo_url {
                    Some(url) => writeln!(f, "      Photo: {url}")?,
                    None => writeln!(f, "      No image available")?,
                }
            }
            Ok(())
        })?;

        Self::section(f, "Map", &self.view.map, |f, map| writeln!(f, "  {}", map_line(map)))?;

        Self::section(f, "Currency", &self.view.currency, |f, table| {
            writeln!(f, "  {} {} =", self.amount, table.base_currency)?;
            f.write_str(&conversion_lines(self.conversions))
        })
    }
}

pub fn view(view: &SearchView, conversions: &[Conversion], amount: f64, favorites: &FavoritesController) -> String {
    Report { view, conversions, amount, favorites }.to_string()
}

pub fn map_line(map: &MapView) -> String {
    match map {
        MapView::Plotted { center, zoom, markers } => format!(
            "Centered on {:.4}, {:.4} (zoom {zoom}), {markers} marker(s)",
            center.lat, center.lon
        ),
        MapView::NoLocationData => "No location data available.".to_string(),
        MapView::Unavailable => "Map unavailable.".to_string(),
    }
}

pub fn conversion_lines(conversions: &[Conversion]) -> String {
    if conversions.is_empty() {
        return "  No conversions to show.\n".to_string();
    }
    conversions.iter().map(|c| format!("  {c}\n")).collect()
}

/// Saved destinations and attractions, with empty-state messages.
pub struct FavoritesListing<'a> {
    pub destinations: &'a [String],
    pub attractions: &'a [FavoriteAttraction],
}

impl fmt::Display for FavoritesListing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Favorite destinations")?;
        if self.destinations.is_empty() {
            writeln!(f, "  You have no saved favorites yet.")?;
        }
        for destination in self.destinations {
            writeln!(f, "  - {destination}")?;
        }

        writeln!(f, "\nFavorite attractions")?;
        if self.attractions.is_empty() {
            writeln!(f, "  You have no saved attractions yet.")?;
        }
        for attraction in self.attractions {
            writeln!(f, "  - {} ({}) [{}]", attraction.name, attraction.address, attraction.id)?;
        }
        Ok(())
    }
}

pub fn favorites(destinations: &[String], attractions: &[FavoriteAttraction]) -> String {
    FavoritesListing { destinations, attractions }.to_string()
}
