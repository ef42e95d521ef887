use std::{fmt, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use travel_core::{
    Attraction, Config, FavoriteAttraction, FavoriteKey, FavoritesController, FileStore,
    MapController, Orchestrator, ProviderId, Providers, Query, SectionResult, TextMap,
    StorageError,
};

use travel_core::currency::parse_amount;

use crate::render;

/// Control id of the destination toggle; attraction toggles use their 1-based position.
const DESTINATION_CONTROL: u64 = 0;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "travel", version, about = "Travel destination explorer")]
pub struct Cli {
    /// Debug logging to stderr (RUST_LOG takes precedence).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key for a provider.
    Configure {
        /// Provider short name: "openweather", "foursquare" or "exchangerate".
        provider: String,
    },

    /// Show weather, attractions, map and currency for a destination.
    Search {
        /// Destination, e.g. "Paris, France".
        query: String,

        /// Amount of the base currency to convert.
        #[arg(long, value_parser = amount_arg)]
        amount: Option<f64>,

        /// Keep prompting to edit the amount or toggle favorites.
        #[arg(short, long)]
        interactive: bool,
    },

    /// List saved favorites.
    Favorites,

    /// Add to favorites, or remove if already saved.
    Favorite {
        #[command(subcommand)]
        target: FavoriteTarget,
    },

    /// Remove from favorites.
    Unfavorite {
        #[command(subcommand)]
        target: RemoveTarget,
    },
}

#[derive(Debug, Subcommand)]
pub enum FavoriteTarget {
    Destination {
        query: String,
    },
    Attraction {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        address: String,
    },
}

#[derive(Debug, Subcommand)]
pub enum RemoveTarget {
    Destination { query: String },
    Attraction { id: String },
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure { provider } => configure(&provider),
            Command::Search { query, amount, interactive } => {
                let config = Config::load()?;
                search(&config, &query, amount, interactive).await
            }
            Command::Favorites => {
                let favorites = favorites_controller(&Config::load()?)?;
                print!(
                    "{}",
                    render::favorites(
                        &favorites.list_favorite_destinations(),
                        &favorites.list_favorite_attractions(),
                    )
                );
                Ok(())
            }
            Command::Favorite { target } => {
                let mut favorites = favorites_controller(&Config::load()?)?;
                let outcome = match target {
                    FavoriteTarget::Destination { query } => {
                        favorites.toggle_destination(&Query::parse(&query)?)
                    }
                    FavoriteTarget::Attraction { id, name, address } => {
                        favorites.toggle_attraction(FavoriteAttraction { id, name, address })
                    }
                };
                match outcome {
                    Ok(outcome) => println!("{} {}", outcome.state.marker(), describe(&outcome.key, outcome.state.is_favorite)),
                    Err(err) => storage_notice(&err),
                }
                Ok(())
            }
            Command::Unfavorite { target } => {
                let mut favorites = favorites_controller(&Config::load()?)?;
                let listing = match target {
                    RemoveTarget::Destination { query } => favorites.remove_destination(query.trim()).map(|_| ()),
                    RemoveTarget::Attraction { id } => favorites.remove_attraction(&id).map(|_| ()),
                };
                if let Err(err) = listing {
                    storage_notice(&err);
                }
                print!(
                    "{}",
                    render::favorites(
                        &favorites.list_favorite_destinations(),
                        &favorites.list_favorite_attractions(),
                    )
                );
                Ok(())
            }
        }
    }
}

fn amount_arg(input: &str) -> Result<f64, String> {
    parse_amount(input).ok_or_else(|| format!("'{input}' is not a non-negative number"))
}

fn configure(provider: &str) -> anyhow::Result<()> {
    let id = ProviderId::try_from(provider)?;
    let mut config = Config::load()?;

    let api_key = Password::new(&format!("API key for {id}:"))
        .without_confirmation()
        .with_display_mode(PasswordDisplayMode::Masked)
        .prompt()
        .context("Failed to read API key")?;

    config.upsert_provider_api_key(id, api_key.trim().to_string());
    config.save()?;

    println!("Saved API key for {id} to {}", Config::config_file_path()?.display());
    Ok(())
}

fn favorites_controller(config: &Config) -> anyhow::Result<FavoritesController> {
    let dir = config.resolve_data_dir()?;
    tracing::debug!(dir = %dir.display(), "favorites directory");
    Ok(FavoritesController::new(Arc::new(FileStore::new(dir))))
}

fn storage_notice(err: &StorageError) {
    eprintln!("Notice: {} ({err})", err.kind().user_message());
}

fn describe(key: &FavoriteKey, is_favorite: bool) -> String {
    let (kind, name) = match key {
        FavoriteKey::Destination(query) => ("destination", query),
        FavoriteKey::Attraction(id) => ("attraction", id),
    };
    let verb = if is_favorite { "added to" } else { "removed from" };
    format!("{kind} '{name}' {verb} favorites")
}

async fn search(config: &Config, query: &str, amount: Option<f64>, interactive: bool) -> anyhow::Result<()> {
    let providers = Providers::from_config(config)?;
    for id in ProviderId::all() {
        if !config.is_provider_configured(*id) {
            tracing::warn!(provider = %id, "no API key configured");
        }
    }

    let mut orchestrator = Orchestrator::new(providers, MapController::new(Box::new(TextMap::new())));
    let mut favorites = favorites_controller(config)?;

    if let Some(amount) = amount {
        orchestrator.session_mut().on_amount_change(&amount.to_string());
    }

    orchestrator.run_search(query).await?;
    print_current(&orchestrator, &mut favorites);

    if interactive {
        interact(&mut orchestrator, &mut favorites)?;
    }
    Ok(())
}

fn print_current(orchestrator: &Orchestrator, favorites: &mut FavoritesController) {
    let session = orchestrator.session();
    let view = session.view();

    favorites.unbind_all();
    if let Some(query) = &view.query {
        favorites.bind(DESTINATION_CONTROL, FavoriteKey::Destination(query.as_str().to_string()));
    }
    if let SectionResult::Ready(list) = &view.attractions {
        for (i, attraction) in list.iter().enumerate() {
            favorites.bind(i as u64 + 1, FavoriteKey::Attraction(attraction.id.clone()));
        }
    }

    print!("{}", render::view(view, session.conversions(), session.amount(), favorites));
}

#[derive(Debug, Clone, Copy)]
enum Action {
    ChangeAmount,
    ToggleDestination,
    ToggleAttraction,
    Quit,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Action::ChangeAmount => "Change amount",
            Action::ToggleDestination => "Toggle destination favorite",
            Action::ToggleAttraction => "Toggle attraction favorite",
            Action::Quit => "Quit",
        })
    }
}

struct AttractionChoice<'a>(usize, &'a Attraction);

impl fmt::Display for AttractionChoice<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {}", self.0 + 1, self.1.name)
    }
}

fn interact(orchestrator: &mut Orchestrator, favorites: &mut FavoritesController) -> anyhow::Result<()> {
    loop {
        let actions = vec![Action::ChangeAmount, Action::ToggleDestination, Action::ToggleAttraction, Action::Quit];
        let action = Select::new("What next?", actions).prompt()?;

        match action {
            Action::ChangeAmount => {
                let session = orchestrator.session_mut();
                let input = Text::new("Amount:")
                    .with_default(&session.amount().to_string())
                    .prompt()?;
                if let Err(msg) = amount_arg(&input) {
                    eprintln!("Notice: {msg}");
                }
                let conversions = session.on_amount_change(&input);
                print!("{}", render::conversion_lines(conversions));
            }
            Action::ToggleDestination => {
                let Some(query) = orchestrator.session().view().query.clone() else {
                    continue;
                };
                match favorites.toggle_destination(&query) {
                    Ok(outcome) => report_refresh(&outcome.refresh, &outcome.key, outcome.state.is_favorite),
                    Err(err) => storage_notice(&err),
                }
            }
            Action::ToggleAttraction => {
                let SectionResult::Ready(list) = &orchestrator.session().view().attractions else {
                    println!("No attractions to choose from.");
                    continue;
                };
                if list.is_empty() {
                    println!("No attractions to choose from.");
                    continue;
                }
                let choices: Vec<AttractionChoice<'_>> =
                    list.iter().enumerate().map(|(i, a)| AttractionChoice(i, a)).collect();
                let choice = Select::new("Attraction:", choices).prompt()?;
                match favorites.toggle_attraction(choice.1) {
                    Ok(outcome) => report_refresh(&outcome.refresh, &outcome.key, outcome.state.is_favorite),
                    Err(err) => storage_notice(&err),
                }
            }
            Action::Quit => return Ok(()),
        }
    }
}

fn report_refresh(refresh: &[travel_core::favorites::ControlRefresh], key: &FavoriteKey, is_favorite: bool) {
    println!("{}", describe(key, is_favorite));
    for update in refresh {
        let target = if update.control == DESTINATION_CONTROL {
            "destination".to_string()
        } else {
            format!("attraction #{}", update.control)
        };
        println!("  {target}: {} {}", update.state.marker(), update.state.label());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_search_with_amount() {
        let cli = Cli::try_parse_from(["travel", "search", "Paris", "--amount", "10", "-i"]).expect("valid args");
        match cli.command {
            Command::Search { query, amount, interactive } => {
                assert_eq!(query, "Paris");
                assert_eq!(amount, Some(10.0));
                assert!(interactive);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn rejects_invalid_amount() {
        let err = Cli::try_parse_from(["travel", "search", "Paris", "--amount", "abc"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        assert!(err.to_string().contains("'abc' is not a non-negative number"));
    }

    #[test]
    fn parses_attraction_favorite() {
        let cli = Cli::try_parse_from([
            "travel", "favorite", "attraction", "a1", "--name", "Louvre", "--address", "Paris",
        ])
        .expect("valid args");
        assert!(matches!(
            cli.command,
            Command::Favorite { target: FavoriteTarget::Attraction { ref id, .. } } if id == "a1"
        ));
    }

    #[test]
    fn describe_toggle() {
        let key = FavoriteKey::Destination("Paris".into());
        assert_eq!(describe(&key, true), "destination 'Paris' added to favorites");
        assert_eq!(describe(&key, false), "destination 'Paris' removed from favorites");
    }
}
