#[macro_use]
mod macros;

pub mod cache;
pub mod cli;
pub mod config;
pub mod criteria;
pub mod favorites;
pub mod query;
pub mod render;
pub mod results;
pub mod scryfall;

use clap::Parser;
use cli::{Cli, Command, FavoritesCommand, SearchArgs};
use config::Config;
use criteria::Criterion;
use favorites::FavoriteCard;
use query::{SearchForm, SearchRequest};
use results::{ResultSet, SortDir, SortField};
use scryfall::{Card, ScryfallClient};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

pub struct AppState {
  pub db_path: PathBuf,
  pub app_data_dir: PathBuf,
  pub client: ScryfallClient,
}

impl AppState {
  pub fn init(config: &Config) -> Result<Self, String> {
    let db_path = config.db_path();
    favorites::init_database(&db_path)?;
    let client = ScryfallClient::new(config)?;
    log::debug!("using data directory {}", config.data_dir.display());
    Ok(Self {
      db_path,
      app_data_dir: config.data_dir.clone(),
      client,
    })
  }
}

pub fn compile_query(form: &SearchForm) -> String {
  query::compile(form)
}

pub fn describe_query(query: &str) -> Vec<Criterion> {
  criteria::decompile(query)
}

pub fn search_cards(
  state: &AppState,
  request: SearchRequest,
  page: usize,
  sort: SortField,
  dir: SortDir,
) -> Result<ResultSet, String> {
  let mut results = ResultSet::open(&state.client, request)?;
  results.set_sort(sort, dir);
  results.go_to_page(&state.client, page)?;
  Ok(results)
}

pub fn get_card(state: &AppState, id: &str) -> Result<Card, String> {
  state.client.card(id)
}

pub fn list_favorites(state: &AppState) -> Result<Vec<FavoriteCard>, String> {
  let connection = favorites::open_database(&state.db_path)?;
  favorites::load_favorites(&connection)
}

pub fn favorite_ids(state: &AppState) -> Result<HashSet<String>, String> {
  Ok(
    list_favorites(state)?
      .into_iter()
      .map(|favorite| favorite.id)
      .collect(),
  )
}

/// Fetches the card only when it is not already a favorite.
pub fn add_favorite(state: &AppState, id: &str) -> Result<Vec<FavoriteCard>, String> {
  let connection = favorites::open_database(&state.db_path)?;
  if !favorites::is_favorite(&connection, id)? {
    let card = state.client.card(id)?;
    favorites::add_favorite(&connection, &FavoriteCard::from_card(&card))?;
  }
  favorites::load_favorites(&connection)
}

pub fn remove_favorite(state: &AppState, id: &str) -> Result<Vec<FavoriteCard>, String> {
  let connection = favorites::open_database(&state.db_path)?;
  if !favorites::remove_favorite(&connection, id)? {
    return Err(format!("Card {} is not in your favorites.", id));
  }
  favorites::load_favorites(&connection)
}

pub fn toggle_favorite(state: &AppState, id: &str) -> Result<bool, String> {
  let connection = favorites::open_database(&state.db_path)?;
  if favorites::is_favorite(&connection, id)? {
    favorites::remove_favorite(&connection, id)?;
    return Ok(false);
  }
  let card = state.client.card(id)?;
  favorites::toggle_favorite(&connection, &card)
}

pub fn toggle_card_favorite(state: &AppState, card: &Card) -> Result<bool, String> {
  let connection = favorites::open_database(&state.db_path)?;
  favorites::toggle_favorite(&connection, card)
}

pub fn clear_favorites(state: &AppState) -> Result<usize, String> {
  let connection = favorites::open_database(&state.db_path)?;
  favorites::clear_favorites(&connection)
}

pub fn export_favorites(state: &AppState, path: &Path) -> Result<usize, String> {
  let connection = favorites::open_database(&state.db_path)?;
  favorites::export_favorites(&connection, path)
}

pub fn import_favorites(state: &AppState, path: &Path) -> Result<usize, String> {
  let mut connection = favorites::open_database(&state.db_path)?;
  favorites::import_favorites(&mut connection, path)
}

fn init_logging(verbose: bool) {
  let filter = if verbose {
    EnvFilter::new("debug")
  } else {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
  };
  let _ = tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .try_init();
}

fn load_state(cli: &Cli) -> Result<AppState, String> {
  let mut config = Config::resolve(cli.data_dir.clone())?;
  if let Some(base_url) = &cli.api_base_url {
    config.api_base_url = base_url.clone();
  }
  config.use_cache = !cli.no_cache;
  AppState::init(&config)
}

fn run_search(state: &AppState, args: &SearchArgs) -> Result<(), String> {
  let request = match &args.url {
    Some(link) => SearchRequest::from_link(link)?,
    None => SearchRequest::from_form(&args.form.to_form()?)
      .ok_or_else(|| "No search query provided".to_string())?,
  };

  let criteria = describe_query(&request.query);
  if !criteria.is_empty() {
    println!("{}\n", render::criteria(&criteria));
  }
  println!("Link: {}\n", request.to_link()?);

  let results = search_cards(state, request, args.page, args.sort, args.dir)?;
  println!("{}", render::results_page(&results, &favorite_ids(state)?));
  Ok(())
}

fn run_favorites(state: &AppState, command: &FavoritesCommand) -> Result<(), String> {
  match command {
    FavoritesCommand::List { page, sort, dir } => {
      let favorites = list_favorites(state)?;
      println!("{}", render::favorites_page(&favorites, *page, *sort, *dir));
    }
    FavoritesCommand::Add { id } => {
      let favorites = add_favorite(state, id)?;
      println!("Saved. {} favorites.", favorites.len());
    }
    FavoritesCommand::Remove { id } => {
      let favorites = remove_favorite(state, id)?;
      println!("Removed. {} favorites.", favorites.len());
    }
    FavoritesCommand::Toggle { id } => {
      if toggle_favorite(state, id)? {
        println!("Added {} to favorites.", id);
      } else {
        println!("Removed {} from favorites.", id);
      }
    }
    FavoritesCommand::Clear { yes } => {
      if !yes {
        return Err(
          "Clearing removes every favorite. Pass --yes to confirm.".to_string(),
        );
      }
      println!("Removed {} favorites.", clear_favorites(state)?);
    }
    FavoritesCommand::Export { path } => {
      let written = export_favorites(state, path)?;
      println!("Exported {} favorites to {}.", written, path.display());
    }
    FavoritesCommand::Import { path } => {
      let imported = import_favorites(state, path)?;
      println!("Imported {} favorites from {}.", imported, path.display());
    }
  }
  Ok(())
}

fn execute(cli: &Cli) -> Result<(), String> {
  match &cli.command {
    Command::Query(form) => {
      let query = compile_query(&form.to_form()?);
      if query.is_empty() {
        return Err("No search query provided".to_string());
      }
      println!("{}", query);
    }
    Command::Describe { query } => {
      let criteria = describe_query(query);
      if criteria.is_empty() {
        println!("No criteria.");
      } else {
        println!("{}", render::criteria(&criteria));
      }
    }
    Command::Search(args) => run_search(&load_state(cli)?, args)?,
    Command::Card {
      id,
      toggle_favorite,
    } => {
      let state = load_state(cli)?;
      let card = get_card(&state, id)?;
      let liked = if *toggle_favorite {
        toggle_card_favorite(&state, &card)?
      } else {
        favorite_ids(&state)?.contains(&card.id)
      };
      println!("{}", render::card_detail(&card, liked));
    }
    Command::Favorites(command) => run_favorites(&load_state(cli)?, command)?,
  }
  Ok(())
}

pub fn run() -> ExitCode {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  match execute(&cli) {
    Ok(()) => ExitCode::SUCCESS,
    Err(error) => {
      log::debug!("command failed: {}", error);
      eprintln!("error: {}", error);
      ExitCode::FAILURE
    }
  }
}
