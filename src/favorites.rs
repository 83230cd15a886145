use crate::scryfall::{parse_price, Card};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const MIGRATION_SQL_0001: &str = include_str!("../migrations/0001_favorites.sql");

const FAVORITE_COLUMNS: &str =
  "id, name, image_uri, type_line, mana_cost, rarity, price_usd, set_name, scryfall_uri, added_at";

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FavoritePrices {
  #[serde(default)]
  pub usd: Option<String>,
}

/// The slice of a card kept in the favorites list. Serializes to the same
/// JSON shape used by exported favorites files.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct FavoriteCard {
  pub id: String,
  pub name: String,
  #[serde(default)]
  pub image_uri: Option<String>,
  #[serde(default)]
  pub type_line: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mana_cost: Option<String>,
  #[serde(default)]
  pub rarity: String,
  #[serde(default)]
  pub prices: FavoritePrices,
  #[serde(default)]
  pub set_name: String,
  #[serde(default)]
  pub scryfall_uri: String,
  #[serde(default)]
  pub added_at: i64,
}

impl FavoriteCard {
  pub fn from_card(card: &Card) -> Self {
    Self {
      id: card.id.clone(),
      name: card.name.clone(),
      image_uri: card.image_uri().map(str::to_string),
      type_line: card.type_line.clone(),
      mana_cost: card.mana_cost.clone(),
      rarity: card.rarity.clone(),
      prices: FavoritePrices {
        usd: card.prices.usd.clone(),
      },
      set_name: card.set_name.clone(),
      scryfall_uri: card.scryfall_uri.clone(),
      added_at: Utc::now().timestamp_millis(),
    }
  }

  pub fn usd_price(&self) -> Option<f64> {
    parse_price(self.prices.usd.as_deref())
  }

  fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      id: row.get(0)?,
      name: row.get(1)?,
      image_uri: row.get(2)?,
      type_line: row.get(3)?,
      mana_cost: row.get(4)?,
      rarity: row.get(5)?,
      prices: FavoritePrices { usd: row.get(6)? },
      set_name: row.get(7)?,
      scryfall_uri: row.get(8)?,
      added_at: row.get(9)?,
    })
  }
}

pub fn init_database(db_path: &Path) -> Result<(), String> {
  if let Some(parent) = db_path.parent() {
    fs::create_dir_all(parent).map_err(|e| e.to_string())?;
  }

  let connection = Connection::open(db_path).map_err(|e| e.to_string())?;
  connection
    .execute_batch(MIGRATION_SQL_0001)
    .map_err(|e| e.to_string())?;
  Ok(())
}

pub fn open_database(db_path: &Path) -> Result<Connection, String> {
  Connection::open(db_path).map_err(|e| e.to_string())
}

/// Newest first. Rows that no longer decode are logged and skipped.
pub fn load_favorites(connection: &Connection) -> Result<Vec<FavoriteCard>, String> {
  let mut statement = connection
    .prepare(&format!(
      "SELECT {} FROM favorites ORDER BY seq DESC",
      FAVORITE_COLUMNS
    ))
    .map_err(|e| e.to_string())?;

  let rows = statement
    .query_map([], FavoriteCard::from_row)
    .map_err(|e| e.to_string())?;

  let mut favorites = Vec::new();
  for row in rows {
    match row {
      Ok(favorite) => favorites.push(favorite),
      Err(error) => log::warn!("skipping unreadable favorite: {}", error),
    }
  }
  Ok(favorites)
}

pub fn find_favorite(connection: &Connection, id: &str) -> Result<Option<FavoriteCard>, String> {
  connection
    .query_row(
      &format!("SELECT {} FROM favorites WHERE id = ?1", FAVORITE_COLUMNS),
      params![id],
      FavoriteCard::from_row,
    )
    .optional()
    .map_err(|e| e.to_string())
}

pub fn is_favorite(connection: &Connection, id: &str) -> Result<bool, String> {
  let found: Option<i64> = connection
    .query_row(
      "SELECT 1 FROM favorites WHERE id = ?1 LIMIT 1",
      params![id],
      |row| row.get(0),
    )
    .optional()
    .map_err(|e| e.to_string())?;
  Ok(found.is_some())
}

/// Returns `false` when a favorite with the same id already exists.
pub fn add_favorite(connection: &Connection, favorite: &FavoriteCard) -> Result<bool, String> {
  if favorite.id.trim().is_empty() {
    return Err("No card ID provided".to_string());
  }

  let inserted = connection
    .execute(
      "INSERT OR IGNORE INTO favorites (
         id, name, image_uri, type_line, mana_cost, rarity, price_usd, set_name, scryfall_uri, added_at
       )
       VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
      params![
        favorite.id,
        favorite.name,
        favorite.image_uri,
        favorite.type_line,
        favorite.mana_cost,
        favorite.rarity,
        favorite.prices.usd,
        favorite.set_name,
        favorite.scryfall_uri,
        favorite.added_at
      ],
    )
    .map_err(|e| e.to_string())?;

  if inserted > 0 {
    log::info!("added favorite {} ({})", favorite.name, favorite.id);
  }
  Ok(inserted > 0)
}

pub fn remove_favorite(connection: &Connection, id: &str) -> Result<bool, String> {
  let removed = connection
    .execute("DELETE FROM favorites WHERE id = ?1", params![id])
    .map_err(|e| e.to_string())?;
  if removed > 0 {
    log::info!("removed favorite {}", id);
  }
  Ok(removed > 0)
}

/// Adds the card when absent, removes it when present. Returns whether the
/// card is a favorite afterwards.
pub fn toggle_favorite(connection: &Connection, card: &Card) -> Result<bool, String> {
  if is_favorite(connection, &card.id)? {
    remove_favorite(connection, &card.id)?;
    Ok(false)
  } else {
    add_favorite(connection, &FavoriteCard::from_card(card))?;
    Ok(true)
  }
}

pub fn clear_favorites(connection: &Connection) -> Result<usize, String> {
  let removed = connection
    .execute("DELETE FROM favorites", [])
    .map_err(|e| e.to_string())?;
  log::info!("cleared {} favorites", removed);
  Ok(removed)
}

pub fn count_favorites(connection: &Connection) -> Result<i64, String> {
  connection
    .query_row("SELECT COUNT(*) FROM favorites", [], |row| row.get(0))
    .map_err(|e| e.to_string())
}

/// Sum of USD prices; favorites without a usable price add nothing.
pub fn total_value(favorites: &[FavoriteCard]) -> f64 {
  favorites
    .iter()
    .filter_map(FavoriteCard::usd_price)
    .sum()
}

/// Writes the list newest first as a JSON array.
pub fn export_favorites(connection: &Connection, path: &Path) -> Result<usize, String> {
  let favorites = load_favorites(connection)?;
  let body = serde_json::to_string_pretty(&favorites).map_err(|e| e.to_string())?;
  if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
    fs::create_dir_all(parent).map_err(|e| e.to_string())?;
  }
  fs::write(path, body)
    .map_err(|e| format!("Unable to write favorites to {}: {}", path.display(), e))?;
  Ok(favorites.len())
}

/// Reads an exported favorites array. Elements that are not favorite records
/// are logged and dropped.
pub fn parse_favorites_json(body: &str) -> Result<Vec<FavoriteCard>, String> {
  let value: serde_json::Value = serde_json::from_str(body).map_err(|e| e.to_string())?;
  let serde_json::Value::Array(items) = value else {
    return Err("Favorites file must contain a JSON array.".to_string());
  };

  let mut favorites = Vec::new();
  for (index, item) in items.into_iter().enumerate() {
    match serde_json::from_value::<FavoriteCard>(item) {
      Ok(favorite) => favorites.push(favorite),
      Err(error) => log::warn!("skipping favorite #{} in import: {}", index, error),
    }
  }
  Ok(favorites)
}

/// Merges an exported file into the store and returns how many records were
/// added. The file lists newest first, so it is inserted back to front.
pub fn import_favorites(connection: &mut Connection, path: &Path) -> Result<usize, String> {
  let body = fs::read_to_string(path)
    .map_err(|e| format!("Unable to read favorites from {}: {}", path.display(), e))?;
  let favorites = parse_favorites_json(&body)?;

  let mut imported = 0;
  {
    let tx = connection.transaction().map_err(|e| e.to_string())?;
    for favorite in favorites.iter().rev() {
      if favorite.id.trim().is_empty() {
        log::warn!("skipping favorite '{}' without an id", favorite.name);
        continue;
      }
      if add_favorite(&tx, favorite)? {
        imported += 1;
      }
    }
    tx.commit().map_err(|e| e.to_string())?;
  }

  log::info!(
    "imported {} of {} favorites from {}",
    imported,
    favorites.len(),
    path.display()
  );
  Ok(imported)
}
