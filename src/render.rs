//! Plain-text views printed by the command line.

use crate::criteria::Criterion;
use crate::favorites::{total_value, FavoriteCard};
use crate::results::{self, showing_range, ResultSet, SortDir, SortField};
use crate::scryfall::Card;
use std::collections::HashSet;
use std::fmt::Write;

const LIKED: &str = "♥";
const NOT_LIKED: &str = " ";

fn capitalize(text: &str) -> String {
  let mut chars = text.chars();
  match chars.next() {
    Some(first) => first.to_uppercase().chain(chars).collect(),
    None => String::new(),
  }
}

fn price_text(usd: Option<&str>) -> String {
  match usd.map(str::trim).filter(|usd| !usd.is_empty()) {
    Some(usd) => format!("${}", usd),
    None => "-".to_string(),
  }
}

fn marker(liked: bool) -> &'static str {
  if liked {
    LIKED
  } else {
    NOT_LIKED
  }
}

pub fn criteria(criteria: &[Criterion]) -> String {
  criteria
    .iter()
    .map(|criterion| format!("{}: {}", criterion.label, criterion.value))
    .collect::<Vec<_>>()
    .join("\n")
}

pub fn card_line(card: &Card, liked: bool) -> String {
  format!(
    "{} {}  {}  {}  {}  {}  [{}]",
    marker(liked),
    card.name,
    card.mana_cost.as_deref().unwrap_or("-"),
    card.type_line,
    card.rarity,
    price_text(card.prices.usd.as_deref()),
    card.id
  )
}

fn favorite_line(favorite: &FavoriteCard) -> String {
  format!(
    "{} {}  {}  {}  {}  [{}]",
    LIKED,
    favorite.name,
    favorite.type_line,
    favorite.rarity,
    price_text(favorite.prices.usd.as_deref()),
    favorite.id
  )
}

fn pager(page: usize, total_pages: usize, len: usize) -> String {
  match showing_range(len, page) {
    Some((first, last)) => format!(
      "Showing {} - {} of {} (page {} of {})",
      first, last, len, page, total_pages
    ),
    None => format!("Page {} is past the end ({} pages)", page, total_pages),
  }
}

pub fn results_page(results: &ResultSet, favorite_ids: &HashSet<String>) -> String {
  if results.is_empty() {
    return "No cards found. Try adjusting your search criteria.".to_string();
  }

  let mut out = String::new();
  let _ = writeln!(
    out,
    "{} cards match; {} loaded{}",
    results.total_cards(),
    results.len(),
    if results.has_more() { ", more available" } else { "" }
  );
  let _ = writeln!(
    out,
    "{}",
    pager(results.current_page(), results.total_pages(), results.len())
  );
  for card in results.current_cards() {
    let _ = writeln!(out, "{}", card_line(card, favorite_ids.contains(&card.id)));
  }
  out.trim_end().to_string()
}

pub fn card_detail(card: &Card, liked: bool) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "{} {}", marker(liked), card.name);
  let _ = writeln!(out, "{}", card.type_line);
  if let Some(mana_cost) = card.mana_cost.as_deref().filter(|cost| !cost.is_empty()) {
    let _ = writeln!(out, "Mana cost: {} (MV {})", mana_cost, card.cmc);
  }
  if let Some(text) = &card.oracle_text {
    let _ = writeln!(out, "\n{}\n", text);
  }
  if let Some(flavor) = &card.flavor_text {
    let _ = writeln!(out, "\"{}\"", flavor);
  }
  if let (Some(power), Some(toughness)) = (&card.power, &card.toughness) {
    let _ = writeln!(out, "P/T: {}/{}", power, toughness);
  }
  if let Some(loyalty) = &card.loyalty {
    let _ = writeln!(out, "Loyalty: {}", loyalty);
  }
  let _ = writeln!(
    out,
    "{} · {} #{}",
    capitalize(&card.rarity),
    card.set_name,
    card.collector_number
  );

  let mut prices = Vec::new();
  if let Some(usd) = &card.prices.usd {
    prices.push(format!("${} USD", usd));
  }
  if let Some(foil) = &card.prices.usd_foil {
    prices.push(format!("${} Foil", foil));
  }
  if let Some(eur) = &card.prices.eur {
    prices.push(format!("€{} EUR", eur));
  }
  if prices.is_empty() {
    let _ = writeln!(out, "Prices: No price data available");
  } else {
    let _ = writeln!(out, "Prices: {}", prices.join(", "));
  }

  if let Some(artist) = &card.artist {
    let _ = writeln!(out, "Artist: {}", artist);
  }

  let formats: Vec<String> = card.legal_formats().into_iter().map(capitalize).collect();
  if formats.is_empty() {
    let _ = writeln!(out, "Legal in: Not legal in any format");
  } else {
    let _ = writeln!(out, "Legal in: {}", formats.join(", "));
  }
  if let Some(image) = card.detail_image_uri() {
    let _ = writeln!(out, "Image: {}", image);
  }
  if !card.scryfall_uri.is_empty() {
    let _ = writeln!(out, "Scryfall: {}", card.scryfall_uri);
  }
  out.trim_end().to_string()
}

pub fn favorites_page(
  favorites: &[FavoriteCard],
  page: usize,
  field: SortField,
  dir: SortDir,
) -> String {
  let count = favorites.len();
  if count == 0 {
    return "You haven't liked any cards yet".to_string();
  }

  let mut out = String::new();
  let _ = writeln!(
    out,
    "{} card{} in your collection",
    count,
    if count == 1 { "" } else { "s" }
  );
  let value = total_value(favorites);
  if value > 0.0 {
    let _ = writeln!(out, "Total Value: ${:.2} USD", value);
  }

  let page = page.max(1);
  let _ = writeln!(out, "{}", pager(page, results::total_pages(count), count));
  let sorted = results::sort_items(favorites, field, dir);
  for favorite in results::page_slice(&sorted, page) {
    let _ = writeln!(out, "{}", favorite_line(favorite));
  }
  out.trim_end().to_string()
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::favorites::FavoritePrices;

  fn favorite(id: &str, usd: Option<&str>, added_at: i64) -> FavoriteCard {
    FavoriteCard {
      id: id.to_string(),
      name: id.to_uppercase(),
      rarity: "rare".to_string(),
      prices: FavoritePrices {
        usd: usd.map(str::to_string),
      },
      added_at,
      ..FavoriteCard::default()
    }
  }

  #[test]
  fn criteria_are_labelled_lines() {
    let text = criteria(&[
      Criterion::new("Name", "bolt"),
      Criterion::new("Colors", "Red"),
    ]);
    assert_eq!(text, "Name: bolt\nColors: Red");
  }

  #[test]
  fn detail_capitalizes_and_reports_missing_prices() {
    let mut card = Card {
      name: "Opt".to_string(),
      type_line: "Instant".to_string(),
      rarity: "common".to_string(),
      set_name: "Ixalan".to_string(),
      collector_number: "65".to_string(),
      ..Card::default()
    };
    card.legalities.insert("modern".to_string(), "legal".to_string());

    let text = card_detail(&card, true);
    assert!(text.starts_with("♥ Opt"));
    assert!(text.contains("Common · Ixalan #65"));
    assert!(text.contains("Prices: No price data available"));
    assert!(text.contains("Legal in: Modern"));

    card.legalities.clear();
    card.prices.usd = Some("0.25".to_string());
    let text = card_detail(&card, false);
    assert!(text.contains("Prices: $0.25 USD"));
    assert!(text.contains("Not legal in any format"));
  }

  #[test]
  fn favorites_summary_counts_and_totals() {
    assert_eq!(
      favorites_page(&[], 1, SortField::Added, SortDir::Desc),
      "You haven't liked any cards yet"
    );

    let favorites = vec![
      favorite("old", Some("2.00"), 1),
      favorite("new", None, 2),
    ];
    let text = favorites_page(&favorites, 1, SortField::Added, SortDir::Desc);
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], "2 cards in your collection");
    assert_eq!(lines[1], "Total Value: $2.00 USD");
    assert_eq!(lines[2], "Showing 1 - 2 of 2 (page 1 of 1)");
    assert!(lines[3].contains("NEW"));
    assert!(lines[4].contains("OLD"));
  }

  #[test]
  fn zero_value_hides_total() {
    let text = favorites_page(&[favorite("a", None, 1)], 1, SortField::Name, SortDir::Asc);
    assert!(text.starts_with("1 card in your collection\n"));
    assert!(!text.contains("Total Value"));
  }
}
