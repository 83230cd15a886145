//! Client-side sorting and pagination over fetched cards and favorites.

use crate::favorites::FavoriteCard;
use crate::query::{Rarity, SearchRequest};
use crate::scryfall::{parse_price, Card, CardList};
use std::cmp::Ordering;

pub const CARDS_PER_PAGE: usize = 20;

keyword_enum! {
  pub enum SortField {
    Name => ["name"],
    Price => ["price", "usd"],
    Mana => ["mana", "mv", "cmc"],
    Rarity => ["rarity"],
    Added => ["added", "date"],
  }
}

keyword_enum! {
  pub enum SortDir {
    Asc => ["asc", "ascending"],
    Desc => ["desc", "descending"],
  }
}

/// Anything the local comparators can order.
pub trait Sortable {
  fn sort_name(&self) -> &str;
  fn usd_price(&self) -> Option<f64>;
  fn rarity(&self) -> &str;

  fn mana_value(&self) -> f64 {
    0.0
  }

  fn added_at(&self) -> i64 {
    0
  }
}

impl Sortable for Card {
  fn sort_name(&self) -> &str {
    &self.name
  }

  fn usd_price(&self) -> Option<f64> {
    Card::usd_price(self)
  }

  fn rarity(&self) -> &str {
    &self.rarity
  }

  fn mana_value(&self) -> f64 {
    self.cmc
  }
}

impl Sortable for FavoriteCard {
  fn sort_name(&self) -> &str {
    &self.name
  }

  fn usd_price(&self) -> Option<f64> {
    parse_price(self.prices.usd.as_deref())
  }

  fn rarity(&self) -> &str {
    &self.rarity
  }

  fn added_at(&self) -> i64 {
    self.added_at
  }
}

/// Common through bonus rank 1 to 6; anything else ranks 0.
pub fn rarity_rank(rarity: &str) -> u8 {
  rarity.parse::<Rarity>().map(Rarity::rank).unwrap_or(0)
}

pub fn compare<T: Sortable>(a: &T, b: &T, field: SortField) -> Ordering {
  match field {
    SortField::Name => a
      .sort_name()
      .to_lowercase()
      .cmp(&b.sort_name().to_lowercase()),
    SortField::Price => {
      let price_a = a.usd_price().unwrap_or(-1.0);
      let price_b = b.usd_price().unwrap_or(-1.0);
      price_a.partial_cmp(&price_b).unwrap_or(Ordering::Equal)
    }
    SortField::Mana => a
      .mana_value()
      .partial_cmp(&b.mana_value())
      .unwrap_or(Ordering::Equal),
    SortField::Rarity => rarity_rank(a.rarity()).cmp(&rarity_rank(b.rarity())),
    SortField::Added => a.added_at().cmp(&b.added_at()),
  }
}

/// Stable sort by reference; `Desc` flips the comparison, so ties keep
/// their original order in both directions.
pub fn sort_items<T: Sortable>(items: &[T], field: SortField, dir: SortDir) -> Vec<&T> {
  let mut sorted: Vec<&T> = items.iter().collect();
  sorted.sort_by(|a, b| {
    let ordering = compare(*a, *b, field);
    match dir {
      SortDir::Asc => ordering,
      SortDir::Desc => ordering.reverse(),
    }
  });
  sorted
}

pub fn total_pages(len: usize) -> usize {
  len.div_ceil(CARDS_PER_PAGE)
}

/// One-based page slice; pages past the end are empty.
pub fn page_slice<T>(items: &[T], page: usize) -> &[T] {
  let start = page.max(1).saturating_sub(1).saturating_mul(CARDS_PER_PAGE);
  if start >= items.len() {
    return &[];
  }
  let end = (start + CARDS_PER_PAGE).min(items.len());
  &items[start..end]
}

/// The 1-based `first..=last` positions shown on `page`, if any.
pub fn showing_range(len: usize, page: usize) -> Option<(usize, usize)> {
  let start = page.max(1).saturating_sub(1).saturating_mul(CARDS_PER_PAGE);
  if start >= len {
    return None;
  }
  Some((start + 1, (start + CARDS_PER_PAGE).min(len)))
}

pub trait CardSource {
  fn fetch_page(&self, request: &SearchRequest, page: u32) -> Result<CardList, String>;
}

/// Cards accumulated across API pages for one search, with the local sort
/// and page the user is looking at.
pub struct ResultSet {
  request: SearchRequest,
  cards: Vec<Card>,
  total_cards: u64,
  has_more: bool,
  api_page: u32,
  sort_field: SortField,
  sort_dir: SortDir,
  current_page: usize,
}

impl ResultSet {
  pub fn new(request: SearchRequest) -> Self {
    Self {
      request,
      cards: Vec::new(),
      total_cards: 0,
      has_more: false,
      api_page: 0,
      sort_field: SortField::Name,
      sort_dir: SortDir::Asc,
      current_page: 1,
    }
  }

  /// Fetches the first API page for `request`.
  pub fn open<S: CardSource + ?Sized>(source: &S, request: SearchRequest) -> Result<Self, String> {
    let mut results = Self::new(request);
    results.fetch(source, 1)?;
    Ok(results)
  }

  fn fetch<S: CardSource + ?Sized>(&mut self, source: &S, page: u32) -> Result<usize, String> {
    if self.request.query.trim().is_empty() {
      return Err("No search query provided".to_string());
    }

    match source.fetch_page(&self.request, page) {
      Ok(list) => {
        let received = list.data.len();
        if page == 1 {
          self.cards = list.data;
        } else {
          self.cards.extend(list.data);
        }
        self.total_cards = list.total_cards;
        self.has_more = list.has_more;
        self.api_page = page;
        log::debug!(
          "buffered {} of {} cards after API page {}",
          self.cards.len(),
          self.total_cards,
          page
        );
        Ok(received)
      }
      Err(error) => {
        self.cards.clear();
        self.total_cards = 0;
        self.has_more = false;
        Err(error)
      }
    }
  }

  pub fn set_sort(&mut self, field: SortField, dir: SortDir) {
    self.sort_field = field;
    self.sort_dir = dir;
    self.current_page = 1;
  }

  /// Moves to `page`, pulling further API pages while the buffer is short
  /// and Scryfall reports more results.
  pub fn go_to_page<S: CardSource + ?Sized>(
    &mut self,
    source: &S,
    page: usize,
  ) -> Result<Vec<&Card>, String> {
    let page = page.max(1);
    self.current_page = page;

    let needed = page.saturating_mul(CARDS_PER_PAGE);
    while needed > self.cards.len() && self.has_more {
      let received = self.fetch(source, self.api_page + 1)?;
      if received == 0 {
        break;
      }
    }

    Ok(self.current_cards())
  }

  pub fn sorted(&self) -> Vec<&Card> {
    sort_items(&self.cards, self.sort_field, self.sort_dir)
  }

  /// Page `n` of the sorted buffer, without fetching.
  pub fn page(&self, n: usize) -> Vec<&Card> {
    let sorted = self.sorted();
    page_slice(&sorted, n).to_vec()
  }

  pub fn current_cards(&self) -> Vec<&Card> {
    self.page(self.current_page)
  }

  pub fn request(&self) -> &SearchRequest {
    &self.request
  }

  pub fn len(&self) -> usize {
    self.cards.len()
  }

  pub fn is_empty(&self) -> bool {
    self.cards.is_empty()
  }

  pub fn total_cards(&self) -> u64 {
    self.total_cards
  }

  pub fn has_more(&self) -> bool {
    self.has_more
  }

  pub fn api_page(&self) -> u32 {
    self.api_page
  }

  pub fn current_page(&self) -> usize {
    self.current_page
  }

  pub fn total_pages(&self) -> usize {
    total_pages(self.cards.len())
  }

  pub fn sort(&self) -> (SortField, SortDir) {
    (self.sort_field, self.sort_dir)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::cell::RefCell;

  fn card(name: &str, usd: Option<&str>, cmc: f64, rarity: &str) -> Card {
    let mut card = Card {
      id: name.to_lowercase().replace(' ', "-"),
      name: name.to_string(),
      cmc,
      rarity: rarity.to_string(),
      ..Card::default()
    };
    card.prices.usd = usd.map(str::to_string);
    card
  }

  fn names(cards: &[&Card]) -> Vec<String> {
    cards.iter().map(|card| card.name.clone()).collect()
  }

  struct PagedSource {
    pages: Vec<CardList>,
    calls: RefCell<Vec<u32>>,
  }

  impl PagedSource {
    fn new(per_page: usize, total: usize) -> Self {
      let mut pages = Vec::new();
      let mut index = 0;
      while index < total {
        let count = per_page.min(total - index);
        let data = (index..index + count)
          .map(|n| card(&format!("Card {:03}", n), Some("1.00"), 1.0, "common"))
          .collect();
        index += count;
        pages.push(CardList {
          total_cards: total as u64,
          has_more: index < total,
          data,
          ..CardList::default()
        });
      }
      Self {
        pages,
        calls: RefCell::new(Vec::new()),
      }
    }
  }

  impl CardSource for PagedSource {
    fn fetch_page(&self, _request: &SearchRequest, page: u32) -> Result<CardList, String> {
      self.calls.borrow_mut().push(page);
      self
        .pages
        .get(page as usize - 1)
        .cloned()
        .ok_or_else(|| "Your query didn't match any cards.".to_string())
    }
  }

  struct FailingSource;

  impl CardSource for FailingSource {
    fn fetch_page(&self, _request: &SearchRequest, _page: u32) -> Result<CardList, String> {
      Err("Failed to fetch cards. Please try again.".to_string())
    }
  }

  #[test]
  fn sorts_by_each_field() {
    let cards = vec![
      card("bolt", Some("1.50"), 1.0, "common"),
      card("Ancestral Recall", Some("5000"), 1.0, "rare"),
      card("Counterspell", None, 2.0, "uncommon"),
      card("Lotus Petal", Some("0.30"), 0.0, "mythic"),
    ];

    let by_name = sort_items(&cards, SortField::Name, SortDir::Asc);
    assert_eq!(
      names(&by_name),
      vec!["Ancestral Recall", "bolt", "Counterspell", "Lotus Petal"]
    );

    let by_price = sort_items(&cards, SortField::Price, SortDir::Desc);
    assert_eq!(
      names(&by_price),
      vec!["Ancestral Recall", "bolt", "Lotus Petal", "Counterspell"]
    );

    let by_mana = sort_items(&cards, SortField::Mana, SortDir::Asc);
    assert_eq!(by_mana[0].name, "Lotus Petal");
    assert_eq!(by_mana[3].name, "Counterspell");

    let by_rarity = sort_items(&cards, SortField::Rarity, SortDir::Asc);
    assert_eq!(
      names(&by_rarity),
      vec!["bolt", "Counterspell", "Ancestral Recall", "Lotus Petal"]
    );
  }

  #[test]
  fn ties_keep_input_order() {
    let cards = vec![
      card("First", Some("1"), 3.0, "rare"),
      card("Second", Some("1"), 3.0, "rare"),
    ];
    for dir in [SortDir::Asc, SortDir::Desc] {
      let sorted = sort_items(&cards, SortField::Mana, dir);
      assert_eq!(names(&sorted), vec!["First", "Second"]);
    }
  }

  #[test]
  fn rarity_ranks() {
    assert_eq!(rarity_rank("common"), 1);
    assert_eq!(rarity_rank("bonus"), 6);
    assert_eq!(rarity_rank("token"), 0);
  }

  #[test]
  fn pages_are_twenty_wide() {
    let items: Vec<usize> = (0..45).collect();
    assert_eq!(total_pages(items.len()), 3);
    assert_eq!(total_pages(0), 0);
    assert_eq!(page_slice(&items, 1), &items[0..20]);
    assert_eq!(page_slice(&items, 3), &items[40..45]);
    assert!(page_slice(&items, 4).is_empty());
    assert_eq!(page_slice(&items, 0), &items[0..20]);
    assert_eq!(showing_range(45, 3), Some((41, 45)));
    assert_eq!(showing_range(45, 4), None);
  }

  #[test]
  fn later_pages_fetch_more_from_the_api() {
    let source = PagedSource::new(30, 75);
    let mut results = ResultSet::open(&source, SearchRequest::new("t:goblin")).unwrap();
    assert_eq!(results.len(), 30);
    assert!(results.has_more());
    assert_eq!(results.total_cards(), 75);

    let page = results.go_to_page(&source, 1).unwrap();
    assert_eq!(page.len(), 20);
    assert_eq!(*source.calls.borrow(), vec![1]);

    let page = results.go_to_page(&source, 2).unwrap();
    assert_eq!(page.len(), 20);
    assert_eq!(*source.calls.borrow(), vec![1, 2]);
    assert_eq!(results.api_page(), 2);

    let page = results.go_to_page(&source, 3).unwrap();
    assert_eq!(page.len(), 20);
    assert_eq!(*source.calls.borrow(), vec![1, 2]);

    let page = results.go_to_page(&source, 4).unwrap();
    assert_eq!(page.len(), 15);
    assert_eq!(*source.calls.borrow(), vec![1, 2, 3]);
    assert!(!results.has_more());
    assert_eq!(results.total_pages(), 4);

    assert!(results.go_to_page(&source, 9).unwrap().is_empty());
    assert_eq!(source.calls.borrow().len(), 3);
  }

  #[test]
  fn changing_sort_returns_to_first_page() {
    let source = PagedSource::new(50, 50);
    let mut results = ResultSet::open(&source, SearchRequest::new("bolt")).unwrap();
    results.go_to_page(&source, 2).unwrap();
    assert_eq!(results.current_page(), 2);

    results.set_sort(SortField::Name, SortDir::Desc);
    assert_eq!(results.current_page(), 1);
    assert_eq!(results.current_cards()[0].name, "Card 049");
  }

  #[test]
  fn failures_clear_the_buffer() {
    assert_eq!(
      ResultSet::open(&FailingSource, SearchRequest::new("bolt")).err(),
      Some("Failed to fetch cards. Please try again.".to_string())
    );

    let source = PagedSource::new(20, 20);
    let mut results = ResultSet::open(&source, SearchRequest::new("bolt")).unwrap();
    assert_eq!(results.len(), 20);
    results.has_more = true;
    assert!(results.go_to_page(&FailingSource, 2).is_err());
    assert!(results.is_empty());
  }

  #[test]
  fn blank_query_is_rejected_without_fetching() {
    let source = PagedSource::new(20, 20);
    let error = ResultSet::open(&source, SearchRequest::new("  ")).err();
    assert_eq!(error, Some("No search query provided".to_string()));
    assert!(source.calls.borrow().is_empty());
  }
}
