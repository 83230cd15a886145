//! Scryfall API records and the blocking HTTP client that fetches them.

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::query::SearchRequest;
use crate::results::CardSource;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const SEARCH_FAILED_MESSAGE: &str = "Failed to fetch cards. Please try again.";
const CARD_FAILED_MESSAGE: &str = "Failed to fetch card details.";
const LEGAL_FORMATS_SHOWN: usize = 8;

keyword_enum! {
  #[derive(Default)]
  pub enum UniqueMode {
    #[default]
    Cards => ["cards"],
    Art => ["art"],
    Prints => ["prints"],
  }
}

keyword_enum! {
  #[derive(Default)]
  pub enum SortOrder {
    #[default]
    Name => ["name"],
    Set => ["set"],
    Released => ["released"],
    Rarity => ["rarity"],
    Color => ["color"],
    Usd => ["usd"],
    Tix => ["tix"],
    Eur => ["eur"],
    Cmc => ["cmc"],
    Power => ["power"],
    Toughness => ["toughness"],
    Edhrec => ["edhrec"],
    Penny => ["penny"],
    Artist => ["artist"],
    Review => ["review"],
  }
}

keyword_enum! {
  #[derive(Default)]
  pub enum SortDirection {
    #[default]
    Auto => ["auto"],
    Asc => ["asc"],
    Desc => ["desc"],
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ImageUris {
  #[serde(default)]
  pub small: Option<String>,
  #[serde(default)]
  pub normal: Option<String>,
  #[serde(default)]
  pub large: Option<String>,
  #[serde(default)]
  pub png: Option<String>,
  #[serde(default)]
  pub art_crop: Option<String>,
  #[serde(default)]
  pub border_crop: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CardFace {
  pub name: String,
  #[serde(default)]
  pub mana_cost: Option<String>,
  #[serde(default)]
  pub type_line: Option<String>,
  #[serde(default)]
  pub oracle_text: Option<String>,
  #[serde(default)]
  pub colors: Option<Vec<String>>,
  #[serde(default)]
  pub power: Option<String>,
  #[serde(default)]
  pub toughness: Option<String>,
  #[serde(default)]
  pub loyalty: Option<String>,
  #[serde(default)]
  pub flavor_text: Option<String>,
  #[serde(default)]
  pub artist: Option<String>,
  #[serde(default)]
  pub image_uris: Option<ImageUris>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Prices {
  #[serde(default)]
  pub usd: Option<String>,
  #[serde(default)]
  pub usd_foil: Option<String>,
  #[serde(default)]
  pub usd_etched: Option<String>,
  #[serde(default)]
  pub eur: Option<String>,
  #[serde(default)]
  pub eur_foil: Option<String>,
  #[serde(default)]
  pub tix: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct Card {
  pub id: String,
  #[serde(default)]
  pub oracle_id: Option<String>,
  pub name: String,
  #[serde(default)]
  pub lang: String,
  #[serde(default)]
  pub released_at: String,
  #[serde(default)]
  pub uri: String,
  #[serde(default)]
  pub scryfall_uri: String,
  #[serde(default)]
  pub layout: String,
  #[serde(default)]
  pub image_uris: Option<ImageUris>,
  #[serde(default)]
  pub mana_cost: Option<String>,
  #[serde(default)]
  pub cmc: f64,
  #[serde(default)]
  pub type_line: String,
  #[serde(default)]
  pub oracle_text: Option<String>,
  #[serde(default)]
  pub power: Option<String>,
  #[serde(default)]
  pub toughness: Option<String>,
  #[serde(default)]
  pub loyalty: Option<String>,
  #[serde(default)]
  pub colors: Option<Vec<String>>,
  #[serde(default)]
  pub color_identity: Vec<String>,
  #[serde(default)]
  pub keywords: Vec<String>,
  #[serde(default)]
  pub legalities: BTreeMap<String, String>,
  #[serde(default)]
  pub reserved: bool,
  #[serde(default)]
  pub promo: bool,
  #[serde(default)]
  pub reprint: bool,
  #[serde(default)]
  pub full_art: bool,
  #[serde(default)]
  pub digital: bool,
  #[serde(default)]
  pub set: String,
  #[serde(default)]
  pub set_name: String,
  #[serde(default)]
  pub set_type: String,
  #[serde(default)]
  pub collector_number: String,
  #[serde(default)]
  pub rarity: String,
  #[serde(default)]
  pub flavor_text: Option<String>,
  #[serde(default)]
  pub artist: Option<String>,
  #[serde(default)]
  pub border_color: String,
  #[serde(default)]
  pub frame: String,
  #[serde(default)]
  pub edhrec_rank: Option<u64>,
  #[serde(default)]
  pub penny_rank: Option<u64>,
  #[serde(default)]
  pub prices: Prices,
  #[serde(default)]
  pub card_faces: Option<Vec<CardFace>>,
}

impl Card {
  fn first_face_images(&self) -> Option<&ImageUris> {
    self
      .card_faces
      .as_ref()
      .and_then(|faces| faces.first())
      .and_then(|face| face.image_uris.as_ref())
  }

  /// Normal-sized image, falling back to the first face for double-faced cards.
  pub fn image_uri(&self) -> Option<&str> {
    self
      .image_uris
      .as_ref()
      .and_then(|uris| uris.normal.as_deref())
      .or_else(|| self.first_face_images().and_then(|uris| uris.normal.as_deref()))
  }

  pub fn detail_image_uri(&self) -> Option<&str> {
    let own = self.image_uris.as_ref();
    let face = self.first_face_images();
    own
      .and_then(|uris| uris.large.as_deref())
      .or_else(|| own.and_then(|uris| uris.normal.as_deref()))
      .or_else(|| face.and_then(|uris| uris.large.as_deref()))
      .or_else(|| face.and_then(|uris| uris.normal.as_deref()))
  }

  pub fn usd_price(&self) -> Option<f64> {
    parse_price(self.prices.usd.as_deref())
  }

  pub fn legal_formats(&self) -> Vec<&str> {
    self
      .legalities
      .iter()
      .filter(|(_, status)| status.as_str() == "legal")
      .map(|(format, _)| format.as_str())
      .take(LEGAL_FORMATS_SHOWN)
      .collect()
  }
}

pub(crate) fn parse_price(value: Option<&str>) -> Option<f64> {
  value
    .map(str::trim)
    .filter(|text| !text.is_empty())
    .and_then(|text| text.parse::<f64>().ok())
    .filter(|price| price.is_finite())
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct CardList {
  #[serde(default)]
  pub total_cards: u64,
  #[serde(default)]
  pub has_more: bool,
  #[serde(default)]
  pub next_page: Option<String>,
  #[serde(default)]
  pub data: Vec<Card>,
  #[serde(default)]
  pub warnings: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ApiError {
  #[serde(default)]
  pub code: String,
  #[serde(default)]
  pub status: u16,
  #[serde(default)]
  pub details: String,
  #[serde(default)]
  pub warnings: Option<Vec<String>>,
}

enum DecodeError {
  /// Scryfall answered with an error object.
  Api(String),
  /// The body is not the JSON we expect.
  Malformed(String),
}

impl DecodeError {
  fn into_message(self) -> String {
    match self {
      DecodeError::Api(message) | DecodeError::Malformed(message) => message,
    }
  }
}

fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T, DecodeError> {
  let malformed = |e: serde_json::Error| DecodeError::Malformed(e.to_string());
  let value: serde_json::Value = serde_json::from_str(body).map_err(malformed)?;
  if value.get("object").and_then(|object| object.as_str()) == Some("error") {
    let error: ApiError = serde_json::from_value(value).map_err(malformed)?;
    if error.details.trim().is_empty() {
      return Err(DecodeError::Api(format!(
        "Scryfall returned error '{}' ({}).",
        error.code, error.status
      )));
    }
    return Err(DecodeError::Api(error.details));
  }
  serde_json::from_value(value).map_err(malformed)
}

/// Decodes a Scryfall response body. Bodies tagged `"object": "error"`
/// become the API's `details` text.
pub fn decode_response<T: DeserializeOwned>(body: &str) -> Result<T, String> {
  decode_body(body).map_err(DecodeError::into_message)
}

/// Like `decode_response`, but a body that does not decode is logged and
/// reported as `fallback`.
fn decode_or<T: DeserializeOwned>(url: &Url, body: &str, fallback: &str) -> Result<T, String> {
  decode_body(body).map_err(|error| match error {
    DecodeError::Api(message) => message,
    DecodeError::Malformed(message) => {
      log::warn!("unreadable response from {}: {}", url, message);
      fallback.to_string()
    }
  })
}

pub struct ScryfallClient {
  client: Client,
  base_url: Url,
  cache: Option<ResponseCache>,
}

impl ScryfallClient {
  pub fn new(config: &Config) -> Result<Self, String> {
    let client = Client::builder()
      .timeout(config.request_timeout)
      .build()
      .map_err(|e| e.to_string())?;
    let base_url = Url::parse(&config.api_base_url)
      .map_err(|e| format!("Invalid API base URL '{}': {}", config.api_base_url, e))?;
    let cache = if config.use_cache {
      Some(ResponseCache::new(config.cache_dir(), config.cache_max_age))
    } else {
      None
    };

    Ok(Self {
      client,
      base_url,
      cache,
    })
  }

  fn endpoint(&self, segments: &[&str]) -> Result<Url, String> {
    let mut url = self.base_url.clone();
    url
      .path_segments_mut()
      .map_err(|_| format!("API base URL '{}' cannot carry a path.", self.base_url))?
      .pop_if_empty()
      .extend(segments);
    Ok(url)
  }

  pub fn search_url(&self, request: &SearchRequest, page: u32) -> Result<Url, String> {
    let mut url = self.endpoint(&["cards", "search"])?;
    url.query_pairs_mut().extend_pairs(request.api_pairs(page));
    Ok(url)
  }

  pub fn card_url(&self, id: &str) -> Result<Url, String> {
    self.endpoint(&["cards", id.trim()])
  }

  pub fn search(&self, request: &SearchRequest, page: u32) -> Result<CardList, String> {
    let url = self.search_url(request, page)?;
    let body = self.fetch_body(&url).map_err(|error| {
      log::warn!("search request {} failed: {}", url, error);
      SEARCH_FAILED_MESSAGE.to_string()
    })?;
    let list: CardList = decode_or(&url, &body, SEARCH_FAILED_MESSAGE)?;
    log::debug!(
      "page {} of '{}' returned {} of {} cards",
      page,
      request.query,
      list.data.len(),
      list.total_cards
    );
    Ok(list)
  }

  pub fn card(&self, id: &str) -> Result<Card, String> {
    if id.trim().is_empty() {
      return Err("No card ID provided".to_string());
    }
    let url = self.card_url(id)?;
    let body = self.fetch_body(&url).map_err(|error| {
      log::warn!("card request {} failed: {}", url, error);
      CARD_FAILED_MESSAGE.to_string()
    })?;
    decode_or(&url, &body, CARD_FAILED_MESSAGE)
  }

  // Error bodies are returned to the caller uncached so `decode_response`
  // can surface Scryfall's message.
  fn fetch_body(&self, url: &Url) -> Result<String, String> {
    if let Some(cache) = &self.cache {
      if let Some(body) = cache.load(url.as_str()) {
        log::debug!("cache hit for {}", url);
        return Ok(body);
      }
    }

    let response = self
      .client
      .get(url.clone())
      .header(
        USER_AGENT,
        concat!("mtgsearch/", env!("CARGO_PKG_VERSION")),
      )
      .header(ACCEPT, "application/json;q=0.9,*/*;q=0.8")
      .send()
      .map_err(|e| e.to_string())?;

    let status = response.status();
    let body = response.text().map_err(|e| e.to_string())?;

    if status.is_success() {
      if let Some(cache) = &self.cache {
        cache.store(url.as_str(), &body);
      }
      return Ok(body);
    }

    let looks_like_json = body.trim_start().starts_with('{');
    if looks_like_json {
      return Ok(body);
    }
    Err(format!("Scryfall request failed with status {}", status))
  }
}

impl CardSource for ScryfallClient {
  fn fetch_page(&self, request: &SearchRequest, page: u32) -> Result<CardList, String> {
    self.search(request, page)
  }
}
