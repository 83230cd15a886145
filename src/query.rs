//! Compiles structured search filters into Scryfall search syntax.

use crate::scryfall::{SortDirection, SortOrder, UniqueMode};
use reqwest::Url;

const LINK_BASE: &str = "mtgsearch://search/results";

pub const CARD_TYPES: &[&str] = &[
  "Creature",
  "Instant",
  "Sorcery",
  "Artifact",
  "Enchantment",
  "Planeswalker",
  "Land",
  "Battle",
  "Kindred",
];

pub const FORMATS: &[(&str, &str)] = &[
  ("standard", "Standard"),
  ("pioneer", "Pioneer"),
  ("modern", "Modern"),
  ("legacy", "Legacy"),
  ("vintage", "Vintage"),
  ("commander", "Commander"),
  ("pauper", "Pauper"),
  ("historic", "Historic"),
  ("alchemy", "Alchemy"),
  ("explorer", "Explorer"),
  ("brawl", "Brawl"),
  ("penny", "Penny Dreadful"),
  ("oathbreaker", "Oathbreaker"),
  ("duel", "Duel Commander"),
  ("predh", "PreDH"),
  ("oldschool", "Old School 93/94"),
  ("premodern", "Premodern"),
];

/// Canonical spelling of a card type, matched without regard to case.
pub fn card_type(name: &str) -> Option<&'static str> {
  let name = name.trim();
  CARD_TYPES
    .iter()
    .copied()
    .find(|card_type| card_type.eq_ignore_ascii_case(name))
}

/// Scryfall key of a format, looked up by key or display label.
pub fn format_key(name: &str) -> Option<&'static str> {
  let name = name.trim();
  FORMATS
    .iter()
    .find(|(key, label)| key.eq_ignore_ascii_case(name) || label.eq_ignore_ascii_case(name))
    .map(|(key, _)| *key)
}

keyword_enum! {
  pub enum Color {
    White => ["w", "white"],
    Blue => ["u", "blue"],
    Black => ["b", "black"],
    Red => ["r", "red"],
    Green => ["g", "green"],
    Colorless => ["c", "colorless"],
  }
}

impl Color {
  pub fn letter(self) -> char {
    match self {
      Color::White => 'W',
      Color::Blue => 'U',
      Color::Black => 'B',
      Color::Red => 'R',
      Color::Green => 'G',
      Color::Colorless => 'C',
    }
  }

  pub fn name(self) -> &'static str {
    match self {
      Color::White => "White",
      Color::Blue => "Blue",
      Color::Black => "Black",
      Color::Red => "Red",
      Color::Green => "Green",
      Color::Colorless => "Colorless",
    }
  }

  pub fn from_letter(letter: char) -> Option<Self> {
    Color::ALL
      .iter()
      .copied()
      .find(|color| color.letter() == letter.to_ascii_uppercase())
  }
}

/// Accepts either packed letters (`"WU"`) or separated names
/// (`"white, blue"`). Repeated colors are kept once.
pub fn parse_colors(raw: &str) -> Result<Vec<Color>, String> {
  let trimmed = raw.trim();
  let letters: Option<Vec<Color>> = trimmed.chars().map(Color::from_letter).collect();
  let parsed: Vec<Color> = match letters {
    Some(letters) => letters,
    None => trimmed
      .split(|ch: char| ch == ',' || ch.is_whitespace())
      .filter(|part| !part.is_empty())
      .map(|part| {
        part
          .parse::<Color>()
          .map_err(|_| format!("Unknown color '{}'. Use W, U, B, R, G, C or a color name.", part))
      })
      .collect::<Result<_, _>>()?,
  };

  let mut colors = Vec::new();
  for color in parsed {
    if !colors.contains(&color) {
      colors.push(color);
    }
  }
  Ok(colors)
}

fn color_letters(colors: &[Color]) -> String {
  colors.iter().map(|color| color.letter()).collect()
}

keyword_enum! {
  #[derive(Default)]
  pub enum ColorMode {
    Exact => ["exact", "="],
    #[default]
    Include => ["include", ":"],
    AtMost => ["atmost", "at-most", "<="],
    AtLeast => ["atleast", "at-least", "morethan", ">="],
  }
}

impl ColorMode {
  fn prefix(self) -> &'static str {
    match self {
      ColorMode::Exact => "c=",
      ColorMode::Include => "c:",
      ColorMode::AtMost => "c<=",
      ColorMode::AtLeast => "c>=",
    }
  }
}

keyword_enum! {
  #[derive(Default)]
  pub enum CompareOp {
    #[default]
    Eq => ["=", ":", "=="],
    Lt => ["<"],
    Gt => [">"],
    Le => ["<=", "≤"],
    Ge => [">=", "≥"],
    Ne => ["!=", "≠", "<>"],
  }
}

impl CompareOp {
  /// The comparison sign shown to people, as opposed to the query token.
  pub fn symbol(self) -> &'static str {
    match self {
      CompareOp::Eq => "=",
      CompareOp::Lt => "<",
      CompareOp::Gt => ">",
      CompareOp::Le => "≤",
      CompareOp::Ge => "≥",
      CompareOp::Ne => "≠",
    }
  }
}

/// A numeric filter as entered in the form: an operator plus the raw value.
/// An empty value means the filter is unset.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Comparison {
  pub op: CompareOp,
  pub value: String,
}

impl Comparison {
  pub fn new(op: CompareOp, value: impl Into<String>) -> Self {
    Self {
      op,
      value: value.into(),
    }
  }

  pub fn unset(op: CompareOp) -> Self {
    Self::new(op, "")
  }

  /// Reads `"<=3"`, `">= 2"` or a bare `"3"`; the bare form takes `default_op`.
  pub fn parse(raw: &str, default_op: CompareOp) -> Option<Self> {
    let raw = raw.trim();
    let operators = ["<=", ">=", "!=", "<>", "==", "≤", "≥", "≠", "<", ">", "=", ":"];
    for op in operators {
      if let Some(value) = raw.strip_prefix(op) {
        let value = value.trim();
        if value.is_empty() {
          return None;
        }
        let op_enum = op.parse::<CompareOp>().ok()?;
        return Some(Self::new(op_enum, value));
      }
    }
    if raw.is_empty() {
      return None;
    }
    Some(Self::new(default_op, raw))
  }

  pub fn is_set(&self) -> bool {
    !self.value.trim().is_empty()
  }

  /// Whitespace, quotes and parentheses are dropped from the value so the
  /// comparison stays a single token.
  fn token(&self, key: &str) -> Option<String> {
    let value: String = self
      .value
      .chars()
      .filter(|ch| !ch.is_whitespace() && !matches!(ch, '"' | '(' | ')'))
      .collect();
    if value.is_empty() {
      return None;
    }
    Some(format!("{}{}{}", key, self.op.as_str(), value))
  }
}

keyword_enum! {
  pub enum Rarity {
    Common => ["common", "c"],
    Uncommon => ["uncommon", "u"],
    Rare => ["rare", "r"],
    Mythic => ["mythic", "m"],
    Special => ["special", "s"],
    Bonus => ["bonus", "b"],
  }
}

impl Rarity {
  pub fn label(self) -> &'static str {
    match self {
      Rarity::Common => "Common",
      Rarity::Uncommon => "Uncommon",
      Rarity::Rare => "Rare",
      Rarity::Mythic => "Mythic",
      Rarity::Special => "Special",
      Rarity::Bonus => "Bonus",
    }
  }

  pub fn rank(self) -> u8 {
    match self {
      Rarity::Common => 1,
      Rarity::Uncommon => 2,
      Rarity::Rare => 3,
      Rarity::Mythic => 4,
      Rarity::Special => 5,
      Rarity::Bonus => 6,
    }
  }
}

keyword_enum! {
  #[derive(Default)]
  pub enum Currency {
    #[default]
    Usd => ["usd"],
    Eur => ["eur"],
    Tix => ["tix"],
  }
}

/// Request options passed to the search endpoint next to the query.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchOptions {
  pub unique: UniqueMode,
  pub order: SortOrder,
  pub dir: SortDirection,
  pub include_extras: bool,
  pub include_multilingual: bool,
  pub include_variations: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchForm {
  pub query: String,
  pub options: SearchOptions,
  pub colors: Vec<Color>,
  pub color_identity: Vec<Color>,
  pub color_mode: ColorMode,
  pub types: Vec<String>,
  pub subtypes: String,
  pub oracle_text: String,
  pub flavor_text: String,
  pub mana_value: Comparison,
  pub power: Comparison,
  pub toughness: Comparison,
  pub loyalty: Comparison,
  pub rarities: Vec<Rarity>,
  pub sets: String,
  pub formats: Vec<String>,
  pub legal_in: String,
  pub price: Comparison,
  pub price_currency: Currency,
  pub artist: String,
  pub year: Comparison,
  pub is_full_art: bool,
  pub is_promo: bool,
  pub is_reprint: bool,
}

impl Default for SearchForm {
  fn default() -> Self {
    Self {
      query: String::new(),
      options: SearchOptions::default(),
      colors: Vec::new(),
      color_identity: Vec::new(),
      color_mode: ColorMode::Include,
      types: Vec::new(),
      subtypes: String::new(),
      oracle_text: String::new(),
      flavor_text: String::new(),
      mana_value: Comparison::unset(CompareOp::Eq),
      power: Comparison::unset(CompareOp::Eq),
      toughness: Comparison::unset(CompareOp::Eq),
      loyalty: Comparison::unset(CompareOp::Eq),
      rarities: Vec::new(),
      sets: String::new(),
      formats: Vec::new(),
      legal_in: String::new(),
      price: Comparison::unset(CompareOp::Le),
      price_currency: Currency::Usd,
      artist: String::new(),
      year: Comparison::unset(CompareOp::Eq),
      is_full_art: false,
      is_promo: false,
      is_reprint: false,
    }
  }
}

fn non_empty(value: &str) -> Option<&str> {
  let trimmed = value.trim();
  if trimmed.is_empty() {
    None
  } else {
    Some(trimmed)
  }
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
  value.split(',').map(str::trim).filter(|item| !item.is_empty())
}

// Embedded double quotes would end the quoted value early, so they are dropped.
fn quoted(text: &str) -> Option<String> {
  let cleaned = text.replace('"', "");
  let cleaned = cleaned.trim();
  if cleaned.is_empty() {
    return None;
  }
  Some(format!("\"{}\"", cleaned))
}

// Whitespace and parentheses split tokens when the query is read back, so
// values holding either are quoted.
fn field_value(text: &str) -> Option<String> {
  let cleaned = text.replace('"', "");
  let cleaned = cleaned.trim();
  if cleaned.is_empty() {
    return None;
  }
  if cleaned.contains(|ch: char| ch.is_whitespace() || ch == '(' || ch == ')') {
    quoted(cleaned)
  } else {
    Some(cleaned.to_string())
  }
}

/// Drops the last double quote when the count is odd so a stray quote cannot
/// swallow the tokens after it.
fn balance_quotes(text: &str) -> String {
  let mut balanced = text.to_string();
  if balanced.matches('"').count() % 2 == 1 {
    if let Some(index) = balanced.rfind('"') {
      balanced.remove(index);
    }
  }
  balanced
}

pub fn compile(form: &SearchForm) -> String {
  let mut parts: Vec<String> = Vec::new();

  if let Some(query) = non_empty(&form.query) {
    let query = balance_quotes(query);
    if let Some(query) = non_empty(&query) {
      parts.push(query.to_string());
    }
  }

  if !form.colors.is_empty() {
    parts.push(format!("{}{}", form.color_mode.prefix(), color_letters(&form.colors)));
  }
  if !form.color_identity.is_empty() {
    parts.push(format!("id:{}", color_letters(&form.color_identity)));
  }

  for card_type in form.types.iter().filter_map(|card_type| field_value(&card_type.to_lowercase())) {
    parts.push(format!("t:{}", card_type));
  }
  for subtype in split_list(&form.subtypes).filter_map(field_value) {
    parts.push(format!("t:{}", subtype));
  }

  if let Some(text) = quoted(&form.oracle_text) {
    parts.push(format!("o:{}", text));
  }
  if let Some(text) = quoted(&form.flavor_text) {
    parts.push(format!("ft:{}", text));
  }

  let stats = [
    ("mv", &form.mana_value),
    ("pow", &form.power),
    ("tou", &form.toughness),
    ("loy", &form.loyalty),
  ];
  parts.extend(stats.iter().filter_map(|(key, comparison)| comparison.token(key)));

  match form.rarities.as_slice() {
    [] => {}
    [rarity] => parts.push(format!("r:{}", rarity.as_str())),
    rarities => {
      let alternatives: Vec<String> = rarities
        .iter()
        .map(|rarity| format!("r:{}", rarity.as_str()))
        .collect();
      parts.push(format!("({})", alternatives.join(" OR ")));
    }
  }

  for set in split_list(&form.sets).filter_map(field_value) {
    parts.push(format!("e:{}", set));
  }
  for format in form.formats.iter().filter_map(|format| field_value(format)) {
    parts.push(format!("f:{}", format));
  }
  if let Some(format) = field_value(&form.legal_in) {
    parts.push(format!("legal:{}", format));
  }

  if let Some(token) = form.price.token(form.price_currency.as_str()) {
    parts.push(token);
  }
  if let Some(artist) = quoted(&form.artist) {
    parts.push(format!("a:{}", artist));
  }
  if let Some(token) = form.year.token("year") {
    parts.push(token);
  }

  if form.is_full_art {
    parts.push("is:full".to_string());
  }
  if form.is_promo {
    parts.push("is:promo".to_string());
  }
  if form.is_reprint {
    parts.push("is:reprint".to_string());
  }

  parts.join(" ")
}

/// A compiled query plus the options it is sent with. This is also the
/// state carried by a results link.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SearchRequest {
  pub query: String,
  pub options: SearchOptions,
}

impl SearchRequest {
  pub fn new(query: impl Into<String>) -> Self {
    Self {
      query: query.into(),
      options: SearchOptions::default(),
    }
  }

  /// `None` when the form compiles to a blank query.
  pub fn from_form(form: &SearchForm) -> Option<Self> {
    let query = compile(form);
    if query.trim().is_empty() {
      return None;
    }
    Some(Self {
      query,
      options: form.options.clone(),
    })
  }

  fn flag_pairs(&self) -> Vec<(&'static str, String)> {
    let flags = [
      ("include_extras", self.options.include_extras),
      ("include_multilingual", self.options.include_multilingual),
      ("include_variations", self.options.include_variations),
    ];
    flags
      .iter()
      .filter(|(_, enabled)| *enabled)
      .map(|(key, _)| (*key, "true".to_string()))
      .collect()
  }

  pub fn link_pairs(&self) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
      ("q", self.query.clone()),
      ("unique", self.options.unique.to_string()),
      ("order", self.options.order.to_string()),
      ("dir", self.options.dir.to_string()),
    ];
    pairs.extend(self.flag_pairs());
    pairs
  }

  pub fn api_pairs(&self, page: u32) -> Vec<(&'static str, String)> {
    let mut pairs = vec![
      ("q", self.query.clone()),
      ("unique", self.options.unique.to_string()),
      ("order", self.options.order.to_string()),
      ("dir", self.options.dir.to_string()),
      ("page", page.to_string()),
      ("format", "json".to_string()),
    ];
    pairs.extend(self.flag_pairs());
    pairs
  }

  /// Missing or unrecognized values fall back to the defaults; a flag is on
  /// only when its value is exactly `true`.
  pub fn from_pairs<I, K, V>(pairs: I) -> Self
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut request = Self::default();
    for (key, value) in pairs {
      let value = value.as_ref();
      match key.as_ref() {
        "q" => request.query = value.to_string(),
        "unique" => request.options.unique = parse_or_default(value),
        "order" => request.options.order = parse_or_default(value),
        "dir" => request.options.dir = parse_or_default(value),
        "include_extras" => request.options.include_extras = value == "true",
        "include_multilingual" => request.options.include_multilingual = value == "true",
        "include_variations" => request.options.include_variations = value == "true",
        _ => {}
      }
    }
    request
  }

  pub fn to_link(&self) -> Result<String, String> {
    let mut url = Url::parse(LINK_BASE).map_err(|e| e.to_string())?;
    url.query_pairs_mut().extend_pairs(self.link_pairs());
    Ok(url.to_string())
  }

  /// Accepts a full link or just its query string.
  pub fn from_link(link: &str) -> Result<Self, String> {
    let trimmed = link.trim();
    let url = if trimmed.contains("://") {
      Url::parse(trimmed)
    } else {
      Url::parse(&format!("{}?{}", LINK_BASE, trimmed.trim_start_matches('?')))
    }
    .map_err(|e| format!("Invalid search link '{}': {}", trimmed, e))?;
    Ok(Self::from_pairs(url.query_pairs()))
  }
}

fn parse_or_default<T>(value: &str) -> T
where
  T: std::str::FromStr<Err = String> + Default,
{
  value.parse().unwrap_or_else(|error: String| {
    log::warn!("{} Using the default.", error);
    T::default()
  })
}
