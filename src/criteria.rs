//! Turns a Scryfall query string back into labeled, human-readable criteria.

use crate::query::{Color, CompareOp, Rarity};
use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::OnceLock;

pub const NAME_LABEL: &str = "Name";

const OP: &str = "(>=|<=|!=|=|:|<|>)";
const NUMBER: &str = r"\d+(?:\.\d*)?|\.\d+";

#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Criterion {
  pub label: String,
  pub value: String,
}

impl Criterion {
  pub fn new(label: impl Into<String>, value: impl Into<String>) -> Self {
    Self {
      label: label.into(),
      value: value.into(),
    }
  }
}

#[derive(Clone, Copy)]
enum ValueKind {
  Text,
  Colors,
  Rarity,
  Comparison,
  Fixed(&'static str),
}

struct FieldPattern {
  label: &'static str,
  regex: Regex,
  kind: ValueKind,
}

impl FieldPattern {
  fn describe(&self, token: &str) -> Option<String> {
    let captures = self.regex.captures(token)?;
    let groups: Vec<&str> = captures
      .iter()
      .skip(1)
      .flatten()
      .map(|group| group.as_str())
      .collect();

    let value = match self.kind {
      ValueKind::Fixed(value) => value.to_string(),
      ValueKind::Text => groups.first()?.replace('"', ""),
      ValueKind::Colors => color_names(groups.get(1)?),
      ValueKind::Rarity => rarity_label(groups.first()?),
      ValueKind::Comparison => {
        let op = groups.first()?.parse::<CompareOp>().ok()?;
        format!("{} {}", op.symbol(), groups.get(1)?)
      }
    };
    Some(value)
  }
}

fn pattern(label: &'static str, source: &str, kind: ValueKind) -> Option<FieldPattern> {
  let regex = RegexBuilder::new(&format!("^(?:{})$", source))
    .case_insensitive(true)
    .build();
  match regex {
    Ok(regex) => Some(FieldPattern { label, regex, kind }),
    Err(error) => {
      log::error!("field pattern for {} does not compile: {}", label, error);
      None
    }
  }
}

fn comparison(label: &'static str, keys: &str, value: &str) -> Option<FieldPattern> {
  pattern(
    label,
    &format!("(?:{}){}({})", keys, OP, value),
    ValueKind::Comparison,
  )
}

fn text(label: &'static str, keys: &str, separator: &str) -> Option<FieldPattern> {
  pattern(
    label,
    &format!(r#"(?:{}){}(?:"([^"]*)"|([^\s"]+))"#, keys, separator),
    ValueKind::Text,
  )
}

// Order here is the order criteria are reported in.
fn field_patterns() -> &'static [FieldPattern] {
  static PATTERNS: OnceLock<Vec<FieldPattern>> = OnceLock::new();
  PATTERNS.get_or_init(|| {
    vec![
      pattern("Colors", &format!("(?:c|color|colors){}([wubrgc]+)", OP), ValueKind::Colors),
      pattern(
        "Color Identity",
        &format!("(?:id|identity|ci){}([wubrgc]+)", OP),
        ValueKind::Colors,
      ),
      text("Type", "t|type", ":"),
      text("Text contains", "o|oracle", ":"),
      comparison("Mana Value", "mv|cmc|manavalue", NUMBER),
      comparison("Power", "pow|power", &format!(r"{}|\*|x", NUMBER)),
      comparison("Toughness", "tou|toughness", &format!(r"{}|\*|x", NUMBER)),
      comparison("Loyalty", "loy|loyalty", &format!("{}|x", NUMBER)),
      pattern("Rarity", r"(?:r|rarity)[:=](\w+)", ValueKind::Rarity),
      text("Set", "e|s|set|edition", "[:=]"),
      text("Format", "f|format", ":"),
      text("Legal in", "legal", ":"),
      comparison("Price USD", "usd", NUMBER),
      comparison("Price EUR", "eur", NUMBER),
      comparison("Price TIX", "tix", NUMBER),
      text("Artist", "a|artist", ":"),
      comparison("Year", "year", r"\d+"),
      text("Flavor text", "ft|flavor", ":"),
      pattern("Special", "is:full|is:fullart", ValueKind::Fixed("Full Art")),
      pattern("Special", "is:promo", ValueKind::Fixed("Promo")),
      pattern("Special", "is:reprint", ValueKind::Fixed("Reprint")),
    ]
    .into_iter()
    .flatten()
    .collect()
  })
}

fn color_names(letters: &str) -> String {
  letters
    .chars()
    .map(|letter| match Color::from_letter(letter) {
      Some(color) => color.name().to_string(),
      None => letter.to_string(),
    })
    .collect::<Vec<_>>()
    .join(", ")
}

fn rarity_label(value: &str) -> String {
  match value.parse::<Rarity>() {
    Ok(rarity) => rarity.label().to_string(),
    Err(_) => value.to_string(),
  }
}

/// Splits on whitespace outside double quotes. Parentheses become tokens of
/// their own so grouped alternatives still match field by field.
pub fn tokenize(query: &str) -> Vec<String> {
  let mut tokens = Vec::new();
  let mut current = String::new();
  let mut in_quotes = false;

  for ch in query.chars() {
    match ch {
      '"' => {
        in_quotes = !in_quotes;
        current.push(ch);
      }
      '(' | ')' if !in_quotes => {
        if !current.is_empty() {
          tokens.push(std::mem::take(&mut current));
        }
        tokens.push(ch.to_string());
      }
      ch if ch.is_whitespace() && !in_quotes => {
        if !current.is_empty() {
          tokens.push(std::mem::take(&mut current));
        }
      }
      _ => current.push(ch),
    }
  }
  if !current.is_empty() {
    tokens.push(current);
  }
  tokens
}

fn is_connective(token: &str) -> bool {
  token == "(" || token == ")" || token.eq_ignore_ascii_case("or") || token.eq_ignore_ascii_case("and")
}

/// Labels every recognized field token. Whatever is left over is reported
/// first, as a single `Name` criterion.
pub fn decompile(query: &str) -> Vec<Criterion> {
  let patterns = field_patterns();
  let mut matched: Vec<(usize, Criterion)> = Vec::new();
  let mut leftover: Vec<String> = Vec::new();

  for token in tokenize(query) {
    if is_connective(&token) {
      continue;
    }
    let hit = patterns.iter().enumerate().find_map(|(index, field)| {
      field
        .describe(&token)
        .map(|value| (index, Criterion::new(field.label, value)))
    });
    match hit {
      Some(hit) => matched.push(hit),
      None => {
        let word = token.replace('"', "");
        if !word.trim().is_empty() {
          leftover.push(word);
        }
      }
    }
  }

  matched.sort_by_key(|(index, _)| *index);

  let mut criteria: Vec<Criterion> = Vec::new();
  let name = leftover.join(" ");
  let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
  if !name.is_empty() {
    criteria.push(Criterion::new(NAME_LABEL, name));
  }
  for (_, criterion) in matched {
    if !criteria.contains(&criterion) {
      criteria.push(criterion);
    }
  }
  criteria
}
