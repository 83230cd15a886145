use crate::query::{
  card_type, format_key, parse_colors, ColorMode, CompareOp, Comparison, Currency, Rarity,
  SearchForm, SearchOptions, CARD_TYPES, FORMATS,
};
use crate::results::{SortDir, SortField};
use crate::scryfall::{SortDirection, SortOrder, UniqueMode};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "mtgsearch", version, about = "Search Scryfall and keep a list of favorite cards")]
pub struct Cli {
  /// Directory holding the favorites database and the response cache.
  #[arg(long, global = true, env = "MTGSEARCH_DATA_DIR")]
  pub data_dir: Option<PathBuf>,
  #[arg(long, global = true, env = "MTGSEARCH_API_BASE_URL")]
  pub api_base_url: Option<String>,
  /// Always hit the API instead of reusing cached responses.
  #[arg(long, global = true)]
  pub no_cache: bool,
  #[arg(short, long, global = true)]
  pub verbose: bool,
  #[command(subcommand)]
  pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
  /// Print the Scryfall query the given filters compile to.
  Query(FormArgs),
  /// Break a Scryfall query down into readable criteria.
  Describe { query: String },
  /// Run a search and print one page of results.
  Search(SearchArgs),
  /// Show everything about a single card.
  Card {
    id: String,
    #[arg(long)]
    toggle_favorite: bool,
  },
  #[command(subcommand)]
  Favorites(FavoritesCommand),
}

#[derive(Subcommand, Debug)]
pub enum FavoritesCommand {
  List {
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value = "added")]
    sort: SortField,
    #[arg(long, default_value = "desc")]
    dir: SortDir,
  },
  /// Fetch a card by id and add it.
  Add { id: String },
  Remove { id: String },
  Toggle { id: String },
  Clear {
    /// Required, since clearing cannot be undone.
    #[arg(long)]
    yes: bool,
  },
  Export { path: PathBuf },
  Import { path: PathBuf },
}

#[derive(Args, Debug)]
pub struct SearchArgs {
  #[command(flatten)]
  pub form: FormArgs,
  /// A results link produced by an earlier search; overrides the filters.
  #[arg(long)]
  pub url: Option<String>,
  #[arg(long, default_value_t = 1)]
  pub page: usize,
  #[arg(long, default_value = "name")]
  pub sort: SortField,
  #[arg(long, default_value = "asc")]
  pub dir: SortDir,
}

/// Every filter of the search form as a flag. Comparisons take an optional
/// leading operator, e.g. `--mv ">=3"` or `--price 5`.
#[derive(Args, Debug)]
pub struct FormArgs {
  /// Card name or any raw Scryfall syntax.
  #[arg(short = 'n', long = "name")]
  pub query: Option<String>,
  /// Letters (`WU`) or names (`white,blue`).
  #[arg(long)]
  pub colors: Option<String>,
  #[arg(long, default_value = "include")]
  pub color_mode: ColorMode,
  #[arg(long)]
  pub identity: Option<String>,
  #[arg(short = 't', long = "type")]
  pub types: Vec<String>,
  /// Comma-separated subtypes.
  #[arg(long)]
  pub subtypes: Option<String>,
  #[arg(short = 'o', long)]
  pub oracle: Option<String>,
  #[arg(long)]
  pub flavor: Option<String>,
  #[arg(long)]
  pub mv: Option<String>,
  #[arg(long)]
  pub power: Option<String>,
  #[arg(long)]
  pub toughness: Option<String>,
  #[arg(long)]
  pub loyalty: Option<String>,
  #[arg(short = 'r', long = "rarity")]
  pub rarities: Vec<Rarity>,
  /// Comma-separated set codes.
  #[arg(long)]
  pub sets: Option<String>,
  #[arg(short = 'f', long = "format")]
  pub formats: Vec<String>,
  #[arg(long)]
  pub legal: Option<String>,
  /// Defaults to `<=` when no operator is given.
  #[arg(long)]
  pub price: Option<String>,
  #[arg(long, default_value = "usd")]
  pub currency: Currency,
  #[arg(long)]
  pub artist: Option<String>,
  #[arg(long)]
  pub year: Option<String>,
  #[arg(long)]
  pub full_art: bool,
  #[arg(long)]
  pub promo: bool,
  #[arg(long)]
  pub reprint: bool,
  #[arg(long, default_value = "cards")]
  pub unique: UniqueMode,
  #[arg(long, default_value = "name")]
  pub order: SortOrder,
  #[arg(long, default_value = "auto")]
  pub direction: SortDirection,
  #[arg(long)]
  pub include_extras: bool,
  #[arg(long)]
  pub include_multilingual: bool,
  #[arg(long)]
  pub include_variations: bool,
}

/// What a comparison flag accepts after its operator.
#[derive(Clone, Copy)]
enum Operand {
  /// A whole number.
  Integer,
  /// A decimal number, plus any of the listed words.
  Number(&'static [&'static str]),
}

impl Operand {
  fn accepts(self, value: &str) -> bool {
    match self {
      Operand::Integer => !value.is_empty() && value.chars().all(|ch| ch.is_ascii_digit()),
      Operand::Number(words) => {
        is_decimal(value) || words.iter().any(|word| word.eq_ignore_ascii_case(value))
      }
    }
  }
}

fn is_decimal(value: &str) -> bool {
  let mut parts = value.splitn(2, '.');
  let whole = parts.next().unwrap_or_default();
  let fraction = parts.next().unwrap_or_default();
  let digits = |part: &str| part.chars().all(|ch| ch.is_ascii_digit());
  !(whole.is_empty() && fraction.is_empty()) && digits(whole) && digits(fraction)
}

fn comparison_arg(
  flag: &str,
  raw: Option<&str>,
  default_op: CompareOp,
  operand: Operand,
) -> Result<Comparison, String> {
  match raw.map(str::trim).filter(|raw| !raw.is_empty()) {
    None => Ok(Comparison::unset(default_op)),
    Some(raw) => Comparison::parse(raw, default_op)
      .filter(|comparison| operand.accepts(comparison.value.trim()))
      .ok_or_else(|| format!("Invalid comparison '{}' for --{}.", raw, flag)),
  }
}

const STAT: Operand = Operand::Number(&["*", "x"]);

fn unknown_value(kind: &str, value: &str, known: &[&str]) -> String {
  format!("Unknown {} '{}'. Expected one of: {}.", kind, value, known.join(", "))
}

fn format_arg(value: &str) -> Result<String, String> {
  format_key(value).map(str::to_string).ok_or_else(|| {
    let keys: Vec<&str> = FORMATS.iter().map(|(key, _)| *key).collect();
    unknown_value("format", value, &keys)
  })
}

fn text_arg(raw: Option<&str>) -> String {
  raw.unwrap_or_default().to_string()
}

impl FormArgs {
  pub fn to_form(&self) -> Result<SearchForm, String> {
    let colors = match self.colors.as_deref() {
      Some(raw) => parse_colors(raw)?,
      None => Vec::new(),
    };
    let color_identity = match self.identity.as_deref() {
      Some(raw) => parse_colors(raw)?,
      None => Vec::new(),
    };

    let mut types = Vec::new();
    for raw in &self.types {
      let card_type =
        card_type(raw).ok_or_else(|| unknown_value("card type", raw, CARD_TYPES))?;
      types.push(card_type.to_string());
    }
    let formats = self
      .formats
      .iter()
      .map(|raw| format_arg(raw))
      .collect::<Result<Vec<_>, _>>()?;
    let legal_in = match self.legal.as_deref().map(str::trim).filter(|raw| !raw.is_empty()) {
      Some(raw) => format_arg(raw)?,
      None => String::new(),
    };

    let mut rarities = Vec::new();
    for rarity in &self.rarities {
      if !rarities.contains(rarity) {
        rarities.push(*rarity);
      }
    }

    Ok(SearchForm {
      query: text_arg(self.query.as_deref()),
      options: SearchOptions {
        unique: self.unique,
        order: self.order,
        dir: self.direction,
        include_extras: self.include_extras,
        include_multilingual: self.include_multilingual,
        include_variations: self.include_variations,
      },
      colors,
      color_identity,
      color_mode: self.color_mode,
      types,
      subtypes: text_arg(self.subtypes.as_deref()),
      oracle_text: text_arg(self.oracle.as_deref()),
      flavor_text: text_arg(self.flavor.as_deref()),
      mana_value: comparison_arg("mv", self.mv.as_deref(), CompareOp::Eq, Operand::Number(&[]))?,
      power: comparison_arg("power", self.power.as_deref(), CompareOp::Eq, STAT)?,
      toughness: comparison_arg("toughness", self.toughness.as_deref(), CompareOp::Eq, STAT)?,
      loyalty: comparison_arg(
        "loyalty",
        self.loyalty.as_deref(),
        CompareOp::Eq,
        Operand::Number(&["x"]),
      )?,
      rarities,
      sets: text_arg(self.sets.as_deref()),
      formats,
      legal_in,
      price: comparison_arg("price", self.price.as_deref(), CompareOp::Le, Operand::Number(&[]))?,
      price_currency: self.currency,
      artist: text_arg(self.artist.as_deref()),
      year: comparison_arg("year", self.year.as_deref(), CompareOp::Eq, Operand::Integer)?,
      is_full_art: self.full_art,
      is_promo: self.promo,
      is_reprint: self.reprint,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::query::{compile, Color};

  fn parse(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("mtgsearch").chain(args.iter().copied())).unwrap()
  }

  fn form_of(args: &[&str]) -> SearchForm {
    match parse(args).command {
      Command::Query(form) => form.to_form().unwrap(),
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn form_flags_build_the_form() {
    let form = form_of(&[
      "query", "-n", "bolt", "--colors", "red", "--color-mode", "atmost", "-t", "Instant",
      "--mv", "<=1", "--price", "2", "-r", "c", "-r", "common", "-r", "u",
    ]);
    assert_eq!(form.query, "bolt");
    assert_eq!(form.colors, vec![Color::Red]);
    assert_eq!(form.color_mode, ColorMode::AtMost);
    assert_eq!(form.mana_value, Comparison::new(CompareOp::Le, "1"));
    assert_eq!(form.price, Comparison::new(CompareOp::Le, "2"));
    assert_eq!(form.rarities, vec![Rarity::Common, Rarity::Uncommon]);
    assert_eq!(
      compile(&form),
      "bolt c<=R t:instant mv<=1 (r:common OR r:uncommon) usd<=2"
    );
  }

  #[test]
  fn no_flags_means_empty_form() {
    assert_eq!(form_of(&["query"]), SearchForm::default());
  }

  #[test]
  fn bad_values_are_reported() {
    let cli = parse(&["query", "--colors", "WX"]);
    let Command::Query(form) = cli.command else {
      panic!("expected query");
    };
    assert!(form.to_form().is_err());

    let cli = parse(&["query", "--mv", ">="]);
    let Command::Query(form) = cli.command else {
      panic!("expected query");
    };
    assert_eq!(form.to_form().unwrap_err(), "Invalid comparison '>=' for --mv.");

    assert!(Cli::try_parse_from(["mtgsearch", "query", "--rarity", "legendary"]).is_err());
  }

  fn form_error(args: &[&str]) -> String {
    match parse(args).command {
      Command::Query(form) => form.to_form().unwrap_err(),
      other => panic!("unexpected command {:?}", other),
    }
  }

  #[test]
  fn types_and_formats_are_checked_against_known_values() {
    let form = form_of(&[
      "query", "-t", "creature", "-t", " LAND ", "-f", "Penny Dreadful", "--legal", "Modern",
    ]);
    assert_eq!(form.types, vec!["Creature", "Land"]);
    assert_eq!(form.formats, vec!["penny"]);
    assert_eq!(form.legal_in, "modern");
    assert_eq!(compile(&form), "t:creature t:land f:penny legal:modern");

    let error = form_error(&["query", "-t", "Urza\"s"]);
    assert!(error.starts_with("Unknown card type 'Urza\"s'. Expected one of: Creature, Instant"));
    let error = form_error(&["query", "-f", "block"]);
    assert!(error.starts_with("Unknown format 'block'. Expected one of: standard, pioneer"));
    assert!(form_error(&["query", "--legal", "(modern)"]).starts_with("Unknown format"));
  }

  #[test]
  fn comparison_values_must_be_numbers_or_stat_words() {
    let form = form_of(&[
      "query", "--power", "*", "--toughness", ">=X", "--loyalty", "x", "--price", "10.",
      "--mv", ".5", "--year", ">2019",
    ]);
    assert_eq!(compile(&form), "mv=.5 pow=* tou>=X loy=x usd<=10. year>2019");

    assert_eq!(form_error(&["query", "--mv", "three"]), "Invalid comparison 'three' for --mv.");
    assert_eq!(form_error(&["query", "--loyalty", "*"]), "Invalid comparison '*' for --loyalty.");
    assert_eq!(form_error(&["query", "--price", "1.2.3"]), "Invalid comparison '1.2.3' for --price.");
    assert_eq!(form_error(&["query", "--price", "."]), "Invalid comparison '.' for --price.");
    assert_eq!(form_error(&["query", "--year", "20.1"]), "Invalid comparison '20.1' for --year.");
    assert_eq!(form_error(&["query", "--power", "(3)"]), "Invalid comparison '(3)' for --power.");
  }

  #[test]
  fn global_options_and_subcommands() {
    let cli = parse(&["--data-dir", "/tmp/mtg", "--no-cache", "favorites", "list", "--sort", "price"]);
    assert_eq!(cli.data_dir, Some(PathBuf::from("/tmp/mtg")));
    assert!(cli.no_cache);
    match cli.command {
      Command::Favorites(FavoritesCommand::List { page, sort, dir }) => {
        assert_eq!(page, 1);
        assert_eq!(sort, SortField::Price);
        assert_eq!(dir, SortDir::Desc);
      }
      other => panic!("unexpected command {:?}", other),
    }

    let cli = parse(&["search", "--url", "q=bolt", "--page", "2", "-v"]);
    assert!(cli.verbose);
    match cli.command {
      Command::Search(args) => {
        assert_eq!(args.url.as_deref(), Some("q=bolt"));
        assert_eq!(args.page, 2);
        assert_eq!(args.sort, SortField::Name);
      }
      other => panic!("unexpected command {:?}", other),
    }
  }
}
